// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::backends::camera::Resolution;
use std::time::Duration;

/// Capture resolution requested from the camera when nothing else is configured
pub const DEFAULT_CAMERA_RESOLUTION: Resolution = Resolution::new(1280, 720);

/// Display resolution used until the host reports its real size
pub const DEFAULT_DISPLAY_RESOLUTION: Resolution = Resolution::new(1280, 720);

/// Preview sizes offered by the built-in capture devices, largest first
pub const STANDARD_PREVIEW_SIZES: &[Resolution] = &[
    Resolution::new(1920, 1080),
    Resolution::new(1280, 720),
    Resolution::new(960, 540),
    Resolution::new(640, 480),
    Resolution::new(320, 240),
];

/// Pipeline timing constants
pub mod timing {
    use super::Duration;

    /// How often the compute engine rebuilds its mapping statistics (seconds)
    pub const DEFAULT_RECOMPUTE_INTERVAL_SECS: f32 = 0.5;

    /// Length of the frame-rate reporting window
    pub const FPS_WINDOW: Duration = Duration::from_secs(1);

    /// Frame rate of the built-in capture devices
    pub const DEFAULT_CAMERA_FRAME_RATE: u32 = 30;

    /// How long the headless render thread sleeps between command checks
    /// when no redraw has been requested
    pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);
}

/// Full-screen quad shared by the capture and composite passes
///
/// Drawn as a 4-vertex triangle strip. The two texture coordinate sets are
/// vertical mirror images: camera frames arrive bottom-row-first, the capture
/// pass stores them in that order and the composite pass flips them upright.
pub mod quad {
    /// Clip-space positions covering the whole viewport
    pub const POSITIONS: [[f32; 2]; 4] = [[-1.0, -1.0], [-1.0, 1.0], [1.0, -1.0], [1.0, 1.0]];

    /// Texture coordinates in the camera's native orientation (capture pass)
    pub const CAMERA_TEX_COORDS: [[f32; 2]; 4] = [[0.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0]];

    /// Texture coordinates in the compute engine's orientation (composite pass)
    pub const ENGINE_TEX_COORDS: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];

    /// Number of vertices in the strip
    pub const VERTEX_COUNT: u32 = 4;
}

/// GPU constants
pub mod gpu {
    /// Format of the camera, raw and processed textures
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Format of the headless display target
    pub const OFFSCREEN_DISPLAY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Clear color of the offscreen framebuffer (yellow makes a missing camera image obvious)
    pub const CAPTURE_CLEAR_COLOR: wgpu::Color = wgpu::Color {
        r: 1.0,
        g: 1.0,
        b: 0.0,
        a: 1.0,
    };

    /// Clear color of the display
    pub const DISPLAY_CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

    /// Compute workgroup edge length (16x16 threads)
    pub const WORKGROUP_SIZE: u32 = 16;

    /// Bytes per RGBA8 texel
    pub const BYTES_PER_PIXEL: u32 = 4;
}

/// Compute engine defaults
pub mod engine {
    /// Reinhard key value (middle grey)
    pub const DEFAULT_KEY: f32 = 0.18;

    /// Reinhard colour saturation exponent
    pub const DEFAULT_SATURATION: f32 = 1.1;
}

/// Host configuration command numbering
pub mod commands {
    /// Item number of the HDR on/off row
    pub const ITEM_HDR: i32 = 0;

    /// Option number meaning "on"
    pub const OPTION_ON: i32 = 0;

    /// Option number meaning "off"
    pub const OPTION_OFF: i32 = 1;
}

/// Supported file formats
pub mod file_formats {
    /// Image file extensions accepted by the image-file camera
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "tif", "tiff"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application directory name under the user's config dir
pub const APP_DIR_NAME: &str = "hdr-camera";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.json";
