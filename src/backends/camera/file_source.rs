// SPDX-License-Identifier: GPL-3.0-only

//! Still-image capture device
//!
//! Streams a single image file as if it were a live camera. The image is
//! decoded once, flipped into sensor row order and rescaled whenever the
//! preview size changes.

use super::device::DeviceCore;
use super::stream::StreamTexture;
use super::types::{CameraFrame, Resolution};
use super::CaptureDevice;
use crate::constants::{STANDARD_PREVIEW_SIZES, file_formats};
use crate::errors::CameraError;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ImageFileCamera {
    core: DeviceCore,
    path: PathBuf,
    /// Decoded image in sensor order (bottom row first)
    source: Arc<RgbaImage>,
}

impl ImageFileCamera {
    /// Open an image file as a capture source
    pub fn open(path: &Path, frame_rate: u32) -> Result<Self, CameraError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !file_formats::is_image_extension(&extension) {
            return Err(CameraError::InvalidFormat(format!(
                "Unsupported file format: {}",
                extension
            )));
        }

        let source = load_image_as_sensor_rgba(path)?;
        Ok(Self {
            core: DeviceCore::new(format!("image:{}", path.display()), frame_rate),
            path: path.to_path_buf(),
            source: Arc::new(source),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Native size of the decoded image
    pub fn image_size(&self) -> Resolution {
        Resolution::new(self.source.width(), self.source.height())
    }
}

/// Load an image file as RGBA8 with rows bottom-first
pub fn load_image_as_sensor_rgba(path: &Path) -> Result<RgbaImage, CameraError> {
    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        CameraError::NotFound(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let mut rgba = img.to_rgba8();
    imageops::flip_vertical_in_place(&mut rgba);

    info!(width = rgba.width(), height = rgba.height(), "Image loaded successfully");
    Ok(rgba)
}

/// Scale the source to `size`, reusing the pixel buffer when nothing changes
fn scaled_frame_data(source: &RgbaImage, size: Resolution) -> Arc<[u8]> {
    if source.width() == size.width && source.height() == size.height {
        Arc::from(source.as_raw().as_slice())
    } else {
        debug!(from_width = source.width(), from_height = source.height(), %size, "Rescaling image frame");
        let scaled = imageops::resize(source, size.width, size.height, FilterType::Triangle);
        Arc::from(scaled.into_raw().into_boxed_slice())
    }
}

impl CaptureDevice for ImageFileCamera {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn configure(&mut self, resolution: Resolution) -> Result<Resolution, CameraError> {
        self.core.configure(resolution)
    }

    fn supported_preview_sizes(&self) -> Vec<Resolution> {
        STANDARD_PREVIEW_SIZES.to_vec()
    }

    fn preview_size(&self) -> Option<Resolution> {
        self.core.frame_size()
    }

    fn set_preview_size(&mut self, size: Resolution) -> Result<(), CameraError> {
        self.core.set_frame_size(size)
    }

    fn attach(&mut self, stream: Arc<StreamTexture>) -> Result<(), CameraError> {
        self.core.attach(stream)
    }

    fn start(&mut self) -> Result<(), CameraError> {
        let source = Arc::clone(&self.source);
        let mut cached: Option<(Resolution, Arc<[u8]>)> = None;

        self.core.start(move |size, sequence| {
            let data = match &cached {
                Some((cached_size, data)) if *cached_size == size => Arc::clone(data),
                _ => {
                    let data = scaled_frame_data(&source, size);
                    cached = Some((size, Arc::clone(&data)));
                    data
                }
            };
            CameraFrame::from_rgba(size.width, size.height, data, sequence)
        })
    }

    fn is_streaming(&self) -> bool {
        self.core.is_streaming()
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn release(&mut self) {
        self.core.release();
    }
}
