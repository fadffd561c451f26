// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic capture device
//!
//! Produces an animated high-contrast test pattern: colour bars across the
//! top quarter, a horizontal brightness ramp below them and a bright bar
//! sweeping left to right. The dark-to-bright range makes the effect of the
//! tone-mapping engine easy to see without camera hardware.

use super::device::DeviceCore;
use super::stream::StreamTexture;
use super::types::{CameraFrame, Resolution};
use super::CaptureDevice;
use crate::constants::STANDARD_PREVIEW_SIZES;
use crate::errors::CameraError;
use std::sync::Arc;

/// Frames the sweeping bar needs to cross the image once
const SWEEP_FRAMES: u64 = 120;

const BAR_COLORS: [[u8; 3]; 4] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]];

pub struct SyntheticCamera {
    core: DeviceCore,
}

impl SyntheticCamera {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            core: DeviceCore::new("synthetic", frame_rate),
        }
    }
}

impl CaptureDevice for SyntheticCamera {
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
        self.core.start(|size, sequence| {
            CameraFrame::from_rgba(
                size.width,
                size.height,
                render_pattern(size, sequence),
                sequence,
            )
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

/// Render one frame of the test pattern, bottom row first
pub fn render_pattern(size: Resolution, sequence: u64) -> Vec<u8> {
    let (width, height) = (size.width as usize, size.height as usize);
    let mut data = vec![0u8; width * height * 4];
    if width == 0 || height == 0 {
        return data;
    }

    let bar_height = (height / 4).max(1);
    let sweep_x = ((sequence % SWEEP_FRAMES) as usize * width) / SWEEP_FRAMES as usize;
    let sweep_half = (width / 64).max(1);

    for (row_index, row) in data.chunks_exact_mut(width * 4).enumerate() {
        // Sensor order: buffer row 0 is the bottom of the image
        let y = height - 1 - row_index;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let rgb = if y < bar_height {
                BAR_COLORS[(x * BAR_COLORS.len()) / width]
            } else if x.abs_diff(sweep_x) <= sweep_half {
                [255, 255, 255]
            } else {
                let level = ((x * 255) / width.saturating_sub(1).max(1)) as u8;
                [level, level, level]
            };
            px[..3].copy_from_slice(&rgb);
            px[3] = 255;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn pixel(data: &[u8], size: Resolution, x: u32, upright_y: u32) -> [u8; 4] {
        let row = size.height - 1 - upright_y;
        let i = ((row * size.width + x) * 4) as usize;
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }

    #[test]
    fn test_pattern_bars_are_at_the_top() {
        let size = Resolution::new(64, 32);
        let data = render_pattern(size, 60);
        assert_eq!(data.len(), 64 * 32 * 4);

        // Top-left is the red bar, stored in the last buffer row
        assert_eq!(pixel(&data, size, 0, 0), [255, 0, 0, 255]);
        assert_eq!(&data[(31 * 64 * 4)..(31 * 64 * 4 + 4)], &[255, 0, 0, 255]);
        // Bottom-left of the ramp is black
        assert_eq!(pixel(&data, size, 0, 31), [0, 0, 0, 255]);
    }

    #[test]
    fn test_sweep_moves_with_sequence() {
        let size = Resolution::new(120, 8);
        let a = render_pattern(size, 0);
        let b = render_pattern(size, 60);
        assert_eq!(pixel(&a, size, 0, 7), [255, 255, 255, 255]);
        assert_eq!(pixel(&b, size, 60, 7), [255, 255, 255, 255]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_start_requires_attached_stream() {
        let mut camera = SyntheticCamera::new(30);
        camera.configure(Resolution::new(16, 16)).unwrap();
        assert!(matches!(camera.start(), Err(CameraError::NotAttached)));
    }

    #[test]
    fn test_rejects_empty_resolution() {
        let mut camera = SyntheticCamera::new(30);
        assert!(matches!(
            camera.configure(Resolution::new(0, 720)),
            Err(CameraError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_streams_frames_until_stopped() {
        struct Count(AtomicU32);
        impl crate::backends::camera::FrameListener for Count {
            fn on_frame_available(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let stream = Arc::new(StreamTexture::new());
        let listener = Arc::new(Count(AtomicU32::new(0)));
        stream.set_listener(listener.clone());

        let mut camera = SyntheticCamera::new(200);
        camera.configure(Resolution::new(8, 8)).unwrap();
        camera.attach(Arc::clone(&stream)).unwrap();
        camera.start().unwrap();
        assert!(camera.is_streaming());
        std::thread::sleep(Duration::from_millis(60));
        camera.stop();
        camera.release();

        let seen = listener.0.load(Ordering::SeqCst);
        assert!(seen > 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(listener.0.load(Ordering::SeqCst), seen);
        assert_eq!(stream.latch().map(|f| f.resolution()), Some(Resolution::new(8, 8)));
        assert!(matches!(camera.start(), Err(CameraError::Released)));
    }
}
