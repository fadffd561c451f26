// SPDX-License-Identifier: GPL-3.0-only

//! Capture device abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   FramePipeline     │  ← Lifecycle, preview size selection
//! └──────────┬──────────┘
//!            │ open / configure / attach / start / stop / release
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureDevice Trait │  ← Common interface
//! └──────────┬──────────┘
//!            │ publish frames (camera thread)
//!            ▼
//! ┌─────────────────────┐
//! │   StreamTexture     │ ──► FrameListener (capture bridge)
//! └─────────────────────┘
//! ```
//!
//! Enumeration and capture-format negotiation stay with the platform; the
//! pipeline only asks for a capture resolution and a preview size.

mod device;
pub mod file_source;
pub mod frame_loop;
pub mod stream;
pub mod synthetic;
pub mod types;

pub use file_source::ImageFileCamera;
pub use stream::{FrameListener, StreamTexture};
pub use synthetic::SyntheticCamera;
pub use types::*;

use crate::errors::CameraError;
use std::sync::Arc;

/// A camera that streams RGBA frames into a [`StreamTexture`]
///
/// Calls arrive from the render context in lifecycle order:
/// `configure` → `attach` → `start` → (`set_preview_size`)* → `stop` → `release`.
/// `stop` and `release` must be idempotent.
pub trait CaptureDevice: Send {
    /// Human-readable device name (for logging)
    fn name(&self) -> &str;

    /// Request a capture resolution, returning the one actually applied
    fn configure(&mut self, resolution: Resolution) -> Result<Resolution, CameraError>;

    /// Preview sizes the device can stream, in device order
    fn supported_preview_sizes(&self) -> Vec<Resolution>;

    /// Currently streamed frame size, if configured
    fn preview_size(&self) -> Option<Resolution>;

    fn set_preview_size(&mut self, size: Resolution) -> Result<(), CameraError>;

    /// Bind the device to the stream texture it publishes into
    fn attach(&mut self, stream: Arc<StreamTexture>) -> Result<(), CameraError>;

    fn start(&mut self) -> Result<(), CameraError>;

    fn is_streaming(&self) -> bool;

    fn stop(&mut self);

    /// Stop streaming and give up the device; later calls fail with `Released`
    fn release(&mut self);
}

/// Pick the preview size for a display
///
/// Walks `supported` in device order and stops at the first size smaller than
/// the display in either dimension, then takes the size before it. If the
/// very first size is already too small it is used anyway; if none is, the
/// last size wins.
pub fn choose_preview_size(supported: &[Resolution], display: Resolution) -> Option<Resolution> {
    let too_small = supported
        .iter()
        .position(|size| size.width < display.width || size.height < display.height);

    match too_small {
        Some(index) => supported.get(index.saturating_sub(1)).copied(),
        None => supported.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STANDARD_PREVIEW_SIZES;

    #[test]
    fn test_preview_size_covers_display() {
        let chosen = choose_preview_size(STANDARD_PREVIEW_SIZES, Resolution::new(1000, 600));
        assert_eq!(chosen, Some(Resolution::new(1280, 720)));
    }

    #[test]
    fn test_preview_size_exact_match() {
        let chosen = choose_preview_size(STANDARD_PREVIEW_SIZES, Resolution::new(960, 540));
        assert_eq!(chosen, Some(Resolution::new(960, 540)));
    }

    #[test]
    fn test_preview_size_display_larger_than_all() {
        let chosen = choose_preview_size(STANDARD_PREVIEW_SIZES, Resolution::new(3840, 2160));
        assert_eq!(chosen, Some(Resolution::new(1920, 1080)));
    }

    #[test]
    fn test_preview_size_display_smaller_than_all() {
        let chosen = choose_preview_size(STANDARD_PREVIEW_SIZES, Resolution::new(100, 100));
        assert_eq!(chosen, Some(Resolution::new(320, 240)));
    }

    #[test]
    fn test_preview_size_portrait_display() {
        // Height decides: 720 rows needed, so 1280x720 is the smallest fit
        let chosen = choose_preview_size(STANDARD_PREVIEW_SIZES, Resolution::new(400, 720));
        assert_eq!(chosen, Some(Resolution::new(1280, 720)));
    }

    #[test]
    fn test_preview_size_empty_list() {
        assert_eq!(choose_preview_size(&[], Resolution::new(640, 480)), None);
    }
}
