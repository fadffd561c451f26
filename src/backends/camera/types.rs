// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check if this resolution covers `other` in both dimensions
    pub fn covers(&self, other: Resolution) -> bool {
        self.width >= other.width && self.height >= other.height
    }

    /// Number of levels in a full mip chain down to 1x1
    pub fn mip_level_count(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        u32::BITS - largest.leading_zeros()
    }

    /// Convert to a wgpu extent with a single layer
    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    /// Parse "WIDTHxHEIGHT" (e.g. "1280x720")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid width '{}': {}", w, e))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid height '{}': {}", h, e))?;
        Ok(Self::new(width, height))
    }
}

/// A single RGBA8 camera image
///
/// Rows are stored bottom-row-first (sensor order), tightly packed
/// (`width * 4` bytes per row). The pixel buffer is shared so a frame can be
/// republished without copying.
#[derive(Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    /// Monotonic sequence number assigned by the producing device
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Create a frame from tightly packed RGBA8 data
    pub fn from_rgba(width: u32, height: u32, data: impl Into<Arc<[u8]>>, sequence: u64) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Frame dimensions
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Bytes per row
    pub fn stride(&self) -> u32 {
        self.width * 4
    }

    /// Check that the buffer holds exactly `width * height` RGBA pixels
    pub fn is_well_formed(&self) -> bool {
        !self.resolution().is_empty() && self.data.len() == self.resolution().pixel_count() * 4
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(Resolution::new(1, 1).mip_level_count(), 1);
        assert_eq!(Resolution::new(2, 1).mip_level_count(), 2);
        assert_eq!(Resolution::new(1280, 720).mip_level_count(), 11);
        assert_eq!(Resolution::new(1024, 1024).mip_level_count(), 11);
        assert_eq!(Resolution::new(0, 0).mip_level_count(), 1);
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!("1280x720".parse::<Resolution>(), Ok(Resolution::new(1280, 720)));
        assert_eq!(" 640X480 ".parse::<Resolution>(), Ok(Resolution::new(640, 480)));
        assert!("1280".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_resolution_covers() {
        let display = Resolution::new(1280, 720);
        assert!(Resolution::new(1920, 1080).covers(display));
        assert!(display.covers(display));
        assert!(!Resolution::new(1920, 700).covers(display));
    }

    #[test]
    fn test_frame_well_formed() {
        let good = CameraFrame::from_rgba(2, 2, vec![0u8; 16], 0);
        let short = CameraFrame::from_rgba(2, 2, vec![0u8; 15], 1);
        let empty = CameraFrame::from_rgba(0, 2, Vec::<u8>::new(), 2);
        assert!(good.is_well_formed());
        assert!(!short.is_well_formed());
        assert!(!empty.is_well_formed());
        assert_eq!(good.stride(), 8);
    }
}
