// SPDX-License-Identifier: GPL-3.0-only

//! Render stage sequencer
//!
//! Runs the four per-frame stages in a fixed order:
//!
//! ```text
//! capture ──► compute (HDR only) ──► composite ──► stats
//!   │              │                     │
//!   │ external     │ raw ──► processed   │ raw | processed ──► display
//!   ▼ ──► raw      ▼                     ▼
//! ```
//!
//! Stage failures are logged and the remaining stages still run; the next
//! frame is the retry.

use super::bridge::CaptureBridge;
use super::throttle::{FrameStats, RecomputeThrottle};
use crate::backends::camera::Resolution;
use crate::errors::StageError;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Which color texture the composite pass samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    /// Camera image normalised by the capture pass
    Raw,
    /// Compute engine output
    Processed,
}

/// GPU work behind each stage of a frame
///
/// Every method runs on the render context and must have finished its GPU
/// work when it returns.
pub trait FrameStages {
    /// Latch the newest camera image into the external texture
    fn refresh_camera_texture(&mut self) -> Result<(), StageError>;

    /// Render the external texture into the raw texture and rebuild its mips
    ///
    /// Fails with [`StageError::FramebufferIncomplete`] without drawing if the
    /// offscreen framebuffer can't be used this frame.
    fn draw_capture(&mut self, viewport: Resolution) -> Result<(), StageError>;

    /// Run the compute engine from raw into processed
    fn run_engine(&mut self, recompute: bool) -> Result<(), StageError>;

    /// Draw `source` onto the display target and present it
    fn draw_composite(&mut self, source: TextureSlot, viewport: Resolution)
    -> Result<(), StageError>;

    /// Track a new display size
    fn resize_display(&mut self, display: Resolution) -> Result<(), StageError>;

    /// Shut the engine down, then free all textures. Idempotent.
    fn release(&mut self);
}

/// What happened during one render pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// A pending camera update was consumed and latched
    pub refreshed: bool,
    /// Capture draw completed
    pub captured: bool,
    /// Throttle decision for this frame
    pub recompute: bool,
    /// Engine `process` was called
    pub engine_invoked: bool,
    /// Texture sampled by the composite pass
    pub presented: TextureSlot,
    /// Composite draw completed
    pub composited: bool,
    /// Frame rate, when a stats window closed on this frame
    pub fps: Option<u32>,
}

pub struct RenderSequencer {
    throttle: RecomputeThrottle,
    stats: FrameStats,
    camera_resolution: Resolution,
    display_resolution: Resolution,
}

impl RenderSequencer {
    pub fn new(
        camera_resolution: Resolution,
        display_resolution: Resolution,
        throttle: RecomputeThrottle,
    ) -> Self {
        Self {
            throttle,
            stats: FrameStats::new(),
            camera_resolution,
            display_resolution,
        }
    }

    pub fn camera_resolution(&self) -> Resolution {
        self.camera_resolution
    }

    pub fn display_resolution(&self) -> Resolution {
        self.display_resolution
    }

    pub fn set_display_resolution(&mut self, display: Resolution) {
        self.display_resolution = display;
    }

    /// Run one render pass
    pub fn render_frame<S: FrameStages>(
        &mut self,
        stages: &mut S,
        bridge: &CaptureBridge,
        process_hdr: bool,
        now: Instant,
    ) -> FrameReport {
        // Capture
        let refreshed = if bridge.consume_pending_update() {
            match stages.refresh_camera_texture() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Camera texture update failed, reusing previous image");
                    false
                }
            }
        } else {
            false
        };

        let captured = match stages.draw_capture(self.camera_resolution) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Capture pass skipped");
                false
            }
        };

        // Compute
        let recompute = self.throttle.should_recompute(now);
        let (presented, engine_invoked) = if process_hdr {
            if let Err(e) = stages.run_engine(recompute) {
                warn!(error = %e, recompute, "Compute engine failed");
            }
            (TextureSlot::Processed, true)
        } else {
            (TextureSlot::Raw, false)
        };

        // Composite
        let composited = match stages.draw_composite(presented, self.display_resolution) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Composite pass failed");
                false
            }
        };

        // Stats
        let fps = self.stats.record_frame(now);

        trace!(refreshed, captured, recompute, ?presented, composited, "Frame rendered");
        if let Some(fps) = fps {
            debug!(fps, hdr = process_hdr, "Stats window closed");
        }

        FrameReport {
            refreshed,
            captured,
            recompute,
            engine_invoked,
            presented,
            composited,
            fps,
        }
    }
}
