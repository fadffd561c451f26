// SPDX-License-Identifier: GPL-3.0-only

//! Streaming path between a capture device and the render context
//!
//! The camera thread publishes frames into a single latest-frame slot and
//! notifies the registered [`FrameListener`]. The render context latches the
//! newest frame when it refreshes the external texture. Older unlatched frames
//! are overwritten, so a slow renderer never builds a backlog.

use super::types::CameraFrame;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Receiver of "new frame available" notifications
///
/// Called on the camera thread. Implementations must be cheap and must not
/// touch GPU state.
pub trait FrameListener: Send + Sync {
    fn on_frame_available(&self);
}

/// Single-slot frame mailbox shared by a capture device and the renderer
#[derive(Default)]
pub struct StreamTexture {
    latest: Mutex<Option<CameraFrame>>,
    listener: Mutex<Option<Arc<dyn FrameListener>>>,
}

impl StreamTexture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame (replacing any unlatched one) and notify the listener
    pub fn publish(&self, frame: CameraFrame) {
        trace!(sequence = frame.sequence, "Frame published");
        {
            let mut slot = self.latest.lock().unwrap_or_else(|e| e.into_inner());
            *slot = Some(frame);
        }

        // Clone out of the lock so the callback can't deadlock with clear_listener
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(listener) = listener {
            listener.on_frame_available();
        }
    }

    /// Take the newest frame, leaving the slot empty
    pub fn latch(&self) -> Option<CameraFrame> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Check whether an unlatched frame is waiting
    pub fn has_frame(&self) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn set_listener(&self, listener: Arc<dyn FrameListener>) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(listener);
    }

    /// Drop the listener; later publishes only fill the slot
    pub fn clear_listener(&self) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
