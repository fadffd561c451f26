// SPDX-License-Identifier: GPL-3.0-only

//! Capture bridge
//!
//! Turns "a camera frame is ready" notifications from the camera thread into
//! a single pending-update flag read by the render context, and asks the
//! host for a redraw. Notifications that arrive before the render pass
//! coalesce into one update.

use crate::backends::camera::FrameListener;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Host primitive that schedules a render pass
pub trait RedrawRequester: Send + Sync {
    fn request_redraw(&self);
}

#[derive(Debug, Default)]
struct BridgeState {
    pending: bool,
    accepting: bool,
}

pub struct CaptureBridge {
    state: Mutex<BridgeState>,
    redraw: Arc<dyn RedrawRequester>,
}

impl CaptureBridge {
    /// Create a bridge that accepts notifications immediately
    pub fn new(redraw: Arc<dyn RedrawRequester>) -> Self {
        Self {
            state: Mutex::new(BridgeState {
                pending: false,
                accepting: true,
            }),
            redraw,
        }
    }

    /// Mark a new frame as pending and request a redraw
    ///
    /// Safe to call from any thread. Dropped after [`detach`](Self::detach).
    pub fn on_frame_available(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.accepting {
                trace!("Frame notification after detach dropped");
                return;
            }
            state.pending = true;
        }
        // Outside the lock: the host may run a pass synchronously
        self.redraw.request_redraw();
    }

    /// Read and clear the pending flag in one step
    pub fn consume_pending_update(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut state.pending)
    }

    /// Stop accepting notifications and drop any pending update
    pub fn detach(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.accepting = false;
        state.pending = false;
    }

    pub fn is_accepting(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .accepting
    }
}

impl FrameListener for CaptureBridge {
    fn on_frame_available(&self) {
        CaptureBridge::on_frame_available(self);
    }
}
