// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for capture producer loops
//!
//! Every built-in capture device runs its producer on a dedicated thread.
//! [`CaptureLoopController`] owns that thread, paces it to the device frame
//! rate and tears it down on `stop()` or drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a producer loop running in a separate thread
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a loop that calls `loop_fn` once per `period`
    ///
    /// The closure runs until it returns [`LoopAction::Stop`] or the
    /// controller is stopped. A zero period runs the closure back to back.
    pub fn start<F>(name: &str, period: Duration, mut loop_fn: F) -> Result<Self, String>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, period_ms = period.as_millis() as u64, "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %thread_name, "Capture loop thread started");
                let mut next_tick = Instant::now();

                loop {
                    if thread_stop.load(Ordering::SeqCst) {
                        debug!(name = %thread_name, "Stop signal received");
                        break;
                    }

                    if loop_fn() == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }

                    next_tick += period;
                    let now = Instant::now();
                    if next_tick > now {
                        sleep_interruptible(&thread_stop, next_tick - now);
                    } else {
                        // Fell behind; don't try to catch up with a burst
                        next_tick = now;
                    }
                }

                info!(name = %thread_name, "Capture loop thread exiting");
            })
            .map_err(|e| format!("Failed to spawn capture thread: {}", e))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for capture loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

/// Sleep in short slices so a stop request is honoured promptly
fn sleep_interruptible(stop: &AtomicBool, total: Duration) {
    const SLICE: Duration = Duration::from_millis(5);
    let deadline = Instant::now() + total;
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(SLICE.min(deadline - now));
    }
}

/// Frame period for a rate in frames per second (zero means unpaced)
pub fn frame_period(frame_rate: u32) -> Duration {
    if frame_rate == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(1) / frame_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller =
            CaptureLoopController::start("test-loop", Duration::ZERO, move || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                if count >= 10 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            })
            .unwrap();

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_interrupts_long_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller =
            CaptureLoopController::start("test-slow", Duration::from_secs(10), move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            })
            .unwrap();

        thread::sleep(Duration::from_millis(30));
        let started = Instant::now();
        controller.stop();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drop_stops_loop() {
        let controller =
            CaptureLoopController::start("test-running", Duration::from_millis(10), || {
                LoopAction::Continue
            })
            .unwrap();

        assert!(controller.is_running());
        drop(controller);
    }

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(0), Duration::ZERO);
        assert_eq!(frame_period(1), Duration::from_secs(1));
        assert_eq!(frame_period(50), Duration::from_millis(20));
    }
}
