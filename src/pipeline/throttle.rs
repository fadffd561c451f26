// SPDX-License-Identifier: GPL-3.0-only

//! Recompute throttle and frame-rate statistics
//!
//! Both are plain values owned by the render sequencer and evaluated once per
//! rendered frame with the frame's timestamp. Neither ever drops or delays a
//! frame.

use crate::constants::timing;
use std::time::{Duration, Instant};
use tracing::info;

/// Decides when the compute engine rebuilds its mapping statistics
#[derive(Debug, Clone)]
pub struct RecomputeThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl RecomputeThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Build from an interval in seconds
    ///
    /// Negative or NaN means zero; intervals too large for a `Duration`
    /// saturate, so statistics are computed once and then kept.
    pub fn from_secs_f32(secs: f32) -> Self {
        let secs = if secs.is_nan() { 0.0 } else { secs.max(0.0) };
        Self::new(Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True at most once per interval; the first call is always true
    pub fn should_recompute(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

impl Default for RecomputeThrottle {
    fn default() -> Self {
        Self::from_secs_f32(timing::DEFAULT_RECOMPUTE_INTERVAL_SECS)
    }
}

/// Per-second rendered frame counter
#[derive(Debug, Clone)]
pub struct FrameStats {
    frames: u32,
    window_start: Instant,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(window_start: Instant) -> Self {
        Self {
            frames: 0,
            window_start,
        }
    }

    /// Count a rendered frame
    ///
    /// Once a full window has elapsed the count is logged, returned and reset.
    pub fn record_frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.saturating_duration_since(self.window_start) < timing::FPS_WINDOW {
            return None;
        }

        let fps = self.frames;
        info!(fps, "Frame rate");
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }

    /// Frames counted in the current window
    pub fn frames_in_window(&self) -> u32 {
        self.frames
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_evaluation_recomputes() {
        let mut throttle = RecomputeThrottle::default();
        assert!(throttle.should_recompute(Instant::now()));
    }

    #[test]
    fn test_half_second_schedule() {
        let t0 = Instant::now();
        let mut throttle = RecomputeThrottle::from_secs_f32(0.5);
        assert!(throttle.should_recompute(t0));
        assert!(!throttle.should_recompute(t0 + Duration::from_millis(200)));
        assert!(throttle.should_recompute(t0 + Duration::from_millis(600)));
        // Window restarts at 0.6
        assert!(!throttle.should_recompute(t0 + Duration::from_millis(1000)));
        assert!(throttle.should_recompute(t0 + Duration::from_millis(1100)));
    }

    #[test]
    fn test_zero_interval_always_recomputes() {
        let t0 = Instant::now();
        let mut throttle = RecomputeThrottle::from_secs_f32(0.0);
        assert!(throttle.should_recompute(t0));
        assert!(throttle.should_recompute(t0));
        assert_eq!(RecomputeThrottle::from_secs_f32(f32::NAN).interval(), Duration::ZERO);
    }

    #[test]
    fn test_oversized_interval_saturates() {
        let t0 = Instant::now();
        let mut throttle = RecomputeThrottle::from_secs_f32(1e30);
        assert_eq!(throttle.interval(), Duration::MAX);
        assert!(throttle.should_recompute(t0));
        assert!(!throttle.should_recompute(t0 + Duration::from_secs(3600)));
        assert_eq!(RecomputeThrottle::from_secs_f32(f32::INFINITY).interval(), Duration::MAX);
    }

    #[test]
    fn test_clock_going_backwards_does_not_recompute() {
        let t0 = Instant::now() + Duration::from_secs(5);
        let mut throttle = RecomputeThrottle::from_secs_f32(0.5);
        assert!(throttle.should_recompute(t0));
        assert!(!throttle.should_recompute(t0 - Duration::from_secs(1)));
    }

    #[test]
    fn test_sixty_frames_in_one_second() {
        let t0 = Instant::now();
        let mut stats = FrameStats::starting_at(t0);

        for i in 1..60u32 {
            assert_eq!(stats.record_frame(t0 + Duration::from_secs(1) * i / 60), None);
        }
        assert_eq!(stats.record_frame(t0 + Duration::from_secs(1)), Some(60));
        assert_eq!(stats.frames_in_window(), 0);
    }

    #[test]
    fn test_stats_window_restarts() {
        let t0 = Instant::now();
        let mut stats = FrameStats::starting_at(t0);
        assert_eq!(stats.record_frame(t0 + Duration::from_millis(1500)), Some(1));
        assert_eq!(stats.record_frame(t0 + Duration::from_millis(2000)), None);
        assert_eq!(stats.record_frame(t0 + Duration::from_millis(2500)), Some(2));
    }
}
