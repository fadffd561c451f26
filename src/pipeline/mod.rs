// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipeline controller
//!
//! Bridges asynchronous camera notifications into demand-driven render
//! passes, throttles the compute engine's statistics rebuild and owns the
//! lifecycle of every GPU and capture resource.
//!
//! - [`bridge`] - single-slot pending-update flag fed by the camera thread
//! - [`sequencer`] - capture → compute → composite → stats, once per pass
//! - [`throttle`] - recompute schedule and frame-rate statistics
//! - [`lifecycle`] - `Uninitialized → Active → Destroyed`
//! - [`mode`] - host configuration commands

pub mod bridge;
pub mod lifecycle;
pub mod mode;
pub mod sequencer;
pub mod throttle;

pub use bridge::{CaptureBridge, RedrawRequester};
pub use lifecycle::{FramePipeline, LifecycleState, PipelineSettings, RenderBackend};
pub use mode::ModeCommand;
pub use sequencer::{FrameReport, FrameStages, RenderSequencer, TextureSlot};
pub use throttle::{FrameStats, RecomputeThrottle};
