// SPDX-License-Identifier: GPL-3.0-only

//! HDR camera preview pipeline
//!
//! Drives camera frames through a GPU pipeline once per display refresh:
//! latch the newest camera image, render it into an offscreen texture,
//! optionally tone map it with a compute engine, and composite the result
//! onto the display.
//!
//! # Architecture
//!
//! - [`backends`]: Capture devices and the stream texture they publish into
//! - [`pipeline`]: Lifecycle state machine, frame bridge and per-frame sequencing
//! - [`render`]: wgpu render stages, textures and display targets
//! - [`engine`]: Compute engines that map the raw texture to the processed one
//! - [`host`]: Headless host shell that owns the render thread
//! - [`config`]: Read-only pipeline configuration
//!
//! # Example
//!
//! ```ignore
//! let gpu = pollster::block_on(GpuContext::headless("hdr_camera"))?;
//! let host = HeadlessHost::start(Config::default(), gpu)?;
//! host.set_hdr(true);
//! let summary = host.stop();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod gpu;
pub mod host;
pub mod pipeline;
pub mod render;
pub mod shaders;

// Re-export commonly used types
pub use backends::camera::{CameraFrame, Resolution};
pub use config::{CameraSource, Config, EngineConfig};
pub use errors::{PipelineError, PipelineResult, StageError};
pub use gpu::GpuContext;
pub use host::{HeadlessHost, HostSummary};
pub use pipeline::{FramePipeline, LifecycleState};
