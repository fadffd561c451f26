// SPDX-License-Identifier: GPL-3.0-only

//! Compute engine binding
//!
//! The pipeline treats the HDR pass as an opaque service: it binds the raw
//! texture as input and the processed texture as output once per activation,
//! calls `process` once per HDR frame and shuts the engine down before the
//! textures are released. `process` must have finished writing the output when
//! it returns.

pub mod passthrough;
pub mod reference;
pub mod reinhard;

pub use passthrough::PassthroughEngine;
pub use reinhard::{ReinhardGlobalEngine, ReinhardStats};

use crate::backends::camera::Resolution;
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::gpu::GpuContext;

/// Everything an engine needs to run against the pipeline's textures
#[derive(Clone)]
pub struct EngineBinding {
    pub gpu: GpuContext,
    /// Camera resolution (size of both textures)
    pub resolution: Resolution,
    /// Raw texture, read only
    pub input: wgpu::Texture,
    /// Processed texture, written every `process`
    pub output: wgpu::Texture,
}

pub trait ComputeEngine: Send {
    fn name(&self) -> &'static str;

    /// Bind to the pipeline's textures; called once per activation
    fn init(&mut self, binding: EngineBinding) -> Result<(), EngineError>;

    /// Transform input into output
    ///
    /// With `recompute == false` the engine may reuse mapping statistics from
    /// an earlier frame.
    fn process(&mut self, recompute: bool) -> Result<(), EngineError>;

    /// Drop all GPU resources; `process` fails afterwards. Idempotent.
    fn shutdown(&mut self);

    fn is_initialized(&self) -> bool;
}

/// Build the engine selected in the configuration
pub fn create_engine(config: &EngineConfig) -> Box<dyn ComputeEngine> {
    match *config {
        EngineConfig::ReinhardGlobal { key, saturation } => {
            Box::new(ReinhardGlobalEngine::new(key, saturation))
        }
        EngineConfig::Passthrough => Box::new(PassthroughEngine::new()),
    }
}
