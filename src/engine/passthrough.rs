// SPDX-License-Identifier: GPL-3.0-only

//! Engine that copies its input unchanged (diagnostics)

use super::{ComputeEngine, EngineBinding};
use crate::errors::EngineError;
use tracing::info;

#[derive(Default)]
pub struct PassthroughEngine {
    binding: Option<EngineBinding>,
}

impl PassthroughEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComputeEngine for PassthroughEngine {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn init(&mut self, binding: EngineBinding) -> Result<(), EngineError> {
        if binding.input.size() != binding.output.size() {
            return Err(EngineError::InitFailed(format!(
                "input {:?} and output {:?} differ in size",
                binding.input.size(),
                binding.output.size()
            )));
        }
        info!(resolution = %binding.resolution, "Passthrough engine initialized");
        self.binding = Some(binding);
        Ok(())
    }

    fn process(&mut self, _recompute: bool) -> Result<(), EngineError> {
        let binding = self.binding.as_ref().ok_or(EngineError::NotInitialized)?;
        let gpu = &binding.gpu;

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("passthrough_encoder"),
            });
        encoder.copy_texture_to_texture(
            binding.input.as_image_copy(),
            binding.output.as_image_copy(),
            binding.resolution.extent(),
        );
        gpu.queue().submit(std::iter::once(encoder.finish()));
        gpu.wait_idle().map_err(EngineError::ProcessFailed)
    }

    fn shutdown(&mut self) {
        if self.binding.take().is_some() {
            info!("Passthrough engine shut down");
        }
    }

    fn is_initialized(&self) -> bool {
        self.binding.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_before_init_fails() {
        let mut engine = PassthroughEngine::new();
        assert!(matches!(engine.process(true), Err(EngineError::NotInitialized)));
        engine.shutdown();
        assert!(!engine.is_initialized());
    }
}
