// SPDX-License-Identifier: GPL-3.0-only

//! Global Reinhard tone-mapping engine
//!
//! GPU compute implementation of the photographic operator:
//!
//! ```text
//! Y     = 0.2126 R + 0.7152 G + 0.0722 B
//! Yavg  = exp(mean(ln(Y + 1e-6)))
//! L     = key / Yavg * Y
//! Ld    = L (1 + L / Lwhite²) / (1 + L)        Lwhite = key / Yavg * max(Y)
//! out   = (rgb / Y)^saturation * Ld
//! ```
//!
//! `Yavg` and `Lwhite` come from two reduction passes that only run when the
//! caller asks for a recompute; the per-pixel pass runs every frame.

use super::{ComputeEngine, EngineBinding};
use crate::constants::gpu::WORKGROUP_SIZE;
use crate::errors::EngineError;
use crate::gpu::GpuContext;
use crate::shaders::{REINHARD_GLOBAL_SHADER, compute_dispatch_size, create_shader_module};
use tracing::{debug, info};

/// Shader parameters uniform
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ReinhardParams {
    width: u32,
    height: u32,
    groups_x: u32,
    groups_y: u32,
    key: f32,
    saturation: f32,
    _padding: [u32; 2],
}

/// Mapping statistics as stored on the GPU
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ReinhardStats {
    /// Log-average luminance
    pub log_avg: f32,
    /// Scaled luminance that maps to pure white
    pub l_white: f32,
    /// Maximum unscaled luminance
    pub max_lum: f32,
    pub pixel_count: u32,
}

/// GPU state that exists between `init` and `shutdown`
struct BoundState {
    gpu: GpuContext,
    log_avg_pipeline: wgpu::ComputePipeline,
    reduce_pipeline: wgpu::ComputePipeline,
    tone_map_pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    stats_buffer: wgpu::Buffer,
    groups_x: u32,
    groups_y: u32,
    /// Statistics have been computed at least once since init
    stats_valid: bool,
}

pub struct ReinhardGlobalEngine {
    key: f32,
    saturation: f32,
    state: Option<BoundState>,
}

impl ReinhardGlobalEngine {
    pub fn new(key: f32, saturation: f32) -> Self {
        Self {
            key,
            saturation,
            state: None,
        }
    }

    pub fn key(&self) -> f32 {
        self.key
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    /// Read back the statistics used by the last tone-map pass
    pub fn read_stats(&self) -> Result<ReinhardStats, EngineError> {
        let state = self.state.as_ref().ok_or(EngineError::NotInitialized)?;
        let device = state.gpu.device();
        let size = std::mem::size_of::<ReinhardStats>() as u64;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("reinhard_stats_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("reinhard_stats_readback"),
        });
        encoder.copy_buffer_to_buffer(&state.stats_buffer, 0, &staging, 0, size);
        state.gpu.queue().submit(std::iter::once(encoder.finish()));

        let data = pollster::block_on(crate::shaders::read_buffer_async(device, &staging))
            .map_err(EngineError::ProcessFailed)?;
        Ok(bytemuck::pod_read_unaligned::<ReinhardStats>(&data))
    }
}

impl Default for ReinhardGlobalEngine {
    fn default() -> Self {
        use crate::constants::engine::{DEFAULT_KEY, DEFAULT_SATURATION};
        Self::new(DEFAULT_KEY, DEFAULT_SATURATION)
    }
}

impl ComputeEngine for ReinhardGlobalEngine {
    fn name(&self) -> &'static str {
        "reinhard_global"
    }

    fn init(&mut self, binding: EngineBinding) -> Result<(), EngineError> {
        if binding.resolution.is_empty() {
            return Err(EngineError::InitFailed(format!(
                "resolution {} has a zero dimension",
                binding.resolution
            )));
        }
        if binding.output.size() != binding.resolution.extent() {
            return Err(EngineError::InitFailed(format!(
                "output texture {:?} does not match resolution {}",
                binding.output.size(),
                binding.resolution
            )));
        }

        info!(
            resolution = %binding.resolution,
            key = self.key,
            saturation = self.saturation,
            "Initializing Reinhard engine"
        );

        let device = binding.gpu.device();
        let shader = create_shader_module(device, "reinhard_global_shader", REINHARD_GLOBAL_SHADER);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("reinhard_bind_group_layout"),
            entries: &[
                // Raw input
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Processed output
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // Per-workgroup partial sums
                storage_entry(2),
                // Final statistics
                storage_entry(3),
                // Parameters
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("reinhard_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let log_avg_pipeline = pipeline("compute_log_avg_lum");
        let reduce_pipeline = pipeline("final_reduce");
        let tone_map_pipeline = pipeline("tone_map");

        let groups_x = compute_dispatch_size(binding.resolution.width, WORKGROUP_SIZE);
        let groups_y = compute_dispatch_size(binding.resolution.height, WORKGROUP_SIZE);

        let params = ReinhardParams {
            width: binding.resolution.width,
            height: binding.resolution.height,
            groups_x,
            groups_y,
            key: self.key,
            saturation: self.saturation,
            _padding: [0; 2],
        };
        let params_buffer = {
            use wgpu::util::DeviceExt;
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("reinhard_params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };
        let partials_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("reinhard_partials"),
            size: (groups_x * groups_y) as u64 * 8,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let stats_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("reinhard_stats"),
            size: std::mem::size_of::<ReinhardStats>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let input_view = binding.input.create_view(&wgpu::TextureViewDescriptor {
            label: Some("reinhard_input_view"),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });
        let output_view = binding
            .output
            .create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("reinhard_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&output_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: partials_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: stats_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        debug!(groups_x, groups_y, "Reinhard engine resources allocated");

        self.state = Some(BoundState {
            gpu: binding.gpu.clone(),
            log_avg_pipeline,
            reduce_pipeline,
            tone_map_pipeline,
            bind_group,
            stats_buffer,
            groups_x,
            groups_y,
            stats_valid: false,
        });
        Ok(())
    }

    fn process(&mut self, recompute: bool) -> Result<(), EngineError> {
        let state = self.state.as_mut().ok_or(EngineError::NotInitialized)?;
        // No statistics yet means the tone-map pass has nothing to read
        let recompute = recompute || !state.stats_valid;

        let mut encoder = state
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("reinhard_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("reinhard_pass"),
                timestamp_writes: None,
            });
            pass.set_bind_group(0, &state.bind_group, &[]);

            if recompute {
                pass.set_pipeline(&state.log_avg_pipeline);
                pass.dispatch_workgroups(state.groups_x, state.groups_y, 1);
                pass.set_pipeline(&state.reduce_pipeline);
                pass.dispatch_workgroups(1, 1, 1);
            }

            pass.set_pipeline(&state.tone_map_pipeline);
            pass.dispatch_workgroups(state.groups_x, state.groups_y, 1);
        }
        state.gpu.queue().submit(std::iter::once(encoder.finish()));
        state.gpu.wait_idle().map_err(EngineError::ProcessFailed)?;

        if recompute {
            state.stats_valid = true;
            debug!("Reinhard mapping recomputed");
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(state) = self.state.take() {
            state.stats_buffer.destroy();
            info!("Reinhard engine shut down");
        }
    }

    fn is_initialized(&self) -> bool {
        self.state.is_some()
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layouts_match_shader() {
        assert_eq!(std::mem::size_of::<ReinhardParams>(), 32);
        assert_eq!(std::mem::size_of::<ReinhardStats>(), 16);
    }

    #[test]
    fn test_process_before_init_fails() {
        let mut engine = ReinhardGlobalEngine::default();
        assert!(matches!(engine.process(false), Err(EngineError::NotInitialized)));
        assert!(matches!(engine.read_stats(), Err(EngineError::NotInitialized)));
        assert!(!engine.is_initialized());
    }
}
