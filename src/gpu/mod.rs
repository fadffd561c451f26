// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities
//!
//! One [`GpuContext`] is shared by the render stages and the compute engine.
//! Both record onto the same queue, so engine work submitted during a frame
//! is ordered before the composite pass that samples its output.

use crate::constants::gpu::BYTES_PER_PIXEL;
use crate::shaders::gpu_processor::read_buffer_async;
use std::sync::Arc;
use tracing::{debug, info};

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
    /// Largest 2D texture edge the device accepts
    pub max_texture_dimension_2d: u32,
}

/// Device and queue shared across the pipeline
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    info: GpuDeviceInfo,
}

impl GpuContext {
    /// Create a context without a presentation surface
    pub async fn headless(label: &str) -> Result<Self, String> {
        let instance = create_instance();
        Self::from_adapter_options(
            &instance,
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            },
            label,
        )
        .await
    }

    /// Create a context whose adapter can present to `surface`
    pub async fn for_surface(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
        label: &str,
    ) -> Result<Self, String> {
        Self::from_adapter_options(
            instance,
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            },
            label,
        )
        .await
    }

    async fn from_adapter_options(
        instance: &wgpu::Instance,
        options: &wgpu::RequestAdapterOptions<'_, '_>,
        label: &str,
    ) -> Result<Self, String> {
        info!(label = label, "Creating GPU device");

        let adapter = instance
            .request_adapter(options)
            .await
            .map_err(|e| format!("Failed to find suitable GPU adapter: {}", e))?;

        let adapter_info = adapter.get_info();
        let adapter_limits = adapter.limits();

        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU adapter selected"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: adapter_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .map_err(|e| format!("Failed to create GPU device: {}", e))?;

        debug!(
            max_texture_dimension_2d = adapter_limits.max_texture_dimension_2d,
            "GPU device created"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            info: GpuDeviceInfo {
                adapter_name: adapter_info.name.clone(),
                backend: adapter_info.backend,
                max_texture_dimension_2d: adapter_limits.max_texture_dimension_2d,
            },
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn info(&self) -> &GpuDeviceInfo {
        &self.info
    }

    /// Block until all submitted work has finished
    pub fn wait_idle(&self) -> Result<(), String> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| format!("GPU poll failed: {}", e))
    }

    /// Read level 0 of an RGBA8 texture back to tightly packed rows
    ///
    /// The texture needs `COPY_SRC` usage. Rows come back in texture order
    /// (row 0 first).
    pub fn read_texture_rgba(&self, texture: &wgpu::Texture) -> Result<Vec<u8>, String> {
        let width = texture.width();
        let height = texture.height();
        let unpadded = width * BYTES_PER_PIXEL;
        let padded = padded_bytes_per_row(width);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("texture_readback_buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("texture_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let data = pollster::block_on(read_buffer_async(&self.device, &buffer))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks_exact(padded as usize).take(height as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        Ok(pixels)
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::PRIMARY),
        ..Default::default()
    })
}

/// Row pitch for texture-to-buffer copies (multiple of 256 bytes)
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1280), 5120);
    }

    #[tokio::test]
    async fn test_create_headless_context() {
        // This test requires a GPU, so it may be skipped in CI
        match GpuContext::headless("test_device").await {
            Ok(gpu) => {
                println!("Created device: {:?}", gpu.info());
                assert!(!gpu.info().adapter_name.is_empty() || gpu.info().max_texture_dimension_2d > 0);
                assert!(gpu.wait_idle().is_ok());
            }
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
            }
        }
    }
}
