// SPDX-License-Identifier: GPL-3.0-only

//! wgpu implementation of the per-frame render stages

use super::display::DisplayTarget;
use super::mipmap::{MipChain, MipmapGenerator};
use super::quad::{QuadGeometry, QuadPipeline, TexCoordSet};
use super::textures::TextureSet;
use crate::backends::camera::{Resolution, StreamTexture};
use crate::constants::gpu::{CAPTURE_CLEAR_COLOR, COLOR_FORMAT, DISPLAY_CLEAR_COLOR};
use crate::engine::ComputeEngine;
use crate::errors::StageError;
use crate::gpu::GpuContext;
use crate::pipeline::{FrameStages, TextureSlot};
use std::sync::Arc;
use tracing::{debug, info, trace};

pub struct GpuStages {
    gpu: GpuContext,
    stream: Arc<StreamTexture>,
    textures: TextureSet,
    engine: Box<dyn ComputeEngine>,
    display: DisplayTarget,
    geometry: QuadGeometry,
    capture_pipeline: QuadPipeline,
    composite_pipeline: QuadPipeline,
    mipmaps: MipmapGenerator,
    raw_mips: MipChain,
    capture_bind_group: wgpu::BindGroup,
    raw_bind_group: wgpu::BindGroup,
    processed_bind_group: wgpu::BindGroup,
    frames_latched: u64,
    released: bool,
}

impl GpuStages {
    /// Build pipelines and bind groups over an allocated texture set
    ///
    /// The engine must already be initialised against `textures`.
    pub fn new(
        gpu: &GpuContext,
        stream: Arc<StreamTexture>,
        textures: TextureSet,
        engine: Box<dyn ComputeEngine>,
        display: DisplayTarget,
    ) -> Self {
        let device = gpu.device();
        let geometry = QuadGeometry::new(device);
        let capture_pipeline = QuadPipeline::new(device, COLOR_FORMAT, "capture_pipeline");
        let composite_pipeline = QuadPipeline::new(device, display.format(), "composite_pipeline");
        let mipmaps = MipmapGenerator::new(device, COLOR_FORMAT);
        let raw_mips = mipmaps.prepare(device, textures.raw_texture());

        let capture_bind_group = capture_pipeline.bind_group(
            device,
            "capture_bind_group",
            textures.external_view(),
            textures.external_sampler(),
        );
        let raw_bind_group = composite_pipeline.bind_group(
            device,
            "composite_raw_bind_group",
            textures.raw_view(),
            textures.raw_sampler(),
        );
        let processed_bind_group = composite_pipeline.bind_group(
            device,
            "composite_processed_bind_group",
            textures.processed_view(),
            textures.processed_sampler(),
        );

        let display_format = display.format();
        let display_size = display.size();
        info!(
            engine = engine.name(),
            ?display_format,
            display = %display_size,
            "Render stages ready"
        );

        Self {
            gpu: gpu.clone(),
            stream,
            textures,
            engine,
            display,
            geometry,
            capture_pipeline,
            composite_pipeline,
            mipmaps,
            raw_mips,
            capture_bind_group,
            raw_bind_group,
            processed_bind_group,
            frames_latched: 0,
            released: false,
        }
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    pub fn engine(&self) -> &dyn ComputeEngine {
        self.engine.as_ref()
    }

    pub fn display(&self) -> &DisplayTarget {
        &self.display
    }

    /// Camera frames latched into the external texture so far
    pub fn frames_latched(&self) -> u64 {
        self.frames_latched
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Read the last composited image (offscreen targets only), top row first
    pub fn snapshot(&self) -> Result<(Resolution, Vec<u8>), StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        let texture = self.display.offscreen_texture().ok_or_else(|| {
            StageError::Surface("snapshots need an offscreen display target".into())
        })?;
        let pixels = self
            .gpu
            .read_texture_rgba(texture)
            .map_err(StageError::Surface)?;
        Ok((self.display.size(), pixels))
    }

    /// Read level 0 of the raw or processed texture, in storage row order
    pub fn read_slot(&self, slot: TextureSlot) -> Result<Vec<u8>, StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        let texture = match slot {
            TextureSlot::Raw => self.textures.raw_texture(),
            TextureSlot::Processed => self.textures.processed_texture(),
        };
        self.gpu
            .read_texture_rgba(texture)
            .map_err(StageError::TextureUpdate)
    }

    fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) -> Result<(), StageError> {
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.gpu.wait_idle().map_err(StageError::Surface)
    }
}

/// Viewport rectangle clamped to the attachment it is applied to
fn viewport_within(viewport: Resolution, target: Resolution) -> (f32, f32) {
    (
        viewport.width.min(target.width) as f32,
        viewport.height.min(target.height) as f32,
    )
}

impl FrameStages for GpuStages {
    fn refresh_camera_texture(&mut self) -> Result<(), StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        let Some(frame) = self.stream.latch() else {
            trace!("Pending update without a new frame");
            return Ok(());
        };

        if self.textures.upload_frame(&frame)? {
            self.capture_bind_group = self.capture_pipeline.bind_group(
                self.gpu.device(),
                "capture_bind_group",
                self.textures.external_view(),
                self.textures.external_sampler(),
            );
        }
        self.frames_latched += 1;
        trace!(sequence = frame.sequence, latency = ?frame.captured_at.elapsed(), "Camera frame latched");
        Ok(())
    }

    fn draw_capture(&mut self, viewport: Resolution) -> Result<(), StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        let framebuffer = self.textures.check_complete()?;
        let (width, height) = viewport_within(viewport, framebuffer.size());

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("capture_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: framebuffer.color_view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CAPTURE_CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_viewport(0.0, 0.0, width, height, 0.0, 1.0);
            self.capture_pipeline.draw(
                &mut pass,
                &self.geometry,
                &self.capture_bind_group,
                TexCoordSet::Camera,
            );
        }
        self.mipmaps.encode(&mut encoder, &self.raw_mips);
        self.submit_and_wait(encoder)
    }

    fn run_engine(&mut self, recompute: bool) -> Result<(), StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        self.engine.process(recompute)?;
        Ok(())
    }

    fn draw_composite(
        &mut self,
        source: TextureSlot,
        viewport: Resolution,
    ) -> Result<(), StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        let frame = self.display.acquire(&self.gpu)?;
        let (width, height) = viewport_within(viewport, self.display.size());
        let bind_group = match source {
            TextureSlot::Raw => &self.raw_bind_group,
            TextureSlot::Processed => &self.processed_bind_group,
        };

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("composite_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("composite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(DISPLAY_CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_viewport(0.0, 0.0, width, height, 0.0, 1.0);
            self.composite_pipeline
                .draw(&mut pass, &self.geometry, bind_group, TexCoordSet::Engine);
        }
        self.submit_and_wait(encoder)?;
        frame.present();
        Ok(())
    }

    fn resize_display(&mut self, display: Resolution) -> Result<(), StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        self.display.resize(&self.gpu, display)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.engine.shutdown();
        self.textures.release();
        self.display.release();
        self.released = true;
        debug!(frames_latched = self.frames_latched, "Render stages released");
    }
}

impl Drop for GpuStages {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_clamped_to_target() {
        let target = Resolution::new(640, 480);
        assert_eq!(viewport_within(Resolution::new(320, 240), target), (320.0, 240.0));
        assert_eq!(viewport_within(Resolution::new(1280, 720), target), (640.0, 480.0));
    }
}
