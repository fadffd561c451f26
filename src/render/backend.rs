// SPDX-License-Identifier: GPL-3.0-only

//! wgpu render backend: opens the configured camera and builds [`GpuStages`]

use super::display::DisplayTarget;
use super::stages::GpuStages;
use super::textures::TextureSet;
use crate::backends::camera::{
    CaptureDevice, ImageFileCamera, Resolution, StreamTexture, SyntheticCamera,
};
use crate::config::{CameraSource, Config, EngineConfig};
use crate::engine::{EngineBinding, create_engine};
use crate::errors::{PipelineError, PipelineResult};
use crate::gpu::GpuContext;
use crate::pipeline::RenderBackend;
use std::sync::Arc;
use tracing::info;

/// Presentation surface handed over by a windowed host
pub struct SurfaceTarget {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

pub struct GpuBackend {
    gpu: GpuContext,
    camera: CameraSource,
    frame_rate: u32,
    engine: EngineConfig,
    surface: Option<SurfaceTarget>,
}

impl GpuBackend {
    /// Backend rendering into an offscreen display texture
    pub fn headless(gpu: GpuContext, config: &Config) -> Self {
        Self {
            gpu,
            camera: config.camera.clone(),
            frame_rate: config.frame_rate,
            engine: config.engine,
            surface: None,
        }
    }

    /// Backend presenting to a host surface
    pub fn with_surface(gpu: GpuContext, config: &Config, surface: SurfaceTarget) -> Self {
        Self {
            surface: Some(surface),
            ..Self::headless(gpu, config)
        }
    }
}

impl RenderBackend for GpuBackend {
    type Stages = GpuStages;

    fn open_camera(&mut self) -> PipelineResult<Box<dyn CaptureDevice>> {
        let camera: Box<dyn CaptureDevice> = match &self.camera {
            CameraSource::Synthetic => Box::new(SyntheticCamera::new(self.frame_rate)),
            CameraSource::ImageFile { path } => {
                Box::new(ImageFileCamera::open(path, self.frame_rate)?)
            }
        };
        Ok(camera)
    }

    fn create_stages(
        &mut self,
        stream: &Arc<StreamTexture>,
        camera_resolution: Resolution,
        display_resolution: Resolution,
    ) -> PipelineResult<GpuStages> {
        let mut textures = TextureSet::allocate(&self.gpu, camera_resolution)?;

        let mut engine = create_engine(&self.engine);
        let binding = EngineBinding {
            gpu: self.gpu.clone(),
            resolution: camera_resolution,
            input: textures.raw_texture().clone(),
            output: textures.processed_texture().clone(),
        };
        if let Err(e) = engine.init(binding) {
            textures.release();
            return Err(PipelineError::Engine(e));
        }
        info!(engine = engine.name(), "Compute engine initialized");

        // Taken last so a failed activation can retry with the same surface
        let display = match self.surface.take() {
            Some(SurfaceTarget { surface, mut config }) => {
                config.width = display_resolution.width;
                config.height = display_resolution.height;
                DisplayTarget::from_surface(&self.gpu, surface, config)
            }
            None => DisplayTarget::offscreen(&self.gpu, display_resolution),
        };

        Ok(GpuStages::new(
            &self.gpu,
            Arc::clone(stream),
            textures,
            engine,
            display,
        ))
    }
}
