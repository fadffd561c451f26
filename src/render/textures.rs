// SPDX-License-Identifier: GPL-3.0-only

//! Texture resource set
//!
//! Owns every texture of an active pipeline:
//!
//! - external: streaming target the camera frames are latched into
//!   (nearest filtering, clamp-to-edge, sized to the stream)
//! - raw: camera-resolution colour texture with a full mip chain, written by
//!   the capture pass every frame through the offscreen framebuffer
//! - processed: camera-resolution colour texture written by the engine
//!
//! Raw and processed are always sized to the camera resolution, never the
//! display.

use crate::backends::camera::{CameraFrame, Resolution};
use crate::constants::gpu::{BYTES_PER_PIXEL, COLOR_FORMAT};
use crate::errors::{PipelineError, PipelineResult, StageError};
use crate::gpu::GpuContext;
use crate::shaders::CachedDimensions;
use tracing::{debug, info};

/// Streaming target for camera frames
struct ExternalTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    dims: CachedDimensions,
}

/// Render target view onto raw level 0
pub struct OffscreenFramebuffer {
    color_view: wgpu::TextureView,
    size: Resolution,
}

impl OffscreenFramebuffer {
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn size(&self) -> Resolution {
        self.size
    }
}

pub struct TextureSet {
    gpu: GpuContext,
    camera_resolution: Resolution,
    external: ExternalTexture,
    external_sampler: wgpu::Sampler,
    raw: wgpu::Texture,
    raw_view: wgpu::TextureView,
    raw_sampler: wgpu::Sampler,
    processed: wgpu::Texture,
    processed_view: wgpu::TextureView,
    processed_sampler: wgpu::Sampler,
    framebuffer: OffscreenFramebuffer,
    released: bool,
}

impl TextureSet {
    /// Allocate the external, raw and processed textures and the framebuffer
    pub fn allocate(gpu: &GpuContext, camera_resolution: Resolution) -> PipelineResult<Self> {
        check_dimensions(gpu, camera_resolution)?;
        let device = gpu.device();

        let external = create_external(device, camera_resolution);
        let external_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("external_camera_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let raw = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("raw_color_texture"),
            size: camera_resolution.extent(),
            mip_level_count: camera_resolution.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let raw_view = raw.create_view(&wgpu::TextureViewDescriptor::default());
        let raw_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("raw_color_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let processed = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("processed_color_texture"),
            size: camera_resolution.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let processed_view = processed.create_view(&wgpu::TextureViewDescriptor::default());
        let processed_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("processed_color_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let framebuffer = OffscreenFramebuffer {
            color_view: raw.create_view(&wgpu::TextureViewDescriptor {
                label: Some("offscreen_framebuffer_color"),
                base_mip_level: 0,
                mip_level_count: Some(1),
                ..Default::default()
            }),
            size: camera_resolution,
        };

        info!(
            %camera_resolution,
            mip_levels = camera_resolution.mip_level_count(),
            "Texture set allocated"
        );

        Ok(Self {
            gpu: gpu.clone(),
            camera_resolution,
            external,
            external_sampler,
            raw,
            raw_view,
            raw_sampler,
            processed,
            processed_view,
            processed_sampler,
            framebuffer,
            released: false,
        })
    }

    pub fn camera_resolution(&self) -> Resolution {
        self.camera_resolution
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Check the offscreen framebuffer can be rendered to this frame
    pub fn check_complete(&self) -> Result<&OffscreenFramebuffer, StageError> {
        if self.released {
            return Err(StageError::FramebufferIncomplete(
                "color attachment released".into(),
            ));
        }
        let attachment = Resolution::new(self.raw.width(), self.raw.height());
        if self.framebuffer.size != attachment || attachment.is_empty() {
            return Err(StageError::FramebufferIncomplete(format!(
                "attachment is {} but framebuffer expects {}",
                attachment, self.framebuffer.size
            )));
        }
        Ok(&self.framebuffer)
    }

    /// Copy a camera frame into the external texture
    ///
    /// Returns true if the external texture had to be reallocated, in which
    /// case bind groups referencing it must be rebuilt.
    pub fn upload_frame(&mut self, frame: &CameraFrame) -> Result<bool, StageError> {
        if self.released {
            return Err(StageError::Released);
        }
        if !frame.is_well_formed() {
            return Err(StageError::TextureUpdate(format!(
                "frame {:?} does not hold {} RGBA pixels",
                frame,
                frame.resolution()
            )));
        }
        let size = frame.resolution();
        if size.width > self.gpu.info().max_texture_dimension_2d
            || size.height > self.gpu.info().max_texture_dimension_2d
        {
            return Err(StageError::TextureUpdate(format!(
                "frame {} exceeds device texture limit",
                size
            )));
        }

        let reallocated = self.external.dims.needs_update(size);
        if reallocated {
            debug!(from = %self.external.dims.resolution(), to = %size, "Resizing external texture");
            self.external.texture.destroy();
            self.external = create_external(self.gpu.device(), size);
        }

        self.gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.external.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * BYTES_PER_PIXEL),
                rows_per_image: Some(size.height),
            },
            size.extent(),
        );
        Ok(reallocated)
    }

    pub fn external_size(&self) -> Resolution {
        self.external.dims.resolution()
    }

    pub fn external_view(&self) -> &wgpu::TextureView {
        &self.external.view
    }

    pub fn external_sampler(&self) -> &wgpu::Sampler {
        &self.external_sampler
    }

    pub fn raw_texture(&self) -> &wgpu::Texture {
        &self.raw
    }

    pub fn raw_view(&self) -> &wgpu::TextureView {
        &self.raw_view
    }

    pub fn raw_sampler(&self) -> &wgpu::Sampler {
        &self.raw_sampler
    }

    pub fn processed_texture(&self) -> &wgpu::Texture {
        &self.processed
    }

    pub fn processed_view(&self) -> &wgpu::TextureView {
        &self.processed_view
    }

    pub fn processed_sampler(&self) -> &wgpu::Sampler {
        &self.processed_sampler
    }

    /// Free all textures. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.external.texture.destroy();
        self.raw.destroy();
        self.processed.destroy();
        self.released = true;
        info!(camera_resolution = %self.camera_resolution, "Texture set released");
    }
}

impl Drop for TextureSet {
    fn drop(&mut self) {
        self.release();
    }
}

/// Reject sizes the device can't allocate
pub fn check_dimensions(gpu: &GpuContext, resolution: Resolution) -> PipelineResult<()> {
    if resolution.is_empty() {
        return Err(PipelineError::ResourceAllocation(format!(
            "camera resolution {} has a zero dimension",
            resolution
        )));
    }
    let max = gpu.info().max_texture_dimension_2d;
    if resolution.width > max || resolution.height > max {
        return Err(PipelineError::ResourceAllocation(format!(
            "camera resolution {} exceeds device limit {}x{}",
            resolution, max, max
        )));
    }
    Ok(())
}

fn create_external(device: &wgpu::Device, size: Resolution) -> ExternalTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("external_camera_texture"),
        size: size.extent(),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    ExternalTexture {
        texture,
        view,
        dims: CachedDimensions::new(size.width, size.height),
    }
}
