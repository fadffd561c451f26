// SPDX-License-Identifier: GPL-3.0-only

//! On-screen target of the composite pass
//!
//! Either a presentation surface supplied by a windowed host, or an offscreen
//! texture of display size (headless host, snapshots and tests).

use crate::backends::camera::Resolution;
use crate::constants::gpu::OFFSCREEN_DISPLAY_FORMAT;
use crate::errors::StageError;
use crate::gpu::GpuContext;
use tracing::{debug, warn};

pub enum DisplayTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

/// A frame acquired from the display target
pub struct DisplayFrame {
    view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl DisplayFrame {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Hand a surface frame to the compositor (no-op offscreen)
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

impl DisplayTarget {
    /// Offscreen colour target of `size`
    pub fn offscreen(gpu: &GpuContext, size: Resolution) -> Self {
        let (texture, view) = create_offscreen(gpu.device(), size);
        DisplayTarget::Offscreen { texture, view }
    }

    /// Configure a host surface for presentation
    pub fn from_surface(
        gpu: &GpuContext,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        surface.configure(gpu.device(), &config);
        DisplayTarget::Surface { surface, config }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            DisplayTarget::Surface { config, .. } => config.format,
            DisplayTarget::Offscreen { texture, .. } => texture.format(),
        }
    }

    pub fn size(&self) -> Resolution {
        match self {
            DisplayTarget::Surface { config, .. } => Resolution::new(config.width, config.height),
            DisplayTarget::Offscreen { texture, .. } => {
                Resolution::new(texture.width(), texture.height())
            }
        }
    }

    /// Match the target to a new display size
    pub fn resize(&mut self, gpu: &GpuContext, size: Resolution) -> Result<(), StageError> {
        if size.is_empty() {
            return Err(StageError::Surface(format!(
                "display size {} has a zero dimension",
                size
            )));
        }
        if size == self.size() {
            return Ok(());
        }

        match self {
            DisplayTarget::Surface { surface, config } => {
                config.width = size.width;
                config.height = size.height;
                surface.configure(gpu.device(), config);
            }
            DisplayTarget::Offscreen { texture, view } => {
                texture.destroy();
                let (new_texture, new_view) = create_offscreen(gpu.device(), size);
                *texture = new_texture;
                *view = new_view;
            }
        }
        debug!(%size, "Display target resized");
        Ok(())
    }

    /// Get the view to draw this frame into
    pub fn acquire(&mut self, gpu: &GpuContext) -> Result<DisplayFrame, StageError> {
        match self {
            DisplayTarget::Surface { surface, config } => {
                let surface_texture = match surface.get_current_texture() {
                    Ok(texture) => texture,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        warn!("Surface lost or outdated, reconfiguring");
                        surface.configure(gpu.device(), config);
                        surface
                            .get_current_texture()
                            .map_err(|e| StageError::Surface(e.to_string()))?
                    }
                    Err(e) => return Err(StageError::Surface(e.to_string())),
                };
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(DisplayFrame {
                    view,
                    surface_texture: Some(surface_texture),
                })
            }
            DisplayTarget::Offscreen { view, .. } => Ok(DisplayFrame {
                view: view.clone(),
                surface_texture: None,
            }),
        }
    }

    /// Offscreen colour texture, if this is not a surface
    pub fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        match self {
            DisplayTarget::Offscreen { texture, .. } => Some(texture),
            DisplayTarget::Surface { .. } => None,
        }
    }

    pub fn release(&mut self) {
        if let DisplayTarget::Offscreen { texture, .. } = self {
            texture.destroy();
        }
    }
}

fn create_offscreen(device: &wgpu::Device, size: Resolution) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen_display"),
        size: size.extent(),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_DISPLAY_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
