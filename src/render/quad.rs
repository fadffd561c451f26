// SPDX-License-Identifier: GPL-3.0-only

//! Full-screen quad geometry and the textured-quad render pipeline

use crate::constants::quad;
use crate::shaders::{QUAD_SHADER, create_shader_module};
use wgpu::util::DeviceExt;

/// Texture coordinate set bound at vertex location 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexCoordSet {
    /// Camera orientation, used by the capture pass
    Camera,
    /// Engine orientation (vertically flipped), used by the composite pass
    Engine,
}

/// Vertex buffers shared by both passes
pub struct QuadGeometry {
    positions: wgpu::Buffer,
    camera_tex_coords: wgpu::Buffer,
    engine_tex_coords: wgpu::Buffer,
}

impl QuadGeometry {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = |label: &str, data: &[[f32; 2]; 4]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            })
        };
        Self {
            positions: buffer("quad_positions", &quad::POSITIONS),
            camera_tex_coords: buffer("quad_camera_tex_coords", &quad::CAMERA_TEX_COORDS),
            engine_tex_coords: buffer("quad_engine_tex_coords", &quad::ENGINE_TEX_COORDS),
        }
    }

    fn tex_coords(&self, set: TexCoordSet) -> &wgpu::Buffer {
        match set {
            TexCoordSet::Camera => &self.camera_tex_coords,
            TexCoordSet::Engine => &self.engine_tex_coords,
        }
    }
}

const VEC2_LAYOUT: [wgpu::VertexBufferLayout<'static>; 2] = [
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: 0,
        }],
    },
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: 1,
        }],
    },
];

/// Render pipeline drawing one sampled texture over the whole viewport
pub struct QuadPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl QuadPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, label: &str) -> Self {
        let shader = create_shader_module(device, "quad_shader", QUAD_SHADER);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &VEC2_LAYOUT,
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Record the quad draw into an open render pass
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        geometry: &QuadGeometry,
        bind_group: &wgpu::BindGroup,
        tex_coords: TexCoordSet,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, geometry.positions.slice(..));
        pass.set_vertex_buffer(1, geometry.tex_coords(tex_coords).slice(..));
        pass.draw(0..quad::VERTEX_COUNT, 0..1);
    }
}
