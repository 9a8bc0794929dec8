//! Particle renderer
//!
//! Draws one screen-aligned quad per particle. The static instance buffer
//! holds only each particle's UV into the position texture; the vertex
//! shader fetches the actual position from the simulation output. Colour
//! follows [`ColorRamp`]: a three-stop gradient over the life phase, blended
//! towards the hover colour near the pointer.

use crate::camera::Camera;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::fbo::{RenderTarget, TextureSource};
use crate::shaders::PARTICLE_SHADER;
use crate::simulator::Slot;
use bytemuck::{Pod, Zeroable};
use spirit_core::{ColorRamp, ParticleGrid, ParticleSettings, Pointer};
use wgpu::util::DeviceExt;

/// Uniforms for the particle pass
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ParticleUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub color1: [f32; 4],
    pub color2: [f32; 4],
    pub color3: [f32; 4],
    pub hover_color: [f32; 4],
    /// xyz = pointer position, w = pointer strength
    pub mouse: [f32; 4],
    /// point size (px), hover radius, viewport width, viewport height
    pub params: [f32; 4],
}

impl Default for ParticleUniforms {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl ParticleUniforms {
    pub fn new(ramp: &ColorRamp, point_size: f32, pointer: Pointer, camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            color1: ramp.color1.to_array(),
            color2: ramp.color2.to_array(),
            color3: ramp.color3.to_array(),
            hover_color: ramp.hover.to_array(),
            mouse: [
                pointer.position.x,
                pointer.position.y,
                pointer.position.z,
                pointer.strength,
            ],
            params: [
                point_size,
                ramp.hover_radius,
                camera.viewport.x,
                camera.viewport.y,
            ],
        }
    }
}

/// Instanced point renderer reading the current position texture
pub struct ParticleRenderer {
    /// Appearance, read every frame
    pub settings: ParticleSettings,
    grid: ParticleGrid,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    /// One UV per particle, fixed for the renderer's lifetime
    instance_buffer: wgpu::Buffer,
    /// One bind group per position texture, indexed by [`Slot`]
    bind_groups: [wgpu::BindGroup; 2],
    slot: Slot,
    pointer: Pointer,
    depth_format: Option<wgpu::TextureFormat>,
}

impl ParticleRenderer {
    /// Create the renderer over both position textures, drawing from slot A
    ///
    /// `positions` is indexed by [`Slot`]. With a `depth_format` the pass
    /// depth-tests against the scene without writing depth.
    pub fn new(
        ctx: &GpuContext,
        grid: ParticleGrid,
        settings: ParticleSettings,
        positions: [&RenderTarget; 2],
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<Self> {
        for texture in positions {
            if texture.width() != grid.size() || texture.height() != grid.size() {
                return Err(GpuError::InvalidTarget(format!(
                    "position texture is {}x{}, renderer expects {}x{}",
                    texture.width(),
                    texture.height(),
                    grid.size(),
                    grid.size()
                )));
            }
        }

        let (pipeline, bind_group_layout, uniform_buffer, instance_buffer) =
            ctx.scoped("particle pipeline", |device| {
                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("Spirit Particle Shader"),
                    source: wgpu::ShaderSource::Wgsl(PARTICLE_SHADER.into()),
                });

                let bind_group_layout =
                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("Spirit Particle Bind Group Layout"),
                        entries: &[
                            // Uniforms
                            wgpu::BindGroupLayoutEntry {
                                binding: 0,
                                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                                ty: wgpu::BindingType::Buffer {
                                    ty: wgpu::BufferBindingType::Uniform,
                                    has_dynamic_offset: false,
                                    min_binding_size: None,
                                },
                                count: None,
                            },
                            // Position texture
                            wgpu::BindGroupLayoutEntry {
                                binding: 1,
                                visibility: wgpu::ShaderStages::VERTEX,
                                ty: wgpu::BindingType::Texture {
                                    sample_type: wgpu::TextureSampleType::Float {
                                        filterable: false,
                                    },
                                    view_dimension: wgpu::TextureViewDimension::D2,
                                    multisampled: false,
                                },
                                count: None,
                            },
                            // Nearest sampler
                            wgpu::BindGroupLayoutEntry {
                                binding: 2,
                                visibility: wgpu::ShaderStages::VERTEX,
                                ty: wgpu::BindingType::Sampler(
                                    wgpu::SamplerBindingType::NonFiltering,
                                ),
                                count: None,
                            },
                        ],
                    });

                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("Spirit Particle Pipeline Layout"),
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    });

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Spirit Particle Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[wgpu::VertexBufferLayout {
                            array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                            step_mode: wgpu::VertexStepMode::Instance,
                            attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                        }],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: color_format,
                            blend: Some(wgpu::BlendState {
                                color: wgpu::BlendComponent {
                                    src_factor: wgpu::BlendFactor::SrcAlpha,
                                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                                    operation: wgpu::BlendOperation::Add,
                                },
                                alpha: wgpu::BlendComponent {
                                    src_factor: wgpu::BlendFactor::One,
                                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                                    operation: wgpu::BlendOperation::Add,
                                },
                            }),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                        format,
                        depth_write_enabled: false,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Spirit Particle Uniforms"),
                    size: std::mem::size_of::<ParticleUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Spirit Particle UVs"),
                    contents: bytemuck::cast_slice(&grid.uv_buffer()),
                    usage: wgpu::BufferUsages::VERTEX,
                });

                (pipeline, bind_group_layout, uniform_buffer, instance_buffer)
            })?;

        let bind_groups = [
            Self::create_bind_group(ctx, &bind_group_layout, &uniform_buffer, positions[0])?,
            Self::create_bind_group(ctx, &bind_group_layout, &uniform_buffer, positions[1])?,
        ];

        Ok(Self {
            settings,
            grid,
            pipeline,
            uniform_buffer,
            instance_buffer,
            bind_groups,
            slot: Slot::A,
            pointer: Pointer::NONE,
            depth_format,
        })
    }

    fn create_bind_group(
        ctx: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        positions: &RenderTarget,
    ) -> Result<wgpu::BindGroup> {
        ctx.scoped("particle bind group", |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Spirit Particle Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(positions.view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(positions.sampler()),
                    },
                ],
            })
        })
    }

    /// Draw from the position texture in `slot`
    ///
    /// Must follow every simulation step, or the draw lags one tick behind.
    pub fn select(&mut self, slot: Slot) {
        self.slot = slot;
    }

    /// Slot the next draw reads from
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn pointer(&self) -> Pointer {
        self.pointer
    }

    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.pointer = pointer;
    }

    /// Number of quads drawn per frame
    pub fn instance_count(&self) -> u32 {
        self.grid.len() as u32
    }

    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.depth_format
    }

    /// Uniform values for the next frame
    pub fn uniforms(&self, camera: &Camera) -> ParticleUniforms {
        ParticleUniforms::new(
            &self.settings.ramp(),
            self.settings.point_size,
            self.pointer,
            camera,
        )
    }

    /// Upload uniforms and draw every particle
    pub fn render<'a>(
        &'a self,
        queue: &wgpu::Queue,
        render_pass: &mut wgpu::RenderPass<'a>,
        camera: &Camera,
    ) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms(camera)),
        );

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_groups[self.slot.index()], &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        // 6 vertices per quad, one instance per particle
        render_pass.draw(0..6, 0..self.instance_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_uniform_layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<ParticleUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 160);
    }

    #[test]
    fn test_uniforms_carry_pointer_and_colors() {
        let settings = ParticleSettings::default();
        let pointer = Pointer::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let uniforms = ParticleUniforms::new(
            &settings.ramp(),
            settings.point_size,
            pointer,
            &Camera::default(),
        );

        assert_eq!(uniforms.mouse, [1.0, 2.0, 3.0, 0.5]);
        assert_eq!(uniforms.color1, settings.color1.to_array());
        assert_eq!(uniforms.params[0], 1.6);
        assert_eq!(uniforms.params[1], 12.0);
        assert_eq!(uniforms.params[2..], [800.0, 600.0]);
    }
}
