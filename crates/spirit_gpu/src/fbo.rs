//! Off-screen render driver
//!
//! Runs full-screen fragment programs into floating-point render targets.
//! Nothing here holds a "current render target": each pass names its
//! destination explicitly, so a pass cannot leak its destination into the
//! next one.
//!
//! - [`RenderTarget`]: GPU-written image, nearest filtering, no depth by default
//! - [`DataTexture`]: CPU float buffer mirrored to the GPU on demand
//! - [`ShaderProgram`]: full-screen pipeline with a typed uniform block

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::shaders::FULLSCREEN_VERTEX_SHADER;
use bytemuck::Pod;
use std::marker::PhantomData;

/// Format used for position state
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Bytes per texel of [`STATE_FORMAT`]
const STATE_TEXEL_BYTES: u32 = 16;

/// Anything a shader program can read as an input texture
pub trait TextureSource {
    fn view(&self) -> &wgpu::TextureView;
    fn size(&self) -> (u32, u32);
}

// ============================================================================
// Render targets
// ============================================================================

/// Overrides for [`FboHelper::create_render_target`]
#[derive(Clone, Copy, Debug)]
pub struct RenderTargetOptions {
    pub min_filter: wgpu::FilterMode,
    pub mag_filter: wgpu::FilterMode,
    pub format: wgpu::TextureFormat,
    /// Allocate a depth/stencil attachment alongside the colour image
    pub depth_stencil: bool,
}

impl Default for RenderTargetOptions {
    fn default() -> Self {
        Self {
            min_filter: wgpu::FilterMode::Nearest,
            mag_filter: wgpu::FilterMode::Nearest,
            format: STATE_FORMAT,
            depth_stencil: false,
        }
    }
}

/// Off-screen colour image a program can render into
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    depth: Option<(wgpu::Texture, wgpu::TextureView)>,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Sampler honouring the target's filter options
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref().map(|(_, view)| view)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Copy the image back to the CPU (RGBA32F targets only)
    ///
    /// Blocks until the GPU has finished every submitted pass.
    pub fn read_pixels(&self, ctx: &GpuContext) -> Result<Vec<f32>> {
        if self.format != STATE_FORMAT {
            return Err(GpuError::InvalidTarget(format!(
                "read back requires {:?}, target is {:?}",
                STATE_FORMAT, self.format
            )));
        }

        let device = ctx.device();
        let unpadded = self.width * STATE_TEXEL_BYTES;
        let bytes_per_row = padded_bytes_per_row(unpadded);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Spirit Readback Buffer"),
            size: (bytes_per_row * self.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Spirit Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        ctx.queue().submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::Resource("readback callback dropped".into()))?
            .map_err(|e| GpuError::Resource(format!("failed to map readback buffer: {}", e)))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in 0..self.height {
            let start = (row * bytes_per_row) as usize;
            let end = start + unpadded as usize;
            pixels.extend(
                data[start..end]
                    .chunks_exact(4)
                    .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
            );
        }
        drop(data);
        buffer.unmap();

        Ok(pixels)
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Release the GPU memory now instead of on drop
    pub fn destroy(&self) {
        self.texture.destroy();
        if let Some((depth, _)) = &self.depth {
            depth.destroy();
        }
    }
}

impl TextureSource for RenderTarget {
    fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Row pitch rounded up to wgpu's copy alignment
fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

// ============================================================================
// Data textures
// ============================================================================

/// CPU-side RGBA32F buffer with a GPU mirror
///
/// Writes through [`data_mut`](Self::data_mut) or
/// [`set_data`](Self::set_data) mark the texture dirty; the next
/// [`upload`](Self::upload) copies it to the GPU.
pub struct DataTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    data: Vec<f32>,
    width: u32,
    height: u32,
    dirty: bool,
}

impl DataTexture {
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the backing buffer; marks the texture dirty
    pub fn data_mut(&mut self) -> &mut [f32] {
        self.dirty = true;
        &mut self.data
    }

    /// Overwrite the backing buffer in place
    pub fn set_data(&mut self, data: &[f32]) -> Result<()> {
        if data.len() != self.data.len() {
            return Err(GpuError::InvalidTarget(format!(
                "expected {} floats for a {}x{} texture, got {}",
                self.data.len(),
                self.width,
                self.height,
                data.len()
            )));
        }
        self.data.copy_from_slice(data);
        self.dirty = true;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Copy the buffer to the GPU if it changed; returns whether it did
    pub fn upload(&mut self, queue: &wgpu::Queue) -> bool {
        if !self.dirty {
            return false;
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&self.data),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.width * STATE_TEXEL_BYTES),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.dirty = false;
        true
    }

    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

impl TextureSource for DataTexture {
    fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// ============================================================================
// Shader programs
// ============================================================================

/// Full-screen program with a typed uniform block
///
/// Binding 0 is the `U` uniform buffer; bindings `1..=inputs` are
/// unfilterable float textures read with `textureLoad`. The program is
/// compiled for a single output format.
pub struct ShaderProgram<U: Pod> {
    label: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    inputs: u32,
    format: wgpu::TextureFormat,
    _uniforms: PhantomData<U>,
}

impl<U: Pod> ShaderProgram<U> {
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn input_count(&self) -> u32 {
        self.inputs
    }

    /// Stage new uniform values for the next submitted pass
    pub fn set_uniforms(&self, queue: &wgpu::Queue, uniforms: &U) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Bind input textures in binding order
    pub fn bind(&self, ctx: &GpuContext, inputs: &[&dyn TextureSource]) -> Result<wgpu::BindGroup> {
        if inputs.len() != self.inputs as usize {
            return Err(GpuError::Resource(format!(
                "{} expects {} input textures, got {}",
                self.label,
                self.inputs,
                inputs.len()
            )));
        }

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: self.uniform_buffer.as_entire_binding(),
        }];
        entries.extend(inputs.iter().enumerate().map(|(i, input)| wgpu::BindGroupEntry {
            binding: i as u32 + 1,
            resource: wgpu::BindingResource::TextureView(input.view()),
        }));

        ctx.scoped(&self.label, |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&self.label),
                layout: &self.bind_group_layout,
                entries: &entries,
            })
        })
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Screen destination for passes rendered without a target
struct ScreenView {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

/// Allocates off-screen images and runs full-screen passes
pub struct FboHelper {
    ctx: GpuContext,
    screen: Option<ScreenView>,
}

impl FboHelper {
    pub fn new(ctx: GpuContext) -> Self {
        Self { ctx, screen: None }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Bind or clear the view used by passes that have no target
    pub fn set_screen_view(&mut self, view: Option<(wgpu::TextureView, wgpu::TextureFormat)>) {
        self.screen = view.map(|(view, format)| ScreenView { view, format });
    }

    /// Allocate a render target, nearest-filtered RGBA32F with no depth by default
    pub fn create_render_target(
        &self,
        width: u32,
        height: u32,
        options: RenderTargetOptions,
    ) -> Result<RenderTarget> {
        self.validate_size(width, height)?;

        let features = self.ctx.format_features(options.format);
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC;
        if !features.allowed_usages.contains(usage) {
            return Err(GpuError::InvalidTarget(format!(
                "{:?} cannot be rendered to and sampled on this adapter",
                options.format
            )));
        }
        let linear = options.min_filter == wgpu::FilterMode::Linear
            || options.mag_filter == wgpu::FilterMode::Linear;
        if linear
            && !features
                .flags
                .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
        {
            return Err(GpuError::InvalidTarget(format!(
                "{:?} does not support linear filtering",
                options.format
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let target = self.ctx.scoped("render target", |device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Spirit Render Target"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: options.format,
                usage,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("Spirit Render Target Sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: options.mag_filter,
                min_filter: options.min_filter,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });

            let depth = options.depth_stencil.then(|| {
                let depth = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Spirit Render Target Depth"),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Depth24PlusStencil8,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                });
                let view = depth.create_view(&wgpu::TextureViewDescriptor::default());
                (depth, view)
            });

            RenderTarget {
                texture,
                view,
                sampler,
                depth,
                width,
                height,
                format: options.format,
            }
        })?;

        tracing::debug!(
            "Created {}x{} {:?} render target",
            width,
            height,
            options.format
        );
        Ok(target)
    }

    /// Wrap a CPU float buffer as an RGBA32F texture, dirty until uploaded
    pub fn create_data_texture(
        &self,
        data: Vec<f32>,
        width: u32,
        height: u32,
    ) -> Result<DataTexture> {
        self.validate_size(width, height)?;
        if data.len() != (width * height * 4) as usize {
            return Err(GpuError::InvalidTarget(format!(
                "expected {} floats for a {}x{} texture, got {}",
                width * height * 4,
                width,
                height,
                data.len()
            )));
        }

        let (texture, view) = self.ctx.scoped("data texture", |device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Spirit Data Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: STATE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        })?;

        Ok(DataTexture {
            texture,
            view,
            data,
            width,
            height,
            dirty: true,
        })
    }

    /// Compile a full-screen program from a fragment stage source
    ///
    /// `fragment` must define `fs_main` and declare its uniform block at
    /// binding 0 followed by `inputs` textures.
    pub fn create_program<U: Pod>(
        &self,
        label: &str,
        fragment: &str,
        inputs: u32,
        format: wgpu::TextureFormat,
    ) -> Result<ShaderProgram<U>> {
        let source = format!("{}\n{}", FULLSCREEN_VERTEX_SHADER, fragment);
        let uniform_size = std::mem::size_of::<U>() as u64;

        let (pipeline, bind_group_layout, uniform_buffer) = self.ctx.scoped(label, |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

            let mut entries = vec![
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ];
            // Input textures
            entries.extend((1..=inputs).map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }));

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
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
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    // State textures are overwritten, never blended
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: uniform_size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            (pipeline, bind_group_layout, uniform_buffer)
        })?;

        Ok(ShaderProgram {
            label: label.to_string(),
            pipeline,
            bind_group_layout,
            uniform_buffer,
            inputs,
            format,
            _uniforms: PhantomData,
        })
    }

    /// Record a full-screen pass into `encoder`
    ///
    /// Writes to `target`, or to the bound screen view when `target` is `None`.
    pub fn encode<U: Pod>(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        program: &ShaderProgram<U>,
        bind_group: &wgpu::BindGroup,
        target: Option<&RenderTarget>,
    ) -> Result<()> {
        let (view, format) = match (target, &self.screen) {
            (Some(target), _) => (&target.view, target.format),
            (None, Some(screen)) => (&screen.view, screen.format),
            (None, None) => return Err(GpuError::NoDestination),
        };
        if format != program.format {
            return Err(GpuError::InvalidTarget(format!(
                "{} renders {:?}, destination is {:?}",
                program.label, program.format, format
            )));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&program.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);

        Ok(())
    }

    /// Run one full-screen pass and submit it immediately
    pub fn render<U: Pod>(
        &self,
        program: &ShaderProgram<U>,
        bind_group: &wgpu::BindGroup,
        target: Option<&RenderTarget>,
    ) -> Result<()> {
        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Spirit FBO Encoder"),
            });
        self.encode(&mut encoder, program, bind_group, target)?;
        self.ctx.queue().submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn validate_size(&self, width: u32, height: u32) -> Result<()> {
        let max = self.ctx.device().limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(GpuError::InvalidTarget(format!(
                "size {}x{} outside 1..={}",
                width, height, max
            )));
        }
        Ok(())
    }
}
