//! Spirit GPU
//!
//! wgpu half of the Spirit particle swarm.
//!
//! # Features
//!
//! - **Off-screen driver**: full-screen passes into RGBA32F render targets,
//!   CPU data textures with dirty-tracked upload
//! - **Position simulation**: ping-pong textures stepped by a curl-noise
//!   shader with respawn, attraction and pointer repulsion
//! - **Particle renderer**: instanced quads positioned by texture lookup,
//!   gradient colouring with a pointer highlight
//! - **Frame owner**: [`Spirit`] exposes `tick` and `render` for an external
//!   frame loop
//!
//! # Example
//!
//! ```rust,no_run
//! use spirit_core::SpiritConfig;
//! use spirit_gpu::{Camera, GpuContext, Spirit};
//!
//! # fn main() -> spirit_gpu::Result<()> {
//! let ctx = GpuContext::headless_blocking()?;
//! let mut spirit = Spirit::new(
//!     &ctx,
//!     &SpiritConfig::default(),
//!     wgpu::TextureFormat::Rgba8UnormSrgb,
//!     None,
//! )?;
//!
//! spirit.tick(1.0 / 60.0)?;
//! # let view: wgpu::TextureView = unimplemented!();
//! let mut encoder = ctx
//!     .device()
//!     .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
//! spirit.render(&mut encoder, &view, None, &Camera::default())?;
//! ctx.queue().submit(Some(encoder.finish()));
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod context;
pub mod error;
pub mod fbo;
pub mod particles;
pub mod shaders;
pub mod simulator;
pub mod spirit;

pub use camera::Camera;
pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use fbo::{
    DataTexture, FboHelper, RenderTarget, RenderTargetOptions, ShaderProgram, TextureSource,
    STATE_FORMAT,
};
pub use particles::{ParticleRenderer, ParticleUniforms};
pub use shaders::{COPY_SHADER, FULLSCREEN_VERTEX_SHADER, PARTICLE_SHADER, POSITION_SHADER};
pub use simulator::{CopyUniforms, PositionUniforms, Simulator, Slot};
pub use spirit::{FrameClock, Spirit, CLEAR_COLOR, MAX_FRAME_DELTA};
