//! Frame owner
//!
//! [`Spirit`] ties the simulation and the particle renderer together. It
//! keeps no timer of its own: the embedding loop calls [`Spirit::tick`] and
//! [`Spirit::render`] once per displayed frame.

use crate::camera::Camera;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::particles::ParticleRenderer;
use crate::simulator::{Simulator, Slot};
use spirit_core::{ParticleSettings, PendingAsset, Pointer, SimulationState, SpiritConfig};

/// Longest step a single tick may simulate, in seconds
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Background colour (#f5f5f5)
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 245.0 / 255.0,
    g: 245.0 / 255.0,
    b: 245.0 / 255.0,
    a: 1.0,
};

/// Clamped frame delta and running time
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    elapsed: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one frame; returns the clamped delta
    ///
    /// A long stall (window hidden, debugger) is simulated as a single
    /// [`MAX_FRAME_DELTA`] step.
    pub fn tick(&mut self, dt: f32) -> f32 {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_DELTA)
        } else {
            0.0
        };
        self.elapsed += dt;
        dt
    }

    /// Total simulated time in seconds
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Particle swarm: simulation, renderer and clock
pub struct Spirit {
    ctx: GpuContext,
    simulator: Simulator,
    particles: ParticleRenderer,
    clock: FrameClock,
}

impl Spirit {
    /// Build from configuration, starting the configured asset load
    pub fn new(
        ctx: &GpuContext,
        config: &SpiritConfig,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<Self> {
        let mut state = SimulationState::new(config)?;

        if let Some(path) = &config.asset.path {
            #[cfg(feature = "gltf")]
            {
                tracing::info!("Loading mesh asset from {}", path.display());
                state.attach(spirit_core::AssetLoader::spawn(path.clone())?);
            }
            #[cfg(not(feature = "gltf"))]
            tracing::warn!(
                "Built without glTF support; ignoring asset {}",
                path.display()
            );
        }

        Self::with_state(
            ctx,
            state,
            config.particles.clone(),
            color_format,
            depth_format,
        )
    }

    /// Build around an existing simulation state
    pub fn with_state(
        ctx: &GpuContext,
        state: SimulationState,
        particle_settings: ParticleSettings,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<Self> {
        let simulator = Simulator::new(ctx, state)?;
        let particles = ParticleRenderer::new(
            ctx,
            simulator.state().grid(),
            particle_settings,
            [simulator.texture(Slot::A), simulator.texture(Slot::B)],
            color_format,
            depth_format,
        )?;

        Ok(Self {
            ctx: ctx.clone(),
            simulator,
            particles,
            clock: FrameClock::new(),
        })
    }

    /// Follow an asset load started elsewhere
    pub fn attach(&mut self, pending: PendingAsset) {
        self.simulator.attach(pending);
    }

    /// Advance one frame
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        let dt = self.clock.tick(dt);
        self.simulator.advance(dt, self.clock.elapsed())?;
        self.particles.select(self.simulator.current());
        Ok(())
    }

    /// Same pointer for the simulation and the renderer
    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.simulator.set_pointer(pointer);
        self.particles.set_pointer(pointer);
    }

    /// Pointer left the canvas or the touch ended
    pub fn release_pointer(&mut self) {
        self.set_pointer(Pointer::NONE);
    }

    /// Record the particle pass, clearing colour and depth
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: Option<&wgpu::TextureView>,
        camera: &Camera,
    ) -> Result<()> {
        if self.particles.depth_format().is_some() != depth_view.is_some() {
            return Err(GpuError::InvalidTarget(
                "depth view must be given exactly when the renderer has a depth format".into(),
            ));
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Spirit Particle Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: depth_view.map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.particles
            .render(self.ctx.queue(), &mut render_pass, camera);
        Ok(())
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    pub fn particles(&self) -> &ParticleRenderer {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleRenderer {
        &mut self.particles
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Release every GPU texture
    pub fn dispose(self) {
        self.simulator.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_clamps_long_frames() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(0.016), 0.016);
        assert_eq!(clock.tick(2.5), MAX_FRAME_DELTA);
        assert!((clock.elapsed() - 0.116).abs() < 1e-6);
    }

    #[test]
    fn test_clock_ignores_bad_deltas() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(-1.0), 0.0);
        assert_eq!(clock.tick(f32::NAN), 0.0);
        assert_eq!(clock.elapsed(), 0.0);
    }
}
