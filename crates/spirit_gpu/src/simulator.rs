//! Ping-pong position simulation
//!
//! Two RGBA32F render targets, `A` and `B`, hold `(x, y, z, life)` per
//! particle. Every tick the simulation shader reads the current slot plus
//! the attraction targets and writes the other slot, then the roles swap.
//! Both bind groups are built once so a tick allocates nothing.

use crate::context::GpuContext;
use crate::error::Result;
use crate::fbo::{
    DataTexture, FboHelper, RenderTarget, RenderTargetOptions, ShaderProgram, STATE_FORMAT,
};
use crate::shaders::{COPY_SHADER, POSITION_SHADER};
use bytemuck::{Pod, Zeroable};
use spirit_core::{PendingAsset, Pointer, SimulationState, SimulatorSettings, SpiritConfig};

/// Uniforms for the copy pass
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CopyUniforms {
    /// xy = destination size
    pub resolution: [f32; 4],
}

/// Uniforms for the position simulation pass
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PositionUniforms {
    /// xy = resolution, z = elapsed time, w = init animation
    pub resolution_time: [f32; 4],
    /// speed, die speed, radius, curl size
    pub motion: [f32; 4],
    /// xyz = follow point, w = attraction
    pub follow_attraction: [f32; 4],
    /// xyz = pointer position, w = pointer strength
    pub mouse: [f32; 4],
}

impl Default for PositionUniforms {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl PositionUniforms {
    /// Snapshot of the state for one tick
    pub fn from_state(state: &SimulationState, elapsed: f32) -> Self {
        let size = state.grid().size() as f32;
        let s = &state.settings;
        let follow = state.follow_point();
        let pointer = state.pointer();

        Self {
            resolution_time: [size, size, elapsed, state.init_animation()],
            motion: [s.speed, s.die_speed, s.radius, s.curl_size],
            follow_attraction: [follow.x, follow.y, follow.z, s.attraction],
            mouse: [
                pointer.position.x,
                pointer.position.y,
                pointer.position.z,
                pointer.strength,
            ],
        }
    }
}

/// One of the two position textures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// The slot that is not `self`
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// GPU position simulation driven by a [`SimulationState`]
pub struct Simulator {
    fbo: FboHelper,
    state: SimulationState,
    /// Position textures, indexed by [`Slot`]
    positions: [RenderTarget; 2],
    /// Attraction targets mirrored from the state
    default_positions: DataTexture,
    program: ShaderProgram<PositionUniforms>,
    /// Bind group reading slot A (writes B) and reading slot B (writes A)
    bind_groups: [wgpu::BindGroup; 2],
    current: Slot,
}

impl Simulator {
    /// Build the simulation from configuration
    pub fn from_config(ctx: &GpuContext, config: &SpiritConfig) -> Result<Self> {
        Self::new(ctx, SimulationState::new(config)?)
    }

    /// Allocate textures and seed both slots from the state's targets
    pub fn new(ctx: &GpuContext, mut state: SimulationState) -> Result<Self> {
        let fbo = FboHelper::new(ctx.clone());
        let size = state.grid().size();

        let positions = [
            fbo.create_render_target(size, size, RenderTargetOptions::default())?,
            fbo.create_render_target(size, size, RenderTargetOptions::default())?,
        ];

        let mut default_positions = fbo.create_data_texture(state.targets().to_vec(), size, size)?;
        default_positions.upload(ctx.queue());
        state.mark_uploaded();

        // Seed both slots so neither starts from uninitialised memory
        let copy = fbo.create_program::<CopyUniforms>("Spirit Copy", COPY_SHADER, 1, STATE_FORMAT)?;
        copy.set_uniforms(
            ctx.queue(),
            &CopyUniforms {
                resolution: [size as f32, size as f32, 0.0, 0.0],
            },
        );
        let copy_bind_group = copy.bind(ctx, &[&default_positions])?;
        for target in &positions {
            fbo.render(&copy, &copy_bind_group, Some(target))?;
        }

        let program = fbo.create_program::<PositionUniforms>(
            "Spirit Position Simulation",
            POSITION_SHADER,
            2,
            STATE_FORMAT,
        )?;
        let bind_groups = [
            program.bind(ctx, &[&positions[0], &default_positions])?,
            program.bind(ctx, &[&positions[1], &default_positions])?,
        ];

        tracing::info!(
            "Simulator: {} particles in {}x{} position textures",
            state.grid().len(),
            size,
            size
        );

        Ok(Self {
            fbo,
            state,
            positions,
            default_positions,
            program,
            bind_groups,
            current: Slot::A,
        })
    }

    /// Run one simulation step
    ///
    /// `elapsed` is the total running time fed to the noise field.
    pub fn advance(&mut self, dt: f32, elapsed: f32) -> Result<()> {
        let queue = self.fbo.context().queue().clone();

        self.state.advance(dt);
        if self.state.targets_dirty() {
            self.default_positions.set_data(self.state.targets())?;
            self.state.mark_uploaded();
        }
        self.default_positions.upload(&queue);

        let previous = self.current;
        let next = previous.other();

        self.program
            .set_uniforms(&queue, &PositionUniforms::from_state(&self.state, elapsed));
        self.fbo.render(
            &self.program,
            &self.bind_groups[previous.index()],
            Some(&self.positions[next.index()]),
        )?;

        self.current = next;
        Ok(())
    }

    /// Slot holding the most recently completed step
    pub fn current(&self) -> Slot {
        self.current
    }

    /// Texture holding the most recently completed step
    pub fn position_texture(&self) -> &RenderTarget {
        self.texture(self.current)
    }

    pub fn texture(&self, slot: Slot) -> &RenderTarget {
        &self.positions[slot.index()]
    }

    /// Attraction targets as last uploaded
    pub fn default_positions(&self) -> &DataTexture {
        &self.default_positions
    }

    /// Side length of the position textures
    pub fn size(&self) -> u32 {
        self.state.grid().size()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// Live tunables, applied on the next tick
    pub fn settings_mut(&mut self) -> &mut SimulatorSettings {
        &mut self.state.settings
    }

    /// Start following an asset load
    pub fn attach(&mut self, pending: PendingAsset) {
        self.state.attach(pending);
    }

    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.state.set_pointer(pointer);
    }

    /// Release every texture now
    pub fn dispose(self) {
        for target in &self.positions {
            target.destroy();
        }
        self.default_positions.destroy();
        tracing::debug!("Simulator disposed");
    }
}
