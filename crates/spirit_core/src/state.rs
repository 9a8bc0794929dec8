//! CPU side of the position simulation
//!
//! [`SimulationState`] owns everything the simulation shader reads besides
//! the position textures: the target buffer (fallback shape or sampled
//! mesh), the start-up fade, the follow point and the pointer. It also
//! drives the asset lifecycle:
//!
//! ```text
//! Fallback ──attach──▶ Pending ──ready──▶ Loaded
//!                         │
//!                         └──failed──▶ Failed (fallback forever)
//! ```

use crate::animation::MorphPlayer;
use crate::config::{SimulatorSettings, SpiritConfig};
use crate::error::Result;
use crate::grid::ParticleGrid;
use crate::loader::{AssetStatus, PendingAsset, SurfaceAsset};
use crate::pointer::Pointer;
use crate::sampler::{transform_records, SurfaceSampler};
use crate::shapes::fallback_records;
use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Fade-in rate of motion and attraction after start-up (per second)
pub const INIT_ANIMATION_RATE: f32 = 0.5;

/// Follow-point pursuit factor per tick
pub const FOLLOW_SMOOTHING: f32 = 0.02;

/// Angular speed of the follow-point orbit
pub const FOLLOW_ORBIT_RATE: f32 = 0.3;

/// Where the attraction targets come from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetPhase {
    /// No asset requested
    Fallback,
    /// Asset load in flight
    Pending,
    /// Targets sampled from the mesh every tick
    Loaded,
    /// Asset failed; fallback shape kept permanently
    Failed,
}

struct LoadedSurface {
    sampler: SurfaceSampler,
    player: Option<MorphPlayer>,
    /// Group matrix composed with the mesh's own world matrix
    world: Mat4,
}

enum AssetSlot {
    None,
    Pending(PendingAsset),
    Loaded(Box<LoadedSurface>),
    Failed,
}

/// Per-tick state feeding the simulation shader
pub struct SimulationState {
    /// Live tunables, read every tick
    pub settings: SimulatorSettings,
    /// Drag the follow point with the pointer while no mesh is loaded
    pub follow_pointer: bool,
    grid: ParticleGrid,
    targets: Vec<f32>,
    targets_dirty: bool,
    init_animation: f32,
    follow_point: Vec3,
    follow_point_time: f32,
    pointer: Pointer,
    asset: AssetSlot,
    group_transform: Mat4,
    playback_period: f32,
    rng: StdRng,
}

impl SimulationState {
    /// Build the state with the configured fallback shape as targets
    pub fn new(config: &SpiritConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Same as [`new`](Self::new) with a deterministic random source
    pub fn with_rng(config: &SpiritConfig, mut rng: StdRng) -> Result<Self> {
        config.validate()?;

        let grid = ParticleGrid::for_count(config.simulator.amount);
        let targets = fallback_records(&config.fallback, grid.len(), &mut rng)?;

        tracing::debug!(
            "SimulationState: {} particles on a {}x{} grid",
            grid.len(),
            grid.size(),
            grid.size()
        );

        Ok(Self {
            settings: config.simulator.clone(),
            follow_pointer: config.follow_pointer,
            grid,
            targets,
            targets_dirty: true,
            init_animation: 0.0,
            follow_point: Vec3::ZERO,
            follow_point_time: 0.0,
            pointer: Pointer::NONE,
            asset: AssetSlot::None,
            group_transform: config.asset.group.matrix(),
            playback_period: config.asset.playback_duration,
            rng,
        })
    }

    /// Start waiting on an asset load
    ///
    /// Ignored once a mesh is loaded or a load has failed.
    pub fn attach(&mut self, pending: PendingAsset) {
        match self.asset {
            AssetSlot::None | AssetSlot::Pending(_) => {
                self.asset = AssetSlot::Pending(pending);
            }
            AssetSlot::Loaded(_) | AssetSlot::Failed => {
                tracing::warn!("Asset already resolved; ignoring new load");
            }
        }
    }

    /// Install a mesh right away
    ///
    /// A mesh without a sampleable surface is rejected and leaves the state
    /// untouched.
    pub fn set_asset(&mut self, asset: SurfaceAsset) -> Result<()> {
        let world = self.group_transform * asset.mesh.transform();
        let sampler = SurfaceSampler::new(asset.mesh)?;
        let player = match asset.clip {
            Some(clip) => Some(MorphPlayer::new(clip, self.playback_period)?),
            None => None,
        };

        self.asset = AssetSlot::Loaded(Box::new(LoadedSurface {
            sampler,
            player,
            world,
        }));
        self.resample();
        // restart the fade so the swarm eases onto the new shape
        self.init_animation = 0.0;

        tracing::info!("Mesh loaded; targets now follow the animated surface");
        Ok(())
    }

    /// Advance by `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        self.poll_asset();

        if let AssetSlot::Loaded(surface) = &mut self.asset {
            if let Some(player) = &mut surface.player {
                player.advance(dt);
                player.apply(surface.sampler.mesh_mut());
            }
        }
        self.resample();

        self.init_animation = (self.init_animation + dt * INIT_ANIMATION_RATE).min(1.0);
        self.update_follow_point(dt);
    }

    fn poll_asset(&mut self) {
        let AssetSlot::Pending(pending) = &mut self.asset else {
            return;
        };

        match pending.poll() {
            AssetStatus::Pending => {}
            AssetStatus::Ready(asset) => {
                if let Err(err) = self.set_asset(asset) {
                    tracing::error!("Loaded mesh is unusable, keeping fallback shape: {}", err);
                    self.asset = AssetSlot::Failed;
                }
            }
            AssetStatus::Failed(err) => {
                tracing::error!("Failed to load mesh, keeping fallback shape: {}", err);
                self.asset = AssetSlot::Failed;
            }
        }
    }

    fn resample(&mut self) {
        if let AssetSlot::Loaded(surface) = &self.asset {
            surface.sampler.sample_into(&mut self.targets, &mut self.rng);
            transform_records(&mut self.targets, surface.world);
            self.targets_dirty = true;
        }
    }

    fn update_follow_point(&mut self, dt: f32) {
        if self.phase() == AssetPhase::Loaded {
            self.follow_point = Vec3::ZERO;
            return;
        }

        if self.follow_pointer && self.pointer.is_active() {
            self.follow_point = self.pointer.position;
            return;
        }

        self.follow_point_time += dt * FOLLOW_ORBIT_RATE;
        let t = self.follow_point_time;
        let orbit = Vec3::new(t.cos() * 30.0, (t * 0.7).sin() * 20.0, (t * 0.5).sin() * 30.0);
        self.follow_point += (orbit - self.follow_point) * FOLLOW_SMOOTHING;
    }

    /// Current asset phase
    pub fn phase(&self) -> AssetPhase {
        match self.asset {
            AssetSlot::None => AssetPhase::Fallback,
            AssetSlot::Pending(_) => AssetPhase::Pending,
            AssetSlot::Loaded(_) => AssetPhase::Loaded,
            AssetSlot::Failed => AssetPhase::Failed,
        }
    }

    pub fn grid(&self) -> ParticleGrid {
        self.grid
    }

    /// Target records `(x, y, z, seed)`, one per grid slot
    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    /// Whether the targets changed since the last [`mark_uploaded`](Self::mark_uploaded)
    pub fn targets_dirty(&self) -> bool {
        self.targets_dirty
    }

    pub fn mark_uploaded(&mut self) {
        self.targets_dirty = false;
    }

    /// Start-up fade in `[0, 1]`
    pub fn init_animation(&self) -> f32 {
        self.init_animation
    }

    pub fn follow_point(&self) -> Vec3 {
        self.follow_point
    }

    pub fn pointer(&self) -> Pointer {
        self.pointer
    }

    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.pointer = pointer;
    }

    /// Morph weights currently applied to the mesh, if one is loaded
    pub fn morph_weights(&self) -> Option<&[f32]> {
        match &self.asset {
            AssetSlot::Loaded(surface) => Some(surface.sampler.mesh().influences()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Interpolation, MorphClip};
    use crate::config::{FallbackShape, GroupTransform};
    use crate::error::SpiritError;
    use crate::mesh::MeshSource;

    fn config(amount: u32) -> SpiritConfig {
        let mut config = SpiritConfig::default();
        config.simulator.amount = amount;
        config
    }

    fn state(amount: u32) -> SimulationState {
        SimulationState::with_rng(&config(amount), StdRng::seed_from_u64(17)).unwrap()
    }

    fn tetrahedron() -> MeshSource {
        MeshSource::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ])
        .with_indices(vec![0, 1, 2, 0, 1, 3, 0, 2, 3, 1, 2, 3])
    }

    #[test]
    fn test_fallback_targets_fill_grid() {
        let state = state(10);
        assert_eq!(state.grid().size(), 4);
        assert_eq!(state.targets().len(), 16 * 4);
        assert!(state.targets_dirty());
        assert_eq!(state.phase(), AssetPhase::Fallback);
    }

    #[test]
    fn test_init_animation_ramps_and_clamps() {
        let mut state = state(16);
        state.advance(0.5);
        assert!((state.init_animation() - 0.25).abs() < 1e-6);
        for _ in 0..10 {
            state.advance(0.5);
        }
        assert_eq!(state.init_animation(), 1.0);
    }

    #[test]
    fn test_follow_point_pursues_orbit() {
        let mut state = state(16);
        state.advance(0.1);

        let t = 0.1 * FOLLOW_ORBIT_RATE;
        let orbit = Vec3::new(t.cos() * 30.0, (t * 0.7).sin() * 20.0, (t * 0.5).sin() * 30.0);
        assert!((state.follow_point() - orbit * FOLLOW_SMOOTHING).length() < 1e-5);
    }

    #[test]
    fn test_follow_pointer_mode() {
        let mut state = state(16);
        state.follow_pointer = true;
        state.set_pointer(Pointer::at(Vec3::new(3.0, 4.0, 0.0)));
        state.advance(0.016);
        assert_eq!(state.follow_point(), Vec3::new(3.0, 4.0, 0.0));

        // released pointer falls back to the orbit
        state.set_pointer(Pointer::NONE);
        state.advance(0.016);
        assert_ne!(state.follow_point(), Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_pending_asset_behaves_like_fallback() {
        let mut waiting = state(16);
        let mut plain = state(16);
        waiting.attach(PendingAsset::never());

        for _ in 0..50 {
            waiting.advance(1.0 / 60.0);
            plain.advance(1.0 / 60.0);
        }

        assert_eq!(waiting.phase(), AssetPhase::Pending);
        assert_eq!(waiting.targets(), plain.targets());
        assert_eq!(waiting.follow_point(), plain.follow_point());
        assert_eq!(waiting.init_animation(), plain.init_animation());
    }

    #[test]
    fn test_failed_asset_keeps_fallback_for_good() {
        let mut state = state(16);
        let fallback = state.targets().to_vec();
        state.attach(PendingAsset::from_result(Err(SpiritError::Asset(
            "no mesh found".into(),
        ))));

        for _ in 0..100 {
            state.advance(1.0 / 60.0);
        }

        assert_eq!(state.phase(), AssetPhase::Failed);
        assert_eq!(state.targets(), fallback.as_slice());

        // no retry
        state.attach(PendingAsset::from_result(Ok(SurfaceAsset::from_mesh(tetrahedron()))));
        state.advance(1.0 / 60.0);
        assert_eq!(state.phase(), AssetPhase::Failed);
    }

    #[test]
    fn test_degenerate_asset_counts_as_failure() {
        let mut state = state(16);
        let flat = MeshSource::new(vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0]);
        state.attach(PendingAsset::from_result(Ok(SurfaceAsset::from_mesh(flat))));
        state.advance(0.016);
        assert_eq!(state.phase(), AssetPhase::Failed);
    }

    #[test]
    fn test_loaded_mesh_drives_targets() {
        let mut state = state(64);
        state.advance(1.0);
        state.mark_uploaded();

        state.attach(PendingAsset::from_result(Ok(SurfaceAsset::from_mesh(tetrahedron()))));
        state.advance(0.016);

        assert_eq!(state.phase(), AssetPhase::Loaded);
        assert!(state.targets_dirty());
        assert_eq!(state.follow_point(), Vec3::ZERO);
        assert!((state.init_animation() - 0.008).abs() < 1e-6);

        // every target lies on the tetrahedron after the group transform
        let inverse = GroupTransform::default().matrix().inverse();
        for record in state.targets().chunks_exact(4) {
            let p = inverse.transform_point3(Vec3::new(record[0], record[1], record[2]));
            assert!(p.min_element() >= -1e-4);
            assert!(p.x + p.y + p.z <= 1.0 + 1e-4);
        }
    }

    #[test]
    fn test_morph_animation_updates_weights() {
        let mesh = tetrahedron().with_morph_target(vec![Vec3::Y; 4]);
        let clip = MorphClip::new(
            "lift",
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            1,
            Interpolation::Linear,
        )
        .unwrap();

        let mut state = state(16);
        state
            .set_asset(SurfaceAsset {
                mesh,
                clip: Some(clip),
            })
            .unwrap();
        state.advance(0.5);
        let weights = state.morph_weights().unwrap();
        assert!((weights[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_image_fallback_missing_file_fails_construction() {
        let mut config = config(16);
        config.fallback = FallbackShape::Image {
            path: "missing.png".into(),
            threshold: 128,
            scale: 100.0,
        };
        assert!(SimulationState::with_rng(&config, StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn test_oversized_amount_fails_before_allocating() {
        let result = SimulationState::with_rng(&config(u32::MAX), StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(SpiritError::Config(_))));
    }
}
