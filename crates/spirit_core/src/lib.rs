//! Spirit Core
//!
//! GPU-free half of the Spirit particle swarm:
//!
//! - **Surface sampling**: area-weighted random points on a morphing mesh
//! - **Morph playback**: keyframed morph weights looped at a fixed period
//! - **Fallback shapes**: sphere, horse silhouette and image-driven targets
//! - **Simulation state**: start-up fade, follow point, asset lifecycle and
//!   the target buffer uploaded to the GPU every tick
//! - **Configuration**: TOML settings with defaults for every field
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use spirit_core::{MeshSource, SurfaceSampler};
//!
//! let mesh = MeshSource::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
//! let sampler = SurfaceSampler::new(mesh).unwrap();
//!
//! // (x, y, z, seed) per point
//! let records = sampler.sample(1024, &mut StdRng::seed_from_u64(0));
//! assert_eq!(records.len(), 1024 * 4);
//! ```

pub mod animation;
pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod loader;
pub mod mesh;
pub mod pointer;
pub mod sampler;
pub mod shapes;
pub mod state;

pub use animation::{Interpolation, MorphClip, MorphPlayer, DEFAULT_PLAYBACK_PERIOD};
pub use color::{smoothstep, Color, ColorRamp};
pub use config::{
    AssetSettings, FallbackShape, GroupTransform, ParticleSettings, SimulatorSettings,
    SpiritConfig,
};
pub use error::{Result, SpiritError};
pub use grid::{ParticleGrid, MAX_GRID_SIZE};
#[cfg(feature = "gltf")]
pub use loader::{load_gltf, load_gltf_slice};
pub use loader::{AssetLoader, AssetStatus, PendingAsset, SurfaceAsset};
pub use mesh::MeshSource;
pub use pointer::Pointer;
pub use sampler::{FaceAreaTable, SurfaceSample, SurfaceSampler, RECORD_STRIDE};
pub use state::{AssetPhase, SimulationState};
