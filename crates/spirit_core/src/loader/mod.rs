//! Background mesh asset loading
//!
//! Loading runs on its own thread and reports through a one-shot channel.
//! The frame loop polls the [`PendingAsset`] handle without ever blocking,
//! so a slow or failing load only delays the switch away from the fallback
//! shape.

#[cfg(feature = "gltf")]
mod gltf_asset;

#[cfg(feature = "gltf")]
pub use gltf_asset::{load_gltf, load_gltf_slice};

use crate::animation::MorphClip;
use crate::error::{Result, SpiritError};
use crate::mesh::MeshSource;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// A loaded mesh and its optional morph animation
#[derive(Clone, Debug)]
pub struct SurfaceAsset {
    pub mesh: MeshSource,
    pub clip: Option<MorphClip>,
}

impl SurfaceAsset {
    /// Asset without animation
    pub fn from_mesh(mesh: MeshSource) -> Self {
        Self { mesh, clip: None }
    }
}

/// Result of polling a [`PendingAsset`]
#[derive(Debug)]
pub enum AssetStatus {
    /// Still loading
    Pending,
    /// Loaded successfully
    Ready(SurfaceAsset),
    /// Load failed
    Failed(SpiritError),
}

enum PendingState {
    Waiting(Receiver<Result<SurfaceAsset>>),
    Resolved(Result<SurfaceAsset>),
    Never,
    Spent,
}

/// One-shot handle to an asset load
///
/// The outcome is delivered exactly once; polling a spent handle reports
/// [`AssetStatus::Failed`].
pub struct PendingAsset {
    state: PendingState,
}

impl PendingAsset {
    /// Handle that is already resolved
    pub fn from_result(result: Result<SurfaceAsset>) -> Self {
        Self {
            state: PendingState::Resolved(result),
        }
    }

    /// Handle that never resolves
    pub fn never() -> Self {
        Self {
            state: PendingState::Never,
        }
    }

    /// Check for a result without blocking
    pub fn poll(&mut self) -> AssetStatus {
        let result = match std::mem::replace(&mut self.state, PendingState::Spent) {
            PendingState::Waiting(rx) => match rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => {
                    self.state = PendingState::Waiting(rx);
                    return AssetStatus::Pending;
                }
                Err(TryRecvError::Disconnected) => Err(SpiritError::Asset(
                    "loader thread exited without a result".into(),
                )),
            },
            PendingState::Resolved(result) => result,
            PendingState::Never => {
                self.state = PendingState::Never;
                return AssetStatus::Pending;
            }
            PendingState::Spent => {
                return AssetStatus::Failed(SpiritError::Asset(
                    "asset result already delivered".into(),
                ))
            }
        };

        match result {
            Ok(asset) => AssetStatus::Ready(asset),
            Err(err) => AssetStatus::Failed(err),
        }
    }

    /// Block until the load finishes
    pub fn wait(self) -> Result<SurfaceAsset> {
        match self.state {
            PendingState::Waiting(rx) => rx.recv().unwrap_or_else(|_| {
                Err(SpiritError::Asset(
                    "loader thread exited without a result".into(),
                ))
            }),
            PendingState::Resolved(result) => result,
            PendingState::Never => Err(SpiritError::Asset("asset will never resolve".into())),
            PendingState::Spent => Err(SpiritError::Asset(
                "asset result already delivered".into(),
            )),
        }
    }
}

/// Spawns asset loads on background threads
pub struct AssetLoader;

impl AssetLoader {
    /// Load a glTF/GLB file in the background
    #[cfg(feature = "gltf")]
    pub fn spawn(path: impl Into<std::path::PathBuf>) -> Result<PendingAsset> {
        let path = path.into();
        Self::spawn_with(move || load_gltf(&path))
    }

    /// Run an arbitrary loader in the background
    pub fn spawn_with<F>(load: F) -> Result<PendingAsset>
    where
        F: FnOnce() -> Result<SurfaceAsset> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("spirit-asset-loader".into())
            .spawn(move || {
                // Receiver may be gone if the owner was dropped mid-load
                let _ = tx.send(load());
            })?;

        Ok(PendingAsset {
            state: PendingState::Waiting(rx),
        })
    }
}
