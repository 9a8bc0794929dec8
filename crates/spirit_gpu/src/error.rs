//! GPU error types

use spirit_core::SpiritError;
use thiserror::Error;

/// Errors raised while creating or driving GPU resources
#[derive(Debug, Error)]
pub enum GpuError {
    /// No adapter matched the request
    #[error("No suitable GPU adapter found")]
    AdapterNotFound,

    /// The adapter lacks a capability the simulation needs
    #[error("Unsupported GPU adapter: {0}")]
    UnsupportedAdapter(String),

    /// The adapter refused to create a device
    #[error("Failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// Allocation or validation failure reported by wgpu
    #[error("GPU resource error: {0}")]
    Resource(String),

    /// Render target options the format cannot honour
    #[error("Invalid render target: {0}")]
    InvalidTarget(String),

    /// A screen pass was requested with no screen view bound
    #[error("No render destination: pass a target or bind a screen view")]
    NoDestination,

    /// Error from the CPU-side simulation
    #[error(transparent)]
    Core(#[from] SpiritError),
}

pub type Result<T> = std::result::Result<T, GpuError>;
