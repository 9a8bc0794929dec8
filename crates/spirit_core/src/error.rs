//! Error types for spirit_core

use std::io;
use thiserror::Error;

/// Errors raised while building samplers, parsing configuration or loading assets
#[derive(Error, Debug)]
pub enum SpiritError {
    /// Settings failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Mesh has no sampleable surface (no triangles, zero or non-finite area)
    #[error("Degenerate mesh: {0}")]
    DegenerateMesh(String),

    /// Mesh data is inconsistent (bad indices, mismatched morph targets, ...)
    #[error("Invalid mesh data: {0}")]
    InvalidMesh(String),

    /// Asset could not be loaded or contains no usable mesh
    #[error("Asset error: {0}")]
    Asset(String),

    /// IO error when reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error
    #[error("Config parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for spirit_core operations
pub type Result<T> = std::result::Result<T, SpiritError>;
