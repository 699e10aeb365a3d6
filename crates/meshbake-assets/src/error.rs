use std::path::PathBuf;

use meshbake_core::MeshError;

/// Errors that can occur while reading a source asset or writing textures.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load glTF file '{0}': {1}")]
    GltfLoadFailed(PathBuf, String),

    #[error("mesh {mesh} primitive {primitive}: {reason}")]
    InvalidPrimitive {
        mesh: usize,
        primitive: usize,
        reason: String,
    },

    #[error("mesh {mesh} primitive {primitive}: {attribute} has {actual} elements, expected {expected}")]
    AttributeCountMismatch {
        mesh: usize,
        primitive: usize,
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("'{0}' contains no triangle geometry")]
    NoGeometry(PathBuf),

    #[error("tangent generation failed for mesh {mesh} primitive {primitive}")]
    TangentGenerationFailed { mesh: usize, primitive: usize },

    #[error("failed to encode texture '{0}': {1}")]
    TextureEncodeFailed(String, String),

    #[error("I/O error on '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}
