use meshbake_assets::AssetError;
use meshbake_core::MeshError;

/// Errors that abort a conversion run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("mesh has no submeshes")]
    EmptyMesh,

    #[error("merging produced no submeshes")]
    EmptyMerge,

    #[error("invalid meshlet limits: {0}")]
    InvalidMeshletLimits(String),

    #[error("submesh {submesh} cluster {cluster}: {reason}")]
    ClusterOutOfBounds {
        submesh: usize,
        cluster: usize,
        reason: String,
    },

    #[error("submesh {submesh}: meshlet index buffer differs from the index buffer at {mismatched} positions")]
    MeshletIndexMismatch { submesh: usize, mismatched: usize },

    #[error("{buffer} buffer exceeds the 32-bit offset range")]
    BufferOverflow { buffer: &'static str },

    #[error("inconsistent buffer layout: {0}")]
    LayoutInconsistent(String),

    #[error("vertex buffer rejected by the optimizer: {0}")]
    VertexAdapter(String),

    #[error("failed to encode mesh record: {0}")]
    Encode(String),

    #[error("failed to decode mesh record: {0}")]
    Decode(String),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}
