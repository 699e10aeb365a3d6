//! Meshbake Pipeline - Mesh processing stages and output layout
//!
//! Stages run single-threaded in a fixed order over a [`meshbake_core::Mesh`]:
//! 1. Merge submeshes that share a material
//! 2. Deduplicate and reorder vertices and triangles
//! 3. Partition triangles into meshlets with culling bounds
//!
//! [`MeshLayout`] then flattens the result into draw-ready arrays.

mod config;
mod error;
pub mod layout;
pub mod merge;
pub mod meshlet;
pub mod optimize;
mod pipeline;

#[cfg(test)]
mod test_support;

pub use config::{MeshletConfig, PartitionerKind, PipelineConfig};
pub use error::PipelineError;
pub use layout::{LayoutSummary, MaterialRecord, MeshLayout, MeshletRecord, SubmeshRecord};
pub use merge::merge_submeshes;
pub use meshlet::{
    build_meshlets, pack_primitive, unpack_primitive, Cluster, ClusterPartitioner, MeshletLimits, MeshletStats,
    MeshoptPartitioner, ScanPartitioner,
};
pub use optimize::{optimize_submesh, optimize_submeshes};
pub use pipeline::{convert_file, process, Conversion, PipelineReport};
