use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::meshlet::{ClusterPartitioner, MeshletLimits, MeshoptPartitioner, ScanPartitioner};

/// Which stages run and how meshlets are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Merge submeshes that share a material.
    pub merge: bool,
    /// Run vertex/index optimization.
    pub optimize: bool,
    /// Build meshlets and their culling data.
    pub meshlets: bool,
    pub meshlet: MeshletConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge: true,
            optimize: true,
            meshlets: false,
            meshlet: MeshletConfig::default(),
        }
    }
}

/// Cluster partitioning algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionerKind {
    /// Greedy in-order scan; meshlets reproduce the index buffer exactly.
    #[default]
    Scan,
    /// Spatial clustering from meshoptimizer; reorders triangles.
    Meshopt,
}

/// Meshlet size limits and partitioning options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshletConfig {
    pub max_vertices: usize,
    pub max_triangles: usize,
    pub partitioner: PartitionerKind,
    /// Cone culling weight for the meshopt partitioner (0.0 - 1.0).
    pub cone_weight: f32,
    /// Fail instead of warn when meshlets do not reproduce the index buffer.
    pub strict_index_check: bool,
}

impl Default for MeshletConfig {
    fn default() -> Self {
        let limits = MeshletLimits::default();
        Self {
            max_vertices: limits.max_vertices,
            max_triangles: limits.max_triangles,
            partitioner: PartitionerKind::Scan,
            cone_weight: 0.0,
            strict_index_check: false,
        }
    }
}

impl MeshletConfig {
    pub fn limits(&self) -> MeshletLimits {
        MeshletLimits {
            max_vertices: self.max_vertices,
            max_triangles: self.max_triangles,
        }
    }

    /// Check limits and cone weight before any work is done.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.limits().validate()?;
        if !(0.0..=1.0).contains(&self.cone_weight) {
            return Err(PipelineError::InvalidMeshletLimits(format!(
                "cone_weight {} outside 0.0..=1.0",
                self.cone_weight
            )));
        }
        Ok(())
    }

    /// Instantiate the configured partitioner
    pub fn partitioner(&self) -> Box<dyn ClusterPartitioner> {
        match self.partitioner {
            PartitionerKind::Scan => Box::new(ScanPartitioner),
            PartitionerKind::Meshopt => Box::new(MeshoptPartitioner {
                cone_weight: self.cone_weight,
            }),
        }
    }
}
