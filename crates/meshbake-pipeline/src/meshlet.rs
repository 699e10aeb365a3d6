//! Meshlet construction
//!
//! A partitioner splits a submesh's triangle list into clusters of at most
//! `max_vertices` unique vertices and `max_triangles` triangles. Each
//! cluster is then flattened into the submesh's three meshlet buffers:
//!
//! - `meshlet_vertex_indices`: the cluster's unique vertices (submesh indices)
//! - `meshlet_packed_primitives`: one word per triangle, corners local to the
//!   cluster, packed as `(c2 << 20) | (c1 << 10) | c0`
//! - `meshlet_index_buffer`: every triangle corner resolved back to a submesh
//!   vertex index
//!
//! The last buffer is only used to check the clustering. With an
//! order-preserving partitioner it is identical to the submesh index buffer.

use meshbake_core::{compute_bounds, MeshError, Meshlet, NormalCone, Submesh, Vec3, Vertex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;

/// Typical mesh shader output limits.
pub const DEFAULT_MAX_VERTICES: usize = 64;
pub const DEFAULT_MAX_TRIANGLES: usize = 126;

/// Largest cluster the optimizer library accepts.
const MAX_VERTICES_LIMIT: usize = 256;
const MAX_TRIANGLES_LIMIT: usize = 512;

const PRIMITIVE_BITS: u32 = 10;
const PRIMITIVE_MASK: u32 = (1 << PRIMITIVE_BITS) - 1;

/// Upper bounds for a single cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshletLimits {
    pub max_vertices: usize,
    pub max_triangles: usize,
}

impl Default for MeshletLimits {
    fn default() -> Self {
        Self {
            max_vertices: DEFAULT_MAX_VERTICES,
            max_triangles: DEFAULT_MAX_TRIANGLES,
        }
    }
}

impl MeshletLimits {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(3..=MAX_VERTICES_LIMIT).contains(&self.max_vertices) {
            return Err(PipelineError::InvalidMeshletLimits(format!(
                "max_vertices {} outside 3..={}",
                self.max_vertices, MAX_VERTICES_LIMIT
            )));
        }
        if !(1..=MAX_TRIANGLES_LIMIT).contains(&self.max_triangles) {
            return Err(PipelineError::InvalidMeshletLimits(format!(
                "max_triangles {} outside 1..={}",
                self.max_triangles, MAX_TRIANGLES_LIMIT
            )));
        }
        Ok(())
    }
}

/// One cluster as produced by a partitioner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cluster {
    /// Unique submesh vertex indices referenced by the cluster.
    pub vertices: Vec<u32>,
    /// Triangles as positions into `vertices`.
    pub triangles: Vec<[u8; 3]>,
}

/// Splits a triangle list into clusters within the given limits.
pub trait ClusterPartitioner {
    fn partition(
        &self,
        indices: &[u32],
        vertices: &[Vertex],
        limits: &MeshletLimits,
    ) -> Result<Vec<Cluster>, PipelineError>;
}

/// Walks triangles in index-buffer order and starts a new cluster whenever
/// the next triangle would break a limit.
///
/// Triangle order and corner order are kept, so the resolved meshlet index
/// buffer reproduces the submesh index buffer exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanPartitioner;

impl ClusterPartitioner for ScanPartitioner {
    fn partition(
        &self,
        indices: &[u32],
        vertices: &[Vertex],
        limits: &MeshletLimits,
    ) -> Result<Vec<Cluster>, PipelineError> {
        check_indices(indices, vertices.len())?;

        let mut clusters = Vec::new();
        let mut current = Cluster::default();
        // Local slot of each submesh vertex inside `current`
        let mut local: Vec<Option<u8>> = vec![None; vertices.len()];

        for triangle in indices.chunks_exact(3) {
            let added = triangle
                .iter()
                .enumerate()
                .filter(|&(corner, &v)| local[v as usize].is_none() && !triangle[..corner].contains(&v))
                .count();

            if current.vertices.len() + added > limits.max_vertices
                || current.triangles.len() >= limits.max_triangles
            {
                for &v in &current.vertices {
                    local[v as usize] = None;
                }
                clusters.push(std::mem::take(&mut current));
            }

            let mut corners = [0u8; 3];
            for (corner, &v) in triangle.iter().enumerate() {
                corners[corner] = match local[v as usize] {
                    Some(slot) => slot,
                    None => {
                        let slot = current.vertices.len() as u8;
                        current.vertices.push(v);
                        local[v as usize] = Some(slot);
                        slot
                    }
                };
            }
            current.triangles.push(corners);
        }

        if !current.triangles.is_empty() {
            clusters.push(current);
        }
        Ok(clusters)
    }
}

/// Spatially coherent clusters from meshoptimizer.
///
/// Triangles are regrouped, so the resolved meshlet index buffer generally
/// differs from the submesh index buffer in order while covering the same
/// triangles.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshoptPartitioner {
    /// Trade cluster compactness for tighter normal cones (0.0 - 1.0).
    pub cone_weight: f32,
}

impl ClusterPartitioner for MeshoptPartitioner {
    fn partition(
        &self,
        indices: &[u32],
        vertices: &[Vertex],
        limits: &MeshletLimits,
    ) -> Result<Vec<Cluster>, PipelineError> {
        // meshoptimizer requires a triangle limit divisible by 4
        let max_triangles = limits.max_triangles & !3;
        if max_triangles == 0 {
            return Err(PipelineError::InvalidMeshletLimits(format!(
                "meshopt partitioner needs max_triangles >= 4, got {}",
                limits.max_triangles
            )));
        }

        if !(0.0..=1.0).contains(&self.cone_weight) {
            return Err(PipelineError::InvalidMeshletLimits(format!(
                "cone_weight {} outside 0.0..=1.0",
                self.cone_weight
            )));
        }

        check_indices(indices, vertices.len())?;
        let adapter = vertex_adapter(vertices)?;
        let meshlets = meshopt::build_meshlets(
            indices,
            &adapter,
            limits.max_vertices,
            max_triangles,
            self.cone_weight,
        );

        Ok(meshlets
            .iter()
            .map(|m| Cluster {
                vertices: m.vertices.to_vec(),
                triangles: m.triangles.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect(),
            })
            .collect())
    }
}

/// Partitioners may be called directly, so they cannot assume a validated submesh.
fn check_indices(indices: &[u32], vertex_count: usize) -> Result<(), MeshError> {
    match indices.iter().position(|&i| i as usize >= vertex_count) {
        Some(position) => Err(MeshError::IndexOutOfRange {
            position,
            index: indices[position],
            vertex_count,
        }),
        None => Ok(()),
    }
}

fn vertex_adapter(vertices: &[Vertex]) -> Result<meshopt::VertexDataAdapter<'_>, PipelineError> {
    meshopt::VertexDataAdapter::new(bytemuck::cast_slice(vertices), std::mem::size_of::<Vertex>(), 0)
        .map_err(|e| PipelineError::VertexAdapter(format!("{e:?}")))
}

/// Pack three cluster-local corner indices (each below 1024) into one word.
pub fn pack_primitive(c0: u32, c1: u32, c2: u32) -> u32 {
    debug_assert!(c0 <= PRIMITIVE_MASK && c1 <= PRIMITIVE_MASK && c2 <= PRIMITIVE_MASK);
    (c2 << (2 * PRIMITIVE_BITS)) | (c1 << PRIMITIVE_BITS) | c0
}

pub fn unpack_primitive(packed: u32) -> [u32; 3] {
    [
        packed & PRIMITIVE_MASK,
        (packed >> PRIMITIVE_BITS) & PRIMITIVE_MASK,
        (packed >> (2 * PRIMITIVE_BITS)) & PRIMITIVE_MASK,
    ]
}

/// Outcome of building meshlets for one submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshletStats {
    pub meshlets: usize,
    /// Clusters the partitioner returned without triangles.
    pub discarded: usize,
    /// Positions where the resolved meshlet indices differ from the index
    /// buffer, plus any length difference.
    pub index_mismatches: usize,
}

fn out_of_bounds(submesh: usize, cluster: usize, reason: String) -> PipelineError {
    PipelineError::ClusterOutOfBounds {
        submesh,
        cluster,
        reason,
    }
}

fn check_cluster(
    cluster: &Cluster,
    limits: &MeshletLimits,
    vertex_count: usize,
    submesh: usize,
    index: usize,
) -> Result<(), PipelineError> {
    if cluster.vertices.len() > limits.max_vertices {
        return Err(out_of_bounds(
            submesh,
            index,
            format!("{} vertices exceed the limit of {}", cluster.vertices.len(), limits.max_vertices),
        ));
    }
    if cluster.triangles.len() > limits.max_triangles {
        return Err(out_of_bounds(
            submesh,
            index,
            format!("{} triangles exceed the limit of {}", cluster.triangles.len(), limits.max_triangles),
        ));
    }
    if let Some(&v) = cluster.vertices.iter().find(|&&v| v as usize >= vertex_count) {
        return Err(out_of_bounds(
            submesh,
            index,
            format!("vertex {v} is out of range for {vertex_count} vertices"),
        ));
    }
    if let Some(&c) = cluster
        .triangles
        .iter()
        .flatten()
        .find(|&&c| c as usize >= cluster.vertices.len())
    {
        return Err(out_of_bounds(
            submesh,
            index,
            format!("corner {c} is out of range for {} cluster vertices", cluster.vertices.len()),
        ));
    }
    Ok(())
}

fn to_u32(value: usize, buffer: &'static str) -> Result<u32, PipelineError> {
    u32::try_from(value).map_err(|_| PipelineError::BufferOverflow { buffer })
}

fn normal_cone(bounds: &meshopt::Bounds) -> Option<NormalCone> {
    let axis = Vec3::from_array(bounds.cone_axis);
    // A cutoff of 1 means the normals span too wide an angle to ever cull
    if bounds.cone_cutoff >= 1.0 || axis.length_squared() == 0.0 {
        return None;
    }
    Some(NormalCone {
        apex: Vec3::from_array(bounds.cone_apex),
        axis,
        cutoff: bounds.cone_cutoff,
    })
}

fn count_index_mismatches(indices: &[u32], meshlet_indices: &[u32]) -> usize {
    let differing = indices.iter().zip(meshlet_indices).filter(|(a, b)| a != b).count();
    differing + indices.len().abs_diff(meshlet_indices.len())
}

/// Build meshlets for one submesh, replacing any previous meshlet data.
///
/// `submesh_index` only labels errors and log lines. With `strict` set, a
/// meshlet index buffer that does not reproduce the submesh index buffer is
/// an error; otherwise it is logged as a warning.
pub fn build_meshlets(
    submesh: &mut Submesh,
    submesh_index: usize,
    partitioner: &dyn ClusterPartitioner,
    limits: &MeshletLimits,
    strict: bool,
) -> Result<MeshletStats, PipelineError> {
    limits.validate()?;
    submesh.validate()?;
    submesh.clear_meshlets();

    let clusters = partitioner.partition(&submesh.indices, &submesh.vertices, limits)?;

    let Submesh {
        vertices,
        indices,
        meshlets,
        meshlet_index_buffer,
        meshlet_packed_primitives,
        meshlet_vertex_indices,
        ..
    } = submesh;
    let (vertices, indices) = (&*vertices, &*indices);

    let adapter = vertex_adapter(vertices)?;
    let mut discarded = 0;

    for (cluster_index, cluster) in clusters.iter().enumerate() {
        if cluster.triangles.is_empty() {
            discarded += 1;
            continue;
        }
        check_cluster(cluster, limits, vertices.len(), submesh_index, cluster_index)?;

        let index_start = meshlet_index_buffer.len();
        let index_offset = to_u32(index_start, "meshlet index")?;
        let primitive_offset = to_u32(meshlet_packed_primitives.len(), "meshlet primitive")?;
        let vertex_index_offset = to_u32(meshlet_vertex_indices.len(), "meshlet vertex index")?;

        for triangle in &cluster.triangles {
            meshlet_index_buffer.extend(triangle.iter().map(|&c| cluster.vertices[c as usize]));
            meshlet_packed_primitives.push(pack_primitive(
                triangle[0] as u32,
                triangle[1] as u32,
                triangle[2] as u32,
            ));
        }
        meshlet_vertex_indices.extend_from_slice(&cluster.vertices);

        let points: Vec<Vec3> = cluster
            .vertices
            .iter()
            .map(|&v| vertices[v as usize].position_vec())
            .collect();
        let (bounding_sphere, bounding_box) = compute_bounds(&points).map_err(MeshError::from)?;
        let cone = normal_cone(&meshopt::compute_cluster_bounds(
            &meshlet_index_buffer[index_start..],
            &adapter,
        ));

        meshlets.push(Meshlet {
            index_offset,
            index_count: to_u32(cluster.triangles.len() * 3, "meshlet index")?,
            primitive_offset,
            primitive_count: to_u32(cluster.triangles.len(), "meshlet primitive")?,
            vertex_index_offset,
            vertex_index_count: to_u32(cluster.vertices.len(), "meshlet vertex index")?,
            bounding_sphere,
            bounding_box,
            cone,
        });
    }

    let index_mismatches = count_index_mismatches(indices, meshlet_index_buffer);
    if index_mismatches > 0 {
        if strict {
            return Err(PipelineError::MeshletIndexMismatch {
                submesh: submesh_index,
                mismatched: index_mismatches,
            });
        }
        warn!(
            "Submesh {}: meshlet index buffer differs from the index buffer at {} positions",
            submesh_index, index_mismatches
        );
    }

    debug!(
        "Submesh {}: {} meshlets from {} triangles ({} empty clusters discarded)",
        submesh_index,
        meshlets.len(),
        indices.len() / 3,
        discarded
    );

    Ok(MeshletStats {
        meshlets: meshlets.len(),
        discarded,
        index_mismatches,
    })
}
