//! Vertex deduplication and cache/fetch reordering
//!
//! Thin wrapper over meshoptimizer. The stage keeps the set of triangles
//! (by vertex value and winding) and only changes how they are indexed and
//! ordered.

use meshbake_core::{Submesh, Vertex};
use tracing::{debug, info};

/// Deduplicate vertices, reorder triangles for the post-transform cache and
/// reorder vertices by first use.
///
/// Submeshes without triangles are left alone: every vertex would be
/// unreferenced and remapping would empty the vertex buffer.
pub fn optimize_submesh(submesh: &mut Submesh) {
    if submesh.indices.is_empty() {
        debug!("Skipping optimization of submesh without triangles");
        return;
    }

    let vertex_count = submesh.vertices.len();
    let (unique, remap) = meshopt::generate_vertex_remap(&submesh.vertices, Some(&submesh.indices));
    let vertices: Vec<Vertex> = meshopt::remap_vertex_buffer(&submesh.vertices, unique, &remap);
    let indices = meshopt::remap_index_buffer(Some(&submesh.indices), vertex_count, &remap);

    let mut indices = meshopt::optimize_vertex_cache(&indices, vertices.len());
    let vertices = meshopt::optimize_vertex_fetch(&mut indices, &vertices);

    debug_assert!(vertices.len() <= vertex_count);
    debug!(
        "Optimized submesh for material {}: {} -> {} vertices, {} triangles",
        submesh.material_index,
        vertex_count,
        vertices.len(),
        indices.len() / 3
    );

    submesh.vertices = vertices;
    submesh.indices = indices;
}

/// Optimize every submesh in turn.
pub fn optimize_submeshes(submeshes: &mut [Submesh]) {
    let before: usize = submeshes.iter().map(|s| s.vertices.len()).sum();
    for submesh in submeshes.iter_mut() {
        optimize_submesh(submesh);
    }
    let after: usize = submeshes.iter().map(|s| s.vertices.len()).sum();
    info!("Optimized {} submeshes: {} -> {} vertices", submeshes.len(), before, after);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{grid, quad, triangle_set};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    /// Give every triangle its own three vertices, like an unwelded export.
    fn unweld(submesh: &Submesh) -> Submesh {
        let vertices: Vec<Vertex> = submesh.indices.iter().map(|&i| submesh.vertices[i as usize]).collect();
        let indices = (0..vertices.len() as u32).collect();
        Submesh::new(submesh.material_index, vertices, indices)
    }

    #[test]
    fn duplicates_are_welded() {
        let welded = grid(0, 4, 4, [0.0; 3]);
        let mut submesh = unweld(&welded);
        assert_eq!(submesh.vertices.len(), 96);

        optimize_submesh(&mut submesh);
        assert_eq!(submesh.vertices.len(), welded.vertices.len());
        assert_eq!(triangle_set(&submesh), triangle_set(&welded));
        assert!(submesh.validate().is_ok());
    }

    #[test]
    fn triangle_set_survives_shuffled_input() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..8 {
            let mut submesh = grid(0, 6, 5, [1.0, -2.0, 3.0]);
            let mut triangles: Vec<[u32; 3]> =
                submesh.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
            triangles.shuffle(&mut rng);
            submesh.indices = triangles.into_iter().flatten().collect();
            submesh.vertices.shuffle(&mut rng);

            let expected = triangle_set(&submesh);
            let vertex_count = submesh.vertices.len();
            optimize_submesh(&mut submesh);

            assert!(submesh.vertices.len() <= vertex_count);
            assert_eq!(triangle_set(&submesh), expected);
        }
    }

    #[test]
    fn vertices_follow_first_use() {
        let mut submesh = quad(0);
        optimize_submesh(&mut submesh);

        let mut seen = Vec::new();
        for &i in &submesh.indices {
            if !seen.contains(&i) {
                seen.push(i);
            }
        }
        assert_eq!(seen, (0..submesh.vertices.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn submesh_without_triangles_is_kept() {
        let mut submesh = Submesh::new(0, vec![Vertex::with_position([1.0, 1.0, 1.0])], Vec::new());
        optimize_submesh(&mut submesh);
        assert_eq!(submesh.vertices.len(), 1);
    }
}
