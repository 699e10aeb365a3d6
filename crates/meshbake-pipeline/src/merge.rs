use std::collections::hash_map::Entry;
use std::collections::HashMap;

use meshbake_core::Submesh;
use tracing::debug;

/// Combine submeshes that share a material index.
///
/// Groups keep the order in which their material first appears. Within a
/// group the first submesh absorbs the rest in input order, so a later
/// submesh's indices are shifted by the vertex count accumulated before it.
/// Returns the number of submeshes left.
pub fn merge_submeshes(submeshes: &mut Vec<Submesh>) -> usize {
    let mut merged: Vec<Submesh> = Vec::with_capacity(submeshes.len());
    let mut by_material: HashMap<u32, usize> = HashMap::new();

    for submesh in submeshes.drain(..) {
        match by_material.entry(submesh.material_index) {
            Entry::Occupied(slot) => {
                let target = &mut merged[*slot.get()];
                debug!(
                    "Merging {} vertices into material {} submesh ({} vertices)",
                    submesh.vertices.len(),
                    target.material_index,
                    target.vertices.len()
                );
                target.absorb(submesh);
            }
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(submesh);
            }
        }
    }

    *submeshes = merged;
    submeshes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{grid, quad};
    use meshbake_core::Vertex;

    fn triangle(material_index: u32) -> Submesh {
        let mut submesh = Submesh::new(
            material_index,
            vec![
                Vertex::with_position([0.0, 0.0, 0.0]),
                Vertex::with_position([1.0, 0.0, 0.0]),
                Vertex::with_position([0.0, 1.0, 0.0]),
            ],
            vec![0, 1, 2],
        );
        submesh.update_bounds().unwrap();
        submesh
    }

    #[test]
    fn second_submesh_indices_are_shifted() {
        let first = triangle(0);
        let mut second = Submesh::new(
            0,
            (0..5).map(|i| Vertex::with_position([i as f32, 5.0, 0.0])).collect(),
            vec![0, 1, 2, 2, 3, 4],
        );
        second.update_bounds().unwrap();
        let second_indices = second.indices.clone();

        let mut submeshes = vec![first, second];
        assert_eq!(merge_submeshes(&mut submeshes), 1);

        let merged = &submeshes[0];
        assert_eq!(merged.vertices.len(), 8);
        assert_eq!(&merged.indices[..3], &[0, 1, 2]);
        let shifted: Vec<u32> = second_indices.iter().map(|k| k + 3).collect();
        assert_eq!(&merged.indices[3..], shifted.as_slice());
        for v in &merged.vertices {
            assert!(merged.bounding_box.contains(v.position_vec()));
            assert!(merged.bounding_sphere.contains(v.position_vec(), 1e-4));
        }
    }

    #[test]
    fn unique_materials_are_untouched() {
        let original = vec![quad(2), grid(0, 2, 2, [0.0; 3]), triangle(1)];
        let mut submeshes = original.clone();
        assert_eq!(merge_submeshes(&mut submeshes), 3);
        assert_eq!(submeshes, original);
    }

    #[test]
    fn groups_follow_first_appearance() {
        let mut submeshes = vec![triangle(1), quad(0), triangle(1), grid(2, 1, 1, [0.0; 3]), quad(0)];
        assert_eq!(merge_submeshes(&mut submeshes), 3);

        let materials: Vec<u32> = submeshes.iter().map(|s| s.material_index).collect();
        assert_eq!(materials, vec![1, 0, 2]);
        assert_eq!(submeshes[0].vertices.len(), 6);
        assert_eq!(submeshes[1].vertices.len(), 8);
        assert_eq!(submeshes[1].indices[6..], [4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn empty_input() {
        let mut submeshes = Vec::new();
        assert_eq!(merge_submeshes(&mut submeshes), 0);
    }
}
