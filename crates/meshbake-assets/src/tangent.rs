//! Tangent space generation over an indexed triangle list
//!
//! MikkTSpace walks faces and corners; the adapter resolves every
//! (face, corner) pair through the index buffer and writes the basic
//! tangent form (xyz direction, w handedness) straight back into the shared
//! vertex. The bitangent/magnitude callback keeps the library default, which
//! forwards to the basic form.

use meshbake_core::Vertex;
use mikktspace::Geometry;

/// Exposes a vertex buffer and triangle list to MikkTSpace.
pub struct TangentSpaceAdapter<'a> {
    vertices: &'a mut [Vertex],
    indices: &'a [u32],
}

impl<'a> TangentSpaceAdapter<'a> {
    pub fn new(vertices: &'a mut [Vertex], indices: &'a [u32]) -> Self {
        Self { vertices, indices }
    }

    fn vertex_index(&self, face: usize, vert: usize) -> usize {
        self.indices[face * 3 + vert] as usize
    }

    fn vertex(&self, face: usize, vert: usize) -> &Vertex {
        &self.vertices[self.vertex_index(face, vert)]
    }
}

impl Geometry for TangentSpaceAdapter<'_> {
    fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        3
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex(face, vert).position
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex(face, vert).normal
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.vertex(face, vert).tex_coord
    }

    fn set_tangent_encoded(&mut self, tangent: [f32; 4], face: usize, vert: usize) {
        let index = self.vertex_index(face, vert);
        self.vertices[index].tangent = tangent;
    }
}

/// Generate per-vertex tangents in place. Returns `false` if MikkTSpace
/// rejected the geometry.
///
/// Must run after positions, normals and texture coordinates are filled in.
pub fn generate_tangents(vertices: &mut [Vertex], indices: &[u32]) -> bool {
    if indices.len() < 3 {
        return true;
    }
    mikktspace::generate_tangents(&mut TangentSpaceAdapter::new(vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        let n = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], n, [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], n, [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 0.0], n, [1.0, 1.0]),
            Vertex::new([0.0, 1.0, 0.0], n, [0.0, 1.0]),
        ];
        (vertices, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_adapter_contract() {
        let (mut vertices, indices) = quad();
        let adapter = TangentSpaceAdapter::new(&mut vertices, &indices);
        assert_eq!(adapter.num_faces(), 2);
        assert_eq!(adapter.num_vertices_of_face(1), 3);
        // Face 1 corner 2 is vertex 3
        assert_eq!(adapter.position(1, 2), [0.0, 1.0, 0.0]);
        assert_eq!(adapter.tex_coord(1, 2), [0.0, 1.0]);
        assert_eq!(adapter.normal(0, 0), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_basic_setter_writes_through_index_buffer() {
        let (mut vertices, indices) = quad();
        {
            let mut adapter = TangentSpaceAdapter::new(&mut vertices, &indices);
            adapter.set_tangent_encoded([0.0, 1.0, 0.0, -1.0], 1, 1);
        }
        assert_eq!(vertices[2].tangent, [0.0, 1.0, 0.0, -1.0]);
        assert_eq!(vertices[0].tangent, [0.0; 4]);
    }

    #[test]
    fn test_flat_quad_tangents_follow_u() {
        let (mut vertices, indices) = quad();
        assert!(generate_tangents(&mut vertices, &indices));
        for v in &vertices {
            assert!((v.tangent[0] - 1.0).abs() < 1e-4, "tangent {:?}", v.tangent);
            assert!(v.tangent[1].abs() < 1e-4);
            assert!(v.tangent[2].abs() < 1e-4);
            assert_eq!(v.tangent[3].abs(), 1.0);
        }
    }

    #[test]
    fn test_no_faces_is_a_no_op() {
        let mut vertices = vec![Vertex::with_position([1.0, 2.0, 3.0])];
        assert!(generate_tangents(&mut vertices, &[]));
        assert_eq!(vertices[0].tangent, [0.0; 4]);
    }
}
