//! Mesh aggregate: submeshes, meshlets, materials and textures
//!
//! Ownership is strictly tree-shaped. A [`Mesh`] owns its submeshes,
//! materials and textures by value, and every [`Submesh`] owns its meshlets
//! and the three meshlet-local buffers the meshlets index into.

use glam::Vec3;

use crate::bounds::{self, BoundsError};
use crate::types::{BoundingBox, BoundingSphere, NormalCone, Vertex};

/// Errors describing a malformed submesh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("submesh has no vertices")]
    NoVertices,

    #[error("index count {0} is not a multiple of 3")]
    IncompleteTriangle(usize),

    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error(transparent)]
    Bounds(#[from] BoundsError),
}

/// Texture slot kinds a material can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    BaseColor,
    Normal,
    /// Occlusion, roughness and metallic packed into one image.
    Orm,
}

impl TextureKind {
    pub const ALL: [TextureKind; 3] = [TextureKind::BaseColor, TextureKind::Normal, TextureKind::Orm];

    /// Slot position in [`Material::textures`].
    pub fn slot(self) -> usize {
        match self {
            TextureKind::BaseColor => 0,
            TextureKind::Normal => 1,
            TextureKind::Orm => 2,
        }
    }

    /// Stem suffix used when naming embedded images after their material.
    pub fn name_suffix(self) -> &'static str {
        match self {
            TextureKind::BaseColor => "bc",
            TextureKind::Normal => "n",
            TextureKind::Orm => "orm",
        }
    }

    /// Whether the texel values are sRGB encoded
    pub fn is_srgb(self) -> bool {
        matches!(self, TextureKind::BaseColor)
    }
}

/// A material with up to three texture names. Empty names mean "no texture".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    pub textures: [String; 3],
    pub opaque: bool,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: Default::default(),
            opaque: true,
        }
    }

    pub fn texture(&self, kind: TextureKind) -> &str {
        &self.textures[kind.slot()]
    }

    pub fn set_texture(&mut self, kind: TextureKind, name: impl Into<String>) {
        self.textures[kind.slot()] = name.into();
    }
}

/// Raw texture payload carried through to the encoder untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Texture {
    pub name: String,
    pub binary: Vec<u8>,
    /// Slot of the first material that referenced this texture.
    pub kind: Option<TextureKind>,
}

/// A bounded triangle cluster within one submesh.
///
/// All offsets are relative to the owning submesh's meshlet buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meshlet {
    /// Range in [`Submesh::meshlet_index_buffer`].
    pub index_offset: u32,
    pub index_count: u32,
    /// Range in [`Submesh::meshlet_packed_primitives`].
    pub primitive_offset: u32,
    pub primitive_count: u32,
    /// Range in [`Submesh::meshlet_vertex_indices`].
    pub vertex_index_offset: u32,
    pub vertex_index_count: u32,
    pub bounding_sphere: BoundingSphere,
    pub bounding_box: BoundingBox,
    pub cone: Option<NormalCone>,
}

/// Vertex and index buffers for one material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    pub material_index: u32,
    pub vertices: Vec<Vertex>,
    /// Triangle list
    pub indices: Vec<u32>,
    pub bounding_sphere: BoundingSphere,
    pub bounding_box: BoundingBox,

    pub meshlets: Vec<Meshlet>,
    /// Submesh vertex indices of every meshlet triangle corner, in cluster order.
    pub meshlet_index_buffer: Vec<u32>,
    /// One packed word per meshlet triangle, corners local to the meshlet.
    pub meshlet_packed_primitives: Vec<u32>,
    /// Submesh vertex index of every unique vertex of every meshlet.
    pub meshlet_vertex_indices: Vec<u32>,
}

impl Submesh {
    pub fn new(material_index: u32, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            material_index,
            vertices,
            indices,
            ..Default::default()
        }
    }

    /// Check the triangle list against the vertex buffer.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(self.indices.len()));
        }
        let vertex_count = self.vertices.len();
        if let Some((position, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|&(_, &i)| i as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange {
                position,
                index,
                vertex_count,
            });
        }
        Ok(())
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(Vertex::position_vec).collect()
    }

    /// Recompute sphere and box from the current vertex buffer.
    pub fn update_bounds(&mut self) -> Result<(), BoundsError> {
        let (sphere, aabb) = bounds::compute_bounds(&self.positions())?;
        self.bounding_sphere = sphere;
        self.bounding_box = aabb;
        Ok(())
    }

    /// Append another submesh's geometry, renumbering its indices past the
    /// current vertex count. Bounds grow to cover both inputs.
    pub fn absorb(&mut self, other: Submesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.iter().map(|&i| i + base));
        self.bounding_sphere = self.bounding_sphere.enclosing(&other.bounding_sphere);
        self.bounding_box = self.bounding_box.union(&other.bounding_box);
    }

    /// Drop any previously built meshlet data.
    pub fn clear_meshlets(&mut self) {
        self.meshlets.clear();
        self.meshlet_index_buffer.clear();
        self.meshlet_packed_primitives.clear();
        self.meshlet_vertex_indices.clear();
    }
}

/// Aggregate root for one converted asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub submeshes: Vec<Submesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub bounding_sphere: BoundingSphere,
    pub bounding_box: BoundingBox,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Submesh::triangle_count).sum()
    }

    pub fn meshlet_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.meshlets.len()).sum()
    }

    /// Recompute the mesh-wide bounds over every submesh vertex.
    pub fn update_bounds(&mut self) -> Result<(), BoundsError> {
        let points: Vec<Vec3> = self
            .submeshes
            .iter()
            .flat_map(|s| s.vertices.iter().map(Vertex::position_vec))
            .collect();
        let (sphere, aabb) = bounds::compute_bounds(&points)?;
        self.bounding_sphere = sphere;
        self.bounding_box = aabb;
        Ok(())
    }
}
