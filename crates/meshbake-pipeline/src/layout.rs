//! Final buffer layout
//!
//! Every submesh's vertices are split into four attribute streams and
//! appended, together with its index and meshlet buffers, to mesh-wide
//! arrays. Each submesh record holds the offset and count of its slice in
//! every array. Indices stay submesh-local, so a renderer draws a submesh
//! with `vertex_offset` as the base vertex.
//!
//! Meshlet records keep their submesh-relative offsets. The meshlet index
//! buffer only exists to check clustering and is not part of the layout.

use meshbake_core::{BoundingBox, BoundingSphere, Material, Mesh, Meshlet, NormalCone, Submesh, Vertex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::meshlet::unpack_primitive;

/// Leading bytes of an encoded layout.
pub const FORMAT_TAG: [u8; 4] = *b"MBKL";
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = FORMAT_TAG.len() + std::mem::size_of::<u32>();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    /// Base color, normal and ORM texture names; empty when absent.
    pub texture_names: [String; 3],
    pub opaque: bool,
}

impl From<&Material> for MaterialRecord {
    fn from(material: &Material) -> Self {
        Self {
            name: material.name.clone(),
            texture_names: material.textures.clone(),
            opaque: material.opaque,
        }
    }
}

/// Meshlet ranges, relative to the owning submesh's meshlet slices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshletRecord {
    pub index_offset: u32,
    pub index_count: u32,
    pub primitive_offset: u32,
    pub primitive_count: u32,
    pub vertex_index_offset: u32,
    pub vertex_index_count: u32,
    pub bounding_sphere: BoundingSphere,
    pub bounding_box: BoundingBox,
    pub cone: Option<NormalCone>,
}

impl From<&Meshlet> for MeshletRecord {
    fn from(meshlet: &Meshlet) -> Self {
        Self {
            index_offset: meshlet.index_offset,
            index_count: meshlet.index_count,
            primitive_offset: meshlet.primitive_offset,
            primitive_count: meshlet.primitive_count,
            vertex_index_offset: meshlet.vertex_index_offset,
            vertex_index_count: meshlet.vertex_index_count,
            bounding_sphere: meshlet.bounding_sphere,
            bounding_box: meshlet.bounding_box,
            cone: meshlet.cone,
        }
    }
}

/// Where one submesh lives in the mesh-wide arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmeshRecord {
    pub material_index: u32,
    /// In vertices, for every attribute stream.
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
    pub meshlet_primitive_offset: u32,
    pub meshlet_primitive_count: u32,
    pub meshlet_vertex_index_offset: u32,
    pub meshlet_vertex_index_count: u32,
    pub bounding_sphere: BoundingSphere,
    pub bounding_box: BoundingBox,
    pub meshlets: Vec<MeshletRecord>,
}

/// Running write positions into the mesh-wide arrays.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LayoutCursor {
    vertex: u32,
    index: u32,
    primitive: u32,
    vertex_index: u32,
}

fn count(len: usize, buffer: &'static str) -> Result<u32, PipelineError> {
    u32::try_from(len).map_err(|_| PipelineError::BufferOverflow { buffer })
}

fn advance(position: u32, by: u32, buffer: &'static str) -> Result<u32, PipelineError> {
    position.checked_add(by).ok_or(PipelineError::BufferOverflow { buffer })
}

fn slice(values: &[u32], offset: u32, count: u32) -> &[u32] {
    let start = offset as usize;
    &values[start..start + count as usize]
}

impl LayoutCursor {
    fn record(&self, submesh: &Submesh) -> Result<SubmeshRecord, PipelineError> {
        Ok(SubmeshRecord {
            material_index: submesh.material_index,
            vertex_offset: self.vertex,
            vertex_count: count(submesh.vertices.len(), "vertex")?,
            index_offset: self.index,
            index_count: count(submesh.indices.len(), "index")?,
            meshlet_primitive_offset: self.primitive,
            meshlet_primitive_count: count(submesh.meshlet_packed_primitives.len(), "meshlet primitive")?,
            meshlet_vertex_index_offset: self.vertex_index,
            meshlet_vertex_index_count: count(submesh.meshlet_vertex_indices.len(), "meshlet vertex index")?,
            bounding_sphere: submesh.bounding_sphere,
            bounding_box: submesh.bounding_box,
            meshlets: submesh.meshlets.iter().map(MeshletRecord::from).collect(),
        })
    }

    fn advance(&mut self, record: &SubmeshRecord) -> Result<(), PipelineError> {
        self.vertex = advance(self.vertex, record.vertex_count, "vertex")?;
        self.index = advance(self.index, record.index_count, "index")?;
        self.primitive = advance(self.primitive, record.meshlet_primitive_count, "meshlet primitive")?;
        self.vertex_index = advance(
            self.vertex_index,
            record.meshlet_vertex_index_count,
            "meshlet vertex index",
        )?;
        Ok(())
    }
}

/// Everything a renderer needs, in draw-ready arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshLayout {
    pub bounding_sphere: BoundingSphere,
    pub bounding_box: BoundingBox,
    pub materials: Vec<MaterialRecord>,
    pub submeshes: Vec<SubmeshRecord>,
    /// xyz per vertex
    pub positions: Vec<f32>,
    /// xyz per vertex
    pub normals: Vec<f32>,
    /// xyzw per vertex
    pub tangents: Vec<f32>,
    /// uv per vertex
    pub tex_coords: Vec<f32>,
    pub indices: Vec<u32>,
    pub meshlet_packed_primitives: Vec<u32>,
    pub meshlet_vertex_indices: Vec<u32>,
}

impl MeshLayout {
    /// Flatten a processed mesh.
    pub fn assemble(mesh: &Mesh) -> Result<Self, PipelineError> {
        let vertex_total = mesh.vertex_count();
        let mut layout = MeshLayout {
            bounding_sphere: mesh.bounding_sphere,
            bounding_box: mesh.bounding_box,
            materials: mesh.materials.iter().map(MaterialRecord::from).collect(),
            submeshes: Vec::with_capacity(mesh.submeshes.len()),
            positions: Vec::with_capacity(vertex_total * 3),
            normals: Vec::with_capacity(vertex_total * 3),
            tangents: Vec::with_capacity(vertex_total * 4),
            tex_coords: Vec::with_capacity(vertex_total * 2),
            ..Default::default()
        };

        let mut cursor = LayoutCursor::default();
        for submesh in &mesh.submeshes {
            let record = cursor.record(submesh)?;
            cursor.advance(&record)?;

            layout.push_vertices(&submesh.vertices);
            layout.indices.extend_from_slice(&submesh.indices);
            layout
                .meshlet_packed_primitives
                .extend_from_slice(&submesh.meshlet_packed_primitives);
            layout
                .meshlet_vertex_indices
                .extend_from_slice(&submesh.meshlet_vertex_indices);
            layout.submeshes.push(record);
        }

        debug!(
            "Assembled layout: {} submeshes, {} vertices, {} indices, {} meshlet primitives",
            layout.submeshes.len(),
            cursor.vertex,
            cursor.index,
            cursor.primitive
        );
        layout.validate()?;
        Ok(layout)
    }

    fn push_vertices(&mut self, vertices: &[Vertex]) {
        for vertex in vertices {
            self.positions.extend_from_slice(&vertex.position);
            self.normals.extend_from_slice(&vertex.normal);
            self.tangents.extend_from_slice(&vertex.tangent);
            self.tex_coords.extend_from_slice(&vertex.tex_coord);
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn meshlet_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.meshlets.len()).sum()
    }

    /// Check that submesh ranges tile every array in order and that each
    /// meshlet stays inside its submesh's slices.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let inconsistent = |message: String| Err(PipelineError::LayoutInconsistent(message));

        let mut expected = LayoutCursor::default();
        for (i, submesh) in self.submeshes.iter().enumerate() {
            let offsets = [
                ("vertex", submesh.vertex_offset, expected.vertex),
                ("index", submesh.index_offset, expected.index),
                ("meshlet primitive", submesh.meshlet_primitive_offset, expected.primitive),
                (
                    "meshlet vertex index",
                    submesh.meshlet_vertex_index_offset,
                    expected.vertex_index,
                ),
            ];
            for (name, actual, wanted) in offsets {
                if actual != wanted {
                    return inconsistent(format!("submesh {i} {name} offset is {actual}, expected {wanted}"));
                }
            }

            if submesh.material_index as usize >= self.materials.len() {
                return inconsistent(format!(
                    "submesh {i} references material {} of {}",
                    submesh.material_index,
                    self.materials.len()
                ));
            }

            for (j, meshlet) in submesh.meshlets.iter().enumerate() {
                let within = |offset: u32, count: u32, limit: u32| offset as u64 + count as u64 <= limit as u64;
                if meshlet.index_count as u64 != meshlet.primitive_count as u64 * 3
                    || !within(meshlet.index_offset, meshlet.index_count, submesh.index_count)
                    || !within(
                        meshlet.primitive_offset,
                        meshlet.primitive_count,
                        submesh.meshlet_primitive_count,
                    )
                    || !within(
                        meshlet.vertex_index_offset,
                        meshlet.vertex_index_count,
                        submesh.meshlet_vertex_index_count,
                    )
                {
                    return inconsistent(format!("submesh {i} meshlet {j} ranges exceed the submesh"));
                }
            }

            expected.advance(submesh)?;
        }

        let vertices = expected.vertex as usize;
        let lengths = [
            ("position", self.positions.len(), vertices * 3),
            ("normal", self.normals.len(), vertices * 3),
            ("tangent", self.tangents.len(), vertices * 4),
            ("texture coordinate", self.tex_coords.len(), vertices * 2),
            ("index", self.indices.len(), expected.index as usize),
            (
                "meshlet primitive",
                self.meshlet_packed_primitives.len(),
                expected.primitive as usize,
            ),
            (
                "meshlet vertex index",
                self.meshlet_vertex_indices.len(),
                expected.vertex_index as usize,
            ),
        ];
        for (name, actual, wanted) in lengths {
            if actual != wanted {
                return inconsistent(format!("{name} array holds {actual} values, expected {wanted}"));
            }
        }
        self.validate_values()
    }

    /// Index values must stay inside their submesh's vertices and packed
    /// corners inside their meshlet. Assumes the ranges already check out.
    fn validate_values(&self) -> Result<(), PipelineError> {
        for (i, submesh) in self.submeshes.iter().enumerate() {
            let indices = slice(&self.indices, submesh.index_offset, submesh.index_count);
            if let Some(&index) = indices.iter().find(|&&v| v >= submesh.vertex_count) {
                return Err(PipelineError::LayoutInconsistent(format!(
                    "submesh {i} index {index} is out of range for {} vertices",
                    submesh.vertex_count
                )));
            }

            let vertex_indices = slice(
                &self.meshlet_vertex_indices,
                submesh.meshlet_vertex_index_offset,
                submesh.meshlet_vertex_index_count,
            );
            if let Some(&index) = vertex_indices.iter().find(|&&v| v >= submesh.vertex_count) {
                return Err(PipelineError::LayoutInconsistent(format!(
                    "submesh {i} meshlet vertex index {index} is out of range for {} vertices",
                    submesh.vertex_count
                )));
            }

            let primitives = slice(
                &self.meshlet_packed_primitives,
                submesh.meshlet_primitive_offset,
                submesh.meshlet_primitive_count,
            );
            for (j, meshlet) in submesh.meshlets.iter().enumerate() {
                let packed = slice(primitives, meshlet.primitive_offset, meshlet.primitive_count);
                let corner_out_of_range = packed
                    .iter()
                    .flat_map(|&p| unpack_primitive(p))
                    .any(|corner| corner >= meshlet.vertex_index_count);
                if corner_out_of_range {
                    return Err(PipelineError::LayoutInconsistent(format!(
                        "submesh {i} meshlet {j} has a triangle corner past its {} vertices",
                        meshlet.vertex_index_count
                    )));
                }
            }
        }
        Ok(())
    }

    /// Encode as tag, little-endian version, then the bincode body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&FORMAT_TAG);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bincode::serialize_into(&mut bytes, self).map_err(|e| PipelineError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Decode and validate bytes produced by [`MeshLayout::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.len() < HEADER_LEN {
            return Err(PipelineError::Decode(format!("{} bytes is too short for a header", bytes.len())));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if header[..4] != FORMAT_TAG {
            return Err(PipelineError::Decode("not a mesh layout file".into()));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != FORMAT_VERSION {
            return Err(PipelineError::Decode(format!(
                "unsupported format version {version}, expected {FORMAT_VERSION}"
            )));
        }

        let layout: MeshLayout = bincode::deserialize(body).map_err(|e| PipelineError::Decode(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Everything except the bulk arrays.
    pub fn summary(&self) -> LayoutSummary<'_> {
        LayoutSummary {
            format_version: FORMAT_VERSION,
            vertex_count: self.vertex_count(),
            index_count: self.indices.len(),
            meshlet_count: self.meshlet_count(),
            meshlet_primitive_count: self.meshlet_packed_primitives.len(),
            bounding_sphere: self.bounding_sphere,
            bounding_box: self.bounding_box,
            materials: &self.materials,
            submeshes: &self.submeshes,
        }
    }

    /// Pretty JSON of [`MeshLayout::summary`].
    pub fn summary_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(&self.summary()).map_err(|e| PipelineError::Encode(e.to_string()))
    }
}

/// Human-readable overview of a layout.
#[derive(Debug, Serialize)]
pub struct LayoutSummary<'a> {
    pub format_version: u32,
    pub vertex_count: usize,
    pub index_count: usize,
    pub meshlet_count: usize,
    pub meshlet_primitive_count: usize,
    pub bounding_sphere: BoundingSphere,
    pub bounding_box: BoundingBox,
    pub materials: &'a [MaterialRecord],
    pub submeshes: &'a [SubmeshRecord],
}
