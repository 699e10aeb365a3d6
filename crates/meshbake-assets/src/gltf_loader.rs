use std::path::{Path, PathBuf};

use gltf::image::Source;
use gltf::material::AlphaMode;
use gltf::mesh::Mode;
use meshbake_core::{Material, Mesh, MeshError, Submesh, Texture, TextureKind, Vertex};
use tracing::{debug, info, warn};

use crate::error::AssetError;
use crate::tangent;

/// Load a glTF 2.0 file (.gltf or .glb) into a [`Mesh`].
///
/// Every triangle primitive becomes one submesh with tangents and bounds
/// already computed. Images stored in buffer views are copied as raw
/// payloads; URI images are only referenced by name.
pub fn load_gltf(path: &Path) -> Result<Mesh, AssetError> {
    if !path.exists() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }

    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)
        .map_err(|e| AssetError::GltfLoadFailed(path.to_path_buf(), e.to_string()))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .map_err(|e| AssetError::GltfLoadFailed(path.to_path_buf(), e.to_string()))?;

    read_document(&document, &buffers, path)
}

/// Load a glTF document held in memory. External buffers are resolved
/// against `base`.
pub fn load_gltf_slice(bytes: &[u8], base: Option<&Path>) -> Result<Mesh, AssetError> {
    let source = PathBuf::from("<memory>");
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)
        .map_err(|e| AssetError::GltfLoadFailed(source.clone(), e.to_string()))?;
    let buffers = gltf::import_buffers(&document, base, blob)
        .map_err(|e| AssetError::GltfLoadFailed(source.clone(), e.to_string()))?;

    read_document(&document, &buffers, &source)
}

/// Per-image bookkeeping while materials claim names.
struct ImageSlot {
    name: Option<String>,
    extension: &'static str,
    texture: Option<usize>,
}

fn mime_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/webp" => ".webp",
        "image/ktx2" => ".ktx2",
        _ => "",
    }
}

fn read_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    source: &Path,
) -> Result<Mesh, AssetError> {
    let mut mesh = Mesh::new();

    // Images: embedded payloads become textures, URIs are name-only.
    let mut slots = Vec::with_capacity(document.images().len());
    for image in document.images() {
        let slot = match image.source() {
            Source::View { view, mime_type } => {
                let data = &buffers[view.buffer().index()];
                let binary = data
                    .get(view.offset()..view.offset() + view.length())
                    .ok_or_else(|| {
                        AssetError::GltfLoadFailed(
                            source.to_path_buf(),
                            format!("image {} buffer view out of range", image.index()),
                        )
                    })?
                    .to_vec();
                mesh.textures.push(Texture {
                    name: String::new(),
                    binary,
                    kind: None,
                });
                ImageSlot {
                    name: image
                        .name()
                        .map(|name| unique_name(&slots, image.index(), name.to_string())),
                    extension: mime_extension(mime_type),
                    texture: Some(mesh.textures.len() - 1),
                }
            }
            Source::Uri { uri, .. } => ImageSlot {
                name: Some(uri.to_string()),
                extension: "",
                texture: None,
            },
        };
        slots.push(slot);
    }

    for material in document.materials() {
        let index = material.index().unwrap_or(mesh.materials.len());
        let name = match material.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("material{index}"),
        };

        let pbr = material.pbr_metallic_roughness();
        let references = [
            (
                TextureKind::BaseColor,
                pbr.base_color_texture().map(|info| info.texture().source().index()),
            ),
            (
                TextureKind::Normal,
                material.normal_texture().map(|t| t.texture().source().index()),
            ),
            (
                TextureKind::Orm,
                pbr.metallic_roughness_texture()
                    .map(|info| info.texture().source().index()),
            ),
        ];

        let mut work = Material::new(name);
        for (kind, image_index) in references {
            let Some(image_index) = image_index else {
                continue;
            };
            let texture_name = claim_image(&mut slots, &mut mesh.textures, image_index, &work.name, kind);
            work.set_texture(kind, texture_name);
        }
        work.opaque = material.alpha_mode() == AlphaMode::Opaque;

        debug!("Material '{}' textures {:?}", work.name, work.textures);
        mesh.materials.push(work);
    }

    // Embedded images no material referenced still need a file name.
    for index in 0..slots.len() {
        let name = match &slots[index].name {
            Some(name) => name.clone(),
            None => {
                let candidate = format!("image{}{}", index, slots[index].extension);
                let name = unique_name(&slots, index, candidate);
                slots[index].name = Some(name.clone());
                name
            }
        };
        if let Some(texture) = slots[index].texture {
            mesh.textures[texture].name = name;
        }
    }

    let mut default_material = None;
    for (mesh_index, gltf_mesh) in document.meshes().enumerate() {
        for (primitive_index, primitive) in gltf_mesh.primitives().enumerate() {
            if primitive.mode() != Mode::Triangles {
                warn!(
                    "Skipping mesh {} primitive {}: mode {:?} is not a triangle list",
                    mesh_index,
                    primitive_index,
                    primitive.mode()
                );
                continue;
            }

            let material_index = match primitive.material().index() {
                Some(index) => index as u32,
                None => *default_material.get_or_insert_with(|| {
                    mesh.materials.push(Material::new("default"));
                    (mesh.materials.len() - 1) as u32
                }),
            };

            let submesh = read_primitive(&primitive, buffers, mesh_index, primitive_index, material_index)?;
            debug!(
                "Mesh {} primitive {}: {} vertices, {} triangles, material {}",
                mesh_index,
                primitive_index,
                submesh.vertices.len(),
                submesh.triangle_count(),
                material_index
            );
            mesh.submeshes.push(submesh);
        }
    }

    if mesh.submeshes.is_empty() {
        return Err(AssetError::NoGeometry(source.to_path_buf()));
    }

    mesh.update_bounds().map_err(MeshError::from)?;

    info!(
        "glTF '{}': {} submeshes, {} materials, {} textures, {} vertices",
        source.display(),
        mesh.submeshes.len(),
        mesh.materials.len(),
        mesh.textures.len(),
        mesh.vertex_count()
    );

    Ok(mesh)
}

/// Name an image for a material slot, the first claim wins.
fn claim_image(
    slots: &mut [ImageSlot],
    textures: &mut [Texture],
    image_index: usize,
    material_name: &str,
    kind: TextureKind,
) -> String {
    let name = match &slots[image_index].name {
        Some(name) => name.clone(),
        None => {
            let candidate = format!(
                "{}.{}{}",
                material_name,
                kind.name_suffix(),
                slots[image_index].extension
            );
            let name = unique_name(slots, image_index, candidate);
            slots[image_index].name = Some(name.clone());
            name
        }
    };

    if let Some(texture) = slots[image_index].texture {
        let texture = &mut textures[texture];
        texture.name = name.clone();
        texture.kind.get_or_insert(kind);
    }
    name
}

/// Embedded images are written under their names, so two of them may not
/// share one. A clash gets the image index inserted before the extension.
fn unique_name(slots: &[ImageSlot], image_index: usize, candidate: String) -> String {
    let taken = |name: &str| {
        slots
            .iter()
            .enumerate()
            .any(|(i, slot)| i != image_index && slot.texture.is_some() && slot.name.as_deref() == Some(name))
    };
    if !taken(&candidate) {
        return candidate;
    }

    let (stem, extension) = match candidate.rfind('.') {
        Some(dot) if dot > 0 => candidate.split_at(dot),
        _ => (candidate.as_str(), ""),
    };
    let mut n = image_index;
    loop {
        let name = format!("{stem}.{n}{extension}");
        if !taken(&name) {
            return name;
        }
        n += 1;
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    mesh: usize,
    primitive_index: usize,
    material_index: u32,
) -> Result<Submesh, AssetError> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|iter| iter.collect())
        .ok_or_else(|| AssetError::InvalidPrimitive {
            mesh,
            primitive: primitive_index,
            reason: "missing POSITION attribute".into(),
        })?;
    let vertex_count = positions.len();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());
    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().collect());

    let check_count = |attribute: &'static str, actual: usize| {
        if actual == vertex_count {
            Ok(())
        } else {
            Err(AssetError::AttributeCountMismatch {
                mesh,
                primitive: primitive_index,
                attribute,
                expected: vertex_count,
                actual,
            })
        }
    };
    if let Some(normals) = &normals {
        check_count("NORMAL", normals.len())?;
    }
    if let Some(tex_coords) = &tex_coords {
        check_count("TEXCOORD_0", tex_coords.len())?;
    }

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|idx| idx.into_u32().collect())
        .unwrap_or_else(|| (0..vertex_count as u32).collect());

    let vertices: Vec<Vertex> = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            Vertex::new(
                position,
                normals.as_ref().map_or([0.0; 3], |n| n[i]),
                tex_coords.as_ref().map_or([0.0; 2], |t| t[i]),
            )
        })
        .collect();

    let mut submesh = Submesh::new(material_index, vertices, indices);
    submesh
        .validate()
        .map_err(|e| AssetError::InvalidPrimitive {
            mesh,
            primitive: primitive_index,
            reason: e.to_string(),
        })?;

    if !tangent::generate_tangents(&mut submesh.vertices, &submesh.indices) {
        return Err(AssetError::TangentGenerationFailed {
            mesh,
            primitive: primitive_index,
        });
    }

    submesh.update_bounds().map_err(MeshError::from)?;
    Ok(submesh)
}
