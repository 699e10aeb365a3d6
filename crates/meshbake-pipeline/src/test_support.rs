//! Procedural geometry shared by the stage tests

use std::path::PathBuf;

use meshbake_core::{Submesh, Vertex};

/// Flat grid of `width` x `height` cells in the XY plane, two triangles per
/// cell, wound counter-clockwise seen from +Z.
pub(crate) fn grid(material_index: u32, width: u32, height: u32, origin: [f32; 3]) -> Submesh {
    let mut vertices = Vec::new();
    for y in 0..=height {
        for x in 0..=width {
            vertices.push(Vertex::new(
                [origin[0] + x as f32, origin[1] + y as f32, origin[2]],
                [0.0, 0.0, 1.0],
                [x as f32 / width as f32, y as f32 / height as f32],
            ));
        }
    }

    let stride = width + 1;
    let mut indices = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let a = y * stride + x;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }

    let mut submesh = Submesh::new(material_index, vertices, indices);
    submesh.update_bounds().unwrap();
    submesh
}

/// Unit quad with corners (0,0) (1,0) (1,1) (0,1) and indices 0,1,2 0,2,3.
pub(crate) fn quad(material_index: u32) -> Submesh {
    let n = [0.0, 0.0, 1.0];
    let mut submesh = Submesh::new(
        material_index,
        vec![
            Vertex::new([0.0, 0.0, 0.0], n, [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], n, [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 0.0], n, [1.0, 1.0]),
            Vertex::new([0.0, 1.0, 0.0], n, [0.0, 1.0]),
        ],
        vec![0, 1, 2, 0, 2, 3],
    );
    submesh.update_bounds().unwrap();
    submesh
}

/// Triangles of a submesh as vertex bit patterns, each rotated so its
/// smallest corner comes first, then sorted. Equal for two submeshes that
/// draw the same triangles with the same winding.
pub(crate) fn triangle_set(submesh: &Submesh) -> Vec<[[u32; 12]; 3]> {
    let mut triangles: Vec<[[u32; 12]; 3]> = submesh
        .indices
        .chunks_exact(3)
        .map(|tri| {
            let corners = [
                bytemuck::cast::<Vertex, [u32; 12]>(submesh.vertices[tri[0] as usize]),
                bytemuck::cast::<Vertex, [u32; 12]>(submesh.vertices[tri[1] as usize]),
                bytemuck::cast::<Vertex, [u32; 12]>(submesh.vertices[tri[2] as usize]),
            ];
            let first = (0..3).min_by_key(|&i| corners[i]).unwrap_or(0);
            [corners[first], corners[(first + 1) % 3], corners[(first + 2) % 3]]
        })
        .collect();
    triangles.sort();
    triangles
}

/// Write a binary glTF with one mesh whose primitives are `submeshes`, all
/// using a single material. Only positions and indices are stored.
pub(crate) fn write_glb(name: &str, submeshes: &[Submesh]) -> PathBuf {
    let mut bin = Vec::new();
    let mut views = Vec::new();
    let mut accessors = Vec::new();
    let mut primitives = Vec::new();

    for submesh in submeshes {
        let positions = submesh.positions();
        let min = positions.iter().fold(positions[0], |a, &b| a.min(b));
        let max = positions.iter().fold(positions[0], |a, &b| a.max(b));

        let start = bin.len();
        for v in &submesh.vertices {
            v.position.iter().for_each(|f| bin.extend_from_slice(&f.to_le_bytes()));
        }
        views.push(serde_json::json!({"buffer": 0, "byteOffset": start, "byteLength": bin.len() - start}));
        accessors.push(serde_json::json!({
            "bufferView": views.len() - 1,
            "componentType": 5126,
            "count": submesh.vertices.len(),
            "type": "VEC3",
            "min": min.to_array(),
            "max": max.to_array()
        }));

        let start = bin.len();
        submesh.indices.iter().for_each(|i| bin.extend_from_slice(&i.to_le_bytes()));
        views.push(serde_json::json!({"buffer": 0, "byteOffset": start, "byteLength": bin.len() - start}));
        accessors.push(serde_json::json!({
            "bufferView": views.len() - 1,
            "componentType": 5125,
            "count": submesh.indices.len(),
            "type": "SCALAR"
        }));

        primitives.push(serde_json::json!({
            "attributes": {"POSITION": accessors.len() - 2},
            "indices": accessors.len() - 1,
            "material": 0
        }));
    }

    let json = serde_json::json!({
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": bin.len()}],
        "bufferViews": views,
        "accessors": accessors,
        "materials": [{"name": "ground"}],
        "meshes": [{"primitives": primitives}]
    })
    .to_string();

    let mut json_bytes = json.into_bytes();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json_bytes);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);

    let dir = std::env::temp_dir().join(format!("meshbake-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{name}.glb"));
    std::fs::write(&path, glb).unwrap();
    path
}
