//! Meshbake Assets - Source ingestion and texture output
//!
//! Provides glTF 2.0 loading into the [`meshbake_core::Mesh`] aggregate,
//! MikkTSpace tangent generation, and the texture encode boundary.

mod error;
mod gltf_loader;
pub mod tangent;
mod texture;

pub use error::AssetError;
pub use gltf_loader::{load_gltf, load_gltf_slice};
pub use tangent::{generate_tangents, TangentSpaceAdapter};
pub use texture::{
    write_textures, CompressionQuality, PngTextureEncoder, RawTextureWriter, TextureEncodeOptions,
    TextureEncoder, TextureFailurePolicy, TextureOutput,
};
