//! Meshbake Core - Data model and bounding volumes
//!
//! This crate provides the types every conversion stage works on:
//! - The interleaved [`Vertex`] and the bounding volume types
//! - The [`Mesh`] aggregate with its submeshes, meshlets, materials and textures
//! - Bounding sphere and box computation over point sets

pub mod bounds;
pub mod mesh;
pub mod types;

pub use bounds::{bounding_box, bounding_sphere, compute_bounds, BoundsError};
pub use glam::Vec3;
pub use mesh::{Material, Mesh, MeshError, Meshlet, Submesh, Texture, TextureKind};
pub use types::{BoundingBox, BoundingSphere, NormalCone, Vertex};
