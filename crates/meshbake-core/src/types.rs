//! Core value types shared by every stage of the conversion

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Interleaved vertex as produced by ingestion and consumed by the optimizer.
///
/// The layout is `#[repr(C)]` so the optimizer can treat a vertex buffer as a
/// flat byte stream with a fixed stride and the position at offset 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Tangent direction in xyz, handedness sign in w.
    pub tangent: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex with a zero tangent
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tangent: [0.0; 4],
            tex_coord,
        }
    }

    /// Create a vertex with only a position set
    pub fn with_position(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position_vec(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Sphere enclosing a point set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Whether `point` lies inside the sphere, allowing `epsilon` of slack on the radius.
    pub fn contains(&self, point: Vec3, epsilon: f32) -> bool {
        self.center.distance(point) <= self.radius + epsilon
    }

    /// Smallest sphere enclosing both `self` and `other`.
    pub fn enclosing(&self, other: &BoundingSphere) -> BoundingSphere {
        let offset = other.center - self.center;
        let distance = offset.length();

        if distance + other.radius <= self.radius {
            return *self;
        }
        if distance + self.radius <= other.radius {
            return *other;
        }

        let radius = (distance + self.radius + other.radius) * 0.5;
        let center = self.center + offset * ((radius - self.radius) / distance);
        BoundingSphere { center, radius }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Degenerate box around a single point
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Grow the box to include `point`
    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Box covering both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Cone bounding the triangle normals of a cluster, used to reject clusters
/// that face away from the camera.
///
/// A cluster is back-facing when
/// `dot(normalize(apex - camera), axis) >= cutoff`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalCone {
    pub apex: Vec3,
    pub axis: Vec3,
    pub cutoff: f32,
}

impl NormalCone {
    /// Backface test against a camera position
    pub fn is_backfacing(&self, camera_position: Vec3) -> bool {
        (self.apex - camera_position)
            .normalize_or_zero()
            .dot(self.axis)
            >= self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        let v = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.5]);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        let x = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(x, 1.0);
        assert_eq!(v.tangent, [0.0; 4]);
    }

    #[test]
    fn test_enclosing_sphere_disjoint() {
        let a = BoundingSphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0);
        let b = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let merged = a.enclosing(&b);
        assert!((merged.radius - 3.0).abs() < 1e-5);
        assert!(merged.center.length() < 1e-5);
    }

    #[test]
    fn test_enclosing_sphere_nested() {
        let outer = BoundingSphere::new(Vec3::ZERO, 5.0);
        let inner = BoundingSphere::new(Vec3::new(1.0, 1.0, 0.0), 1.0);
        assert_eq!(outer.enclosing(&inner), outer);
        assert_eq!(inner.enclosing(&outer), outer);
    }

    #[test]
    fn test_box_union_and_contains() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
        assert!(u.contains(Vec3::new(-0.5, 0.9, 0.0)));
        assert!(!u.contains(Vec3::new(1.1, 0.0, 0.0)));
    }

    #[test]
    fn test_cone_backfacing() {
        let cone = NormalCone {
            apex: Vec3::ZERO,
            axis: Vec3::Z,
            cutoff: 0.5,
        };
        // Camera behind the cluster, looking along the normals
        assert!(cone.is_backfacing(Vec3::new(0.0, 0.0, -10.0)));
        assert!(!cone.is_backfacing(Vec3::new(0.0, 0.0, 10.0)));
    }
}
