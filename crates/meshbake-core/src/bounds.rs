//! Bounding volume computation over point sets
//!
//! The sphere fit is the classic one-pass approximation: seed the sphere with
//! the widest pair of axis extremes, then grow it for every point that falls
//! outside. Points are visited strictly in input order and every expression
//! keeps the same operation order, so results are bit-identical across runs
//! and platforms.

use glam::Vec3;

use crate::types::{BoundingBox, BoundingSphere};

/// Errors from bounding volume computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundsError {
    #[error("cannot compute bounds of an empty point set")]
    EmptyPointSet,
}

/// Approximate minimal sphere containing every point.
pub fn bounding_sphere(points: &[Vec3]) -> Result<BoundingSphere, BoundsError> {
    if points.is_empty() {
        return Err(BoundsError::EmptyPointSet);
    }

    // Extremum points along each axis
    let mut pmin = [0usize; 3];
    let mut pmax = [0usize; 3];
    for (i, p) in points.iter().enumerate() {
        for axis in 0..3 {
            if p[axis] < points[pmin[axis]][axis] {
                pmin[axis] = i;
            }
            if p[axis] > points[pmax[axis]][axis] {
                pmax[axis] = i;
            }
        }
    }

    // Axis whose extremes are farthest apart seeds the sphere
    let mut paxis = 0;
    let mut paxisd2 = 0.0f32;
    for axis in 0..3 {
        let d2 = (points[pmax[axis]] - points[pmin[axis]]).length_squared();
        if d2 > paxisd2 {
            paxisd2 = d2;
            paxis = axis;
        }
    }

    let p1 = points[pmin[paxis]];
    let p2 = points[pmax[paxis]];
    let mut center = (p1 + p2) / 2.0;
    let mut radius = paxisd2.sqrt() / 2.0;

    for &p in points {
        let d2 = (p - center).length_squared();
        if d2 > radius * radius {
            let d = d2.sqrt();
            let k = 0.5 + (radius / d) / 2.0;
            center = center * k + p * (1.0 - k);
            radius = (radius + d) / 2.0;
        }
    }

    Ok(BoundingSphere { center, radius })
}

/// Axis-aligned box containing every point.
pub fn bounding_box(points: &[Vec3]) -> Result<BoundingBox, BoundsError> {
    let (first, rest) = points.split_first().ok_or(BoundsError::EmptyPointSet)?;
    let mut aabb = BoundingBox::from_point(*first);
    for &p in rest {
        aabb.extend(p);
    }
    Ok(aabb)
}

/// Sphere and box over the same point set.
pub fn compute_bounds(points: &[Vec3]) -> Result<(BoundingSphere, BoundingBox), BoundsError> {
    Ok((bounding_sphere(points)?, bounding_box(points)?))
}
