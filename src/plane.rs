//! Oriented cutting planes

use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distance under which a point counts as lying on a plane
pub const PLANE_EPSILON: f32 = 1e-5;

/// Plane `normal · x = offset` with a unit normal
///
/// Points with a negative signed distance are "below" the plane, the side
/// the normal points away from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Signed distance of the plane from the origin along `normal`
    pub offset: f32,
}

impl Plane {
    /// Plane through `point` facing `normal`, `None` for a zero or non-finite normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Option<Plane> {
        let normal = normal.try_normalize()?;
        if !point.is_finite() {
            return None;
        }
        Some(Plane {
            normal,
            offset: normal.dot(point),
        })
    }

    /// Perpendicular bisector of `a` and `b`
    ///
    /// `a` lies below the plane and `b` above. `None` if the points coincide.
    pub fn bisector(a: Vec3, b: Vec3) -> Option<Plane> {
        Self::from_point_normal((a + b) * 0.5, b - a)
    }

    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    /// Same plane facing the other way
    #[inline]
    pub fn flipped(&self) -> Plane {
        Plane {
            normal: -self.normal,
            offset: -self.offset,
        }
    }

    /// Closest point on the plane
    #[inline]
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }

    /// In-plane axes `(u, v)` with `u × v = normal`
    pub fn basis(&self) -> (Vec3, Vec3) {
        let u = self.normal.any_orthonormal_vector();
        (u, self.normal.cross(u))
    }
}
