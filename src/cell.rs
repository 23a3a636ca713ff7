//! Convex Voronoi cells
//!
//! A cell starts as a bounding box and is cut down by one bisector plane per
//! competing site. Every face remembers which site's bisector created it, so
//! two sites are neighbors exactly when one of their cells keeps a face of
//! non-zero area from the other.

use glam::Vec3;

use crate::mesh::Aabb;
use crate::plane::Plane;

/// Planar face of a cell, wound counter-clockwise seen from outside
#[derive(Debug, Clone, PartialEq)]
pub struct CellFace {
    /// Boundary polygon
    pub polygon: Vec<Vec3>,
    /// Site whose bisector produced the face, `None` for bounding box faces
    pub source: Option<usize>,
}

impl CellFace {
    /// Polygon area
    pub fn area(&self) -> f32 {
        polygon_area(&self.polygon)
    }
}

/// Convex polytope bounded by planar faces
#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiCell {
    /// Site the cell belongs to
    pub site: Vec3,
    faces: Vec<CellFace>,
    tolerance: f32,
}

impl VoronoiCell {
    /// Cell filling the whole box
    pub fn from_box(site: Vec3, bounds: &Aabb) -> Self {
        let (lo, hi) = (bounds.min, bounds.max);
        let corner = |x: bool, y: bool, z: bool| {
            Vec3::new(
                if x { hi.x } else { lo.x },
                if y { hi.y } else { lo.y },
                if z { hi.z } else { lo.z },
            )
        };
        let quads = [
            [corner(false, false, false), corner(false, true, false), corner(true, true, false), corner(true, false, false)],
            [corner(false, false, true), corner(true, false, true), corner(true, true, true), corner(false, true, true)],
            [corner(false, false, false), corner(true, false, false), corner(true, false, true), corner(false, false, true)],
            [corner(false, true, false), corner(false, true, true), corner(true, true, true), corner(true, true, false)],
            [corner(false, false, false), corner(false, false, true), corner(false, true, true), corner(false, true, false)],
            [corner(true, false, false), corner(true, true, false), corner(true, true, true), corner(true, false, true)],
        ];

        Self {
            site,
            faces: quads
                .into_iter()
                .map(|quad| CellFace {
                    polygon: quad.to_vec(),
                    source: None,
                })
                .collect(),
            tolerance: bounds.diagonal().max(1.0) * 1e-6,
        }
    }

    /// Faces of the cell
    pub fn faces(&self) -> &[CellFace] {
        &self.faces
    }

    /// Check if clipping removed everything
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Largest distance from `point` to any cell corner
    pub fn max_distance_from(&self, point: Vec3) -> f32 {
        self.faces
            .iter()
            .flat_map(|face| face.polygon.iter())
            .map(|p| p.distance(point))
            .fold(0.0, f32::max)
    }

    /// Keep the part of the cell below `plane`
    ///
    /// The new face is tagged with `source`.
    pub fn clip(&mut self, plane: &Plane, source: usize) {
        let eps = self.tolerance;
        let all_below = self
            .faces
            .iter()
            .flat_map(|face| face.polygon.iter())
            .all(|&p| plane.signed_distance(p) <= eps);
        if all_below {
            return;
        }

        let mut cap_points: Vec<Vec3> = Vec::new();
        let mut clipped = Vec::with_capacity(self.faces.len() + 1);

        for face in &self.faces {
            let polygon = clip_polygon(&face.polygon, plane);
            for &p in &polygon {
                if plane.signed_distance(p).abs() <= eps && !cap_points.iter().any(|q| q.distance(p) <= eps) {
                    cap_points.push(p);
                }
            }
            if polygon.len() >= 3 {
                clipped.push(CellFace {
                    polygon,
                    source: face.source,
                });
            }
        }

        if cap_points.len() >= 3 {
            order_around_normal(&mut cap_points, plane);
            clipped.push(CellFace {
                polygon: cap_points,
                source: Some(source),
            });
        }

        self.faces = clipped;
    }

    /// Total area of faces created by `source`'s bisector
    pub fn shared_area(&self, source: usize) -> f32 {
        self.faces
            .iter()
            .filter(|face| face.source == Some(source))
            .map(CellFace::area)
            .sum()
    }

    /// Enclosed volume
    pub fn volume(&self) -> f32 {
        let reference = self.site;
        self.faces
            .iter()
            .map(|face| {
                let p = &face.polygon;
                (1..p.len().saturating_sub(1))
                    .map(|i| (p[0] - reference).dot((p[i] - reference).cross(p[i + 1] - reference)))
                    .sum::<f32>()
            })
            .sum::<f32>()
            / 6.0
    }
}

/// Sutherland–Hodgman clip keeping the side below the plane
fn clip_polygon(polygon: &[Vec3], plane: &Plane) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for i in 0..polygon.len() {
        let current = polygon[i];
        let next = polygon[(i + 1) % polygon.len()];
        let dc = plane.signed_distance(current);
        let dn = plane.signed_distance(next);

        if dc <= 0.0 {
            out.push(current);
        }
        if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
            let t = dc / (dc - dn);
            out.push(current.lerp(next, t));
        }
    }
    out
}

/// Sort coplanar points counter-clockwise around the plane normal
fn order_around_normal(points: &mut [Vec3], plane: &Plane) {
    let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
    let (u, v) = plane.basis();
    points.sort_by(|a, b| {
        let angle_a = (*a - center).dot(v).atan2((*a - center).dot(u));
        let angle_b = (*b - center).dot(v).atan2((*b - center).dot(u));
        angle_a.total_cmp(&angle_b)
    });
}

fn polygon_area(polygon: &[Vec3]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = Vec3::ZERO;
    for i in 1..polygon.len() - 1 {
        sum += (polygon[i] - polygon[0]).cross(polygon[i + 1] - polygon[0]);
    }
    sum.length() * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_box_cell() {
        let cell = VoronoiCell::from_box(Vec3::ZERO, &unit_box());
        assert_eq!(cell.faces().len(), 6);
        assert!((cell.volume() - 8.0).abs() < 1e-4);
        assert!((cell.max_distance_from(Vec3::ZERO) - 3f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_clip_in_half() {
        let mut cell = VoronoiCell::from_box(Vec3::new(-0.5, 0.0, 0.0), &unit_box());
        let plane = Plane::bisector(Vec3::new(-0.5, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)).unwrap();
        cell.clip(&plane, 1);
        assert_eq!(cell.faces().len(), 6);
        assert!((cell.volume() - 4.0).abs() < 1e-4);
        assert!((cell.shared_area(1) - 4.0).abs() < 1e-4);
        assert_eq!(cell.shared_area(2), 0.0);
    }

    #[test]
    fn test_plane_outside_leaves_cell() {
        let mut cell = VoronoiCell::from_box(Vec3::ZERO, &unit_box());
        let plane = Plane::from_point_normal(Vec3::new(0.0, 2.0, 0.0), Vec3::Y).unwrap();
        cell.clip(&plane, 3);
        assert_eq!(cell.shared_area(3), 0.0);
        assert!((cell.volume() - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_corner_clip() {
        let mut cell = VoronoiCell::from_box(Vec3::ZERO, &unit_box());
        let plane = Plane::from_point_normal(Vec3::splat(0.5), Vec3::ONE).unwrap();
        cell.clip(&plane, 0);
        // Cut off a tetrahedron with legs of length 1.5
        let removed = 1.5f32.powi(3) / 6.0;
        assert!((cell.volume() - (8.0 - removed)).abs() < 1e-3);
        assert_eq!(cell.faces().len(), 7);
    }
}
