//! Bonds between sibling chunks
//!
//! A bond records where two chunks that came out of the same parent touch.
//! Exact bonds measure the overlap of their cut faces; chunks flagged for
//! approximate bonding fall back to the overlap of their bounding boxes.

use glam::{Vec2, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::hierarchy::{ChunkHierarchy, ChunkId, ChunkInfo};
use crate::mesh::Mesh;
use crate::plane::Plane;

/// Faces closer than this to each other's plane count as touching
const CONTACT_DISTANCE: f32 = 1e-4;

/// Cosine between opposing face normals above which faces count as parallel
const PARALLEL_COSINE: f32 = 0.999;

/// Contact between two sibling chunks
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub chunk_a: ChunkId,
    pub chunk_b: ChunkId,
    /// Contact area
    pub area: f32,
    /// Area-weighted center of the contact
    pub centroid: Vec3,
    /// Contact normal pointing from `chunk_a` to `chunk_b`
    pub normal: Vec3,
    /// Estimated from bounding boxes instead of shared faces
    pub approximate: bool,
}

/// Bonds between every pair of siblings that touch
///
/// Root chunks are treated as siblings of each other.
pub(crate) fn generate_bonds(hierarchy: &ChunkHierarchy) -> Vec<Bond> {
    let mut groups: Vec<(Option<ChunkId>, Vec<&ChunkInfo>)> = Vec::new();
    for info in hierarchy.iter() {
        match groups.iter_mut().find(|(parent, _)| *parent == info.parent) {
            Some((_, members)) => members.push(info),
            None => groups.push((info.parent, vec![info])),
        }
    }

    let mut bonds = Vec::new();
    for (_, members) in &groups {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                let bond = if a.approximate_bonding || b.approximate_bonding {
                    approximate_bond(a, b)
                } else {
                    exact_bond(a, b)
                };
                bonds.extend(bond);
            }
        }
    }
    log::debug!("generated {} bonds", bonds.len());
    bonds
}

fn exact_bond(a: &ChunkInfo, b: &ChunkInfo) -> Option<Bond> {
    let reach = a.mesh.bounds().expanded(CONTACT_DISTANCE);
    if !reach.intersects(&b.mesh.bounds()) {
        return None;
    }

    let mut area = 0.0;
    let mut weighted_center = Vec3::ZERO;
    let mut weighted_normal = Vec3::ZERO;

    for ta in cut_faces(&a.mesh) {
        let [a0, a1, a2] = a.mesh.triangle_positions(ta);
        let Some(plane) = Plane::from_point_normal(a0, (a1 - a0).cross(a2 - a0)) else {
            continue;
        };
        let (u, v) = plane.basis();
        let flat = |p: Vec3| Vec2::new(p.dot(u), p.dot(v));
        let clip = [flat(a0), flat(a1), flat(a2)];

        for tb in cut_faces(&b.mesh) {
            let corners = b.mesh.triangle_positions(tb);
            let [b0, b1, b2] = corners;
            let Some(normal_b) = (b1 - b0).cross(b2 - b0).try_normalize() else {
                continue;
            };
            if plane.normal.dot(normal_b) > -PARALLEL_COSINE
                || corners.iter().any(|&p| plane.signed_distance(p).abs() > CONTACT_DISTANCE)
            {
                continue;
            }

            let overlap = clip_convex(&corners.map(flat), &clip);
            let (overlap_area, center) = polygon_area_centroid(&overlap);
            if overlap_area <= 0.0 {
                continue;
            }
            let center = u * center.x + v * center.y + plane.normal * plane.offset;
            area += overlap_area;
            weighted_center += center * overlap_area;
            weighted_normal += plane.normal * overlap_area;
        }
    }

    (area > 0.0).then(|| Bond {
        chunk_a: a.id,
        chunk_b: b.id,
        area,
        centroid: weighted_center / area,
        normal: weighted_normal.normalize_or_zero(),
        approximate: false,
    })
}

fn approximate_bond(a: &ChunkInfo, b: &ChunkInfo) -> Option<Bond> {
    let (bounds_a, bounds_b) = (a.mesh.bounds(), b.mesh.bounds());
    let margin = bounds_a.diagonal().max(bounds_b.diagonal()) * 0.01 + CONTACT_DISTANCE;
    let overlap = bounds_a.expanded(margin).intersection(&bounds_b.expanded(margin))?;

    let mut extents = overlap.extents().to_array();
    extents.sort_by(f32::total_cmp);
    Some(Bond {
        chunk_a: a.id,
        chunk_b: b.id,
        area: extents[1] * extents[2],
        centroid: overlap.center(),
        normal: (b.mesh.centroid() - a.mesh.centroid()).normalize_or_zero(),
        approximate: true,
    })
}

fn cut_faces(mesh: &Mesh) -> impl Iterator<Item = usize> + '_ {
    (0..mesh.triangle_count()).filter(|&t| mesh.is_interior(t))
}

/// Clip a polygon against a counter-clockwise convex polygon
fn clip_convex(subject: &[Vec2], clip: &[Vec2; 3]) -> Vec<Vec2> {
    let mut clip = clip.to_vec();
    if (clip[1] - clip[0]).perp_dot(clip[2] - clip[0]) < 0.0 {
        clip.reverse();
    }

    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let (edge_start, edge_end) = (clip[i], clip[(i + 1) % clip.len()]);
        let side = |p: Vec2| (edge_end - edge_start).perp_dot(p - edge_start);
        let input = std::mem::take(&mut output);
        for j in 0..input.len() {
            let (current, next) = (input[j], input[(j + 1) % input.len()]);
            let (dc, dn) = (side(current), side(next));
            if dc >= 0.0 {
                output.push(current);
            }
            if (dc >= 0.0) != (dn >= 0.0) {
                output.push(current + (next - current) * (dc / (dc - dn)));
            }
        }
    }
    output
}

/// Unsigned area and centroid of a simple polygon
fn polygon_area_centroid(polygon: &[Vec2]) -> (f32, Vec2) {
    if polygon.len() < 3 {
        return (0.0, Vec2::ZERO);
    }
    let mut twice_area = 0.0;
    let mut center = Vec2::ZERO;
    for i in 0..polygon.len() {
        let (p, q) = (polygon[i], polygon[(i + 1) % polygon.len()]);
        let cross = p.perp_dot(q);
        twice_area += cross;
        center += (p + q) * cross;
    }
    if twice_area.abs() <= f32::EPSILON {
        return (0.0, Vec2::ZERO);
    }
    (twice_area.abs() * 0.5, center / (3.0 * twice_area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fracture::FractureEngine;
    use crate::mesh::test_meshes::{cube_at, unit_cube};
    use crate::random::FractureRng;
    use crate::NoiseConfig;

    fn halves() -> FractureEngine {
        let mut engine = FractureEngine::new();
        let root = engine.set_source_mesh(unit_cube()).unwrap();
        engine
            .cut(root, Vec3::Y, Vec3::ZERO, &NoiseConfig::default(), false, &mut FractureRng::new(1))
            .unwrap();
        engine
    }

    #[test]
    fn test_exact_bond_between_halves() {
        let engine = halves();
        let bonds = engine.generate_bonds();
        assert_eq!(bonds.len(), 1);
        let bond = bonds[0];
        assert!(!bond.approximate);
        assert!((bond.area - 1.0).abs() < 1e-4);
        assert!(bond.centroid.length() < 1e-4);
        assert!((bond.normal.abs() - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_approximate_bond() {
        let mut engine = halves();
        let first = engine.leaf_chunk_ids()[0];
        engine.set_approximate_bonding(first, true).unwrap();
        let bonds = engine.generate_bonds();
        assert_eq!(bonds.len(), 1);
        assert!(bonds[0].approximate);
        assert!(bonds[0].area > 0.9);
    }

    #[test]
    fn test_separated_roots_do_not_bond() {
        let mut hierarchy = ChunkHierarchy::new();
        hierarchy.add_root(cube_at(Vec3::ZERO, 0.5));
        hierarchy.add_root(cube_at(Vec3::new(3.0, 0.0, 0.0), 0.5));
        assert!(generate_bonds(&hierarchy).is_empty());
    }

    #[test]
    fn test_clip_overlap() {
        let square_half = [Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(0.0, 2.0)];
        let subject = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        let overlap = clip_convex(&subject, &square_half);
        let (area, _) = polygon_area_centroid(&overlap);
        assert!((area - 1.0).abs() < 1e-6);
    }
}
