//! Read-out of finished chunks: crack edges, collision hulls, UV fitting

use glam::{Vec2, Vec3};
use parry3d::math::Point;
use parry3d::transformation;
use std::collections::HashMap;

use crate::error::{FractureError, Result};
use crate::hierarchy::{ChunkHierarchy, ChunkId};
use crate::mesh::{position_key, Mesh, PositionKey, Vertex};

/// Edge where original surface meets a cut face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrackEdge {
    /// Leaf chunk the edge belongs to
    pub chunk: ChunkId,
    /// First endpoint, in the winding of the exterior face
    pub start: Vertex,
    /// Second endpoint
    pub end: Vertex,
}

#[derive(Default)]
struct EdgeUse {
    exterior: Option<(Vertex, Vertex)>,
    interior: bool,
}

/// Crack edges of every leaf chunk, in storage order
pub(crate) fn crack_edges(hierarchy: &ChunkHierarchy) -> Vec<CrackEdge> {
    let mut edges = Vec::new();
    for id in hierarchy.leaves() {
        let Ok(info) = hierarchy.get(id) else {
            continue;
        };
        let mesh = &info.mesh;

        let mut order: Vec<(PositionKey, PositionKey)> = Vec::new();
        let mut uses: HashMap<(PositionKey, PositionKey), EdgeUse> = HashMap::new();
        for t in 0..mesh.triangle_count() {
            let corners = mesh.triangle(t).map(|i| mesh.vertices()[i as usize]);
            for e in 0..3 {
                let (a, b) = (corners[e], corners[(e + 1) % 3]);
                let (ka, kb) = (position_key(a.position), position_key(b.position));
                if ka == kb {
                    continue;
                }
                let key = (ka.min(kb), ka.max(kb));
                let entry = uses.entry(key).or_insert_with(|| {
                    order.push(key);
                    EdgeUse::default()
                });
                if mesh.is_interior(t) {
                    entry.interior = true;
                } else if entry.exterior.is_none() {
                    entry.exterior = Some((a, b));
                }
            }
        }

        edges.extend(order.iter().filter_map(|key| {
            let used = uses.get(key)?;
            let (start, end) = used.exterior.filter(|_| used.interior)?;
            Some(CrackEdge { chunk: id, start, end })
        }));
    }
    edges
}

/// Convex hull of a mesh as a closed mesh
pub(crate) fn convex_hull(mesh: &Mesh) -> Result<Mesh> {
    if mesh.vertex_count() < 4 || mesh.volume().abs() <= f32::EPSILON {
        return Err(FractureError::InvalidGeometry(format!(
            "convex hull needs a solid mesh ({} vertices, volume {})",
            mesh.vertex_count(),
            mesh.volume()
        )));
    }

    let points: Vec<Point<f32>> = mesh
        .vertices()
        .iter()
        .map(|v| Point::new(v.position.x, v.position.y, v.position.z))
        .collect();
    let (hull_points, triangles) = transformation::convex_hull(&points);

    let center = mesh.bounds().center();
    let vertices: Vec<Vertex> = hull_points
        .iter()
        .map(|p| {
            let position = Vec3::new(p.x, p.y, p.z);
            Vertex::new(position, (position - center).normalize_or_zero(), Vec2::ZERO)
        })
        .collect();
    let indices: Vec<u32> = triangles.iter().flatten().copied().collect();
    Mesh::new(vertices, indices)
}

/// Largest UV extent of the cut faces of a mesh, 0 without cut faces
pub(crate) fn interior_uv_extent(mesh: &Mesh) -> f32 {
    mesh.interior_uv_bounds()
        .map(|(lo, hi)| (hi - lo).max_element())
        .unwrap_or(0.0)
}

/// Move the cut-face UVs of a mesh to the origin and scale them by `scale`
pub(crate) fn fit_interior_uvs(mesh: &mut Mesh, scale: f32) {
    if let Some((lo, _)) = mesh.interior_uv_bounds() {
        mesh.transform_interior_uvs(lo, scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::unit_cube;

    #[test]
    fn test_hull_of_cube() {
        let hull = convex_hull(&unit_cube()).unwrap();
        assert!(hull.is_closed());
        assert!((hull.volume().abs() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hull_rejects_flat_mesh() {
        let flat = Mesh::from_arrays(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[], &[], &[0, 1, 2]).unwrap();
        assert!(convex_hull(&flat).is_err());
    }

    #[test]
    fn test_no_cracks_without_cuts() {
        let mut hierarchy = ChunkHierarchy::new();
        hierarchy.add_root(unit_cube());
        assert!(crack_edges(&hierarchy).is_empty());
    }

    #[test]
    fn test_cracks_around_cut_face() {
        let cube = unit_cube();
        // Mark the two -z triangles as cut faces
        let mut flags = vec![false; 12];
        flags[0] = true;
        flags[1] = true;
        let mesh = Mesh::with_interior(cube.vertices().to_vec(), cube.indices().to_vec(), flags).unwrap();
        let mut hierarchy = ChunkHierarchy::new();
        let root = hierarchy.add_root(mesh);

        let edges = crack_edges(&hierarchy);
        // The four rim edges of the face, not its diagonal
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.chunk == root));
        assert!(edges
            .iter()
            .all(|e| (e.start.position.z + 0.5).abs() < 1e-6 && (e.end.position.z + 0.5).abs() < 1e-6));
    }
}
