//! Mesh repair before fracturing

use glam::{IVec3, Vec3};
use std::collections::{HashMap, HashSet};

use super::{position_key, Mesh, PositionKey, Vertex};
use crate::error::{FractureError, Result};

/// Repairs raw input meshes
///
/// Cleaning welds near-identical vertices, drops degenerate and duplicate
/// triangles, and compacts the vertex buffer. Edges shared by more than two
/// triangles are only reported unless [`drop_non_manifold`](Self::drop_non_manifold)
/// is set. The input mesh is never touched.
///
/// # Example
///
/// ```
/// use rust_voronoi_fracture::{cuboid, MeshCleaner, Vec3};
///
/// let cleaner = MeshCleaner::default();
/// let cleaned = cleaner.clean(&cuboid(Vec3::ONE)).unwrap();
/// assert_eq!(cleaned.triangle_count(), 12);
/// assert!(cleaned.is_closed());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshCleaner {
    /// Maximum distance between welded vertices
    pub position_epsilon: f32,
    /// Minimum cosine between normals of welded vertices
    pub normal_tolerance: f32,
    /// Maximum UV distance between welded vertices
    pub uv_tolerance: f32,
    /// Triangles with a smaller area are dropped
    pub area_epsilon: f32,
    /// Keep only the first two triangles on every edge
    pub drop_non_manifold: bool,
}

impl Default for MeshCleaner {
    fn default() -> Self {
        Self {
            position_epsilon: 1e-5,
            normal_tolerance: 0.99,
            uv_tolerance: 1e-4,
            area_epsilon: 1e-12,
            drop_non_manifold: false,
        }
    }
}

impl MeshCleaner {
    /// Create a cleaner with default tolerances
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a repaired copy of `mesh`
    ///
    /// # Errors
    ///
    /// Returns `InvalidGeometry` when fewer than three vertices or no
    /// triangles survive cleaning.
    pub fn clean(&self, mesh: &Mesh) -> Result<Mesh> {
        let remap = self.weld(mesh.vertices());

        let mut seen: HashSet<[u32; 3]> = HashSet::new();
        let mut kept: Vec<([u32; 3], bool)> = Vec::with_capacity(mesh.triangle_count());
        let mut degenerate = 0usize;
        let mut duplicates = 0usize;

        for t in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle(t).map(|i| remap[i as usize]);
            if a == b || b == c || c == a {
                degenerate += 1;
                continue;
            }

            let [pa, pb, pc] = [a, b, c].map(|i| mesh.vertices()[i as usize].position);
            if (pb - pa).cross(pc - pa).length() * 0.5 < self.area_epsilon {
                degenerate += 1;
                continue;
            }

            if !seen.insert(canonical_winding([a, b, c])) {
                duplicates += 1;
                continue;
            }
            kept.push(([a, b, c], mesh.is_interior(t)));
        }

        let mut overused = 0usize;
        if self.drop_non_manifold {
            let before = kept.len();
            kept = first_two_per_edge(kept, mesh.vertices());
            overused = before - kept.len();
        }

        // Compact away vertices no surviving triangle references
        let mut compact: HashMap<u32, u32> = HashMap::new();
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices = Vec::with_capacity(kept.len() * 3);
        let mut interior = Vec::with_capacity(kept.len());
        for (tri, flag) in &kept {
            for &old in tri {
                let new = *compact.entry(old).or_insert_with(|| {
                    vertices.push(mesh.vertices()[old as usize]);
                    (vertices.len() - 1) as u32
                });
                indices.push(new);
            }
            interior.push(*flag);
        }

        if vertices.len() < 3 || interior.is_empty() {
            return Err(FractureError::InvalidGeometry(format!(
                "cleaning left {} vertices and {} triangles",
                vertices.len(),
                interior.len()
            )));
        }

        let mut cleaned = Mesh::from_parts(vertices, indices, interior, false);
        cleaned.closed = !cleaned.has_open_edges();

        let non_manifold = cleaned.non_manifold_edge_count();
        if non_manifold > 0 {
            log::warn!("cleaned mesh still has {} non-manifold edges", non_manifold);
        }
        log::debug!(
            "cleaned mesh: {} -> {} vertices, {} -> {} triangles ({} degenerate, {} duplicate, {} non-manifold)",
            mesh.vertex_count(),
            cleaned.vertex_count(),
            mesh.triangle_count(),
            cleaned.triangle_count(),
            degenerate,
            duplicates,
            overused
        );

        Ok(cleaned)
    }

    /// Map every vertex to the first earlier vertex it can be welded with
    fn weld(&self, vertices: &[Vertex]) -> Vec<u32> {
        let cell_size = self.position_epsilon.max(f32::EPSILON);
        let cell_of = |p: Vec3| (p / cell_size).floor().as_ivec3();

        let mut grid: HashMap<IVec3, Vec<u32>> = HashMap::new();
        let mut remap = Vec::with_capacity(vertices.len());

        for (index, vertex) in vertices.iter().enumerate() {
            let cell = cell_of(vertex.position);
            let mut target = None;

            'search: for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let Some(bucket) = grid.get(&(cell + IVec3::new(dx, dy, dz))) else {
                            continue;
                        };
                        if let Some(&found) = bucket
                            .iter()
                            .find(|&&other| self.can_weld(vertex, &vertices[other as usize]))
                        {
                            target = Some(found);
                            break 'search;
                        }
                    }
                }
            }

            match target {
                Some(found) => remap.push(found),
                None => {
                    grid.entry(cell).or_default().push(index as u32);
                    remap.push(index as u32);
                }
            }
        }
        remap
    }

    fn can_weld(&self, a: &Vertex, b: &Vertex) -> bool {
        if a.position.distance(b.position) > self.position_epsilon {
            return false;
        }
        if a.uv.distance(b.uv) > self.uv_tolerance {
            return false;
        }
        // Missing normals never block a weld
        match (a.normal.try_normalize(), b.normal.try_normalize()) {
            (Some(na), Some(nb)) => na.dot(nb) >= self.normal_tolerance,
            _ => true,
        }
    }
}

/// Drop triangles that would put a third face on an edge
///
/// Edges are matched by position. Earlier triangles win.
fn first_two_per_edge(faces: Vec<([u32; 3], bool)>, vertices: &[Vertex]) -> Vec<([u32; 3], bool)> {
    let mut uses: HashMap<(PositionKey, PositionKey), u8> = HashMap::new();
    faces
        .into_iter()
        .filter(|(tri, _)| {
            let keys = tri.map(|i| position_key(vertices[i as usize].position));
            let edges = [0, 1, 2].map(|e| {
                let (a, b) = (keys[e], keys[(e + 1) % 3]);
                if a < b {
                    (a, b)
                } else {
                    (b, a)
                }
            });
            if edges.iter().any(|edge| uses.get(edge).is_some_and(|&n| n >= 2)) {
                return false;
            }
            for edge in edges {
                *uses.entry(edge).or_insert(0) += 1;
            }
            true
        })
        .collect()
}

/// Rotate the smallest index to the front, keeping the winding
fn canonical_winding([a, b, c]: [u32; 3]) -> [u32; 3] {
    if a <= b && a <= c {
        [a, b, c]
    } else if b <= a && b <= c {
        [b, c, a]
    } else {
        [c, a, b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::unit_cube;
    use glam::Vec2;

    /// Cube with one vertex per triangle corner (36 vertices)
    fn unindexed_cube() -> Mesh {
        let cube = unit_cube();
        let vertices: Vec<Vertex> = cube.indices().iter().map(|&i| cube.vertices()[i as usize]).collect();
        let indices = (0..vertices.len() as u32).collect();
        Mesh::new(vertices, indices).unwrap()
    }

    #[test]
    fn test_welds_duplicated_vertices() {
        let mesh = unindexed_cube();
        assert_eq!(mesh.vertex_count(), 36);

        let cleaned = MeshCleaner::default().clean(&mesh).unwrap();
        assert_eq!(cleaned.vertex_count(), 8);
        assert_eq!(cleaned.triangle_count(), 12);
        assert!(cleaned.is_closed());
        assert!((cleaned.volume() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_drops_degenerate_and_duplicate_triangles() {
        let cube = unit_cube();
        let mut indices = cube.indices().to_vec();
        indices.extend_from_slice(&[0, 0, 1]);
        // Same triangle as the first one, rotated
        indices.extend_from_slice(&[2, 1, 0]);
        indices.extend_from_slice(&[1, 0, 2]);
        let mesh = Mesh::new(cube.vertices().to_vec(), indices).unwrap();
        assert_eq!(mesh.triangle_count(), 15);

        let cleaned = MeshCleaner::default().clean(&mesh).unwrap();
        assert!(cleaned.triangle_count() <= mesh.triangle_count());
        assert_eq!(cleaned.triangle_count(), 12);
        assert!(cleaned.is_closed());
    }

    #[test]
    fn test_normal_tolerance_blocks_weld() {
        let vertices = vec![
            Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::X, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::Y, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::ZERO, Vec3::X, Vec2::ZERO),
            Vertex::new(Vec3::Z, Vec3::X, Vec2::ZERO),
            Vertex::new(Vec3::Y, Vec3::X, Vec2::ZERO),
        ];
        let mesh = Mesh::new(vertices, vec![0, 1, 2, 3, 5, 4]).unwrap();
        let cleaned = MeshCleaner::default().clean(&mesh).unwrap();
        assert_eq!(cleaned.vertex_count(), 6);
        assert_eq!(cleaned.triangle_count(), 2);
    }

    #[test]
    fn test_too_small_result_fails() {
        let vertices = vec![
            Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::X, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::X * 2.0, Vec3::Z, Vec2::ZERO),
        ];
        let mesh = Mesh::new(vertices, vec![0, 1, 2]).unwrap();
        let result = MeshCleaner::default().clean(&mesh);
        assert!(matches!(result, Err(FractureError::InvalidGeometry(_))));
    }

    #[test]
    fn test_non_manifold_fin() {
        let cube = unit_cube();
        let [a, b, _] = cube.triangle(0);
        let mut vertices = cube.vertices().to_vec();
        vertices.push(Vertex::new(Vec3::new(3.0, 2.0, 1.0), Vec3::Z, Vec2::ZERO));
        let mut indices = cube.indices().to_vec();
        indices.extend_from_slice(&[a, b, 8]);
        let mesh = Mesh::new(vertices, indices).unwrap();

        let reported = MeshCleaner::default().clean(&mesh).unwrap();
        assert_eq!(reported.triangle_count(), 13);
        assert_eq!(reported.non_manifold_edge_count(), 1);

        let cleaner = MeshCleaner {
            drop_non_manifold: true,
            ..MeshCleaner::default()
        };
        let repaired = cleaner.clean(&mesh).unwrap();
        assert_eq!(repaired.triangle_count(), 12);
        assert_eq!(repaired.vertex_count(), 8);
        assert_eq!(repaired.non_manifold_edge_count(), 0);
        assert!(repaired.is_closed());
    }

    #[test]
    fn test_input_untouched() {
        let mesh = unindexed_cube();
        let before = mesh.clone();
        let _ = MeshCleaner::default().clean(&mesh).unwrap();
        assert_eq!(mesh, before);
    }
}
