//! Primitive mesh constructors

use glam::{Vec2, Vec3};

use super::{Mesh, Vertex};

/// Triangles of a box over the corner order used by [`cuboid`], wound outward
const CUBOID_TRIANGLES: [u32; 36] = [
    0, 2, 1, 0, 3, 2, // -z
    4, 5, 6, 4, 6, 7, // +z
    0, 1, 5, 0, 5, 4, // -y
    3, 7, 6, 3, 6, 2, // +y
    0, 4, 7, 0, 7, 3, // -x
    1, 2, 6, 1, 6, 5, // +x
];

/// Closed box centered at the origin with 8 shared corner vertices
///
/// Normals point along the corner diagonals and UVs are the XY position
/// mapped onto `[0, 1]`.
///
/// # Example
///
/// ```
/// use rust_voronoi_fracture::{cuboid, Vec3};
///
/// let cube = cuboid(Vec3::splat(0.5));
/// assert_eq!(cube.triangle_count(), 12);
/// assert!((cube.volume() - 1.0).abs() < 1e-5);
/// ```
pub fn cuboid(half_extents: Vec3) -> Mesh {
    let corners = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ];

    let vertices = corners
        .iter()
        .map(|&corner| {
            let uv = Vec2::new(corner.x, corner.y) * 0.5 + Vec2::splat(0.5);
            Vertex::new(corner * half_extents, corner.normalize(), uv)
        })
        .collect();

    Mesh::from_parts(vertices, CUBOID_TRIANGLES.to_vec(), vec![false; 12], true)
}
