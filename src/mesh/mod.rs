//! Triangle mesh storage
//!
//! `Mesh` is the canonical indexed representation every other stage consumes:
//! an ordered vertex list (position, normal, UV), a flat triangle index list,
//! a per-triangle flag marking faces created by cuts, and an explicit
//! `closed` flag tracking whether the surface is watertight.

mod bounds;
mod builder;
mod cleaner;
mod primitives;
mod topology;

pub use bounds::Aabb;
pub use cleaner::MeshCleaner;
pub use primitives::cuboid;

pub(crate) use builder::MeshBuilder;
pub(crate) use topology::{position_key, PositionKey, PositionWelder};

use glam::{Vec2, Vec3};
use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FractureError, Result};

/// A single mesh vertex
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Object-space position
    pub position: Vec3,
    /// Shading normal
    pub normal: Vec3,
    /// Texture coordinate
    pub uv: Vec2,
}

impl Vertex {
    /// Create a vertex from its attributes
    #[inline]
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Interpolate every attribute between `self` and `other`
    ///
    /// The normal is renormalized; a zero result falls back to `self.normal`.
    pub fn lerp(&self, other: &Vertex, t: f32) -> Vertex {
        let normal = self.normal.lerp(other.normal, t);
        Vertex {
            position: self.position.lerp(other.position, t),
            normal: normal.try_normalize().unwrap_or(self.normal),
            uv: self.uv.lerp(other.uv, t),
        }
    }
}

/// Engine-agnostic flat mesh buffers
///
/// This is the import/export format: parallel attribute arrays plus a
/// triangle index list. Rendering layers convert it into their native mesh
/// type (Bevy `Mesh`, Godot `ArrayMesh`, raw wgpu buffers).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates
    pub uvs: Vec<[f32; 2]>,
    /// Triangle indices (3 per triangle)
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Indexed triangle mesh
///
/// Invariants: every index is smaller than the vertex count, the index count
/// is a multiple of three, and `interior` holds one flag per triangle.
/// Deserialized meshes go through the same checks as [`Mesh::with_interior`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "MeshRecord", into = "MeshRecord"))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    interior: Vec<bool>,
    closed: bool,
}

/// Serialized form of a mesh; `closed` is derived again on load
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct MeshRecord {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    #[serde(default)]
    interior: Option<Vec<bool>>,
}

#[cfg(feature = "serde")]
impl TryFrom<MeshRecord> for Mesh {
    type Error = FractureError;

    fn try_from(record: MeshRecord) -> Result<Self> {
        let interior = record.interior.unwrap_or_else(|| vec![false; record.indices.len() / 3]);
        Mesh::with_interior(record.vertices, record.indices, interior)
    }
}

#[cfg(feature = "serde")]
impl From<Mesh> for MeshRecord {
    fn from(mesh: Mesh) -> Self {
        Self {
            vertices: mesh.vertices,
            indices: mesh.indices,
            interior: Some(mesh.interior),
        }
    }
}

impl Mesh {
    /// Create a mesh from vertices and triangle indices
    ///
    /// All triangles are treated as original (exterior) surface. The `closed`
    /// flag is derived from the topology.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGeometry` if the index count is not a multiple of three
    /// or an index is out of range.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self> {
        let interior = vec![false; indices.len() / 3];
        Self::with_interior(vertices, indices, interior)
    }

    /// Create a mesh with explicit per-triangle interior flags
    pub fn with_interior(vertices: Vec<Vertex>, indices: Vec<u32>, interior: Vec<bool>) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(FractureError::InvalidGeometry(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if interior.len() != indices.len() / 3 {
            return Err(FractureError::InvalidGeometry(format!(
                "expected {} interior flags, got {}",
                indices.len() / 3,
                interior.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(FractureError::InvalidGeometry(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }

        let mut mesh = Self {
            vertices,
            indices,
            interior,
            closed: false,
        };
        mesh.closed = !mesh.has_open_edges();
        Ok(mesh)
    }

    /// Assemble a mesh whose invariants were upheld by the caller
    pub(crate) fn from_parts(vertices: Vec<Vertex>, indices: Vec<u32>, interior: Vec<bool>, closed: bool) -> Self {
        debug_assert_eq!(indices.len() % 3, 0);
        debug_assert_eq!(interior.len(), indices.len() / 3);
        Self {
            vertices,
            indices,
            interior,
            closed,
        }
    }

    /// Import a mesh from flat attribute arrays
    ///
    /// `normals` and `uvs` may be empty, in which case they are zero-filled;
    /// otherwise they must match `positions` in length.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_voronoi_fracture::{Mesh, Vec3};
    /// use glam::Vec2;
    ///
    /// let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
    /// let mesh = Mesh::from_arrays(&positions, &[], &[], &[0, 1, 2]).unwrap();
    /// assert_eq!(mesh.triangle_count(), 1);
    /// assert!(!mesh.is_closed());
    /// # let _ = Vec2::ZERO;
    /// ```
    pub fn from_arrays(positions: &[Vec3], normals: &[Vec3], uvs: &[Vec2], indices: &[u32]) -> Result<Self> {
        if !normals.is_empty() && normals.len() != positions.len() {
            return Err(FractureError::InvalidGeometry(format!(
                "{} normals for {} positions",
                normals.len(),
                positions.len()
            )));
        }
        if !uvs.is_empty() && uvs.len() != positions.len() {
            return Err(FractureError::InvalidGeometry(format!(
                "{} uvs for {} positions",
                uvs.len(),
                positions.len()
            )));
        }

        let mut vertices = Vec::new();
        vertices
            .try_reserve_exact(positions.len())
            .map_err(|e| FractureError::ResourceExhausted(format!("vertex buffer: {}", e)))?;
        let mut index_buffer = Vec::new();
        index_buffer
            .try_reserve_exact(indices.len())
            .map_err(|e| FractureError::ResourceExhausted(format!("index buffer: {}", e)))?;

        vertices.extend(positions.iter().enumerate().map(|(i, &position)| Vertex {
            position,
            normal: normals.get(i).copied().unwrap_or(Vec3::ZERO),
            uv: uvs.get(i).copied().unwrap_or(Vec2::ZERO),
        }));
        index_buffer.extend_from_slice(indices);

        Self::new(vertices, index_buffer)
    }

    /// Import a mesh from exported flat buffers
    pub fn from_mesh_data(data: &MeshData) -> Result<Self> {
        let positions: Vec<Vec3> = data.positions.iter().map(|&p| Vec3::from(p)).collect();
        let normals: Vec<Vec3> = data.normals.iter().map(|&n| Vec3::from(n)).collect();
        let uvs: Vec<Vec2> = data.uvs.iter().map(|&uv| Vec2::from(uv)).collect();
        Self::from_arrays(&positions, &normals, &uvs, &data.indices)
    }

    /// Export as flat buffers
    pub fn to_mesh_data(&self) -> MeshData {
        MeshData {
            positions: self.vertices.iter().map(|v| v.position.to_array()).collect(),
            normals: self.vertices.iter().map(|v| v.normal.to_array()).collect(),
            uvs: self.vertices.iter().map(|v| v.uv.to_array()).collect(),
            indices: self.indices.clone(),
        }
    }

    /// Get the vertices
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Get the triangle index list
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Per-triangle flags, `true` for faces created by a cut
    #[inline]
    pub fn interior_flags(&self) -> &[bool] {
        &self.interior
    }

    /// Get the number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of indices
    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Get the number of triangles
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh has no triangles
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// A mesh is valid when it has at least one triangle over three vertices
    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 3 && !self.indices.is_empty()
    }

    /// Whether the mesh was built (or cut) as a watertight surface
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Re-derive the `closed` flag from the topology
    pub(crate) fn refresh_closed(&mut self) -> bool {
        self.closed = !self.has_open_edges();
        self.closed
    }

    /// Vertex indices of triangle `tri`
    #[inline]
    pub fn triangle(&self, tri: usize) -> [u32; 3] {
        let base = tri * 3;
        [self.indices[base], self.indices[base + 1], self.indices[base + 2]]
    }

    /// Vertex positions of triangle `tri`
    #[inline]
    pub fn triangle_positions(&self, tri: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangle(tri);
        [
            self.vertices[a as usize].position,
            self.vertices[b as usize].position,
            self.vertices[c as usize].position,
        ]
    }

    /// Whether triangle `tri` was created by a cut
    #[inline]
    pub fn is_interior(&self, tri: usize) -> bool {
        self.interior[tri]
    }

    /// Check whether any edge lacks an oppositely oriented partner
    ///
    /// Edges are matched by vertex position, so UV seams and split normals do
    /// not count as openings.
    pub fn has_open_edges(&self) -> bool {
        topology::has_open_edges(self)
    }

    /// Count edges shared by more than two triangles
    pub fn non_manifold_edge_count(&self) -> usize {
        topology::non_manifold_edge_count(self)
    }

    /// Axis-aligned bounds of all vertices
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| v.position))
    }

    /// Signed enclosed volume (divergence theorem)
    ///
    /// Positive for closed meshes with outward-facing triangles. Meaningless for
    /// open meshes.
    pub fn volume(&self) -> f32 {
        (0..self.triangle_count())
            .map(|t| {
                let [a, b, c] = self.triangle_positions(t);
                a.dot(b.cross(c))
            })
            .sum::<f32>()
            / 6.0
    }

    /// Total surface area
    pub fn surface_area(&self) -> f32 {
        (0..self.triangle_count())
            .map(|t| {
                let [a, b, c] = self.triangle_positions(t);
                (b - a).cross(c - a).length() * 0.5
            })
            .sum()
    }

    /// Area-weighted centroid of the surface
    ///
    /// Falls back to the bounds center for meshes without area.
    pub fn centroid(&self) -> Vec3 {
        let mut weighted = Vec3::ZERO;
        let mut total = 0.0;
        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle_positions(t);
            let area = (b - a).cross(c - a).length() * 0.5;
            weighted += (a + b + c) / 3.0 * area;
            total += area;
        }
        if total > f32::EPSILON {
            weighted / total
        } else {
            self.bounds().center()
        }
    }

    /// Test whether `point` lies inside the surface
    ///
    /// Uses the generalized winding number, which tolerates small gaps and is
    /// independent of ray direction. Orientation-agnostic.
    pub fn contains_point(&self, point: Vec3) -> bool {
        if self.is_empty() || !self.bounds().contains(point) {
            return false;
        }
        self.winding_number(point).abs() > 0.5
    }

    /// Generalized winding number of the surface around `point`
    pub fn winding_number(&self, point: Vec3) -> f32 {
        let mut total = 0.0f32;
        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle_positions(t);
            let (a, b, c) = (a - point, b - point, c - point);
            let (la, lb, lc) = (a.length(), b.length(), c.length());
            let numerator = a.dot(b.cross(c));
            let denominator = la * lb * lc + a.dot(b) * lc + a.dot(c) * lb + b.dot(c) * la;
            total += 2.0 * numerator.atan2(denominator);
        }
        total / (4.0 * PI)
    }

    /// Split into position-connected pieces
    ///
    /// Returns a single clone when the mesh is already connected.
    pub fn connected_components(&self) -> Vec<Mesh> {
        let groups = topology::triangle_components(self);
        if groups.len() <= 1 {
            return vec![self.clone()];
        }
        groups.iter().map(|tris| self.submesh(tris)).collect()
    }

    /// Extract the given triangles into a new compact mesh
    pub fn submesh(&self, triangles: &[usize]) -> Mesh {
        let mut builder = MeshBuilder::new();
        for &t in triangles {
            let [a, b, c] = self.triangle(t);
            builder.push_triangle(
                self.vertices[a as usize],
                self.vertices[b as usize],
                self.vertices[c as usize],
                self.interior[t],
            );
        }
        let mut mesh = builder.build(false);
        mesh.refresh_closed();
        mesh
    }

    /// Append another mesh's triangles
    ///
    /// The result is closed only if both inputs were.
    pub fn append(&mut self, other: &Mesh) {
        let was_empty = self.indices.is_empty();
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
        self.interior.extend_from_slice(&other.interior);
        self.closed = (was_empty || self.closed) && other.closed;
    }

    /// Vertices referenced by at least one cut face
    fn interior_vertices(&self) -> Vec<bool> {
        let mut mask = vec![false; self.vertices.len()];
        for t in (0..self.triangle_count()).filter(|&t| self.interior[t]) {
            for i in self.triangle(t) {
                mask[i as usize] = true;
            }
        }
        mask
    }

    /// Bounds of the texture coordinates of cut faces, `None` without cut faces
    pub fn interior_uv_bounds(&self) -> Option<(Vec2, Vec2)> {
        self.vertices
            .iter()
            .zip(self.interior_vertices())
            .filter(|(_, inside)| *inside)
            .map(|(v, _)| v.uv)
            .fold(None, |acc, uv| match acc {
                None => Some((uv, uv)),
                Some((lo, hi)) => Some((lo.min(uv), hi.max(uv))),
            })
    }

    /// Remap the UVs of cut-face vertices as `(uv - origin) * scale`
    pub fn transform_interior_uvs(&mut self, origin: Vec2, scale: f32) {
        let mask = self.interior_vertices();
        for (v, inside) in self.vertices.iter_mut().zip(mask) {
            if inside {
                v.uv = (v.uv - origin) * scale;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_meshes::*;
    use super::*;

    #[test]
    fn test_cube_properties() {
        let cube = unit_cube();
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.is_closed());
        assert!(cube.is_valid());
        assert!((cube.volume() - 1.0).abs() < 1e-5);
        assert!((cube.surface_area() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_new_rejects_bad_indices() {
        let cube = unit_cube();
        let result = Mesh::new(cube.vertices().to_vec(), vec![0, 1, 99]);
        assert!(matches!(result, Err(FractureError::InvalidGeometry(_))));

        let result = Mesh::new(cube.vertices().to_vec(), vec![0, 1]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_arrays_length_mismatch() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = [Vec3::Z];
        let result = Mesh::from_arrays(&positions, &normals, &[], &[0, 1, 2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mesh_data_roundtrip_preserves_counts() {
        let cube = unit_cube();
        let data = cube.to_mesh_data();
        assert_eq!(data.vertex_count(), 8);
        assert_eq!(data.index_count(), 36);
        let restored = Mesh::from_mesh_data(&data).unwrap();
        assert_eq!(restored.vertices(), cube.vertices());
        assert_eq!(restored.indices(), cube.indices());
    }

    #[test]
    fn test_contains_point() {
        let cube = unit_cube();
        assert!(cube.contains_point(Vec3::ZERO));
        assert!(cube.contains_point(Vec3::new(0.4, -0.4, 0.3)));
        assert!(!cube.contains_point(Vec3::new(0.6, 0.0, 0.0)));
        assert!(!cube.contains_point(Vec3::new(3.0, 3.0, 3.0)));
    }

    #[test]
    fn test_open_mesh_detected() {
        let cube = unit_cube();
        // Drop the last triangle to punch a hole
        let indices = cube.indices()[..33].to_vec();
        let open = Mesh::new(cube.vertices().to_vec(), indices).unwrap();
        assert!(!open.is_closed());
        assert!(open.has_open_edges());
    }

    #[test]
    fn test_connected_components() {
        let mesh = two_cubes();
        assert!(mesh.is_closed());
        let parts = mesh.connected_components();
        assert_eq!(parts.len(), 2);
        for part in &parts {
            assert_eq!(part.triangle_count(), 12);
            assert!(part.is_closed());
            assert!((part.volume() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_centroid_and_bounds() {
        let cube = cube_at(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let centroid = cube.centroid();
        assert!((centroid - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        let bounds = cube.bounds();
        assert_eq!(bounds.min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(bounds.max, Vec3::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn test_interior_uv_transform() {
        let cube = unit_cube();
        assert_eq!(cube.interior_uv_bounds(), None);

        let mut flags = vec![false; 12];
        flags[0] = true;
        let mut mesh = Mesh::with_interior(cube.vertices().to_vec(), cube.indices().to_vec(), flags).unwrap();
        let (lo, hi) = mesh.interior_uv_bounds().unwrap();
        mesh.transform_interior_uvs(lo, 2.0);
        let (new_lo, new_hi) = mesh.interior_uv_bounds().unwrap();
        assert_eq!(new_lo, Vec2::ZERO);
        assert_eq!(new_hi, (hi - lo) * 2.0);

        // Vertices of exterior faces only are left alone
        let untouched = cube.triangle(11).iter().any(|&i| mesh.vertices()[i as usize] == cube.vertices()[i as usize]);
        assert!(untouched);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialized_mesh_is_validated_on_load() {
        let bad = r#"{"vertices":[],"indices":[0,1,2],"interior":[]}"#;
        assert!(serde_json::from_str::<Mesh>(bad).is_err());

        let short_flags = r#"{"vertices":[],"indices":[],"interior":[true]}"#;
        assert!(serde_json::from_str::<Mesh>(short_flags).is_err());

        let mut flags = vec![false; 12];
        flags[3] = true;
        let cube = unit_cube();
        let mesh = Mesh::with_interior(cube.vertices().to_vec(), cube.indices().to_vec(), flags).unwrap();
        let json = serde_json::to_string(&mesh).unwrap();
        let restored: Mesh = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, mesh);
        assert!(restored.is_closed());
    }
}
