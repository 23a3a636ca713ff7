//! Plane splitting of triangle meshes
//!
//! A closed mesh is split into the part below and the part above a plane,
//! and both parts are closed again with a shared cap. Crossing points are
//! always computed from the position-ordered edge, so neighboring triangles
//! agree on them bit for bit. Points on the plane are welded within a few
//! ULPs of the mesh extent: after several cuts the same boundary point can
//! be reached through different edges, and those copies must coincide for
//! the halves to stay watertight.

use glam::{Vec2, Vec3};
use std::collections::{HashMap, HashSet};

use crate::config::NoiseConfig;
use crate::error::{FractureError, Result};
use crate::mesh::{position_key, Mesh, MeshBuilder, PositionKey, PositionWelder, Vertex};
use crate::noise;
use crate::plane::{Plane, PLANE_EPSILON};

/// How new cut faces are shaped and shaded
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CapStyle {
    pub noise: NoiseConfig,
    pub seed: u32,
    /// Noisy caps get averaged normals instead of per-face normals
    pub smooth_normals: bool,
}

impl CapStyle {
    /// Flat planar caps
    pub(crate) fn flat() -> Self {
        Self {
            noise: NoiseConfig::default(),
            seed: 0,
            smooth_normals: true,
        }
    }

    pub(crate) fn noisy(noise: NoiseConfig, seed: u32, smooth_normals: bool) -> Self {
        Self {
            noise,
            seed,
            smooth_normals,
        }
    }
}

/// Weld tolerance in units of `f32::EPSILON` times the mesh extent
const WELD_ULPS: f32 = 32.0;

/// Both sides of a split; either may be empty
#[derive(Debug, Clone)]
pub(crate) struct Split {
    pub below: Mesh,
    pub above: Mesh,
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    vertex: Vertex,
    distance: f32,
}

impl Corner {
    #[inline]
    fn on_plane(&self) -> bool {
        self.distance == 0.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Face {
    corners: [Corner; 3],
    interior: bool,
}

/// Split `mesh` by `plane`
///
/// A closed mesh yields closed halves. An open mesh is split without caps
/// and both halves are marked open.
///
/// # Errors
///
/// Returns `InvalidGeometry` when the boundary of a closed mesh does not
/// form closed loops in the plane, the cap cannot be triangulated, or a
/// half of a closed mesh comes out with open edges.
pub(crate) fn split(mesh: &Mesh, plane: &Plane, style: &CapStyle) -> Result<Split> {
    split_impl(mesh, plane, Some(style))
}

/// Split the surface only, never adding caps
///
/// A plane that crosses the mesh leaves both halves open. The fragments are
/// identical to the ones [`split`] produces for the same triangles.
pub(crate) fn split_surface(mesh: &Mesh, plane: &Plane) -> Result<Split> {
    split_impl(mesh, plane, None)
}

fn split_impl(mesh: &Mesh, plane: &Plane, style: Option<&CapStyle>) -> Result<Split> {
    let distances: Vec<f32> = mesh
        .vertices()
        .iter()
        .map(|v| {
            let d = plane.signed_distance(v.position);
            if d.abs() < PLANE_EPSILON {
                0.0
            } else {
                d
            }
        })
        .collect();

    let any_below = distances.iter().any(|&d| d < 0.0);
    let any_above = distances.iter().any(|&d| d > 0.0);
    if any_below && !any_above {
        return Ok(Split {
            below: mesh.clone(),
            above: Mesh::default(),
        });
    }
    if any_above && !any_below {
        return Ok(Split {
            below: Mesh::default(),
            above: mesh.clone(),
        });
    }

    let mut welder = PositionWelder::new(weld_tolerance(mesh));
    let vertices: Vec<Vertex> = mesh
        .vertices()
        .iter()
        .zip(&distances)
        .map(|(v, &d)| {
            if d == 0.0 {
                Vertex::new(welder.weld(v.position), v.normal, v.uv)
            } else {
                *v
            }
        })
        .collect();

    let mut below: Vec<Face> = Vec::new();
    let mut above: Vec<Face> = Vec::new();

    for t in 0..mesh.triangle_count() {
        let corners = mesh.triangle(t).map(|i| Corner {
            vertex: vertices[i as usize],
            distance: distances[i as usize],
        });
        let interior = mesh.is_interior(t);
        let has_below = corners.iter().any(|c| c.distance < 0.0);
        let has_above = corners.iter().any(|c| c.distance > 0.0);

        match (has_below, has_above) {
            (false, false) => {
                // Coplanar: the face belongs to the solid its normal points away from
                let [a, b, c] = corners.map(|c| c.vertex.position);
                if (b - a).cross(c - a).dot(plane.normal) > 0.0 {
                    push_face(corners, interior, &mut below);
                } else {
                    push_face(corners, interior, &mut above);
                }
            }
            (true, false) => push_face(corners, interior, &mut below),
            (false, true) => push_face(corners, interior, &mut above),
            (true, true) => {
                fan(&clip_corners(&corners, true, &mut welder), interior, &mut below);
                fan(&clip_corners(&corners, false, &mut welder), interior, &mut above);
            }
        }
    }

    let closed_input = style.is_some() && mesh.is_closed();
    let cap = match style {
        Some(style) if closed_input && !below.is_empty() && !above.is_empty() => build_cap(&below, plane, style)?,
        Some(_) if !mesh.is_closed() => {
            log::warn!("splitting an open mesh, pieces are left without caps");
            Vec::new()
        }
        _ => Vec::new(),
    };

    let flat = CapStyle::flat();
    let style = style.unwrap_or(&flat);
    let below = assemble(&below, &cap, plane, style, false, closed_input)?;
    let above = assemble(&above, &cap, plane, style, true, closed_input)?;
    Ok(Split { below, above })
}

fn weld_tolerance(mesh: &Mesh) -> f32 {
    let bounds = mesh.bounds();
    let extent = bounds.min.abs().max(bounds.max.abs()).max_element().max(1.0);
    extent * WELD_ULPS * f32::EPSILON
}

fn assemble(
    faces: &[Face],
    cap: &[[Vec3; 3]],
    plane: &Plane,
    style: &CapStyle,
    flip: bool,
    closed_input: bool,
) -> Result<Mesh> {
    let mut builder = MeshBuilder::new();
    for face in faces {
        let [a, b, c] = face.corners;
        builder.push_triangle(a.vertex, b.vertex, c.vertex, face.interior);
    }
    if !builder.is_empty() {
        emit_cap(&mut builder, cap, plane, style, flip);
    }

    let mut mesh = builder.build(false);
    if closed_input && !mesh.is_empty() && !mesh.refresh_closed() {
        return Err(FractureError::InvalidGeometry(format!(
            "cut piece with {} triangles is not watertight",
            mesh.triangle_count()
        )));
    }
    Ok(mesh)
}

/// Crossing point of an edge, computed from its position-ordered endpoints
fn crossing(a: &Corner, b: &Corner, welder: &mut PositionWelder) -> Corner {
    let (first, second) = if position_key(a.vertex.position) <= position_key(b.vertex.position) {
        (a, b)
    } else {
        (b, a)
    };
    let t = first.distance / (first.distance - second.distance);
    let mut vertex = first.vertex.lerp(&second.vertex, t);
    vertex.position = welder.weld(vertex.position);
    Corner { vertex, distance: 0.0 }
}

/// Sutherland–Hodgman clip of one triangle against one side of the plane
fn clip_corners(corners: &[Corner; 3], keep_below: bool, welder: &mut PositionWelder) -> Vec<Corner> {
    let inside = |d: f32| if keep_below { d <= 0.0 } else { d >= 0.0 };
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let current = &corners[i];
        let next = &corners[(i + 1) % 3];
        if inside(current.distance) {
            out.push(*current);
        }
        if current.distance * next.distance < 0.0 {
            out.push(crossing(current, next, welder));
        }
    }
    out
}

/// Keep a face unless welding collapsed two of its corners
fn push_face(corners: [Corner; 3], interior: bool, out: &mut Vec<Face>) {
    let keys = corners.map(|c| position_key(c.vertex.position));
    if keys[0] != keys[1] && keys[1] != keys[2] && keys[2] != keys[0] {
        out.push(Face { corners, interior });
    }
}

fn fan(polygon: &[Corner], interior: bool, out: &mut Vec<Face>) {
    for i in 1..polygon.len().saturating_sub(1) {
        push_face([polygon[0], polygon[i], polygon[i + 1]], interior, out);
    }
}

/// Triangles closing the lower part, wound to face along the plane normal
fn build_cap(below: &[Face], plane: &Plane, style: &CapStyle) -> Result<Vec<[Vec3; 3]>> {
    // Net count of each on-plane edge, +1 for lo->hi and -1 for hi->lo
    let mut balance: HashMap<(PositionKey, PositionKey), (i32, Vec3, Vec3)> = HashMap::new();
    for face in below {
        for i in 0..3 {
            let (a, b) = (&face.corners[i], &face.corners[(i + 1) % 3]);
            if !a.on_plane() || !b.on_plane() {
                continue;
            }
            let (pa, pb) = (a.vertex.position, b.vertex.position);
            let (ka, kb) = (position_key(pa), position_key(pb));
            if ka == kb {
                continue;
            }
            if ka < kb {
                balance.entry((ka, kb)).or_insert((0, pa, pb)).0 += 1;
            } else {
                balance.entry((kb, ka)).or_insert((0, pb, pa)).0 -= 1;
            }
        }
    }

    // The cap runs against the open boundary of the lower part
    let mut edges: Vec<(Vec3, Vec3)> = Vec::new();
    for &(count, lo, hi) in balance.values() {
        for _ in 0..count.unsigned_abs() {
            edges.push(if count > 0 { (hi, lo) } else { (lo, hi) });
        }
    }
    if edges.is_empty() {
        return Ok(Vec::new());
    }
    // HashMap order is arbitrary; chaining must not depend on it
    edges.sort_by(|a, b| {
        (position_key(a.0), position_key(a.1)).cmp(&(position_key(b.0), position_key(b.1)))
    });

    let loops = chain_loops(&edges).ok_or_else(|| {
        FractureError::InvalidGeometry("cut boundary does not form closed loops".to_string())
    })?;
    let mut triangles = triangulate_loops(&loops, plane)?;

    if style.noise.is_enabled() {
        let fixed: HashSet<PositionKey> = loops.iter().flatten().map(|&p| position_key(p)).collect();
        for _ in 0..style.noise.surface_resolution.min(NoiseConfig::MAX_RESOLUTION) {
            triangles = triangles
                .into_iter()
                .flat_map(|[a, b, c]| {
                    let m = (a + b + c) / 3.0;
                    [[a, b, m], [b, c, m], [c, a, m]]
                })
                .collect();
        }
        for tri in &mut triangles {
            for p in tri.iter_mut() {
                if !fixed.contains(&position_key(*p)) {
                    *p += plane.normal * noise::surface_offset(&style.noise, style.seed, *p);
                }
            }
        }
    }

    Ok(triangles)
}

/// Link directed edges head to tail into closed loops
fn chain_loops(edges: &[(Vec3, Vec3)]) -> Option<Vec<Vec<Vec3>>> {
    let mut outgoing: HashMap<PositionKey, Vec<usize>> = HashMap::new();
    for (i, (start, _)) in edges.iter().enumerate() {
        outgoing.entry(position_key(*start)).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();
    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let start_key = position_key(edges[first].0);
        let mut ring = vec![edges[first].0];
        let mut end = edges[first].1;

        while position_key(end) != start_key {
            let next = outgoing
                .get(&position_key(end))?
                .iter()
                .copied()
                .find(|&candidate| !used[candidate])?;
            used[next] = true;
            ring.push(edges[next].0);
            end = edges[next].1;
        }
        loops.push(ring);
    }
    Some(loops)
}

fn signed_area(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a[0] * b[1] - b[0] * a[1]
        })
        .sum::<f64>()
        * 0.5
}

fn point_in_polygon(p: [f64; 2], polygon: &[[f64; 2]]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) && p[0] < (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0] {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Triangulate cap loops in the plane, holes included
///
/// Counter-clockwise loops (seen along the normal) are outer boundaries,
/// clockwise loops are holes assigned to the smallest enclosing boundary.
fn triangulate_loops(loops: &[Vec<Vec3>], plane: &Plane) -> Result<Vec<[Vec3; 3]>> {
    let (u, v) = plane.basis();
    let project = |p: Vec3| [p.dot(u) as f64, p.dot(v) as f64];
    let flat: Vec<Vec<[f64; 2]>> = loops.iter().map(|ring| ring.iter().map(|&p| project(p)).collect()).collect();
    let areas: Vec<f64> = flat.iter().map(|ring| signed_area(ring)).collect();

    let outers: Vec<usize> = (0..loops.len()).filter(|&i| areas[i] > 0.0).collect();
    let mut holes_of: HashMap<usize, Vec<usize>> = HashMap::new();
    for hole in (0..loops.len()).filter(|&i| areas[i] < 0.0) {
        let corner = flat[hole][0];
        let owner = outers
            .iter()
            .copied()
            .filter(|&outer| point_in_polygon(corner, &flat[outer]))
            .min_by(|&a, &b| areas[a].total_cmp(&areas[b]));
        match owner {
            Some(outer) => holes_of.entry(outer).or_default().push(hole),
            None => log::warn!("cap hole with {} points has no enclosing loop", loops[hole].len()),
        }
    }

    let mut triangles = Vec::new();
    for &outer in &outers {
        let mut points: Vec<Vec3> = loops[outer].clone();
        let mut coords: Vec<[f64; 2]> = flat[outer].clone();
        let mut hole_indices = Vec::new();
        for &hole in holes_of.get(&outer).map(Vec::as_slice).unwrap_or(&[]) {
            hole_indices.push(points.len());
            points.extend_from_slice(&loops[hole]);
            coords.extend_from_slice(&flat[hole]);
        }

        let flattened: Vec<f64> = coords.iter().flat_map(|c| [c[0], c[1]]).collect();
        let indices = earcutr::earcut(&flattened, &hole_indices, 2).map_err(|e| {
            FractureError::InvalidGeometry(format!("cap triangulation failed: {:?}", e))
        })?;

        let mut group: Vec<[usize; 3]> = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        restore_dropped_points(&mut group, &coords, &points);

        // The triangulator winds every triangle of a group the same way
        let area: f64 = group
            .iter()
            .map(|&[a, b, c]| {
                let (pa, pb, pc) = (coords[a], coords[b], coords[c]);
                (pb[0] - pa[0]) * (pc[1] - pa[1]) - (pb[1] - pa[1]) * (pc[0] - pa[0])
            })
            .sum();
        for [a, b, c] in group {
            if area < 0.0 {
                triangles.push([points[a], points[c], points[b]]);
            } else {
                triangles.push([points[a], points[b], points[c]]);
            }
        }
    }
    Ok(triangles)
}

/// Split triangles at boundary points the triangulator skipped
///
/// Ear clipping drops collinear ring points, but the side faces still end
/// at them; splitting the cap triangle there avoids T-junctions.
fn restore_dropped_points(triangles: &mut Vec<[usize; 3]>, coords: &[[f64; 2]], points: &[Vec3]) {
    let used: HashSet<PositionKey> = triangles.iter().flatten().map(|&i| position_key(points[i])).collect();
    let mut seen = HashSet::new();
    let missing: Vec<usize> = (0..points.len())
        .filter(|&i| {
            let key = position_key(points[i]);
            !used.contains(&key) && seen.insert(key)
        })
        .collect();
    if missing.is_empty() {
        return;
    }

    let between = |p: [f64; 2], a: [f64; 2], b: [f64; 2]| {
        let ab = [b[0] - a[0], b[1] - a[1]];
        let ap = [p[0] - a[0], p[1] - a[1]];
        let len2 = ab[0] * ab[0] + ab[1] * ab[1];
        let cross = ab[0] * ap[1] - ab[1] * ap[0];
        let dot = ab[0] * ap[0] + ab[1] * ap[1];
        len2 > 0.0 && cross.abs() <= 1e-9 * len2 && dot > 0.0 && dot < len2
    };

    let mut pending = std::mem::take(triangles);
    while let Some(tri) = pending.pop() {
        let split_at = (0..3).find_map(|e| {
            let (a, b) = (tri[e], tri[(e + 1) % 3]);
            missing
                .iter()
                .copied()
                .find(|&p| between(coords[p], coords[a], coords[b]))
                .map(|p| (e, p))
        });
        match split_at {
            Some((e, p)) => {
                let (a, b, c) = (tri[e], tri[(e + 1) % 3], tri[(e + 2) % 3]);
                pending.push([a, p, c]);
                pending.push([p, b, c]);
            }
            None => triangles.push(tri),
        }
    }
}

/// Add cap triangles to one side; the upper side gets them mirrored
fn emit_cap(builder: &mut MeshBuilder, cap: &[[Vec3; 3]], plane: &Plane, style: &CapStyle, flip: bool) {
    if cap.is_empty() {
        return;
    }
    let (u, v) = plane.basis();
    let n = plane.normal;
    let noisy = style.noise.is_enabled();

    let smooth: Option<HashMap<PositionKey, Vec3>> = (noisy && style.smooth_normals).then(|| {
        let mut sums: HashMap<PositionKey, Vec3> = HashMap::new();
        for &[a, b, c] in cap {
            let weighted = (b - a).cross(c - a);
            for p in [a, b, c] {
                *sums.entry(position_key(p)).or_insert(Vec3::ZERO) += weighted;
            }
        }
        sums.into_iter()
            .map(|(key, sum)| (key, sum.try_normalize().unwrap_or(n)))
            .collect()
    });

    for &[a, b, c] in cap {
        let face_normal = (b - a).cross(c - a).try_normalize().unwrap_or(n);
        let normal_at = |p: Vec3| {
            let normal = if !noisy {
                n
            } else if let Some(map) = &smooth {
                map.get(&position_key(p)).copied().unwrap_or(n)
            } else {
                face_normal
            };
            if flip {
                -normal
            } else {
                normal
            }
        };
        let corner = |p: Vec3| Vertex::new(p, normal_at(p), Vec2::new(p.dot(u), p.dot(v)));

        if flip {
            builder.push_triangle(corner(a), corner(c), corner(b), true);
        } else {
            builder.push_triangle(corner(a), corner(b), corner(c), true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::{cube_at, unit_cube};

    fn plane(point: Vec3, normal: Vec3) -> Plane {
        Plane::from_point_normal(point, normal).unwrap()
    }

    #[test]
    fn test_split_cube_in_half() {
        let cube = unit_cube();
        let split = split(&cube, &plane(Vec3::ZERO, Vec3::Y), &CapStyle::flat()).unwrap();

        assert!(split.below.is_closed());
        assert!(split.above.is_closed());
        assert!((split.below.volume() - 0.5).abs() < 1e-5);
        assert!((split.above.volume() - 0.5).abs() < 1e-5);
        assert!(split.below.bounds().max.y <= 1e-6);
        assert!(split.above.bounds().min.y >= -1e-6);
        assert!(split.below.interior_flags().iter().any(|&f| f));
    }

    #[test]
    fn test_cap_faces_point_out() {
        let split = split(&unit_cube(), &plane(Vec3::ZERO, Vec3::X), &CapStyle::flat()).unwrap();
        for t in 0..split.below.triangle_count() {
            if split.below.is_interior(t) {
                let [a, b, c] = split.below.triangle_positions(t);
                let normal = (b - a).cross(c - a);
                assert!(normal.x >= 0.0);
                assert!(normal.y.abs() < 1e-6 && normal.z.abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_oblique_split_conserves_volume() {
        let cube = unit_cube();
        let tilted = plane(Vec3::new(0.1, -0.05, 0.2), Vec3::new(0.3, 1.0, -0.4));
        let split = split(&cube, &tilted, &CapStyle::flat()).unwrap();
        assert!(split.below.is_closed());
        assert!(split.above.is_closed());
        assert!((split.below.volume() + split.above.volume() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_plane_through_vertices() {
        // Diagonal plane through four cube corners
        let cube = unit_cube();
        let diagonal = plane(Vec3::ZERO, Vec3::new(1.0, -1.0, 0.0));
        let split = split(&cube, &diagonal, &CapStyle::flat()).unwrap();
        assert!(split.below.is_closed());
        assert!(split.above.is_closed());
        assert!((split.below.volume() - 0.5).abs() < 1e-5);
        assert!((split.above.volume() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_plane_missing_mesh() {
        let cube = unit_cube();
        let split = split(&cube, &plane(Vec3::new(0.0, 2.0, 0.0), Vec3::Y), &CapStyle::flat()).unwrap();
        assert_eq!(split.below, cube);
        assert!(split.above.is_empty());
    }

    #[test]
    fn test_plane_on_face() {
        let cube = unit_cube();
        let split = split(&cube, &plane(Vec3::new(0.0, 0.5, 0.0), Vec3::Y), &CapStyle::flat()).unwrap();
        assert!(split.above.is_empty());
        assert_eq!(split.below.triangle_count(), 12);
    }

    #[test]
    fn test_split_two_cubes_cap_has_two_loops() {
        let mut mesh = cube_at(Vec3::ZERO, 0.5);
        mesh.append(&cube_at(Vec3::new(3.0, 0.0, 0.0), 0.5));
        let split = split(&mesh, &plane(Vec3::new(0.0, 0.1, 0.0), Vec3::Y), &CapStyle::flat()).unwrap();
        assert!(split.below.is_closed());
        assert_eq!(split.below.connected_components().len(), 2);
        assert!((split.below.volume() - 1.2).abs() < 1e-4);
    }

    #[test]
    fn test_cap_with_hole() {
        // Hollow box: outer cube with an inward-facing inner cube
        let outer = cube_at(Vec3::ZERO, 1.0);
        let inner = cube_at(Vec3::ZERO, 0.5);
        let flipped: Vec<u32> = inner.indices().chunks(3).flat_map(|t| [t[0], t[2], t[1]]).collect();
        let inner = Mesh::new(inner.vertices().to_vec(), flipped).unwrap();
        let mut hollow = outer.clone();
        hollow.append(&inner);
        assert!((hollow.volume() - 7.0).abs() < 1e-4);

        let split = split(&hollow, &plane(Vec3::ZERO, Vec3::Y), &CapStyle::flat()).unwrap();
        assert!(split.below.is_closed());
        assert!(split.above.is_closed());
        assert!((split.below.volume() - 3.5).abs() < 1e-4);
        let cap_area: f32 = (0..split.below.triangle_count())
            .filter(|&t| split.below.is_interior(t))
            .map(|t| {
                let [a, b, c] = split.below.triangle_positions(t);
                (b - a).cross(c - a).length() * 0.5
            })
            .sum();
        assert!((cap_area - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_noisy_split_stays_closed() {
        let noise = NoiseConfig {
            amplitude: 0.1,
            frequency: 2.0,
            octave_number: 2,
            surface_resolution: 2,
        };
        let style = CapStyle::noisy(noise, 17, true);
        let split = split(&unit_cube(), &plane(Vec3::new(0.0, 0.05, 0.0), Vec3::Y), &style).unwrap();
        assert!(split.below.is_closed());
        assert!(split.above.is_closed());
        assert!((split.below.volume() + split.above.volume() - 1.0).abs() < 1e-4);
        // 4 boundary points refined twice: more than the 2 flat cap triangles
        let cap_count = split.below.interior_flags().iter().filter(|&&f| f).count();
        assert!(cap_count > 2);
    }

    #[test]
    fn test_surface_split_matches_capped_split() {
        let cube = unit_cube();
        let plane = plane(Vec3::new(0.0, 0.1, 0.0), Vec3::new(0.2, 1.0, 0.1));
        let capped = split(&cube, &plane, &CapStyle::flat()).unwrap();
        let bare = split_surface(&cube, &plane).unwrap();

        assert!(!bare.below.is_closed());
        assert!(bare.below.interior_flags().iter().all(|&f| !f));
        let capped_sides = capped.below.interior_flags().iter().filter(|&&f| !f).count();
        assert_eq!(bare.below.triangle_count(), capped_sides);
        assert_eq!(bare.below.triangle_positions(0), capped.below.triangle_positions(0));
    }

    #[test]
    fn test_open_mesh_split_stays_open() {
        let cube = unit_cube();
        let open = Mesh::new(cube.vertices().to_vec(), cube.indices()[..30].to_vec()).unwrap();
        let split = split(&open, &plane(Vec3::ZERO, Vec3::Y), &CapStyle::flat()).unwrap();
        assert!(!split.below.is_closed());
        assert!(!split.above.is_closed());
        assert!(split.below.interior_flags().iter().all(|&f| !f));
    }
}
