//! Cutout pattern extrusion
//!
//! Every loop of the pattern is placed in the XY plane of the cutout
//! transform and swept along its +Z axis into a prism, or a frustum when the
//! aperture is non-zero. The part of the chunk inside the sweep becomes a
//! plug. Whatever lies outside all sweeps stays together as the remainder,
//! which is closed again with the plug walls turned inside out.
//!
//! Non-convex loops are cut as a set of convex parts, one after the other.
//! A later part picks up the inverted wall an earlier part left on their
//! shared diagonal, so the plugs of one loop meet face to face and are
//! joined by dropping those wall pairs.

use glam::{Vec2, Vec3};
use rand::Rng;
use std::collections::HashMap;

use super::cut::{self, CapStyle};
use crate::config::{is_convex_loop, signed_area_2d, CutoutConfig};
use crate::error::{FractureError, Result};
use crate::mesh::{position_key, Mesh, MeshBuilder, PositionKey, Vertex};
use crate::plane::Plane;

/// Resolved placement of the pattern plane for one chunk
#[derive(Debug, Clone, Copy)]
struct Placement {
    origin: Vec3,
    u: Vec3,
    v: Vec3,
    axis: Vec3,
    scale: Vec2,
}

impl Placement {
    fn new(mesh: &Mesh, config: &CutoutConfig) -> Self {
        let bounds = mesh.bounds();
        let rotation = config.transform.rotation.normalize();
        let origin = if config.is_relative_transform {
            bounds.center() + config.transform.translation
        } else {
            config.transform.translation
        };
        let fit = bounds.diagonal();
        let scale = Vec2::new(
            if config.scale.x < 0.0 { fit } else { config.scale.x },
            if config.scale.y < 0.0 { fit } else { config.scale.y },
        );
        Self {
            origin,
            u: rotation * Vec3::X,
            v: rotation * Vec3::Y,
            axis: rotation * Vec3::Z,
            scale,
        }
    }

    fn to_world(&self, p: Vec2) -> Vec3 {
        self.origin + self.u * (p.x * self.scale.x) + self.v * (p.y * self.scale.y)
    }

    /// Sides of a counter-clockwise convex part, normals pointing out of the sweep
    fn sides(&self, part: &ConvexPart, aperture_degrees: f32) -> Vec<Side> {
        let world: Vec<Vec3> = part.points.iter().map(|&p| self.to_world(p)).collect();
        let half = aperture_degrees.to_radians() * 0.5;
        let (sin, cos) = half.sin_cos();
        (0..world.len())
            .filter_map(|i| {
                let (a, b) = (world[i], world[(i + 1) % world.len()]);
                let outward = (b - a).cross(self.axis).try_normalize()?;
                let plane = Plane::from_point_normal(a, outward * cos - self.axis * sin)?;
                Some(Side {
                    plane,
                    shared: part.shared[i],
                })
            })
            .collect()
    }
}

/// One side plane of a sweep
#[derive(Debug, Clone, Copy)]
struct Side {
    plane: Plane,
    /// The side is a diagonal between two parts of the same loop
    shared: bool,
}

/// Counter-clockwise convex piece of a pattern loop
#[derive(Debug, Clone, PartialEq)]
struct ConvexPart {
    points: Vec<Vec2>,
    /// One flag per edge `points[i] -> points[i + 1]`
    shared: Vec<bool>,
}

/// Split a simple loop into convex parts
///
/// The loop is triangulated and neighboring triangles are merged across
/// their diagonal as long as the result stays convex.
fn convex_parts(points: &[Vec2]) -> Result<Vec<ConvexPart>> {
    let mut ring = points.to_vec();
    if signed_area_2d(&ring) < 0.0 {
        ring.reverse();
    }
    let n = ring.len();
    if is_convex_loop(&ring) {
        return Ok(vec![ConvexPart {
            points: ring,
            shared: vec![false; n],
        }]);
    }

    let flat: Vec<f64> = ring.iter().flat_map(|p| [p.x as f64, p.y as f64]).collect();
    let indices = earcutr::earcut(&flat, &[], 2)
        .map_err(|e| FractureError::InvalidGeometry(format!("cutout loop triangulation failed: {:?}", e)))?;

    let mut parts: Vec<Vec<usize>> = indices
        .chunks_exact(3)
        .map(|t| {
            if signed_area_2d(&[ring[t[0]], ring[t[1]], ring[t[2]]]) < 0.0 {
                vec![t[0], t[2], t[1]]
            } else {
                vec![t[0], t[1], t[2]]
            }
        })
        .collect();

    'merge: loop {
        for i in 0..parts.len() {
            for j in i + 1..parts.len() {
                let Some(merged) = merge_across_diagonal(&parts[i], &parts[j], n) else {
                    continue;
                };
                let merged_points: Vec<Vec2> = merged.iter().map(|&k| ring[k]).collect();
                if is_convex_loop(&merged_points) {
                    parts[i] = merged;
                    parts.swap_remove(j);
                    continue 'merge;
                }
            }
        }
        break;
    }

    Ok(parts
        .into_iter()
        .map(|part| {
            let len = part.len();
            ConvexPart {
                points: part.iter().map(|&k| ring[k]).collect(),
                shared: (0..len).map(|i| part[(i + 1) % len] != (part[i] + 1) % n).collect(),
            }
        })
        .collect())
}

/// Join two counter-clockwise index polygons that share a diagonal
///
/// Edges of the outline (`k -> k + 1` modulo `n`) are never shared.
fn merge_across_diagonal(first: &[usize], second: &[usize], n: usize) -> Option<Vec<usize>> {
    let (len_a, len_b) = (first.len(), second.len());
    for k in 0..len_a {
        let (u, v) = (first[k], first[(k + 1) % len_a]);
        if v == (u + 1) % n {
            continue;
        }
        let Some(m) = (0..len_b).find(|&m| second[m] == v && second[(m + 1) % len_b] == u) else {
            continue;
        };
        // v around `first` to u, then strictly between u and v on `second`
        let mut merged: Vec<usize> = (0..len_a).map(|i| first[(k + 1 + i) % len_a]).collect();
        merged.extend((2..len_b).map(|i| second[(m + i) % len_b]));
        return Some(merged);
    }
    None
}

/// Triangle identity by positions, independent of where the winding starts
type TriangleKey = [PositionKey; 3];

fn triangle_key(positions: [Vec3; 3]) -> TriangleKey {
    let keys = positions.map(position_key);
    let first = (0..3).min_by_key(|&i| keys[i]).unwrap_or(0);
    [keys[first], keys[(first + 1) % 3], keys[(first + 2) % 3]]
}

/// Cut the plug of one convex part out of `mesh`
///
/// Returns `(plug, remainder)`. The plug is empty when the sweep misses the
/// mesh. Shared sides always get flat walls.
///
/// # Errors
///
/// `InvalidGeometry` when a closed mesh leaves a remainder that is not watertight.
fn cut_loop(mesh: &Mesh, sides: &[Side], style: &CapStyle) -> Result<(Mesh, Mesh)> {
    let flat = CapStyle::flat();
    let mut plug = mesh.clone();
    for side in sides {
        let side_style = if side.shared { &flat } else { style };
        plug = cut::split(&plug, &side.plane, side_style)?.below;
        if plug.is_empty() {
            return Ok((Mesh::default(), mesh.clone()));
        }
    }

    // Same planes on the bare surface: every fragment is split by every
    // plane so inner and outer fragments meet without T-junctions
    let mut inside = mesh.clone();
    let mut outside = Mesh::default();
    for side in sides {
        let inner = cut::split_surface(&inside, &side.plane)?;
        let outer = cut::split_surface(&outside, &side.plane)?;
        inside = inner.below;
        outside = inner.above;
        outside.append(&outer.below);
        outside.append(&outer.above);
    }

    let mut fragments: HashMap<TriangleKey, usize> = HashMap::new();
    for t in 0..inside.triangle_count() {
        *fragments.entry(triangle_key(inside.triangle_positions(t))).or_insert(0) += 1;
    }

    let mut builder = MeshBuilder::new();
    for t in 0..outside.triangle_count() {
        let [a, b, c] = outside.triangle(t).map(|i| outside.vertices()[i as usize]);
        builder.push_triangle(a, b, c, outside.is_interior(t));
    }
    // Plug walls are whatever the plug has beyond the surface fragments
    for t in 0..plug.triangle_count() {
        let key = triangle_key(plug.triangle_positions(t));
        if let Some(count) = fragments.get_mut(&key).filter(|count| **count > 0) {
            *count -= 1;
            continue;
        }
        let [a, b, c] = plug.triangle(t).map(|i| {
            let v = plug.vertices()[i as usize];
            Vertex::new(v.position, -v.normal, v.uv)
        });
        builder.push_triangle(a, c, b, true);
    }

    let mut remainder = builder.build(false);
    if mesh.is_closed() && !remainder.is_empty() && !remainder.refresh_closed() {
        return Err(FractureError::InvalidGeometry(format!(
            "cutout remainder with {} triangles is not watertight",
            remainder.triangle_count()
        )));
    }
    Ok((plug, remainder))
}

/// Join the plugs of one loop, dropping the walls they share
///
/// # Errors
///
/// `InvalidGeometry` when the plugs of a closed mesh do not join into a
/// watertight piece.
fn merge_plugs(mut plugs: Vec<Mesh>, closed: bool) -> Result<Mesh> {
    if plugs.len() == 1 {
        return Ok(plugs.remove(0));
    }

    let mut faces: Vec<([Vertex; 3], bool)> = Vec::new();
    for plug in &plugs {
        for t in 0..plug.triangle_count() {
            faces.push((plug.triangle(t).map(|i| plug.vertices()[i as usize]), plug.is_interior(t)));
        }
    }

    // A wall and its inverted copy cancel out
    let mut unmatched: HashMap<TriangleKey, Vec<usize>> = HashMap::new();
    let mut dropped = vec![false; faces.len()];
    for (index, (corners, _)) in faces.iter().enumerate() {
        let [a, b, c] = corners.map(|v| v.position);
        match unmatched.get_mut(&triangle_key([a, c, b])).and_then(Vec::pop) {
            Some(partner) => {
                dropped[partner] = true;
                dropped[index] = true;
            }
            None => unmatched.entry(triangle_key([a, b, c])).or_default().push(index),
        }
    }

    let mut builder = MeshBuilder::new();
    for (index, &([a, b, c], interior)) in faces.iter().enumerate() {
        if !dropped[index] {
            builder.push_triangle(a, b, c, interior);
        }
    }
    let mut joined = builder.build(false);
    if closed && !joined.refresh_closed() {
        return Err(FractureError::InvalidGeometry(format!(
            "{} plugs of one cutout loop do not join into a closed piece",
            plugs.len()
        )));
    }
    Ok(joined)
}

/// Plugs of every loop followed by the remainder
///
/// Loops whose sweep misses the mesh are skipped. The remainder is omitted
/// when the sweeps swallow the whole mesh.
pub(crate) fn cutout_pieces<R: Rng + ?Sized>(mesh: &Mesh, config: &CutoutConfig, rng: &mut R) -> Result<Vec<Mesh>> {
    let placement = Placement::new(mesh, config);
    let style = CapStyle::noisy(config.noise, rng.gen::<u32>(), config.use_smoothing);

    let mut pieces = Vec::with_capacity(config.pattern.len() + 1);
    let mut remainder = mesh.clone();
    for (index, points) in config.pattern.loops.iter().enumerate() {
        let parts = convex_parts(points)?;
        if parts.len() > 1 {
            log::debug!("cutout loop {} split into {} convex parts", index, parts.len());
        }

        let mut plugs = Vec::with_capacity(parts.len());
        for part in &parts {
            let sides = placement.sides(part, config.aperture);
            let (plug, rest) = cut_loop(&remainder, &sides, &style)?;
            if plug.is_empty() {
                continue;
            }
            plugs.push(plug);
            remainder = rest;
            if remainder.is_empty() {
                break;
            }
        }

        if plugs.is_empty() {
            log::debug!("cutout loop {} misses the chunk", index);
            continue;
        }
        pieces.push(merge_plugs(plugs, mesh.is_closed())?);
        if remainder.is_empty() {
            break;
        }
    }

    if !remainder.is_empty() {
        pieces.push(remainder);
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CutoutSet, NoiseConfig};
    use crate::mesh::test_meshes::unit_cube;
    use crate::random::FractureRng;

    fn square(half: f32) -> CutoutConfig {
        CutoutConfig {
            scale: Vec2::ONE,
            ..CutoutConfig::with_pattern(CutoutSet::from_loops(vec![CutoutSet::rectangle(
                Vec2::ZERO,
                Vec2::splat(half),
            )]))
        }
    }

    #[test]
    fn test_square_plug_and_remainder() {
        let cube = unit_cube();
        let pieces = cutout_pieces(&cube, &square(0.25), &mut FractureRng::new(1)).unwrap();
        assert_eq!(pieces.len(), 2);

        let (plug, remainder) = (&pieces[0], &pieces[1]);
        assert!(plug.is_closed());
        assert!(remainder.is_closed());
        assert!((plug.volume() - 0.25).abs() < 1e-5);
        assert!((remainder.volume() - 0.75).abs() < 1e-5);
        assert_eq!(remainder.connected_components().len(), 1);
    }

    #[test]
    fn test_clockwise_loop_is_accepted() {
        let mut config = square(0.25);
        config.pattern.loops[0].reverse();
        let pieces = cutout_pieces(&unit_cube(), &config, &mut FractureRng::new(1)).unwrap();
        assert!((pieces[0].volume() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_aperture_widens_plug() {
        let mut config = square(0.2);
        config.aperture = 20.0;
        let pieces = cutout_pieces(&unit_cube(), &config, &mut FractureRng::new(1)).unwrap();
        let plug = &pieces[0];
        let bounds = plug.bounds();
        // Wider at +Z than at -Z
        let top: f32 = plug
            .vertices()
            .iter()
            .filter(|v| (v.position.z - bounds.max.z).abs() < 1e-5)
            .map(|v| v.position.x)
            .fold(0.0, f32::max);
        let bottom: f32 = plug
            .vertices()
            .iter()
            .filter(|v| (v.position.z - bounds.min.z).abs() < 1e-5)
            .map(|v| v.position.x)
            .fold(0.0, f32::max);
        assert!(top > bottom);
        assert!((plug.volume() + pieces[1].volume() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_loop_outside_chunk_is_skipped() {
        let mut config = square(0.1);
        config.is_relative_transform = false;
        config.transform.translation = Vec3::new(5.0, 0.0, 0.0);
        let pieces = cutout_pieces(&unit_cube(), &config, &mut FractureRng::new(1)).unwrap();
        assert_eq!(pieces, vec![unit_cube()]);
    }

    fn l_shape() -> Vec<Vec2> {
        vec![
            Vec2::new(-0.3, -0.2),
            Vec2::new(0.3, -0.2),
            Vec2::new(0.3, 0.05),
            Vec2::new(0.0, 0.05),
            Vec2::new(0.0, 0.35),
            Vec2::new(-0.3, 0.35),
        ]
    }

    #[test]
    fn test_convex_loop_is_one_part() {
        let square = CutoutSet::rectangle(Vec2::ZERO, Vec2::ONE);
        let parts = convex_parts(&square).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].shared.iter().all(|&s| !s));
    }

    #[test]
    fn test_l_shape_splits_into_convex_parts() {
        let parts = convex_parts(&l_shape()).unwrap();
        assert!(parts.len() >= 2);
        let area: f32 = parts.iter().map(|part| signed_area_2d(&part.points) * 0.5).sum();
        assert!((area - 0.24).abs() < 1e-5);
        for part in &parts {
            assert!(is_convex_loop(&part.points));
            assert!(signed_area_2d(&part.points) > 0.0);
            assert!(part.shared.iter().any(|&s| s));
        }
        let outline_edges: usize = parts.iter().map(|p| p.shared.iter().filter(|&&s| !s).count()).sum();
        assert_eq!(outline_edges, 6);
    }

    #[test]
    fn test_l_shaped_loop_gives_one_plug() {
        let mut config = square(0.1);
        config.pattern = CutoutSet::from_loops(vec![l_shape()]);
        let pieces = cutout_pieces(&unit_cube(), &config, &mut FractureRng::new(3)).unwrap();
        assert_eq!(pieces.len(), 2);

        let (plug, remainder) = (&pieces[0], &pieces[1]);
        assert!(plug.is_closed());
        assert!(remainder.is_closed());
        assert_eq!(plug.non_manifold_edge_count(), 0);
        assert_eq!(plug.connected_components().len(), 1);
        assert!((plug.volume() - 0.24).abs() < 1e-4);
        assert!((remainder.volume() - 0.76).abs() < 1e-4);
        // The notch of the L stays with the remainder
        let notch = Vec3::new(0.15, 0.2, 0.0);
        assert!(!plug.contains_point(notch));
        assert!(remainder.contains_point(notch));
        assert!(plug.contains_point(Vec3::new(-0.15, 0.05, 0.0)));
    }

    #[test]
    fn test_noisy_cutout_conserves_volume() {
        let mut config = square(0.25);
        config.noise = NoiseConfig {
            amplitude: 0.05,
            frequency: 3.0,
            octave_number: 2,
            surface_resolution: 2,
        };
        config.use_smoothing = true;
        let pieces = cutout_pieces(&unit_cube(), &config, &mut FractureRng::new(9)).unwrap();
        assert_eq!(pieces.len(), 2);
        assert!(pieces.iter().all(Mesh::is_closed));
        let total: f32 = pieces.iter().map(Mesh::volume).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }
}
