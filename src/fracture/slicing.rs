//! Grid slicing with jittered and tilted planes

use glam::{Quat, Vec3};
use rand::Rng;
use std::f32::consts::{FRAC_PI_4, TAU};

use super::cut::{self, CapStyle};
use crate::config::SlicingConfig;
use crate::error::Result;
use crate::mesh::Mesh;
use crate::plane::Plane;

/// Cutting planes of a slicing grid, X planes first, then Y, then Z
///
/// Each plane comes with the noise seed of its cut surface.
pub(crate) fn slicing_planes<R: Rng + ?Sized>(mesh: &Mesh, config: &SlicingConfig, rng: &mut R) -> Vec<(Plane, u32)> {
    let bounds = mesh.bounds();
    let center = bounds.center();
    let extents = bounds.extents();
    let mut planes = Vec::with_capacity(config.plane_count());

    for (axis, &direction) in Vec3::AXES.iter().enumerate() {
        let count = config.slices[axis].max(1);
        let spacing = extents[axis] / count as f32;
        let (u, v) = (direction.any_orthonormal_vector(), direction.cross(direction.any_orthonormal_vector()));

        for k in 1..count {
            let jitter = (rng.gen::<f32>() - 0.5) * config.offset_variations * spacing;
            let mut point = center;
            point[axis] = bounds.min[axis] + spacing * k as f32 + jitter;

            let tilt = rng.gen::<f32>() * config.angle_variations * FRAC_PI_4;
            let (sin, cos) = (rng.gen::<f32>() * TAU).sin_cos();
            let normal = Quat::from_axis_angle(u * cos + v * sin, tilt) * direction;

            let seed = rng.gen::<u32>();
            if let Some(plane) = Plane::from_point_normal(point, normal) {
                planes.push((plane, seed));
            }
        }
    }
    planes
}

/// Cut `mesh` by every slicing plane in turn
pub(crate) fn slice_pieces<R: Rng + ?Sized>(mesh: &Mesh, config: &SlicingConfig, rng: &mut R) -> Result<Vec<Mesh>> {
    let planes = slicing_planes(mesh, config, rng);
    log::debug!("slicing with {} planes", planes.len());

    let mut pieces = vec![mesh.clone()];
    for (plane, seed) in planes {
        let style = CapStyle::noisy(config.noise, seed, true);
        let mut next = Vec::with_capacity(pieces.len() * 2);
        for piece in &pieces {
            let split = cut::split(piece, &plane, &style)?;
            next.extend([split.below, split.above].into_iter().filter(|m| !m.is_empty()));
        }
        pieces = next;
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlicingConfigBuilder;
    use crate::mesh::test_meshes::unit_cube;
    use crate::random::FractureRng;

    #[test]
    fn test_straight_grid() {
        let config = SlicingConfigBuilder::new().slices(2, 3, 1).unwrap().build().unwrap();
        let planes = slicing_planes(&unit_cube(), &config, &mut FractureRng::new(1));
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[0].0.normal, Vec3::X);
        assert!(planes[0].0.offset.abs() < 1e-6);
        assert!((planes[1].0.offset + 1.0 / 6.0).abs() < 1e-6);
        assert!((planes[2].0.offset - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_tilt_stays_within_limit() {
        let config = SlicingConfigBuilder::new()
            .slices(4, 1, 1)
            .unwrap()
            .angle_variations(1.0)
            .unwrap()
            .offset_variations(1.0)
            .unwrap()
            .build()
            .unwrap();
        let planes = slicing_planes(&unit_cube(), &config, &mut FractureRng::new(2));
        assert_eq!(planes.len(), 3);
        for (plane, _) in planes {
            assert!(plane.normal.dot(Vec3::X) >= FRAC_PI_4.cos() - 1e-5);
        }
    }

    #[test]
    fn test_pieces_cover_the_mesh() {
        let config = SlicingConfigBuilder::new().slices(2, 2, 2).unwrap().build().unwrap();
        let pieces = slice_pieces(&unit_cube(), &config, &mut FractureRng::new(3)).unwrap();
        assert_eq!(pieces.len(), 8);
        for piece in &pieces {
            assert!(piece.is_closed());
            assert!((piece.volume() - 0.125).abs() < 1e-5);
        }
    }

    #[test]
    fn test_jittered_slices_stay_watertight() {
        let config = SlicingConfigBuilder::new()
            .slices(3, 2, 2)
            .unwrap()
            .offset_variations(0.5)
            .unwrap()
            .angle_variations(0.5)
            .unwrap()
            .build()
            .unwrap();
        for seed in [3, 11, 29] {
            let pieces = slice_pieces(&unit_cube(), &config, &mut FractureRng::new(seed)).unwrap();
            assert!(pieces.len() >= 8);
            assert!(pieces.iter().all(Mesh::is_closed));
            let total: f32 = pieces.iter().map(Mesh::volume).sum();
            assert!((total - 1.0).abs() < 1e-3);
        }
    }
}
