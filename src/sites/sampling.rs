//! Random point sampling primitives

use glam::Vec3;
use rand::Rng;

use crate::mesh::{Aabb, Mesh};

/// Uniform point in the unit ball
pub(crate) fn in_unit_ball<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

/// Uniform unit vector
pub(crate) fn direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        if let Some(dir) = in_unit_ball(rng).try_normalize() {
            if dir.is_finite() {
                return dir;
            }
        }
    }
}

/// Uniform point inside a box (flat axes are allowed)
pub(crate) fn in_aabb<R: Rng + ?Sized>(rng: &mut R, bounds: &Aabb) -> Vec3 {
    let t = Vec3::new(rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>());
    bounds.min + bounds.extents() * t
}

/// Area-weighted triangle picker
#[derive(Debug, Clone, Default)]
pub(crate) struct SurfaceSampler {
    cumulative: Vec<f32>,
}

impl SurfaceSampler {
    pub(crate) fn new(mesh: &Mesh) -> Self {
        let mut total = 0.0;
        let cumulative = (0..mesh.triangle_count())
            .map(|t| {
                let [a, b, c] = mesh.triangle_positions(t);
                total += (b - a).cross(c - a).length() * 0.5;
                total
            })
            .collect();
        Self { cumulative }
    }

    fn total_area(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Uniform point on the surface, `None` for a mesh without area
    pub(crate) fn sample<R: Rng + ?Sized>(&self, mesh: &Mesh, rng: &mut R) -> Option<Vec3> {
        let total = self.total_area();
        if total <= 0.0 {
            return None;
        }
        let target = rng.gen::<f32>() * total;
        let tri = self
            .cumulative
            .partition_point(|&acc| acc < target)
            .min(self.cumulative.len() - 1);

        let [a, b, c] = mesh.triangle_positions(tri);
        let (mut s, mut t) = (rng.gen::<f32>(), rng.gen::<f32>());
        if s + t > 1.0 {
            s = 1.0 - s;
            t = 1.0 - t;
        }
        Some(a + (b - a) * s + (c - a) * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::unit_cube;
    use crate::random::FractureRng;

    #[test]
    fn test_ball_and_direction() {
        let mut rng = FractureRng::new(1);
        for _ in 0..100 {
            assert!(in_unit_ball(&mut rng).length() <= 1.0);
            assert!((direction(&mut rng).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_flat_box() {
        let mut rng = FractureRng::new(2);
        let flat = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
        let p = in_aabb(&mut rng, &flat);
        assert_eq!(p.y, 0.0);
        assert!(flat.contains(p));
    }

    #[test]
    fn test_surface_points_lie_on_faces() {
        let cube = unit_cube();
        let sampler = SurfaceSampler::new(&cube);
        let mut rng = FractureRng::new(3);
        for _ in 0..50 {
            let p = sampler.sample(&cube, &mut rng).unwrap();
            assert!((p.abs().max_element() - 0.5).abs() < 1e-5);
        }
    }
}
