//! Radial and blast damage patterns

use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

use super::{sampling, SiteGenerator};
use crate::config::{BlastConfig, BlastZone};
use crate::error::{FractureError, Result};
use crate::plane::Plane;

/// Radius in `[inner, outer]` drawn so that `bias = 0` is uniform in volume
/// and larger biases pull samples toward `inner`
fn biased_radius<R: Rng + ?Sized>(rng: &mut R, inner: f32, outer: f32, bias: f32) -> f32 {
    let u: f32 = rng.gen();
    inner + (outer - inner) * u.powf((1.0 + bias) / 3.0)
}

impl SiteGenerator {
    /// Place sites on concentric rings around `center` in the plane facing `normal`
    ///
    /// Ring `i` (from 0) has radius `radius * (i + 1) / radial_steps` and holds
    /// `angular_steps` sites. Each ring is rotated by `angle_offset` radians
    /// relative to the previous one. Sites are jittered by up to `variability`
    /// times the smaller of the ring and arc spacing. Radial sites are not
    /// filtered by the mesh or the stencil.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero normal, a negative radius, or a
    /// variability outside `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn radial_pattern<R: Rng + ?Sized>(
        &mut self,
        center: Vec3,
        normal: Vec3,
        radius: f32,
        angular_steps: u32,
        radial_steps: u32,
        angle_offset: f32,
        variability: f32,
        rng: &mut R,
    ) -> Result<usize> {
        let plane = Plane::from_point_normal(center, normal).ok_or_else(|| {
            FractureError::InvalidConfig(format!("radial pattern normal must be non-zero (got {})", normal))
        })?;
        if !radius.is_finite() || radius < 0.0 {
            return Err(FractureError::InvalidConfig(format!(
                "radial pattern radius must be >= 0 (got {})",
                radius
            )));
        }
        if !(0.0..=1.0).contains(&variability) {
            return Err(FractureError::InvalidConfig(format!(
                "radial variability must be in [0, 1] (got {})",
                variability
            )));
        }
        if angular_steps == 0 || radial_steps == 0 {
            return Ok(0);
        }

        let (u, v) = plane.basis();
        let ring_spacing = radius / radial_steps as f32;
        let mut placed = Vec::with_capacity((angular_steps * radial_steps) as usize);

        for ring in 0..radial_steps {
            let ring_radius = ring_spacing * (ring + 1) as f32;
            let arc_spacing = TAU * ring_radius / angular_steps as f32;
            let jitter = variability * ring_spacing.min(arc_spacing);

            for step in 0..angular_steps {
                let angle = TAU * step as f32 / angular_steps as f32 + ring as f32 * angle_offset;
                let (sin, cos) = angle.sin_cos();
                let on_ring = center + (u * cos + v * sin) * ring_radius;
                placed.push(on_ring + sampling::in_unit_ball(rng) * jitter);
            }
        }

        log::debug!("radial pattern placed {} sites", placed.len());
        self.sites_mut().extend_from_slice(&placed);
        Ok(placed.len())
    }

    /// Place the sites of a blast: dense inner ball, transition shell, sparse
    /// outer region, and an optional radial ring pattern
    ///
    /// Returns the total number of sites added.
    pub fn blast_pattern<R: Rng + ?Sized>(&mut self, config: &BlastConfig, rng: &mut R) -> Result<usize> {
        config.validate()?;
        let mut placed = 0;

        placed += self.blast_zone(config.point, 0.0, &config.inner, rng);

        let shell_start = config.inner.radius;
        let shell = BlastZone {
            radius: config.transition.radius.max(shell_start),
            ..config.transition
        };
        placed += self.blast_zone(config.point, shell_start, &shell, rng);

        // Outer sites only need to be past the densest zones
        let keep_out = config.inner.radius.max(config.transition.radius);
        let point = config.point;
        let outer = self.sample_points(config.outer_sites as usize, rng, |this, rng| {
            let p = this.candidate(rng)?;
            (p.distance(point) > keep_out).then_some(p)
        });
        placed += outer.len();
        self.sites_mut().extend_from_slice(&outer);

        let radial = &config.radial;
        if radial.radius > 0.0 && radial.radial_steps > 0 && radial.angular_steps > 0 {
            let normal = config.normal.normalize_or_zero();
            placed += self.radial_pattern(
                config.point + normal * radial.normal_offset,
                normal,
                radial.radius,
                radial.angular_steps,
                radial.radial_steps,
                radial.angle_offset,
                radial.variability,
                rng,
            )?;
        }

        log::debug!("blast pattern placed {} sites", placed);
        Ok(placed)
    }

    fn blast_zone<R: Rng + ?Sized>(&mut self, point: Vec3, inner: f32, zone: &BlastZone, rng: &mut R) -> usize {
        if zone.sites == 0 {
            return 0;
        }
        let points = self.sample_points(zone.sites as usize, rng, |this, rng| {
            let r = biased_radius(rng, inner, zone.radius, zone.bias);
            let p = point + sampling::direction(rng) * r;
            this.accepts(p).then_some(p)
        });
        self.sites_mut().extend_from_slice(&points);
        points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RadialPatternConfig;
    use crate::mesh::test_meshes::cube_at;
    use crate::random::FractureRng;

    #[test]
    fn test_radial_rings() {
        let mut generator = SiteGenerator::new(cube_at(Vec3::ZERO, 2.0)).unwrap();
        let mut rng = FractureRng::new(3);
        let placed = generator
            .radial_pattern(Vec3::ZERO, Vec3::Z, 1.0, 6, 2, 0.0, 0.0, &mut rng)
            .unwrap();
        assert_eq!(placed, 12);

        let sites = generator.sites();
        for site in &sites[..6] {
            assert!((site.length() - 0.5).abs() < 1e-5);
            assert!(site.z.abs() < 1e-6);
        }
        for site in &sites[6..] {
            assert!((site.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_radial_jitter_bounded() {
        let mut generator = SiteGenerator::new(cube_at(Vec3::ZERO, 2.0)).unwrap();
        let mut rng = FractureRng::new(4);
        generator
            .radial_pattern(Vec3::ZERO, Vec3::Y, 1.0, 8, 1, 0.3, 0.5, &mut rng)
            .unwrap();
        // Ring spacing 1.0, arc spacing 2π/8, so jitter stays below 0.5 * 0.785
        let limit = 0.5 * (TAU / 8.0) + 1e-5;
        for site in generator.sites() {
            assert!((site.length() - 1.0).abs() <= limit);
        }
    }

    #[test]
    fn test_radial_rejects_zero_normal() {
        let mut generator = SiteGenerator::new(cube_at(Vec3::ZERO, 1.0)).unwrap();
        let result = generator.radial_pattern(Vec3::ZERO, Vec3::ZERO, 1.0, 4, 1, 0.0, 0.0, &mut FractureRng::new(1));
        assert!(result.is_err());
        assert_eq!(generator.site_count(), 0);
    }

    #[test]
    fn test_blast_zones() {
        let mut generator = SiteGenerator::new(cube_at(Vec3::ZERO, 2.0)).unwrap();
        let config = BlastConfig {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            inner: BlastZone {
                sites: 10,
                radius: 0.5,
                bias: 1.0,
            },
            transition: BlastZone {
                sites: 10,
                radius: 1.0,
                bias: 0.0,
            },
            outer_sites: 5,
            radial: RadialPatternConfig::default(),
        };
        let placed = generator.blast_pattern(&config, &mut FractureRng::new(12)).unwrap();
        assert_eq!(placed, 25);

        let sites = generator.sites();
        assert!(sites[..10].iter().all(|s| s.length() <= 0.5 + 1e-5));
        assert!(sites[10..20].iter().all(|s| s.length() >= 0.5 - 1e-5 && s.length() <= 1.0 + 1e-5));
        assert!(sites[20..].iter().all(|s| s.length() > 1.0));
    }

    #[test]
    fn test_blast_with_radial_rings() {
        let mut generator = SiteGenerator::new(cube_at(Vec3::ZERO, 2.0)).unwrap();
        let config = BlastConfig {
            radial: RadialPatternConfig {
                radius: 1.0,
                radial_steps: 2,
                angular_steps: 5,
                angle_offset: 0.2,
                normal_offset: 0.5,
                variability: 0.0,
            },
            ..BlastConfig::default()
        };
        let placed = generator.blast_pattern(&config, &mut FractureRng::new(2)).unwrap();
        assert_eq!(placed, 10);
        assert!(generator.sites().iter().all(|s| (s.y - 0.5).abs() < 1e-5));
    }
}
