//! Voronoi cells of a chunk mesh

use glam::Vec3;
use std::collections::HashSet;

use super::cut::{self, CapStyle};
use crate::error::{FractureError, Result};
use crate::mesh::{position_key, Mesh};
use crate::plane::Plane;

/// Drop repeated sites, keeping the first occurrence
fn unique_sites(sites: &[Vec3]) -> Vec<Vec3> {
    let mut seen = HashSet::new();
    sites.iter().copied().filter(|&s| seen.insert(position_key(s))).collect()
}

/// Clip `mesh` to the Voronoi cell of every site
///
/// Each cell is cut from the mesh by the bisector planes of the other sites,
/// nearest first, and stops once the next site is too far away to touch
/// what remains. Sites whose cell misses the mesh contribute nothing.
///
/// # Errors
///
/// `InsufficientSites` with fewer than two distinct sites, `InvalidGeometry`
/// when fewer than two cells intersect the mesh.
pub(crate) fn voronoi_pieces(mesh: &Mesh, sites: &[Vec3]) -> Result<Vec<Mesh>> {
    let sites = unique_sites(sites);
    if sites.len() < 2 {
        return Err(FractureError::InsufficientSites {
            required: 2,
            found: sites.len(),
        });
    }

    let style = CapStyle::flat();
    let mut pieces = Vec::with_capacity(sites.len());

    for (i, &site) in sites.iter().enumerate() {
        let mut order: Vec<usize> = (0..sites.len()).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| {
            site.distance_squared(sites[a])
                .total_cmp(&site.distance_squared(sites[b]))
                .then(a.cmp(&b))
        });

        let mut cell = mesh.clone();
        let mut reach = max_distance(&cell, site);
        for j in order {
            if site.distance(sites[j]) * 0.5 > reach {
                break;
            }
            let Some(plane) = Plane::bisector(site, sites[j]) else {
                continue;
            };
            cell = cut::split(&cell, &plane, &style)?.below;
            if cell.is_empty() {
                break;
            }
            reach = max_distance(&cell, site);
        }

        if cell.is_empty() {
            log::debug!("voronoi cell {} misses the mesh", i);
        } else {
            pieces.push(cell);
        }
    }

    if pieces.len() < 2 {
        return Err(FractureError::InvalidGeometry(format!(
            "only {} of {} voronoi cells intersect the mesh",
            pieces.len(),
            sites.len()
        )));
    }
    Ok(pieces)
}

fn max_distance(mesh: &Mesh, point: Vec3) -> f32 {
    mesh.vertices()
        .iter()
        .map(|v| v.position.distance(point))
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::unit_cube;
    use crate::random::FractureRng;
    use rand::Rng;

    #[test]
    fn test_two_sites_halve_cube() {
        let sites = [Vec3::new(-0.25, 0.0, 0.0), Vec3::new(0.25, 0.0, 0.0)];
        let pieces = voronoi_pieces(&unit_cube(), &sites).unwrap();
        assert_eq!(pieces.len(), 2);
        for piece in &pieces {
            assert!(piece.is_closed());
            assert!((piece.volume() - 0.5).abs() < 1e-5);
        }
        assert!(pieces[0].bounds().max.x <= 1e-6);
    }

    #[test]
    fn test_duplicate_sites_do_not_count() {
        let sites = [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO];
        let result = voronoi_pieces(&unit_cube(), &sites);
        assert_eq!(result, Err(FractureError::InsufficientSites { required: 2, found: 1 }));
    }

    #[test]
    fn test_sites_far_outside() {
        let sites = [Vec3::new(10.0, 0.0, 0.0), Vec3::new(12.0, 0.0, 0.0)];
        let result = voronoi_pieces(&unit_cube(), &sites);
        assert!(matches!(result, Err(FractureError::InvalidGeometry(_))));
    }

    #[test]
    fn test_grid_of_sites_conserves_volume() {
        let mut sites = Vec::new();
        for x in [-0.25, 0.25] {
            for y in [-0.25, 0.25] {
                for z in [-0.25, 0.25] {
                    sites.push(Vec3::new(x, y, z) + Vec3::new(0.01 * x, 0.02 * y, -0.01 * z));
                }
            }
        }
        let pieces = voronoi_pieces(&unit_cube(), &sites).unwrap();
        assert_eq!(pieces.len(), 8);
        let total: f32 = pieces.iter().map(Mesh::volume).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(pieces.iter().all(Mesh::is_closed));
    }

    #[test]
    fn test_random_sites_stay_watertight() {
        for (count, seed) in [(8, 77), (12, 77), (40, 77), (40, 5)] {
            let mut rng = FractureRng::new(seed);
            let sites: Vec<Vec3> = (0..count)
                .map(|_| Vec3::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)))
                .collect();
            let pieces = voronoi_pieces(&unit_cube(), &sites).unwrap();
            assert_eq!(pieces.len(), count);
            assert!(pieces.iter().all(Mesh::is_closed));
            let total: f32 = pieces.iter().map(Mesh::volume).sum();
            assert!((total - 1.0).abs() < 1e-3, "{} sites: volume {}", count, total);
        }
    }

    #[test]
    fn test_cell_of_cell_stays_watertight() {
        let mut rng = FractureRng::new(13);
        let mut random_sites = |n: usize, lo: Vec3, hi: Vec3| -> Vec<Vec3> {
            (0..n)
                .map(|_| Vec3::new(rng.gen_range(lo.x..hi.x), rng.gen_range(lo.y..hi.y), rng.gen_range(lo.z..hi.z)))
                .collect()
        };
        let pieces = voronoi_pieces(&unit_cube(), &random_sites(10, Vec3::splat(-0.5), Vec3::splat(0.5))).unwrap();
        let parent = &pieces[0];
        let bounds = parent.bounds();
        let children = voronoi_pieces(parent, &random_sites(12, bounds.min, bounds.max)).unwrap();
        assert!(children.iter().all(Mesh::is_closed));
        let total: f32 = children.iter().map(Mesh::volume).sum();
        assert!((total - parent.volume()).abs() < 1e-4);
    }
}
