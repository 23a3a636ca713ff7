//! KD-tree lookups over Voronoi sites
//!
//! This module is only available with the `spatial-index` feature.

use glam::Vec3;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

/// Nearest-site index
///
/// The nearest site to a point is the site whose Voronoi cell contains it,
/// so this doubles as a point-to-cell lookup for fractured chunks.
#[derive(Clone)]
pub struct SpatialIndex {
    tree: ImmutableKdTree<f32, usize, 3, 32>,
    len: usize,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex").field("len", &self.len).finish_non_exhaustive()
    }
}

impl SpatialIndex {
    /// Build an index over `sites`, `None` if there are none
    ///
    /// # Example
    ///
    /// ```
    /// use rust_voronoi_fracture::*;
    ///
    /// let sites = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
    /// let index = SpatialIndex::new(&sites).unwrap();
    /// assert_eq!(index.find_nearest(Vec3::new(0.8, 0.3, 0.0)), 1);
    /// ```
    pub fn new(sites: &[Vec3]) -> Option<Self> {
        if sites.is_empty() {
            return None;
        }
        let points: Vec<[f32; 3]> = sites.iter().map(|s| s.to_array()).collect();
        Some(Self {
            tree: ImmutableKdTree::new_from_slice(&points),
            len: sites.len(),
        })
    }

    /// Index of the site closest to `position`
    pub fn find_nearest(&self, position: Vec3) -> usize {
        let nearest = self.tree.nearest_one::<SquaredEuclidean>(&position.to_array());
        nearest.item as usize
    }

    /// Number of indexed sites
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false, an index is never built from zero sites
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_nearest() {
        let sites = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 0.0),
        ];
        let index = SpatialIndex::new(&sites).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.find_nearest(Vec3::new(0.9, 0.1, 0.0)), 0);
        assert_eq!(index.find_nearest(Vec3::new(0.0, 0.95, 0.0)), 1);
        assert_eq!(index.find_nearest(Vec3::new(0.0, 0.1, 0.9)), 2);
        assert_eq!(index.find_nearest(Vec3::new(-0.8, 0.0, 0.0)), 3);
        for (i, &site) in sites.iter().enumerate() {
            assert_eq!(index.find_nearest(site), i);
        }
    }

    #[test]
    fn test_empty_sites() {
        assert!(SpatialIndex::new(&[]).is_none());
    }
}
