//! Voronoi site generation
//!
//! A [`SiteGenerator`] owns a copy of its target mesh and a growing list of
//! sites. Every generation method draws from a caller-supplied random
//! generator, so the same seed and call sequence always produce the same
//! sites.
//!
//! # Example
//!
//! ```rust
//! use rust_voronoi_fracture::*;
//!
//! let mut rng = FractureRng::new(7);
//! let mut generator = SiteGenerator::new(cuboid(Vec3::ONE)).unwrap();
//! let placed = generator.uniform(16, &mut rng);
//! assert_eq!(placed, 16);
//! assert!(generator.sites().iter().all(|s| s.abs().max_element() <= 1.0));
//! ```

mod patterns;
mod sampling;

use glam::Vec3;
use rand::Rng;
use std::collections::BTreeSet;
#[cfg(feature = "spatial-index")]
use std::sync::OnceLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cell::VoronoiCell;
use crate::error::{FractureError, Result};
use crate::mesh::{Aabb, Mesh};
use crate::plane::Plane;
#[cfg(feature = "spatial-index")]
use crate::spatial::SpatialIndex;

use sampling::SurfaceSampler;

/// Rejection sampling gives up after this many tries per requested site
pub const MAX_ATTEMPTS_PER_SITE: usize = 100;

/// Where random sites are drawn
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Inside the mesh volume
    #[default]
    Volume,
    /// On the mesh surface
    Surface,
}

/// How a stencil restricts generation
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilMode {
    /// Keep sites inside the stencil
    #[default]
    Inside,
    /// Keep sites outside the stencil
    Outside,
}

/// Produces Voronoi sites for one target mesh
#[derive(Debug, Clone)]
pub struct SiteGenerator {
    mesh: Mesh,
    bounds: Aabb,
    surface: SurfaceSampler,
    stencil: Option<Mesh>,
    stencil_mode: StencilMode,
    sampling: SamplingMode,
    sites: Vec<Vec3>,
    /// Built on the first lookup, dropped whenever the sites change
    #[cfg(feature = "spatial-index")]
    index: OnceLock<Option<SpatialIndex>>,
}

impl SiteGenerator {
    /// Create a generator targeting `mesh`
    ///
    /// # Errors
    ///
    /// Returns `InvalidGeometry` for a mesh without triangles.
    pub fn new(mesh: Mesh) -> Result<Self> {
        if !mesh.is_valid() {
            return Err(FractureError::InvalidGeometry(
                "site generator needs a mesh with at least one triangle".to_string(),
            ));
        }
        Ok(Self {
            bounds: mesh.bounds(),
            surface: SurfaceSampler::new(&mesh),
            mesh,
            stencil: None,
            stencil_mode: StencilMode::default(),
            sampling: SamplingMode::default(),
            sites: Vec::new(),
            #[cfg(feature = "spatial-index")]
            index: OnceLock::new(),
        })
    }

    /// Replace the target mesh, keeping the current sites
    pub fn set_mesh(&mut self, mesh: Mesh) -> Result<()> {
        let replacement = Self::new(mesh)?;
        self.mesh = replacement.mesh;
        self.bounds = replacement.bounds;
        self.surface = replacement.surface;
        Ok(())
    }

    /// Target mesh
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Restrict generation by a stencil mesh
    pub fn set_stencil(&mut self, stencil: Mesh) {
        self.stencil = Some(stencil);
    }

    /// Remove the stencil
    pub fn clear_stencil(&mut self) {
        self.stencil = None;
    }

    /// Choose whether sites must fall inside or outside the stencil
    pub fn set_stencil_mode(&mut self, mode: StencilMode) {
        self.stencil_mode = mode;
    }

    /// Choose volume or surface sampling
    pub fn set_sampling_mode(&mut self, mode: SamplingMode) {
        self.sampling = mode;
    }

    /// Current sampling mode
    pub fn sampling_mode(&self) -> SamplingMode {
        self.sampling
    }

    /// Generated sites, in generation order
    pub fn sites(&self) -> &[Vec3] {
        &self.sites
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn clear_sites(&mut self) {
        self.sites_mut().clear();
    }

    /// Append a site without any validation
    pub fn add_site(&mut self, site: Vec3) {
        self.sites_mut().push(site);
    }

    /// Append explicit sites without any validation
    pub fn add_sites(&mut self, sites: &[Vec3]) {
        self.sites_mut().extend_from_slice(sites);
    }

    /// Site list for writing; invalidates the lookup index
    fn sites_mut(&mut self) -> &mut Vec<Vec3> {
        #[cfg(feature = "spatial-index")]
        {
            self.index = OnceLock::new();
        }
        &mut self.sites
    }

    fn passes_stencil(&self, point: Vec3) -> bool {
        match &self.stencil {
            None => true,
            Some(stencil) => {
                let inside = stencil.contains_point(point);
                match self.stencil_mode {
                    StencilMode::Inside => inside,
                    StencilMode::Outside => !inside,
                }
            }
        }
    }

    /// Point is inside the target volume and allowed by the stencil
    fn accepts(&self, point: Vec3) -> bool {
        self.mesh.contains_point(point) && self.passes_stencil(point)
    }

    /// One random candidate for the current sampling mode, already filtered
    fn candidate<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec3> {
        match self.sampling {
            SamplingMode::Volume => {
                let p = sampling::in_aabb(rng, &self.bounds);
                self.accepts(p).then_some(p)
            }
            SamplingMode::Surface => {
                let p = self.surface.sample(&self.mesh, rng)?;
                self.passes_stencil(p).then_some(p)
            }
        }
    }

    /// Run rejection sampling until `count` points pass or attempts run out
    fn sample_points<R, F>(&self, count: usize, rng: &mut R, mut draw: F) -> Vec<Vec3>
    where
        R: Rng + ?Sized,
        F: FnMut(&Self, &mut R) -> Option<Vec3>,
    {
        let mut points = Vec::with_capacity(count);
        let max_attempts = MAX_ATTEMPTS_PER_SITE.saturating_mul(count);
        let mut attempts = 0;
        while points.len() < count && attempts < max_attempts {
            attempts += 1;
            if let Some(p) = draw(self, rng) {
                points.push(p);
            }
        }
        if points.len() < count {
            log::warn!(
                "rejection sampling placed {} of {} sites after {} attempts",
                points.len(),
                count,
                attempts
            );
        }
        points
    }

    /// Add up to `count` random sites inside the mesh (or on its surface)
    ///
    /// Returns the number of sites placed, which may fall short of `count`
    /// for thin meshes or restrictive stencils.
    pub fn uniform<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
        let points = self.sample_points(count, rng, |this, rng| this.candidate(rng));
        log::debug!("uniform generation placed {} sites", points.len());
        self.sites_mut().extend_from_slice(&points);
        points.len()
    }

    /// Add `clusters` groups of `per_cluster` sites within `radius` of random centers
    ///
    /// Cluster members are clipped to the mesh volume.
    pub fn clustered<R: Rng + ?Sized>(
        &mut self,
        clusters: usize,
        per_cluster: usize,
        radius: f32,
        rng: &mut R,
    ) -> usize {
        let centers = self.sample_points(clusters, rng, |this, rng| {
            let p = sampling::in_aabb(rng, &this.bounds);
            this.accepts(p).then_some(p)
        });

        let mut placed = 0;
        for center in centers {
            let points = self.sample_points(per_cluster, rng, |this, rng| {
                let p = center + sampling::in_unit_ball(rng) * radius;
                this.accepts(p).then_some(p)
            });
            placed += points.len();
            self.sites_mut().extend_from_slice(&points);
        }
        log::debug!("clustered generation placed {} sites", placed);
        placed
    }

    /// Add up to `count` sites inside both the mesh and the given sphere
    pub fn generate_in_sphere<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        radius: f32,
        center: Vec3,
        rng: &mut R,
    ) -> usize {
        let points = self.sample_points(count, rng, |this, rng| {
            let p = center + sampling::in_unit_ball(rng) * radius;
            this.accepts(p).then_some(p)
        });
        self.sites_mut().extend_from_slice(&points);
        points.len()
    }

    /// Remove each site inside the sphere with the given probability
    ///
    /// Returns the number of removed sites.
    pub fn delete_in_sphere<R: Rng + ?Sized>(
        &mut self,
        radius: f32,
        center: Vec3,
        probability: f32,
        rng: &mut R,
    ) -> usize {
        let probability = probability.clamp(0.0, 1.0);
        let before = self.sites.len();
        self.sites_mut()
            .retain(|site| site.distance(center) > radius || rng.gen::<f32>() >= probability);
        before - self.sites.len()
    }

    /// Pairs of sites whose Voronoi cells share a face
    ///
    /// Pairs are `(i, j)` with `i < j`, sorted and free of duplicates.
    /// Coincident sites are never neighbors.
    pub fn neighbors(&self) -> Vec<(usize, usize)> {
        if self.sites.len() < 2 {
            return Vec::new();
        }

        let site_bounds = Aabb::from_points(self.sites.iter().copied());
        let domain = self.bounds.union(&site_bounds);
        let domain = domain.expanded(domain.diagonal() * 0.1 + 1e-3);
        let area_epsilon = (domain.diagonal() * 1e-4).powi(2);

        let mut pairs = BTreeSet::new();
        for (i, &site) in self.sites.iter().enumerate() {
            let cell = voronoi_cell(site, i, &self.sites, &domain);
            for j in 0..self.sites.len() {
                if j != i && cell.shared_area(j) > area_epsilon {
                    pairs.insert((i.min(j), i.max(j)));
                }
            }
        }
        pairs.into_iter().collect()
    }

    /// Index of the site whose cell contains `point`, `None` without sites
    ///
    /// The KD-tree behind this is built once and reused until the sites change.
    #[cfg(feature = "spatial-index")]
    pub fn nearest_site(&self, point: Vec3) -> Option<usize> {
        self.index
            .get_or_init(|| SpatialIndex::new(&self.sites))
            .as_ref()
            .map(|index| index.find_nearest(point))
    }
}

/// Voronoi cell of `sites[index]` clipped to `domain`
fn voronoi_cell(site: Vec3, index: usize, sites: &[Vec3], domain: &Aabb) -> VoronoiCell {
    let mut order: Vec<usize> = (0..sites.len()).filter(|&j| j != index).collect();
    order.sort_by(|&a, &b| {
        site.distance_squared(sites[a])
            .total_cmp(&site.distance_squared(sites[b]))
            .then(a.cmp(&b))
    });

    let mut cell = VoronoiCell::from_box(site, domain);
    for j in order {
        let distance = site.distance(sites[j]);
        if distance * 0.5 > cell.max_distance_from(site) {
            break;
        }
        if let Some(plane) = Plane::bisector(site, sites[j]) {
            cell.clip(&plane, j);
            if cell.is_empty() {
                break;
            }
        }
    }
    cell
}
