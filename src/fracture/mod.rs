//! Chunk fracturing
//!
//! [`FractureEngine`] owns the chunk hierarchy of one destructible asset and
//! applies fracture operations to individual chunks. Every operation follows
//! the same pattern: validate the configuration, compute every output mesh,
//! and only then replace the target's children with the new pieces. A failed
//! operation leaves the hierarchy exactly as it was.

mod cut;
mod cutout;
mod export;
mod slicing;
mod voronoi;

pub use export::CrackEdge;

use glam::Vec3;
use rand::Rng;

use crate::bonding::{self, Bond};
use crate::config::{CutoutConfig, NoiseConfig, SlicingConfig};
use crate::error::{FractureError, Result};
use crate::hierarchy::{ChunkHierarchy, ChunkId, ChunkInfo};
use crate::mesh::{Mesh, MeshData};
use crate::plane::Plane;
use crate::sites::SiteGenerator;

use cut::CapStyle;

/// Components smaller than this fraction of the fractured chunk's volume are islands
pub const DEFAULT_ISLAND_THRESHOLD: f32 = 0.01;

/// Fractures chunks and tracks their hierarchy
///
/// # Examples
///
/// ```
/// use rust_voronoi_fracture::*;
///
/// let mut engine = FractureEngine::new();
/// let root = engine.set_source_mesh(cuboid(Vec3::splat(0.5))).unwrap();
///
/// let sites = [Vec3::new(-0.2, 0.0, 0.0), Vec3::new(0.2, 0.0, 0.0)];
/// let children = engine.voronoi_fracture_sites(root, &sites, false).unwrap();
/// assert_eq!(children.len(), 2);
/// assert_eq!(engine.chunk_depth(children[0]).unwrap(), 1);
///
/// engine.finalize();
/// let data = engine.export_chunk_mesh(children[0]).unwrap();
/// assert!(data.triangle_count() > 0);
/// ```
#[derive(Debug, Clone)]
pub struct FractureEngine {
    hierarchy: ChunkHierarchy,
    remove_islands: bool,
    island_threshold: f32,
    finalized: bool,
    crack_edges: Vec<CrackEdge>,
}

impl Default for FractureEngine {
    fn default() -> Self {
        Self {
            hierarchy: ChunkHierarchy::new(),
            remove_islands: false,
            island_threshold: DEFAULT_ISLAND_THRESHOLD,
            finalized: false,
            crack_edges: Vec::new(),
        }
    }
}

fn check_mesh(mesh: &Mesh) -> Result<()> {
    if mesh.is_valid() {
        Ok(())
    } else {
        Err(FractureError::InvalidGeometry(format!(
            "chunk mesh needs at least 3 vertices and 1 triangle (got {} and {})",
            mesh.vertex_count(),
            mesh.triangle_count()
        )))
    }
}

impl FractureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with `mesh` as the only root chunk
    ///
    /// Clears every chunk and lifts a previous `finalize()`.
    pub fn set_source_mesh(&mut self, mesh: Mesh) -> Result<ChunkId> {
        let ids = self.set_source_meshes(vec![mesh])?;
        Ok(ids[0])
    }

    /// Start over with one root chunk per mesh
    pub fn set_source_meshes(&mut self, meshes: Vec<Mesh>) -> Result<Vec<ChunkId>> {
        if meshes.is_empty() {
            return Err(FractureError::InvalidGeometry("no source meshes".to_string()));
        }
        for mesh in &meshes {
            check_mesh(mesh)?;
            if !mesh.is_closed() {
                log::warn!("source mesh with {} triangles is not closed", mesh.triangle_count());
            }
        }

        self.hierarchy.clear();
        self.finalized = false;
        self.crack_edges.clear();
        let ids: Vec<ChunkId> = meshes.into_iter().map(|mesh| self.hierarchy.add_root(mesh)).collect();
        log::info!("source set with {} root chunks", ids.len());
        Ok(ids)
    }

    /// Register a chunk mesh directly, under `parent` or as a root
    pub fn add_chunk(&mut self, mesh: Mesh, parent: Option<ChunkId>) -> Result<ChunkId> {
        self.ensure_editable()?;
        check_mesh(&mesh)?;
        self.hierarchy.add(parent, mesh)
    }

    /// The chunk hierarchy
    pub fn hierarchy(&self) -> &ChunkHierarchy {
        &self.hierarchy
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.hierarchy.len()
    }

    pub fn chunk(&self, id: ChunkId) -> Result<&ChunkInfo> {
        self.hierarchy.get(id)
    }

    /// Geometry of a chunk
    pub fn chunk_mesh(&self, id: ChunkId) -> Result<&Mesh> {
        Ok(&self.hierarchy.get(id)?.mesh)
    }

    /// Dense storage index of a chunk
    pub fn chunk_index(&self, id: ChunkId) -> Result<usize> {
        self.hierarchy.index_of(id)
    }

    /// Chunk stored at a dense index
    pub fn chunk_id_at(&self, index: usize) -> Option<ChunkId> {
        self.hierarchy.id_at(index)
    }

    pub fn chunk_depth(&self, id: ChunkId) -> Result<u32> {
        self.hierarchy.depth(id)
    }

    pub fn chunk_ids(&self) -> Vec<ChunkId> {
        self.hierarchy.ids()
    }

    pub fn leaf_chunk_ids(&self) -> Vec<ChunkId> {
        self.hierarchy.leaves()
    }

    /// Whether fracture results drop small disconnected components
    pub fn remove_islands(&self) -> bool {
        self.remove_islands
    }

    pub fn set_remove_islands(&mut self, remove: bool) {
        self.remove_islands = remove;
    }

    /// Island volume threshold as a fraction of the processed chunk
    pub fn island_threshold(&self) -> f32 {
        self.island_threshold
    }

    /// Set the island volume threshold
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `fraction` is in `[0, 1]`.
    pub fn set_island_threshold(&mut self, fraction: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(FractureError::InvalidConfig(format!(
                "island threshold must be in [0, 1] (got {})",
                fraction
            )));
        }
        self.island_threshold = fraction;
        Ok(())
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.finalized {
            Err(FractureError::Finalized)
        } else {
            Ok(())
        }
    }

    /// Mesh of a chunk that may still be fractured
    fn target_mesh(&self, chunk: ChunkId) -> Result<Mesh> {
        self.ensure_editable()?;
        let mesh = self.chunk_mesh(chunk)?;
        check_mesh(mesh)?;
        Ok(mesh.clone())
    }

    /// Fracture a chunk along the Voronoi cells of a generator's sites
    ///
    /// See [`voronoi_fracture_sites`](Self::voronoi_fracture_sites).
    pub fn voronoi_fracture(
        &mut self,
        chunk: ChunkId,
        generator: &SiteGenerator,
        replace_chunk: bool,
    ) -> Result<Vec<ChunkId>> {
        self.voronoi_fracture_sites(chunk, generator.sites(), replace_chunk)
    }

    /// Fracture a chunk along the Voronoi cells of explicit sites
    ///
    /// Returns the new chunk ids. Repeated sites count once.
    ///
    /// # Errors
    ///
    /// `InsufficientSites` with fewer than two distinct sites,
    /// `InvalidGeometry` when fewer than two cells intersect the chunk.
    pub fn voronoi_fracture_sites(
        &mut self,
        chunk: ChunkId,
        sites: &[Vec3],
        replace_chunk: bool,
    ) -> Result<Vec<ChunkId>> {
        let mesh = self.target_mesh(chunk)?;
        let pieces = voronoi::voronoi_pieces(&mesh, sites)?;
        log::debug!("voronoi fracture of chunk {} with {} sites", chunk, sites.len());
        self.commit(chunk, &mesh, pieces, replace_chunk)
    }

    /// Cut a chunk into a grid of slices
    pub fn slice<R: Rng + ?Sized>(
        &mut self,
        chunk: ChunkId,
        config: &SlicingConfig,
        replace_chunk: bool,
        rng: &mut R,
    ) -> Result<Vec<ChunkId>> {
        config.validate()?;
        let mesh = self.target_mesh(chunk)?;
        let pieces = slicing::slice_pieces(&mesh, config, rng)?;
        if pieces.len() < 2 {
            return Err(FractureError::InvalidGeometry(format!(
                "slicing left chunk {} in one piece",
                chunk
            )));
        }
        self.commit(chunk, &mesh, pieces, replace_chunk)
    }

    /// Cut a chunk in two along the plane through `position` facing `normal`
    ///
    /// The noise seed is drawn from `rng`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a zero normal or bad noise settings,
    /// `InvalidGeometry` when the plane misses the chunk.
    pub fn cut<R: Rng + ?Sized>(
        &mut self,
        chunk: ChunkId,
        normal: Vec3,
        position: Vec3,
        noise: &NoiseConfig,
        replace_chunk: bool,
        rng: &mut R,
    ) -> Result<Vec<ChunkId>> {
        noise.validate()?;
        let plane = Plane::from_point_normal(position, normal).ok_or_else(|| {
            FractureError::InvalidConfig(format!("cut normal must be non-zero and finite (got {})", normal))
        })?;
        let mesh = self.target_mesh(chunk)?;

        let style = CapStyle::noisy(*noise, rng.gen::<u32>(), true);
        let split = cut::split(&mesh, &plane, &style)?;
        if split.below.is_empty() || split.above.is_empty() {
            return Err(FractureError::InvalidGeometry(format!(
                "cutting plane misses chunk {}",
                chunk
            )));
        }
        self.commit(chunk, &mesh, vec![split.below, split.above], replace_chunk)
    }

    /// Punch the loops of a cutout pattern through a chunk
    ///
    /// Each loop's plug becomes a chunk, as does the remainder.
    pub fn cutout<R: Rng + ?Sized>(
        &mut self,
        chunk: ChunkId,
        config: &CutoutConfig,
        replace_chunk: bool,
        rng: &mut R,
    ) -> Result<Vec<ChunkId>> {
        config.validate()?;
        let mesh = self.target_mesh(chunk)?;
        let pieces = cutout::cutout_pieces(&mesh, config, rng)?;
        if pieces.len() < 2 {
            return Err(FractureError::InvalidGeometry(format!(
                "cutout pattern does not cut chunk {}",
                chunk
            )));
        }
        self.commit(chunk, &mesh, pieces, replace_chunk)
    }

    /// Replace the subhierarchy of `chunk` with the given pieces
    ///
    /// Pieces are split into connected components first; with island removal
    /// on, components under the threshold are dropped.
    fn commit(&mut self, chunk: ChunkId, source: &Mesh, pieces: Vec<Mesh>, replace_chunk: bool) -> Result<Vec<ChunkId>> {
        let threshold = self.island_threshold * source.volume().abs();
        let mut meshes = Vec::with_capacity(pieces.len());
        let mut dropped = 0;
        for piece in pieces {
            for component in piece.connected_components() {
                if self.remove_islands && component.volume().abs() < threshold {
                    dropped += 1;
                } else {
                    meshes.push(component);
                }
            }
        }
        if dropped > 0 {
            log::debug!("dropped {} islands while fracturing chunk {}", dropped, chunk);
        }
        if meshes.is_empty() {
            return Err(FractureError::InvalidGeometry(format!(
                "fracture of chunk {} left no pieces",
                chunk
            )));
        }

        let approximate = self.hierarchy.get(chunk)?.approximate_bonding;
        let parent = if replace_chunk {
            self.hierarchy.parent(chunk)?
        } else {
            Some(chunk)
        };

        self.hierarchy.remove_subtree(chunk, !replace_chunk)?;
        let mut ids = Vec::with_capacity(meshes.len());
        for mesh in meshes {
            let id = self.hierarchy.add(parent, mesh)?;
            self.hierarchy.get_mut(id)?.approximate_bonding = approximate;
            ids.push(id);
        }
        log::info!("fractured chunk {} into {} chunks", chunk, ids.len());
        Ok(ids)
    }

    /// Split disconnected components of a chunk off into their own chunks
    ///
    /// The largest component stays in the chunk. With island removal on,
    /// components under the threshold are discarded; every other component
    /// becomes a sibling chunk flagged as an island. Existing children of
    /// the chunk are removed when its mesh changes.
    ///
    /// Returns the number of discarded components.
    pub fn island_detection_and_removing(&mut self, chunk: ChunkId) -> Result<usize> {
        let mesh = self.target_mesh(chunk)?;
        let mut components = mesh.connected_components();
        if components.len() < 2 {
            return Ok(0);
        }

        let largest = components
            .iter()
            .enumerate()
            .max_by(|(i, a), (j, b)| a.volume().abs().total_cmp(&b.volume().abs()).then(j.cmp(i)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let main = components.swap_remove(largest);

        let threshold = self.island_threshold * mesh.volume().abs();
        let (discarded, islands): (Vec<Mesh>, Vec<Mesh>) = components
            .into_iter()
            .partition(|m| self.remove_islands && m.volume().abs() < threshold);

        let info = self.hierarchy.get(chunk)?;
        let (parent, approximate) = (info.parent, info.approximate_bonding);
        self.hierarchy.remove_subtree(chunk, true)?;
        self.hierarchy.get_mut(chunk)?.mesh = main;
        for island in islands {
            let id = self.hierarchy.add(parent, island)?;
            let info = self.hierarchy.get_mut(id)?;
            info.is_island = true;
            info.approximate_bonding = approximate;
        }

        log::debug!("chunk {}: discarded {} islands", chunk, discarded.len());
        Ok(discarded.len())
    }

    /// Choose approximate or exact bonding for a chunk
    pub fn set_approximate_bonding(&mut self, chunk: ChunkId, approximate: bool) -> Result<()> {
        self.hierarchy.get_mut(chunk)?.approximate_bonding = approximate;
        Ok(())
    }

    /// Remove every descendant of `chunk`, and `chunk` itself when `delete_root`
    ///
    /// Returns the removed ids.
    pub fn delete_chunk_subhierarchy(&mut self, chunk: ChunkId, delete_root: bool) -> Result<Vec<ChunkId>> {
        self.ensure_editable()?;
        self.hierarchy.remove_subtree(chunk, !delete_root)
    }

    /// Scale the cut-face UVs of one chunk into a `side × side` square
    pub fn fit_uv_to_rect(&mut self, side: f32, chunk: ChunkId) -> Result<()> {
        self.ensure_editable()?;
        check_side(side)?;
        let mesh = &mut self.hierarchy.get_mut(chunk)?.mesh;
        let extent = export::interior_uv_extent(mesh);
        if extent > 0.0 {
            export::fit_interior_uvs(mesh, side / extent);
        }
        Ok(())
    }

    /// Scale the cut-face UVs of every chunk with one common factor
    ///
    /// The chunk with the largest UV extent fills the square exactly, which
    /// keeps texel density equal across chunks.
    pub fn fit_all_uv_to_rect(&mut self, side: f32) -> Result<()> {
        self.ensure_editable()?;
        check_side(side)?;
        let extent = self
            .hierarchy
            .iter()
            .map(|info| export::interior_uv_extent(&info.mesh))
            .fold(0.0, f32::max);
        if extent <= 0.0 {
            return Ok(());
        }
        for id in self.hierarchy.ids() {
            export::fit_interior_uvs(&mut self.hierarchy.get_mut(id)?.mesh, side / extent);
        }
        Ok(())
    }

    /// Lock the chunk set and compute crack edges
    ///
    /// Calling it again recomputes the crack edges.
    pub fn finalize(&mut self) {
        self.crack_edges = export::crack_edges(&self.hierarchy);
        self.finalized = true;
        log::info!(
            "finalized {} chunks with {} crack edges",
            self.hierarchy.len(),
            self.crack_edges.len()
        );
    }

    /// Edges where original surface meets cut faces in leaf chunks
    pub fn crack_edges(&self) -> Result<&[CrackEdge]> {
        if !self.finalized {
            return Err(FractureError::NotFinalized);
        }
        Ok(&self.crack_edges)
    }

    /// Export a finalized chunk as flat buffers
    pub fn export_chunk_mesh(&self, chunk: ChunkId) -> Result<MeshData> {
        if !self.finalized {
            return Err(FractureError::NotFinalized);
        }
        Ok(self.chunk_mesh(chunk)?.to_mesh_data())
    }

    /// Export only the cut faces (`inside`) or only the original surface of a chunk
    pub fn export_chunk_side(&self, chunk: ChunkId, inside: bool) -> Result<MeshData> {
        if !self.finalized {
            return Err(FractureError::NotFinalized);
        }
        let mesh = self.chunk_mesh(chunk)?;
        let triangles: Vec<usize> = (0..mesh.triangle_count())
            .filter(|&t| mesh.is_interior(t) == inside)
            .collect();
        Ok(mesh.submesh(&triangles).to_mesh_data())
    }

    /// Convex collision hull of a chunk
    pub fn chunk_convex_hull(&self, chunk: ChunkId) -> Result<Mesh> {
        export::convex_hull(self.chunk_mesh(chunk)?)
    }

    /// Bonds between touching sibling chunks
    pub fn generate_bonds(&self) -> Vec<Bond> {
        bonding::generate_bonds(&self.hierarchy)
    }
}

fn check_side(side: f32) -> Result<()> {
    if side.is_finite() && side > 0.0 {
        Ok(())
    } else {
        Err(FractureError::InvalidConfig(format!(
            "uv rectangle side must be positive (got {})",
            side
        )))
    }
}
