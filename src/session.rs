//! Handle-based authoring session
//!
//! An [`AuthoringSession`] owns every mesh, site generator and fracture
//! engine created through it. Callers hold [`Handle`]s; releasing an object
//! invalidates its handle and any later use reports `InvalidHandle`.

use crate::arena::{Arena, Handle};
use crate::config::CutoutConfig;
use crate::config::CutoutDiagnostic;
use crate::error::{FractureError, Result};
use crate::fracture::FractureEngine;
use crate::hierarchy::ChunkId;
use crate::mesh::{Mesh, MeshCleaner, MeshData};
use crate::random::FractureRng;
use crate::sites::SiteGenerator;

/// Owner of the objects of one authoring session
#[derive(Debug, Clone, Default)]
pub struct AuthoringSession {
    meshes: Arena<Mesh>,
    generators: Arena<SiteGenerator>,
    engines: Arena<FractureEngine>,
    cleaner: MeshCleaner,
    rng: FractureRng,
}

impl AuthoringSession {
    /// Empty session seeded from the process-wide default seed
    pub fn new() -> Self {
        Self::default()
    }

    /// Reseed the session random source
    pub fn set_seed(&mut self, seed: u64) {
        self.rng.set_seed(seed);
    }

    pub fn rng(&mut self) -> &mut FractureRng {
        &mut self.rng
    }

    /// Use a custom cleaner for `clean_mesh`
    pub fn set_cleaner(&mut self, cleaner: MeshCleaner) {
        self.cleaner = cleaner;
    }

    // Meshes

    /// Copy flat buffers into a session mesh
    pub fn import_mesh(&mut self, data: &MeshData) -> Result<Handle<Mesh>> {
        let mesh = Mesh::from_mesh_data(data)?;
        Ok(self.meshes.insert(mesh))
    }

    /// Take ownership of an already built mesh
    pub fn add_mesh(&mut self, mesh: Mesh) -> Handle<Mesh> {
        self.meshes.insert(mesh)
    }

    pub fn mesh(&self, handle: Handle<Mesh>) -> Result<&Mesh> {
        self.meshes.get(handle).ok_or(FractureError::InvalidHandle("mesh"))
    }

    pub fn export_mesh(&self, handle: Handle<Mesh>) -> Result<MeshData> {
        Ok(self.mesh(handle)?.to_mesh_data())
    }

    pub fn release_mesh(&mut self, handle: Handle<Mesh>) -> Result<Mesh> {
        self.meshes.remove(handle).ok_or(FractureError::InvalidHandle("mesh"))
    }

    /// Whether a mesh has enough geometry to fracture
    pub fn mesh_is_valid(&self, handle: Handle<Mesh>) -> Result<bool> {
        Ok(self.mesh(handle)?.is_valid())
    }

    /// Clean a mesh into a new one; the input stays alive
    pub fn clean_mesh(&mut self, handle: Handle<Mesh>) -> Result<Handle<Mesh>> {
        let cleaned = self.cleaner.clean(self.mesh(handle)?)?;
        Ok(self.meshes.insert(cleaned))
    }

    // Site generators

    /// Site generator over a copy of a session mesh
    pub fn create_site_generator(&mut self, mesh: Handle<Mesh>) -> Result<Handle<SiteGenerator>> {
        let generator = SiteGenerator::new(self.mesh(mesh)?.clone())?;
        Ok(self.generators.insert(generator))
    }

    /// Run `f` on a generator with the session random source
    pub fn with_generator<T>(
        &mut self,
        handle: Handle<SiteGenerator>,
        f: impl FnOnce(&mut SiteGenerator, &mut FractureRng) -> T,
    ) -> Result<T> {
        let generator = self
            .generators
            .get_mut(handle)
            .ok_or(FractureError::InvalidHandle("site generator"))?;
        Ok(f(generator, &mut self.rng))
    }

    /// Restrict a generator to a stencil mesh
    pub fn set_generator_stencil(&mut self, handle: Handle<SiteGenerator>, stencil: Handle<Mesh>) -> Result<()> {
        let stencil = self.mesh(stencil)?.clone();
        self.with_generator(handle, |generator, _| generator.set_stencil(stencil))
    }

    pub fn release_site_generator(&mut self, handle: Handle<SiteGenerator>) -> Result<SiteGenerator> {
        self.generators
            .remove(handle)
            .ok_or(FractureError::InvalidHandle("site generator"))
    }

    // Fracture engines

    pub fn create_fracture_engine(&mut self) -> Handle<FractureEngine> {
        self.engines.insert(FractureEngine::new())
    }

    /// Run `f` on an engine with the session random source
    pub fn with_engine<T>(
        &mut self,
        handle: Handle<FractureEngine>,
        f: impl FnOnce(&mut FractureEngine, &mut FractureRng) -> T,
    ) -> Result<T> {
        let engine = self
            .engines
            .get_mut(handle)
            .ok_or(FractureError::InvalidHandle("fracture engine"))?;
        Ok(f(engine, &mut self.rng))
    }

    fn engine(&self, handle: Handle<FractureEngine>) -> Result<&FractureEngine> {
        self.engines
            .get(handle)
            .ok_or(FractureError::InvalidHandle("fracture engine"))
    }

    /// Make a copy of a session mesh the engine's only root chunk
    pub fn set_source_mesh(&mut self, engine: Handle<FractureEngine>, mesh: Handle<Mesh>) -> Result<ChunkId> {
        let mesh = self.mesh(mesh)?.clone();
        self.with_engine(engine, |engine, _| engine.set_source_mesh(mesh))?
    }

    /// Voronoi-fracture a chunk with the current sites of a generator
    pub fn voronoi_fracture(
        &mut self,
        engine: Handle<FractureEngine>,
        chunk: ChunkId,
        generator: Handle<SiteGenerator>,
        replace_chunk: bool,
    ) -> Result<Vec<ChunkId>> {
        let generator = self
            .generators
            .get(generator)
            .ok_or(FractureError::InvalidHandle("site generator"))?;
        let engine = self
            .engines
            .get_mut(engine)
            .ok_or(FractureError::InvalidHandle("fracture engine"))?;
        engine.voronoi_fracture(chunk, generator, replace_chunk)
    }

    /// Copy a chunk's geometry out into a new session mesh
    pub fn chunk_mesh(&mut self, engine: Handle<FractureEngine>, chunk: ChunkId) -> Result<Handle<Mesh>> {
        let mesh = self.engine(engine)?.chunk_mesh(chunk)?.clone();
        Ok(self.meshes.insert(mesh))
    }

    pub fn release_fracture_engine(&mut self, handle: Handle<FractureEngine>) -> Result<FractureEngine> {
        self.engines
            .remove(handle)
            .ok_or(FractureError::InvalidHandle("fracture engine"))
    }

    /// Diagnose a cutout configuration without running it
    pub fn debug_check_cutout_config(&self, config: &CutoutConfig) -> CutoutDiagnostic {
        let diagnostic = config.diagnose();
        if !diagnostic.is_ok() {
            log::debug!("cutout configuration check failed with code {}", diagnostic.code());
        }
        diagnostic
    }
}
