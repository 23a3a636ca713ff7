//! Destruction fracture for triangle meshes
//!
//! A standalone library that breaks closed meshes into chunks for
//! destructible game assets, suitable for use with any game engine.
//! Chunks come from Voronoi cells, jittered slicing grids, extruded
//! cutout patterns or single plane cuts, and can be fractured again to
//! build a chunk hierarchy.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rust_voronoi_fracture::*;
//!
//! let mut rng = FractureRng::new(42);
//! let mesh = MeshCleaner::new().clean(&cuboid(Vec3::ONE)).unwrap();
//!
//! // Scatter sites inside the mesh
//! let mut sites = SiteGenerator::new(mesh.clone()).unwrap();
//! sites.uniform(20, &mut rng);
//!
//! // Fracture and read the chunks back
//! let mut engine = FractureEngine::new();
//! let root = engine.set_source_mesh(mesh).unwrap();
//! let chunks = engine.voronoi_fracture(root, &sites, false).unwrap();
//! engine.finalize();
//!
//! for chunk in chunks {
//!     let data = engine.export_chunk_mesh(chunk).unwrap();
//!     println!("chunk {}: {} triangles", chunk, data.triangle_count());
//! }
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): KD-tree nearest-site lookups
//! - `serde`: serialization support for configurations, meshes and bonds

// Modules
pub mod error;
pub mod config;
pub mod random;
pub mod noise;
pub mod plane;
pub mod cell;
pub mod mesh;
pub mod sites;
pub mod hierarchy;
pub mod fracture;
pub mod bonding;
pub mod arena;
pub mod session;

#[cfg(feature = "spatial-index")]
pub mod spatial;

// Re-export core types for convenience
pub use error::{FractureError, Result};
pub use config::{
    BlastConfig, BlastZone, CutoutConfig, CutoutDiagnostic, CutoutSet, NoiseConfig,
    RadialPatternConfig, RigidTransform, SlicingConfig, SlicingConfigBuilder,
};
pub use random::{default_seed, set_default_seed, FractureRng};
pub use plane::Plane;
pub use cell::VoronoiCell;
pub use mesh::{cuboid, Aabb, Mesh, MeshCleaner, MeshData, Vertex};
pub use sites::{SamplingMode, SiteGenerator, StencilMode};
pub use hierarchy::{ChunkHierarchy, ChunkId, ChunkInfo};
pub use fracture::{CrackEdge, FractureEngine};
pub use bonding::Bond;
pub use arena::{Arena, Handle};
pub use session::AuthoringSession;

#[cfg(feature = "spatial-index")]
pub use spatial::SpatialIndex;

// Re-export glam types used in the public API
pub use glam::{Quat, Vec2, Vec3};
