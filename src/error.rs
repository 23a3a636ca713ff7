//! Error types for mesh fracturing

use thiserror::Error;

use crate::hierarchy::ChunkId;

/// Errors that can occur while cleaning, generating sites or fracturing
///
/// A failed operation never leaves partial state behind: the chunk hierarchy,
/// site lists and meshes are exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FractureError {
    /// Requested chunk ID does not exist
    #[error("chunk not found: {0}")]
    ChunkNotFound(ChunkId),
    /// Arena handle was released or belongs to another arena
    #[error("invalid or released {0} handle")]
    InvalidHandle(&'static str),
    /// Mesh is too small, degenerate, or a cut produced nothing usable
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Voronoi fracture needs at least two sites to cut anything
    #[error("insufficient sites: need at least {required}, found {found}")]
    InsufficientSites {
        /// Minimum number of sites
        required: usize,
        /// Number of sites supplied
        found: usize,
    },
    /// The chunk set was finalized and can no longer be restructured
    #[error("fracture already finalized")]
    Finalized,
    /// Operation requires `finalize()` to have been called
    #[error("fracture not finalized")]
    NotFinalized,
    /// Buffer allocation failed
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Result type alias for fracture operations
pub type Result<T> = std::result::Result<T, FractureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FractureError::ChunkNotFound(7).to_string(),
            "chunk not found: 7"
        );
        assert_eq!(
            FractureError::InsufficientSites { required: 2, found: 1 }.to_string(),
            "insufficient sites: need at least 2, found 1"
        );
        assert_eq!(
            FractureError::InvalidHandle("mesh").to_string(),
            "invalid or released mesh handle"
        );
    }
}
