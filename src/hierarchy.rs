//! Chunk parent/child bookkeeping
//!
//! Chunks have two numbering spaces: a stable external [`ChunkId`] handed
//! out by a monotonic counter, and a dense storage index that changes when
//! other chunks are removed. Lookups go through an explicit id → index map;
//! index → id is read from the dense slot itself.

use std::collections::HashMap;

use crate::error::{FractureError, Result};
use crate::mesh::Mesh;

/// Stable chunk identifier, never reused within one hierarchy
pub type ChunkId = u32;

/// A chunk and its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInfo {
    /// Stable identifier
    pub id: ChunkId,
    /// Parent chunk, `None` for roots
    pub parent: Option<ChunkId>,
    /// 0 for roots, parent depth + 1 otherwise
    pub depth: u32,
    /// Chunk geometry
    pub mesh: Mesh,
    /// Bond strength comes from an adjacency estimate instead of shared faces
    pub approximate_bonding: bool,
    /// Chunk was split off as a disconnected island
    pub is_island: bool,
}

/// Dense chunk storage with id ↔ index mapping
#[derive(Debug, Clone, Default)]
pub struct ChunkHierarchy {
    chunks: Vec<ChunkInfo>,
    index_of: HashMap<ChunkId, usize>,
    children: HashMap<ChunkId, Vec<ChunkId>>,
    next_id: ChunkId,
}

impl ChunkHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Remove every chunk; ids keep counting up
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.index_of.clear();
        self.children.clear();
    }

    fn insert(&mut self, parent: Option<ChunkId>, depth: u32, mesh: Mesh) -> ChunkId {
        let id = self.next_id;
        self.next_id += 1;
        self.index_of.insert(id, self.chunks.len());
        self.chunks.push(ChunkInfo {
            id,
            parent,
            depth,
            mesh,
            approximate_bonding: false,
            is_island: false,
        });
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(id);
        }
        id
    }

    /// Register a chunk without a parent
    pub fn add_root(&mut self, mesh: Mesh) -> ChunkId {
        self.insert(None, 0, mesh)
    }

    /// Register a chunk under `parent`
    ///
    /// # Errors
    ///
    /// Returns `ChunkNotFound` if `parent` does not exist.
    pub fn add_child(&mut self, parent: ChunkId, mesh: Mesh) -> Result<ChunkId> {
        let depth = self.depth(parent)? + 1;
        Ok(self.insert(Some(parent), depth, mesh))
    }

    /// Register a chunk with an explicit parent slot, root when `None`
    pub fn add(&mut self, parent: Option<ChunkId>, mesh: Mesh) -> Result<ChunkId> {
        match parent {
            Some(parent) => self.add_child(parent, mesh),
            None => Ok(self.add_root(mesh)),
        }
    }

    /// Check if a chunk exists
    #[inline]
    pub fn contains(&self, id: ChunkId) -> bool {
        self.index_of.contains_key(&id)
    }

    /// Dense index of a chunk
    pub fn index_of(&self, id: ChunkId) -> Result<usize> {
        self.index_of.get(&id).copied().ok_or(FractureError::ChunkNotFound(id))
    }

    /// Chunk stored at a dense index
    pub fn id_at(&self, index: usize) -> Option<ChunkId> {
        self.chunks.get(index).map(|info| info.id)
    }

    pub fn get(&self, id: ChunkId) -> Result<&ChunkInfo> {
        let index = self.index_of(id)?;
        Ok(&self.chunks[index])
    }

    pub fn get_mut(&mut self, id: ChunkId) -> Result<&mut ChunkInfo> {
        let index = self.index_of(id)?;
        Ok(&mut self.chunks[index])
    }

    pub fn depth(&self, id: ChunkId) -> Result<u32> {
        Ok(self.get(id)?.depth)
    }

    pub fn parent(&self, id: ChunkId) -> Result<Option<ChunkId>> {
        Ok(self.get(id)?.parent)
    }

    /// Direct children in creation order
    pub fn children(&self, id: ChunkId) -> &[ChunkId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All descendants, breadth first
    pub fn descendants(&self, id: ChunkId) -> Vec<ChunkId> {
        let mut out: Vec<ChunkId> = self.children(id).to_vec();
        let mut cursor = 0;
        while cursor < out.len() {
            let next = out[cursor];
            out.extend_from_slice(self.children(next));
            cursor += 1;
        }
        out
    }

    /// Chunks without children, in storage order
    pub fn leaves(&self) -> Vec<ChunkId> {
        self.chunks
            .iter()
            .filter(|info| self.children(info.id).is_empty())
            .map(|info| info.id)
            .collect()
    }

    /// Chunks in storage order
    pub fn iter(&self) -> impl Iterator<Item = &ChunkInfo> {
        self.chunks.iter()
    }

    /// Ids in storage order
    pub fn ids(&self) -> Vec<ChunkId> {
        self.chunks.iter().map(|info| info.id).collect()
    }

    /// Remove every descendant of `id`, and `id` itself unless `keep_root`
    ///
    /// Returns the removed ids, parents before children.
    pub fn remove_subtree(&mut self, id: ChunkId, keep_root: bool) -> Result<Vec<ChunkId>> {
        self.index_of(id)?;

        let mut removed = Vec::new();
        if !keep_root {
            removed.push(id);
        }
        removed.extend(self.descendants(id));

        for &gone in &removed {
            self.remove_one(gone);
        }
        if keep_root {
            self.children.remove(&id);
        }
        Ok(removed)
    }

    /// Drop one chunk from the dense array and every map
    fn remove_one(&mut self, id: ChunkId) {
        let Some(index) = self.index_of.remove(&id) else {
            return;
        };
        let info = self.chunks.swap_remove(index);
        if let Some(moved) = self.chunks.get(index) {
            self.index_of.insert(moved.id, index);
        }
        if let Some(parent) = info.parent {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|&child| child != id);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
        self.children.remove(&id);
    }

    /// Check the depth and mapping invariants
    pub fn is_consistent(&self) -> bool {
        self.chunks.iter().enumerate().all(|(index, info)| {
            let mapped = self.index_of.get(&info.id) == Some(&index);
            let depth_ok = match info.parent {
                None => info.depth == 0,
                Some(parent) => self
                    .get(parent)
                    .map(|p| p.depth + 1 == info.depth && p.id == parent)
                    .unwrap_or(false),
            };
            mapped && depth_ok
        }) && self.index_of.len() == self.chunks.len()
    }
}
