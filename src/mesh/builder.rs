//! Incremental mesh assembly with vertex deduplication

use std::collections::HashMap;

use super::{Mesh, Vertex};

/// Bit pattern of every vertex attribute
type VertexKey = [u32; 8];

fn vertex_key(v: &Vertex) -> VertexKey {
    [
        (v.position.x + 0.0).to_bits(),
        (v.position.y + 0.0).to_bits(),
        (v.position.z + 0.0).to_bits(),
        v.normal.x.to_bits(),
        v.normal.y.to_bits(),
        v.normal.z.to_bits(),
        v.uv.x.to_bits(),
        v.uv.y.to_bits(),
    ]
}

/// Collects triangles and shares bit-identical vertices
#[derive(Debug, Default)]
pub(crate) struct MeshBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    interior: Vec<bool>,
    lookup: HashMap<VertexKey, u32>,
}

impl MeshBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push_vertex(&mut self, vertex: Vertex) -> u32 {
        let next = self.vertices.len() as u32;
        let index = *self.lookup.entry(vertex_key(&vertex)).or_insert(next);
        if index == next {
            self.vertices.push(vertex);
        }
        index
    }

    pub(crate) fn push_triangle(&mut self, a: Vertex, b: Vertex, c: Vertex, interior: bool) {
        let ia = self.push_vertex(a);
        let ib = self.push_vertex(b);
        let ic = self.push_vertex(c);
        self.push_indexed(ia, ib, ic, interior);
    }

    fn push_indexed(&mut self, a: u32, b: u32, c: u32, interior: bool) {
        self.indices.extend_from_slice(&[a, b, c]);
        self.interior.push(interior);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.interior.is_empty()
    }

    pub(crate) fn build(self, closed: bool) -> Mesh {
        Mesh::from_parts(self.vertices, self.indices, self.interior, closed)
    }
}
