//! Edge and connectivity analysis
//!
//! Vertices are matched by exact position rather than by index so that
//! duplicated vertices along UV seams or hard edges still connect.

use glam::{IVec3, Vec3};
use std::collections::HashMap;

use super::Mesh;

/// Bit pattern of a position, used as a hash key
pub(crate) type PositionKey = [u32; 3];

/// Hashable key for a position
///
/// `-0.0` and `0.0` map to the same key.
#[inline]
pub(crate) fn position_key(p: Vec3) -> PositionKey {
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

/// Snaps positions onto the first one seen within a tolerance
///
/// A given input position always maps to the same output, so points that
/// should coincide but were computed along different paths agree bit for bit.
#[derive(Debug, Clone)]
pub(crate) struct PositionWelder {
    tolerance: f32,
    grid: HashMap<IVec3, Vec<Vec3>>,
    known: HashMap<PositionKey, Vec3>,
}

impl PositionWelder {
    pub(crate) fn new(tolerance: f32) -> Self {
        Self {
            tolerance: tolerance.max(f32::MIN_POSITIVE),
            grid: HashMap::new(),
            known: HashMap::new(),
        }
    }

    pub(crate) fn weld(&mut self, p: Vec3) -> Vec3 {
        let key = position_key(p);
        if let Some(&welded) = self.known.get(&key) {
            return welded;
        }

        let cell = (p / self.tolerance).floor().as_ivec3();
        let limit = self.tolerance * self.tolerance;
        let mut target = None;
        'search: for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(bucket) = self.grid.get(&(cell + IVec3::new(dx, dy, dz))) else {
                        continue;
                    };
                    if let Some(&found) = bucket.iter().find(|q| q.distance_squared(p) <= limit) {
                        target = Some(found);
                        break 'search;
                    }
                }
            }
        }

        let welded = target.unwrap_or_else(|| {
            self.grid.entry(cell).or_default().push(p);
            p
        });
        self.known.insert(key, welded);
        welded
    }
}

fn triangle_keys(mesh: &Mesh, tri: usize) -> [PositionKey; 3] {
    let [a, b, c] = mesh.triangle_positions(tri);
    [position_key(a), position_key(b), position_key(c)]
}

/// Every directed edge must be matched by one running the other way
pub(crate) fn has_open_edges(mesh: &Mesh) -> bool {
    if mesh.is_empty() {
        return true;
    }

    let mut directed: HashMap<(PositionKey, PositionKey), i32> = HashMap::new();
    for t in 0..mesh.triangle_count() {
        let keys = triangle_keys(mesh, t);
        for i in 0..3 {
            let (a, b) = (keys[i], keys[(i + 1) % 3]);
            if a == b {
                continue;
            }
            // Count a->b as +1 and b->a as -1 on one canonical key
            if a < b {
                *directed.entry((a, b)).or_insert(0) += 1;
            } else {
                *directed.entry((b, a)).or_insert(0) -= 1;
            }
        }
    }

    directed.values().any(|&balance| balance != 0)
}

pub(crate) fn non_manifold_edge_count(mesh: &Mesh) -> usize {
    let mut undirected: HashMap<(PositionKey, PositionKey), u32> = HashMap::new();
    for t in 0..mesh.triangle_count() {
        let keys = triangle_keys(mesh, t);
        for i in 0..3 {
            let (a, b) = (keys[i], keys[(i + 1) % 3]);
            if a == b {
                continue;
            }
            let edge = if a < b { (a, b) } else { (b, a) };
            *undirected.entry(edge).or_insert(0) += 1;
        }
    }
    undirected.values().filter(|&&count| count > 2).count()
}

/// Union-find over triangle indices
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Group triangles that are connected through shared vertex positions
///
/// Groups are ordered by their lowest triangle index, and triangles within a
/// group keep their original order.
pub(crate) fn triangle_components(mesh: &Mesh) -> Vec<Vec<usize>> {
    let count = mesh.triangle_count();
    let mut sets = DisjointSet::new(count);
    let mut first_owner: HashMap<PositionKey, usize> = HashMap::new();

    for t in 0..count {
        for key in triangle_keys(mesh, t) {
            match first_owner.get(&key) {
                Some(&owner) => sets.union(owner, t),
                None => {
                    first_owner.insert(key, t);
                }
            }
        }
    }

    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for t in 0..count {
        let root = sets.find(t);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(t);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::{two_cubes, unit_cube};

    #[test]
    fn test_negative_zero_key() {
        assert_eq!(position_key(Vec3::new(-0.0, 0.0, 1.0)), position_key(Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_welder_merges_near_points() {
        let mut welder = PositionWelder::new(1e-6);
        let a = Vec3::new(-0.08860317, -0.047625788, -0.0464264);
        let b = Vec3::new(-0.08860317, -0.04762577, -0.04642637);
        let far = Vec3::new(-0.0886, -0.0476, -0.0464);

        assert_eq!(welder.weld(a), a);
        assert_eq!(welder.weld(b), a);
        assert_eq!(welder.weld(far), far);
        assert_eq!(welder.weld(b), a);
        assert_eq!(welder.weld(a), a);
    }

    #[test]
    fn test_closed_cube_has_no_open_edges() {
        assert!(!has_open_edges(&unit_cube()));
        assert_eq!(non_manifold_edge_count(&unit_cube()), 0);
    }

    #[test]
    fn test_components_of_two_cubes() {
        let groups = triangle_components(&two_cubes());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], (0..12).collect::<Vec<_>>());
        assert_eq!(groups[1], (12..24).collect::<Vec<_>>());
    }
}
