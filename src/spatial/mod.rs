//! Nearest-neighbour search over a fixed point set.

use crate::geometry::PointSet;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Point3;

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the indexed point set.
    pub index: usize,
    /// Euclidean distance to the query point.
    pub distance: f64,
}

/// Read-only nearest-neighbour lookup. Implementations are shareable across threads.
pub trait SpatialIndex: Send + Sync {
    /// Nearest indexed point to `query`, or `None` when the index is empty.
    fn nearest(&self, query: &Point3<f64>) -> Option<Neighbor>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn nearest_all(&self, queries: &PointSet) -> Vec<Neighbor> {
        queries.iter().filter_map(|q| self.nearest(q)).collect()
    }
}

/// KD-tree backed index.
///
/// The tree is built once from a slice, so any number of points may share a
/// coordinate on an axis, as planar scans and repeated samples do.
pub struct KdTreeIndex {
    tree: Option<ImmutableKdTree<f64, 3>>,
    len: usize,
}

impl KdTreeIndex {
    pub fn build(points: &PointSet) -> Self {
        let entries: Vec<[f64; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree = if entries.is_empty() {
            None
        } else {
            Some(ImmutableKdTree::new_from_slice(&entries))
        };
        Self {
            tree,
            len: entries.len(),
        }
    }
}

impl SpatialIndex for KdTreeIndex {
    fn nearest(&self, query: &Point3<f64>) -> Option<Neighbor> {
        let tree = self.tree.as_ref()?;
        let nn = tree.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        Some(Neighbor {
            index: nn.item as usize,
            distance: nn.distance.sqrt(),
        })
    }

    fn len(&self) -> usize {
        self.len
    }
}
