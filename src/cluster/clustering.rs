//! Soft clustering state with incrementally maintained cluster aggregates

use std::fmt;
use std::ops::Index;

use crate::cluster::sparse_vector::SparseVector;
use crate::cluster::ClusterId;
use crate::error::{ClusterError, Result};
use crate::matrix::sparse::to_index;
use crate::matrix::SparseMatrix;

/// For each node, the clusters it belongs to and with what weight.
///
/// `cluster_size[k]` is the number of nodes in cluster `k` and
/// `cluster_weight[k]` the sum of their weights in it. Every mutation goes
/// through `add`, `remove`, `set`, `clear_node` or `clear`, which keep both
/// arrays consistent with the per-node vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Which clusters is each node in?
    clustering: Vec<SparseVector>,

    /// Number of nodes in each cluster
    cluster_size: Vec<usize>,

    /// Total membership weight of each cluster
    cluster_weight: Vec<f64>,
}

impl Clustering {
    /// Create an empty clustering of `num_node` nodes over `max_num_clus` cluster slots
    pub fn new(num_node: usize, max_num_clus: usize) -> Result<Self> {
        if num_node > 0 && max_num_clus == 0 {
            return Err(ClusterError::InvalidBounds {
                num_node,
                max_num_clus,
                reason: "nodes need at least one cluster slot",
            });
        }
        if max_num_clus > ClusterId::MAX as usize {
            return Err(ClusterError::InvalidBounds {
                num_node,
                max_num_clus,
                reason: "cluster ids do not fit in 32 bits",
            });
        }

        Ok(Self {
            clustering: vec![SparseVector::new(); num_node],
            cluster_size: vec![0; max_num_clus],
            cluster_weight: vec![0.0; max_num_clus],
        })
    }

    /// Every node in its own cluster with weight 1
    pub fn singletons(num_node: usize) -> Result<Self> {
        let mut clustering = Self::new(num_node, num_node)?;
        for i in 0..num_node {
            clustering.add(i, i as ClusterId, 1.0);
        }
        Ok(clustering)
    }

    /// Upper bound on cluster ids
    #[inline]
    pub fn max_num_clus(&self) -> usize {
        self.cluster_size.len()
    }

    /// Number of nodes
    #[inline]
    pub fn size(&self) -> usize {
        self.clustering.len()
    }

    #[inline]
    pub fn clus_size(&self, k: ClusterId) -> usize {
        self.cluster_size[k as usize]
    }

    #[inline]
    pub fn clus_weight(&self, k: ClusterId) -> f64 {
        self.cluster_weight[k as usize]
    }

    /// Total number of stored memberships
    pub fn nnz(&self) -> usize {
        self.clustering.iter().map(SparseVector::nnz).sum()
    }

    pub fn total_size(&self) -> usize {
        self.size() * self.max_num_clus()
    }

    pub fn number_of_zeros(&self) -> usize {
        self.total_size() - self.nnz()
    }

    pub fn num_nonempty_clusters(&self) -> usize {
        self.cluster_size.iter().filter(|&&size| size > 0).count()
    }

    /// Lowest cluster id with no members, if any
    pub fn first_empty_cluster(&self) -> Option<ClusterId> {
        self.cluster_size
            .iter()
            .position(|&size| size == 0)
            .map(|k| k as ClusterId)
    }

    /// Per-node membership vectors in node order
    pub fn iter(&self) -> std::slice::Iter<'_, SparseVector> {
        self.clustering.iter()
    }

    /// Add node `i` to cluster `clus`.
    ///
    /// Panics if `i` is already a member of `clus`, or if `weight` is not
    /// finite and strictly positive.
    pub fn add(&mut self, i: usize, clus: ClusterId, weight: f64) {
        self.assert_cluster(clus);
        assert_weight(i, clus, weight);
        self.clustering[i].insert(clus, weight);
        self.cluster_size[clus as usize] += 1;
        self.cluster_weight[clus as usize] += weight;
    }

    /// Like [`add`](Self::add), but reports violations instead of panicking,
    /// including a per-node cap on the number of memberships.
    pub fn try_add(&mut self, i: usize, clus: ClusterId, weight: f64, cap: Option<usize>) -> Result<()> {
        if clus as usize >= self.max_num_clus() {
            return Err(ClusterError::ClusterOutOfRange {
                clus,
                max_num_clus: self.max_num_clus(),
            });
        }
        if !is_valid_weight(weight) {
            return Err(ClusterError::InvalidWeight { node: i, clus, weight });
        }
        if self.clustering[i].contains(clus) {
            return Err(ClusterError::DuplicateMembership { node: i, clus });
        }
        if let Some(cap) = cap {
            if self.clustering[i].nnz() >= cap {
                return Err(ClusterError::MembershipCap { node: i, cap });
            }
        }
        self.add(i, clus, weight);
        Ok(())
    }

    /// Remove node `i` from cluster `clus`.
    ///
    /// Panics if `i` is not a member of `clus`.
    pub fn remove(&mut self, i: usize, clus: ClusterId) {
        let weight = self.clustering[i].remove(clus);
        self.release(clus, weight);
    }

    /// Remove all memberships of node `i`
    pub fn clear_node(&mut self, i: usize) {
        let old = std::mem::take(&mut self.clustering[i]);
        for item in &old {
            self.release(item.clus, item.weight);
        }
    }

    /// Replace the memberships of node `i`.
    ///
    /// Panics if `memberships` is unsorted, names a cluster out of range, or
    /// holds a weight that is not finite and strictly positive.
    pub fn set(&mut self, i: usize, memberships: &SparseVector) {
        assert!(memberships.is_sorted(), "memberships are not sorted: {}", memberships);
        for item in memberships {
            self.assert_cluster(item.clus);
            assert_weight(i, item.clus, item.weight);
        }

        self.clear_node(i);
        for item in memberships {
            self.cluster_size[item.clus as usize] += 1;
            self.cluster_weight[item.clus as usize] += item.weight;
        }
        self.clustering[i].clone_from(memberships);
    }

    /// Remove every membership of every node
    pub fn clear(&mut self) {
        self.cluster_size.iter_mut().for_each(|size| *size = 0);
        self.cluster_weight.iter_mut().for_each(|weight| *weight = 0.0);
        for memberships in &mut self.clustering {
            memberships.clear();
        }
    }

    /// Recompute the aggregates from scratch and compare with the stored ones.
    ///
    /// Returns the first cluster whose size differs, or whose weight differs
    /// by more than `tolerance`.
    pub fn check_aggregates(&self, tolerance: f64) -> std::result::Result<(), ClusterId> {
        let mut size = vec![0usize; self.max_num_clus()];
        let mut weight = vec![0.0; self.max_num_clus()];
        for memberships in &self.clustering {
            for item in memberships {
                size[item.clus as usize] += 1;
            }
            memberships.accumulate_into(&mut weight);
        }

        for k in 0..self.max_num_clus() {
            if size[k] != self.cluster_size[k]
                || (weight[k] - self.cluster_weight[k]).abs() > tolerance
            {
                return Err(k as ClusterId);
            }
        }
        Ok(())
    }

    /// Export as a matrix with one column per node and one row per non-empty
    /// cluster.
    ///
    /// Clusters are renumbered contiguously in the order they are first
    /// encountered while scanning nodes.
    pub fn to_sparse_matrix(&self) -> SparseMatrix {
        // Discover non-empty clusters and count memberships
        let mut clus_id: Vec<Option<u32>> = vec![None; self.max_num_clus()];
        let mut num_clus = 0u32;
        let mut num_inclus = 0;
        for memberships in &self.clustering {
            for item in memberships {
                if clus_id[item.clus as usize].is_none() {
                    clus_id[item.clus as usize] = Some(num_clus);
                    num_clus += 1;
                }
                num_inclus += 1;
            }
        }

        // Fill; rows are clusters, columns are nodes
        let mut out = SparseMatrix::with_capacity(num_clus as usize, self.size(), num_inclus);
        let mut k = 0;
        *out.cidx_mut(0) = 0;
        for (j, memberships) in self.clustering.iter().enumerate() {
            for item in memberships {
                *out.ridx_mut(k) = clus_id[item.clus as usize]
                    .expect("cluster discovered in first pass");
                *out.data_mut(k) = item.weight;
                k += 1;
            }
            *out.cidx_mut(j + 1) = to_index(k);
        }
        out
    }

    fn release(&mut self, clus: ClusterId, weight: f64) {
        let k = clus as usize;
        self.cluster_size[k] -= 1;
        if self.cluster_size[k] == 0 {
            self.cluster_weight[k] = 0.0;
        } else {
            self.cluster_weight[k] -= weight;
        }
    }

    #[inline]
    fn assert_cluster(&self, clus: ClusterId) {
        assert!(
            (clus as usize) < self.max_num_clus(),
            "cluster {} out of range (max {})",
            clus,
            self.max_num_clus()
        );
    }
}

#[inline]
fn is_valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}

#[inline]
fn assert_weight(i: usize, clus: ClusterId, weight: f64) {
    assert!(
        is_valid_weight(weight),
        "invalid weight {} for node {} in cluster {}",
        weight,
        i,
        clus
    );
}

impl Index<usize> for Clustering {
    type Output = SparseVector;

    fn index(&self, i: usize) -> &SparseVector {
        &self.clustering[i]
    }
}

impl<'a> IntoIterator for &'a Clustering {
    type Item = &'a SparseVector;
    type IntoIter = std::slice::Iter<'a, SparseVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.clustering.iter()
    }
}

impl fmt::Display for Clustering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sparse_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::SparseItem;

    #[test]
    fn new_starts_empty() {
        let c = Clustering::new(4, 3).unwrap();
        assert_eq!(c.size(), 4);
        assert_eq!(c.max_num_clus(), 3);
        assert_eq!(c.nnz(), 0);
        assert_eq!(c.total_size(), 12);
        assert_eq!(c.number_of_zeros(), 12);
        assert_eq!(c.first_empty_cluster(), Some(0));
        assert!(c.iter().all(SparseVector::is_empty));
    }

    #[test]
    fn new_rejects_zero_cluster_slots() {
        assert!(matches!(
            Clustering::new(3, 0),
            Err(ClusterError::InvalidBounds { .. })
        ));
        assert!(Clustering::new(0, 0).is_ok());
    }

    #[test]
    fn add_updates_aggregates() {
        let mut c = Clustering::new(3, 3).unwrap();
        c.add(0, 0, 1.0);
        c.add(1, 0, 1.0);
        c.add(2, 0, 1.0);
        assert_eq!(c.clus_size(0), 3);
        assert_eq!(c.clus_weight(0), 3.0);
        assert_eq!(c.nnz(), 3);
        assert_eq!(c.num_nonempty_clusters(), 1);
        assert_eq!(c.first_empty_cluster(), Some(1));
    }

    #[test]
    fn remove_restores_aggregates() {
        let mut c = Clustering::new(2, 2).unwrap();
        c.add(0, 1, 0.5);
        c.remove(0, 1);
        assert_eq!(c.clus_weight(1), 0.0);
        assert_eq!(c.clus_size(1), 0);
        assert!(c[0].is_empty());
    }

    #[test]
    #[should_panic]
    fn duplicate_add_panics() {
        let mut c = Clustering::new(1, 2).unwrap();
        c.add(0, 1, 0.5);
        c.add(0, 1, 0.5);
    }

    #[test]
    #[should_panic]
    fn missing_remove_panics() {
        let mut c = Clustering::new(1, 2).unwrap();
        c.remove(0, 1);
    }

    #[test]
    fn try_add_enforces_cap() {
        let mut c = Clustering::new(1, 3).unwrap();
        c.try_add(0, 0, 1.0, Some(1)).unwrap();
        assert_eq!(
            c.try_add(0, 1, 1.0, Some(1)),
            Err(ClusterError::MembershipCap { node: 0, cap: 1 })
        );
        assert_eq!(
            c.try_add(0, 0, 1.0, None),
            Err(ClusterError::DuplicateMembership { node: 0, clus: 0 })
        );
        assert!(matches!(
            c.try_add(0, 7, 1.0, None),
            Err(ClusterError::ClusterOutOfRange { clus: 7, .. })
        ));
        assert_eq!(c.nnz(), 1);
        assert_eq!(c.clus_size(1), 0);
    }

    #[test]
    fn try_add_rejects_non_positive_weights() {
        let mut c = Clustering::new(1, 3).unwrap();
        for weight in [0.0, -1.0, f64::INFINITY] {
            assert_eq!(
                c.try_add(0, 1, weight, None),
                Err(ClusterError::InvalidWeight { node: 0, clus: 1, weight })
            );
        }
        assert!(matches!(
            c.try_add(0, 1, f64::NAN, None),
            Err(ClusterError::InvalidWeight { node: 0, clus: 1, .. })
        ));
        assert_eq!(c.nnz(), 0);
        assert_eq!(c.clus_size(1), 0);
        assert_eq!(c.clus_weight(1), 0.0);
    }

    #[test]
    #[should_panic(expected = "invalid weight")]
    fn zero_weight_add_panics() {
        let mut c = Clustering::new(1, 2).unwrap();
        c.add(0, 0, 0.0);
    }

    #[test]
    #[should_panic(expected = "invalid weight")]
    fn nan_weight_add_panics() {
        let mut c = Clustering::new(2, 2).unwrap();
        c.add(1, 1, f64::NAN);
    }

    #[test]
    #[should_panic(expected = "invalid weight")]
    fn zero_weight_set_panics() {
        let mut c = Clustering::new(1, 2).unwrap();
        c.set(0, &SparseVector::from_sorted(vec![SparseItem::new(0, 1.0), SparseItem::new(1, 0.0)]));
    }

    #[test]
    fn rejected_set_leaves_node_untouched() {
        let mut c = Clustering::singletons(2).unwrap();
        let bad = SparseVector::from_sorted(vec![SparseItem::new(1, f64::NAN)]);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| c.set(0, &bad)));
        assert!(result.is_err());
        assert_eq!(c[0].get(0), 1.0);
        assert!(c.check_aggregates(1e-12).is_ok());
    }

    #[test]
    fn set_replaces_memberships() {
        let mut c = Clustering::new(2, 3).unwrap();
        c.add(0, 0, 1.0);
        c.add(1, 0, 2.0);
        let v = SparseVector::from_sorted(vec![SparseItem::new(1, 0.5), SparseItem::new(2, 1.5)]);
        c.set(0, &v);
        assert_eq!(c[0], v);
        assert_eq!(c.clus_size(0), 1);
        assert_eq!(c.clus_weight(0), 2.0);
        assert_eq!(c.clus_size(2), 1);
        assert_eq!(c.clus_weight(2), 1.5);

        let once = c.clone();
        c.set(0, &v);
        assert_eq!(c, once);
        assert!(c.check_aggregates(1e-12).is_ok());
    }

    #[test]
    fn clear_node_and_clear() {
        let mut c = Clustering::singletons(3).unwrap();
        c.add(0, 1, 0.5);
        c.clear_node(0);
        assert!(c[0].is_empty());
        assert_eq!(c.clus_size(0), 0);
        assert_eq!(c.clus_size(1), 1);
        assert_eq!(c.clus_weight(1), 1.0);

        c.clear();
        assert_eq!(c.nnz(), 0);
        assert!((0..3).all(|k| c.clus_size(k) == 0 && c.clus_weight(k) == 0.0));
    }

    #[test]
    fn export_renumbers_in_first_encounter_order() {
        let mut c = Clustering::new(2, 2).unwrap();
        c.add(0, 1, 2.0);
        c.add(1, 0, 3.0);
        let m = c.to_sparse_matrix();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.column(0).collect::<Vec<_>>(), vec![(0, 2.0)]);
        assert_eq!(m.column(1).collect::<Vec<_>>(), vec![(1, 3.0)]);
        assert_eq!(m.total_weight(), 5.0);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn export_skips_empty_clusters() {
        let mut c = Clustering::new(3, 10).unwrap();
        c.add(0, 7, 1.0);
        c.add(2, 7, 1.0);
        c.add(2, 3, 0.5);
        let m = c.to_sparse_matrix();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.col_degree(1), 0);
        // Node 2 stores cluster 3 before cluster 7
        assert_eq!(m.column(2).collect::<Vec<_>>(), vec![(1, 0.5), (0, 1.0)]);
    }

    #[test]
    fn export_is_independent_copy() {
        let mut c = Clustering::singletons(2).unwrap();
        let mut m = c.to_sparse_matrix();
        *m.data_mut(0) = 9.0;
        assert_eq!(c.clus_weight(0), 1.0);
        c.remove(0, 0);
        assert_eq!(m.data(0), 9.0);
    }
}
