//! Sorted sparse membership vectors
//!
//! A [`SparseVector`] holds the `(cluster, weight)` memberships of one node,
//! strictly increasing by cluster id. Keeping the entries sorted makes lookups
//! a binary search and lets [`dot`] run as a merge join over two vectors.
//! Bulk loads may [`SparseVector::push`] out of order, but must
//! [`SparseVector::sort`] before any query.

use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterId;

/// One membership: a cluster id and its weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparseItem {
    pub clus: ClusterId,
    pub weight: f64,
}

impl SparseItem {
    pub fn new(clus: ClusterId, weight: f64) -> Self {
        Self { clus, weight }
    }
}

/// Sparse vector of memberships, sorted by cluster id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparseVector {
    items: Vec<SparseItem>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Wrap items that are already strictly increasing by cluster id.
    ///
    /// Panics if they are not.
    pub fn from_sorted(items: Vec<SparseItem>) -> Self {
        assert!(is_strictly_sorted(&items), "items are not strictly sorted by cluster");
        Self { items }
    }

    /// Weight of cluster `k`, 0 if absent
    pub fn get(&self, k: ClusterId) -> f64 {
        self.assert_sorted();
        match self.find(k) {
            Ok(pos) => self.items[pos].weight,
            Err(_) => 0.0,
        }
    }

    pub fn contains(&self, k: ClusterId) -> bool {
        self.assert_sorted();
        self.find(k).is_ok()
    }

    /// Insert a new membership, keeping the order.
    ///
    /// Panics if `k` is already present; remove it first to overwrite.
    pub fn insert(&mut self, k: ClusterId, weight: f64) {
        self.assert_sorted();
        match self.find(k) {
            Ok(_) => panic!("cluster {} is already in the vector", k),
            Err(pos) => self.items.insert(pos, SparseItem::new(k, weight)),
        }
    }

    /// Remove membership `k`, returning its weight.
    ///
    /// Panics if `k` is absent.
    pub fn remove(&mut self, k: ClusterId) -> f64 {
        self.assert_sorted();
        match self.find(k) {
            Ok(pos) => self.items.remove(pos).weight,
            Err(_) => panic!("cluster {} is not in the vector", k),
        }
    }

    /// Append without keeping the order; call [`sort`](Self::sort) before querying.
    pub fn push(&mut self, k: ClusterId, weight: f64) {
        self.items.push(SparseItem::new(k, weight));
    }

    pub fn pop(&mut self) -> Option<SparseItem> {
        self.items.pop()
    }

    pub fn last(&self) -> Option<&SparseItem> {
        self.items.last()
    }

    /// Restore the order after unsorted appends
    pub fn sort(&mut self) {
        self.items.sort_by_key(|item| item.clus);
        debug_assert!(
            is_strictly_sorted(&self.items),
            "duplicate cluster ids after sort: {}",
            self
        );
    }

    pub fn is_sorted(&self) -> bool {
        is_strictly_sorted(&self.items)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of stored memberships
    pub fn nnz(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SparseItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[SparseItem] {
        &self.items
    }

    /// Cluster ids in order
    pub fn clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.items.iter().map(|item| item.clus)
    }

    /// Sum of all weights
    pub fn weight_sum(&self) -> f64 {
        self.items.iter().map(|item| item.weight).sum()
    }

    pub fn sum_of_squares(&self) -> f64 {
        sum_of_squares(&self.items)
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        dot(&self.items, &other.items)
    }

    pub fn accumulate_into(&self, dense: &mut [f64]) {
        accumulate_into(dense, &self.items);
    }

    fn find(&self, k: ClusterId) -> Result<usize, usize> {
        self.items.binary_search_by(|item| item.clus.cmp(&k))
    }

    #[inline]
    fn assert_sorted(&self) {
        debug_assert!(is_strictly_sorted(&self.items), "sparse vector is not sorted: {}", self);
    }
}

impl FromIterator<SparseItem> for SparseVector {
    /// Collect items in any order; the result is sorted.
    fn from_iter<I: IntoIterator<Item = SparseItem>>(iter: I) -> Self {
        let mut vector = Self {
            items: iter.into_iter().collect(),
        };
        vector.sort();
        vector
    }
}

impl<'a> IntoIterator for &'a SparseVector {
    type Item = &'a SparseItem;
    type IntoIter = std::slice::Iter<'a, SparseItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.items
                .iter()
                .map(|item| format!("{}:{}", item.clus, item.weight))
                .join(", ")
        )
    }
}

fn is_strictly_sorted(items: &[SparseItem]) -> bool {
    items.windows(2).all(|w| w[0].clus < w[1].clus)
}

/// Dot product of two sorted item sequences, as a merge join
pub fn dot(x: &[SparseItem], y: &[SparseItem]) -> f64 {
    let mut sum = 0.0;
    let (mut a, mut b) = (0, 0);
    while a < x.len() && b < y.len() {
        match x[a].clus.cmp(&y[b].clus) {
            Ordering::Less => a += 1,
            Ordering::Greater => b += 1,
            Ordering::Equal => {
                sum += x[a].weight * y[b].weight;
                a += 1;
                b += 1;
            }
        }
    }
    sum
}

pub fn sum_of_squares(x: &[SparseItem]) -> f64 {
    x.iter().map(|item| item.weight * item.weight).sum()
}

/// Add every weight into `dense[cluster]`
pub fn accumulate_into(dense: &mut [f64], x: &[SparseItem]) {
    for item in x {
        dense[item.clus as usize] += item.weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(ClusterId, f64)]) -> SparseVector {
        pairs.iter().map(|&(k, w)| SparseItem::new(k, w)).collect()
    }

    #[test]
    fn insert_keeps_order() {
        let mut v = SparseVector::new();
        v.insert(5, 1.0);
        v.insert(1, 2.0);
        v.insert(3, 0.5);
        assert_eq!(v.clusters().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert!(v.is_sorted());
        assert_eq!(v.get(3), 0.5);
        assert_eq!(v.get(4), 0.0);
        assert!(v.contains(5));
        assert!(!v.contains(0));
    }

    #[test]
    fn remove_returns_old_weight() {
        let mut v = vector(&[(0, 1.0), (2, 3.0)]);
        assert_eq!(v.remove(2), 3.0);
        assert_eq!(v.nnz(), 1);
        assert!(!v.contains(2));
    }

    #[test]
    #[should_panic(expected = "already in the vector")]
    fn duplicate_insert_panics() {
        let mut v = vector(&[(1, 1.0)]);
        v.insert(1, 2.0);
    }

    #[test]
    #[should_panic(expected = "not in the vector")]
    fn missing_remove_panics() {
        let mut v = vector(&[(1, 1.0)]);
        v.remove(2);
    }

    #[test]
    fn push_then_sort() {
        let mut v = SparseVector::new();
        v.push(4, 1.0);
        v.push(0, 2.0);
        assert!(!v.is_sorted());
        v.sort();
        assert!(v.is_sorted());
        assert_eq!(v.get(0), 2.0);
        assert_eq!(v.last(), Some(&SparseItem::new(4, 1.0)));
        assert_eq!(v.pop(), Some(SparseItem::new(4, 1.0)));
    }

    #[test]
    fn dot_matches_only_shared_clusters() {
        let x = vector(&[(0, 1.0), (2, 2.0), (5, 3.0)]);
        let y = vector(&[(1, 4.0), (2, 0.5), (5, 2.0), (7, 1.0)]);
        assert_eq!(x.dot(&y), 2.0 * 0.5 + 3.0 * 2.0);
        assert_eq!(dot(x.as_slice(), &[]), 0.0);
    }

    #[test]
    fn sum_of_squares_and_weight_sum() {
        let x = vector(&[(0, 1.0), (3, 2.0)]);
        assert_eq!(x.sum_of_squares(), 5.0);
        assert_eq!(x.weight_sum(), 3.0);
    }

    #[test]
    fn accumulate_into_dense() {
        let mut dense = vec![0.0; 4];
        vector(&[(1, 1.0), (3, 2.0)]).accumulate_into(&mut dense);
        vector(&[(3, 0.5)]).accumulate_into(&mut dense);
        assert_eq!(dense, vec![0.0, 1.0, 0.0, 2.5]);
    }

    #[test]
    fn display_lists_pairs() {
        assert_eq!(vector(&[(0, 1.5), (2, 1.0)]).to_string(), "[0:1.5, 2:1]");
        assert_eq!(SparseVector::new().to_string(), "[]");
    }

    #[test]
    #[should_panic]
    fn from_sorted_rejects_unsorted() {
        SparseVector::from_sorted(vec![SparseItem::new(2, 1.0), SparseItem::new(1, 1.0)]);
    }
}
