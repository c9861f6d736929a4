//! Cluster statistics and metrics

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::matrix::{algorithms, SparseMatrix};

/// Number of highest-weight members reported per cluster
const TOP_MEMBERS: usize = 5;

/// Summary of one exported cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Row of the cluster in the exported matrix
    pub id: u32,

    /// Number of member nodes
    pub size: usize,

    /// Sum of membership weights
    pub weight: f64,

    /// Density: edges among members / potential edges
    pub density: f64,

    /// Members with the highest weight, heaviest first
    pub top_members: Vec<u32>,
}

/// Summarize every row of an exported clustering (rows = clusters, columns = nodes),
/// largest clusters first.
pub fn summarize_clusters(graph: &SparseMatrix, exported: &SparseMatrix) -> Vec<ClusterSummary> {
    // Columns of the transpose are clusters
    let by_cluster = algorithms::transpose(exported);

    let mut summaries: Vec<ClusterSummary> = (0..by_cluster.cols())
        .map(|k| {
            let mut members: Vec<(u32, f64)> = by_cluster
                .column(k)
                .map(|(node, weight)| (node as u32, weight))
                .collect();
            let nodes: Vec<u32> = members.iter().map(|&(node, _)| node).collect();

            members.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

            ClusterSummary {
                id: k as u32,
                size: members.len(),
                weight: members.iter().map(|&(_, weight)| weight).sum(),
                density: calculate_density(graph, &nodes),
                top_members: members
                    .iter()
                    .take(TOP_MEMBERS)
                    .map(|&(node, _)| node)
                    .collect(),
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.size.cmp(&a.size).then(a.id.cmp(&b.id)));
    summaries
}

/// Calculate density (stored edges between distinct members / potential edges)
pub fn calculate_density(graph: &SparseMatrix, members: &[u32]) -> f64 {
    let n = members.len();
    if n <= 1 {
        return 1.0; // By convention, singleton clusters have density 1
    }

    let potential_edges = n * (n - 1);
    let member_set: HashSet<u32> = members.iter().copied().collect();

    let actual_edges = members
        .iter()
        .map(|&src| {
            graph
                .column(src as usize)
                .filter(|&(dst, _)| dst as u32 != src && member_set.contains(&(dst as u32)))
                .count()
        })
        .sum::<usize>();

    actual_edges as f64 / potential_edges as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Clustering;

    #[test]
    fn density_of_full_and_empty_groups() {
        let triangle = SparseMatrix::from_dense(3, 3, &[0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(calculate_density(&triangle, &[0, 1, 2]), 1.0);
        assert_eq!(calculate_density(&triangle, &[2]), 1.0);

        let identity = SparseMatrix::from_dense(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(calculate_density(&identity, &[0, 1, 2]), 0.0);
    }

    #[test]
    fn summaries_are_sorted_by_size() {
        let graph = SparseMatrix::from_dense(3, 3, &[1.0; 9]);
        let mut clustering = Clustering::new(3, 3).unwrap();
        clustering.add(0, 2, 0.5);
        clustering.add(1, 1, 1.0);
        clustering.add(2, 1, 3.0);

        let summaries = summarize_clusters(&graph, &clustering.to_sparse_matrix());
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, 1);
        assert_eq!(summaries[0].size, 2);
        assert_eq!(summaries[0].weight, 4.0);
        assert_eq!(summaries[0].top_members, vec![2, 1]);
        assert_eq!(summaries[0].density, 1.0);
        assert_eq!(summaries[1].top_members, vec![0]);
    }
}
