//! Local-search optimizer for soft clusterings

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::cluster::objective::{NmfObjective, Objective};
use crate::cluster::{ClusterId, Clustering, SparseVector};
use crate::config::NmfParams;
use crate::error::{ClusterError, Result};
use crate::matrix::{algorithms, SparseMatrix};

/// Weights tried when a node joins a cluster
const JOIN_WEIGHTS: [f64; 4] = [0.25, 0.5, 1.0, 2.0];

/// Factors tried when re-weighting an existing membership
const REWEIGHT_FACTORS: [f64; 4] = [0.5, 0.8, 1.25, 2.0];

/// Minimum decrease in loss for a move to be accepted
const MIN_IMPROVEMENT: f64 = 1e-10;

/// Outcome of an optimizer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeSummary {
    /// Number of passes over the nodes
    pub iterations: usize,

    /// Accepted moves across all passes
    pub moves: usize,

    /// Final value of the objective
    pub loss: f64,

    /// Non-empty clusters at the end
    pub num_clusters: usize,

    /// Whether the last pass changed nothing
    pub converged: bool,
}

/// Local search over node memberships.
///
/// Each pass visits the nodes in a random order. For every node the
/// optimizer scores a set of candidate membership vectors (leave a cluster,
/// change a weight, join a neighbour's cluster or an empty one, move to a
/// single cluster) and applies the best one if it lowers the loss.
pub struct NmfOptimizer<'a, O: Objective = NmfObjective> {
    graph: &'a SparseMatrix,
    params: NmfParams,
    objective: O,
    clustering: Clustering,
    rng: StdRng,
    loss: f64,
}

impl<'a> NmfOptimizer<'a, NmfObjective> {
    /// Optimizer with the default objective, starting from singleton clusters
    pub fn new(graph: &'a SparseMatrix, params: NmfParams) -> Result<Self> {
        let objective = NmfObjective::new(params.objective.clone())?;
        Self::with_objective(graph, params, objective)
    }
}

impl<'a, O: Objective> NmfOptimizer<'a, O> {
    pub fn with_objective(graph: &'a SparseMatrix, params: NmfParams, objective: O) -> Result<Self> {
        params.validate()?;
        graph.validate()?;
        if graph.rows() != graph.cols() {
            return Err(ClusterError::DimensionMismatch {
                expected: graph.cols(),
                actual: graph.rows(),
            });
        }
        if !algorithms::is_symmetric(graph) {
            log::warn!("Input graph is not symmetric; the objective assumes it is");
        }

        if let Some(cap) = params.max_cluster_per_node {
            log::debug!("Limiting nodes to {} clusters each", cap);
        }

        // Singletons respect any valid cap
        let clustering = Clustering::singletons(graph.cols())?;
        let loss = objective.total_loss(graph, &clustering);
        let rng = StdRng::seed_from_u64(params.seed);

        Ok(Self {
            graph,
            params,
            objective,
            clustering,
            rng,
            loss,
        })
    }

    /// Start from an existing clustering instead of singletons
    pub fn with_clustering(mut self, clustering: Clustering) -> Result<Self> {
        if clustering.size() != self.graph.cols() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.graph.cols(),
                actual: clustering.size(),
            });
        }
        if let Some(cap) = self.params.max_cluster_per_node {
            if let Some(node) = clustering.iter().position(|m| m.nnz() > cap) {
                return Err(ClusterError::MembershipCap { node, cap });
            }
        }
        self.loss = self.objective.total_loss(self.graph, &clustering);
        self.clustering = clustering;
        Ok(self)
    }

    pub fn clustering(&self) -> &Clustering {
        &self.clustering
    }

    pub fn into_clustering(self) -> Clustering {
        self.clustering
    }

    /// Current value of the objective
    pub fn loss(&self) -> f64 {
        self.loss
    }

    pub fn params(&self) -> &NmfParams {
        &self.params
    }

    /// Run passes until one changes nothing or `num_iter` is reached
    pub fn run(&mut self) -> Result<OptimizeSummary> {
        log::info!(
            "Optimizing {} nodes, {} stored edges, initial loss {:.6}",
            self.graph.cols(),
            self.graph.nnz(),
            self.loss
        );
        self.check_finite(0)?;

        let mut order: Vec<usize> = (0..self.graph.cols()).collect();
        let mut moves = 0;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.params.num_iter {
            order.shuffle(&mut self.rng);
            let mut changes = 0;
            for &node in &order {
                if self.optimize_node(node) {
                    changes += 1;
                }
            }
            iterations += 1;
            moves += changes;

            self.loss = self.objective.total_loss(self.graph, &self.clustering);
            self.check_finite(iterations)?;
            log::debug!(
                "Iteration {}: {} moves, loss {:.6}, {} clusters",
                iterations,
                changes,
                self.loss,
                self.clustering.num_nonempty_clusters()
            );

            if changes == 0 {
                converged = true;
                break;
            }
        }

        debug_assert!(self.clustering.check_aggregates(1e-9).is_ok());

        let summary = OptimizeSummary {
            iterations,
            moves,
            loss: self.loss,
            num_clusters: self.clustering.num_nonempty_clusters(),
            converged,
        };
        log::info!(
            "Finished after {} iterations ({} moves): loss {:.6}, {} clusters{}",
            summary.iterations,
            summary.moves,
            summary.loss,
            summary.num_clusters,
            if converged { "" } else { " (iteration limit reached)" }
        );
        Ok(summary)
    }

    /// Apply the best improving move for `node`; returns whether one was found
    pub fn optimize_node(&mut self, node: usize) -> bool {
        let current = self.clustering[node].clone();
        let current_loss = self
            .objective
            .node_loss(self.graph, &self.clustering, node, &current);

        let mut best: Option<(f64, SparseVector)> = None;
        for candidate in self.candidates(node, &current) {
            let loss = self
                .objective
                .node_loss(self.graph, &self.clustering, node, &candidate);
            if best.as_ref().map_or(true, |(best_loss, _)| loss < *best_loss) {
                best = Some((loss, candidate));
            }
        }

        match best {
            Some((loss, candidate)) if loss < current_loss - MIN_IMPROVEMENT => {
                log::trace!(
                    "Node {}: {} -> {} (delta {:.6})",
                    node,
                    current,
                    candidate,
                    loss - current_loss
                );
                self.clustering.set(node, &candidate);
                true
            }
            _ => false,
        }
    }

    fn candidates(&self, node: usize, current: &SparseVector) -> Vec<SparseVector> {
        let mut candidates = Vec::new();

        // Leave a cluster, or change its weight
        for item in current {
            let mut without = current.clone();
            without.remove(item.clus);
            for factor in REWEIGHT_FACTORS {
                let mut reweighted = without.clone();
                reweighted.insert(item.clus, item.weight * factor);
                candidates.push(reweighted);
            }
            candidates.push(without);
        }

        // Join a cluster of a neighbour, or an empty one
        let can_join = self
            .params
            .max_cluster_per_node
            .map_or(true, |cap| current.nnz() < cap);
        for clus in self.neighbour_clusters(node) {
            for weight in JOIN_WEIGHTS {
                if can_join && !current.contains(clus) {
                    let mut joined = current.clone();
                    joined.insert(clus, weight);
                    candidates.push(joined);
                }
                let mut moved = SparseVector::with_capacity(1);
                moved.insert(clus, weight);
                candidates.push(moved);
            }
        }

        candidates
    }

    /// Clusters of the neighbours of `node` plus the first empty cluster, sorted and unique
    fn neighbour_clusters(&self, node: usize) -> Vec<ClusterId> {
        let mut clusters: Vec<ClusterId> = self
            .graph
            .column(node)
            .filter(|&(j, _)| j != node)
            .flat_map(|(j, _)| self.clustering[j].clusters())
            .collect();
        if let Some(empty) = self.clustering.first_empty_cluster() {
            clusters.push(empty);
        }
        clusters.sort_unstable();
        clusters.dedup();
        clusters
    }

    fn check_finite(&self, iteration: usize) -> Result<()> {
        if self.loss.is_finite() {
            Ok(())
        } else {
            Err(ClusterError::NonFiniteObjective {
                value: self.loss,
                iteration,
            })
        }
    }
}
