//! Objective functions scored by the optimizer

use statrs::distribution::{Discrete, Poisson};

use crate::cluster::{Clustering, SparseVector};
use crate::config::{ObjectiveParams, SupportPrior};
use crate::error::{ClusterError, Result};
use crate::matrix::SparseMatrix;

/// Floor for the reconstructed edge weight inside the logarithm
pub const LOG_FLOOR: f64 = 1e-6;

/// A loss to be minimized by local search.
///
/// `node_loss` must differ from `total_loss` only by terms that do not depend
/// on the memberships of `node`, so that comparing two candidates for the
/// same node compares the total loss.
pub trait Objective {
    /// Loss terms involving `node` if its memberships were `candidate`,
    /// all other nodes unchanged.
    fn node_loss(
        &self,
        graph: &SparseMatrix,
        clustering: &Clustering,
        node: usize,
        candidate: &SparseVector,
    ) -> f64;

    fn total_loss(&self, graph: &SparseMatrix, clustering: &Clustering) -> f64;
}

/// Poisson likelihood of the graph under `A ≈ C Cᵀ`, plus a squared-weight
/// regularizer and a prior on the number of clusters per node.
///
/// ```text
/// L(C) = Σ_ij <c_i,c_j> − Σ_(i,j)∈A A_ij ln <c_i,c_j>
///      + β Σ_i ‖c_i‖² + Σ_i prior(|c_i|)
/// ```
///
/// The first sum equals `‖W‖²` with `W` the cluster weights, so a node's
/// share of it only needs the aggregates. The graph is assumed symmetric.
#[derive(Debug, Clone)]
pub struct NmfObjective {
    params: ObjectiveParams,
    poisson: Option<Poisson>,
}

impl NmfObjective {
    pub fn new(params: ObjectiveParams) -> Result<Self> {
        let poisson = match params.support_prior {
            SupportPrior::One => None,
            SupportPrior::Poisson => Some(Poisson::new(params.support_lambda).map_err(|e| {
                ClusterError::InvalidParameter {
                    name: "support_lambda",
                    reason: e.to_string(),
                }
            })?),
        };
        Ok(Self { params, poisson })
    }

    pub fn params(&self) -> &ObjectiveParams {
        &self.params
    }

    /// Negative log prior of a node belonging to `support` clusters
    pub fn support_penalty(&self, support: usize) -> f64 {
        match &self.poisson {
            None => 0.0,
            Some(poisson) => -poisson.ln_pmf(support as u64),
        }
    }
}

impl Objective for NmfObjective {
    fn node_loss(
        &self,
        graph: &SparseMatrix,
        clustering: &Clustering,
        node: usize,
        candidate: &SparseVector,
    ) -> f64 {
        let current = &clustering[node];

        // 2<c, W without this node> + <c, c>
        let mut loss: f64 = candidate
            .iter()
            .map(|item| 2.0 * item.weight * (clustering.clus_weight(item.clus) - current.get(item.clus)))
            .sum();
        let sumsq = candidate.sum_of_squares();
        loss += sumsq * (1.0 + self.params.weight_beta);

        for (j, a) in graph.column(node) {
            if j == node {
                loss -= a * sumsq.max(LOG_FLOOR).ln();
            } else {
                loss -= 2.0 * a * candidate.dot(&clustering[j]).max(LOG_FLOOR).ln();
            }
        }

        loss + self.support_penalty(candidate.nnz())
    }

    fn total_loss(&self, graph: &SparseMatrix, clustering: &Clustering) -> f64 {
        let mut loss: f64 = (0..clustering.max_num_clus())
            .map(|k| clustering.clus_weight(k as u32).powi(2))
            .sum();

        for j in 0..graph.cols() {
            for (i, a) in graph.column(j) {
                loss -= a * clustering[i].dot(&clustering[j]).max(LOG_FLOOR).ln();
            }
        }

        for memberships in clustering {
            loss += self.params.weight_beta * memberships.sum_of_squares();
            loss += self.support_penalty(memberships.nnz());
        }
        loss
    }
}
