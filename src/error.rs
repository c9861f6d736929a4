//! Error types for the clustering core

use thiserror::Error;

use crate::cluster::ClusterId;

/// Errors raised by the clustering core and its configuration.
///
/// Contract violations (duplicate insert, removing a missing membership,
/// querying an unsorted vector, a non-positive weight) are not represented
/// here: they panic. `Clustering::try_add` reports them instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// Clustering bounds that cannot describe a valid state.
    #[error("invalid bounds: {num_node} nodes with {max_num_clus} cluster slots ({reason})")]
    InvalidBounds {
        num_node: usize,
        max_num_clus: usize,
        reason: &'static str,
    },

    #[error("cluster {clus} out of range (max {max_num_clus})")]
    ClusterOutOfRange { clus: ClusterId, max_num_clus: usize },

    /// Adding a membership would exceed the per-node cap.
    #[error("node {node} already belongs to {cap} clusters")]
    MembershipCap { node: usize, cap: usize },

    #[error("node {node} is already a member of cluster {clus}")]
    DuplicateMembership { node: usize, clus: ClusterId },

    /// Membership weights must be finite and strictly positive.
    #[error("invalid weight {weight} for node {node} in cluster {clus}")]
    InvalidWeight { node: usize, clus: ClusterId, weight: f64 },

    #[error("unknown support prior: {0:?} (expected \"one\" or \"poisson\")")]
    UnknownSupportPrior(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The objective evaluated to NaN or infinity.
    #[error("objective is not finite ({value}) after iteration {iteration}")]
    NonFiniteObjective { value: f64, iteration: usize },

    #[error("malformed sparse matrix: {0}")]
    MalformedMatrix(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, ClusterError>;
