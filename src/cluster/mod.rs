//! Soft clustering: membership vectors, clustering state and local search

pub mod sparse_vector;
pub mod clustering;
pub mod objective;
pub mod optimizer;
pub mod metrics;

pub use clustering::Clustering;
pub use objective::{NmfObjective, Objective};
pub use optimizer::{NmfOptimizer, OptimizeSummary};
pub use sparse_vector::{SparseItem, SparseVector};

/// Index of a cluster slot
pub type ClusterId = u32;
