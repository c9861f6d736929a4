//! Overlapping graph clustering by local search over a sparse
//! non-negative factorization of the adjacency matrix

pub mod config;
pub mod error;
pub mod matrix;
pub mod cluster;
pub mod data;
pub mod storage;

pub use cluster::{ClusterId, Clustering, NmfOptimizer, SparseItem, SparseVector};
pub use config::{NmfParams, ObjectiveParams, SupportPrior};
pub use error::{ClusterError, Result};
pub use matrix::SparseMatrix;
