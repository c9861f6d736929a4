//! Sparse matrix storage and construction

pub mod sparse;
pub mod builder;
pub mod algorithms;

pub use sparse::{ColumnIter, SparseMatrix};
pub use builder::MatrixBuilder;
