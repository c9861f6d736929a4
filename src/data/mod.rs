//! Graph input: edge-list files and built-in fixtures

pub mod loader;
pub mod fixtures;

pub use fixtures::Fixture;
pub use loader::{load_edge_list, LoadedGraph};
