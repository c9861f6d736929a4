//! Incremental construction of adjacency matrices

use std::collections::HashMap;

use crate::matrix::sparse::to_index;
use crate::matrix::SparseMatrix;

/// Builder for incrementally constructing a square adjacency `SparseMatrix`
pub struct MatrixBuilder {
    /// Mapping from string labels to node indices
    label_to_index: HashMap<String, usize>,

    /// Node labels, in index order
    labels: Vec<String>,

    /// Entries of each column as `(row, value)`
    columns: Vec<Vec<(u32, f64)>>,
}

impl MatrixBuilder {
    /// Create a new builder with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            label_to_index: HashMap::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Number of nodes seen so far
    pub fn node_count(&self) -> usize {
        self.columns.len()
    }

    /// Get or create the node index for a label
    pub fn node(&mut self, label: &str) -> usize {
        if let Some(&idx) = self.label_to_index.get(label) {
            return idx;
        }

        let idx = self.columns.len();
        self.label_to_index.insert(label.to_string(), idx);
        self.labels.push(label.to_string());
        self.columns.push(Vec::new());

        idx
    }

    /// Add a weighted edge between two labelled nodes, stored at `(dst, src)`
    pub fn add_edge(&mut self, src: &str, dst: &str, weight: f64) {
        let src_idx = self.node(src);
        let dst_idx = self.node(dst);
        self.add_entry(dst_idx, src_idx, weight);
    }

    /// Add `value` at `(row, col)`, growing the node set to cover both indices.
    ///
    /// Unlabelled nodes created this way are named by their index.
    pub fn add_entry(&mut self, row: usize, col: usize, value: f64) {
        while self.columns.len() <= row.max(col) {
            let idx = self.columns.len();
            let label = idx.to_string();
            self.label_to_index.entry(label.clone()).or_insert(idx);
            self.labels.push(label);
            self.columns.push(Vec::new());
        }

        self.columns[col].push((to_index(row), value));
    }

    /// Labels in node-index order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Build the matrix together with the node labels; rows are sorted within
    /// each column and duplicate entries are summed.
    pub fn build(self) -> (SparseMatrix, Vec<String>) {
        let node_count = self.columns.len();
        let mut col_offsets = Vec::with_capacity(node_count + 1);
        let mut row_index = Vec::new();
        let mut values = Vec::new();

        col_offsets.push(0u32);
        for mut column in self.columns {
            column.sort_unstable_by_key(|&(row, _)| row);
            let mut last_row = None;
            for (row, value) in column {
                if last_row == Some(row) {
                    if let Some(last) = values.last_mut() {
                        *last += value;
                    }
                    continue;
                }
                row_index.push(row);
                values.push(value);
                last_row = Some(row);
            }
            col_offsets.push(to_index(row_index.len()));
        }

        let mut matrix = SparseMatrix::with_capacity(node_count, node_count, values.len());
        for (j, &offset) in col_offsets.iter().enumerate() {
            *matrix.cidx_mut(j) = offset;
        }
        for (k, (row, value)) in row_index.into_iter().zip(values).enumerate() {
            *matrix.ridx_mut(k) = row;
            *matrix.data_mut(k) = value;
        }

        (matrix, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_interned_in_first_seen_order() {
        let mut builder = MatrixBuilder::with_capacity(4);
        builder.add_edge("b", "a", 1.0);
        builder.add_edge("a", "c", 1.0);
        assert_eq!(builder.labels(), &["b", "a", "c"]);
        assert_eq!(builder.node("a"), 1);
        assert_eq!(builder.node_count(), 3);
    }

    #[test]
    fn edges_are_stored_one_way() {
        let mut builder = MatrixBuilder::with_capacity(2);
        builder.add_edge("x", "y", 2.0);
        builder.add_edge("x", "x", 1.0);
        let (m, labels) = builder.build();
        assert_eq!(labels, vec!["x", "y"]);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.get(1, 0), 2.0);
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(0, 0), 1.0);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn duplicate_entries_are_summed_and_rows_sorted() {
        let mut builder = MatrixBuilder::with_capacity(3);
        builder.add_entry(2, 0, 1.0);
        builder.add_entry(1, 0, 1.0);
        builder.add_entry(2, 0, 0.5);
        let (m, labels) = builder.build();
        assert_eq!(labels, vec!["0", "1", "2"]);
        assert_eq!(m.column(0).collect::<Vec<_>>(), vec![(1, 1.0), (2, 1.5)]);
        assert_eq!(m.col_degree(1), 0);
    }
}
