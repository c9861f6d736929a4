//! Compressed sparse column storage

use std::fmt;
use std::iter::FusedIterator;
use std::mem;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Compressed sparse column matrix.
///
/// Column `j` owns the entries `col_offsets[j]..col_offsets[j + 1]` of the
/// parallel `row_index` and `values` arrays. Rows inside a column are kept in
/// whatever order they were written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    num_rows: usize,
    num_cols: usize,

    /// Offset array: `col_offsets[j]` to `col_offsets[j+1]` is the entry range of column `j`
    col_offsets: Vec<u32>,

    /// Row of every stored entry
    row_index: Vec<u32>,

    /// Value of every stored entry
    values: Vec<f64>,
}

/// Narrow a row index or offset to the stored 32-bit width.
///
/// Panics instead of truncating.
#[inline]
pub(crate) fn to_index(value: usize) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic!("{} does not fit a 32-bit sparse index", value))
}

impl Default for SparseMatrix {
    fn default() -> Self {
        Self::with_capacity(0, 0, 0)
    }
}

impl SparseMatrix {
    /// Allocate a matrix with `nnz` zero-filled entries, to be filled through
    /// `cidx_mut`, `ridx_mut` and `data_mut`.
    ///
    /// Panics if `nnz` does not fit the 32-bit offset array.
    pub fn with_capacity(num_rows: usize, num_cols: usize, nnz: usize) -> Self {
        to_index(nnz);
        Self {
            num_rows,
            num_cols,
            col_offsets: vec![0; num_cols + 1],
            row_index: vec![0; nnz],
            values: vec![0.0; nnz],
        }
    }

    /// Assemble a matrix from raw CSC arrays, checking the offset invariant.
    pub fn from_parts(
        num_rows: usize,
        num_cols: usize,
        col_offsets: Vec<u32>,
        row_index: Vec<u32>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let matrix = Self {
            num_rows,
            num_cols,
            col_offsets,
            row_index,
            values,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Build from a row-major dense buffer, skipping exact zeros.
    ///
    /// Panics if `values.len() != rows * cols`.
    pub fn from_dense(rows: usize, cols: usize, values: &[f64]) -> Self {
        assert_eq!(values.len(), rows * cols, "dense buffer does not match {}x{}", rows, cols);

        let mut col_offsets = Vec::with_capacity(cols + 1);
        let mut row_index = Vec::new();
        let mut data = Vec::new();

        col_offsets.push(0);
        for j in 0..cols {
            for i in 0..rows {
                let value = values[i * cols + j];
                if value != 0.0 {
                    row_index.push(to_index(i));
                    data.push(value);
                }
            }
            col_offsets.push(to_index(row_index.len()));
        }

        Self {
            num_rows: rows,
            num_cols: cols,
            col_offsets,
            row_index,
            values: data,
        }
    }

    /// Build from a dense `ndarray` view, skipping exact zeros.
    pub fn from_array(array: ArrayView2<f64>) -> Self {
        let (rows, cols) = array.dim();
        let mut col_offsets = Vec::with_capacity(cols + 1);
        let mut row_index = Vec::new();
        let mut data = Vec::new();

        col_offsets.push(0);
        for (j, column) in array.columns().into_iter().enumerate() {
            for (i, &value) in column.iter().enumerate() {
                if value != 0.0 {
                    row_index.push(to_index(i));
                    data.push(value);
                }
            }
            debug_assert_eq!(col_offsets.len(), j + 1);
            col_offsets.push(to_index(row_index.len()));
        }

        Self {
            num_rows: rows,
            num_cols: cols,
            col_offsets,
            row_index,
            values: data,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.num_cols
    }

    /// Number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn cidx(&self, j: usize) -> usize {
        self.col_offsets[j] as usize
    }

    #[inline]
    pub fn cidx_mut(&mut self, j: usize) -> &mut u32 {
        &mut self.col_offsets[j]
    }

    #[inline]
    pub fn ridx(&self, k: usize) -> usize {
        self.row_index[k] as usize
    }

    #[inline]
    pub fn ridx_mut(&mut self, k: usize) -> &mut u32 {
        &mut self.row_index[k]
    }

    #[inline]
    pub fn data(&self, k: usize) -> f64 {
        self.values[k]
    }

    #[inline]
    pub fn data_mut(&mut self, k: usize) -> &mut f64 {
        &mut self.values[k]
    }

    /// Number of stored entries in column `j`
    pub fn col_degree(&self, j: usize) -> usize {
        let (start, end) = self.column_range(j);
        end - start
    }

    /// Iterate the `(row, value)` entries of column `j` in stored order.
    pub fn column(&self, j: usize) -> ColumnIter<'_> {
        let (start, end) = self.column_range(j);
        ColumnIter {
            rows: &self.row_index[start..end],
            values: &self.values[start..end],
            pos: 0,
        }
    }

    /// Value at `(row, col)`, 0 if not stored. Scans the column.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.column(col)
            .filter(|&(i, _)| i == row)
            .map(|(_, value)| value)
            .sum()
    }

    /// Sum of all stored values
    pub fn total_weight(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Check the column-offset invariant and that every row index is in range.
    pub fn validate(&self) -> Result<()> {
        if self.col_offsets.len() != self.num_cols + 1 {
            return Err(ClusterError::MalformedMatrix(format!(
                "offset array has length {}, expected {}",
                self.col_offsets.len(),
                self.num_cols + 1
            )));
        }
        if self.row_index.len() != self.values.len() {
            return Err(ClusterError::MalformedMatrix(format!(
                "{} row indices but {} values",
                self.row_index.len(),
                self.values.len()
            )));
        }
        if self.col_offsets[0] != 0 {
            return Err(ClusterError::MalformedMatrix("first offset is not 0".to_string()));
        }
        if self.col_offsets[self.num_cols] as usize != self.values.len() {
            return Err(ClusterError::MalformedMatrix(format!(
                "last offset is {}, expected nnz {}",
                self.col_offsets[self.num_cols],
                self.values.len()
            )));
        }
        if let Some(j) = self.col_offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(ClusterError::MalformedMatrix(format!(
                "offsets decrease at column {}",
                j
            )));
        }
        if let Some(&row) = self.row_index.iter().find(|&&r| r as usize >= self.num_rows) {
            return Err(ClusterError::MalformedMatrix(format!(
                "row index {} out of range for {} rows",
                row, self.num_rows
            )));
        }
        Ok(())
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = self.col_offsets.capacity() * mem::size_of::<u32>();
        let rows = self.row_index.capacity() * mem::size_of::<u32>();
        let values = self.values.capacity() * mem::size_of::<f64>();

        base + offsets + rows + values
    }

    fn column_range(&self, j: usize) -> (usize, usize) {
        let start = self.col_offsets[j] as usize;
        let end = self.col_offsets[j + 1] as usize;
        assert!(
            start <= end && end <= self.values.len(),
            "malformed offsets for column {}: {}..{} with nnz {}",
            j,
            start,
            end,
            self.values.len()
        );
        (start, end)
    }
}

/// Iterator over the `(row, value)` entries of one column.
///
/// Call [`SparseMatrix::column`] again to walk the column from the top.
#[derive(Debug, Clone)]
pub struct ColumnIter<'a> {
    rows: &'a [u32],
    values: &'a [f64],
    pos: usize,
}

impl<'a> Iterator for ColumnIter<'a> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.rows.len() {
            return None;
        }
        let item = (self.rows[self.pos] as usize, self.values[self.pos]);
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ColumnIter<'_> {}

impl FusedIterator for ColumnIter<'_> {}

impl fmt::Display for SparseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for j in 0..self.cols() {
            for (i, value) in self.column(j) {
                writeln!(f, "({},{}) -> {}", i, j, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn to_index_keeps_values_in_range() {
        assert_eq!(to_index(0), 0);
        assert_eq!(to_index(u32::MAX as usize), u32::MAX);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "does not fit a 32-bit sparse index")]
    fn to_index_panics_instead_of_truncating() {
        to_index(u32::MAX as usize + 1);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "does not fit a 32-bit sparse index")]
    fn with_capacity_rejects_oversized_nnz() {
        SparseMatrix::with_capacity(1, 1, u32::MAX as usize + 1);
    }

    #[test]
    fn from_dense_skips_zeros() {
        let m = SparseMatrix::from_dense(2, 3, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.column(0).collect::<Vec<_>>(), vec![(0, 1.0)]);
        assert_eq!(m.column(1).collect::<Vec<_>>(), vec![(1, 3.0)]);
        assert_eq!(m.column(2).collect::<Vec<_>>(), vec![(0, 2.0)]);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn from_array_matches_from_dense() {
        let a = array![[0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
        let dense = SparseMatrix::from_dense(3, 3, &[0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(SparseMatrix::from_array(a.view()), dense);
    }

    #[test]
    fn column_iteration_is_restartable() {
        let m = SparseMatrix::from_dense(3, 3, &[1.0; 9]);
        let first: Vec<_> = m.column(1).collect();
        let second: Vec<_> = m.column(1).collect();
        assert_eq!(first, second);
        assert_eq!(m.column(1).len(), 3);
        assert_eq!(m.col_degree(1), 3);
    }

    #[test]
    fn get_reads_stored_and_missing_entries() {
        let m = SparseMatrix::from_dense(2, 2, &[0.0, 4.0, 5.0, 0.0]);
        assert_eq!(m.get(0, 1), 4.0);
        assert_eq!(m.get(1, 0), 5.0);
        assert_eq!(m.get(0, 0), 0.0);
        assert_eq!(m.total_weight(), 9.0);
    }

    #[test]
    fn validate_rejects_bad_offsets() {
        let err = SparseMatrix::from_parts(2, 2, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]);
        assert!(matches!(err, Err(ClusterError::MalformedMatrix(_))));

        let err = SparseMatrix::from_parts(2, 1, vec![1, 2], vec![0, 1], vec![1.0, 1.0]);
        assert!(matches!(err, Err(ClusterError::MalformedMatrix(_))));

        let err = SparseMatrix::from_parts(2, 1, vec![0, 1], vec![5], vec![1.0]);
        assert!(matches!(err, Err(ClusterError::MalformedMatrix(_))));
    }

    #[test]
    fn bulk_construction_through_accessors() {
        let mut m = SparseMatrix::with_capacity(2, 2, 2);
        *m.cidx_mut(0) = 0;
        *m.ridx_mut(0) = 1;
        *m.data_mut(0) = 0.5;
        *m.cidx_mut(1) = 1;
        *m.ridx_mut(1) = 0;
        *m.data_mut(1) = 1.5;
        *m.cidx_mut(2) = 2;
        assert!(m.validate().is_ok());
        assert_eq!(m.get(1, 0), 0.5);
        assert_eq!(m.get(0, 1), 1.5);
        assert_eq!(m.cidx(2), 2);
        assert_eq!(m.ridx(1), 0);
        assert_eq!(m.data(1), 1.5);
    }

    #[test]
    fn display_lists_entries_in_column_order() {
        let m = SparseMatrix::from_dense(2, 2, &[0.0, 2.0, 1.0, 0.0]);
        assert_eq!(m.to_string(), "(1,0) -> 1\n(0,1) -> 2\n");
    }

    #[test]
    #[should_panic]
    fn from_dense_rejects_short_buffer() {
        SparseMatrix::from_dense(2, 2, &[1.0, 2.0, 3.0]);
    }
}
