//! Whole-matrix algorithms

use crate::matrix::sparse::to_index;
use crate::matrix::SparseMatrix;

/// Transpose a matrix with a counting pass followed by a fill pass.
pub fn transpose(matrix: &SparseMatrix) -> SparseMatrix {
    let rows = matrix.rows();
    let cols = matrix.cols();

    // Count entries for each row (= column of the result)
    let mut counts = vec![0u32; rows];
    for j in 0..cols {
        for (i, _) in matrix.column(j) {
            counts[i] += 1;
        }
    }

    let mut out = SparseMatrix::with_capacity(cols, rows, matrix.nnz());
    let mut offset = 0;
    *out.cidx_mut(0) = 0;
    for (i, &count) in counts.iter().enumerate() {
        offset += count;
        *out.cidx_mut(i + 1) = offset;
    }

    // Fill, advancing a cursor per output column
    let mut cursor: Vec<usize> = (0..rows).map(|i| out.cidx(i)).collect();
    for j in 0..cols {
        for (i, value) in matrix.column(j) {
            let pos = cursor[i];
            *out.ridx_mut(pos) = to_index(j);
            *out.data_mut(pos) = value;
            cursor[i] += 1;
        }
    }

    out
}

/// Check whether `A[i][j] == A[j][i]` for every stored entry.
pub fn is_symmetric(matrix: &SparseMatrix) -> bool {
    if matrix.rows() != matrix.cols() {
        return false;
    }
    (0..matrix.cols()).all(|j| matrix.column(j).all(|(i, value)| matrix.get(j, i) == value))
}

/// Symmetrize a square matrix as `(A + A^T) / 2`.
pub fn symmetrize(matrix: &SparseMatrix) -> SparseMatrix {
    assert_eq!(matrix.rows(), matrix.cols(), "only square matrices can be symmetrized");
    log::info!("Symmetrizing {}x{} matrix", matrix.rows(), matrix.cols());

    let n = matrix.cols();
    let transposed = transpose(matrix);

    // Merge column j of A and A^T, summing entries that share a row
    let mut col_offsets = Vec::with_capacity(n + 1);
    let mut row_index = Vec::with_capacity(matrix.nnz() * 2);
    let mut values = Vec::with_capacity(matrix.nnz() * 2);
    let mut merged: Vec<(usize, f64)> = Vec::new();

    col_offsets.push(0u32);
    for j in 0..n {
        merged.clear();
        merged.extend(matrix.column(j).map(|(i, v)| (i, 0.5 * v)));
        merged.extend(transposed.column(j).map(|(i, v)| (i, 0.5 * v)));
        merged.sort_unstable_by_key(|&(i, _)| i);

        let mut last_row = None;
        for &(i, value) in &merged {
            if last_row == Some(i) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
                continue;
            }
            row_index.push(to_index(i));
            values.push(value);
            last_row = Some(i);
        }
        col_offsets.push(to_index(row_index.len()));
    }

    let mut out = SparseMatrix::with_capacity(n, n, values.len());
    for (j, &offset) in col_offsets.iter().enumerate() {
        *out.cidx_mut(j) = offset;
    }
    for (k, (row, value)) in row_index.into_iter().zip(values).enumerate() {
        *out.ridx_mut(k) = row;
        *out.data_mut(k) = value;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let m = SparseMatrix::from_dense(2, 3, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        let t = transpose(&m);
        assert_eq!(t.rows(), 3);
        assert_eq!(t.cols(), 2);
        assert!(t.validate().is_ok());
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(m.get(i, j), t.get(j, i));
            }
        }
    }

    #[test]
    fn symmetrize_averages_both_directions() {
        let m = SparseMatrix::from_dense(2, 2, &[1.0, 2.0, 0.0, 0.0]);
        assert!(!is_symmetric(&m));
        let s = symmetrize(&m);
        assert!(is_symmetric(&s));
        assert_eq!(s.get(0, 1), 1.0);
        assert_eq!(s.get(1, 0), 1.0);
        assert_eq!(s.get(0, 0), 1.0);
        assert_eq!(s.nnz(), 3);
    }

    #[test]
    fn all_ones_is_symmetric() {
        let m = SparseMatrix::from_dense(3, 3, &[1.0; 9]);
        assert!(is_symmetric(&m));
        assert_eq!(symmetrize(&m), m);
    }
}
