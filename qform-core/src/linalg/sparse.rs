//! Sparse matrix helpers on top of `sprs` CSC storage.

use sprs::{CsMat, TriMat};

/// Sparse matrix in CSC format.
pub type SparseCsc = CsMat<f64>;

/// Build a sparse CSC matrix from triplets (row, col, value).
///
/// Duplicate entries are summed.
pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> SparseCsc
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((nrows, ncols));
    for (i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// Sparse matrix-vector product: y = alpha * A * x + beta * y
pub fn spmv(a: &SparseCsc, x: &[f64], y: &mut [f64], alpha: f64, beta: f64) {
    assert_eq!(a.cols(), x.len());
    assert_eq!(a.rows(), y.len());

    scale_in_place(y, beta);
    if alpha != 0.0 {
        for (val, (row, col)) in a.iter() {
            y[row] += alpha * (*val) * x[col];
        }
    }
}

/// Transpose-vector product: y = alpha * A^T * x + beta * y
pub fn spmv_transpose(a: &SparseCsc, x: &[f64], y: &mut [f64], alpha: f64, beta: f64) {
    assert_eq!(a.rows(), x.len());
    assert_eq!(a.cols(), y.len());

    scale_in_place(y, beta);
    if alpha != 0.0 {
        // Columns of a CSC matrix are the rows of A^T.
        for (col_idx, col) in a.outer_iterator().enumerate() {
            let acc: f64 = col.iter().map(|(row_idx, &val)| val * x[row_idx]).sum();
            y[col_idx] += alpha * acc;
        }
    }
}

/// Row-wise view of a CSC matrix: `rows[i]` lists `(col, value)` sorted by column.
pub fn row_entries(a: &SparseCsc) -> Vec<Vec<(usize, f64)>> {
    let mut rows = vec![Vec::new(); a.rows()];
    for (col_idx, col) in a.outer_iterator().enumerate() {
        for (row_idx, &val) in col.iter() {
            if val != 0.0 {
                rows[row_idx].push((col_idx, val));
            }
        }
    }
    rows
}

fn scale_in_place(y: &mut [f64], beta: f64) {
    if beta == 0.0 {
        y.fill(0.0);
    } else if beta != 1.0 {
        for yi in y.iter_mut() {
            *yi *= beta;
        }
    }
}
