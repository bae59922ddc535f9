//! Sequential CPU reference products

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::sparse::CsrMatrix;

/// `C = A * B` for CSR `A` (`m x k`) and dense row-major `B` (`k x n`)
///
/// Walks rows and columns in order and accumulates each row's stored entries
/// in storage order, skipping entries whose column is not below `k`. Row
/// ranges are clamped to the stored arrays, so unvalidated matrices do not
/// panic.
pub fn spmm_reference<T: Element>(a: &CsrMatrix<T>, b: &[T], n: usize) -> Result<Vec<T>> {
    let [m, k] = a.shape();
    if b.len() != k * n {
        return Err(Error::shape_mismatch(&[k * n], &[b.len()]));
    }
    if a.row_ptr().len() < m + 1 {
        return Err(Error::shape_mismatch(&[m + 1], &[a.row_ptr().len()]));
    }

    let row_ptr = a.row_ptr();
    let col_index = a.col_index();
    let values = a.values();
    let stored = values.len().min(col_index.len());

    let mut c = vec![T::zero(); m * n];
    for i in 0..m {
        let start = row_ptr[i] as usize;
        let end = (row_ptr[i + 1] as usize).min(stored);
        for j in 0..n {
            let mut sum = T::zero();
            for idx in start..end {
                let col = col_index[idx] as usize;
                if col < k {
                    sum = sum.mul_add_acc(values[idx], b[col * n + j]);
                }
            }
            c[i * n + j] = sum;
        }
    }

    Ok(c)
}

/// Dense `C = A * B` for row-major `A` (`m x k`) and `B` (`k x n`)
///
/// Accumulates over `k` in increasing order, so for a CSR matrix with
/// ascending columns it matches [`spmm_reference`] on the expanded matrix.
pub fn dense_matmul<T: Element>(a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Result<Vec<T>> {
    if a.len() != m * k {
        return Err(Error::shape_mismatch(&[m, k], &[a.len()]));
    }
    if b.len() != k * n {
        return Err(Error::shape_mismatch(&[k, n], &[b.len()]));
    }

    let mut c = vec![T::zero(); m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = T::zero();
            for p in 0..k {
                sum = sum.mul_add_acc(a[i * k + p], b[p * n + j]);
            }
            c[i * n + j] = sum;
        }
    }
    Ok(c)
}
