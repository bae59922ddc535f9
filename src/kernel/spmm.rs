//! CSR sparse x dense matrix multiplication kernel
//!
//! One thread per output element: thread `(col, row)` walks row `row` of A and
//! accumulates `A[row, j] * B[j, col]` over the stored entries.
//!
//! ```text
//! C[row, col] = Σ values[i] * B[col_index[i] * n + col],   i ∈ row_ptr[row]..row_ptr[row + 1]
//! ```
//!
//! Stored entries whose column is not below `k` are skipped rather than read
//! out of bounds.

use std::marker::PhantomData;

use super::args::KernelArgs;
use super::grid::{self, GridDim, LaunchStats, ThreadCoord};
use super::{Kernel, LaunchContext};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::sparse::CsrMatrix;

/// Borrowed operands of one SpMM launch
#[derive(Clone, Copy, Debug)]
pub struct SpmmOperands<'a, T: Element> {
    /// Non-zero values of A
    pub values: &'a [T],
    /// Column index of each non-zero
    pub col_index: &'a [u32],
    /// Row pointers of A
    pub row_ptr: &'a [u32],
    /// Dense `k x n` operand
    pub b: &'a [T],
    /// Rows of A
    pub m: usize,
    /// Columns of B
    pub n: usize,
    /// Columns of A
    pub k: usize,
}

impl<'a, T: Element> SpmmOperands<'a, T> {
    /// Operands of `csr * b` where `b` is `csr.ncols() x n`
    pub fn new(csr: &'a CsrMatrix<T>, b: &'a [T], n: usize) -> Self {
        Self {
            values: csr.values(),
            col_index: csr.col_index(),
            row_ptr: csr.row_ptr(),
            b,
            m: csr.nrows(),
            n,
            k: csr.ncols(),
        }
    }

    /// Body of one grid thread
    ///
    /// Returns `None` for threads outside the `m x n` output.
    #[inline]
    pub fn thread(&self, coord: ThreadCoord) -> Option<(usize, T)> {
        if !coord.within(self.n, self.m) {
            return None;
        }
        let row = coord.y as usize;
        let col = coord.x as usize;

        let start = *self.row_ptr.get(row)? as usize;
        let end = (*self.row_ptr.get(row + 1)? as usize)
            .min(self.values.len())
            .min(self.col_index.len());

        let mut sum = T::zero();
        for pos in start..end {
            let a_col = self.col_index[pos] as usize;
            if a_col >= self.k {
                continue;
            }
            if let Some(&b_val) = self.b.get(a_col * self.n + col) {
                sum = sum.mul_add_acc(self.values[pos], b_val);
            }
        }

        Some((row * self.n + col, sum))
    }
}

/// Host-side launch of the SpMM grid over `csr * b`
///
/// The matrix is not validated, so malformed CSR data exercises the kernel's
/// own bounds checks. `grid` may be larger than `(n, m)`.
pub fn spmm_csr_grid<T: Element>(
    csr: &CsrMatrix<T>,
    b: &[T],
    n: usize,
    grid: GridDim,
) -> Result<(Vec<T>, LaunchStats)> {
    let k = csr.ncols();
    if b.len() != k * n {
        return Err(Error::shape_mismatch(&[k, n], &[b.len()]));
    }

    let operands = SpmmOperands::new(csr, b, n);
    let mut c = vec![T::zero(); csr.nrows() * n];
    let stats = grid::launch(grid, &mut c, |coord| operands.thread(coord))?;
    Ok((c, stats))
}

/// The CSR SpMM kernel as loaded on a device
pub struct SpmmCsrKernel<T: Element> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Element> SpmmCsrKernel<T> {
    /// Create the kernel
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Element> Default for SpmmCsrKernel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Kernel for SpmmCsrKernel<T> {
    fn name(&self) -> &'static str {
        "spmm_csr"
    }

    fn execute(&self, args: &[u8], ctx: &LaunchContext<'_>) -> Result<LaunchStats> {
        let args = KernelArgs::from_bytes(args)?;
        let memory = ctx.memory();
        let (m, n, k, nnz) = (
            args.m as usize,
            args.n as usize,
            args.k as usize,
            args.nnz as usize,
        );

        let mut values: Vec<T> = memory.read_typed(args.a_val_id())?;
        let mut col_index: Vec<u32> = memory.read_typed(args.a_col_id())?;
        let row_ptr: Vec<u32> = memory.read_typed(args.a_row_ptr_id())?;
        let b: Vec<T> = memory.read_typed(args.b_id())?;
        // Cells no thread covers keep their previous device contents
        let mut c: Vec<T> = memory.read_typed(args.c_id())?;

        check_len("row pointers", row_ptr.len(), m + 1)?;
        check_len("values", values.len(), nnz)?;
        check_len("column indices", col_index.len(), nnz)?;
        check_len("B", b.len(), k * n)?;
        check_len("C", c.len(), m * n)?;
        values.truncate(nnz);
        col_index.truncate(nnz);
        c.truncate(m * n);

        let operands = SpmmOperands {
            values: &values,
            col_index: &col_index,
            row_ptr: &row_ptr,
            b: &b,
            m,
            n,
            k,
        };

        let stats = ctx.spawn_threads(args.grid(), &mut c, |coord| operands.thread(coord))?;
        memory.write_typed(args.c_id(), 0, &c)?;

        log::debug!(
            "{}: {} threads dispatched, {} active",
            self.name(),
            stats.threads,
            stats.active
        );
        Ok(stats)
    }
}

fn check_len(what: &str, have: usize, need: usize) -> Result<()> {
    if have < need {
        return Err(Error::Launch(format!(
            "{} buffer holds {} elements, launch needs {}",
            what, have, need
        )));
    }
    Ok(())
}
