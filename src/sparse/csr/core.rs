//! Core CSR implementation: struct, creation, getters

use std::ops::Range;

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};

/// CSR (Compressed Sparse Row) sparse matrix held in host memory
///
/// Indices are `u32`, matching the device-side layout of the SpMM kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T: Element> {
    pub(crate) row_ptr: Vec<u32>,
    pub(crate) col_index: Vec<u32>,
    pub(crate) values: Vec<T>,
    pub(crate) shape: [usize; 2],
}

impl<T: Element> CsrMatrix<T> {
    /// Create a new CSR matrix from components
    ///
    /// # Arguments
    ///
    /// * `row_ptr` - Row pointers (length: nrows + 1)
    /// * `col_index` - Column index for each non-zero
    /// * `values` - Value of each non-zero
    /// * `shape` - Matrix shape [nrows, ncols]
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - row_ptr length != nrows + 1
    /// - col_index and values have different lengths
    /// - row_ptr does not start at 0, decreases, or does not end at nnz
    /// - any column index is >= ncols
    pub fn new(
        row_ptr: Vec<u32>,
        col_index: Vec<u32>,
        values: Vec<T>,
        shape: [usize; 2],
    ) -> Result<Self> {
        let csr = Self {
            row_ptr,
            col_index,
            values,
            shape,
        };
        csr.validate()?;
        Ok(csr)
    }

    /// Create a CSR matrix without checking any invariant
    ///
    /// Used to feed malformed operands to the kernel, which must skip
    /// out-of-range columns instead of faulting.
    pub fn from_raw_parts(
        row_ptr: Vec<u32>,
        col_index: Vec<u32>,
        values: Vec<T>,
        shape: [usize; 2],
    ) -> Self {
        Self {
            row_ptr,
            col_index,
            values,
            shape,
        }
    }

    /// Create an all-zero CSR matrix
    pub fn empty(shape: [usize; 2]) -> Self {
        let [nrows, _ncols] = shape;
        Self {
            row_ptr: vec![0; nrows + 1],
            col_index: Vec::new(),
            values: Vec::new(),
            shape,
        }
    }

    /// Check every CSR invariant
    pub fn validate(&self) -> Result<()> {
        let [nrows, ncols] = self.shape;
        let nnz = self.values.len();

        if self.row_ptr.len() != nrows + 1 {
            return Err(Error::shape_mismatch(&[nrows + 1], &[self.row_ptr.len()]));
        }
        if self.col_index.len() != nnz {
            return Err(Error::shape_mismatch(&[nnz], &[self.col_index.len()]));
        }
        if nnz > u32::MAX as usize {
            return Err(Error::invalid_csr(format!(
                "{} non-zeros exceed the u32 index space",
                nnz
            )));
        }

        if self.row_ptr[0] != 0 {
            return Err(Error::invalid_csr(format!(
                "row_ptr[0] must be 0, got {}",
                self.row_ptr[0]
            )));
        }
        if let Some(row) = self.row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(Error::invalid_csr(format!(
                "row_ptr decreases at row {}: {} > {}",
                row,
                self.row_ptr[row],
                self.row_ptr[row + 1]
            )));
        }
        if self.row_ptr[nrows] as usize != nnz {
            return Err(Error::invalid_csr(format!(
                "row_ptr[{}] = {} but nnz = {}",
                nrows, self.row_ptr[nrows], nnz
            )));
        }

        if let Some(pos) = self.col_index.iter().position(|&c| c as usize >= ncols) {
            return Err(Error::invalid_csr(format!(
                "col_index[{}] = {} out of range for {} columns",
                pos, self.col_index[pos], ncols
            )));
        }

        Ok(())
    }

    /// Matrix shape [nrows, ncols]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Number of rows (m)
    pub fn nrows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns (k)
    pub fn ncols(&self) -> usize {
        self.shape[1]
    }

    /// Number of stored non-zeros
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Element dtype
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Returns the row pointers
    pub fn row_ptr(&self) -> &[u32] {
        &self.row_ptr
    }

    /// Returns the column indices
    pub fn col_index(&self) -> &[u32] {
        &self.col_index
    }

    /// Returns the non-zero values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Storage range of a row inside `col_index`/`values`
    ///
    /// # Panics
    ///
    /// Panics if row >= nrows
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptr[row] as usize..self.row_ptr[row + 1] as usize
    }

    /// Returns the number of non-zeros in a specific row
    pub fn row_nnz(&self, row: usize) -> usize {
        self.row_range(row).len()
    }

    /// Fraction of cells that are stored (nnz / (nrows * ncols))
    pub fn density(&self) -> f64 {
        let cells = self.nrows() * self.ncols();
        if cells == 0 {
            return 0.0;
        }
        self.nnz() as f64 / cells as f64
    }

    /// Bytes occupied by the three CSR arrays
    pub fn memory_usage(&self) -> usize {
        let ptr_size = self.row_ptr.len() * std::mem::size_of::<u32>();
        let index_size = self.col_index.len() * std::mem::size_of::<u32>();
        let value_size = self.values.len() * T::DTYPE.size_in_bytes();
        ptr_size + index_size + value_size
    }

    /// Expand to a dense row-major `nrows x ncols` buffer
    ///
    /// Duplicate entries accumulate; entries with an out-of-range column are
    /// dropped.
    pub fn to_dense(&self) -> Vec<T> {
        let [nrows, ncols] = self.shape;
        let mut dense = vec![T::zero(); nrows * ncols];

        for row in 0..nrows.min(self.row_ptr.len().saturating_sub(1)) {
            let start = self.row_ptr[row] as usize;
            let end = (self.row_ptr[row + 1] as usize)
                .min(self.values.len())
                .min(self.col_index.len());
            for pos in start..end {
                let col = self.col_index[pos] as usize;
                if col < ncols {
                    let cell = &mut dense[row * ncols + col];
                    *cell = cell.mul_add_acc(self.values[pos], T::one());
                }
            }
        }

        dense
    }
}
