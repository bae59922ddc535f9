//! Sparse matrix support
//!
//! Only the CSR (Compressed Sparse Row) format is provided: it is the layout
//! the SpMM kernel consumes directly.
//!
//! # Layout
//!
//! ```text
//! A (m x k):            row_ptr   = [0, 2, 2, 3]
//! [5 . 7]               col_index = [0, 2, 1]
//! [. . .]               values    = [5, 7, 9]
//! [. 9 .]
//! ```
//!
//! Row `i` owns the half-open range `row_ptr[i]..row_ptr[i + 1]` of
//! `col_index`/`values`. An empty row is an empty range.

mod builder;
mod csr;

pub use builder::{CsrBuilder, SpmmProblem};
pub use csr::CsrMatrix;
