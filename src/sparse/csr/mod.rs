//! CSR (Compressed Sparse Row) format

mod core;

pub use core::CsrMatrix;
