//! # simt-spmm
//!
//! **Sparse x dense matrix multiplication on a GPU-style thread grid, checked
//! against a CPU reference.**
//!
//! A CSR-encoded `m x k` matrix A is multiplied by a dense `k x n` matrix B.
//! The product is computed by a kernel that runs one logical thread per output
//! element on a simulated SIMT device, then compared element by element to a
//! sequential reference with a type-aware tolerance.
//!
//! ## Pipeline
//!
//! ```text
//! CsrBuilder ──► A (CSR), B (dense)
//!                    │ upload
//!                    ▼
//!            Device buffers ◄── KernelArgs (buffer handles)
//!                    │ start / ready_wait
//!                    ▼
//!            SpmmCsrKernel over GridDim (n, m)
//!                    │ download C
//!                    ▼
//!            Verifier (Exact | Ulp { 6 }) vs spmm_reference
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use simt_spmm::prelude::*;
//!
//! let config = HarnessConfig::default().with_dims(8, 8, 8).with_sparsity(0.5);
//! let outcome = run_simt::<f32>(&config)?;
//! assert!(outcome.passed());
//! # Ok::<(), simt_spmm::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded grid dispatch
//! - `integer`: build the `simt-spmm` binary with `i32` elements instead of `f32`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dtype;
pub mod error;
pub mod harness;
pub mod kernel;
pub mod runtime;
pub mod sparse;
pub mod verify;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::harness::{HarnessConfig, RunOutcome, TestContext, run_simt, run_spmm};
    pub use crate::kernel::{GridDim, Kernel, KernelArgs, SpmmCsrKernel};
    pub use crate::runtime::{
        BufferId, Device, KernelTable, MemAccess, SimtDevice, SimtDeviceConfig,
    };
    pub use crate::sparse::{CsrBuilder, CsrMatrix, SpmmProblem};
    pub use crate::verify::{Comparator, VerificationReport, Verifier, spmm_reference};
}
