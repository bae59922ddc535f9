//! Reference verification of device results
//!
//! The device result is checked element by element against a sequential CPU
//! product computed from the same host operands:
//!
//! - integral element types must match exactly
//! - floating point types may differ by up to [`FLOAT_ULP`] units in the last
//!   place
//!
//! Mismatches are counted, not raised: a run with errors still completes and
//! reports how many elements were wrong.

mod compare;
mod reference;
mod report;

pub use compare::{Comparator, FLOAT_ULP, ulp_distance};
pub use reference::{dense_matmul, spmm_reference};
pub use report::{MAX_EXIT_CODE, MAX_REPORTED_ERRORS, Mismatch, VerificationReport, Verifier};
