//! Host-side test harness
//!
//! Drives one SpMM regression run against a [`Device`](crate::runtime::Device):
//! generate operands, upload, launch, wait, download, verify. The device and
//! every buffer acquired on it are owned by a [`TestContext`] for the length
//! of the run and released on every exit path.

mod config;
mod context;
mod run;

pub use config::HarnessConfig;
pub use context::TestContext;
pub use run::{RunOutcome, run_simt, run_spmm};
