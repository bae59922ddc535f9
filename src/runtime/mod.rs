//! Compute devices
//!
//! This module defines the narrow `Device` interface the harness drives and
//! provides one implementation of it, a simulated SIMT device that runs
//! kernels in-process.
//!
//! # Architecture
//!
//! ```text
//! Device (what the harness drives)
//! ├── MemoryRegistry (handles -> buffers and loaded kernels)
//! ├── KernelTable (kernel file name -> kernel)
//! └── SimtDevice (background launch worker + completion signal)
//! ```
//!
//! The call sequence of one run is fixed:
//!
//! ```text
//! mem_alloc* -> copy_to_device* -> upload_kernel_file -> upload_bytes(args)
//!   -> start -> ready_wait -> copy_from_device -> mem_free* -> close
//! ```

mod registry;
pub mod simt;

use std::path::Path;
use std::time::Duration;

pub use registry::{BufferId, MemAccess, MemoryRegistry};
pub use simt::{KernelTable, SimtDevice, SimtDeviceConfig};

use crate::error::Result;

/// A compute device as seen from the host
///
/// Handles returned by `mem_alloc`, `upload_kernel_file` and `upload_bytes`
/// stay valid until `mem_free` or `close`. Every fallible call reports
/// failure through [`Error`](crate::error::Error); none of them panic.
pub trait Device: Send {
    /// Human-readable device name
    fn name(&self) -> &str;

    /// Allocate `size` bytes of device memory
    fn mem_alloc(&mut self, size: usize, access: MemAccess) -> Result<BufferId>;

    /// Release a buffer or kernel handle
    fn mem_free(&mut self, buffer: BufferId) -> Result<()>;

    /// Copy `data` into `buffer` at byte `offset`
    fn copy_to_device(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<()>;

    /// Copy `out.len()` bytes of `buffer` starting at byte `offset` into `out`
    fn copy_from_device(&self, buffer: BufferId, offset: usize, out: &mut [u8]) -> Result<()>;

    /// Load the kernel named by a kernel file
    fn upload_kernel_file(&mut self, path: &Path) -> Result<BufferId>;

    /// Allocate a read-only buffer initialized with `bytes`
    fn upload_bytes(&mut self, bytes: &[u8]) -> Result<BufferId>;

    /// Launch `kernel` with the argument record stored in `args`
    ///
    /// Returns once the launch is queued; completion is observed with
    /// [`Device::ready_wait`].
    fn start(&mut self, kernel: BufferId, args: BufferId) -> Result<()>;

    /// Block until the last launch completes or `timeout` elapses
    fn ready_wait(&mut self, timeout: Duration) -> Result<()>;

    /// Release every resource and shut the device down
    ///
    /// Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}
