//! Device kernels and the grid model they run on
//!
//! # Architecture
//!
//! ```text
//! Kernel (object-safe, loaded into a device under a handle)
//! ├── KernelArgs (POD record decoded from the argument buffer)
//! ├── LaunchContext (device memory + hardware group size)
//! └── grid::launch (one task per thread, results scattered once)
//! ```
//!
//! A kernel never touches host data: everything it reads or writes goes
//! through the handles in its argument record.

pub mod args;
pub mod grid;
pub mod spmm;

pub use args::KernelArgs;
pub use grid::{GridDim, LaunchStats, ThreadCoord};
pub use spmm::{SpmmCsrKernel, SpmmOperands, spmm_csr_grid};

use crate::error::Result;
use crate::runtime::MemoryRegistry;

/// A program the device can execute
///
/// Implementations must be stateless across launches: the same argument
/// bytes over the same memory produce the same result.
pub trait Kernel: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Decode `args` and run the whole grid to completion
    fn execute(&self, args: &[u8], ctx: &LaunchContext<'_>) -> Result<LaunchStats>;
}

/// What a running kernel can see of the device
#[derive(Clone, Copy, Debug)]
pub struct LaunchContext<'a> {
    memory: &'a MemoryRegistry,
    group_size: u32,
}

impl<'a> LaunchContext<'a> {
    /// Context over `memory` on hardware scheduling `group_size` threads at once
    pub fn new(memory: &'a MemoryRegistry, group_size: u32) -> Self {
        Self { memory, group_size }
    }

    /// Device memory
    pub fn memory(&self) -> &'a MemoryRegistry {
        self.memory
    }

    /// Hardware thread group size
    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    /// Dispatch `grid`, padded to whole groups, and scatter into `output`
    pub fn spawn_threads<T, F>(&self, grid: GridDim, output: &mut [T], body: F) -> Result<LaunchStats>
    where
        T: Copy + Send,
        F: Fn(ThreadCoord) -> Option<(usize, T)> + Sync,
    {
        grid::launch(grid.padded_to(self.group_size), output, body)
    }
}
