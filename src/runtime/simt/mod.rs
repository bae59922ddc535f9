//! Simulated SIMT device
//!
//! Runs kernels in-process: device memory lives in a [`MemoryRegistry`],
//! a launch executes on a background worker thread, and the grid threads of
//! the launch run on rayon's pool. Completion is signalled to
//! [`Device::ready_wait`](crate::runtime::Device::ready_wait) through a
//! condition variable.
//!
//! [`MemoryRegistry`]: crate::runtime::MemoryRegistry

mod device;
mod kernels;

pub use device::{SimtDevice, SimtDeviceConfig};
pub use kernels::KernelTable;
