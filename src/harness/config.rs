//! Test-run configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::runtime::SimtDeviceConfig;

/// Everything one SpMM test run needs
///
/// Defaults reproduce the stock regression run: 32x32 by 32x32, 90% sparse,
/// seed 50, kernel file `kernel.vxbin`.
#[derive(Clone, Debug, PartialEq)]
pub struct HarnessConfig {
    /// Rows of A and C
    pub m: u32,
    /// Columns of B and C
    pub n: u32,
    /// Columns of A, rows of B
    pub k: u32,
    /// Fraction of A's cells left empty, in `[0, 1)`
    pub sparsity: f32,
    /// Seed of the operand generator
    pub seed: u64,
    /// Kernel file to load
    pub kernel_file: PathBuf,
    /// How long to wait for the launch to complete
    pub timeout: Duration,
    /// Device the run opens when none is supplied
    pub device: SimtDeviceConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            m: 32,
            n: 32,
            k: 32,
            sparsity: 0.9,
            seed: 50,
            kernel_file: PathBuf::from("kernel.vxbin"),
            timeout: Duration::from_secs(24 * 60 * 60),
            device: SimtDeviceConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Set `m`, `n` and `k`
    pub fn with_dims(mut self, m: u32, n: u32, k: u32) -> Self {
        self.m = m;
        self.n = n;
        self.k = k;
        self
    }

    /// Set the sparsity
    pub fn with_sparsity(mut self, sparsity: f32) -> Self {
        self.sparsity = sparsity;
        self
    }

    /// Set the generator seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the kernel file
    pub fn with_kernel_file(mut self, kernel_file: impl Into<PathBuf>) -> Self {
        self.kernel_file = kernel_file.into();
        self
    }

    /// Set the completion timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the device configuration
    pub fn with_device(mut self, device: SimtDeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Check that the run is representable
    ///
    /// Every matrix must be addressable with `u32` element indices, as the
    /// kernel argument record carries 32-bit sizes.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.sparsity) {
            return Err(Error::invalid_argument(
                "sparsity",
                format!("must be in [0, 1), got {}", self.sparsity),
            ));
        }
        let (m, n, k) = (self.m as u64, self.n as u64, self.k as u64);
        for (name, cells) in [("A", m * k), ("B", k * n), ("C", m * n)] {
            if cells > u32::MAX as u64 {
                return Err(Error::invalid_argument(
                    "shape",
                    format!("{} has {} elements, more than u32 can index", name, cells),
                ));
            }
        }
        self.device.validate()
    }
}
