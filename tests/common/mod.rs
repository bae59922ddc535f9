//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use simt_spmm::dtype::Element;
use simt_spmm::error::Result;
use simt_spmm::kernel::{Kernel, KernelArgs, LaunchContext, LaunchStats, SpmmCsrKernel};
use simt_spmm::runtime::{KernelTable, SimtDevice, SimtDeviceConfig};
use simt_spmm::verify::ulp_distance;

/// Route library logs through the test harness' captured output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Open a simulated device serving the SpMM kernel for `T`
pub fn create_simt_device<T: Element>() -> SimtDevice {
    create_simt_device_with(SimtDeviceConfig::default(), KernelTable::spmm::<T>())
}

/// Open a simulated device with an explicit configuration and kernel table
pub fn create_simt_device_with(config: SimtDeviceConfig, kernels: KernelTable) -> SimtDevice {
    SimtDevice::open(config, kernels).expect("failed to open simulated device")
}

/// Kernel that only sleeps, for exercising completion timeouts
pub struct SleepKernel(pub Duration);

impl Kernel for SleepKernel {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn execute(&self, _args: &[u8], _ctx: &LaunchContext<'_>) -> Result<LaunchStats> {
        std::thread::sleep(self.0);
        Ok(LaunchStats::default())
    }
}

/// SpMM kernel table with an extra `sleep` entry
pub fn kernels_with_sleep<T: Element>(delay: Duration) -> KernelTable {
    let mut table = KernelTable::spmm::<T>();
    table.register("sleep", Arc::new(SleepKernel(delay)));
    table
}

/// SpMM kernel that adds one to every `stride`-th cell of C after computing it
pub struct SkewedSpmmKernel<T: Element> {
    inner: SpmmCsrKernel<T>,
    stride: usize,
}

impl<T: Element> SkewedSpmmKernel<T> {
    pub fn new(stride: usize) -> Self {
        Self {
            inner: SpmmCsrKernel::new(),
            stride,
        }
    }
}

impl<T: Element> Kernel for SkewedSpmmKernel<T> {
    fn name(&self) -> &'static str {
        "skewed_spmm"
    }

    fn execute(&self, args: &[u8], ctx: &LaunchContext<'_>) -> Result<LaunchStats> {
        let stats = self.inner.execute(args, ctx)?;
        let c_id = KernelArgs::from_bytes(args)?.c_id();
        let mut c: Vec<T> = ctx.memory().read_typed(c_id)?;
        for cell in c.iter_mut().step_by(self.stride) {
            *cell = cell.mul_add_acc(T::one(), T::one());
        }
        ctx.memory().write_typed(c_id, 0, &c)?;
        Ok(stats)
    }
}

/// Kernel table whose `kernel` entry skews every `stride`-th output cell
pub fn kernels_with_skew<T: Element>(stride: usize) -> KernelTable {
    let mut table = KernelTable::spmm::<T>();
    table.register("kernel", Arc::new(SkewedSpmmKernel::<T>::new(stride)));
    table
}

/// `x` moved `ulps` representable values towards +inf (for positive `x`)
pub fn f32_ulps_up(x: f32, ulps: u32) -> f32 {
    f32::from_bits(x.to_bits() + ulps)
}

/// Assert two slices are within `max_ulps` of each other element-wise
pub fn assert_ulp_eq<T: Element>(a: &[T], b: &[T], max_ulps: u64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (&x, &y)) in a.iter().zip(b.iter()).enumerate() {
        let d = ulp_distance(x, y);
        assert!(
            d <= max_ulps,
            "{}: element {} differs: {} vs {} ({} ulps, max {})",
            msg,
            i,
            x,
            y,
            d,
            max_ulps
        );
    }
}
