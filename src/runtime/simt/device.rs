//! SIMT device implementation

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::kernels::KernelTable;
use crate::error::{Error, Result};
use crate::kernel::{LaunchContext, LaunchStats};
use crate::runtime::{BufferId, Device, MemAccess, MemoryRegistry};

/// Configuration of a simulated SIMT device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimtDeviceConfig {
    /// Device name reported by [`Device::name`]
    pub name: String,
    /// Threads scheduled together; launch grids are padded to a multiple
    pub group_size: u32,
    /// Bytes of device memory
    pub memory_limit: usize,
}

impl Default for SimtDeviceConfig {
    fn default() -> Self {
        Self {
            name: "simt".to_string(),
            group_size: 4,
            memory_limit: 256 << 20,
        }
    }
}

impl SimtDeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the thread group size
    pub fn with_group_size(mut self, group_size: u32) -> Self {
        self.group_size = group_size;
        self
    }

    /// Set the memory capacity in bytes
    pub fn with_memory_limit(mut self, memory_limit: usize) -> Self {
        self.memory_limit = memory_limit;
        self
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            return Err(Error::invalid_argument("group_size", "must be at least 1"));
        }
        Ok(())
    }
}

enum LaunchState {
    Idle,
    Running,
    Done(Result<LaunchStats>),
}

/// Completion signal shared with the launch worker
struct Completion {
    state: Mutex<LaunchState>,
    ready: Condvar,
}

impl Completion {
    fn finish(&self, result: Result<LaunchStats>) {
        *self.state.lock() = LaunchState::Done(result);
        self.ready.notify_all();
    }
}

/// In-process SIMT device
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use simt_spmm::runtime::{Device, KernelTable, SimtDevice, SimtDeviceConfig};
///
/// let mut device = SimtDevice::open(SimtDeviceConfig::default(), KernelTable::spmm::<f32>())?;
/// let kernel = device.upload_kernel_file(Path::new("kernel.vxbin"))?;
/// device.mem_free(kernel)?;
/// device.close()?;
/// # Ok::<(), simt_spmm::error::Error>(())
/// ```
pub struct SimtDevice {
    config: SimtDeviceConfig,
    memory: MemoryRegistry,
    kernels: KernelTable,
    completion: Arc<Completion>,
    worker: Option<JoinHandle<()>>,
    closed: bool,
}

impl SimtDevice {
    /// Open a device serving the kernels in `kernels`
    pub fn open(config: SimtDeviceConfig, kernels: KernelTable) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "open {}: group size {}, {} bytes, kernels {:?}",
            config.name,
            config.group_size,
            config.memory_limit,
            kernels.names()
        );
        Ok(Self {
            memory: MemoryRegistry::new(config.memory_limit),
            config,
            kernels,
            completion: Arc::new(Completion {
                state: Mutex::new(LaunchState::Idle),
                ready: Condvar::new(),
            }),
            worker: None,
            closed: false,
        })
    }

    /// Device configuration
    pub fn config(&self) -> &SimtDeviceConfig {
        &self.config
    }

    /// Device memory, for inspection
    pub fn memory(&self) -> &MemoryRegistry {
        &self.memory
    }

    /// Kernels this device can load
    pub fn kernels(&self) -> &KernelTable {
        &self.kernels
    }

    /// Returns true once [`Device::close`] has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::DeviceClosed);
        }
        Ok(())
    }

    fn reap_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                // The worker catches kernel panics, so join cannot fail
                let _ = worker.join();
            } else {
                self.worker = Some(worker);
            }
        }
    }
}

impl Device for SimtDevice {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn mem_alloc(&mut self, size: usize, access: MemAccess) -> Result<BufferId> {
        self.ensure_open()?;
        self.memory.allocate(size, access)
    }

    fn mem_free(&mut self, buffer: BufferId) -> Result<()> {
        self.ensure_open()?;
        self.memory.release(buffer)
    }

    fn copy_to_device(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.memory.write(buffer, offset, data)
    }

    fn copy_from_device(&self, buffer: BufferId, offset: usize, out: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        self.memory.read(buffer, offset, out)
    }

    fn upload_kernel_file(&mut self, path: &Path) -> Result<BufferId> {
        self.ensure_open()?;
        let kernel = self.kernels.resolve(path)?;
        log::debug!("load {} as kernel '{}'", path.display(), kernel.name());
        Ok(self.memory.insert_kernel(kernel))
    }

    fn upload_bytes(&mut self, bytes: &[u8]) -> Result<BufferId> {
        self.ensure_open()?;
        self.memory.insert_bytes(bytes, MemAccess::Read)
    }

    fn start(&mut self, kernel: BufferId, args: BufferId) -> Result<()> {
        self.ensure_open()?;
        self.reap_worker();

        let kernel = self.memory.kernel(kernel)?;
        let args = self.memory.read_bytes(args)?;

        {
            let mut state = self.completion.state.lock();
            if matches!(*state, LaunchState::Running) {
                return Err(Error::Launch(format!(
                    "'{}' is still running a kernel",
                    self.config.name
                )));
            }
            *state = LaunchState::Running;
        }

        let memory = self.memory.clone();
        let completion = Arc::clone(&self.completion);
        let group_size = self.config.group_size;
        let spawned = std::thread::Builder::new()
            .name(format!("{}-launch", self.config.name))
            .spawn(move || {
                let ctx = LaunchContext::new(&memory, group_size);
                let result = panic::catch_unwind(AssertUnwindSafe(|| kernel.execute(&args, &ctx)))
                    .unwrap_or_else(|_| {
                        Err(Error::Launch(format!("kernel '{}' panicked", kernel.name())))
                    });
                completion.finish(result);
            });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                *self.completion.state.lock() = LaunchState::Idle;
                Err(Error::Launch(format!("failed to spawn launch worker: {}", e)))
            }
        }
    }

    fn ready_wait(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_open()?;

        let outcome = {
            let mut state = self.completion.state.lock();
            self.completion.ready.wait_while_for(
                &mut state,
                |s| matches!(s, LaunchState::Running),
                timeout,
            );
            match std::mem::replace(&mut *state, LaunchState::Idle) {
                LaunchState::Running => {
                    *state = LaunchState::Running;
                    return Err(Error::Timeout { timeout });
                }
                LaunchState::Idle => Ok(None),
                LaunchState::Done(result) => result.map(Some),
            }
        };

        self.reap_worker();
        if let Some(stats) = outcome? {
            log::debug!(
                "{}: launch complete, {} threads, {} active",
                self.config.name,
                stats.threads,
                stats.active
            );
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reap_worker();
        if self.worker.take().is_some() {
            log::warn!(
                "{}: closing with a kernel still running, detaching it",
                self.config.name
            );
        }
        let live = self.memory.live_buffers();
        if live > 0 {
            log::debug!("{}: releasing {} live resources", self.config.name, live);
        }
        self.memory.clear();
        Ok(())
    }
}

impl Drop for SimtDevice {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for SimtDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimtDevice")
            .field("config", &self.config)
            .field("memory", &self.memory)
            .field("kernels", &self.kernels)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;

    struct Sleeper(Duration);

    impl Kernel for Sleeper {
        fn name(&self) -> &'static str {
            "sleeper"
        }

        fn execute(&self, _args: &[u8], _ctx: &LaunchContext<'_>) -> Result<LaunchStats> {
            std::thread::sleep(self.0);
            Ok(LaunchStats::default())
        }
    }

    struct Panicker;

    impl Kernel for Panicker {
        fn name(&self) -> &'static str {
            "panicker"
        }

        fn execute(&self, _args: &[u8], _ctx: &LaunchContext<'_>) -> Result<LaunchStats> {
            panic!("device fault")
        }
    }

    fn device_with(name: &str, kernel: Arc<dyn Kernel>) -> SimtDevice {
        let mut table = KernelTable::new();
        table.register(name, kernel);
        SimtDevice::open(SimtDeviceConfig::default(), table).unwrap()
    }

    #[test]
    fn test_config_validation() {
        let config = SimtDeviceConfig::default().with_group_size(0);
        assert!(SimtDevice::open(config, KernelTable::new()).is_err());
    }

    #[test]
    fn test_ready_wait_without_launch() {
        let mut device = SimtDevice::open(SimtDeviceConfig::default(), KernelTable::new()).unwrap();
        device.ready_wait(Duration::from_millis(1)).unwrap();
    }

    #[test]
    fn test_launch_and_wait() {
        let mut device = device_with("sleeper", Arc::new(Sleeper(Duration::from_millis(5))));
        let kernel = device.upload_kernel_file(Path::new("sleeper.bin")).unwrap();
        let args = device.upload_bytes(&[]).unwrap();
        device.start(kernel, args).unwrap();
        device.ready_wait(Duration::from_secs(30)).unwrap();
        // A second wait has nothing to wait for
        device.ready_wait(Duration::from_millis(1)).unwrap();
    }

    #[test]
    fn test_timeout_then_completion() {
        let mut device = device_with("sleeper", Arc::new(Sleeper(Duration::from_millis(200))));
        let kernel = device.upload_kernel_file(Path::new("sleeper")).unwrap();
        let args = device.upload_bytes(&[]).unwrap();
        device.start(kernel, args).unwrap();

        let err = device.ready_wait(Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(matches!(device.start(kernel, args), Err(Error::Launch(_))));

        device.ready_wait(Duration::from_secs(30)).unwrap();
    }

    #[test]
    fn test_kernel_panic_is_a_launch_error() {
        let mut device = device_with("panicker", Arc::new(Panicker));
        let kernel = device.upload_kernel_file(Path::new("panicker")).unwrap();
        let args = device.upload_bytes(&[]).unwrap();
        device.start(kernel, args).unwrap();
        assert!(matches!(
            device.ready_wait(Duration::from_secs(30)),
            Err(Error::Launch(_))
        ));
    }

    #[test]
    fn test_close_releases_everything() {
        let mut device = SimtDevice::open(SimtDeviceConfig::default(), KernelTable::spmm::<f32>()).unwrap();
        device.mem_alloc(128, MemAccess::Read).unwrap();
        device.upload_kernel_file(Path::new("kernel.vxbin")).unwrap();
        assert_eq!(device.memory().live_buffers(), 2);

        device.close().unwrap();
        device.close().unwrap();
        assert!(device.is_closed());
        assert_eq!(device.memory().live_buffers(), 0);
        assert!(matches!(
            device.mem_alloc(1, MemAccess::Read),
            Err(Error::DeviceClosed)
        ));
    }
}
