//! Scoped ownership of a device and its buffers

use std::path::Path;

use bytemuck::Pod;

use crate::error::Result;
use crate::runtime::{BufferId, Device, MemAccess};

/// A device plus every handle acquired on it during one test run
///
/// Handles obtained through the context are tracked. [`TestContext::cleanup`]
/// frees them all and closes the device; dropping the context does the same
/// if cleanup has not run, so early returns with `?` release everything.
pub struct TestContext<D: Device> {
    device: D,
    buffers: Vec<BufferId>,
    closed: bool,
}

impl<D: Device> TestContext<D> {
    /// Take ownership of an open device
    pub fn new(device: D) -> Self {
        Self {
            device,
            buffers: Vec::new(),
            closed: false,
        }
    }

    /// The device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Handles still owned by the context, in acquisition order
    pub fn buffers(&self) -> &[BufferId] {
        &self.buffers
    }

    /// Allocate device memory
    pub fn alloc(&mut self, size: usize, access: MemAccess) -> Result<BufferId> {
        let id = self.device.mem_alloc(size, access)?;
        self.buffers.push(id);
        Ok(id)
    }

    /// Copy a slice of elements to the start of a buffer
    pub fn write<T: Pod>(&mut self, buffer: BufferId, data: &[T]) -> Result<()> {
        self.device.copy_to_device(buffer, 0, bytemuck::cast_slice(data))
    }

    /// Copy `len` elements from the start of a buffer
    pub fn read<T: Pod>(&self, buffer: BufferId, len: usize) -> Result<Vec<T>> {
        let mut out = vec![T::zeroed(); len];
        self.device
            .copy_from_device(buffer, 0, bytemuck::cast_slice_mut(&mut out))?;
        Ok(out)
    }

    /// Load a kernel file
    pub fn upload_kernel_file(&mut self, path: &Path) -> Result<BufferId> {
        let id = self.device.upload_kernel_file(path)?;
        self.buffers.push(id);
        Ok(id)
    }

    /// Upload raw bytes into a fresh read-only buffer
    pub fn upload_bytes(&mut self, bytes: &[u8]) -> Result<BufferId> {
        let id = self.device.upload_bytes(bytes)?;
        self.buffers.push(id);
        Ok(id)
    }

    /// Launch a kernel
    pub fn start(&mut self, kernel: BufferId, args: BufferId) -> Result<()> {
        self.device.start(kernel, args)
    }

    /// Wait for the launch to complete
    pub fn ready_wait(&mut self, timeout: std::time::Duration) -> Result<()> {
        self.device.ready_wait(timeout)
    }

    /// Free one handle early
    pub fn release(&mut self, buffer: BufferId) -> Result<()> {
        self.buffers.retain(|&b| b != buffer);
        self.device.mem_free(buffer)
    }

    /// Free every handle, then close the device
    ///
    /// Keeps going after a failure so that one bad handle does not leak the
    /// rest; returns the first error. Running it again is a no-op.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_err = None;
        for buffer in std::mem::take(&mut self.buffers) {
            if let Err(e) = self.device.mem_free(buffer) {
                log::warn!("failed to free {}: {}", buffer, e);
                first_err.get_or_insert(e);
            }
        }
        if let Err(e) = self.device.close() {
            log::warn!("failed to close {}: {}", self.device.name(), e);
            first_err.get_or_insert(e);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<D: Device> Drop for TestContext<D> {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("cleanup on drop failed: {}", e);
        }
    }
}
