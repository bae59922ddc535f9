//! Device memory registry
//!
//! The simulated device has no address space of its own. Every allocation is a
//! byte vector stored under a `u64` handle, and handles are what travel inside
//! kernel argument records. Kernels resolve them back to memory through the
//! registry at launch time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::kernel::Kernel;

/// Handle to a device resource (memory buffer or loaded kernel)
///
/// Handles are never reused while the registry lives. `0` is never issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    /// Wrap a raw handle, e.g. one read back from a kernel argument record
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Device-side access mode of a buffer
///
/// Host copies are always allowed; the mode only restricts what a running
/// kernel may do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemAccess {
    /// Kernel may read only
    Read,
    /// Kernel may read and write
    Write,
}

impl MemAccess {
    /// Returns true if kernels may store into buffers with this mode
    pub fn device_writable(self) -> bool {
        matches!(self, Self::Write)
    }
}

enum Resource {
    Memory { bytes: Vec<u8>, access: MemAccess },
    Kernel(Arc<dyn Kernel>),
}

struct RegistryState {
    resources: HashMap<u64, Resource>,
    next_id: u64,
    bytes_in_use: usize,
}

/// Shared table of device resources
///
/// Cloning is cheap and yields another handle onto the same table, which is
/// how the launch worker sees the memory the host uploaded.
#[derive(Clone)]
pub struct MemoryRegistry {
    state: Arc<RwLock<RegistryState>>,
    limit: usize,
}

impl MemoryRegistry {
    /// Create an empty registry holding at most `limit` bytes of buffers
    pub fn new(limit: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                resources: HashMap::new(),
                next_id: 1,
                bytes_in_use: 0,
            })),
            limit,
        }
    }

    /// Capacity in bytes
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently held by memory buffers
    pub fn bytes_in_use(&self) -> usize {
        self.state.read().bytes_in_use
    }

    /// Number of live resources, kernels included
    pub fn live_buffers(&self) -> usize {
        self.state.read().resources.len()
    }

    /// Allocate a zero-filled buffer
    ///
    /// Zero-sized buffers are valid and still get a handle.
    pub fn allocate(&self, size: usize, access: MemAccess) -> Result<BufferId> {
        let mut state = self.state.write();
        let available = self.limit.saturating_sub(state.bytes_in_use);
        if size > available {
            return Err(Error::OutOfMemory { size, available });
        }
        state.bytes_in_use += size;
        let id = Self::issue(&mut state);
        state.resources.insert(
            id,
            Resource::Memory {
                bytes: vec![0; size],
                access,
            },
        );
        Ok(BufferId(id))
    }

    /// Allocate a buffer holding a copy of `bytes`
    pub fn insert_bytes(&self, bytes: &[u8], access: MemAccess) -> Result<BufferId> {
        let id = self.allocate(bytes.len(), access)?;
        self.write(id, 0, bytes)?;
        Ok(id)
    }

    /// Register a loaded kernel
    pub fn insert_kernel(&self, kernel: Arc<dyn Kernel>) -> BufferId {
        let mut state = self.state.write();
        let id = Self::issue(&mut state);
        state.resources.insert(id, Resource::Kernel(kernel));
        BufferId(id)
    }

    /// Free a resource
    pub fn release(&self, id: BufferId) -> Result<()> {
        let mut state = self.state.write();
        match state.resources.remove(&id.0) {
            Some(Resource::Memory { bytes, .. }) => {
                state.bytes_in_use -= bytes.len();
                Ok(())
            }
            Some(Resource::Kernel(_)) => Ok(()),
            None => Err(Error::BufferNotFound { id: id.0 }),
        }
    }

    /// Free every resource
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.resources.clear();
        state.bytes_in_use = 0;
    }

    /// Size of a memory buffer in bytes
    pub fn buffer_size(&self, id: BufferId) -> Result<usize> {
        let state = self.state.read();
        match state.resources.get(&id.0) {
            Some(Resource::Memory { bytes, .. }) => Ok(bytes.len()),
            _ => Err(Error::BufferNotFound { id: id.0 }),
        }
    }

    /// Host copy into a buffer at `offset`
    pub fn write(&self, id: BufferId, offset: usize, data: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        let (bytes, _access) = memory_mut(&mut state, id)?;
        let range = checked_range(id, offset, data.len(), bytes.len())?;
        bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Host copy out of a buffer starting at `offset`, filling `out`
    pub fn read(&self, id: BufferId, offset: usize, out: &mut [u8]) -> Result<()> {
        let state = self.state.read();
        let (bytes, _access) = memory(&state, id)?;
        let range = checked_range(id, offset, out.len(), bytes.len())?;
        out.copy_from_slice(&bytes[range]);
        Ok(())
    }

    /// Copy of a whole buffer
    pub fn read_bytes(&self, id: BufferId) -> Result<Vec<u8>> {
        let state = self.state.read();
        let (bytes, _access) = memory(&state, id)?;
        Ok(bytes.clone())
    }

    /// Whole buffer reinterpreted as elements of `T`
    ///
    /// Trailing bytes that do not form a whole element are ignored.
    pub fn read_typed<T: Pod>(&self, id: BufferId) -> Result<Vec<T>> {
        let state = self.state.read();
        let (bytes, _access) = memory(&state, id)?;
        let whole = bytes.len() / std::mem::size_of::<T>().max(1) * std::mem::size_of::<T>();
        Ok(bytemuck::pod_collect_to_vec(&bytes[..whole]))
    }

    /// Device-side store of `data` at element offset `offset`
    ///
    /// Fails with `AccessDenied` on buffers the kernel may not write.
    pub fn write_typed<T: Pod>(&self, id: BufferId, offset: usize, data: &[T]) -> Result<()> {
        let mut state = self.state.write();
        let (bytes, access) = memory_mut(&mut state, id)?;
        if !access.device_writable() {
            return Err(Error::AccessDenied { id: id.0, access });
        }
        let elem = std::mem::size_of::<T>();
        let src: &[u8] = bytemuck::cast_slice(data);
        let range = checked_range(id, offset.saturating_mul(elem), src.len(), bytes.len())?;
        bytes[range].copy_from_slice(src);
        Ok(())
    }

    /// Loaded kernel behind a handle
    pub fn kernel(&self, id: BufferId) -> Result<Arc<dyn Kernel>> {
        let state = self.state.read();
        match state.resources.get(&id.0) {
            Some(Resource::Kernel(kernel)) => Ok(Arc::clone(kernel)),
            _ => Err(Error::KernelNotFound {
                name: id.to_string(),
            }),
        }
    }

    fn issue(state: &mut RegistryState) -> u64 {
        let id = state.next_id;
        state.next_id += 1;
        id
    }
}

impl fmt::Debug for MemoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryRegistry")
            .field("live", &state.resources.len())
            .field("bytes_in_use", &state.bytes_in_use)
            .field("limit", &self.limit)
            .finish()
    }
}

fn memory(state: &RegistryState, id: BufferId) -> Result<(&Vec<u8>, MemAccess)> {
    match state.resources.get(&id.0) {
        Some(Resource::Memory { bytes, access }) => Ok((bytes, *access)),
        _ => Err(Error::BufferNotFound { id: id.0 }),
    }
}

fn memory_mut(state: &mut RegistryState, id: BufferId) -> Result<(&mut Vec<u8>, MemAccess)> {
    match state.resources.get_mut(&id.0) {
        Some(Resource::Memory { bytes, access }) => Ok((bytes, *access)),
        _ => Err(Error::BufferNotFound { id: id.0 }),
    }
}

fn checked_range(
    id: BufferId,
    offset: usize,
    len: usize,
    size: usize,
) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(Error::BufferAccess {
            id: id.0,
            offset,
            len,
            size,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_release() {
        let registry = MemoryRegistry::new(1024);
        let a = registry.allocate(100, MemAccess::Read).unwrap();
        let b = registry.allocate(0, MemAccess::Write).unwrap();
        assert_ne!(a, b);
        assert_ne!(a.raw(), 0);
        assert_eq!(registry.bytes_in_use(), 100);
        assert_eq!(registry.live_buffers(), 2);

        registry.release(a).unwrap();
        assert_eq!(registry.bytes_in_use(), 0);
        assert!(matches!(
            registry.release(a),
            Err(Error::BufferNotFound { .. })
        ));
    }

    #[test]
    fn test_out_of_memory() {
        let registry = MemoryRegistry::new(64);
        registry.allocate(48, MemAccess::Read).unwrap();
        let err = registry.allocate(32, MemAccess::Read).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfMemory {
                size: 32,
                available: 16
            }
        ));
    }

    #[test]
    fn test_host_copies() {
        let registry = MemoryRegistry::new(1024);
        let id = registry.allocate(8, MemAccess::Read).unwrap();
        registry.write(id, 2, &[1, 2, 3]).unwrap();

        let mut out = [0u8; 4];
        registry.read(id, 1, &mut out).unwrap();
        assert_eq!(out, [0, 1, 2, 3]);

        assert!(matches!(
            registry.write(id, 6, &[0; 3]),
            Err(Error::BufferAccess { offset: 6, len: 3, size: 8, .. })
        ));
    }

    #[test]
    fn test_typed_round_trip_and_access() {
        let registry = MemoryRegistry::new(1024);
        let src = registry
            .insert_bytes(bytemuck::cast_slice(&[1.5f32, -2.0]), MemAccess::Read)
            .unwrap();
        assert_eq!(registry.read_typed::<f32>(src).unwrap(), vec![1.5, -2.0]);
        assert!(matches!(
            registry.write_typed(src, 0, &[0.0f32]),
            Err(Error::AccessDenied { access: MemAccess::Read, .. })
        ));

        let dst = registry.allocate(12, MemAccess::Write).unwrap();
        registry.write_typed(dst, 1, &[7u32, 9]).unwrap();
        assert_eq!(registry.read_typed::<u32>(dst).unwrap(), vec![0, 7, 9]);
    }

    #[test]
    fn test_read_typed_ignores_partial_element() {
        let registry = MemoryRegistry::new(1024);
        let id = registry.insert_bytes(&[1, 0, 0, 0, 5], MemAccess::Read).unwrap();
        assert_eq!(registry.read_typed::<u32>(id).unwrap(), vec![1]);
    }

    #[test]
    fn test_kernel_handle_is_not_memory() {
        let registry = MemoryRegistry::new(1024);
        let mem = registry.allocate(4, MemAccess::Read).unwrap();
        assert!(matches!(
            registry.kernel(mem),
            Err(Error::KernelNotFound { .. })
        ));
        assert!(matches!(
            registry.read_bytes(BufferId::from_raw(999)),
            Err(Error::BufferNotFound { id: 999 })
        ));
    }
}
