//! Kernel argument record
//!
//! The host fills one [`KernelArgs`] per launch and uploads its raw bytes;
//! the kernel decodes them on the device side. Layout is fixed (`repr(C)`,
//! 64 bytes, no padding):
//!
//! ```text
//! offset  field        type
//!      0  grid_dim     [u32; 2]
//!      8  m            u32
//!     12  n            u32
//!     16  k            u32
//!     20  nnz          u32
//!     24  a_val        u64   buffer handle
//!     32  a_col        u64   buffer handle
//!     40  a_row_ptr    u64   buffer handle
//!     48  b            u64   buffer handle
//!     56  c            u64   buffer handle
//! ```

use bytemuck::{Pod, Zeroable};

use super::grid::GridDim;
use crate::error::{Error, Result};
use crate::runtime::BufferId;

/// Argument record of the CSR SpMM kernel
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct KernelArgs {
    /// Launch grid `[x, y]` = `[n, m]`
    pub grid_dim: [u32; 2],
    /// Rows of A and C
    pub m: u32,
    /// Columns of B and C
    pub n: u32,
    /// Columns of A, rows of B
    pub k: u32,
    /// Stored non-zeros of A
    pub nnz: u32,
    /// Handle of A's values
    pub a_val: u64,
    /// Handle of A's column indices
    pub a_col: u64,
    /// Handle of A's row pointers
    pub a_row_ptr: u64,
    /// Handle of the dense operand B
    pub b: u64,
    /// Handle of the output C
    pub c: u64,
}

const _: () = assert!(std::mem::size_of::<KernelArgs>() == KernelArgs::SIZE);

impl KernelArgs {
    /// Encoded size in bytes
    pub const SIZE: usize = 64;

    /// Record for an `m x k` by `k x n` product with `nnz` stored entries
    ///
    /// The grid is `(n, m)`: one thread per output element. Buffer handles
    /// start out null; set them with [`KernelArgs::with_buffers`].
    pub fn new(m: u32, n: u32, k: u32, nnz: u32) -> Self {
        Self {
            grid_dim: GridDim::planar(n, m).to_args(),
            m,
            n,
            k,
            nnz,
            ..Self::zeroed()
        }
    }

    /// Set the five operand handles
    pub fn with_buffers(
        mut self,
        a_val: BufferId,
        a_col: BufferId,
        a_row_ptr: BufferId,
        b: BufferId,
        c: BufferId,
    ) -> Self {
        self.a_val = a_val.raw();
        self.a_col = a_col.raw();
        self.a_row_ptr = a_row_ptr.raw();
        self.b = b.raw();
        self.c = c.raw();
        self
    }

    /// Override the launch grid
    pub fn with_grid(mut self, grid: GridDim) -> Self {
        self.grid_dim = grid.to_args();
        self
    }

    /// Launch grid
    pub fn grid(&self) -> GridDim {
        GridDim::from_args(self.grid_dim)
    }

    /// Raw bytes, as uploaded to the device
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode a record from device bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::Launch(format!(
                "argument record is {} bytes, expected {}",
                bytes.len(),
                Self::SIZE
            )));
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Handle of A's values
    pub fn a_val_id(&self) -> BufferId {
        BufferId::from_raw(self.a_val)
    }

    /// Handle of A's column indices
    pub fn a_col_id(&self) -> BufferId {
        BufferId::from_raw(self.a_col)
    }

    /// Handle of A's row pointers
    pub fn a_row_ptr_id(&self) -> BufferId {
        BufferId::from_raw(self.a_row_ptr)
    }

    /// Handle of B
    pub fn b_id(&self) -> BufferId {
        BufferId::from_raw(self.b)
    }

    /// Handle of C
    pub fn c_id(&self) -> BufferId {
        BufferId::from_raw(self.c)
    }
}
