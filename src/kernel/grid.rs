//! Grid dispatch model
//!
//! A launch covers a 2-D grid of independent threads. Each thread is handed
//! its coordinate and returns at most one `(index, value)` pair for the output
//! buffer. Threads never see each other's results; the scatter step afterwards
//! checks that every output cell has a single producer.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Below this many threads the grid runs serially (rayon overhead > benefit)
#[cfg(feature = "rayon")]
const PARALLEL_THRESHOLD: usize = 4096;

/// Grid dimensions: `x` threads per row, `y` rows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridDim {
    /// Threads along the fast axis
    pub x: u32,
    /// Threads along the slow axis
    pub y: u32,
}

impl GridDim {
    /// 1-D grid of `x` threads
    pub const fn linear(x: u32) -> Self {
        Self { x, y: 1 }
    }

    /// 2-D grid of `x * y` threads
    pub const fn planar(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Grid from the `grid_dim` field of a kernel argument record
    pub const fn from_args(grid_dim: [u32; 2]) -> Self {
        Self {
            x: grid_dim[0],
            y: grid_dim[1],
        }
    }

    /// Back to the `grid_dim` encoding
    pub const fn to_args(self) -> [u32; 2] {
        [self.x, self.y]
    }

    /// Total number of threads
    pub const fn num_threads(self) -> u64 {
        self.x as u64 * self.y as u64
    }

    /// Round each dimension up to a multiple of `group`
    ///
    /// Hardware schedules whole groups, so the extra threads exist but fall
    /// outside the problem and do nothing. A group of 0 or 1 leaves the grid
    /// unchanged.
    pub fn padded_to(self, group: u32) -> Self {
        if group <= 1 {
            return self;
        }
        let pad = |d: u32| d.div_ceil(group).saturating_mul(group);
        Self {
            x: pad(self.x),
            y: pad(self.y),
        }
    }

    /// Coordinate of the thread with flat index `flat`
    ///
    /// `x = flat mod grid.x`, `y = flat div grid.x`.
    #[inline]
    pub fn coord(self, flat: u64) -> ThreadCoord {
        let width = self.x.max(1) as u64;
        ThreadCoord {
            x: (flat % width) as u32,
            y: (flat / width) as u32,
        }
    }
}

/// Position of one thread in the grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ThreadCoord {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl ThreadCoord {
    /// Returns true if the thread lands inside a `rows x cols` problem
    #[inline]
    pub fn within(self, cols: usize, rows: usize) -> bool {
        (self.x as usize) < cols && (self.y as usize) < rows
    }
}

/// What a launch did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaunchStats {
    /// Threads dispatched, padding included
    pub threads: u64,
    /// Threads that produced an output
    pub active: usize,
}

/// Run `body` once per grid thread and scatter the results into `output`
///
/// # Errors
///
/// - `InvalidArgument` if the grid has more threads than the host can index
/// - `PartitionViolation` if a thread targets an index outside `output`, or
///   two threads target the same index
pub fn launch<T, F>(grid: GridDim, output: &mut [T], body: F) -> Result<LaunchStats>
where
    T: Copy + Send,
    F: Fn(ThreadCoord) -> Option<(usize, T)> + Sync,
{
    let threads = grid.num_threads();
    let count = usize::try_from(threads).map_err(|_| {
        Error::invalid_argument("grid", format!("{} threads exceed the host index space", threads))
    })?;

    let results = dispatch(grid, count, &body);

    let mut written = vec![false; output.len()];
    for &(index, value) in &results {
        let Some(slot) = written.get_mut(index) else {
            return Err(Error::PartitionViolation {
                index,
                reason: "index outside the output buffer",
            });
        };
        if std::mem::replace(slot, true) {
            return Err(Error::PartitionViolation {
                index,
                reason: "written by more than one thread",
            });
        }
        output[index] = value;
    }

    Ok(LaunchStats {
        threads,
        active: results.len(),
    })
}

fn dispatch<T, F>(grid: GridDim, count: usize, body: &F) -> Vec<(usize, T)>
where
    T: Copy + Send,
    F: Fn(ThreadCoord) -> Option<(usize, T)> + Sync,
{
    #[cfg(feature = "rayon")]
    if count >= PARALLEL_THRESHOLD {
        return (0..count)
            .into_par_iter()
            .filter_map(|flat| body(grid.coord(flat as u64)))
            .collect();
    }

    (0..count)
        .filter_map(|flat| body(grid.coord(flat as u64)))
        .collect()
}
