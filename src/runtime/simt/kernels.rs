//! Kernel table: which kernel a kernel file loads

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::kernel::{Kernel, SpmmCsrKernel};

/// Maps kernel file stems to kernels
///
/// The simulated device cannot execute device binaries, so a kernel file is
/// identified by its stem: `kernel.vxbin` and `/opt/bin/kernel.elf` both load
/// the kernel registered as `"kernel"`.
#[derive(Clone, Default)]
pub struct KernelTable {
    entries: HashMap<String, Arc<dyn Kernel>>,
}

impl KernelTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table serving the CSR SpMM kernel for `T` as `"kernel"` and `"spmm"`
    pub fn spmm<T: Element>() -> Self {
        let kernel: Arc<dyn Kernel> = Arc::new(SpmmCsrKernel::<T>::new());
        let mut table = Self::new();
        table.register("kernel", Arc::clone(&kernel));
        table.register("spmm", kernel);
        table
    }

    /// Add or replace an entry
    pub fn register(&mut self, name: impl Into<String>, kernel: Arc<dyn Kernel>) {
        self.entries.insert(name.into(), kernel);
    }

    /// Look up a kernel by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Kernel>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::KernelNotFound {
                name: name.to_string(),
            })
    }

    /// Look up the kernel a kernel file refers to
    pub fn resolve(&self, path: &Path) -> Result<Arc<dyn Kernel>> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::KernelNotFound {
                name: path.display().to_string(),
            })?;
        self.get(stem)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for KernelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelTable")
            .field("names", &self.names())
            .finish()
    }
}
