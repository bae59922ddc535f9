//! One end-to-end SpMM test run

use std::time::{Duration, Instant};

use log::{debug, info};

use super::config::HarnessConfig;
use super::context::TestContext;
use crate::dtype::Element;
use crate::error::Result;
use crate::kernel::KernelArgs;
use crate::runtime::{Device, KernelTable, MemAccess, SimtDevice};
use crate::sparse::SpmmProblem;
use crate::verify::{VerificationReport, Verifier, spmm_reference};

/// What a completed run produced
#[derive(Clone, Debug)]
pub struct RunOutcome<T> {
    /// Stored non-zeros of the generated A
    pub nnz: usize,
    /// Time from launch to completion
    pub elapsed: Duration,
    /// Verification result
    pub report: VerificationReport<T>,
}

impl<T> RunOutcome<T> {
    /// Returns true if the device result matched the reference everywhere
    pub fn passed(&self) -> bool {
        self.report.passed()
    }

    /// Process exit status: 0 on success, else the saturated error count
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

/// Run the SpMM test on a freshly opened simulated device
///
/// The device serves the CSR SpMM kernel for `T` under the names `kernel` and
/// `spmm`.
pub fn run_simt<T: Element>(config: &HarnessConfig) -> Result<RunOutcome<T>> {
    config.validate()?;
    info!("open device connection");
    let device = SimtDevice::open(config.device.clone(), KernelTable::spmm::<T>())?;
    run_spmm(config, device)
}

/// Run the SpMM test on `device`
///
/// Generates the operands, uploads them, launches the kernel named by
/// `config.kernel_file`, waits, downloads C and verifies it against the CPU
/// reference. The device is closed before returning, on success and on
/// failure alike.
///
/// # Errors
///
/// Any device, transfer, launch or timeout failure. Verification mismatches
/// are not errors; they are counted in the outcome's report.
pub fn run_spmm<T: Element, D: Device>(config: &HarnessConfig, device: D) -> Result<RunOutcome<T>> {
    config.validate()?;
    let mut ctx = TestContext::new(device);

    let (m, n, k) = (config.m, config.n, config.k);
    info!("data type: {}", T::DTYPE.type_str());
    info!("matrix sizes: A({m}x{k}), B({k}x{n}), C({m}x{n})");
    info!("sparsity: {}%", config.sparsity * 100.0);

    let problem = SpmmProblem::<T>::generate(
        m as usize,
        n as usize,
        k as usize,
        config.sparsity,
        config.seed,
    )?;
    let a = &problem.a;
    let nnz = a.nnz();
    info!("nnz: {} ({}%)", nnz, 100.0 * a.density());

    let elem = std::mem::size_of::<T>();
    let idx = std::mem::size_of::<u32>();

    info!("allocate device memory");
    let a_val = ctx.alloc(nnz * elem, MemAccess::Read)?;
    let a_col = ctx.alloc(nnz * idx, MemAccess::Read)?;
    let a_row_ptr = ctx.alloc(a.row_ptr().len() * idx, MemAccess::Read)?;
    let b = ctx.alloc(problem.b.len() * elem, MemAccess::Read)?;
    let c_len = m as usize * n as usize;
    let c = ctx.alloc(c_len * elem, MemAccess::Write)?;
    debug!("A_val={a_val} A_col={a_col} A_row_ptr={a_row_ptr} B={b} C={c}");

    let args = KernelArgs::new(m, n, k, nnz as u32).with_buffers(a_val, a_col, a_row_ptr, b, c);

    info!("upload sparse matrix A (values)");
    ctx.write(a_val, a.values())?;
    info!("upload sparse matrix A (column indices)");
    ctx.write(a_col, a.col_index())?;
    info!("upload sparse matrix A (row pointers)");
    ctx.write(a_row_ptr, a.row_ptr())?;
    info!("upload matrix B buffer");
    ctx.write(b, &problem.b)?;

    info!("upload kernel binary");
    let kernel = ctx.upload_kernel_file(&config.kernel_file)?;
    info!("upload kernel argument");
    let args_buffer = ctx.upload_bytes(args.as_bytes())?;

    let started = Instant::now();
    info!("start device");
    ctx.start(kernel, args_buffer)?;
    info!("wait for completion");
    ctx.ready_wait(config.timeout)?;
    let elapsed = started.elapsed();
    info!("elapsed time: {} ms", elapsed.as_millis());

    info!("download destination buffer");
    let result: Vec<T> = ctx.read(c, c_len)?;

    info!("verify result");
    let expected = spmm_reference(a, &problem.b, n as usize)?;
    let report = Verifier::for_element::<T>().verify(&result, &expected)?;

    info!("cleanup");
    ctx.cleanup()?;

    Ok(RunOutcome {
        nnz,
        elapsed,
        report,
    })
}
