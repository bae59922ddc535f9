//! SpMM regression binary
//!
//! Generates a random CSR problem, runs the SpMM kernel on the simulated SIMT
//! device and verifies the result. Exit status is 0 on success, the number of
//! mismatching elements (at most 255) on verification failure, and -1 on any
//! other failure.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use env_logger::Env;
use log::error;

use simt_spmm::harness::{HarnessConfig, run_simt};

#[cfg(feature = "integer")]
type HarnessElement = i32;
#[cfg(not(feature = "integer"))]
type HarnessElement = f32;

#[derive(Parser, Debug)]
#[command(
    name = "simt-spmm",
    about = "Sparse matrix multiplication test on a simulated SIMT device",
    after_help = "Environment Variables:\n  RUST_LOG=debug    Show buffer handles and launch statistics"
)]
struct Cli {
    /// Kernel file to load
    #[arg(short = 'k', long = "kernel", default_value = "kernel.vxbin")]
    kernel: PathBuf,

    /// Rows of the sparse matrix A
    #[arg(short = 'm', long = "rows", default_value_t = 32)]
    m: u32,

    /// Columns of the dense matrix B
    #[arg(short = 'n', long = "cols", default_value_t = 32)]
    n: u32,

    /// Fraction of A's cells left empty, in [0, 1)
    #[arg(short = 's', long = "sparsity", default_value_t = 0.9)]
    sparsity: f32,

    /// Columns of A and rows of B
    #[arg(long, default_value_t = 32)]
    depth: u32,

    /// Seed of the operand generator
    #[arg(long, default_value_t = 50)]
    seed: u64,

    /// How long to wait for the kernel, in milliseconds
    #[arg(long = "timeout-ms", default_value_t = 86_400_000)]
    timeout_ms: u64,
}

impl Cli {
    fn into_config(self) -> HarnessConfig {
        HarnessConfig::default()
            .with_dims(self.m, self.n, self.depth)
            .with_sparsity(self.sparsity)
            .with_seed(self.seed)
            .with_kernel_file(self.kernel)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => -1,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let config = cli.into_config();
    match run_simt::<HarnessElement>(&config) {
        Ok(outcome) if outcome.passed() => {
            println!("PASSED!");
            0
        }
        Ok(outcome) => {
            println!("Found {} errors!", outcome.report.errors);
            println!("FAILED!");
            outcome.exit_code()
        }
        Err(e) => {
            error!("{}", e);
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = Cli::try_parse_from(["simt-spmm"]).unwrap().into_config();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::try_parse_from(["simt-spmm", "-m", "4", "-n", "8", "-s", "0.25", "-k", "spmm.elf"])
            .unwrap();
        let config = cli.into_config();
        assert_eq!((config.m, config.n, config.k), (4, 8, 32));
        assert_eq!(config.sparsity, 0.25);
        assert_eq!(config.kernel_file, PathBuf::from("spmm.elf"));
    }

    #[test]
    fn test_cli_help_and_unknown_flags() {
        let help = Cli::try_parse_from(["simt-spmm", "-h"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        let bad = Cli::try_parse_from(["simt-spmm", "-x"]).unwrap_err();
        assert_eq!(bad.kind(), ErrorKind::UnknownArgument);
    }
}
