#![allow(dead_code)]

use fluxbench::{Bencher, flux};
use std::hint::black_box;

use simt_spmm::prelude::*;
use simt_spmm::kernel::spmm_csr_grid;

fn problem(size: usize, sparsity: f32) -> SpmmProblem<f32> {
    SpmmProblem::generate(size, size, size, sparsity, 50).unwrap()
}

// ---------------------------------------------------------------------------
// Grid kernel vs sequential reference (parameterized)
// ---------------------------------------------------------------------------

#[flux::bench(group = "spmm_grid_f32", args = [32, 128, 256])]
fn grid_s90(b: &mut Bencher, size: usize) {
    let p = problem(size, 0.9);
    let grid = GridDim::planar(size as u32, size as u32);
    b.iter(|| black_box(spmm_csr_grid(&p.a, &p.b, size, grid).unwrap()));
}

#[flux::bench(group = "spmm_reference_f32", args = [32, 128, 256])]
fn reference_s90(b: &mut Bencher, size: usize) {
    let p = problem(size, 0.9);
    b.iter(|| black_box(spmm_reference(&p.a, &p.b, size).unwrap()));
}

// ---------------------------------------------------------------------------
// Sparsity sweep at a fixed size
// ---------------------------------------------------------------------------

#[flux::bench(group = "spmm_sparsity_f32")]
fn grid_256_s50(b: &mut Bencher) {
    let p = problem(256, 0.5);
    b.iter(|| black_box(spmm_csr_grid(&p.a, &p.b, 256, GridDim::planar(256, 256)).unwrap()));
}

#[flux::bench(group = "spmm_sparsity_f32")]
fn grid_256_s99(b: &mut Bencher) {
    let p = problem(256, 0.99);
    b.iter(|| black_box(spmm_csr_grid(&p.a, &p.b, 256, GridDim::planar(256, 256)).unwrap()));
}

// ---------------------------------------------------------------------------
// Full harness: upload, launch, wait, download, verify
// ---------------------------------------------------------------------------

#[flux::bench(group = "spmm_harness")]
fn harness_default(b: &mut Bencher) {
    let config = HarnessConfig::default();
    b.iter(|| black_box(run_simt::<f32>(&config).unwrap()));
}

fn main() {
    if let Err(e) = fluxbench::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
