//! Random CSR construction
//!
//! Operands are generated on the fly from a single seeded random stream:
//! the sparse matrix A is scanned row-major with columns increasing, then the
//! dense matrix B is filled from the same stream. A fixed seed therefore
//! reproduces the exact same problem.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::CsrMatrix;
use crate::dtype::Element;
use crate::error::{Error, Result};

/// Builds a random CSR matrix with a target sparsity
#[derive(Clone, Debug)]
pub struct CsrBuilder {
    rows: usize,
    cols: usize,
    sparsity: f32,
}

impl CsrBuilder {
    /// Create a builder for an `rows x cols` matrix with sparsity 0 (fully populated)
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            sparsity: 0.0,
        }
    }

    /// Fraction of cells expected to be empty, in `[0, 1)`
    pub fn sparsity(mut self, sparsity: f32) -> Self {
        self.sparsity = sparsity;
        self
    }

    /// Generate the matrix
    ///
    /// Every cell draws `u ~ U[0, 1)`; the cell is stored iff `u >= sparsity`,
    /// so it is non-zero with probability `1 - sparsity`. A stored cell then
    /// draws its value with [`Element::generate`] from the same stream.
    pub fn build<T: Element, R: Rng>(&self, rng: &mut R) -> Result<CsrMatrix<T>> {
        self.check()?;

        let mut row_ptr = Vec::with_capacity(self.rows + 1);
        let mut col_index = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0u32);

        for _row in 0..self.rows {
            for col in 0..self.cols {
                let draw: f32 = rng.random();
                if draw >= self.sparsity {
                    values.push(T::generate(rng));
                    col_index.push(col as u32);
                }
            }
            row_ptr.push(values.len() as u32);
        }

        CsrMatrix::new(row_ptr, col_index, values, [self.rows, self.cols])
    }

    fn check(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.sparsity) {
            return Err(Error::invalid_argument(
                "sparsity",
                format!("must be in [0, 1), got {}", self.sparsity),
            ));
        }
        let cells = self.rows.checked_mul(self.cols);
        if cells.is_none_or(|c| c > u32::MAX as usize) {
            return Err(Error::invalid_argument(
                "shape",
                format!(
                    "{}x{} matrix exceeds the u32 index space",
                    self.rows, self.cols
                ),
            ));
        }
        Ok(())
    }
}

/// One SpMM test problem: `C (m x n) = A (m x k, CSR) * B (k x n, dense)`
#[derive(Clone, Debug, PartialEq)]
pub struct SpmmProblem<T: Element> {
    /// Sparse left operand
    pub a: CsrMatrix<T>,
    /// Dense right operand, row-major `k x n`
    pub b: Vec<T>,
    /// Number of output columns
    pub n: usize,
    /// Seed the operands were generated from
    pub seed: u64,
}

impl<T: Element> SpmmProblem<T> {
    /// Generate A then B from one stream seeded with `seed`
    pub fn generate(m: usize, n: usize, k: usize, sparsity: f32, seed: u64) -> Result<Self> {
        let dense_len = k.checked_mul(n).filter(|&len| len <= u32::MAX as usize);
        let Some(dense_len) = dense_len else {
            return Err(Error::invalid_argument(
                "shape",
                format!("{}x{} dense operand exceeds the u32 index space", k, n),
            ));
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let a = CsrBuilder::new(m, k).sparsity(sparsity).build(&mut rng)?;
        let b = (0..dense_len).map(|_| T::generate(&mut rng)).collect();

        Ok(Self { a, b, n, seed })
    }

    /// Problem dimensions `(m, n, k)`
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.a.nrows(), self.n, self.a.ncols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sparsity_is_fully_populated() {
        let mut rng = StdRng::seed_from_u64(1);
        let csr: CsrMatrix<f32> = CsrBuilder::new(5, 7).build(&mut rng).unwrap();
        assert_eq!(csr.nnz(), 35);
        for row in 0..5 {
            let cols: Vec<u32> = csr.col_index()[csr.row_range(row)].to_vec();
            assert_eq!(cols, (0..7).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn test_rejects_sparsity_out_of_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for s in [1.0f32, 1.5, -0.1, f32::NAN] {
            let result = CsrBuilder::new(2, 2).sparsity(s).build::<f32, _>(&mut rng);
            assert!(
                matches!(result, Err(Error::InvalidArgument { arg: "sparsity", .. })),
                "sparsity {} accepted",
                s
            );
        }
    }

    #[test]
    fn test_high_sparsity_yields_fewer_entries() {
        let mut rng = StdRng::seed_from_u64(3);
        let csr: CsrMatrix<i32> = CsrBuilder::new(64, 64).sparsity(0.9).build(&mut rng).unwrap();
        // Expected ~410 of 4096; generous bounds
        assert!(csr.nnz() > 200 && csr.nnz() < 700, "nnz = {}", csr.nnz());
    }

    #[test]
    fn test_problem_is_reproducible() {
        let p1 = SpmmProblem::<f32>::generate(16, 8, 12, 0.5, 50).unwrap();
        let p2 = SpmmProblem::<f32>::generate(16, 8, 12, 0.5, 50).unwrap();
        let p3 = SpmmProblem::<f32>::generate(16, 8, 12, 0.5, 51).unwrap();
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
        assert_eq!(p1.dims(), (16, 8, 12));
        assert_eq!(p1.b.len(), 12 * 8);
    }
}
