//! Result checking and error reporting

use std::fmt;

use super::compare::Comparator;
use crate::dtype::Element;
use crate::error::{Error, Result};

/// Mismatches logged and kept per verification; the rest are only counted
pub const MAX_REPORTED_ERRORS: usize = 100;

/// Largest exit status a failed verification maps to
pub const MAX_EXIT_CODE: i32 = 255;

/// One output element that failed the comparison
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mismatch<T> {
    /// Flat index into the output
    pub index: usize,
    /// Reference value
    pub expected: T,
    /// Value the device produced
    pub actual: T,
}

impl<T: fmt::Display> fmt::Display for Mismatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] expected={}, actual={}",
            self.index, self.expected, self.actual
        )
    }
}

/// Outcome of one verification
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationReport<T> {
    /// Elements compared
    pub checked: usize,
    /// Elements that failed, all of them
    pub errors: usize,
    /// The first failures, at most the verifier's report limit
    pub mismatches: Vec<Mismatch<T>>,
}

impl<T> VerificationReport<T> {
    /// Returns true if every element matched
    pub fn passed(&self) -> bool {
        self.errors == 0
    }

    /// Process exit status for this outcome: 0 on success, else the error
    /// count saturated at [`MAX_EXIT_CODE`]
    ///
    /// Only the low 8 bits of a status reach the parent process, so larger
    /// counts would wrap and 256 errors would read as success.
    pub fn exit_code(&self) -> i32 {
        self.errors.min(MAX_EXIT_CODE as usize) as i32
    }
}

/// Compares device output to a reference with a [`Comparator`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verifier {
    comparator: Comparator,
    max_reported: usize,
}

impl Verifier {
    /// Verifier with the given comparator and the default report limit
    pub fn new(comparator: Comparator) -> Self {
        Self {
            comparator,
            max_reported: MAX_REPORTED_ERRORS,
        }
    }

    /// Verifier suited to element type `T`
    pub fn for_element<T: Element>() -> Self {
        Self::new(Comparator::for_element::<T>())
    }

    /// Change how many mismatches are logged and kept
    pub fn with_max_reported(mut self, max_reported: usize) -> Self {
        self.max_reported = max_reported;
        self
    }

    /// Comparator in use
    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    /// Compare `actual` against `expected` element by element
    ///
    /// Every mismatch is counted; the first `max_reported` are logged at
    /// error level and kept in the report.
    pub fn verify<T: Element>(&self, actual: &[T], expected: &[T]) -> Result<VerificationReport<T>> {
        if actual.len() != expected.len() {
            return Err(Error::shape_mismatch(&[expected.len()], &[actual.len()]));
        }

        let mut errors = 0;
        let mut mismatches = Vec::new();
        for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
            if self.comparator.matches(e, a) {
                continue;
            }
            if errors < self.max_reported {
                let mismatch = Mismatch {
                    index,
                    expected: e,
                    actual: a,
                };
                log::error!("*** error: {}", mismatch);
                mismatches.push(mismatch);
            }
            errors += 1;
        }

        Ok(VerificationReport {
            checked: actual.len(),
            errors,
            mismatches,
        })
    }
}
