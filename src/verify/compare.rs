//! Element comparison strategies

use crate::dtype::{DType, Element};

/// Default tolerance for floating point results, in units in the last place
pub const FLOAT_ULP: u32 = 6;

/// Distance between two values in units in the last place
///
/// Measured as the absolute difference of the bit patterns read as signed
/// integers. Equal values are 0 apart, so `+0` and `-0` match; a NaN on
/// either side is `u64::MAX` apart from everything.
///
/// For integral types this is the plain absolute difference.
///
/// ```
/// use simt_spmm::verify::ulp_distance;
///
/// let x = 1.0f32;
/// let next = f32::from_bits(x.to_bits() + 3);
/// assert_eq!(ulp_distance(x, next), 3);
/// assert_eq!(ulp_distance(0.0f32, -0.0), 0);
/// ```
#[inline]
pub fn ulp_distance<T: Element>(a: T, b: T) -> u64 {
    if a.is_nan() || b.is_nan() {
        return u64::MAX;
    }
    if a == b {
        return 0;
    }
    a.ordered_bits().abs_diff(b.ordered_bits())
}

/// How an actual result is checked against the reference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    /// Bitwise-equal values only
    Exact,
    /// Values at most `max_ulps` apart (see [`ulp_distance`])
    Ulp {
        /// Largest accepted distance
        max_ulps: u32,
    },
}

impl Comparator {
    /// `Ulp { FLOAT_ULP }` for floating point types, `Exact` otherwise
    pub fn for_dtype(dtype: DType) -> Self {
        if dtype.is_float() {
            Self::Ulp {
                max_ulps: FLOAT_ULP,
            }
        } else {
            Self::Exact
        }
    }

    /// Comparator for element type `T`
    pub fn for_element<T: Element>() -> Self {
        Self::for_dtype(T::DTYPE)
    }

    /// Returns true if `actual` is accepted for `expected`
    #[inline]
    pub fn matches<T: Element>(&self, expected: T, actual: T) -> bool {
        match *self {
            Self::Exact => expected == actual,
            Self::Ulp { max_ulps } => ulp_distance(expected, actual) <= max_ulps as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ulps_up(x: f32, n: u32) -> f32 {
        f32::from_bits(x.to_bits() + n)
    }

    #[test]
    fn test_ulp_distance() {
        assert_eq!(ulp_distance(1.0f32, 1.0), 0);
        assert_eq!(ulp_distance(1.0f32, ulps_up(1.0, 6)), 6);
        assert_eq!(ulp_distance(ulps_up(1.0, 6), 1.0f32), 6);
        assert_eq!(ulp_distance(0.0f32, -0.0), 0);
        assert_eq!(ulp_distance(f32::NAN, 1.0), u64::MAX);
        assert_eq!(ulp_distance(f32::NAN, f32::NAN), u64::MAX);
        assert_eq!(ulp_distance(3i32, -4), 7);
    }

    #[test]
    fn test_ulp_tolerance_boundary() {
        let cmp = Comparator::for_element::<f32>();
        assert_eq!(cmp, Comparator::Ulp { max_ulps: 6 });
        assert!(cmp.matches(0.75f32, ulps_up(0.75, 6)));
        assert!(!cmp.matches(0.75f32, ulps_up(0.75, 7)));
        assert!(!cmp.matches(1.0f32, f32::NAN));
    }

    #[test]
    fn test_exact_for_integers() {
        let cmp = Comparator::for_dtype(DType::I32);
        assert_eq!(cmp, Comparator::Exact);
        assert!(cmp.matches(42i32, 42));
        assert!(!cmp.matches(42i32, 43));
        assert_eq!(Comparator::for_element::<u32>(), Comparator::Exact);
    }

    #[test]
    fn test_f64_uses_ulps() {
        let cmp = Comparator::for_element::<f64>();
        let x = 2.5f64;
        assert!(cmp.matches(x, f64::from_bits(x.to_bits() + 6)));
        assert!(!cmp.matches(x, f64::from_bits(x.to_bits() - 7)));
    }
}
