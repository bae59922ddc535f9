//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use rand::Rng;
use std::fmt;

/// Exclusive upper bound for generated integral values.
///
/// Keeps a default-sized row dot product well inside `i32`.
const INT_GENERATE_BOUND: u32 = 1024;

/// Trait for types that can be elements of the sparse and dense operands
///
/// # Bounds
/// - `Pod + Zeroable` - device buffers are plain bytes (bytemuck)
/// - `PartialEq + Display` - comparison and mismatch reporting
///
/// Accumulation goes through [`Element::mul_add_acc`] so kernel and reference
/// apply the exact same operation per step.
pub trait Element:
    Copy + Send + Sync + Pod + Zeroable + PartialEq + fmt::Debug + fmt::Display + 'static
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// One accumulation step: `self + a * b`
    ///
    /// Integral types wrap on overflow; floats round each operation separately
    /// (no fused multiply-add).
    fn mul_add_acc(self, a: Self, b: Self) -> Self;

    /// Draw a value from the generator used for test operands
    ///
    /// Floats: uniform in `[0, 1)`. Integers: uniform in `[0, 1024)`.
    fn generate<R: Rng>(rng: &mut R) -> Self;

    /// Bit pattern reinterpreted as a signed integer, widened to i64
    ///
    /// For floats this is the representation the ULP distance is measured on.
    fn ordered_bits(self) -> i64;

    /// Returns true if the value is NaN
    #[inline]
    fn is_nan(self) -> bool {
        false
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn mul_add_acc(self, a: Self, b: Self) -> Self {
        self + a * b
    }

    #[inline]
    fn generate<R: Rng>(rng: &mut R) -> Self {
        rng.random::<f32>()
    }

    #[inline]
    fn ordered_bits(self) -> i64 {
        self.to_bits() as i32 as i64
    }

    #[inline]
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn mul_add_acc(self, a: Self, b: Self) -> Self {
        self + a * b
    }

    #[inline]
    fn generate<R: Rng>(rng: &mut R) -> Self {
        rng.random::<f64>()
    }

    #[inline]
    fn ordered_bits(self) -> i64 {
        self.to_bits() as i64
    }

    #[inline]
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;

    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn one() -> Self {
        1
    }

    #[inline]
    fn mul_add_acc(self, a: Self, b: Self) -> Self {
        self.wrapping_add(a.wrapping_mul(b))
    }

    #[inline]
    fn generate<R: Rng>(rng: &mut R) -> Self {
        rng.random_range(0..INT_GENERATE_BOUND as i32)
    }

    #[inline]
    fn ordered_bits(self) -> i64 {
        self as i64
    }
}

impl Element for u32 {
    const DTYPE: DType = DType::U32;

    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn one() -> Self {
        1
    }

    #[inline]
    fn mul_add_acc(self, a: Self, b: Self) -> Self {
        self.wrapping_add(a.wrapping_mul(b))
    }

    #[inline]
    fn generate<R: Rng>(rng: &mut R) -> Self {
        rng.random_range(0..INT_GENERATE_BOUND)
    }

    #[inline]
    fn ordered_bits(self) -> i64 {
        self as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_mul_add_acc_int_wraps() {
        assert_eq!(i32::MAX.mul_add_acc(1, 1), i32::MIN);
        assert_eq!(3i32.mul_add_acc(4, 5), 23);
        assert_eq!(u32::MAX.mul_add_acc(1, 1), 0);
    }

    #[test]
    fn test_mul_add_acc_float() {
        assert_eq!(1.0f32.mul_add_acc(2.0, 3.0), 7.0);
        assert_eq!(0.5f64.mul_add_acc(0.5, 0.5), 0.75);
    }

    #[test]
    fn test_generate_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let f = f32::generate(&mut rng);
            assert!((0.0..1.0).contains(&f), "f32 sample {} out of range", f);
            let i = i32::generate(&mut rng);
            assert!((0..1024).contains(&i), "i32 sample {} out of range", i);
        }
    }

    #[test]
    fn test_ordered_bits_sign() {
        assert!((-1.0f32).ordered_bits() < 0);
        assert!(1.0f32.ordered_bits() > 0);
        assert_eq!(1.0f32.ordered_bits(), 0x3f80_0000);
        assert_eq!((-5i32).ordered_bits(), -5);
    }
}
