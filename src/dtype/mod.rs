//! Element type system
//!
//! The harness is built for one element type at a time. `DType` names that
//! type at runtime (for logging and comparator selection), while the
//! [`Element`] trait connects it to a concrete Rust type.

mod element;

pub use element::Element;

use std::fmt;

/// Element types the SpMM pipeline can run on
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE 754 float
    F32,
    /// 64-bit IEEE 754 float
    F64,
    /// 32-bit signed integer
    I32,
    /// 32-bit unsigned integer
    U32,
}

impl DType {
    /// Size of one element in bytes
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 | Self::I32 | Self::U32 => 4,
        }
    }

    /// Returns true for floating-point types
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Returns true for integral types
    pub const fn is_int(self) -> bool {
        !self.is_float()
    }

    /// Short human-readable description used in run logs
    pub const fn type_str(self) -> &'static str {
        match self {
            Self::F32 => "float",
            Self::F64 => "double",
            Self::I32 => "integer",
            Self::U32 => "unsigned",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
            Self::U32 => "u32",
        };
        f.write_str(name)
    }
}
