//! Built-in catalogue of binary table element types.
//!
//! Each primitive binds the one-character TFORM code used on disk (FITS
//! standard, section 7.3) to an in-memory element type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a binary table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Boolean, TFORM `L`.
    Logical,
    /// Single bit, TFORM `X`. Materialized as booleans.
    Bit,
    /// Unsigned 8 bit integer, TFORM `B`.
    Byte,
    /// Signed 16 bit integer, TFORM `I`.
    Int16,
    /// Signed 32 bit integer, TFORM `J`.
    Int32,
    /// Signed 64 bit integer, TFORM `K`.
    Int64,
    /// Single precision float, TFORM `E`.
    Float32,
    /// Double precision float, TFORM `D`.
    Float64,
    /// Single precision complex, TFORM `C`.
    Complex64,
    /// Double precision complex, TFORM `M`.
    Complex128,
    /// Single byte character, TFORM `A`.
    Char,
}

impl DataType {
    /// The on-disk TFORM type code.
    pub fn tform_code(self) -> char {
        match self {
            DataType::Logical => 'L',
            DataType::Bit => 'X',
            DataType::Byte => 'B',
            DataType::Int16 => 'I',
            DataType::Int32 => 'J',
            DataType::Int64 => 'K',
            DataType::Float32 => 'E',
            DataType::Float64 => 'D',
            DataType::Complex64 => 'C',
            DataType::Complex128 => 'M',
            DataType::Char => 'A',
        }
    }

    /// Look a primitive up by its TFORM code.
    pub fn from_tform_code(code: char) -> Option<Self> {
        Some(match code {
            'L' => DataType::Logical,
            'X' => DataType::Bit,
            'B' => DataType::Byte,
            'I' => DataType::Int16,
            'J' => DataType::Int32,
            'K' => DataType::Int64,
            'E' => DataType::Float32,
            'D' => DataType::Float64,
            'C' => DataType::Complex64,
            'M' => DataType::Complex128,
            'A' => DataType::Char,
            _ => return None,
        })
    }

    pub fn is_logical(self) -> bool {
        matches!(self, DataType::Logical | DataType::Bit)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DataType::Complex64 | DataType::Complex128)
    }

    /// True for every type that participates in unit-bearing arithmetic.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    /// Inclusive value range for integer types.
    pub(crate) fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            DataType::Byte => Some((u8::MIN as i64, u8::MAX as i64)),
            DataType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            DataType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            DataType::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Logical => "logical",
            DataType::Bit => "bit",
            DataType::Byte => "byte",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Complex64 => "complex64",
            DataType::Complex128 => "complex128",
            DataType::Char => "char",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tform_round_trip() {
        for dtype in [
            DataType::Logical,
            DataType::Bit,
            DataType::Byte,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::Float32,
            DataType::Float64,
            DataType::Complex64,
            DataType::Complex128,
            DataType::Char,
        ] {
            assert_eq!(DataType::from_tform_code(dtype.tform_code()), Some(dtype));
        }
        assert_eq!(DataType::from_tform_code('Z'), None);
    }

    #[test]
    fn test_families() {
        assert!(DataType::Bit.is_logical());
        assert!(DataType::Byte.is_integer());
        assert!(DataType::Float32.is_float());
        assert!(DataType::Complex128.is_complex());
        assert!(!DataType::Char.is_numeric());
        assert!(!DataType::Logical.is_numeric());
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(DataType::Byte.integer_range(), Some((0, 255)));
        assert_eq!(DataType::Int16.integer_range(), Some((-32768, 32767)));
        assert_eq!(DataType::Float64.integer_range(), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DataType::Int16).unwrap();
        assert_eq!(json, "\"int16\"");
        let back: DataType = serde_json::from_str("\"complex64\"").unwrap();
        assert_eq!(back, DataType::Complex64);
    }
}
