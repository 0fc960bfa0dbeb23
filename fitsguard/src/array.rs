//! In-memory column data.
//!
//! A [`ColumnArray`] is the materialized value of one table column: an
//! element type, a shape, and a typed buffer. The validation engine needs
//! exactly three things from it: the element dtype, the shape, and a cast
//! that is guaranteed not to lose information. A [`Quantity`] bundles an
//! array with an optional physical unit.
//!
//! Buffers store a widened representation per type family (all integers as
//! `i64`, all floats as `f64`); the dtype records the declared element type,
//! so narrowing checks stay value-exact.

use crate::datatype::DataType;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest integer exactly representable in an f32 / f64.
const F32_EXACT_INT: i64 = 1 << 24;
const F64_EXACT_INT: i64 = 1 << 53;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArrayError {
    #[error("shape {shape:?} requires {expected} elements, buffer holds {actual}")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("buffer does not hold elements of type {dtype}")]
    BufferMismatch { dtype: DataType },
    #[error("rows do not all have the same length")]
    Ragged,
}

/// A cast that would lose information.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CastError(pub String);

/// Typed element storage, widened per type family.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayBuffer {
    Logical(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Complex(Vec<(f64, f64)>),
    Text(Vec<String>),
}

impl ArrayBuffer {
    pub fn len(&self) -> usize {
        match self {
            ArrayBuffer::Logical(v) => v.len(),
            ArrayBuffer::Int(v) => v.len(),
            ArrayBuffer::Float(v) => v.len(),
            ArrayBuffer::Complex(v) => v.len(),
            ArrayBuffer::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(&self, dtype: DataType) -> bool {
        match self {
            ArrayBuffer::Logical(_) => dtype.is_logical(),
            ArrayBuffer::Int(_) => dtype.is_integer(),
            ArrayBuffer::Float(_) => dtype.is_float(),
            ArrayBuffer::Complex(_) => dtype.is_complex(),
            ArrayBuffer::Text(_) => dtype == DataType::Char,
        }
    }
}

/// A multi-dimensional column value. Shape `[]` is a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArray", into = "RawArray")]
pub struct ColumnArray {
    dtype: DataType,
    shape: Vec<usize>,
    buffer: ArrayBuffer,
}

impl ColumnArray {
    pub fn new(
        dtype: DataType,
        shape: Vec<usize>,
        buffer: ArrayBuffer,
    ) -> Result<Self, ArrayError> {
        if !buffer.matches(dtype) {
            return Err(ArrayError::BufferMismatch { dtype });
        }
        let expected: usize = shape.iter().product();
        if expected != buffer.len() {
            return Err(ArrayError::LengthMismatch {
                shape,
                expected,
                actual: buffer.len(),
            });
        }
        Ok(Self {
            dtype,
            shape,
            buffer,
        })
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes; scalars have rank 0.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &ArrayBuffer {
        &self.buffer
    }

    /// Prepend length-1 axes until the array has at least `rank` axes.
    pub fn with_min_rank(mut self, rank: usize) -> Self {
        while self.shape.len() < rank {
            self.shape.insert(0, 1);
        }
        self
    }

    /// Cast to `target` without losing information.
    ///
    /// Integer narrowing succeeds when every value fits the target range;
    /// integer-to-float requires exact representability; float-to-integer
    /// and complex-to-real always fail, as does anything crossing into the
    /// logical or character families.
    pub fn safe_cast(&self, target: DataType) -> Result<ColumnArray, CastError> {
        if self.dtype == target {
            return Ok(self.clone());
        }

        let unsafe_cast =
            || CastError(format!("cannot safely cast {} to {}", self.dtype, target));

        let buffer = match &self.buffer {
            ArrayBuffer::Logical(v) => {
                if target.is_logical() {
                    ArrayBuffer::Logical(v.clone())
                } else if target.is_integer() {
                    ArrayBuffer::Int(v.iter().map(|&b| i64::from(b)).collect())
                } else if target.is_float() {
                    ArrayBuffer::Float(v.iter().map(|&b| f64::from(u8::from(b))).collect())
                } else if target.is_complex() {
                    ArrayBuffer::Complex(
                        v.iter().map(|&b| (f64::from(u8::from(b)), 0.0)).collect(),
                    )
                } else {
                    return Err(unsafe_cast());
                }
            }
            ArrayBuffer::Int(v) => {
                if let Some((min, max)) = target.integer_range() {
                    for &value in v {
                        if value < min || value > max {
                            return Err(CastError(format!(
                                "value {value} out of range for {target}"
                            )));
                        }
                    }
                    ArrayBuffer::Int(v.clone())
                } else if target.is_float() || target.is_complex() {
                    let bound = match target {
                        DataType::Float32 | DataType::Complex64 => F32_EXACT_INT,
                        _ => F64_EXACT_INT,
                    };
                    for &value in v {
                        if value.abs() > bound {
                            return Err(CastError(format!(
                                "value {value} not exactly representable as {target}"
                            )));
                        }
                    }
                    if target.is_float() {
                        ArrayBuffer::Float(v.iter().map(|&x| x as f64).collect())
                    } else {
                        ArrayBuffer::Complex(v.iter().map(|&x| (x as f64, 0.0)).collect())
                    }
                } else {
                    return Err(unsafe_cast());
                }
            }
            ArrayBuffer::Float(v) => match target {
                DataType::Float64 => ArrayBuffer::Float(v.clone()),
                DataType::Float32 => {
                    check_f32_exact(v.iter().copied(), target)?;
                    ArrayBuffer::Float(v.clone())
                }
                DataType::Complex128 => {
                    ArrayBuffer::Complex(v.iter().map(|&x| (x, 0.0)).collect())
                }
                DataType::Complex64 => {
                    check_f32_exact(v.iter().copied(), target)?;
                    ArrayBuffer::Complex(v.iter().map(|&x| (x, 0.0)).collect())
                }
                _ => return Err(unsafe_cast()),
            },
            ArrayBuffer::Complex(v) => match target {
                DataType::Complex128 => ArrayBuffer::Complex(v.clone()),
                DataType::Complex64 => {
                    check_f32_exact(v.iter().flat_map(|&(re, im)| [re, im]), target)?;
                    ArrayBuffer::Complex(v.clone())
                }
                _ => return Err(unsafe_cast()),
            },
            ArrayBuffer::Text(_) => return Err(unsafe_cast()),
        };

        Ok(ColumnArray {
            dtype: target,
            shape: self.shape.clone(),
            buffer,
        })
    }

    /// Multiply every element by a unit-conversion factor.
    pub(crate) fn scaled(&self, factor: f64) -> Result<ColumnArray, CastError> {
        let buffer = match &self.buffer {
            ArrayBuffer::Int(v) => {
                let mut scaled = Vec::with_capacity(v.len());
                for &value in v {
                    let converted = value as f64 * factor;
                    if converted.fract() != 0.0 || converted.abs() > F64_EXACT_INT as f64 {
                        return Err(CastError(format!(
                            "unit conversion turns integer value {value} into {converted}"
                        )));
                    }
                    scaled.push(converted as i64);
                }
                ArrayBuffer::Int(scaled)
            }
            ArrayBuffer::Float(v) => ArrayBuffer::Float(v.iter().map(|&x| x * factor).collect()),
            ArrayBuffer::Complex(v) => ArrayBuffer::Complex(
                v.iter().map(|&(re, im)| (re * factor, im * factor)).collect(),
            ),
            ArrayBuffer::Logical(_) | ArrayBuffer::Text(_) => {
                return Err(CastError(format!(
                    "unit conversion on non-numeric data of type {}",
                    self.dtype
                )))
            }
        };
        Ok(ColumnArray {
            dtype: self.dtype,
            shape: self.shape.clone(),
            buffer,
        })
    }
}

fn check_f32_exact(values: impl Iterator<Item = f64>, target: DataType) -> Result<(), CastError> {
    for value in values {
        if f64::from(value as f32) != value {
            return Err(CastError(format!(
                "value {value} not exactly representable as {target}"
            )));
        }
    }
    Ok(())
}

/// A column value bundled with an optional physical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    array: ColumnArray,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<Unit>,
}

impl Quantity {
    pub fn new(array: ColumnArray, unit: Option<Unit>) -> Self {
        Self { array, unit }
    }

    /// Attach a unit tag.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn array(&self) -> &ColumnArray {
        &self.array
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    /// A two-dimensional value from per-row vectors; all rows must have the
    /// same length.
    pub fn matrix(rows: Vec<Vec<f64>>) -> Result<Self, ArrayError> {
        let row_len = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != row_len) {
            return Err(ArrayError::Ragged);
        }
        let shape = vec![rows.len(), row_len];
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Self::new(
            ColumnArray::new(DataType::Float64, shape, ArrayBuffer::Float(flat))?,
            None,
        ))
    }
}

impl From<ColumnArray> for Quantity {
    fn from(array: ColumnArray) -> Self {
        Self { array, unit: None }
    }
}

macro_rules! scalar_from {
    ($ty:ty, $dtype:expr, $variant:ident, $map:expr) => {
        impl From<$ty> for Quantity {
            fn from(value: $ty) -> Self {
                let buffer = ArrayBuffer::$variant(vec![$map(value)]);
                Quantity {
                    array: ColumnArray {
                        dtype: $dtype,
                        shape: Vec::new(),
                        buffer,
                    },
                    unit: None,
                }
            }
        }
    };
}

macro_rules! vector_from {
    ($ty:ty, $dtype:expr, $variant:ident, $map:expr) => {
        impl From<Vec<$ty>> for Quantity {
            fn from(values: Vec<$ty>) -> Self {
                let shape = vec![values.len()];
                let buffer = ArrayBuffer::$variant(values.into_iter().map($map).collect());
                Quantity {
                    array: ColumnArray {
                        dtype: $dtype,
                        shape,
                        buffer,
                    },
                    unit: None,
                }
            }
        }
    };
}

scalar_from!(f64, DataType::Float64, Float, |v| v);
scalar_from!(i64, DataType::Int64, Int, |v| v);
scalar_from!(bool, DataType::Logical, Logical, |v| v);
vector_from!(f64, DataType::Float64, Float, |v| v);
vector_from!(i64, DataType::Int64, Int, |v| v);
vector_from!(i32, DataType::Int32, Int, i64::from);
vector_from!(bool, DataType::Logical, Logical, |v| v);

/// Wire shape of [`ColumnArray`]: `shape` defaults to one axis of the buffer
/// length, and integer literals are accepted for float and complex dtypes.
#[derive(Serialize, Deserialize)]
struct RawArray {
    dtype: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape: Option<Vec<usize>>,
    values: RawValues,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawValues {
    Logical(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Complex(Vec<(f64, f64)>),
    Text(Vec<String>),
}

impl TryFrom<RawArray> for ColumnArray {
    type Error = ArrayError;

    fn try_from(raw: RawArray) -> Result<Self, Self::Error> {
        let dtype = raw.dtype;
        let buffer = match raw.values {
            RawValues::Logical(v) => ArrayBuffer::Logical(v),
            RawValues::Int(v) => {
                if dtype.is_float() {
                    ArrayBuffer::Float(v.into_iter().map(|x| x as f64).collect())
                } else if dtype.is_complex() {
                    ArrayBuffer::Complex(v.into_iter().map(|x| (x as f64, 0.0)).collect())
                } else {
                    ArrayBuffer::Int(v)
                }
            }
            RawValues::Float(v) => {
                if dtype.is_complex() {
                    ArrayBuffer::Complex(v.into_iter().map(|x| (x, 0.0)).collect())
                } else {
                    ArrayBuffer::Float(v)
                }
            }
            RawValues::Complex(v) => ArrayBuffer::Complex(v),
            RawValues::Text(v) => ArrayBuffer::Text(v),
        };
        let shape = raw.shape.unwrap_or_else(|| vec![buffer.len()]);
        ColumnArray::new(dtype, shape, buffer)
    }
}

impl From<ColumnArray> for RawArray {
    fn from(array: ColumnArray) -> Self {
        let values = match array.buffer {
            ArrayBuffer::Logical(v) => RawValues::Logical(v),
            ArrayBuffer::Int(v) => RawValues::Int(v),
            ArrayBuffer::Float(v) => RawValues::Float(v),
            ArrayBuffer::Complex(v) => RawValues::Complex(v),
            ArrayBuffer::Text(v) => RawValues::Text(v),
        };
        RawArray {
            dtype: array.dtype,
            shape: Some(array.shape),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_array(dtype: DataType, values: Vec<i64>) -> ColumnArray {
        let shape = vec![values.len()];
        ColumnArray::new(dtype, shape, ArrayBuffer::Int(values)).unwrap()
    }

    #[test]
    fn test_shape_length_mismatch() {
        let err = ColumnArray::new(
            DataType::Float64,
            vec![2, 3],
            ArrayBuffer::Float(vec![1.0; 5]),
        )
        .unwrap_err();
        assert!(matches!(err, ArrayError::LengthMismatch { .. }));
    }

    #[test]
    fn test_buffer_family_mismatch() {
        let err = ColumnArray::new(DataType::Int16, vec![1], ArrayBuffer::Float(vec![1.0]))
            .unwrap_err();
        assert_eq!(err, ArrayError::BufferMismatch { dtype: DataType::Int16 });
    }

    #[test]
    fn test_integer_narrowing_is_value_based() {
        let small = int_array(DataType::Int64, vec![1, 2, 3]);
        assert_eq!(small.safe_cast(DataType::Int16).unwrap().dtype(), DataType::Int16);

        let large = int_array(DataType::Int64, vec![1 << 15]);
        assert!(large.safe_cast(DataType::Int16).is_err());
    }

    #[test]
    fn test_float_to_int_always_fails() {
        let floats = ColumnArray::new(
            DataType::Float64,
            vec![1],
            ArrayBuffer::Float(vec![2.0]),
        )
        .unwrap();
        assert!(floats.safe_cast(DataType::Int64).is_err());
    }

    #[test]
    fn test_int_to_float_exactness() {
        let exact = int_array(DataType::Int64, vec![1 << 20]);
        assert!(exact.safe_cast(DataType::Float32).is_ok());

        let too_big_for_f32 = int_array(DataType::Int64, vec![(1 << 24) + 1]);
        assert!(too_big_for_f32.safe_cast(DataType::Float32).is_err());
        assert!(too_big_for_f32.safe_cast(DataType::Float64).is_ok());
    }

    #[test]
    fn test_float_narrowing() {
        let representable = ColumnArray::new(
            DataType::Float64,
            vec![2],
            ArrayBuffer::Float(vec![0.5, 3.25]),
        )
        .unwrap();
        assert!(representable.safe_cast(DataType::Float32).is_ok());

        let lossy = ColumnArray::new(
            DataType::Float64,
            vec![1],
            ArrayBuffer::Float(vec![0.1]),
        )
        .unwrap();
        assert!(lossy.safe_cast(DataType::Float32).is_err());
    }

    #[test]
    fn test_complex_never_narrows_to_real() {
        let complex = ColumnArray::new(
            DataType::Complex128,
            vec![1],
            ArrayBuffer::Complex(vec![(1.0, 2.0)]),
        )
        .unwrap();
        assert!(complex.safe_cast(DataType::Float64).is_err());
        assert!(complex.safe_cast(DataType::Complex64).is_ok());
    }

    #[test]
    fn test_logical_widens() {
        let flags = ColumnArray::new(
            DataType::Logical,
            vec![2],
            ArrayBuffer::Logical(vec![true, false]),
        )
        .unwrap();
        let ints = flags.safe_cast(DataType::Int32).unwrap();
        assert_eq!(ints.buffer(), &ArrayBuffer::Int(vec![1, 0]));
        assert!(flags.safe_cast(DataType::Bit).is_ok());
    }

    #[test]
    fn test_min_rank_padding() {
        let scalar: Quantity = 3.0f64.into();
        assert_eq!(scalar.array().rank(), 0);
        let padded = scalar.array().clone().with_min_rank(2);
        assert_eq!(padded.shape(), &[1, 1]);
    }

    #[test]
    fn test_scaled_integer_conversion() {
        let km = int_array(DataType::Int64, vec![1, 2]);
        let m = km.scaled(1000.0).unwrap();
        assert_eq!(m.buffer(), &ArrayBuffer::Int(vec![1000, 2000]));
        assert!(km.scaled(0.001).unwrap_err().0.contains("integer"));
    }

    #[test]
    fn test_matrix_rows() {
        let q = Quantity::matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(q.array().shape(), &[2, 2]);
        assert_eq!(
            Quantity::matrix(vec![vec![1.0], vec![2.0, 3.0]]).unwrap_err(),
            ArrayError::Ragged
        );
    }

    #[test]
    fn test_serde_coerces_integer_literals() {
        let json = r#"{"dtype":"float64","values":[1,2,3]}"#;
        let array: ColumnArray = serde_json::from_str(json).unwrap();
        assert_eq!(array.shape(), &[3]);
        assert_eq!(array.buffer(), &ArrayBuffer::Float(vec![1.0, 2.0, 3.0]));
    }
}
