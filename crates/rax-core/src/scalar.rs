//! Host scalars, nested lists and binary-operation operands

use crate::config::Config;
use crate::dtype::{DType, DTypeKind};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// A single host value.
///
/// `Int`, `Float` and `Complex` behave like untyped literals: arrays built from them are
/// weakly typed. `Bool` is always strong.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
}

impl Scalar {
    /// Builds the scalar that represents one element of `dtype`.
    pub fn from_parts(dtype: DType, re: f64, im: f64) -> Self {
        match dtype.kind() {
            DTypeKind::Bool => Scalar::Bool(re != 0.0),
            DTypeKind::SignedInt => Scalar::Int(re as i64),
            DTypeKind::UnsignedInt => Scalar::UInt(re as u64),
            DTypeKind::Float => Scalar::Float(re),
            DTypeKind::Complex => Scalar::Complex(Complex64::new(re, im)),
        }
    }

    /// Real and imaginary parts as `f64`.
    pub fn parts(&self) -> (f64, f64) {
        match *self {
            Scalar::Bool(b) => (f64::from(u8::from(b)), 0.0),
            Scalar::Int(i) => (i as f64, 0.0),
            Scalar::UInt(u) => (u as f64, 0.0),
            Scalar::Float(f) => (f, 0.0),
            Scalar::Complex(c) => (c.re, c.im),
        }
    }

    /// Dtype this literal materializes as, and whether it is weakly typed.
    pub fn dtype(&self) -> (DType, bool) {
        let x64 = Config::global().enable_x64;
        match self {
            Scalar::Bool(_) => (DType::Bool, false),
            Scalar::Int(_) => (DType::default_for(DTypeKind::SignedInt, x64), true),
            Scalar::UInt(_) => (DType::default_for(DTypeKind::UnsignedInt, x64), true),
            Scalar::Float(_) => (DType::default_for(DTypeKind::Float, x64), true),
            Scalar::Complex(_) => (DType::default_for(DTypeKind::Complex, x64), true),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::UInt(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<Complex64> for Scalar {
    fn from(value: Complex64) -> Self {
        Scalar::Complex(value)
    }
}

/// Nested-list form of an array, as produced by `tolist`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListValue {
    Scalar(Scalar),
    List(Vec<ListValue>),
}

/// Right-hand side of a binary operation: another array or a host scalar.
#[derive(Debug)]
pub enum Operand<'a, A> {
    Array(&'a A),
    Scalar(Scalar),
}

impl<'a, A> Clone for Operand<'a, A> {
    fn clone(&self) -> Self {
        match self {
            Operand::Array(a) => Operand::Array(a),
            Operand::Scalar(s) => Operand::Scalar(*s),
        }
    }
}

impl<'a, A> From<&'a A> for Operand<'a, A> {
    fn from(value: &'a A) -> Self {
        Operand::Array(value)
    }
}

impl<'a, A> From<Scalar> for Operand<'a, A> {
    fn from(value: Scalar) -> Self {
        Operand::Scalar(value)
    }
}

macro_rules! impl_operand_from {
    ($($ty:ty),*) => {
        $(
            impl<'a, A> From<$ty> for Operand<'a, A> {
                fn from(value: $ty) -> Self {
                    Operand::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

impl_operand_from!(bool, i32, i64, u64, f64, Complex64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_round_trip_through_dtype() {
        let s = Scalar::from_parts(DType::Complex64, 1.0, -2.0);
        assert_eq!(s, Scalar::Complex(Complex64::new(1.0, -2.0)));
        assert_eq!(Scalar::from_parts(DType::UInt8, 7.0, 0.0), Scalar::UInt(7));
        assert_eq!(Scalar::from(true).parts(), (1.0, 0.0));
    }

    #[test]
    fn test_literals_are_weak() {
        assert!(Scalar::Float(1.0).dtype().1);
        assert!(Scalar::Int(1).dtype().1);
        assert!(!Scalar::Bool(true).dtype().1);
    }

    #[test]
    fn test_list_value_serializes_as_nested_arrays() {
        let list = ListValue::List(vec![
            ListValue::List(vec![ListValue::Scalar(Scalar::Int(1)), ListValue::Scalar(Scalar::Int(2))]),
            ListValue::List(vec![ListValue::Scalar(Scalar::Int(3)), ListValue::Scalar(Scalar::Int(4))]),
        ]);
        assert_eq!(serde_json::to_string(&list).unwrap(), "[[1,2],[3,4]]");
    }
}
