//! Error types for rax

use crate::dtype::DType;
use crate::sharding::ShardingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaxError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Incompatible shapes for operation: {0:?} and {1:?}")]
    IncompatibleShapes(Vec<usize>, Vec<usize>),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Index out of bounds: index {index} for axis of size {size}")]
    IndexOutOfBounds { index: isize, size: usize },

    #[error("Invalid axis: {axis} for array with {ndim} dimensions")]
    InvalidAxis { axis: isize, ndim: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation {op} does not support dtype {dtype}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error(
        "Array cannot be instantiated directly; use the factory functions \
         `array`, `asarray`, `zeros` or `device_put` instead"
    )]
    DirectInstantiation,

    #[error(transparent)]
    Sharding(#[from] ShardingError),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

pub type Result<T> = std::result::Result<T, RaxError>;
