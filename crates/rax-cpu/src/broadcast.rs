//! NumPy-style broadcasting over host planes
//!
//! Shapes are aligned at their trailing axes. Two sizes are compatible when they are equal or
//! one of them is 1; a 0-length axis broadcasts against 1 and stays empty. Each array plane
//! (real and imaginary) is broadcast separately through ndarray views, so nothing is copied
//! until a result is collected.

use ndarray::{ArrayD, IxDyn, Zip};
use rax_core::{RaxError, Result};

/// Broadcast shape of two operands.
///
/// `[3, 1]` and `[1, 4]` give `[3, 4]`; `[3, 4]` and `[2, 4]` are incompatible.
pub fn broadcast_shapes(shape_a: &[usize], shape_b: &[usize]) -> Result<Vec<usize>> {
    let ndim = shape_a.len().max(shape_b.len());
    let padded = |shape: &[usize], axis: usize| {
        let offset = ndim - shape.len();
        if axis < offset {
            1
        } else {
            shape[axis - offset]
        }
    };

    (0..ndim)
        .map(|axis| match (padded(shape_a, axis), padded(shape_b, axis)) {
            (a, b) if a == b => Ok(a),
            (1, b) => Ok(b),
            (a, 1) => Ok(a),
            _ => Err(RaxError::IncompatibleShapes(
                shape_a.to_vec(),
                shape_b.to_vec(),
            )),
        })
        .collect()
}

/// Broadcast shape of any number of operands, starting from `first`.
pub fn broadcast_all<'s, I>(first: &[usize], rest: I) -> Result<Vec<usize>>
where
    I: IntoIterator<Item = &'s [usize]>,
{
    rest.into_iter()
        .try_fold(first.to_vec(), |acc, shape| broadcast_shapes(&acc, shape))
}

/// Materializes `arr` at `target_shape` in standard layout.
pub fn broadcast_to<T: Clone>(arr: &ArrayD<T>, target_shape: &[usize]) -> Result<ArrayD<T>> {
    if arr.shape() == target_shape {
        return Ok(arr.as_standard_layout().into_owned());
    }
    match arr.broadcast(IxDyn(target_shape)) {
        Some(view) => Ok(view.to_owned()),
        None => Err(RaxError::InvalidShape(format!(
            "cannot broadcast shape {:?} to {:?}",
            arr.shape(),
            target_shape
        ))),
    }
}

/// Element-wise `op` over two planes at their broadcast shape.
pub fn broadcast_binary_op<A, B, C, F>(a: &ArrayD<A>, b: &ArrayD<B>, op: F) -> Result<ArrayD<C>>
where
    A: Copy,
    B: Copy,
    F: Fn(A, B) -> C,
{
    if a.shape() == b.shape() {
        return Ok(Zip::from(a).and(b).map_collect(|&x, &y| op(x, y)));
    }

    let shape = IxDyn(&broadcast_shapes(a.shape(), b.shape())?);
    let incompatible = || RaxError::IncompatibleShapes(a.shape().to_vec(), b.shape().to_vec());
    let lhs = a.broadcast(shape.clone()).ok_or_else(incompatible)?;
    let rhs = b.broadcast(shape).ok_or_else(incompatible)?;
    Ok(Zip::from(lhs).and(rhs).map_collect(|&x, &y| op(x, y)))
}

/// Element-wise predicate producing a Bool plane (`1.0` / `0.0`).
pub fn broadcast_compare_op<T, F>(a: &ArrayD<T>, b: &ArrayD<T>, pred: F) -> Result<ArrayD<f64>>
where
    T: Copy,
    F: Fn(T, T) -> bool,
{
    broadcast_binary_op(a, b, |x, y| f64::from(u8::from(pred(x, y))))
}
