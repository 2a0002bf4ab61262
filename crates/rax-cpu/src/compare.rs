//! Comparison operations for CPU backend

use crate::broadcast::broadcast_compare_op;
use crate::math::promote;
use crate::CpuArray;
use num_complex::Complex64;
use rax_core::{CompareOps, DType, Operand, Result};
use std::cmp::Ordering;

/// Lexicographic order on `(re, im)`; any NaN compares unordered.
fn complex_cmp(x: Complex64, y: Complex64) -> Option<Ordering> {
    match x.re.partial_cmp(&y.re)? {
        Ordering::Equal => x.im.partial_cmp(&y.im),
        ordering => Some(ordering),
    }
}

fn compare<F>(lhs: &CpuArray, other: Operand<'_, CpuArray>, pred: F) -> Result<CpuArray>
where
    F: Fn(Option<Ordering>) -> bool,
{
    let rhs = CpuArray::operand(other);
    let (dtype, weak) = promote(lhs, &rhs);
    let (a, b) = (lhs.cast_to(dtype, weak), rhs.cast_to(dtype, weak));
    let result = if dtype.is_complex() {
        broadcast_compare_op(&a.complex_ndarray(), &b.complex_ndarray(), |x, y| {
            pred(complex_cmp(x, y))
        })?
    } else {
        broadcast_compare_op(a.as_ndarray(), b.as_ndarray(), |x, y| pred(x.partial_cmp(&y)))?
    };
    Ok(CpuArray::from_ndarray(result, DType::Bool))
}

macro_rules! impl_compare_op {
    ($name:ident, $pred:expr) => {
        fn $name<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
        where
            Self: 'o,
        {
            compare(self, other.into(), $pred)
        }
    };
}

impl CompareOps for CpuArray {
    impl_compare_op!(less, |o| o == Some(Ordering::Less));
    impl_compare_op!(less_equal, |o| matches!(
        o,
        Some(Ordering::Less | Ordering::Equal)
    ));
    impl_compare_op!(equal, |o| o == Some(Ordering::Equal));
    // NaN is unequal to everything, itself included.
    impl_compare_op!(not_equal, |o| o != Some(Ordering::Equal));
    impl_compare_op!(greater, |o| o == Some(Ordering::Greater));
    impl_compare_op!(greater_equal, |o| matches!(
        o,
        Some(Ordering::Greater | Ordering::Equal)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;
    use rax_core::{Array, CreationOps, Scalar};

    fn arr(data: Vec<f64>) -> CpuArray {
        let n = data.len();
        CpuBackend::array(data, vec![n], None).unwrap()
    }

    #[test]
    fn test_results_are_bool_arrays() {
        let a = arr(vec![1.0, 2.0, 3.0]);
        let b = arr(vec![1.0, 5.0, 3.0]);
        let result = a.equal(&b).unwrap();
        assert_eq!(result.dtype(), DType::Bool);
        assert_eq!(result.shape(), &[3]);
        assert_eq!(result.to_f64_vec(), vec![1.0, 0.0, 1.0]);
        assert_eq!(a.not_equal(&b).unwrap().to_f64_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_ordering() {
        let a = arr(vec![1.0, 2.0, 3.0]);
        assert_eq!(a.less(2.0).unwrap().to_f64_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(a.less_equal(2.0).unwrap().to_f64_vec(), vec![1.0, 1.0, 0.0]);
        assert_eq!(a.greater(2.0).unwrap().to_f64_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(a.greater_equal(2.0).unwrap().to_f64_vec(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_nan() {
        let a = arr(vec![f64::NAN, 1.0]);
        assert_eq!(a.equal(&a).unwrap().to_f64_vec(), vec![0.0, 1.0]);
        assert_eq!(a.not_equal(&a).unwrap().to_f64_vec(), vec![1.0, 0.0]);
        assert_eq!(a.less(f64::INFINITY).unwrap().to_f64_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_broadcast_compare() {
        let a = CpuBackend::array(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2], None).unwrap();
        let b = arr(vec![2.0, 3.0]);
        let result = a.greater_equal(&b).unwrap();
        assert_eq!(result.shape(), &[2, 2]);
        assert_eq!(result.to_f64_vec(), vec![0.0, 0.0, 1.0, 1.0]);
        assert!(a.equal(&arr(vec![1.0, 2.0, 3.0])).is_err());
    }

    #[test]
    fn test_complex_equality() {
        let z = CpuBackend::from_scalars(
            &[
                Scalar::Complex(Complex64::new(1.0, 1.0)),
                Scalar::Complex(Complex64::new(1.0, 0.0)),
            ],
            vec![2],
            None,
        )
        .unwrap();
        assert_eq!(z.equal(1.0).unwrap().to_f64_vec(), vec![0.0, 1.0]);
        assert_eq!(z.greater(1.0).unwrap().to_f64_vec(), vec![1.0, 0.0]);
    }
}
