//! Matrix product tests - NumPy compatible

#[cfg(test)]
mod tests {
    use crate::backend_tests;
    use crate::utils::*;
    use num_complex::Complex64;
    use proptest::prelude::*;
    use rax_core::{Array, BinaryOps, CreationOps, DType, Order, RaxError, Scalar, ShapeOps};
    use rax_cpu::CpuBackend;

    backend_tests!(CpuBackend, test_matmul_shapes, {
        let a = B::ones(vec![5, 2, 3], None);
        let b = B::ones(vec![3, 4], None);
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape(), &[5, 2, 4]);
        assert!(values(&c).unwrap().iter().all(|&x| x == 3.0));

        let v = B::ones(vec![3], None);
        assert_eq!(a.matmul(&v).unwrap().shape(), &[5, 2]);
        assert_eq!(v.matmul(&b).unwrap().shape(), &[4]);
        assert!(matches!(b.matmul(&a), Err(RaxError::IncompatibleShapes(_, _))));
    });

    backend_tests!(CpuBackend, test_matmul_scalar_rejected, {
        let a = B::ones(vec![2, 2], None);
        assert!(a.matmul(2.0).is_err());
        assert!(B::asarray(Scalar::Float(1.0)).matmul(&a).is_err());
    });

    backend_tests!(CpuBackend, test_matmul_int_and_complex, {
        let a = B::array(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2], Some(DType::Int32)).unwrap();
        let c = a.matmul(&a).unwrap();
        assert_eq!(c.dtype(), DType::Int32);
        assert_eq!(values(&c).unwrap(), vec![7.0, 10.0, 15.0, 22.0]);

        let z = B::from_scalars(
            &[Complex64::new(1.0, 1.0).into(), Complex64::new(0.0, 2.0).into()],
            vec![2],
            None,
        )
        .unwrap();
        let w = B::from_scalars(
            &[Complex64::new(1.0, -1.0).into(), Complex64::new(1.0, 0.0).into()],
            vec![2],
            None,
        )
        .unwrap();
        // (1+i)(1-i) + 2i * 1 = 2 + 2i
        let dot = z.matmul(&w).unwrap();
        assert_eq!(values(&dot).unwrap(), vec![2.0]);
        assert_eq!(imag_values(&dot).unwrap(), vec![2.0]);
    });

    proptest! {
        #[test]
        fn prop_identity_is_neutral(rows in 1usize..6, cols in 1usize..6, seed in 0i32..100) {
            let data: Vec<f64> = (0..rows * cols).map(|i| f64::from((i as i32 * 7 + seed) % 13)).collect();
            let a = CpuBackend::array(data, vec![rows, cols], None).unwrap();
            let mut eye = vec![0.0; cols * cols];
            for i in 0..cols {
                eye[i * cols + i] = 1.0;
            }
            let eye = CpuBackend::array(eye, vec![cols, cols], None).unwrap();
            prop_assert!(arrays_approx_eq(&a.matmul(&eye).unwrap(), &a, DEFAULT_TOL));
            prop_assert!(arrays_approx_eq(&eye.rmatmul(&a).unwrap(), &a, DEFAULT_TOL));
        }

        #[test]
        fn prop_transpose_of_product(n in 1usize..5, seed in 0i32..50) {
            let data: Vec<f64> = (0..n * n).map(|i| f64::from((i as i32 + seed) % 5)).collect();
            let a = CpuBackend::array(data, vec![n, n], None).unwrap();
            let b = a.reshape(&[-1], Order::F).unwrap().reshape(&[n as isize, n as isize], Order::C).unwrap();
            let lhs = a.matmul(&b).unwrap().t().unwrap();
            let rhs = b.t().unwrap().matmul(&a.t().unwrap()).unwrap();
            prop_assert!(arrays_approx_eq(&lhs, &rhs, RELAXED_TOL));
        }
    }
}
