//! Shared test suite for Rax backends
//!
//! Every module holds tests written against the operation traits of `rax-core` and stamped
//! out per backend with [`backend_tests!`]. Only the CPU backend exists today.

pub mod construction;
pub mod export;
pub mod indexing;
pub mod linalg;
pub mod math;
pub mod sharding;
pub mod stats;

/// Test utilities
pub mod utils {
    use rax_core::{Array, Config, DType, DTypeKind, Result};

    /// Check if two f64 values are approximately equal
    pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() && b.is_nan() {
            return true;
        }
        if a.is_infinite() && b.is_infinite() {
            return a.signum() == b.signum();
        }
        (a - b).abs() < tol
    }

    /// Real parts of every element in row-major order, read through `item`.
    pub fn values<A: Array>(a: &A) -> Result<Vec<f64>> {
        if a.ndim() == 0 {
            return Ok(vec![a.item(&[])?.parts().0]);
        }
        (0..a.size())
            .map(|i| Ok(a.item(&[i])?.parts().0))
            .collect()
    }

    /// Imaginary parts of every element in row-major order.
    pub fn imag_values<A: Array>(a: &A) -> Result<Vec<f64>> {
        if a.ndim() == 0 {
            return Ok(vec![a.item(&[])?.parts().1]);
        }
        (0..a.size())
            .map(|i| Ok(a.item(&[i])?.parts().1))
            .collect()
    }

    /// Check if an array matches `expected` element-wise
    pub fn values_approx_eq<A: Array>(a: &A, expected: &[f64], tol: f64) -> bool {
        match values(a) {
            Ok(actual) => {
                actual.len() == expected.len()
                    && actual
                        .iter()
                        .zip(expected)
                        .all(|(&x, &y)| approx_eq(x, y, tol))
            }
            Err(_) => false,
        }
    }

    /// Check if two arrays are approximately equal
    pub fn arrays_approx_eq<A: Array>(a: &A, b: &A, tol: f64) -> bool {
        if a.shape() != b.shape() {
            return false;
        }
        match values(b) {
            Ok(expected) => values_approx_eq(a, &expected, tol),
            Err(_) => false,
        }
    }

    /// Default dtype of `kind` under the process configuration.
    pub fn default_dtype(kind: DTypeKind) -> DType {
        DType::default_for(kind, Config::global().enable_x64)
    }

    /// Default tolerance for floating point comparisons
    pub const DEFAULT_TOL: f64 = 1e-10;

    /// Relaxed tolerance for values stored as float32
    pub const RELAXED_TOL: f64 = 1e-5;
}

/// Macro to generate parameterized tests for different backends
#[macro_export]
macro_rules! backend_tests {
    ($backend:ty, $test_name:ident, $body:block) => {
        #[test]
        fn $test_name() {
            #[allow(dead_code)]
            type B = $backend;
            #[allow(dead_code)]
            type A = <$backend as rax_core::CreationOps>::Array;
            $body
        }
    };
}
