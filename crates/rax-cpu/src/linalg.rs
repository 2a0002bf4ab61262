//! Matrix multiplication for CPU backend using faer

use crate::array::CpuArray;
use crate::broadcast::{broadcast_shapes, broadcast_to};
use crate::math::{promote, Arith};
use faer::{Mat, MatRef};
use ndarray::{ArrayD, IxDyn};
use rax_core::{Array, RaxError, Result};

/// Convert a row-major slice to a faer Mat
fn to_faer(data: &[f64], m: usize, n: usize) -> Mat<f64> {
    // faer is column-major, we are row-major
    Mat::from_fn(m, n, |i, j| data[i * n + j])
}

/// Append a faer Mat to a row-major buffer
fn extend_from_faer(out: &mut Vec<f64>, mat: MatRef<'_, f64>) {
    for i in 0..mat.nrows() {
        for j in 0..mat.ncols() {
            out.push(mat.read(i, j));
        }
    }
}

fn flat(arr: &ArrayD<f64>) -> Vec<f64> {
    arr.iter().cloned().collect()
}

/// NumPy `matmul`: 1-D operands are promoted to matrices and the extra axis dropped again;
/// leading dimensions broadcast as a batch.
pub(crate) fn matmul(a: &CpuArray, b: &CpuArray) -> Result<CpuArray> {
    if a.ndim() == 0 || b.ndim() == 0 {
        return Err(RaxError::InvalidArgument(
            "matmul: operands must have at least one dimension".to_string(),
        ));
    }
    let (dtype, weak) = promote(a, b);
    // Bool products normalize back to logical and/or.
    Arith::Mul.check(dtype)?;
    let (a, b) = (a.cast_to(dtype, weak), b.cast_to(dtype, weak));

    let mut a_shape = a.shape().to_vec();
    let mut b_shape = b.shape().to_vec();
    let squeeze_rows = a_shape.len() == 1;
    let squeeze_cols = b_shape.len() == 1;
    if squeeze_rows {
        a_shape.insert(0, 1);
    }
    if squeeze_cols {
        b_shape.push(1);
    }

    let (m, k) = (a_shape[a_shape.len() - 2], a_shape[a_shape.len() - 1]);
    let (k2, n) = (b_shape[b_shape.len() - 2], b_shape[b_shape.len() - 1]);
    if k != k2 {
        return Err(RaxError::IncompatibleShapes(
            a.shape().to_vec(),
            b.shape().to_vec(),
        ));
    }
    let batch = broadcast_shapes(&a_shape[..a_shape.len() - 2], &b_shape[..b_shape.len() - 2])?;
    let batch_size: usize = batch.iter().product();

    let planes = |arr: &CpuArray, shape: &[usize], rows: usize, cols: usize| -> Result<_> {
        let mut target = batch.clone();
        target.extend([rows, cols]);
        let reshape = |plane: &ArrayD<f64>| -> Result<Vec<f64>> {
            let plane = plane
                .to_shape(IxDyn(shape))
                .map_err(|e| RaxError::InvalidShape(e.to_string()))?
                .to_owned();
            Ok(flat(&broadcast_to(&plane, &target)?))
        };
        let re = reshape(arr.as_ndarray())?;
        let im = arr.imag_ndarray().map(reshape).transpose()?;
        Ok((re, im))
    };
    let (a_re, a_im) = planes(&a, &a_shape, m, k)?;
    let (b_re, b_im) = planes(&b, &b_shape, k, n)?;

    let product = |x: &[f64], y: &[f64], out: &mut Vec<f64>| {
        for i in 0..batch_size {
            let lhs = to_faer(&x[i * m * k..(i + 1) * m * k], m, k);
            let rhs = to_faer(&y[i * k * n..(i + 1) * k * n], k, n);
            let result = &lhs * &rhs;
            extend_from_faer(out, result.as_ref());
        }
    };

    let mut re = Vec::with_capacity(batch_size * m * n);
    product(&a_re, &b_re, &mut re);
    let im = match (a_im, b_im) {
        (Some(a_im), Some(b_im)) => {
            // (A + iB)(C + iD) = (AC - BD) + i(AD + BC)
            let mut bd = Vec::with_capacity(re.len());
            product(&a_im, &b_im, &mut bd);
            let mut ad = Vec::with_capacity(re.len());
            product(&a_re, &b_im, &mut ad);
            let mut bc = Vec::with_capacity(re.len());
            product(&a_im, &b_re, &mut bc);
            re.iter_mut().zip(&bd).for_each(|(x, y)| *x -= y);
            Some(ad.iter().zip(&bc).map(|(x, y)| x + y).collect())
        }
        _ => None,
    };

    let mut shape = batch;
    if !squeeze_rows {
        shape.push(m);
    }
    if !squeeze_cols {
        shape.push(n);
    }
    tracing::trace!(?shape, %dtype, "matmul");
    CpuArray::from_vecs(&shape, re, im, dtype, weak)
}
