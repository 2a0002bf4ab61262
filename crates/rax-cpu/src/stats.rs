//! Reductions and statistics for CPU backend
//!
//! Every reduction goes through [`gather_rows`], which moves the reduced axes to the end
//! and hands back one row of (masked) values per output element.

use crate::array::{default_float, x64, CpuArray};
use crate::broadcast::broadcast_to;
use crate::math::{apply_complex, apply_real, Arith};
use ndarray::{ArrayD, Axis, IxDyn};
use num_complex::Complex64;
use rax_core::index::normalize_axis;
use rax_core::{
    Array, Axes, BinaryOps, DType, DTypeKind, RaxError, ReduceOps, ReduceOptions, Result, Scalar,
};

struct Rows {
    /// Output shape, honoring `keepdims`.
    shape: Vec<usize>,
    rows: Vec<Vec<Complex64>>,
}

fn permuted_values(plane: &ArrayD<f64>, perm: &[usize]) -> Vec<f64> {
    plane.view().permuted_axes(IxDyn(perm)).iter().cloned().collect()
}

fn gather_rows(
    arr: &CpuArray,
    axes: &Axes,
    keepdims: bool,
    mask: Option<&CpuArray>,
) -> Result<Rows> {
    let ndim = arr.ndim();
    let reduced = axes.resolve(ndim)?;
    let kept: Vec<usize> = (0..ndim).filter(|a| !reduced.contains(a)).collect();
    let perm: Vec<usize> = kept.iter().chain(&reduced).copied().collect();

    let row_len: usize = reduced.iter().map(|&a| arr.shape()[a]).product();
    let out_len: usize = kept.iter().map(|&a| arr.shape()[a]).product();

    let re = permuted_values(arr.as_ndarray(), &perm);
    let im = arr.imag_ndarray().map(|im| permuted_values(im, &perm));
    let keep = match mask {
        Some(mask) => {
            let mask = broadcast_to(mask.cast_to(DType::Bool, false).as_ndarray(), arr.shape())?;
            Some(permuted_values(&mask, &perm))
        }
        None => None,
    };

    let rows = (0..out_len)
        .map(|r| {
            (r * row_len..(r + 1) * row_len)
                .filter(|&i| keep.as_ref().map_or(true, |k| k[i] != 0.0))
                .map(|i| Complex64::new(re[i], im.as_ref().map_or(0.0, |im| im[i])))
                .collect()
        })
        .collect();

    let shape = if keepdims {
        (0..ndim)
            .map(|a| if reduced.contains(&a) { 1 } else { arr.shape()[a] })
            .collect()
    } else {
        kept.iter().map(|&a| arr.shape()[a]).collect()
    };
    Ok(Rows { shape, rows })
}

fn finish_real(shape: &[usize], values: Vec<f64>, dtype: DType) -> Result<CpuArray> {
    CpuArray::from_vecs(shape, values, None, dtype, false)
}

fn finish_complex(shape: &[usize], values: Vec<Complex64>, dtype: DType) -> Result<CpuArray> {
    let (re, im) = values.into_iter().map(|z| (z.re, z.im)).unzip();
    CpuArray::from_vecs(shape, re, Some(im), dtype, false)
}

/// Dtype that `sum`, `prod` and the cumulative variants accumulate in.
fn accumulation_dtype(input: DType, requested: Option<DType>) -> DType {
    if let Some(dtype) = requested {
        return dtype.canonicalize(x64());
    }
    match input.kind() {
        DTypeKind::Bool | DTypeKind::SignedInt => DType::default_for(DTypeKind::SignedInt, x64()),
        DTypeKind::UnsignedInt => DType::default_for(DTypeKind::UnsignedInt, x64()),
        _ => input,
    }
}

/// Dtype that `mean`, `var` and `std` compute in.
fn moment_dtype(input: DType, requested: Option<DType>) -> DType {
    match requested {
        Some(dtype) => dtype.canonicalize(x64()),
        None if input.is_inexact() => input,
        None => default_float(),
    }
}

fn scalar_value(dtype: DType, value: Scalar) -> Complex64 {
    let (re, im) = CpuArray::scalar(value).cast_to(dtype, false).flat_parts()[0];
    Complex64::new(re, im)
}

fn fold(
    arr: &CpuArray,
    options: &ReduceOptions<'_, CpuArray>,
    dtype: Option<DType>,
    initial: Option<Scalar>,
    op: Arith,
    identity: f64,
) -> Result<CpuArray> {
    let dtype = accumulation_dtype(arr.dtype(), dtype);
    let input = arr.cast_to(dtype, false);
    let rows = gather_rows(&input, &options.axes, options.keepdims, options.mask)?;
    let start = initial.map_or(Complex64::new(identity, 0.0), |v| scalar_value(dtype, v));

    if dtype.is_complex() {
        let values = rows
            .rows
            .iter()
            .map(|row| row.iter().fold(start, |acc, &z| apply_complex(op, acc, z)))
            .collect();
        return finish_complex(&rows.shape, values, dtype);
    }
    let values = rows
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .fold(start.re, |acc, z| apply_real(op, dtype, acc, z.re))
        })
        .collect();
    finish_real(&rows.shape, values, dtype)
}

fn extremum(
    arr: &CpuArray,
    options: &ReduceOptions<'_, CpuArray>,
    initial: Option<Scalar>,
    op: Arith,
    name: &'static str,
) -> Result<CpuArray> {
    let dtype = arr.dtype();
    if dtype.is_complex() {
        return Err(RaxError::UnsupportedDType { op: name, dtype });
    }
    if options.mask.is_some() && initial.is_none() {
        return Err(RaxError::InvalidArgument(format!(
            "reduction operation {} with a mask requires an initial value",
            name
        )));
    }
    let rows = gather_rows(arr, &options.axes, options.keepdims, options.mask)?;
    let initial = initial.map(|v| scalar_value(dtype, v).re);
    let values = rows
        .rows
        .iter()
        .map(|row| {
            let mut values = row.iter().map(|z| z.re);
            let start = match initial {
                Some(v) => v,
                None => values.next().ok_or_else(|| {
                    RaxError::InvalidArgument(format!(
                        "zero-size array to reduction operation {} which has no identity",
                        name
                    ))
                })?,
            };
            Ok(values.fold(start, |acc, x| apply_real(op, dtype, acc, x)))
        })
        .collect::<Result<Vec<f64>>>()?;
    CpuArray::from_vecs(&rows.shape, values, None, dtype, arr.weak_type())
}

fn logical(arr: &CpuArray, options: &ReduceOptions<'_, CpuArray>, all: bool) -> Result<CpuArray> {
    let rows = gather_rows(arr, &options.axes, options.keepdims, options.mask)?;
    let values = rows
        .rows
        .iter()
        .map(|row| {
            let truthy = |z: &Complex64| z.re != 0.0 || z.im != 0.0;
            let v = if all {
                row.iter().all(truthy)
            } else {
                row.iter().any(truthy)
            };
            f64::from(u8::from(v))
        })
        .collect();
    finish_real(&rows.shape, values, DType::Bool)
}

fn arg_extremum(
    arr: &CpuArray,
    axis: Option<isize>,
    keepdims: bool,
    better: fn(f64, f64) -> bool,
    name: &str,
) -> Result<CpuArray> {
    if arr.dtype().is_complex() {
        return Err(RaxError::UnsupportedDType {
            op: "argmax/argmin",
            dtype: arr.dtype(),
        });
    }
    let axes = match axis {
        Some(axis) => Axes::One(axis),
        None => Axes::All,
    };
    let rows = gather_rows(arr, &axes, keepdims, None)?;
    let values = rows
        .rows
        .iter()
        .map(|row| {
            let mut best: Option<(usize, f64)> = None;
            for (i, z) in row.iter().enumerate() {
                let x = z.re;
                match best {
                    // The first NaN wins.
                    Some((_, b)) if b.is_nan() => break,
                    Some((_, b)) if !(x.is_nan() || better(x, b)) => {}
                    _ => best = Some((i, x)),
                }
            }
            best.map(|(i, _)| i as f64).ok_or_else(|| {
                RaxError::InvalidArgument(format!(
                    "attempt to get {} of an empty sequence",
                    name
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    finish_real(&rows.shape, values, DType::default_for(DTypeKind::SignedInt, x64()))
}

fn moments(
    arr: &CpuArray,
    options: &ReduceOptions<'_, CpuArray>,
    dtype: DType,
) -> Result<(Rows, Vec<Complex64>)> {
    let input = arr.cast_to(dtype, false);
    let rows = gather_rows(&input, &options.axes, options.keepdims, options.mask)?;
    let means = rows
        .rows
        .iter()
        .map(|row| row.iter().sum::<Complex64>() / row.len() as f64)
        .collect();
    Ok((rows, means))
}

fn variance(
    arr: &CpuArray,
    options: &ReduceOptions<'_, CpuArray>,
    ddof: usize,
    dtype: Option<DType>,
) -> Result<CpuArray> {
    let dtype = moment_dtype(arr.dtype(), dtype);
    let (rows, means) = moments(arr, options, dtype)?;
    let values = rows
        .rows
        .iter()
        .zip(&means)
        .map(|(row, mean)| {
            let dof = row.len() as f64 - ddof as f64;
            if dof <= 0.0 {
                return f64::NAN;
            }
            row.iter().map(|z| (z - mean).norm_sqr()).sum::<f64>() / dof
        })
        .collect();
    finish_real(&rows.shape, values, dtype.component())
}

fn cumulative(arr: &CpuArray, axis: Option<isize>, dtype: Option<DType>, op: Arith) -> Result<CpuArray> {
    let dtype = accumulation_dtype(arr.dtype(), dtype);
    let input = arr.cast_to(dtype, false);
    let (input, axis) = match axis {
        Some(axis) => (input, normalize_axis(axis, arr.ndim())?),
        None => {
            let n = input.size();
            let flat = input.map_planes(|plane| {
                Ok(plane
                    .to_shape(IxDyn(&[n]))
                    .map_err(|e| RaxError::InvalidShape(e.to_string()))?
                    .to_owned())
            })?;
            (flat, 0)
        }
    };

    let mut re = input.as_ndarray().as_standard_layout().into_owned();
    match input.imag_ndarray() {
        Some(im) => {
            let mut im = im.as_standard_layout().into_owned();
            for (mut re_lane, mut im_lane) in re
                .lanes_mut(Axis(axis))
                .into_iter()
                .zip(im.lanes_mut(Axis(axis)))
            {
                let mut acc: Option<Complex64> = None;
                for (x, y) in re_lane.iter_mut().zip(im_lane.iter_mut()) {
                    let z = Complex64::new(*x, *y);
                    let next = acc.map_or(z, |a| apply_complex(op, a, z));
                    acc = Some(next);
                    *x = next.re;
                    *y = next.im;
                }
            }
            Ok(CpuArray::from_parts(re, Some(im), dtype, false))
        }
        None => {
            for mut lane in re.lanes_mut(Axis(axis)) {
                let mut acc: Option<f64> = None;
                for x in lane.iter_mut() {
                    let next = acc.map_or(*x, |a| apply_real(op, dtype, a, *x));
                    acc = Some(next);
                    *x = next;
                }
            }
            Ok(CpuArray::from_parts(re, None, dtype, false))
        }
    }
}

impl ReduceOps for CpuArray {
    fn all(&self, options: &ReduceOptions<'_, Self>) -> Result<Self> {
        logical(self, options, true)
    }

    fn any(&self, options: &ReduceOptions<'_, Self>) -> Result<Self> {
        logical(self, options, false)
    }

    fn argmax(&self, axis: Option<isize>, keepdims: bool) -> Result<Self> {
        arg_extremum(self, axis, keepdims, |x, best| x > best, "argmax")
    }

    fn argmin(&self, axis: Option<isize>, keepdims: bool) -> Result<Self> {
        arg_extremum(self, axis, keepdims, |x, best| x < best, "argmin")
    }

    fn max(&self, options: &ReduceOptions<'_, Self>, initial: Option<Scalar>) -> Result<Self> {
        extremum(self, options, initial, Arith::Maximum, "max")
    }

    fn min(&self, options: &ReduceOptions<'_, Self>, initial: Option<Scalar>) -> Result<Self> {
        extremum(self, options, initial, Arith::Minimum, "min")
    }

    fn sum(
        &self,
        options: &ReduceOptions<'_, Self>,
        dtype: Option<DType>,
        initial: Option<Scalar>,
    ) -> Result<Self> {
        fold(self, options, dtype, initial, Arith::Add, 0.0)
    }

    fn prod(
        &self,
        options: &ReduceOptions<'_, Self>,
        dtype: Option<DType>,
        initial: Option<Scalar>,
    ) -> Result<Self> {
        fold(self, options, dtype, initial, Arith::Mul, 1.0)
    }

    fn mean(&self, options: &ReduceOptions<'_, Self>, dtype: Option<DType>) -> Result<Self> {
        let dtype = moment_dtype(self.dtype(), dtype);
        let (rows, means) = moments(self, options, dtype)?;
        if dtype.is_complex() {
            finish_complex(&rows.shape, means, dtype)
        } else {
            finish_real(&rows.shape, means.iter().map(|z| z.re).collect(), dtype)
        }
    }

    fn std(
        &self,
        options: &ReduceOptions<'_, Self>,
        ddof: usize,
        dtype: Option<DType>,
    ) -> Result<Self> {
        let var = variance(self, options, ddof, dtype)?;
        Ok(CpuArray::from_parts(
            var.as_ndarray().mapv(f64::sqrt),
            None,
            var.dtype(),
            false,
        ))
    }

    fn var(
        &self,
        options: &ReduceOptions<'_, Self>,
        ddof: usize,
        dtype: Option<DType>,
    ) -> Result<Self> {
        variance(self, options, ddof, dtype)
    }

    fn ptp(&self, axes: Axes, keepdims: bool) -> Result<Self> {
        let options = ReduceOptions::axes(axes).keepdims(keepdims);
        let max = self.max(&options, None)?;
        let min = self.min(&options, None)?;
        max.sub(&min)
    }

    fn cumsum(&self, axis: Option<isize>, dtype: Option<DType>) -> Result<Self> {
        cumulative(self, axis, dtype, Arith::Add)
    }

    fn cumprod(&self, axis: Option<isize>, dtype: Option<DType>) -> Result<Self> {
        cumulative(self, axis, dtype, Arith::Mul)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;
    use rax_core::CreationOps;

    fn matrix() -> CpuArray {
        CpuBackend::array(vec![1.0, 5.0, 3.0, 4.0, 2.0, 6.0], vec![2, 3], None).unwrap()
    }

    #[test]
    fn test_sum_axes() {
        let x = matrix();
        let total = x.sum(&ReduceOptions::all(), None, None).unwrap();
        assert_eq!(total.ndim(), 0);
        assert_eq!(total.to_f64_vec(), vec![21.0]);

        let cols = x.sum(&ReduceOptions::axes(0), None, None).unwrap();
        assert_eq!(cols.to_f64_vec(), vec![5.0, 7.0, 9.0]);

        let rows = x.sum(&ReduceOptions::axes(-1).keepdims(true), None, None).unwrap();
        assert_eq!(rows.shape(), &[2, 1]);
        assert_eq!(rows.to_f64_vec(), vec![9.0, 12.0]);
    }

    #[test]
    fn test_sum_with_mask_and_initial() {
        let x = matrix();
        let mask = CpuBackend::array(vec![1.0, 0.0, 1.0], vec![3], Some(DType::Bool)).unwrap();
        let masked = x
            .sum(&ReduceOptions::axes(1).mask(&mask), None, Some(Scalar::Int(10)))
            .unwrap();
        assert_eq!(masked.to_f64_vec(), vec![14.0, 20.0]);
    }

    #[test]
    fn test_sum_of_bools_counts() {
        let flags = CpuBackend::array(vec![1.0, 1.0, 0.0], vec![3], Some(DType::Bool)).unwrap();
        let count = flags.sum(&ReduceOptions::all(), None, None).unwrap();
        assert_eq!(count.dtype(), DType::Int32);
        assert_eq!(count.to_f64_vec(), vec![2.0]);
    }

    #[test]
    fn test_small_ints_accumulate_wide() {
        let x = CpuBackend::array(vec![100.0, 100.0], vec![2], Some(DType::Int8)).unwrap();
        assert_eq!(x.sum(&ReduceOptions::all(), None, None).unwrap().to_f64_vec(), vec![200.0]);
        let wrapped = x
            .sum(&ReduceOptions::all(), Some(DType::Int8), None)
            .unwrap();
        assert_eq!(wrapped.to_f64_vec(), vec![-56.0]);
    }

    #[test]
    fn test_prod() {
        let x = matrix();
        assert_eq!(
            x.prod(&ReduceOptions::axes(1), None, None).unwrap().to_f64_vec(),
            vec![15.0, 48.0]
        );
    }

    #[test]
    fn test_max_min() {
        let x = matrix();
        assert_eq!(x.max(&ReduceOptions::axes(0), None).unwrap().to_f64_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(x.min(&ReduceOptions::all(), None).unwrap().to_f64_vec(), vec![1.0]);
        assert_eq!(
            x.max(&ReduceOptions::all(), Some(Scalar::Float(10.0))).unwrap().to_f64_vec(),
            vec![10.0]
        );
    }

    #[test]
    fn test_max_empty_requires_initial() {
        let empty = CpuBackend::zeros(vec![0], None);
        assert!(empty.max(&ReduceOptions::all(), None).is_err());
        let with_initial = empty.max(&ReduceOptions::all(), Some(Scalar::Float(-1.0))).unwrap();
        assert_eq!(with_initial.to_f64_vec(), vec![-1.0]);

        let x = matrix();
        let mask = CpuBackend::ones(vec![2, 3], Some(DType::Bool));
        assert!(x.max(&ReduceOptions::all().mask(&mask), None).is_err());
    }

    #[test]
    fn test_max_propagates_nan() {
        let x = CpuBackend::array(vec![1.0, f64::NAN, 3.0], vec![3], None).unwrap();
        assert!(x.max(&ReduceOptions::all(), None).unwrap().to_f64_vec()[0].is_nan());
    }

    #[test]
    fn test_all_any() {
        let x = CpuBackend::array(vec![1.0, 0.0, 1.0, 1.0], vec![2, 2], None).unwrap();
        assert_eq!(x.all(&ReduceOptions::axes(1)).unwrap().to_f64_vec(), vec![0.0, 1.0]);
        assert_eq!(x.any(&ReduceOptions::all()).unwrap().to_f64_vec(), vec![1.0]);
        let empty = CpuBackend::zeros(vec![0], None);
        assert_eq!(empty.all(&ReduceOptions::all()).unwrap().to_f64_vec(), vec![1.0]);
        assert_eq!(empty.any(&ReduceOptions::all()).unwrap().to_f64_vec(), vec![0.0]);
    }

    #[test]
    fn test_argmax_argmin() {
        let x = matrix();
        let flat = x.argmax(None, false).unwrap();
        assert_eq!(flat.ndim(), 0);
        assert_eq!(flat.to_f64_vec(), vec![5.0]);
        assert_eq!(x.argmin(Some(1), false).unwrap().to_f64_vec(), vec![0.0, 1.0]);
        assert_eq!(x.argmax(Some(0), true).unwrap().shape(), &[1, 3]);

        let nan = CpuBackend::array(vec![1.0, f64::NAN, 9.0, f64::NAN], vec![4], None).unwrap();
        assert_eq!(nan.argmax(None, false).unwrap().to_f64_vec(), vec![1.0]);
        assert_eq!(nan.argmin(None, false).unwrap().to_f64_vec(), vec![1.0]);
        assert!(CpuBackend::zeros(vec![0], None).argmax(None, false).is_err());
    }

    #[test]
    fn test_mean_var_std() {
        let x = CpuBackend::array(vec![1.0, 2.0, 3.0, 4.0], vec![4], None).unwrap();
        assert_eq!(x.mean(&ReduceOptions::all(), None).unwrap().to_f64_vec(), vec![2.5]);
        assert_eq!(x.var(&ReduceOptions::all(), 0, None).unwrap().to_f64_vec(), vec![1.25]);
        let sample = x.var(&ReduceOptions::all(), 1, None).unwrap().to_f64_vec()[0];
        assert!((sample - 5.0 / 3.0).abs() < 1e-6);
        let std = x.std(&ReduceOptions::all(), 0, None).unwrap().to_f64_vec()[0];
        assert!((std - 1.25f64.sqrt()).abs() < 1e-6);
        assert!(x.var(&ReduceOptions::all(), 4, None).unwrap().to_f64_vec()[0].is_nan());
    }

    #[test]
    fn test_mean_of_ints_is_float() {
        let x = CpuBackend::arange(0.0, 4.0, 1.0, None).unwrap();
        let mean = x.mean(&ReduceOptions::all(), None).unwrap();
        assert_eq!(mean.dtype(), DType::Float32);
        assert_eq!(mean.to_f64_vec(), vec![1.5]);
    }

    #[test]
    fn test_ptp() {
        let x = matrix();
        assert_eq!(x.ptp(Axes::One(1), false).unwrap().to_f64_vec(), vec![4.0, 4.0]);
        let u = CpuBackend::array(vec![250.0, 5.0], vec![2], Some(DType::UInt8)).unwrap();
        assert_eq!(u.ptp(Axes::All, false).unwrap().to_f64_vec(), vec![245.0]);
    }

    #[test]
    fn test_cumsum_cumprod() {
        let x = matrix();
        assert_eq!(
            x.cumsum(Some(1), None).unwrap().to_f64_vec(),
            vec![1.0, 6.0, 9.0, 4.0, 6.0, 12.0]
        );
        assert_eq!(
            x.cumsum(None, None).unwrap().to_f64_vec(),
            vec![1.0, 6.0, 9.0, 13.0, 15.0, 21.0]
        );
        assert_eq!(
            x.cumprod(Some(0), None).unwrap().to_f64_vec(),
            vec![1.0, 5.0, 3.0, 4.0, 10.0, 18.0]
        );
    }
}
