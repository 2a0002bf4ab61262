//! Sorting and searching operations for CPU backend

use crate::array::{default_int, CpuArray};
use crate::math::promote;
use ndarray::{ArrayD, Axis, Zip};
use num_complex::Complex64;
use rax_core::index::{normalize_axis, normalize_index};
use rax_core::{Array, Operand, RaxError, Result, ShapeOps, Side, SortKind, SortOps};
use std::cmp::Ordering;

/// Total order with NaN sorted last.
fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Lexicographic on `(re, im)`; real arrays carry zero imaginary parts.
fn element_order(a: Complex64, b: Complex64) -> Ordering {
    nan_last(a.re, b.re).then_with(|| nan_last(a.im, b.im))
}

/// Stable argsort of one lane.
fn lane_order(values: &[Complex64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| element_order(values[i], values[j]));
    order
}

fn imag_or_zeros(arr: &CpuArray) -> ArrayD<f64> {
    arr.imag_ndarray()
        .cloned()
        .unwrap_or_else(|| ArrayD::zeros(arr.as_ndarray().raw_dim()))
}

/// `None` sorts the flattened array along its only axis.
fn sort_input(arr: &CpuArray, axis: Option<isize>) -> Result<(CpuArray, usize)> {
    match axis {
        Some(axis) => Ok((arr.clone(), normalize_axis(axis, arr.ndim())?)),
        None => Ok((arr.ravel(rax_core::Order::C)?, 0)),
    }
}

fn argsort_along(arr: &CpuArray, axis: usize) -> CpuArray {
    let mut out = ArrayD::<f64>::zeros(arr.as_ndarray().raw_dim());
    let im = imag_or_zeros(arr);
    Zip::from(out.lanes_mut(Axis(axis)))
        .and(arr.as_ndarray().lanes(Axis(axis)))
        .and(im.lanes(Axis(axis)))
        .for_each(|mut out, re, im| {
            let values: Vec<Complex64> = re
                .iter()
                .zip(im.iter())
                .map(|(&re, &im)| Complex64::new(re, im))
                .collect();
            for (slot, i) in out.iter_mut().zip(lane_order(&values)) {
                *slot = i as f64;
            }
        });
    CpuArray::from_ndarray(out, default_int())
}

impl SortOps for CpuArray {
    fn argpartition(&self, kth: isize, axis: isize) -> Result<Self> {
        let axis = normalize_axis(axis, self.ndim())?;
        normalize_index(kth, self.shape()[axis])?;
        // A full sort is a valid partition around every kth.
        Ok(argsort_along(self, axis))
    }

    fn argsort(&self, axis: Option<isize>, kind: SortKind) -> Result<Self> {
        tracing::trace!(?kind, "argsort");
        let (input, axis) = sort_input(self, axis)?;
        Ok(argsort_along(&input, axis))
    }

    fn sort(&self, axis: Option<isize>, kind: SortKind) -> Result<Self> {
        tracing::trace!(?kind, "sort");
        let (input, axis) = sort_input(self, axis)?;
        let mut re = input.as_ndarray().as_standard_layout().into_owned();
        let mut im = imag_or_zeros(&input).as_standard_layout().into_owned();
        Zip::from(re.lanes_mut(Axis(axis)))
            .and(im.lanes_mut(Axis(axis)))
            .for_each(|mut re, mut im| {
                let values: Vec<Complex64> = re
                    .iter()
                    .zip(im.iter())
                    .map(|(&re, &im)| Complex64::new(re, im))
                    .collect();
                for ((x, y), i) in re.iter_mut().zip(im.iter_mut()).zip(lane_order(&values)) {
                    *x = values[i].re;
                    *y = values[i].im;
                }
            });
        Ok(CpuArray::from_parts(
            re,
            Some(im),
            input.dtype(),
            input.weak_type(),
        ))
    }

    fn searchsorted<'o>(
        &self,
        v: impl Into<Operand<'o, Self>>,
        side: Side,
        sorter: Option<&Self>,
    ) -> Result<Self>
    where
        Self: 'o,
    {
        if self.ndim() != 1 {
            return Err(RaxError::InvalidArgument(format!(
                "searchsorted needs a 1-D array, got shape {:?}",
                self.shape()
            )));
        }
        let v = CpuArray::operand(v.into());
        let (dtype, weak) = promote(self, &v);
        let haystack = self.cast_to(dtype, weak).flat_parts();
        let haystack: Vec<Complex64> = match sorter {
            Some(sorter) => {
                if sorter.shape() != self.shape() || !sorter.dtype().is_integer() {
                    return Err(RaxError::InvalidArgument(
                        "sorter must be an integer array of the same shape".to_string(),
                    ));
                }
                sorter
                    .to_f64_vec()
                    .iter()
                    .map(|&i| {
                        let (re, im) = haystack[normalize_index(i as isize, haystack.len())?];
                        Ok(Complex64::new(re, im))
                    })
                    .collect::<Result<_>>()?
            }
            None => haystack
                .into_iter()
                .map(|(re, im)| Complex64::new(re, im))
                .collect(),
        };

        let needles = v.cast_to(dtype, weak).flat_parts();
        let positions = needles
            .into_iter()
            .map(|(re, im)| {
                let needle = Complex64::new(re, im);
                let point = haystack.partition_point(|&x| match side {
                    Side::Left => element_order(x, needle) == Ordering::Less,
                    Side::Right => element_order(x, needle) != Ordering::Greater,
                });
                point as f64
            })
            .collect();
        CpuArray::from_vecs(v.shape(), positions, None, default_int(), false)
    }
}
