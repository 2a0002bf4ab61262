//! Gathers, masks and diagonals for CPU backend

use crate::array::{default_int, x64, CpuArray};
use crate::broadcast::broadcast_all;
use crate::index::{contiguous_strides, select};
use crate::math::{binary, Arith};
use rax_core::index::{normalize_axis, normalize_index};
use rax_core::{
    result_type, Array, ChooseMode, DType, Index, IndexItem, NonzeroFill, Operand, RaxError,
    ReduceOps, ReduceOptions, Result, SelectOps, ShapeOps, Slice, TakeMode,
};

fn require_integer(arr: &CpuArray, what: &str) -> Result<()> {
    if arr.dtype().is_integer() {
        Ok(())
    } else {
        Err(RaxError::TypeError(format!(
            "{} must be an integer array, got {}",
            what,
            arr.dtype()
        )))
    }
}

/// `None` works on the flattened array along its only axis.
fn axis_input(arr: &CpuArray, axis: Option<isize>) -> Result<(CpuArray, usize)> {
    match axis {
        Some(axis) => Ok((arr.clone(), normalize_axis(axis, arr.ndim())?)),
        None => Ok((arr.ravel(rax_core::Order::C)?, 0)),
    }
}

/// Fill used by `take` when the caller gives none.
fn default_fill(dtype: DType) -> (f64, f64) {
    if dtype.is_bool() {
        return (1.0, 0.0);
    }
    match dtype.int_range() {
        Some((min, _)) if dtype.is_signed_integer() => (min, 0.0),
        Some((_, max)) => (max, 0.0),
        None if dtype.is_complex() => (f64::NAN, f64::NAN),
        None => (f64::NAN, 0.0),
    }
}

fn wrap(i: i64, n: usize) -> usize {
    i.rem_euclid(n as i64) as usize
}

fn clamp(i: i64, n: usize) -> usize {
    i.clamp(0, n as i64 - 1) as usize
}

impl SelectOps for CpuArray {
    fn choose(&self, choices: &[Self], mode: ChooseMode) -> Result<Self> {
        require_integer(self, "choose index")?;
        let (dtype, weak) = choices
            .iter()
            .map(|c| (c.dtype(), c.weak_type()))
            .reduce(|a, b| result_type(a, b, x64()))
            .ok_or_else(|| {
                RaxError::InvalidArgument("choose needs at least one choice".to_string())
            })?;
        let shape = broadcast_all(self.shape(), choices.iter().map(|c| c.shape()))?;

        let selector = self.broadcast_to(&shape)?.to_f64_vec();
        let choices = choices
            .iter()
            .map(|c| Ok(c.cast_to(dtype, weak).broadcast_to(&shape)?.flat_parts()))
            .collect::<Result<Vec<_>>>()?;
        let n = choices.len();

        let (re, im): (Vec<f64>, Vec<f64>) = selector
            .iter()
            .enumerate()
            .map(|(k, &i)| {
                let i = i as i64;
                let which = match mode {
                    ChooseMode::Raise => {
                        if i < 0 || i as usize >= n {
                            return Err(RaxError::IndexOutOfBounds {
                                index: i as isize,
                                size: n,
                            });
                        }
                        i as usize
                    }
                    ChooseMode::Wrap => wrap(i, n),
                    ChooseMode::Clip => clamp(i, n),
                };
                Ok(choices[which][k])
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();
        CpuArray::from_vecs(&shape, re, Some(im), dtype, weak)
    }

    fn clip<'o>(&self, min: Option<Operand<'o, Self>>, max: Option<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o,
    {
        let mut out = self.cast_to(self.dtype(), self.weak_type());
        if let Some(min) = min {
            out = binary(&out, &CpuArray::operand(min), Arith::Maximum)?;
        }
        if let Some(max) = max {
            out = binary(&out, &CpuArray::operand(max), Arith::Minimum)?;
        }
        Ok(out)
    }

    fn compress(&self, condition: &Self, axis: Option<isize>) -> Result<Self> {
        if condition.ndim() != 1 {
            return Err(RaxError::InvalidArgument(
                "condition must be a 1-d array".to_string(),
            ));
        }
        let (input, axis) = axis_input(self, axis)?;
        let len = input.shape()[axis];
        let keep = condition.cast_to(DType::Bool, false).to_f64_vec();
        if keep.len() > len && keep[len..].iter().any(|&k| k != 0.0) {
            return Err(RaxError::IndexOutOfBounds {
                index: keep.len() as isize - 1,
                size: len,
            });
        }
        let positions: Vec<isize> = keep
            .iter()
            .take(len)
            .enumerate()
            .filter_map(|(i, &k)| (k != 0.0).then_some(i as isize))
            .collect();
        let mut items = vec![IndexItem::Slice(Slice::full()); axis];
        items.push(IndexItem::Indices(positions));
        let selection = select(input.shape(), &Index::new(items))?;
        input.gather(&selection.flat, &selection.shape)
    }

    fn take(&self, indices: &Self, axis: Option<isize>, mode: TakeMode) -> Result<Self> {
        require_integer(indices, "take indices")?;
        let (input, axis) = axis_input(self, axis)?;
        let dtype = input.dtype();
        let shape = input.shape();
        let n = shape[axis];
        let pre: usize = shape[..axis].iter().product();
        let post: usize = shape[axis + 1..].iter().product();

        if n == 0 && !matches!(mode, TakeMode::Fill(_)) {
            return Err(RaxError::IndexOutOfBounds { index: 0, size: 0 });
        }
        let fill = match mode {
            TakeMode::Fill(Some(value)) => {
                CpuArray::scalar(value).cast_to(dtype, false).flat_parts()[0]
            }
            _ => default_fill(dtype),
        };
        let positions: Vec<Option<usize>> = indices
            .to_f64_vec()
            .iter()
            .map(|&i| {
                let i = i as i64;
                match mode {
                    TakeMode::Fill(_) => normalize_index(i as isize, n).ok(),
                    TakeMode::Clip => Some(clamp(i, n)),
                    TakeMode::Wrap => Some(wrap(i, n)),
                    TakeMode::PromiseInBounds => Some(
                        normalize_index(i as isize, n).unwrap_or_else(|_| clamp(i, n)),
                    ),
                }
            })
            .collect();

        let source = input.flat_parts();
        let mut re = Vec::with_capacity(pre * positions.len() * post);
        let mut im = Vec::with_capacity(re.capacity());
        for p in 0..pre {
            for position in &positions {
                for q in 0..post {
                    let (x, y) = position.map_or(fill, |j| source[(p * n + j) * post + q]);
                    re.push(x);
                    im.push(y);
                }
            }
        }

        let out_shape: Vec<usize> = shape[..axis]
            .iter()
            .chain(indices.shape())
            .chain(&shape[axis + 1..])
            .copied()
            .collect();
        CpuArray::from_vecs(&out_shape, re, Some(im), dtype, input.weak_type())
    }

    fn nonzero(&self, size: Option<usize>, fill_value: Option<NonzeroFill>) -> Result<Vec<Self>> {
        let ndim = self.ndim();
        if ndim == 0 {
            return Err(RaxError::InvalidArgument(
                "nonzero is not defined for 0-d arrays".to_string(),
            ));
        }
        let fill: Vec<f64> = match fill_value {
            None => vec![0.0; ndim],
            Some(NonzeroFill::All(v)) => vec![v as f64; ndim],
            Some(NonzeroFill::PerAxis(values)) => {
                if values.len() != ndim {
                    return Err(RaxError::InvalidArgument(format!(
                        "fill_value needs one entry per dimension ({}), got {}",
                        ndim,
                        values.len()
                    )));
                }
                values.iter().map(|&v| v as f64).collect()
            }
        };

        let strides = contiguous_strides(self.shape());
        let hits: Vec<usize> = self
            .flat_parts()
            .iter()
            .enumerate()
            .filter_map(|(i, &(re, im))| (re != 0.0 || im != 0.0).then_some(i))
            .collect();
        let count = size.unwrap_or(hits.len());

        (0..ndim)
            .map(|axis| {
                let coords: Vec<f64> = (0..count)
                    .map(|k| match hits.get(k) {
                        Some(&flat) => ((flat / strides[axis]) % self.shape()[axis]) as f64,
                        None => fill[axis],
                    })
                    .collect();
                CpuArray::from_vecs(&[count], coords, None, default_int(), false)
            })
            .collect()
    }

    fn diagonal(&self, offset: isize, axis1: isize, axis2: isize) -> Result<Self> {
        let ndim = self.ndim();
        let (a1, a2) = (normalize_axis(axis1, ndim)?, normalize_axis(axis2, ndim)?);
        if a1 == a2 {
            return Err(RaxError::InvalidArgument(
                "axis1 and axis2 cannot be the same".to_string(),
            ));
        }
        let shape = self.shape();
        let (row0, col0) = if offset >= 0 {
            (0, offset as usize)
        } else {
            (offset.unsigned_abs(), 0)
        };
        let len = shape[a1]
            .saturating_sub(row0)
            .min(shape[a2].saturating_sub(col0));

        let strides = &contiguous_strides(shape);
        let others: Vec<usize> = (0..ndim).filter(|&a| a != a1 && a != a2).collect();
        let mut bases = vec![0usize];
        for &axis in &others {
            bases = bases
                .iter()
                .flat_map(|&b| (0..shape[axis]).map(move |i| b + i * strides[axis]))
                .collect();
        }
        let flat: Vec<usize> = bases
            .iter()
            .flat_map(|&b| {
                (0..len).map(move |i| b + (row0 + i) * strides[a1] + (col0 + i) * strides[a2])
            })
            .collect();

        let mut out_shape: Vec<usize> = others.iter().map(|&a| shape[a]).collect();
        out_shape.push(len);
        self.gather(&flat, &out_shape)
    }

    fn trace(
        &self,
        offset: isize,
        axis1: isize,
        axis2: isize,
        dtype: Option<DType>,
    ) -> Result<Self> {
        self.diagonal(offset, axis1, axis2)?
            .sum(&ReduceOptions::axes(-1), dtype, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;
    use rax_core::{CreationOps, Scalar};

    fn ints(data: Vec<f64>) -> CpuArray {
        let n = data.len();
        CpuBackend::array(data, vec![n], Some(DType::Int32)).unwrap()
    }

    fn grid() -> CpuArray {
        CpuBackend::arange(0.0, 9.0, 1.0, Some(DType::Float32))
            .unwrap()
            .reshape(&[3, 3], rax_core::Order::C)
            .unwrap()
    }

    #[test]
    fn test_choose() {
        let a = CpuBackend::array(vec![0.0, 1.0, 2.0], vec![3], None).unwrap();
        let b = CpuBackend::array(vec![10.0, 11.0, 12.0], vec![3], None).unwrap();
        let picked = ints(vec![1.0, 0.0, 1.0]).choose(&[a.clone(), b.clone()], ChooseMode::Raise).unwrap();
        assert_eq!(picked.to_f64_vec(), vec![10.0, 1.0, 12.0]);

        let wild = ints(vec![2.0, -1.0, 5.0]);
        assert!(wild.choose(&[a.clone(), b.clone()], ChooseMode::Raise).is_err());
        assert_eq!(
            wild.choose(&[a.clone(), b.clone()], ChooseMode::Wrap).unwrap().to_f64_vec(),
            vec![0.0, 11.0, 12.0]
        );
        assert_eq!(
            wild.choose(&[a, b], ChooseMode::Clip).unwrap().to_f64_vec(),
            vec![10.0, 1.0, 12.0]
        );
    }

    #[test]
    fn test_clip() {
        let x = CpuBackend::array(vec![-2.0, 0.5, 3.0], vec![3], None).unwrap();
        let clipped = x.clip(Some(0.0.into()), Some(1.0.into())).unwrap();
        assert_eq!(clipped.to_f64_vec(), vec![0.0, 0.5, 1.0]);
        assert_eq!(clipped.dtype(), DType::Float32);
        assert_eq!(x.clip(None, Some(0.0.into())).unwrap().to_f64_vec(), vec![-2.0, 0.0, 0.0]);
        assert_eq!(x.clip(None, None).unwrap().to_f64_vec(), x.to_f64_vec());
    }

    #[test]
    fn test_compress() {
        let x = grid();
        let cond = CpuBackend::array(vec![1.0, 0.0, 1.0], vec![3], Some(DType::Bool)).unwrap();
        let rows = x.compress(&cond, Some(0)).unwrap();
        assert_eq!(rows.shape(), &[2, 3]);
        assert_eq!(rows.to_f64_vec(), vec![0.0, 1.0, 2.0, 6.0, 7.0, 8.0]);
        let flat = x.compress(&cond, None).unwrap();
        assert_eq!(flat.to_f64_vec(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_take() {
        let x = grid();
        let idx = ints(vec![2.0, 0.0]);
        let cols = x.take(&idx, Some(1), TakeMode::Clip).unwrap();
        assert_eq!(cols.shape(), &[3, 2]);
        assert_eq!(cols.to_f64_vec(), vec![2.0, 0.0, 5.0, 3.0, 8.0, 6.0]);
        let flat = x.take(&idx, None, TakeMode::default()).unwrap();
        assert_eq!(flat.to_f64_vec(), vec![2.0, 0.0]);
    }

    #[test]
    fn test_take_modes() {
        let x = CpuBackend::array(vec![1.0, 2.0, 3.0], vec![3], None).unwrap();
        let idx = ints(vec![-1.0, 3.0, 7.0]);
        let filled = x.take(&idx, None, TakeMode::Fill(None)).unwrap().to_f64_vec();
        assert_eq!(filled[0], 3.0);
        assert!(filled[1].is_nan() && filled[2].is_nan());
        let custom = x.take(&idx, None, TakeMode::Fill(Some(Scalar::Float(-9.0)))).unwrap();
        assert_eq!(custom.to_f64_vec(), vec![3.0, -9.0, -9.0]);
        assert_eq!(x.take(&idx, None, TakeMode::Clip).unwrap().to_f64_vec(), vec![1.0, 3.0, 3.0]);
        assert_eq!(x.take(&idx, None, TakeMode::Wrap).unwrap().to_f64_vec(), vec![3.0, 1.0, 2.0]);

        let small = CpuBackend::array(vec![1.0, 2.0], vec![2], Some(DType::Int8)).unwrap();
        let filled = small.take(&ints(vec![5.0]), None, TakeMode::Fill(None)).unwrap();
        assert_eq!(filled.to_f64_vec(), vec![-128.0]);
    }

    #[test]
    fn test_nonzero() {
        let x = CpuBackend::array(vec![0.0, 1.0, 2.0, 0.0, 3.0, 0.0], vec![2, 3], None).unwrap();
        let nz = x.nonzero(None, None).unwrap();
        assert_eq!(nz.len(), 2);
        assert_eq!(nz[0].to_f64_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(nz[1].to_f64_vec(), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_nonzero_fixed_size() {
        let x = CpuBackend::array(vec![0.0, 4.0, 0.0, 5.0], vec![4], None).unwrap();
        let padded = x.nonzero(Some(4), Some(NonzeroFill::All(-1))).unwrap();
        assert_eq!(padded[0].to_f64_vec(), vec![1.0, 3.0, -1.0, -1.0]);
        let truncated = x.nonzero(Some(1), None).unwrap();
        assert_eq!(truncated[0].to_f64_vec(), vec![1.0]);
        assert!(x.nonzero(Some(2), Some(NonzeroFill::PerAxis(vec![0, 0]))).is_err());
        assert!(CpuBackend::zeros(vec![], None).nonzero(None, None).is_err());
    }

    #[test]
    fn test_default_fill_keeps_64_bit_max() {
        let (max, _) = default_fill(DType::UInt64);
        assert_eq!(DType::UInt64.normalize(max), u64::MAX as f64);
        let (min, _) = default_fill(DType::Int64);
        assert_eq!(DType::Int64.normalize(min), i64::MIN as f64);
    }

    #[test]
    fn test_diagonal_and_trace() {
        let x = grid();
        assert_eq!(x.diagonal(0, 0, 1).unwrap().to_f64_vec(), vec![0.0, 4.0, 8.0]);
        assert_eq!(x.diagonal(1, 0, 1).unwrap().to_f64_vec(), vec![1.0, 5.0]);
        assert_eq!(x.diagonal(-2, 0, 1).unwrap().to_f64_vec(), vec![6.0]);
        assert!(x.diagonal(0, 1, -1).is_err());
        assert_eq!(x.trace(0, 0, 1, None).unwrap().to_f64_vec(), vec![12.0]);

        let stack = CpuBackend::zeros(vec![2, 3, 4], None);
        assert_eq!(stack.diagonal(0, 1, 2).unwrap().shape(), &[2, 3]);
        assert_eq!(stack.diagonal(0, 0, 2).unwrap().shape(), &[3, 2]);

        let batched = CpuBackend::arange(0.0, 24.0, 1.0, Some(DType::Float32))
            .unwrap()
            .reshape(&[2, 3, 4], rax_core::Order::C)
            .unwrap();
        let diag = batched.diagonal(1, 1, 2).unwrap();
        assert_eq!(diag.shape(), &[2, 3]);
        assert_eq!(diag.to_f64_vec(), vec![1.0, 6.0, 11.0, 13.0, 18.0, 23.0]);
    }
}
