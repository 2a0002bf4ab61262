//! Indexing, scatter updates and the sequence protocol for CPU backend

use crate::array::CpuArray;
use crate::broadcast::broadcast_to;
use crate::math::{apply_complex, apply_real, Arith};
use ndarray::{ArrayD, Axis, IxDyn};
use num_complex::Complex64;
use rax_core::index::normalize_index;
use rax_core::{
    Array, DType, GatherOptions, Index, IndexItem, IndexOps, Operand, RaxError, Result, ScatterOp,
};

/// Flat source positions selected by a key, in output order, and the output shape.
#[derive(Debug)]
pub(crate) struct Selection {
    pub flat: Vec<usize>,
    pub shape: Vec<usize>,
}

/// Row-major element strides of `shape`.
pub(crate) fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Resolves `key` against an array of `shape`.
///
/// An integer alongside an advanced item makes the integer advanced too. When slices or new
/// axes separate them, the advanced dimension moves to the front of the result.
pub(crate) fn select(shape: &[usize], key: &Index) -> Result<Selection> {
    let items = key.expand(shape.len())?;
    let advanced_to_front = advanced_split(&items);

    let mut per_axis: Vec<Vec<usize>> = Vec::with_capacity(shape.len());
    let mut out_shape = Vec::new();
    let mut advanced_dim = None;
    let mut axis = 0;
    for item in &items {
        match item {
            IndexItem::NewAxis => out_shape.push(1),
            IndexItem::Ellipsis => {}
            IndexItem::Int(i) => {
                per_axis.push(vec![normalize_index(*i, shape[axis])?]);
                axis += 1;
            }
            IndexItem::Slice(slice) => {
                let positions = slice.positions(shape[axis])?;
                out_shape.push(positions.len());
                per_axis.push(positions);
                axis += 1;
            }
            IndexItem::Indices(indices) => {
                let positions = indices
                    .iter()
                    .map(|&i| normalize_index(i, shape[axis]))
                    .collect::<Result<Vec<_>>>()?;
                advanced_dim = Some(out_shape.len());
                out_shape.push(positions.len());
                per_axis.push(positions);
                axis += 1;
            }
            IndexItem::Mask(mask) => {
                if mask.len() != shape[axis] {
                    return Err(RaxError::ShapeMismatch {
                        expected: vec![shape[axis]],
                        got: vec![mask.len()],
                    });
                }
                let positions: Vec<usize> = mask
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &keep)| keep.then_some(i))
                    .collect();
                advanced_dim = Some(out_shape.len());
                out_shape.push(positions.len());
                per_axis.push(positions);
                axis += 1;
            }
        }
    }

    let strides = contiguous_strides(shape);
    let mut flat = vec![0usize];
    for (positions, stride) in per_axis.iter().zip(&strides) {
        flat = flat
            .iter()
            .flat_map(|&base| positions.iter().map(move |&p| base + p * stride))
            .collect();
    }

    match advanced_dim {
        Some(dim) if advanced_to_front && dim > 0 => {
            let mut order: Vec<usize> = (0..out_shape.len()).collect();
            order.remove(dim);
            order.insert(0, dim);
            let gathered = ArrayD::from_shape_vec(IxDyn(&out_shape), flat)
                .map_err(|e| RaxError::InvalidShape(e.to_string()))?;
            let moved = gathered.permuted_axes(IxDyn(&order));
            Ok(Selection {
                shape: moved.shape().to_vec(),
                flat: moved.iter().copied().collect(),
            })
        }
        _ => Ok(Selection {
            flat,
            shape: out_shape,
        }),
    }
}

/// Whether the integer and advanced items of an expanded key are split by other items.
fn advanced_split(items: &[IndexItem]) -> bool {
    if !items.iter().any(IndexItem::is_advanced) {
        return false;
    }
    let positions: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_advanced() || matches!(item, IndexItem::Int(_)))
        .map(|(i, _)| i)
        .collect();
    match (positions.first(), positions.last()) {
        (Some(&first), Some(&last)) => last - first + 1 != positions.len(),
        _ => false,
    }
}

fn check_sorted_hint(key: &Index, options: GatherOptions) {
    tracing::trace!(
        indices_are_sorted = options.indices_are_sorted,
        unique_indices = options.unique_indices,
        "gather/scatter hints"
    );
    if !options.indices_are_sorted {
        return;
    }
    let unsorted = key.items().iter().any(|item| match item {
        IndexItem::Indices(indices) => indices.windows(2).any(|w| w[0] > w[1]),
        _ => false,
    });
    if unsorted {
        tracing::warn!("indices_are_sorted was set but the indices are not sorted");
    }
}

fn combine_real(op: ScatterOp, dtype: DType, current: f64, update: f64) -> f64 {
    match op {
        ScatterOp::Set => update,
        ScatterOp::Add => apply_real(Arith::Add, dtype, current, update),
        ScatterOp::Multiply => apply_real(Arith::Mul, dtype, current, update),
        ScatterOp::Divide => dtype.cast_from(DType::Float64, current / update),
        ScatterOp::Power => dtype.cast_from(DType::Float64, current.powf(update)),
        ScatterOp::Min => apply_real(Arith::Minimum, dtype, current, update),
        ScatterOp::Max => apply_real(Arith::Maximum, dtype, current, update),
    }
}

fn combine_complex(op: ScatterOp, current: Complex64, update: Complex64) -> Complex64 {
    match op {
        ScatterOp::Set => update,
        ScatterOp::Add => apply_complex(Arith::Add, current, update),
        ScatterOp::Multiply => apply_complex(Arith::Mul, current, update),
        ScatterOp::Divide => apply_complex(Arith::TrueDiv, current, update),
        ScatterOp::Power => apply_complex(Arith::Pow, current, update),
        ScatterOp::Min | ScatterOp::Max => Complex64::new(f64::NAN, f64::NAN),
    }
}

impl IndexOps for CpuArray {
    fn get_item(&self, key: &Index, options: GatherOptions) -> Result<Self> {
        check_sorted_hint(key, options);
        let selection = select(self.shape(), key)?;
        self.gather(&selection.flat, &selection.shape)
    }

    fn set_item<'o>(&mut self, key: &Index, value: impl Into<Operand<'o, Self>>) -> Result<()>
    where
        Self: 'o,
    {
        let sharding = self.sharding().clone();
        let updated = self.scatter(key, value.into(), ScatterOp::Set, GatherOptions::default())?;
        *self = updated.with_sharding(sharding);
        self.invalidate_host();
        Ok(())
    }

    fn scatter(
        &self,
        key: &Index,
        updates: Operand<'_, Self>,
        op: ScatterOp,
        options: GatherOptions,
    ) -> Result<Self> {
        check_sorted_hint(key, options);
        let dtype = self.dtype();
        if dtype.is_complex() && matches!(op, ScatterOp::Min | ScatterOp::Max) {
            return Err(RaxError::UnsupportedDType {
                op: "scatter min/max",
                dtype,
            });
        }
        let selection = select(self.shape(), key)?;
        let updates = CpuArray::operand(updates).cast_to(dtype, false);
        let plane = |values: &ArrayD<f64>| -> Result<Vec<f64>> {
            Ok(broadcast_to(values, &selection.shape)?.iter().cloned().collect())
        };
        let update_re = plane(updates.as_ndarray())?;

        let mut re = self.to_f64_vec();
        let im = if dtype.is_complex() {
            let zero = ArrayD::zeros(IxDyn(updates.shape()));
            let update_im = plane(updates.imag_ndarray().unwrap_or(&zero))?;
            let mut im = self.imag_vec();
            for (k, &i) in selection.flat.iter().enumerate() {
                let z = combine_complex(
                    op,
                    Complex64::new(re[i], im[i]),
                    Complex64::new(update_re[k], update_im[k]),
                );
                re[i] = z.re;
                im[i] = z.im;
            }
            Some(im)
        } else {
            for (k, &i) in selection.flat.iter().enumerate() {
                re[i] = combine_real(op, dtype, re[i], update_re[k]);
            }
            None
        };
        CpuArray::from_vecs(self.shape(), re, im, dtype, self.weak_type())
    }

    fn len(&self) -> Result<usize> {
        self.shape()
            .first()
            .copied()
            .ok_or_else(|| RaxError::TypeError("len() of unsized object".to_string()))
    }

    fn iter(&self) -> Result<std::vec::IntoIter<Self>> {
        if self.ndim() == 0 {
            return Err(RaxError::TypeError(
                "iteration over a 0-d array".to_string(),
            ));
        }
        let rows = (0..self.shape()[0])
            .map(|i| self.map_planes(|plane| Ok(plane.index_axis(Axis(0), i).to_owned())))
            .collect::<Result<Vec<_>>>()?;
        Ok(rows.into_iter())
    }

    fn round(&self, decimals: Option<i32>) -> Result<Self> {
        let decimals = decimals.unwrap_or(0);
        let dtype = self.dtype();
        if dtype.is_bool() || (dtype.is_integer() && decimals >= 0) {
            return Ok(self.cast_to(dtype, self.weak_type()));
        }
        let factor = 10f64.powi(decimals.abs());
        let round = |x: f64| {
            if decimals >= 0 {
                (x * factor).round_ties_even() / factor
            } else {
                (x / factor).round_ties_even() * factor
            }
        };
        let data = self.as_ndarray().mapv(round);
        let imag = self.imag_ndarray().map(|im| im.mapv(round));
        Ok(CpuArray::from_parts(data, imag, dtype, self.weak_type()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;
    use rax_core::{index, CreationOps, ShapeOps, Slice};

    fn grid() -> CpuArray {
        CpuBackend::arange(0.0, 12.0, 1.0, Some(DType::Float32))
            .unwrap()
            .reshape(&[3, 4], rax_core::Order::C)
            .unwrap()
    }

    #[test]
    fn test_int_and_slice() {
        let x = grid();
        let row = x.get_item(&index![1], GatherOptions::default()).unwrap();
        assert_eq!(row.shape(), &[4]);
        assert_eq!(row.to_f64_vec(), vec![4.0, 5.0, 6.0, 7.0]);

        let block = x.get_item(&index![1.., -2..], GatherOptions::default()).unwrap();
        assert_eq!(block.shape(), &[2, 2]);
        assert_eq!(block.to_f64_vec(), vec![6.0, 7.0, 10.0, 11.0]);
    }

    #[test]
    fn test_negative_step_and_newaxis() {
        let x = grid();
        let key = index![IndexItem::NewAxis, Slice::full().with_step(-1), 0];
        let col = x.get_item(&key, GatherOptions::default()).unwrap();
        assert_eq!(col.shape(), &[1, 3]);
        assert_eq!(col.to_f64_vec(), vec![8.0, 4.0, 0.0]);
    }

    #[test]
    fn test_advanced_indices_and_mask() {
        let x = grid();
        let picked = x
            .get_item(&index![.., vec![3isize, 0]], GatherOptions::default())
            .unwrap();
        assert_eq!(picked.shape(), &[3, 2]);
        assert_eq!(picked.to_f64_vec(), vec![3.0, 0.0, 7.0, 4.0, 11.0, 8.0]);

        let rows = x
            .get_item(&index![vec![true, false, true]], GatherOptions::default())
            .unwrap();
        assert_eq!(rows.shape(), &[2, 4]);
        assert!(x.get_item(&index![vec![true]], GatherOptions::default()).is_err());
    }

    #[test]
    fn test_int_and_indices_split_by_slice() {
        let x = CpuBackend::arange(0.0, 24.0, 1.0, Some(DType::Float32))
            .unwrap()
            .reshape(&[2, 3, 4], rax_core::Order::C)
            .unwrap();

        // adjacent: the list keeps its place
        let adjacent = x
            .get_item(&index![.., 1, vec![0isize, 3]], GatherOptions::default())
            .unwrap();
        assert_eq!(adjacent.shape(), &[2, 2]);
        assert_eq!(adjacent.to_f64_vec(), vec![4.0, 7.0, 16.0, 19.0]);

        // split by a slice: the list dimension leads
        let split = x
            .get_item(&index![0, .., vec![1isize, 2]], GatherOptions::default())
            .unwrap();
        assert_eq!(split.shape(), &[2, 3]);
        assert_eq!(split.to_f64_vec(), vec![1.0, 5.0, 9.0, 2.0, 6.0, 10.0]);

        let mut y = x.clone();
        y.set_item(&index![0, .., vec![1isize, 2]], 0.0).unwrap();
        let row = y.get_item(&index![0, 0], GatherOptions::default()).unwrap();
        assert_eq!(row.to_f64_vec(), vec![0.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let x = grid();
        assert!(matches!(
            x.get_item(&index![3], GatherOptions::default()),
            Err(RaxError::IndexOutOfBounds { index: 3, size: 3 })
        ));
        assert!(x.get_item(&index![0, 0, 0], GatherOptions::default()).is_err());
    }

    #[test]
    fn test_set_item_in_place() {
        let mut x = grid();
        x.set_item(&index![0, ..], 0.5).unwrap();
        assert_eq!(&x.to_f64_vec()[..5], &[0.5, 0.5, 0.5, 0.5, 4.0]);
        let row = CpuBackend::array(vec![9.0, 8.0, 7.0, 6.0], vec![4], None).unwrap();
        x.set_item(&index![2], &row).unwrap();
        assert_eq!(&x.to_f64_vec()[8..], &[9.0, 8.0, 7.0, 6.0]);
    }

    #[test]
    fn test_scatter_add_accumulates_duplicates() {
        let x = CpuBackend::zeros(vec![4], Some(DType::Int32));
        let y = x
            .scatter(
                &index![vec![1isize, 1, 3]],
                Operand::Scalar(2.into()),
                ScatterOp::Add,
                GatherOptions::default(),
            )
            .unwrap();
        assert_eq!(y.to_f64_vec(), vec![0.0, 4.0, 0.0, 2.0]);
        assert_eq!(y.dtype(), DType::Int32);
        assert_eq!(x.to_f64_vec(), vec![0.0; 4]);
    }

    #[test]
    fn test_len_and_iter() {
        let x = grid();
        assert_eq!(x.len().unwrap(), 3);
        let rows: Vec<CpuArray> = x.iter().unwrap().collect();
        assert_eq!(rows[2].to_f64_vec(), vec![8.0, 9.0, 10.0, 11.0]);
        let last = x.reversed().unwrap().next().unwrap();
        assert_eq!(last.to_f64_vec(), rows[2].to_f64_vec());

        let s = CpuBackend::asarray(1.0.into());
        assert!(s.len().is_err());
        assert!(s.iter().is_err());
    }

    #[test]
    fn test_round_half_even() {
        let x = CpuBackend::array(vec![0.5, 1.5, 2.5, -0.5, 1.25], vec![5], None).unwrap();
        assert_eq!(x.round(None).unwrap().to_f64_vec(), vec![0.0, 2.0, 2.0, -0.0, 1.0]);
        assert_eq!(x.round(Some(1)).unwrap().to_f64_vec()[4], 1.2f32 as f64);
        let n = CpuBackend::array(vec![15.0, 25.0], vec![2], Some(DType::Int32)).unwrap();
        assert_eq!(n.round(Some(-1)).unwrap().to_f64_vec(), vec![20.0, 20.0]);
    }
}
