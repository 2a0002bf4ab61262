//! Array manipulation operations for CPU backend

use crate::array::CpuArray;
use crate::broadcast;
use crate::index::select;
use ndarray::{ArrayD, Axis, IxDyn};
use rax_core::index::normalize_axis;
use rax_core::{
    Array, Axes, Index, IndexItem, Order, RaxError, Result, ShapeOps, Slice, Split,
};

fn shape_error(e: ndarray::ShapeError) -> RaxError {
    RaxError::InvalidShape(e.to_string())
}

/// Resolves a requested shape with at most one `-1` against `size` elements.
fn resolve_shape(size: usize, shape: &[isize]) -> Result<Vec<usize>> {
    let mut inferred = None;
    let mut known = 1usize;
    for (i, &dim) in shape.iter().enumerate() {
        match dim {
            -1 if inferred.is_none() => inferred = Some(i),
            -1 => {
                return Err(RaxError::InvalidShape(
                    "can only specify one unknown dimension".to_string(),
                ))
            }
            d if d < 0 => {
                return Err(RaxError::InvalidShape(format!(
                    "negative dimension {} in shape {:?}",
                    d, shape
                )))
            }
            d => {
                known = known.checked_mul(d as usize).ok_or_else(|| {
                    RaxError::InvalidShape(format!("shape {:?} overflows usize", shape))
                })?
            }
        }
    }

    let mut resolved: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    if let Some(i) = inferred {
        if known == 0 || size % known != 0 {
            return Err(RaxError::InvalidShape(format!(
                "cannot reshape array of size {} into shape {:?}",
                size, shape
            )));
        }
        resolved[i] = size / known;
    }
    if resolved.iter().product::<usize>() != size {
        return Err(RaxError::InvalidShape(format!(
            "cannot reshape array of size {} into shape {:?}",
            size, shape
        )));
    }
    Ok(resolved)
}

fn reshape_plane(plane: &ArrayD<f64>, shape: &[usize], order: Order) -> Result<ArrayD<f64>> {
    match order {
        Order::C => Ok(plane.to_shape(IxDyn(shape)).map_err(shape_error)?.to_owned()),
        Order::F => {
            // Column-major reads of `plane` are row-major reads of its transpose.
            let values: Vec<f64> = plane.t().iter().cloned().collect();
            let reversed: Vec<usize> = shape.iter().rev().copied().collect();
            let out = ArrayD::from_shape_vec(IxDyn(&reversed), values).map_err(shape_error)?;
            Ok(out.reversed_axes().as_standard_layout().into_owned())
        }
    }
}

fn permute(arr: &CpuArray, perm: &[usize]) -> Result<CpuArray> {
    arr.map_planes(|plane| {
        Ok(plane
            .view()
            .permuted_axes(IxDyn(perm))
            .as_standard_layout()
            .into_owned())
    })
}

fn permutation(ndim: usize, axes: Option<&[isize]>) -> Result<Vec<usize>> {
    let Some(axes) = axes else {
        return Ok((0..ndim).rev().collect());
    };
    if axes.len() != ndim {
        return Err(RaxError::InvalidArgument(format!(
            "axes {:?} don't match array of rank {}",
            axes, ndim
        )));
    }
    let perm = axes
        .iter()
        .map(|&a| normalize_axis(a, ndim))
        .collect::<Result<Vec<_>>>()?;
    let mut seen = vec![false; ndim];
    for &a in &perm {
        if std::mem::replace(&mut seen[a], true) {
            return Err(RaxError::InvalidArgument("repeated axis in transpose".to_string()));
        }
    }
    Ok(perm)
}

fn split_points(len: usize, sections: &Split) -> Result<Vec<(usize, usize)>> {
    match sections {
        Split::Sections(0) => Err(RaxError::InvalidArgument(
            "number sections must be larger than 0".to_string(),
        )),
        Split::Sections(n) => {
            if len % n != 0 {
                return Err(RaxError::InvalidArgument(
                    "array split does not result in an equal division".to_string(),
                ));
            }
            let step = len / n;
            Ok((0..*n).map(|i| (i * step, (i + 1) * step)).collect())
        }
        Split::Indices(indices) => {
            let clamp = |i: isize| {
                let i = if i < 0 { i + len as isize } else { i };
                i.clamp(0, len as isize) as usize
            };
            let mut bounds = vec![0];
            bounds.extend(indices.iter().map(|&i| clamp(i)));
            bounds.push(len);
            Ok(bounds
                .windows(2)
                .map(|w| (w[0], w[1].max(w[0])))
                .collect())
        }
    }
}

impl ShapeOps for CpuArray {
    fn reshape(&self, shape: &[isize], order: Order) -> Result<Self> {
        let shape = resolve_shape(self.size(), shape)?;
        self.map_planes(|plane| reshape_plane(plane, &shape, order))
    }

    fn ravel(&self, order: Order) -> Result<Self> {
        self.reshape(&[-1], order)
    }

    fn flatten(&self, order: Order) -> Result<Self> {
        self.ravel(order)
    }

    fn transpose(&self, axes: Option<&[isize]>) -> Result<Self> {
        let perm = permutation(self.ndim(), axes)?;
        permute(self, &perm)
    }

    fn mt(&self) -> Result<Self> {
        let ndim = self.ndim();
        if ndim < 2 {
            return Err(RaxError::InvalidArgument(format!(
                "matrix transpose needs at least 2 dimensions, got {}",
                ndim
            )));
        }
        let mut perm: Vec<usize> = (0..ndim).collect();
        perm.swap(ndim - 2, ndim - 1);
        permute(self, &perm)
    }

    fn swapaxes(&self, axis1: isize, axis2: isize) -> Result<Self> {
        let ndim = self.ndim();
        let (a, b) = (normalize_axis(axis1, ndim)?, normalize_axis(axis2, ndim)?);
        let mut perm: Vec<usize> = (0..ndim).collect();
        perm.swap(a, b);
        permute(self, &perm)
    }

    fn squeeze(&self, axes: Axes) -> Result<Self> {
        let shape = self.shape();
        let dropped = match axes {
            Axes::All => (0..shape.len()).filter(|&a| shape[a] == 1).collect(),
            axes => {
                let resolved = axes.resolve(shape.len())?;
                if let Some(&a) = resolved.iter().find(|&&a| shape[a] != 1) {
                    return Err(RaxError::InvalidArgument(format!(
                        "cannot squeeze axis {} of size {}",
                        a, shape[a]
                    )));
                }
                resolved
            }
        };
        let kept: Vec<isize> = (0..shape.len())
            .filter(|a| !dropped.contains(a))
            .map(|a| shape[a] as isize)
            .collect();
        self.reshape(&kept, Order::C)
    }

    fn broadcast(&self, sizes: &[usize]) -> Result<Self> {
        let target: Vec<usize> = sizes.iter().chain(self.shape()).copied().collect();
        self.broadcast_to(&target)
    }

    fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        if shape.len() < self.ndim() {
            return Err(RaxError::InvalidShape(format!(
                "cannot broadcast shape {:?} to lower-rank shape {:?}",
                self.shape(),
                shape
            )));
        }
        self.map_planes(|plane| broadcast::broadcast_to(plane, shape))
    }

    fn broadcast_in_dim(&self, shape: &[usize], broadcast_dimensions: &[usize]) -> Result<Self> {
        if broadcast_dimensions.len() != self.ndim() {
            return Err(RaxError::InvalidArgument(format!(
                "broadcast_dimensions {:?} must have one entry per operand dimension ({})",
                broadcast_dimensions,
                self.ndim()
            )));
        }
        if broadcast_dimensions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RaxError::InvalidArgument(format!(
                "broadcast_dimensions {:?} must be strictly increasing",
                broadcast_dimensions
            )));
        }
        let mut expanded = vec![1isize; shape.len()];
        for (&size, &dim) in self.shape().iter().zip(broadcast_dimensions) {
            if dim >= shape.len() || (size != 1 && size != shape[dim]) {
                return Err(RaxError::IncompatibleShapes(
                    self.shape().to_vec(),
                    shape.to_vec(),
                ));
            }
            expanded[dim] = size as isize;
        }
        self.reshape(&expanded, Order::C)?.broadcast_to(shape)
    }

    fn split(&self, sections: Split, axis: isize) -> Result<Vec<Self>> {
        let axis = normalize_axis(axis, self.ndim())?;
        split_points(self.shape()[axis], &sections)?
            .into_iter()
            .map(|(start, end)| {
                self.map_planes(|plane| {
                    Ok(plane
                        .slice_axis(Axis(axis), ndarray::Slice::from(start..end))
                        .to_owned())
                })
            })
            .collect()
    }

    fn repeat(&self, repeats: usize, axis: Option<isize>) -> Result<Self> {
        let Some(axis) = axis else {
            let flat: Vec<usize> = (0..self.size())
                .flat_map(|i| std::iter::repeat(i).take(repeats))
                .collect();
            return self.gather(&flat, &[flat.len()]);
        };
        let axis = normalize_axis(axis, self.ndim())?;
        let positions: Vec<isize> = (0..self.shape()[axis] as isize)
            .flat_map(|i| std::iter::repeat(i).take(repeats))
            .collect();
        let mut items = vec![IndexItem::Slice(Slice::full()); axis];
        items.push(IndexItem::Indices(positions));
        let selection = select(self.shape(), &Index::new(items))?;
        self.gather(&selection.flat, &selection.shape)
    }
}
