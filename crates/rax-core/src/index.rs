//! Indexing keys and axis selections
//!
//! An [`Index`] is a sequence of per-axis [`IndexItem`]s with NumPy semantics. Negative
//! positions count from the end of an axis, slices follow Python's `start:stop:step` rules
//! (including negative steps), and at most one ellipsis may appear.

use crate::{RaxError, Result};
use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};

/// Python-style `start:stop:step` slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self { start, stop, step }
    }

    /// `::`
    pub fn full() -> Self {
        Self::new(None, None, 1)
    }

    pub fn with_step(mut self, step: isize) -> Self {
        self.step = step;
        self
    }

    /// Positions selected along an axis of length `len`.
    pub fn positions(&self, len: usize) -> Result<Vec<usize>> {
        if self.step == 0 {
            return Err(RaxError::InvalidArgument("slice step cannot be zero".to_string()));
        }
        let len = len as isize;
        let step = self.step;
        let resolve = |bound: isize, lo: isize, hi: isize| {
            let bound = if bound < 0 { bound + len } else { bound };
            bound.clamp(lo, hi)
        };

        let mut positions = Vec::new();
        if step > 0 {
            let start = self.start.map_or(0, |s| resolve(s, 0, len));
            let stop = self.stop.map_or(len, |s| resolve(s, 0, len));
            let mut i = start;
            while i < stop {
                positions.push(i as usize);
                match i.checked_add(step) {
                    Some(next) => i = next,
                    None => break,
                }
            }
        } else {
            let start = self.start.map_or(len - 1, |s| resolve(s, -1, len - 1));
            let stop = self.stop.map_or(-1, |s| resolve(s, -1, len - 1));
            let mut i = start;
            while i > stop {
                positions.push(i as usize);
                match i.checked_add(step) {
                    Some(next) => i = next,
                    None => break,
                }
            }
        }
        Ok(positions)
    }
}

/// One entry of an indexing key.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexItem {
    /// Select a single position and drop the axis.
    Int(isize),
    Slice(Slice),
    /// Insert a new axis of length one.
    NewAxis,
    /// Expand to as many full slices as needed.
    Ellipsis,
    /// Gather positions along one axis (advanced integer indexing).
    Indices(Vec<isize>),
    /// Keep positions whose flag is set (advanced boolean indexing).
    Mask(Vec<bool>),
}

impl IndexItem {
    /// Number of input axes this item consumes.
    pub fn consumes_axis(&self) -> bool {
        !matches!(self, IndexItem::NewAxis | IndexItem::Ellipsis)
    }

    pub fn is_advanced(&self) -> bool {
        matches!(self, IndexItem::Indices(_) | IndexItem::Mask(_))
    }
}

macro_rules! impl_index_item_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for IndexItem {
                fn from(value: $ty) -> Self {
                    IndexItem::Int(value as isize)
                }
            }

            impl From<Range<$ty>> for IndexItem {
                fn from(r: Range<$ty>) -> Self {
                    IndexItem::Slice(Slice::new(Some(r.start as isize), Some(r.end as isize), 1))
                }
            }

            impl From<RangeInclusive<$ty>> for IndexItem {
                fn from(r: RangeInclusive<$ty>) -> Self {
                    let (start, end) = r.into_inner();
                    let stop = if end == -1 { None } else { Some(end as isize + 1) };
                    IndexItem::Slice(Slice::new(Some(start as isize), stop, 1))
                }
            }

            impl From<RangeFrom<$ty>> for IndexItem {
                fn from(r: RangeFrom<$ty>) -> Self {
                    IndexItem::Slice(Slice::new(Some(r.start as isize), None, 1))
                }
            }

            impl From<RangeTo<$ty>> for IndexItem {
                fn from(r: RangeTo<$ty>) -> Self {
                    IndexItem::Slice(Slice::new(None, Some(r.end as isize), 1))
                }
            }

            impl From<$ty> for Index {
                fn from(value: $ty) -> Self {
                    Self::new(vec![IndexItem::Int(value as isize)])
                }
            }
        )*
    };
}

// Both widths so that unsuffixed literals, which fall back to i32, convert too.
impl_index_item_from_int!(i32, isize);

impl From<Slice> for IndexItem {
    fn from(value: Slice) -> Self {
        IndexItem::Slice(value)
    }
}

impl From<RangeFull> for IndexItem {
    fn from(_: RangeFull) -> Self {
        IndexItem::Slice(Slice::full())
    }
}

impl From<Vec<isize>> for IndexItem {
    fn from(value: Vec<isize>) -> Self {
        IndexItem::Indices(value)
    }
}

impl From<Vec<bool>> for IndexItem {
    fn from(value: Vec<bool>) -> Self {
        IndexItem::Mask(value)
    }
}

/// A full indexing key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Index {
    items: Vec<IndexItem>,
}

impl Index {
    pub fn new(items: Vec<IndexItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[IndexItem] {
        &self.items
    }

    /// Appends an item, builder style.
    pub fn push(mut self, item: impl Into<IndexItem>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Replaces any ellipsis with full slices and pads the key to `ndim` consumed axes.
    pub fn expand(&self, ndim: usize) -> Result<Vec<IndexItem>> {
        let consumed = self.items.iter().filter(|i| i.consumes_axis()).count();
        if consumed > ndim {
            return Err(RaxError::InvalidArgument(format!(
                "too many indices for array: array is {}-dimensional, but {} were indexed",
                ndim, consumed
            )));
        }
        let ellipses = self.items.iter().filter(|i| **i == IndexItem::Ellipsis).count();
        if ellipses > 1 {
            return Err(RaxError::InvalidArgument(
                "an index can only have a single ellipsis".to_string(),
            ));
        }
        if self.items.iter().filter(|i| i.is_advanced()).count() > 1 {
            return Err(RaxError::NotImplemented(
                "combining more than one advanced index".to_string(),
            ));
        }

        let fill = ndim - consumed;
        let mut expanded = Vec::with_capacity(self.items.len() + fill);
        for item in &self.items {
            if *item == IndexItem::Ellipsis {
                expanded.extend(std::iter::repeat(IndexItem::Slice(Slice::full())).take(fill));
            } else {
                expanded.push(item.clone());
            }
        }
        if ellipses == 0 {
            expanded.extend(std::iter::repeat(IndexItem::Slice(Slice::full())).take(fill));
        }
        Ok(expanded)
    }
}

impl From<Vec<IndexItem>> for Index {
    fn from(items: Vec<IndexItem>) -> Self {
        Self::new(items)
    }
}

impl From<IndexItem> for Index {
    fn from(item: IndexItem) -> Self {
        Self::new(vec![item])
    }
}

/// Builds an [`Index`] from integers, ranges and [`IndexItem`]s.
///
/// ```
/// use rax_core::{index, IndexItem};
/// let key = index![0, 1..3, IndexItem::NewAxis, ..];
/// assert_eq!(key.items().len(), 4);
/// ```
#[macro_export]
macro_rules! index {
    ($($item:expr),* $(,)?) => {
        $crate::Index::new(vec![$($crate::IndexItem::from($item)),*])
    };
}

/// Axis selection for reductions and squeezing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Axes {
    /// Every axis.
    #[default]
    All,
    One(isize),
    Many(Vec<isize>),
}

impl Axes {
    /// Normalized, sorted, de-duplicated axis list for an array of rank `ndim`.
    pub fn resolve(&self, ndim: usize) -> Result<Vec<usize>> {
        let mut axes = match self {
            Axes::All => (0..ndim).collect(),
            Axes::One(axis) => vec![normalize_axis(*axis, ndim)?],
            Axes::Many(list) => list
                .iter()
                .map(|&a| normalize_axis(a, ndim))
                .collect::<Result<Vec<_>>>()?,
        };
        let before = axes.len();
        axes.sort_unstable();
        axes.dedup();
        if axes.len() != before {
            return Err(RaxError::InvalidArgument("repeated axis".to_string()));
        }
        Ok(axes)
    }
}

impl From<isize> for Axes {
    fn from(axis: isize) -> Self {
        Axes::One(axis)
    }
}

impl From<i32> for Axes {
    fn from(axis: i32) -> Self {
        Axes::One(axis as isize)
    }
}

impl From<Vec<isize>> for Axes {
    fn from(axes: Vec<isize>) -> Self {
        Axes::Many(axes)
    }
}

/// Maps a possibly negative axis onto `0..ndim`.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let n = ndim as isize;
    let normalized = if axis < 0 { axis + n } else { axis };
    if normalized < 0 || normalized >= n {
        return Err(RaxError::InvalidAxis { axis, ndim });
    }
    Ok(normalized as usize)
}

/// Maps a possibly negative position onto `0..len`.
pub fn normalize_index(index: isize, len: usize) -> Result<usize> {
    let n = len as isize;
    let normalized = if index < 0 { index + n } else { index };
    if normalized < 0 || normalized >= n {
        return Err(RaxError::IndexOutOfBounds { index, size: len });
    }
    Ok(normalized as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_positions() {
        assert_eq!(Slice::full().positions(4).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(Slice::new(Some(1), None, 2).positions(6).unwrap(), vec![1, 3, 5]);
        assert_eq!(Slice::new(Some(-2), None, 1).positions(5).unwrap(), vec![3, 4]);
        assert_eq!(Slice::new(Some(2), Some(10), 1).positions(4).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_slice_negative_step() {
        assert_eq!(Slice::full().with_step(-1).positions(4).unwrap(), vec![3, 2, 1, 0]);
        assert_eq!(
            Slice::new(Some(3), Some(0), -2).positions(5).unwrap(),
            vec![3, 1]
        );
        assert!(Slice::new(Some(0), Some(3), -1).positions(5).unwrap().is_empty());
    }

    #[test]
    fn test_slice_zero_step() {
        assert!(Slice::full().with_step(0).positions(3).is_err());
    }

    #[test]
    fn test_slice_huge_step() {
        assert_eq!(Slice::new(Some(1), None, isize::MAX).positions(4).unwrap(), vec![1]);
        assert_eq!(Slice::full().with_step(isize::MIN).positions(4).unwrap(), vec![3]);
    }

    #[test]
    fn test_index_macro() {
        let key = index![1, 0..2, ..];
        assert_eq!(
            key.items(),
            &[
                IndexItem::Int(1),
                IndexItem::Slice(Slice::new(Some(0), Some(2), 1)),
                IndexItem::Slice(Slice::full()),
            ]
        );
    }

    #[test]
    fn test_expand_ellipsis() {
        let key = index![IndexItem::Ellipsis, 0];
        let expanded = key.expand(3).unwrap();
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[2], IndexItem::Int(0));
        assert_eq!(expanded[0], IndexItem::Slice(Slice::full()));
    }

    #[test]
    fn test_expand_too_many() {
        assert!(index![0, 0, 0].expand(2).is_err());
        assert!(index![IndexItem::Ellipsis, IndexItem::Ellipsis].expand(2).is_err());
    }

    #[test]
    fn test_axes_resolve() {
        assert_eq!(Axes::All.resolve(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(Axes::One(-1).resolve(3).unwrap(), vec![2]);
        assert_eq!(Axes::Many(vec![2, 0]).resolve(3).unwrap(), vec![0, 2]);
        assert!(Axes::Many(vec![0, -3]).resolve(3).is_err());
        assert!(Axes::One(3).resolve(3).is_err());
    }
}
