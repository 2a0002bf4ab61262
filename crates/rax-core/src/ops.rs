//! Operation traits that make up the array contract
//!
//! Each trait covers one capability group; [`Array`](crate::Array) requires all of them.
//! Optional parameters that would be `None` sentinels in a dynamic API are sum types here
//! ([`Axes`], [`TakeMode`], [`Split`], ...). Binary operations accept an [`Operand`], which is
//! either another array or a host scalar, and every operator has a reflected `r*` form that
//! computes `other OP self`.

use crate::dtype::DType;
use crate::index::{Axes, Index};
use crate::interop::{BufferView, DlDevice, DlPackTensor};
use crate::scalar::{ListValue, Operand, Scalar};
use crate::sharding::{Device, Sharding};
use crate::Result;
use num_complex::Complex64;

/// Hints for gathers and scatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatherOptions {
    /// The caller promises indices are in ascending order.
    pub indices_are_sorted: bool,
    /// The caller promises no index is repeated.
    pub unique_indices: bool,
}

/// How a scatter combines updates with existing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterOp {
    Set,
    Add,
    Multiply,
    Divide,
    Power,
    Min,
    Max,
}

/// Common arguments of boolean and extremum reductions.
#[derive(Debug)]
pub struct ReduceOptions<'a, A> {
    pub axes: Axes,
    pub keepdims: bool,
    /// Only elements where the mask is set take part.
    pub mask: Option<&'a A>,
}

impl<'a, A> ReduceOptions<'a, A> {
    /// Reduce over every axis.
    pub fn all() -> Self {
        Self::axes(Axes::All)
    }

    pub fn axes(axes: impl Into<Axes>) -> Self {
        Self {
            axes: axes.into(),
            keepdims: false,
            mask: None,
        }
    }

    pub fn keepdims(mut self, keepdims: bool) -> Self {
        self.keepdims = keepdims;
        self
    }

    pub fn mask(mut self, mask: &'a A) -> Self {
        self.mask = Some(mask);
        self
    }
}

impl<'a, A> Default for ReduceOptions<'a, A> {
    fn default() -> Self {
        Self::all()
    }
}

/// Memory order for reshapes and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Row-major
    #[default]
    C,
    /// Column-major
    F,
}

/// Which insertion point `searchsorted` reports for equal elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Left,
    Right,
}

/// Requested sort algorithm. Backends may use any stable sort for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKind {
    #[default]
    Quick,
    Merge,
    Heap,
    Stable,
}

/// Out-of-bounds handling for `take`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TakeMode {
    /// Out-of-bounds positions yield the fill value, or a dtype-dependent default
    /// (NaN, the minimum signed value, the maximum unsigned value, or `true`).
    Fill(Option<Scalar>),
    Clip,
    Wrap,
    /// The caller guarantees every index is in bounds.
    PromiseInBounds,
}

impl Default for TakeMode {
    fn default() -> Self {
        TakeMode::Fill(None)
    }
}

/// Out-of-range handling for `choose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChooseMode {
    #[default]
    Raise,
    Wrap,
    Clip,
}

/// How `split` cuts an axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split {
    /// This many equal pieces; the axis length must divide evenly.
    Sections(usize),
    /// Cut before each of these positions.
    Indices(Vec<isize>),
}

/// Padding used by fixed-size `nonzero`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonzeroFill {
    /// The same value for every output axis.
    All(i64),
    /// One value per input dimension.
    PerAxis(Vec<i64>),
}

/// Element/slice access and the sequence protocol.
pub trait IndexOps: Sized {
    /// Reads `self[key]`.
    fn get_item(&self, key: &Index, options: GatherOptions) -> Result<Self>;

    /// Writes `self[key] = value`.
    fn set_item<'o>(&mut self, key: &Index, value: impl Into<Operand<'o, Self>>) -> Result<()>
    where
        Self: 'o;

    /// Returns a copy of `self` with `updates` combined into `self[key]`.
    fn scatter(
        &self,
        key: &Index,
        updates: Operand<'_, Self>,
        op: ScatterOp,
        options: GatherOptions,
    ) -> Result<Self>;

    /// Length of the leading axis.
    fn len(&self) -> Result<usize>;

    /// Sub-arrays along the leading axis.
    fn iter(&self) -> Result<std::vec::IntoIter<Self>>;

    fn reversed(&self) -> Result<std::iter::Rev<std::vec::IntoIter<Self>>> {
        Ok(self.iter()?.rev())
    }

    /// Rounds half to even at `decimals` places (`None` means to integers).
    fn round(&self, decimals: Option<i32>) -> Result<Self>;
}

/// Element-wise comparisons. Results are boolean arrays, never host booleans.
pub trait CompareOps: Sized {
    fn less<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn less_equal<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn equal<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn not_equal<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn greater<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn greater_equal<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
}

pub trait UnaryOps: Sized {
    fn neg(&self) -> Result<Self>;
    fn pos(&self) -> Result<Self>;
    fn abs(&self) -> Result<Self>;
    /// Bitwise not; logical not for booleans.
    fn invert(&self) -> Result<Self>;
}

/// Arithmetic and bitwise operators, each with a reflected form.
pub trait BinaryOps: Sized {
    fn add<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn sub<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn mul<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn matmul<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn true_div<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn floor_div<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rem<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    /// `(floor_div, rem)`
    fn divmod<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<(Self, Self)>
    where
        Self: 'o;
    fn pow<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn shl<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn shr<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn bitand<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn bitxor<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn bitor<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;

    fn radd<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rsub<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rmul<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rmatmul<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rtrue_div<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rfloor_div<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rrem<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rdivmod<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<(Self, Self)>
    where
        Self: 'o;
    fn rpow<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rshl<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rshr<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rbitand<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rbitxor<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    fn rbitor<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
}

/// Conversions of single-element arrays to host scalars.
pub trait CoerceOps {
    fn to_bool(&self) -> Result<bool>;
    fn to_complex(&self) -> Result<Complex64>;
    /// Truncates toward zero.
    fn to_int(&self) -> Result<i64>;
    fn to_float(&self) -> Result<f64>;
    /// Only 0-d integer arrays qualify.
    fn to_index(&self) -> Result<isize>;
}

/// Reductions and statistics.
pub trait ReduceOps: Sized {
    fn all(&self, options: &ReduceOptions<'_, Self>) -> Result<Self>;
    fn any(&self, options: &ReduceOptions<'_, Self>) -> Result<Self>;
    /// `None` searches the flattened array.
    fn argmax(&self, axis: Option<isize>, keepdims: bool) -> Result<Self>;
    fn argmin(&self, axis: Option<isize>, keepdims: bool) -> Result<Self>;
    fn max(&self, options: &ReduceOptions<'_, Self>, initial: Option<Scalar>) -> Result<Self>;
    fn min(&self, options: &ReduceOptions<'_, Self>, initial: Option<Scalar>) -> Result<Self>;
    fn sum(
        &self,
        options: &ReduceOptions<'_, Self>,
        dtype: Option<DType>,
        initial: Option<Scalar>,
    ) -> Result<Self>;
    fn prod(
        &self,
        options: &ReduceOptions<'_, Self>,
        dtype: Option<DType>,
        initial: Option<Scalar>,
    ) -> Result<Self>;
    fn mean(&self, options: &ReduceOptions<'_, Self>, dtype: Option<DType>) -> Result<Self>;
    /// Divides by `count - ddof`.
    fn std(&self, options: &ReduceOptions<'_, Self>, ddof: usize, dtype: Option<DType>)
        -> Result<Self>;
    fn var(&self, options: &ReduceOptions<'_, Self>, ddof: usize, dtype: Option<DType>)
        -> Result<Self>;
    /// Peak to peak: `max - min`.
    fn ptp(&self, axes: Axes, keepdims: bool) -> Result<Self>;
    fn cumsum(&self, axis: Option<isize>, dtype: Option<DType>) -> Result<Self>;
    fn cumprod(&self, axis: Option<isize>, dtype: Option<DType>) -> Result<Self>;
}

/// Sorting and searching
pub trait SortOps: Sized {
    /// Indices that place the `kth` element where a full sort would, with smaller elements
    /// before it and larger ones after.
    fn argpartition(&self, kth: isize, axis: isize) -> Result<Self>;
    /// `None` sorts the flattened array.
    fn argsort(&self, axis: Option<isize>, kind: SortKind) -> Result<Self>;
    fn sort(&self, axis: Option<isize>, kind: SortKind) -> Result<Self>;
    /// Insertion points of `v` into this sorted 1-D array (or into `self[sorter]`).
    fn searchsorted<'o>(
        &self,
        v: impl Into<Operand<'o, Self>>,
        side: Side,
        sorter: Option<&Self>,
    ) -> Result<Self>
    where
        Self: 'o;
}

/// Reordering and reshaping
pub trait ShapeOps: Sized {
    /// One entry may be `-1` and is inferred.
    fn reshape(&self, shape: &[isize], order: Order) -> Result<Self>;
    fn ravel(&self, order: Order) -> Result<Self>;
    fn flatten(&self, order: Order) -> Result<Self>;
    /// `None` reverses the axes.
    fn transpose(&self, axes: Option<&[isize]>) -> Result<Self>;
    /// Shorthand for `transpose(None)`.
    fn t(&self) -> Result<Self> {
        self.transpose(None)
    }
    /// Swaps the last two axes.
    fn mt(&self) -> Result<Self>;
    fn swapaxes(&self, axis1: isize, axis2: isize) -> Result<Self>;
    fn squeeze(&self, axes: Axes) -> Result<Self>;
    /// Prepends `sizes` as new leading dimensions.
    fn broadcast(&self, sizes: &[usize]) -> Result<Self>;
    fn broadcast_to(&self, shape: &[usize]) -> Result<Self>;
    /// Broadcasts to `shape`, placing operand axis `i` at `broadcast_dimensions[i]`.
    fn broadcast_in_dim(&self, shape: &[usize], broadcast_dimensions: &[usize]) -> Result<Self>;
    fn split(&self, sections: Split, axis: isize) -> Result<Vec<Self>>;
    /// `None` repeats elements of the flattened array.
    fn repeat(&self, repeats: usize, axis: Option<isize>) -> Result<Self>;
}

/// Gathers, masks and diagonals
pub trait SelectOps: Sized {
    /// `self` holds, per element, the index of the choice to read from.
    fn choose(&self, choices: &[Self], mode: ChooseMode) -> Result<Self>;
    fn clip<'o>(&self, min: Option<Operand<'o, Self>>, max: Option<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o;
    /// Keeps the slices along `axis` where `condition` is set; `None` flattens first.
    fn compress(&self, condition: &Self, axis: Option<isize>) -> Result<Self>;
    /// `None` takes from the flattened array.
    fn take(&self, indices: &Self, axis: Option<isize>, mode: TakeMode) -> Result<Self>;
    /// One index array per dimension. With `size`, results are truncated or padded to exactly
    /// that length.
    fn nonzero(&self, size: Option<usize>, fill_value: Option<NonzeroFill>) -> Result<Vec<Self>>;
    fn diagonal(&self, offset: isize, axis1: isize, axis2: isize) -> Result<Self>;
    fn trace(&self, offset: isize, axis1: isize, axis2: isize, dtype: Option<DType>)
        -> Result<Self>;
}

/// Type changes and complex projections
pub trait ViewOps: Sized {
    fn astype(&self, dtype: DType) -> Result<Self>;
    fn copy(&self) -> Result<Self>;
    /// Reinterprets the underlying bytes as `dtype`; the last axis is rescaled when item sizes
    /// differ.
    fn view(&self, dtype: Option<DType>) -> Result<Self>;
    fn conj(&self) -> Result<Self>;
    fn conjugate(&self) -> Result<Self> {
        self.conj()
    }
    fn real(&self) -> Result<Self>;
    fn imag(&self) -> Result<Self>;
}

/// Host export
pub trait ExportOps {
    /// Empty `index` requires a single element; one entry is a flat index; otherwise one entry
    /// per dimension.
    fn item(&self, index: &[usize]) -> Result<Scalar>;
    fn tolist(&self) -> Result<ListValue>;
    fn tobytes(&self, order: Order) -> Result<Vec<u8>>;
    /// Buffer-protocol export.
    fn buffer(&self) -> Result<BufferView>;
    /// DLPack export. CPU exports accept no stream.
    fn dlpack(&self, stream: Option<i64>) -> Result<DlPackTensor>;
    fn dlpack_device(&self) -> DlDevice;
}

/// Array factories. These are the only supported way to obtain arrays.
pub trait CreationOps: Sized {
    type Array: crate::Array;

    /// Array of `data` in row-major order; `dtype` defaults to the default float type.
    fn array(data: Vec<f64>, shape: Vec<usize>, dtype: Option<DType>) -> Result<Self::Array>;

    /// Array of host scalars; `dtype` defaults to the promoted type of the values.
    fn from_scalars(values: &[Scalar], shape: Vec<usize>, dtype: Option<DType>)
        -> Result<Self::Array>;

    /// 0-d array of a host scalar, weakly typed for int, float and complex literals.
    fn asarray(value: Scalar) -> Self::Array;

    fn zeros(shape: Vec<usize>, dtype: Option<DType>) -> Self::Array;

    fn ones(shape: Vec<usize>, dtype: Option<DType>) -> Self::Array;

    fn full(shape: Vec<usize>, value: Scalar, dtype: Option<DType>) -> Self::Array;

    /// Values in `[start, stop)` spaced by `step`.
    fn arange(start: f64, stop: f64, step: f64, dtype: Option<DType>) -> Result<Self::Array>;

    /// Devices this backend can place data on.
    fn devices() -> Vec<Device>;

    /// Copy of `x` placed according to `sharding`.
    fn device_put(x: &Self::Array, sharding: Sharding) -> Result<Self::Array>;
}
