//! Abstract array type that backends implement

use crate::at::IndexUpdateHelper;
use crate::config::Config;
use crate::dtype::DType;
use crate::ops::{
    BinaryOps, CoerceOps, CompareOps, ExportOps, IndexOps, Order, ReduceOps, SelectOps, ShapeOps,
    SortOps, UnaryOps, ViewOps,
};
use crate::sharding::{Device, Shard, Sharding};
use crate::{RaxError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Metadata about an array (backend-agnostic)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayMeta {
    pub shape: Vec<usize>,
    pub dtype: DType,
    /// Byte strides of the row-major host layout.
    pub strides: Vec<usize>,
    /// Set for arrays created from untyped host literals.
    pub weak_type: bool,
}

impl ArrayMeta {
    pub fn new(shape: Vec<usize>, dtype: DType) -> Self {
        let strides = Self::compute_strides(&shape, dtype.size());
        Self {
            shape,
            dtype,
            strides,
            weak_type: false,
        }
    }

    pub fn weak(mut self, weak_type: bool) -> Self {
        self.weak_type = weak_type;
        self
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn nbytes(&self) -> usize {
        self.size() * self.dtype.size()
    }

    fn compute_strides(shape: &[usize], item_size: usize) -> Vec<usize> {
        let mut strides = vec![item_size; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }
}

/// Shape and dtype of an array without its data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapedArray {
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub weak_type: bool,
}

/// Low-level constructor arguments mirroring a raw buffer-backed array.
///
/// Only exists so that [`Array::new`] has something to reject.
#[derive(Debug, Clone, Default)]
pub struct RawParts {
    pub shape: Vec<usize>,
    pub dtype: Option<DType>,
    pub buffer: Option<Arc<[u8]>>,
    pub offset: usize,
    pub strides: Option<Vec<isize>>,
    pub order: Option<Order>,
}

/// Core array trait that all backends implement
///
/// Arrays are immutable values apart from [`IndexOps::set_item`]. Every operation is spread
/// over the capability traits this trait requires; the members here cover metadata, device
/// placement and the indexed-update builder.
pub trait Array:
    Clone
    + std::fmt::Debug
    + IndexOps
    + CompareOps
    + UnaryOps
    + BinaryOps
    + CoerceOps
    + ReduceOps
    + SortOps
    + ShapeOps
    + SelectOps
    + ViewOps
    + ExportOps
{
    /// Get array metadata
    fn meta(&self) -> &ArrayMeta;

    fn shape(&self) -> &[usize] {
        &self.meta().shape
    }

    fn ndim(&self) -> usize {
        self.meta().ndim()
    }

    /// Total number of elements
    fn size(&self) -> usize {
        self.meta().size()
    }

    fn dtype(&self) -> DType {
        self.meta().dtype
    }

    fn itemsize(&self) -> usize {
        self.dtype().size()
    }

    fn nbytes(&self) -> usize {
        self.meta().nbytes()
    }

    fn weak_type(&self) -> bool {
        self.meta().weak_type
    }

    /// Abstract value: shape, dtype and weak-type flag.
    fn aval(&self) -> ShapedArray {
        let meta = self.meta();
        ShapedArray {
            shape: meta.shape.clone(),
            dtype: meta.dtype,
            weak_type: meta.weak_type,
        }
    }

    fn sharding(&self) -> &Sharding;

    /// Shards held by devices of this process.
    fn addressable_shards(&self) -> Result<Vec<Shard<Self>>>;

    /// Data of the `index`-th addressable shard.
    fn addressable_data(&self, index: usize) -> Result<Self> {
        self.addressable_shards()?
            .into_iter()
            .nth(index)
            .map(|shard| shard.data)
            .ok_or(RaxError::IndexOutOfBounds {
                index: index as isize,
                size: self.sharding().num_devices(),
            })
    }

    fn devices(&self) -> Vec<Device> {
        self.sharding().devices()
    }

    fn is_fully_replicated(&self) -> bool {
        self.sharding().is_fully_replicated()
    }

    fn is_fully_addressable(&self) -> bool {
        self.sharding()
            .is_fully_addressable(Config::global().process_index)
    }

    /// Waits for pending computation and returns the array itself.
    fn block_until_ready(&self) -> Result<Self> {
        Ok(self.clone())
    }

    /// Builder for functional indexed updates: `x.at().index(i).set(v)`.
    fn at(&self) -> IndexUpdateHelper<'_, Self> {
        IndexUpdateHelper::new(self)
    }

    /// Direct construction is not supported; arrays come from backend factories.
    fn new(parts: RawParts) -> Result<Self> {
        tracing::debug!(
            shape = ?parts.shape,
            dtype = ?parts.dtype,
            has_buffer = parts.buffer.is_some(),
            "rejected direct array construction"
        );
        Err(RaxError::DirectInstantiation)
    }
}
