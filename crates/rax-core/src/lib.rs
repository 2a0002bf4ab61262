//! Rax Core - Array contract and common types
//!
//! This crate defines the interface every rax backend implements: the [`Array`] trait with its
//! capability traits, dtypes and promotion, indexing keys, sharding descriptors and export
//! handles. Backends supply the concrete array type and the factories in [`ops::CreationOps`].

pub mod array;
pub mod at;
pub mod backend;
pub mod config;
pub mod dtype;
pub mod error;
pub mod index;
pub mod interop;
pub mod ops;
pub mod scalar;
pub mod sharding;

pub use array::{Array, ArrayMeta, RawParts, ShapedArray};
pub use at::{IndexUpdateHelper, IndexUpdateRef};
pub use backend::Backend;
pub use config::Config;
pub use dtype::{promote_types, result_type, DType, DTypeKind};
pub use error::{RaxError, Result};
pub use index::{Axes, Index, IndexItem, Slice};
pub use interop::{BufferView, DlDevice, DlDeviceType, DlPackTensor};
pub use ops::*;
pub use scalar::{ListValue, Operand, Scalar};
pub use sharding::{
    Device, Mesh, MeshAxis, NamedSharding, PartitionDimension, PartitionSpec, Shard, ShardSlice,
    Sharding, ShardingError,
};
