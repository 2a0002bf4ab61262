//! Export handles for other runtimes: a buffer-protocol view and a DLPack tensor.

use crate::dtype::{DType, DTypeKind};
use std::sync::Arc;

/// Read-only, C-contiguous view of an array's host bytes (PEP 3118 layout).
#[derive(Debug, Clone)]
pub struct BufferView {
    pub data: Arc<[u8]>,
    /// Python `struct` format string of one element.
    pub format: &'static str,
    pub itemsize: usize,
    pub shape: Vec<usize>,
    /// Byte strides.
    pub strides: Vec<isize>,
    pub readonly: bool,
}

impl BufferView {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `DLDeviceType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DlDeviceType {
    Cpu = 1,
    Cuda = 2,
    CudaHost = 3,
    OpenCl = 4,
    Vulkan = 7,
    Metal = 8,
    Rocm = 10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DlDevice {
    pub device_type: DlDeviceType,
    pub device_id: i32,
}

/// `DLDataTypeCode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DlDataTypeCode {
    Int = 0,
    UInt = 1,
    Float = 2,
    BFloat = 4,
    Complex = 5,
    Bool = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DlDataType {
    pub code: DlDataTypeCode,
    pub bits: u8,
    pub lanes: u16,
}

impl From<DType> for DlDataType {
    fn from(dtype: DType) -> Self {
        let code = match dtype.kind() {
            DTypeKind::Bool => DlDataTypeCode::Bool,
            DTypeKind::SignedInt => DlDataTypeCode::Int,
            DTypeKind::UnsignedInt => DlDataTypeCode::UInt,
            DTypeKind::Float if dtype == DType::BFloat16 => DlDataTypeCode::BFloat,
            DTypeKind::Float => DlDataTypeCode::Float,
            DTypeKind::Complex => DlDataTypeCode::Complex,
        };
        Self {
            code,
            bits: dtype.bits() as u8,
            lanes: 1,
        }
    }
}

/// A DLPack-style tensor sharing the exporting array's host buffer.
#[derive(Debug, Clone)]
pub struct DlPackTensor {
    pub data: Arc<[u8]>,
    pub device: DlDevice,
    pub dtype: DlDataType,
    pub shape: Vec<i64>,
    /// Strides in elements, not bytes.
    pub strides: Vec<i64>,
    pub byte_offset: u64,
}
