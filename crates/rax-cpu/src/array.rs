//! CPU Array implementation using ndarray

use ndarray::{ArrayD, IxDyn, Zip};
use num_complex::Complex64;
use rax_core::{
    Array, ArrayMeta, Config, DType, DTypeKind, Device, Operand, RaxError, Result, Scalar, Shard,
    Sharding,
};
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

/// CPU-backed N-dimensional array
///
/// Every dtype is held in an `f64` plane; complex dtypes carry a second plane with the
/// imaginary parts. Values are always rounded or wrapped to what the dtype can represent.
#[derive(Debug, Clone)]
pub struct CpuArray {
    data: ArrayD<f64>,
    imag: Option<ArrayD<f64>>,
    meta: ArrayMeta,
    sharding: Sharding,
    host: OnceLock<Arc<[u8]>>,
}

pub(crate) fn x64() -> bool {
    Config::global().enable_x64
}

pub(crate) fn default_float() -> DType {
    DType::default_for(DTypeKind::Float, x64())
}

pub(crate) fn default_int() -> DType {
    DType::default_for(DTypeKind::SignedInt, x64())
}

pub(crate) fn default_device() -> Device {
    Device::new(0, "cpu", Config::global().process_index)
}

impl CpuArray {
    /// Builds an array from its planes, normalizing every value to `dtype`.
    pub(crate) fn from_parts(
        mut data: ArrayD<f64>,
        imag: Option<ArrayD<f64>>,
        dtype: DType,
        weak_type: bool,
    ) -> Self {
        data.mapv_inplace(|x| dtype.normalize(x));
        let imag = if dtype.is_complex() {
            let mut im = match imag {
                Some(im) if im.shape() == data.shape() => im,
                _ => ArrayD::zeros(data.raw_dim()),
            };
            im.mapv_inplace(|x| dtype.normalize(x));
            Some(im)
        } else {
            None
        };
        let meta = ArrayMeta::new(data.shape().to_vec(), dtype).weak(weak_type);
        Self {
            data,
            imag,
            meta,
            sharding: Sharding::SingleDevice(default_device()),
            host: OnceLock::new(),
        }
    }

    pub(crate) fn from_ndarray(data: ArrayD<f64>, dtype: DType) -> Self {
        Self::from_parts(data, None, dtype, false)
    }

    pub(crate) fn from_complex(values: ArrayD<Complex64>, dtype: DType, weak_type: bool) -> Self {
        let re = values.mapv(|z| z.re);
        let im = values.mapv(|z| z.im);
        Self::from_parts(re, Some(im), dtype, weak_type)
    }

    /// Builds an array from row-major values of both planes.
    pub(crate) fn from_vecs(
        shape: &[usize],
        re: Vec<f64>,
        im: Option<Vec<f64>>,
        dtype: DType,
        weak_type: bool,
    ) -> Result<Self> {
        let plane = |values: Vec<f64>| {
            ArrayD::from_shape_vec(IxDyn(shape), values)
                .map_err(|e| RaxError::InvalidShape(e.to_string()))
        };
        let im = im.map(plane).transpose()?;
        Ok(Self::from_parts(plane(re)?, im, dtype, weak_type))
    }

    /// 0-d array holding a host scalar, weakly typed unless it is a bool.
    pub(crate) fn scalar(value: Scalar) -> Self {
        let (dtype, weak) = value.dtype();
        let (re, im) = value.parts();
        let data = ArrayD::from_elem(IxDyn(&[]), re);
        let imag = Some(ArrayD::from_elem(IxDyn(&[]), im));
        Self::from_parts(data, imag, dtype, weak)
    }

    pub(crate) fn operand(operand: Operand<'_, CpuArray>) -> Cow<'_, CpuArray> {
        match operand {
            Operand::Array(array) => Cow::Borrowed(array),
            Operand::Scalar(value) => Cow::Owned(Self::scalar(value)),
        }
    }

    pub(crate) fn with_sharding(mut self, sharding: Sharding) -> Self {
        self.sharding = sharding;
        self
    }

    /// Get the real plane
    pub fn as_ndarray(&self) -> &ArrayD<f64> {
        &self.data
    }

    /// Get the imaginary plane of a complex array
    pub fn imag_ndarray(&self) -> Option<&ArrayD<f64>> {
        self.imag.as_ref()
    }

    /// Real parts in row-major order (for testing/comparison)
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().cloned().collect()
    }

    /// Imaginary parts in row-major order; zeros for real dtypes.
    pub(crate) fn imag_vec(&self) -> Vec<f64> {
        match &self.imag {
            Some(im) => im.iter().cloned().collect(),
            None => vec![0.0; self.data.len()],
        }
    }

    pub(crate) fn complex_ndarray(&self) -> ArrayD<Complex64> {
        match &self.imag {
            Some(im) => Zip::from(&self.data)
                .and(im)
                .map_collect(|&re, &im| Complex64::new(re, im)),
            None => self.data.mapv(|re| Complex64::new(re, 0.0)),
        }
    }

    /// Element `i` in row-major order as `(re, im)`.
    pub(crate) fn flat_parts(&self) -> Vec<(f64, f64)> {
        self.to_f64_vec().into_iter().zip(self.imag_vec()).collect()
    }

    /// Gathers row-major elements `flat` into a new array of `shape`.
    pub(crate) fn gather(&self, flat: &[usize], shape: &[usize]) -> Result<Self> {
        let re = self.to_f64_vec();
        let values = flat.iter().map(|&i| re[i]).collect();
        let imag = self.imag.as_ref().map(|_| {
            let im = self.imag_vec();
            flat.iter().map(|&i| im[i]).collect()
        });
        Self::from_vecs(shape, values, imag, self.dtype(), self.weak_type())
    }

    /// Converts to `dtype`; complex to real drops the imaginary part.
    pub(crate) fn cast_to(&self, dtype: DType, weak_type: bool) -> Self {
        if dtype == self.dtype() {
            let mut out = self.clone();
            out.meta.weak_type = weak_type;
            out.sharding = Sharding::SingleDevice(default_device());
            return out;
        }
        let from = self.dtype();
        let data = if dtype.is_bool() {
            match &self.imag {
                Some(im) => Zip::from(&self.data)
                    .and(im)
                    .map_collect(|&re, &im| f64::from(u8::from(re != 0.0 || im != 0.0))),
                None => self.data.mapv(|x| dtype.cast_from(from, x)),
            }
        } else {
            self.data.mapv(|x| dtype.cast_from(from, x))
        };
        let imag = if dtype.is_complex() {
            self.imag.clone()
        } else {
            None
        };
        Self::from_parts(data, imag, dtype, weak_type)
    }

    /// Applies the same structural transform to both planes, keeping dtype and weak type.
    pub(crate) fn map_planes<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&ArrayD<f64>) -> Result<ArrayD<f64>>,
    {
        let data = f(&self.data)?;
        let imag = self.imag.as_ref().map(&f).transpose()?;
        Ok(Self::from_parts(data, imag, self.dtype(), self.weak_type()))
    }

    /// Row-major native-endian bytes, computed once and shared by every export.
    pub(crate) fn host_bytes(&self) -> Arc<[u8]> {
        self.host
            .get_or_init(|| {
                let dtype = self.dtype();
                let mut bytes = Vec::with_capacity(self.nbytes());
                for (re, im) in self.flat_parts() {
                    dtype.encode(re, im, &mut bytes);
                }
                Arc::from(bytes)
            })
            .clone()
    }

    pub(crate) fn invalidate_host(&mut self) {
        self.host = OnceLock::new();
    }
}

impl Array for CpuArray {
    fn meta(&self) -> &ArrayMeta {
        &self.meta
    }

    fn sharding(&self) -> &Sharding {
        &self.sharding
    }

    fn addressable_shards(&self) -> Result<Vec<Shard<Self>>> {
        crate::shard::addressable_shards(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rax_core::{ExportOps, RawParts};

    #[test]
    fn test_from_parts_normalizes() {
        let data = ArrayD::from_shape_vec(IxDyn(&[3]), vec![1.7, -129.0, 300.0]).unwrap();
        let arr = CpuArray::from_ndarray(data, DType::Int8);
        assert_eq!(arr.to_f64_vec(), vec![1.0, 127.0, 44.0]);
        assert!(arr.imag_ndarray().is_none());
    }

    #[test]
    fn test_complex_gets_imag_plane() {
        let data = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap();
        let arr = CpuArray::from_ndarray(data, DType::Complex64);
        assert_eq!(arr.imag_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_scalar_is_weak() {
        let arr = CpuArray::scalar(Scalar::Float(0.5));
        assert!(arr.weak_type());
        assert_eq!(arr.ndim(), 0);
        assert!(!CpuArray::scalar(Scalar::Bool(true)).weak_type());
    }

    #[test]
    fn test_cast_complex_to_bool() {
        let arr = CpuArray::from_vecs(
            &[2],
            vec![0.0, 0.0],
            Some(vec![0.0, 1.0]),
            DType::Complex64,
            false,
        )
        .unwrap();
        assert_eq!(arr.cast_to(DType::Bool, false).to_f64_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_host_bytes_cached() {
        let arr = CpuArray::from_vecs(&[2], vec![1.0, 2.0], None, DType::Int16, false).unwrap();
        let a = arr.host_bytes();
        let b = arr.host_bytes();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 4);
        assert_eq!(arr.tobytes(rax_core::Order::C).unwrap(), a.to_vec());
    }

    #[test]
    fn test_direct_construction_rejected() {
        let err = CpuArray::new(RawParts::default()).unwrap_err();
        assert_eq!(err, RaxError::DirectInstantiation);
        assert!(err.to_string().contains("asarray"));
    }
}
