//! Scalar coercion, dtype views and host export for CPU backend

use crate::array::{x64, CpuArray};
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;
use rax_core::{
    Array, BufferView, CoerceOps, DType, DlDevice, DlDeviceType, DlPackTensor, ExportOps,
    ListValue, Order, RaxError, Result, Scalar, ShapeOps, ViewOps,
};

impl CpuArray {
    /// The only element of a size-1 array.
    fn single(&self, target: &str) -> Result<(f64, f64)> {
        if self.size() != 1 {
            return Err(RaxError::TypeError(format!(
                "only size-1 arrays can be converted to {}, got shape {:?}",
                target,
                self.shape()
            )));
        }
        Ok(self.flat_parts()[0])
    }

    fn real_single(&self, target: &str) -> Result<f64> {
        if self.dtype().is_complex() {
            return Err(RaxError::TypeError(format!(
                "can't convert complex to {}",
                target
            )));
        }
        Ok(self.single(target)?.0)
    }
}

impl CoerceOps for CpuArray {
    fn to_bool(&self) -> Result<bool> {
        let (re, im) = self.single("bool")?;
        Ok(re != 0.0 || im != 0.0)
    }

    fn to_complex(&self) -> Result<Complex64> {
        let (re, im) = self.single("complex")?;
        Ok(Complex64::new(re, im))
    }

    fn to_int(&self) -> Result<i64> {
        let x = self.real_single("int")?;
        if !x.is_finite() {
            return Err(RaxError::InvalidArgument(format!(
                "cannot convert float {} to integer",
                x
            )));
        }
        Ok(x.trunc() as i64)
    }

    fn to_float(&self) -> Result<f64> {
        self.real_single("float")
    }

    fn to_index(&self) -> Result<isize> {
        if self.ndim() != 0 || !self.dtype().is_integer() {
            return Err(RaxError::TypeError(
                "only integer scalar arrays can be converted to a scalar index".to_string(),
            ));
        }
        Ok(self.flat_parts()[0].0 as isize)
    }
}

impl ViewOps for CpuArray {
    fn astype(&self, dtype: DType) -> Result<Self> {
        let dtype = dtype.canonicalize(x64());
        Ok(self
            .cast_to(dtype, false)
            .with_sharding(self.sharding().clone()))
    }

    fn copy(&self) -> Result<Self> {
        Ok(self
            .cast_to(self.dtype(), self.weak_type())
            .with_sharding(self.sharding().clone()))
    }

    fn view(&self, dtype: Option<DType>) -> Result<Self> {
        let dtype = match dtype {
            Some(dtype) if dtype != self.dtype() => dtype,
            _ => return self.copy(),
        };
        let (old, new) = (self.itemsize(), dtype.size());
        let mut shape = self.shape().to_vec();
        if old != new {
            let last = shape.last_mut().ok_or_else(|| {
                RaxError::InvalidArgument(
                    "changing to a dtype of a different size is not supported for 0-d arrays"
                        .to_string(),
                )
            })?;
            if (*last * old) % new != 0 {
                return Err(RaxError::InvalidArgument(format!(
                    "the last axis ({} bytes) is not a multiple of the new itemsize {}",
                    *last * old,
                    new
                )));
            }
            *last = *last * old / new;
        }

        let bytes = self.host_bytes();
        let (re, im): (Vec<f64>, Vec<f64>) =
            bytes.chunks_exact(new).map(|chunk| dtype.decode(chunk)).unzip();
        CpuArray::from_vecs(&shape, re, Some(im), dtype, false)
    }

    fn conj(&self) -> Result<Self> {
        match self.imag_ndarray() {
            Some(im) => Ok(CpuArray::from_parts(
                self.as_ndarray().clone(),
                Some(im.mapv(|x| -x)),
                self.dtype(),
                self.weak_type(),
            )),
            None => self.copy(),
        }
    }

    fn real(&self) -> Result<Self> {
        if !self.dtype().is_complex() {
            return self.copy();
        }
        Ok(CpuArray::from_parts(
            self.as_ndarray().clone(),
            None,
            self.dtype().component(),
            self.weak_type(),
        ))
    }

    fn imag(&self) -> Result<Self> {
        let data = match self.imag_ndarray() {
            Some(im) => im.clone(),
            None => ArrayD::zeros(IxDyn(self.shape())),
        };
        Ok(CpuArray::from_parts(
            data,
            None,
            self.dtype().component(),
            self.weak_type(),
        ))
    }
}

fn nested(parts: &[(f64, f64)], dtype: DType, shape: &[usize]) -> ListValue {
    match shape.split_first() {
        None => {
            let (re, im) = parts[0];
            ListValue::Scalar(Scalar::from_parts(dtype, re, im))
        }
        Some((&len, rest)) => {
            let step: usize = rest.iter().product();
            ListValue::List(
                (0..len)
                    .map(|i| nested(&parts[i * step..(i + 1) * step], dtype, rest))
                    .collect(),
            )
        }
    }
}

impl ExportOps for CpuArray {
    fn item(&self, index: &[usize]) -> Result<Scalar> {
        let shape = self.shape();
        let flat = match index {
            [] => {
                if self.size() != 1 {
                    return Err(RaxError::InvalidArgument(
                        "can only convert an array of size 1 to a scalar".to_string(),
                    ));
                }
                0
            }
            [i] if shape.len() != 1 => {
                if *i >= self.size() {
                    return Err(RaxError::IndexOutOfBounds {
                        index: *i as isize,
                        size: self.size(),
                    });
                }
                *i
            }
            _ if index.len() == shape.len() => {
                let mut flat = 0;
                for (&i, &n) in index.iter().zip(shape) {
                    if i >= n {
                        return Err(RaxError::IndexOutOfBounds {
                            index: i as isize,
                            size: n,
                        });
                    }
                    flat = flat * n + i;
                }
                flat
            }
            _ => {
                return Err(RaxError::InvalidArgument(format!(
                    "incorrect number of indices for array of rank {}",
                    shape.len()
                )))
            }
        };
        let (re, im) = self.flat_parts()[flat];
        Ok(Scalar::from_parts(self.dtype(), re, im))
    }

    fn tolist(&self) -> Result<ListValue> {
        Ok(nested(&self.flat_parts(), self.dtype(), self.shape()))
    }

    fn tobytes(&self, order: Order) -> Result<Vec<u8>> {
        match order {
            Order::C => Ok(self.host_bytes().to_vec()),
            Order::F => Ok(self.t()?.host_bytes().to_vec()),
        }
    }

    fn buffer(&self) -> Result<BufferView> {
        let dtype = self.dtype();
        let format = dtype.buffer_format().ok_or(RaxError::UnsupportedDType {
            op: "buffer protocol",
            dtype,
        })?;
        Ok(BufferView {
            data: self.host_bytes(),
            format,
            itemsize: dtype.size(),
            shape: self.shape().to_vec(),
            strides: self.meta().strides.iter().map(|&s| s as isize).collect(),
            readonly: true,
        })
    }

    fn dlpack(&self, stream: Option<i64>) -> Result<DlPackTensor> {
        if let Some(stream) = stream {
            return Err(RaxError::InvalidArgument(format!(
                "CPU arrays are not associated with a stream, got {}",
                stream
            )));
        }
        if self.sharding().num_devices() > 1 {
            return Err(RaxError::InvalidArgument(
                "DLPack export needs an array committed to a single device".to_string(),
            ));
        }
        let itemsize = self.itemsize().max(1);
        Ok(DlPackTensor {
            data: self.host_bytes(),
            device: self.dlpack_device(),
            dtype: self.dtype().into(),
            shape: self.shape().iter().map(|&n| n as i64).collect(),
            strides: self
                .meta()
                .strides
                .iter()
                .map(|&s| (s / itemsize) as i64)
                .collect(),
            byte_offset: 0,
        })
    }

    fn dlpack_device(&self) -> DlDevice {
        DlDevice {
            device_type: DlDeviceType::Cpu,
            device_id: self.devices().first().map_or(0, |d| d.id as i32),
        }
    }
}
