//! Array factories for CPU backend

use crate::array::{default_float, default_int, x64};
use crate::{CpuArray, CpuBackend};
use ndarray::{ArrayD, IxDyn};
use rax_core::{
    result_type, Array, Config, CreationOps, DType, Device, RaxError, Result, Scalar, Sharding,
    ShardingError,
};

fn checked_len(len: usize, shape: &[usize]) -> Result<()> {
    let expected: usize = shape.iter().product();
    if len != expected {
        return Err(RaxError::InvalidShape(format!(
            "Data length {} doesn't match shape {:?} (expected {})",
            len, shape, expected
        )));
    }
    Ok(())
}

impl CreationOps for CpuBackend {
    type Array = CpuArray;

    fn array(data: Vec<f64>, shape: Vec<usize>, dtype: Option<DType>) -> Result<CpuArray> {
        checked_len(data.len(), &shape)?;
        let dtype = dtype.map_or_else(default_float, |d| d.canonicalize(x64()));
        CpuArray::from_vecs(&shape, data, None, dtype, false)
    }

    fn from_scalars(values: &[Scalar], shape: Vec<usize>, dtype: Option<DType>) -> Result<CpuArray> {
        checked_len(values.len(), &shape)?;
        // Lists of literals produce strongly typed arrays of the joint type.
        let dtype = match dtype {
            Some(dtype) => dtype.canonicalize(x64()),
            None => values
                .iter()
                .map(Scalar::dtype)
                .reduce(|a, b| result_type(a, b, x64()))
                .map_or_else(default_float, |(dtype, _)| dtype),
        };
        let (re, im): (Vec<f64>, Vec<f64>) = values
            .iter()
            .map(|value| {
                let (re, im) = value.parts();
                if dtype.is_complex() {
                    (re, im)
                } else if dtype.is_bool() {
                    (f64::from(u8::from(re != 0.0 || im != 0.0)), 0.0)
                } else {
                    (dtype.cast_from(value.dtype().0, re), 0.0)
                }
            })
            .unzip();
        CpuArray::from_vecs(&shape, re, Some(im), dtype, false)
    }

    fn asarray(value: Scalar) -> CpuArray {
        CpuArray::scalar(value)
    }

    fn zeros(shape: Vec<usize>, dtype: Option<DType>) -> CpuArray {
        let dtype = dtype.map_or_else(default_float, |d| d.canonicalize(x64()));
        CpuArray::from_ndarray(ArrayD::zeros(IxDyn(&shape)), dtype)
    }

    fn ones(shape: Vec<usize>, dtype: Option<DType>) -> CpuArray {
        let dtype = dtype.map_or_else(default_float, |d| d.canonicalize(x64()));
        CpuArray::from_ndarray(ArrayD::ones(IxDyn(&shape)), dtype)
    }

    fn full(shape: Vec<usize>, value: Scalar, dtype: Option<DType>) -> CpuArray {
        let fill = CpuArray::scalar(value);
        let (dtype, weak) = match dtype {
            Some(dtype) => (dtype.canonicalize(x64()), false),
            None => (fill.dtype(), fill.weak_type()),
        };
        let (re, im) = fill.cast_to(dtype, weak).flat_parts()[0];
        CpuArray::from_parts(
            ArrayD::from_elem(IxDyn(&shape), re),
            Some(ArrayD::from_elem(IxDyn(&shape), im)),
            dtype,
            weak,
        )
    }

    fn arange(start: f64, stop: f64, step: f64, dtype: Option<DType>) -> Result<CpuArray> {
        if step == 0.0 {
            return Err(RaxError::InvalidArgument(
                "Step cannot be zero".to_string(),
            ));
        }
        let dtype = match dtype {
            Some(dtype) => dtype.canonicalize(x64()),
            None if [start, stop, step].iter().all(|x| x.fract() == 0.0) => default_int(),
            None => default_float(),
        };

        let n = ((stop - start) / step).ceil().max(0.0) as usize;
        let values: Vec<f64> = (0..n).map(|i| start + (i as f64) * step).collect();
        CpuArray::from_vecs(&[n], values, None, dtype, false)
    }

    fn devices() -> Vec<Device> {
        let config = Config::global();
        (0..config.cpu_device_count)
            .map(|id| Device::new(id, "cpu", config.process_index))
            .collect()
    }

    fn device_put(x: &CpuArray, sharding: Sharding) -> Result<CpuArray> {
        let available = Config::global().cpu_device_count;
        for device in sharding.devices() {
            if device.platform != "cpu" || device.id >= available {
                return Err(ShardingError::UnknownDevice(device.id).into());
            }
        }
        let layout = sharding.layout(x.shape())?;
        tracing::debug!(
            shape = ?x.shape(),
            devices = sharding.num_devices(),
            shards = layout.len(),
            "device_put"
        );
        Ok(x.cast_to(x.dtype(), x.weak_type()).with_sharding(sharding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use rax_core::{Mesh, MeshAxis, NamedSharding, PartitionDimension, PartitionSpec};

    #[test]
    fn test_array_shape_mismatch() {
        assert!(CpuBackend::array(vec![1.0, 2.0, 3.0], vec![2, 2], None).is_err());
        let arr = CpuBackend::array(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2], None).unwrap();
        assert_eq!(arr.dtype(), DType::Float32);
        assert!(!arr.weak_type());
    }

    #[test]
    fn test_from_scalars_infers_dtype() {
        let ints = CpuBackend::from_scalars(&[1.into(), 2.into()], vec![2], None).unwrap();
        assert_eq!(ints.dtype(), DType::Int32);
        assert!(!ints.weak_type());
        let mixed = CpuBackend::from_scalars(&[1.into(), 2.5.into()], vec![2], None).unwrap();
        assert_eq!(mixed.dtype(), DType::Float32);
        let flags = CpuBackend::from_scalars(&[true.into(), false.into()], vec![2], None).unwrap();
        assert_eq!(flags.dtype(), DType::Bool);
        let z = CpuBackend::from_scalars(&[Complex64::new(0.0, 1.0).into()], vec![1], None).unwrap();
        assert_eq!(z.dtype(), DType::Complex64);
    }

    #[test]
    fn test_asarray_is_weak() {
        let x = CpuBackend::asarray(Scalar::Float(2.0));
        assert!(x.weak_type());
        assert_eq!(x.shape(), &[] as &[usize]);
    }

    #[test]
    fn test_full() {
        let x = CpuBackend::full(vec![2, 2], Scalar::Int(7), None);
        assert_eq!(x.dtype(), DType::Int32);
        assert!(x.weak_type());
        assert_eq!(x.to_f64_vec(), vec![7.0; 4]);
        let y = CpuBackend::full(vec![3], Scalar::Float(1.5), Some(DType::Int8));
        assert_eq!(y.to_f64_vec(), vec![1.0; 3]);
        assert!(!y.weak_type());
    }

    #[test]
    fn test_arange() {
        let x = CpuBackend::arange(0.0, 5.0, 2.0, None).unwrap();
        assert_eq!(x.dtype(), DType::Int32);
        assert_eq!(x.to_f64_vec(), vec![0.0, 2.0, 4.0]);
        let y = CpuBackend::arange(1.0, 0.0, 0.25, None).unwrap();
        assert_eq!(y.size(), 0);
        let z = CpuBackend::arange(1.0, 0.0, -0.5, None).unwrap();
        assert_eq!(z.dtype(), DType::Float32);
        assert_eq!(z.to_f64_vec(), vec![1.0, 0.5]);
        assert!(CpuBackend::arange(0.0, 1.0, 0.0, None).is_err());
    }

    #[test]
    fn test_zeros_canonicalizes() {
        let x = CpuBackend::zeros(vec![2], Some(DType::Float64));
        assert_eq!(x.dtype(), DType::Float64.canonicalize(Config::global().enable_x64));
    }

    #[test]
    fn test_device_put() {
        let devices = CpuBackend::devices();
        assert!(devices.len() >= 2);
        let mesh = Mesh::new(vec![MeshAxis::new("x", 2).unwrap()], devices[..2].to_vec()).unwrap();
        let spec = PartitionSpec::new(vec![PartitionDimension::sharded("x")]);
        let sharding = Sharding::Named(NamedSharding::new(mesh, spec).unwrap());

        let x = CpuBackend::arange(0.0, 4.0, 1.0, None).unwrap();
        let y = CpuBackend::device_put(&x, sharding.clone()).unwrap();
        assert_eq!(y.sharding(), &sharding);
        assert_eq!(y.devices().len(), 2);
        assert!(!y.is_fully_replicated());

        let matrix = CpuBackend::zeros(vec![2, 2], None);
        assert!(CpuBackend::device_put(&matrix, sharding).is_err());
    }

    #[test]
    fn test_device_put_unknown_device() {
        let bogus = Sharding::SingleDevice(Device::new(10_000, "cpu", 0));
        let x = CpuBackend::zeros(vec![1], None);
        assert!(matches!(
            CpuBackend::device_put(&x, bogus),
            Err(RaxError::Sharding(ShardingError::UnknownDevice(10_000)))
        ));
    }
}
