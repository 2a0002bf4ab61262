//! Indexing, indexed updates and iteration tests - JAX compatible

#[cfg(test)]
mod tests {
    use crate::backend_tests;
    use crate::utils::*;
    use proptest::prelude::*;
    use rax_core::{
        index, Array, CreationOps, DType, ExportOps, GatherOptions, IndexItem, IndexOps,
        NonzeroFill, Order, RaxError, SelectOps, ShapeOps, Sharding, Slice, TakeMode,
    };
    use rax_cpu::{CpuArray, CpuBackend};

    fn grid() -> CpuArray {
        CpuBackend::arange(0.0, 12.0, 1.0, None)
            .unwrap()
            .reshape(&[3, 4], Order::C)
            .unwrap()
    }

    // ============ gathers ============

    backend_tests!(CpuBackend, test_basic_indexing, {
        let x = grid();
        let row = x.get_item(&index![1], GatherOptions::default()).unwrap();
        assert_eq!(values(&row).unwrap(), vec![4.0, 5.0, 6.0, 7.0]);

        let last = x.get_item(&index![-1, -1], GatherOptions::default()).unwrap();
        assert_eq!(last.ndim(), 0);
        assert_eq!(values(&last).unwrap(), vec![11.0]);

        let block = x.get_item(&index![0..2, 1..3], GatherOptions::default()).unwrap();
        assert_eq!(block.shape(), &[2, 2]);
        assert_eq!(values(&block).unwrap(), vec![1.0, 2.0, 5.0, 6.0]);

        let reversed = x
            .get_item(&index![Slice::full().with_step(-2)], GatherOptions::default())
            .unwrap();
        assert_eq!(reversed.shape(), &[2, 4]);
        assert_eq!(values(&reversed).unwrap()[..4].to_vec(), vec![8.0, 9.0, 10.0, 11.0]);
    });

    backend_tests!(CpuBackend, test_ellipsis_and_newaxis, {
        let x = grid();
        let col = x
            .get_item(&index![IndexItem::Ellipsis, 0], GatherOptions::default())
            .unwrap();
        assert_eq!(values(&col).unwrap(), vec![0.0, 4.0, 8.0]);

        let expanded = x
            .get_item(&index![IndexItem::NewAxis, .., IndexItem::NewAxis], GatherOptions::default())
            .unwrap();
        assert_eq!(expanded.shape(), &[1, 3, 1, 4]);

        let twice = index![IndexItem::Ellipsis, IndexItem::Ellipsis];
        assert!(x.get_item(&twice, GatherOptions::default()).is_err());
        assert!(x.get_item(&index![0, 0, 0], GatherOptions::default()).is_err());
    });

    backend_tests!(CpuBackend, test_advanced_indexing, {
        let x = grid();
        let picked = x
            .get_item(&index![vec![2isize, 0, -1]], GatherOptions::default())
            .unwrap();
        assert_eq!(picked.shape(), &[3, 4]);
        assert_eq!(values(&picked).unwrap()[..4].to_vec(), vec![8.0, 9.0, 10.0, 11.0]);

        let masked = x
            .get_item(&index![.., vec![true, false, false, true]], GatherOptions::default())
            .unwrap();
        assert_eq!(masked.shape(), &[3, 2]);
        assert_eq!(values(&masked).unwrap(), vec![0.0, 3.0, 4.0, 7.0, 8.0, 11.0]);

        let two = index![vec![0isize], vec![1isize]];
        assert!(matches!(
            x.get_item(&two, GatherOptions::default()),
            Err(RaxError::NotImplemented(_))
        ));
    });

    backend_tests!(CpuBackend, test_out_of_bounds, {
        let x = grid();
        assert!(matches!(
            x.get_item(&index![3], GatherOptions::default()),
            Err(RaxError::IndexOutOfBounds { index: 3, size: 3 })
        ));
        assert!(x.get_item(&index![-4], GatherOptions::default()).is_err());
    });

    // ============ functional updates ============

    backend_tests!(CpuBackend, test_at_set_and_add, {
        let x = B::zeros(vec![4], Some(DType::Int32));
        let set = x.at().index(1).set(5).unwrap();
        assert_eq!(values(&set).unwrap(), vec![0.0, 5.0, 0.0, 0.0]);
        assert_eq!(values(&x).unwrap(), vec![0.0; 4]);

        let key = index![vec![0isize, 0, 2]];
        let added = x.at().index(key.clone()).add(1).unwrap();
        assert_eq!(values(&added).unwrap(), vec![2.0, 0.0, 1.0, 0.0]);

        let got = added.at().index(key).get().unwrap();
        assert_eq!(values(&got).unwrap(), vec![2.0, 2.0, 1.0]);
    });

    backend_tests!(CpuBackend, test_at_combining_ops, {
        let x = B::array(vec![2.0, 3.0, 4.0], vec![3], None).unwrap();
        let key = index![0..2];
        assert_eq!(values(&x.at().index(key.clone()).multiply(2.0).unwrap()).unwrap(), vec![4.0, 6.0, 4.0]);
        assert_eq!(values(&x.at().index(key.clone()).min(2.5).unwrap()).unwrap(), vec![2.0, 2.5, 4.0]);
        assert_eq!(values(&x.at().index(key.clone()).max(2.5).unwrap()).unwrap(), vec![2.5, 3.0, 4.0]);
        assert_eq!(values(&x.at().index(key.clone()).power(2.0).unwrap()).unwrap(), vec![4.0, 9.0, 4.0]);
        assert!(values_approx_eq(
            &x.at().index(key.clone()).divide(2.0).unwrap(),
            &[1.0, 1.5, 4.0],
            DEFAULT_TOL
        ));
        let doubled = x.at().index(key).apply(|v| v.at().index(index![..]).multiply(2.0)).unwrap();
        assert_eq!(values(&doubled).unwrap(), vec![4.0, 6.0, 4.0]);
    });

    backend_tests!(CpuBackend, test_set_item_mutates_in_place, {
        let devices = B::devices();
        let pinned = Sharding::SingleDevice(devices[1].clone());
        let mut x = B::device_put(&B::zeros(vec![3], None), pinned.clone()).unwrap();
        let before = x.tobytes(Order::C).unwrap();

        x.set_item(&index![2], 7.0).unwrap();
        assert_eq!(values(&x).unwrap(), vec![0.0, 0.0, 7.0]);
        assert_eq!(x.sharding(), &pinned);

        let after = x.tobytes(Order::C).unwrap();
        assert_ne!(before, after);
        assert_eq!(&after[8..], &7.0f32.to_ne_bytes());
    });

    // ============ iteration ============

    backend_tests!(CpuBackend, test_len_and_iteration, {
        let x = grid();
        assert_eq!(x.len().unwrap(), 3);
        let rows: Vec<_> = x.iter().unwrap().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(values(&rows[2]).unwrap(), vec![8.0, 9.0, 10.0, 11.0]);

        let backwards: Vec<_> = x.reversed().unwrap().collect();
        assert_eq!(values(&backwards[0]).unwrap(), vec![8.0, 9.0, 10.0, 11.0]);

        let scalar = B::asarray(1.0.into());
        assert!(matches!(scalar.len(), Err(RaxError::TypeError(_))));
        assert!(scalar.iter().is_err());
    });

    // ============ selection helpers ============

    backend_tests!(CpuBackend, test_take_modes, {
        let x = B::array(vec![10.0, 20.0, 30.0], vec![3], None).unwrap();
        let idx = B::array(vec![-1.0, 3.0], vec![2], Some(DType::Int32)).unwrap();
        assert_eq!(values(&x.take(&idx, None, TakeMode::Clip).unwrap()).unwrap(), vec![10.0, 30.0]);
        assert_eq!(values(&x.take(&idx, None, TakeMode::Wrap).unwrap()).unwrap(), vec![30.0, 10.0]);
        let filled = values(&x.take(&idx, None, TakeMode::Fill(None)).unwrap()).unwrap();
        assert_eq!(filled[0], 30.0);
        assert!(filled[1].is_nan());
    });

    backend_tests!(CpuBackend, test_nonzero_padding, {
        let x = B::array(vec![0.0, 1.0, 0.0, 2.0], vec![2, 2], None).unwrap();
        let coords = x.nonzero(None, None).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(values(&coords[0]).unwrap(), vec![0.0, 1.0]);
        assert_eq!(values(&coords[1]).unwrap(), vec![1.0, 1.0]);

        let padded = x.nonzero(Some(3), Some(NonzeroFill::PerAxis(vec![-1, -2]))).unwrap();
        assert_eq!(values(&padded[0]).unwrap(), vec![0.0, 1.0, -1.0]);
        assert_eq!(values(&padded[1]).unwrap(), vec![1.0, 1.0, -2.0]);
        assert!(x.nonzero(Some(3), Some(NonzeroFill::PerAxis(vec![0]))).is_err());
    });

    proptest! {
        #[test]
        fn prop_nonzero_with_size_is_fixed_length(
            flags in prop::collection::vec(any::<bool>(), 1..32),
            size in 0usize..40,
        ) {
            let data: Vec<f64> = flags.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect();
            let x = CpuBackend::array(data, vec![flags.len()], None).unwrap();
            let exact = values(&x.nonzero(None, None).unwrap()[0]).unwrap();
            let sized = values(&x.nonzero(Some(size), Some(NonzeroFill::All(-1))).unwrap()[0]).unwrap();

            prop_assert_eq!(sized.len(), size);
            let kept = exact.len().min(size);
            prop_assert_eq!(&sized[..kept], &exact[..kept]);
            prop_assert!(sized[kept..].iter().all(|&v| v == -1.0));
        }

        #[test]
        fn prop_get_after_set_roundtrips(i in -6isize..6, v in -100i32..100) {
            let x = CpuBackend::zeros(vec![6], Some(DType::Int32));
            let y = x.at().index(i).set(v).unwrap();
            let got = y.get_item(&index![i], GatherOptions::default()).unwrap();
            prop_assert_eq!(got.item(&[]).unwrap(), rax_core::Scalar::Int(i64::from(v)));
        }
    }
}
