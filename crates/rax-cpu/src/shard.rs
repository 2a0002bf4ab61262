//! Shard views of host arrays

use crate::CpuArray;
use ndarray::Slice;
use rax_core::{Array, Config, Result, Shard, Sharding};

/// Slices `arr` according to its sharding, keeping the shards owned by this process.
pub(crate) fn addressable_shards(arr: &CpuArray) -> Result<Vec<Shard<CpuArray>>> {
    let process_index = Config::global().process_index;
    let layout = arr.sharding().layout(arr.shape())?;

    let mut shards = Vec::new();
    for placement in layout {
        if placement.device.process_index != process_index {
            continue;
        }
        let index = placement.index.clone();
        let data = arr.map_planes(|plane| {
            Ok(plane
                .slice_each_axis(|ax| {
                    let range = index[ax.axis.index()];
                    Slice::from(range.start..range.end)
                })
                .to_owned())
        })?;
        shards.push(Shard {
            data: data.with_sharding(Sharding::SingleDevice(placement.device.clone())),
            device: placement.device,
            index: placement.index,
            replica_id: placement.replica_id,
        });
    }
    Ok(shards)
}
