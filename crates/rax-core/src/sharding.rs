//! Sharding descriptors
//!
//! A [`Sharding`] says how an array's elements are laid out over devices. Arrays either live
//! whole on one device or are split over a named [`Mesh`] according to a [`PartitionSpec`]:
//! each array dimension is either replicated or divided over the product of one or more mesh
//! axes. [`Sharding::layout`] turns that description into concrete per-device slices.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShardingError {
    #[error("mesh axis names must be non-empty")]
    EmptyMeshAxisName,

    #[error("mesh axis '{0}' must have size > 0")]
    InvalidMeshAxisSize(String),

    #[error("mesh axis '{0}' appears more than once")]
    DuplicateMeshAxisName(String),

    #[error("mesh device id {0} appears more than once")]
    DuplicateDevice(usize),

    #[error("mesh has {actual} device(s), but axis sizes imply {expected}")]
    DeviceCountMismatch { expected: usize, actual: usize },

    #[error("partitioning references unknown mesh axis '{0}'")]
    UnknownMeshAxis(String),

    #[error("partition dimension #{0} has an empty mesh-axis list")]
    EmptyPartitionAxisList(usize),

    #[error("mesh axis '{0}' is used multiple times in the partition specification")]
    DuplicatePartitionAxis(String),

    #[error("partition spec has rank {partition_rank}, but the array has rank {array_rank}")]
    RankMismatch {
        partition_rank: usize,
        array_rank: usize,
    },

    #[error("device {0} is not available on this backend")]
    UnknownDevice(usize),
}

/// One addressable compute device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    pub id: usize,
    pub platform: String,
    /// Host process that owns the device.
    pub process_index: usize,
}

impl Device {
    pub fn new(id: usize, platform: impl Into<String>, process_index: usize) -> Self {
        Self {
            id,
            platform: platform.into(),
            process_index,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.id)
    }
}

/// Named axis of a device mesh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshAxis {
    name: String,
    size: usize,
}

impl MeshAxis {
    pub fn new(name: impl Into<String>, size: usize) -> Result<Self, ShardingError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ShardingError::EmptyMeshAxisName);
        }
        if size == 0 {
            return Err(ShardingError::InvalidMeshAxisSize(name));
        }
        Ok(Self { name, size })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Devices arranged in a row-major grid with named axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mesh {
    axes: Vec<MeshAxis>,
    devices: Vec<Device>,
}

impl Mesh {
    pub fn new(axes: Vec<MeshAxis>, devices: Vec<Device>) -> Result<Self, ShardingError> {
        let mut names = HashSet::new();
        for axis in &axes {
            if !names.insert(axis.name()) {
                return Err(ShardingError::DuplicateMeshAxisName(axis.name().to_string()));
            }
        }
        let mut ids = HashSet::new();
        for device in &devices {
            if !ids.insert(device.id) {
                return Err(ShardingError::DuplicateDevice(device.id));
            }
        }
        let expected: usize = axes.iter().map(MeshAxis::size).product();
        if expected != devices.len() {
            return Err(ShardingError::DeviceCountMismatch {
                expected,
                actual: devices.len(),
            });
        }
        Ok(Self { axes, devices })
    }

    pub fn axes(&self) -> &[MeshAxis] {
        &self.axes
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|axis| axis.name() == name)
    }

    /// Row-major mesh coordinate of the device at `device_index`.
    pub fn coordinate(&self, mut device_index: usize) -> Vec<usize> {
        let mut coordinate = vec![0; self.axes.len()];
        for (slot, axis) in coordinate.iter_mut().zip(&self.axes).rev() {
            *slot = device_index % axis.size();
            device_index /= axis.size();
        }
        coordinate
    }
}

/// How one array dimension maps onto mesh axes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionDimension {
    /// Replicated along this dimension.
    Unsharded,
    /// Split over the product of these axes, major to minor.
    Sharded(Vec<String>),
}

impl PartitionDimension {
    pub fn sharded(axis: impl Into<String>) -> Self {
        Self::Sharded(vec![axis.into()])
    }

    pub fn sharded_by<I, N>(axes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::Sharded(axes.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionSpec {
    dimensions: Vec<PartitionDimension>,
}

impl PartitionSpec {
    pub fn new(dimensions: Vec<PartitionDimension>) -> Self {
        Self { dimensions }
    }

    /// Every dimension replicated.
    pub fn replicated(rank: usize) -> Self {
        Self::new(vec![PartitionDimension::Unsharded; rank])
    }

    pub fn dimensions(&self) -> &[PartitionDimension] {
        &self.dimensions
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }
}

/// A mesh together with a partition spec over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSharding {
    mesh: Mesh,
    spec: PartitionSpec,
}

impl NamedSharding {
    pub fn new(mesh: Mesh, spec: PartitionSpec) -> Result<Self, ShardingError> {
        let mut used = HashSet::new();
        for (dimension, partition) in spec.dimensions().iter().enumerate() {
            if let PartitionDimension::Sharded(axes) = partition {
                if axes.is_empty() {
                    return Err(ShardingError::EmptyPartitionAxisList(dimension));
                }
                for axis in axes {
                    if mesh.axis_index(axis).is_none() {
                        return Err(ShardingError::UnknownMeshAxis(axis.clone()));
                    }
                    if !used.insert(axis.as_str()) {
                        return Err(ShardingError::DuplicatePartitionAxis(axis.clone()));
                    }
                }
            }
        }
        Ok(Self { mesh, spec })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn spec(&self) -> &PartitionSpec {
        &self.spec
    }
}

/// Placement of an array's data across devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sharding {
    SingleDevice(Device),
    Named(NamedSharding),
}

impl Sharding {
    pub fn devices(&self) -> Vec<Device> {
        match self {
            Sharding::SingleDevice(device) => vec![device.clone()],
            Sharding::Named(named) => named.mesh().devices().to_vec(),
        }
    }

    pub fn num_devices(&self) -> usize {
        match self {
            Sharding::SingleDevice(_) => 1,
            Sharding::Named(named) => named.mesh().devices().len(),
        }
    }

    /// Whether every device holds the complete array.
    pub fn is_fully_replicated(&self) -> bool {
        match self {
            Sharding::SingleDevice(_) => true,
            Sharding::Named(named) => named.spec().dimensions().iter().all(|d| match d {
                PartitionDimension::Unsharded => true,
                PartitionDimension::Sharded(axes) => axes.iter().all(|axis| {
                    named
                        .mesh()
                        .axis_index(axis)
                        .map_or(true, |i| named.mesh().axes()[i].size() == 1)
                }),
            }),
        }
    }

    /// Whether every device belongs to `process_index`.
    pub fn is_fully_addressable(&self, process_index: usize) -> bool {
        self.devices()
            .iter()
            .all(|device| device.process_index == process_index)
    }

    /// Computes the slice of an array of `shape` that each device holds, in device order.
    pub fn layout(&self, shape: &[usize]) -> Result<Vec<ShardPlacement>, ShardingError> {
        let named = match self {
            Sharding::SingleDevice(device) => {
                return Ok(vec![ShardPlacement {
                    device: device.clone(),
                    index: shape.iter().map(|&n| ShardSlice::new(0, n)).collect(),
                    replica_id: 0,
                }]);
            }
            Sharding::Named(named) => named,
        };

        let spec = named.spec();
        if spec.rank() != shape.len() {
            return Err(ShardingError::RankMismatch {
                partition_rank: spec.rank(),
                array_rank: shape.len(),
            });
        }

        let mesh = named.mesh();
        let mut placements: Vec<ShardPlacement> = Vec::with_capacity(mesh.devices().len());
        for (device_index, device) in mesh.devices().iter().enumerate() {
            let coordinate = mesh.coordinate(device_index);
            let mut index = Vec::with_capacity(shape.len());
            for (&dim, partition) in shape.iter().zip(spec.dimensions()) {
                let slice = match partition {
                    PartitionDimension::Unsharded => ShardSlice::new(0, dim),
                    PartitionDimension::Sharded(axes) => {
                        let mut part = 0;
                        let mut count = 1;
                        for axis in axes {
                            let i = mesh
                                .axis_index(axis)
                                .ok_or_else(|| ShardingError::UnknownMeshAxis(axis.clone()))?;
                            part = part * mesh.axes()[i].size() + coordinate[i];
                            count *= mesh.axes()[i].size();
                        }
                        partition_slice(dim, count, part)
                    }
                };
                index.push(slice);
            }
            let replica_id = placements.iter().filter(|p| p.index == index).count();
            placements.push(ShardPlacement {
                device: device.clone(),
                index,
                replica_id,
            });
        }
        Ok(placements)
    }
}

/// Splits `size` elements into `count` near-equal parts; the first `size % count` parts get
/// one extra element.
fn partition_slice(size: usize, count: usize, part: usize) -> ShardSlice {
    let base = size / count;
    let remainder = size % count;
    let start = part * base + part.min(remainder);
    let len = base + usize::from(part < remainder);
    ShardSlice::new(start, start + len)
}

/// Half-open range `[start, end)` along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardSlice {
    pub start: usize,
    pub end: usize,
}

impl ShardSlice {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Where one shard lives and which part of the global array it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardPlacement {
    pub device: Device,
    pub index: Vec<ShardSlice>,
    /// Distinguishes devices that hold identical slices.
    pub replica_id: usize,
}

/// A shard together with its data.
#[derive(Debug, Clone)]
pub struct Shard<A> {
    pub device: Device,
    pub index: Vec<ShardSlice>,
    pub replica_id: usize,
    pub data: A,
}
