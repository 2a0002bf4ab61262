//! CPU Backend for Rax
//!
//! Uses ndarray for element storage and faer for matrix products. Every operation trait
//! from `rax-core` is implemented on [`CpuArray`]; [`CpuBackend`] supplies the factories.

mod array;
pub mod broadcast;
mod compare;
mod convert;
mod creation;
mod index;
mod linalg;
mod manipulation;
mod math;
mod select;
mod shard;
mod sort;
mod stats;

pub use array::CpuArray;
pub use broadcast::{broadcast_all, broadcast_binary_op, broadcast_shapes};

use rax_core::Backend;

/// CPU backend using ndarray + faer
pub struct CpuBackend;

impl Backend for CpuBackend {
    fn name() -> &'static str {
        "cpu"
    }

    fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    #[cfg(target_feature = "avx2")]
    fn has_simd() -> bool {
        true
    }

    #[cfg(not(target_feature = "avx2"))]
    fn has_simd() -> bool {
        false
    }
}

// Re-export the array type
pub type Array = CpuArray;
