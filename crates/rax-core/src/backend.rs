//! Backend trait

use crate::array::Array;
use crate::ops::CreationOps;

/// A complete backend implementation
///
/// The array type carries every operation; a backend adds the factories that produce arrays
/// and some identification.
pub trait Backend: CreationOps
where
    <Self as CreationOps>::Array: Array,
{
    /// Backend name for identification
    fn name() -> &'static str;

    /// Backend version
    fn version() -> &'static str;

    /// Whether SIMD is available
    fn has_simd() -> bool {
        false
    }

    /// Whether GPU acceleration is available
    fn has_gpu() -> bool {
        false
    }
}
