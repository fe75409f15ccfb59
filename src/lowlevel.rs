//! Low-level building blocks for custom search pipelines.
//!
//! These expose the full-patch SSD kernels behind `PatchDistance`. Most users
//! should prefer `CorrespondenceSearch`.

pub use crate::kernel::scalar::SsdScalar;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::SsdSimd;
pub use crate::kernel::SsdKernel;
pub use crate::patch::PatchDistance;
