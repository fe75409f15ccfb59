//! Patch distance kernels and row-wise fill helpers.
//!
//! Kernels work on top-left patch anchors and assume the caller has already
//! checked that both patches lie inside their grids.

use crate::image::{Grid, ImagePixel};
use crate::util::OpalResult;

/// Kernel trait for full-patch SSD evaluation.
pub trait SsdKernel {
    /// Sum of squared differences between the `side x side` patches whose
    /// top-left corners are `fixed_at` and `moving_at`.
    fn patch_ssd(
        fixed: &Grid<ImagePixel>,
        fixed_at: (usize, usize),
        moving: &Grid<ImagePixel>,
        moving_at: (usize, usize),
        side: usize,
    ) -> f64;
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub(crate) mod rayon;

/// Kernel used by the search; vectorized when the `simd` feature is enabled.
#[cfg(not(feature = "simd"))]
pub(crate) type SelectedSsd = scalar::SsdScalar;
#[cfg(feature = "simd")]
pub(crate) type SelectedSsd = simd::SsdSimd;

/// Calls `f(row_index, row)` for every row of `grid`, top to bottom,
/// stopping at the first error.
pub(crate) fn try_fill_rows<T, F>(grid: &mut Grid<T>, f: F) -> OpalResult<()>
where
    F: Fn(usize, &mut [T]) -> OpalResult<()>,
{
    let width = grid.width();
    for (i, row) in grid.as_mut_slice().chunks_exact_mut(width).enumerate() {
        f(i, row)?;
    }
    Ok(())
}
