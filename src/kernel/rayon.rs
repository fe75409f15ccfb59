//! Rayon row-parallel helpers (feature-gated).
//!
//! Only passes whose pixels are independent of each other run through here;
//! propagation stays sequential.

use crate::image::Grid;
use crate::util::OpalResult;
use rayon::prelude::*;

/// Calls `f(row_index, row)` for every row of `grid`, rows in parallel.
///
/// Returns one of the errors if any row fails.
pub(crate) fn try_fill_rows_par<T, F>(grid: &mut Grid<T>, f: F) -> OpalResult<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> OpalResult<()> + Sync,
{
    let width = grid.width();
    grid.as_mut_slice()
        .par_chunks_exact_mut(width)
        .enumerate()
        .try_for_each(|(i, row)| f(i, row))
}
