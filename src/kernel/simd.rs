//! SIMD-accelerated patch SSD using the `wide` crate.
//!
//! Each patch row is processed four pixels at a time with `f64x4`; the
//! remainder of the row falls back to scalar code.

use crate::image::{Grid, ImagePixel};
use crate::kernel::scalar::patch_row;
use crate::kernel::SsdKernel;
use wide::f64x4;

const LANES: usize = 4;

#[inline]
fn load_f64x4(slice: &[f64]) -> f64x4 {
    f64x4::from([slice[0], slice[1], slice[2], slice[3]])
}

#[inline]
fn hsum(v: f64x4) -> f64 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3]
}

/// SIMD full-patch SSD kernel.
pub struct SsdSimd;

impl SsdKernel for SsdSimd {
    fn patch_ssd(
        fixed: &Grid<ImagePixel>,
        fixed_at: (usize, usize),
        moving: &Grid<ImagePixel>,
        moving_at: (usize, usize),
        side: usize,
    ) -> f64 {
        let simd_end = side / LANES * LANES;
        let mut acc = f64x4::ZERO;
        let mut tail = 0.0f64;

        for d in 0..side {
            let f = patch_row(fixed, fixed_at.0 + d, fixed_at.1, side);
            let m = patch_row(moving, moving_at.0 + d, moving_at.1, side);

            let mut x = 0;
            while x < simd_end {
                let diff = load_f64x4(&f[x..]) - load_f64x4(&m[x..]);
                acc += diff * diff;
                x += LANES;
            }
            while x < side {
                let diff = f[x] - m[x];
                tail += diff * diff;
                x += 1;
            }
        }

        hsum(acc) + tail
    }
}
