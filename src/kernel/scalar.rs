//! Scalar reference kernels for patch distances.

use crate::image::{Grid, ImagePixel};
use crate::kernel::SsdKernel;

/// Scalar full-patch SSD kernel.
pub struct SsdScalar;

impl SsdKernel for SsdScalar {
    fn patch_ssd(
        fixed: &Grid<ImagePixel>,
        fixed_at: (usize, usize),
        moving: &Grid<ImagePixel>,
        moving_at: (usize, usize),
        side: usize,
    ) -> f64 {
        let mut sum = 0.0f64;
        for d in 0..side {
            let f = patch_row(fixed, fixed_at.0 + d, fixed_at.1, side);
            let m = patch_row(moving, moving_at.0 + d, moving_at.1, side);
            for (&a, &b) in f.iter().zip(m.iter()) {
                let diff = a - b;
                sum += diff * diff;
            }
        }
        sum
    }
}

/// SSD over a single `side`-long row segment starting at each anchor.
#[inline]
pub(crate) fn row_ssd(
    fixed: &Grid<ImagePixel>,
    fixed_at: (usize, usize),
    moving: &Grid<ImagePixel>,
    moving_at: (usize, usize),
    side: usize,
) -> f64 {
    let f = patch_row(fixed, fixed_at.0, fixed_at.1, side);
    let m = patch_row(moving, moving_at.0, moving_at.1, side);
    let mut sum = 0.0f64;
    for (&a, &b) in f.iter().zip(m.iter()) {
        let diff = a - b;
        sum += diff * diff;
    }
    sum
}

/// SSD over a single `side`-long column segment starting at each anchor.
#[inline]
pub(crate) fn column_ssd(
    fixed: &Grid<ImagePixel>,
    fixed_at: (usize, usize),
    moving: &Grid<ImagePixel>,
    moving_at: (usize, usize),
    side: usize,
) -> f64 {
    let mut sum = 0.0f64;
    for d in 0..side {
        let diff = fixed[(fixed_at.0 + d, fixed_at.1)] - moving[(moving_at.0 + d, moving_at.1)];
        sum += diff * diff;
    }
    sum
}

#[inline]
pub(crate) fn patch_row(
    grid: &Grid<ImagePixel>,
    row: usize,
    col: usize,
    side: usize,
) -> &[ImagePixel] {
    let start = row * grid.width() + col;
    &grid.as_slice()[start..start + side]
}

#[cfg(test)]
mod tests {
    use super::{column_ssd, row_ssd, SsdScalar};
    use crate::image::Grid;
    use crate::kernel::SsdKernel;

    fn ramp(height: usize, width: usize) -> Grid<f64> {
        let data = (0..height * width).map(|v| (v * 7 % 11) as f64).collect();
        Grid::from_vec(data, height, width).unwrap()
    }

    #[test]
    fn patch_ssd_matches_bruteforce() {
        let fixed = ramp(6, 7);
        let moving = fixed.map(|v| 10.0 - v);
        let side = 3;
        let got = SsdScalar::patch_ssd(&fixed, (1, 2), &moving, (3, 0), side);

        let mut expected = 0.0;
        for dy in 0..side {
            for dx in 0..side {
                let d = fixed[(1 + dy, 2 + dx)] - moving[(3 + dy, dx)];
                expected += d * d;
            }
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn edge_sums_cover_one_line() {
        let fixed = Grid::filled(4, 4, 3.0).unwrap();
        let moving = Grid::filled(4, 4, 1.0).unwrap();
        assert_eq!(row_ssd(&fixed, (0, 1), &moving, (2, 0), 3), 12.0);
        assert_eq!(column_ssd(&fixed, (1, 0), &moving, (0, 3), 3), 12.0);
    }
}
