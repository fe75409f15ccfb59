//! Incremental patch distance between two grids.
//!
//! A `PatchDistance` tracks the SSD between a square patch on a fixed grid
//! and an equally sized patch on a moving grid. Moving both patches one pixel
//! along an axis only changes one leading and one trailing row (or column),
//! so shifts cost `O(side)` instead of `O(side^2)`.
//!
//! Anchors are stored as top-left corners; the public API speaks in patch
//! centers.

use crate::image::{Grid, ImagePixel};
use crate::kernel::scalar::{column_ssd, row_ssd};
use crate::kernel::{SelectedSsd, SsdKernel};
use crate::util::{OpalError, OpalResult};

/// SSD between a fixed patch and a moving patch, maintained incrementally.
#[derive(Clone, Copy, Debug)]
pub struct PatchDistance<'a> {
    fixed: &'a Grid<ImagePixel>,
    moving: &'a Grid<ImagePixel>,
    fixed_at: (usize, usize),
    moving_at: (usize, usize),
    radius: usize,
    side: usize,
    value: f64,
}

impl<'a> PatchDistance<'a> {
    /// Computes the SSD between the patches of `radius` centered at
    /// `fixed_center` on `fixed` and `moving_center` on `moving`.
    ///
    /// Fails with `PatchOutOfBounds` if either patch leaves its grid.
    pub fn new(
        fixed: &'a Grid<ImagePixel>,
        fixed_center: (usize, usize),
        moving: &'a Grid<ImagePixel>,
        moving_center: (usize, usize),
        radius: usize,
    ) -> OpalResult<Self> {
        let fixed_at = top_left(fixed, fixed_center, radius)?;
        let moving_at = top_left(moving, moving_center, radius)?;
        let side = 2 * radius + 1;
        let value = SelectedSsd::patch_ssd(fixed, fixed_at, moving, moving_at, side);
        Ok(Self {
            fixed,
            moving,
            fixed_at,
            moving_at,
            radius,
            side,
            value,
        })
    }

    /// Rebuilds a distance whose value is already known, skipping the full
    /// evaluation. The caller guarantees `value` matches the two patches.
    pub(crate) fn from_cached(
        fixed: &'a Grid<ImagePixel>,
        fixed_center: (usize, usize),
        moving: &'a Grid<ImagePixel>,
        moving_center: (usize, usize),
        radius: usize,
        value: f64,
    ) -> OpalResult<Self> {
        let fixed_at = top_left(fixed, fixed_center, radius)?;
        let moving_at = top_left(moving, moving_center, radius)?;
        Ok(Self {
            fixed,
            moving,
            fixed_at,
            moving_at,
            radius,
            side: 2 * radius + 1,
            value,
        })
    }

    /// Returns the cached SSD.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns the patch radius.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Returns the patch side, `2 * radius + 1`.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Returns the center of the fixed patch.
    pub fn fixed_center(&self) -> (usize, usize) {
        (self.fixed_at.0 + self.radius, self.fixed_at.1 + self.radius)
    }

    /// Returns the center of the moving patch.
    pub fn moving_center(&self) -> (usize, usize) {
        (self.moving_at.0 + self.radius, self.moving_at.1 + self.radius)
    }

    /// Returns `true` if this distance is strictly smaller than `other`.
    ///
    /// Equal distances are not better, so the first candidate found wins.
    #[inline]
    pub fn is_better_than(&self, other: &PatchDistance<'_>) -> bool {
        self.value < other.value
    }

    /// Moves both patches one column right.
    pub fn shift_right(&mut self) -> OpalResult<f64> {
        let entering = self.fixed_at.1 + self.side;
        if entering >= self.fixed.width() || self.moving_at.1 + self.side >= self.moving.width() {
            return Err(OpalError::ShiftOutOfBounds { direction: "right" });
        }
        let added = self.column(0, self.side);
        let removed = self.column(0, 0);
        self.value += added - removed;
        self.fixed_at.1 += 1;
        self.moving_at.1 += 1;
        Ok(self.value)
    }

    /// Moves both patches one column left.
    pub fn shift_left(&mut self) -> OpalResult<f64> {
        if self.fixed_at.1 == 0 || self.moving_at.1 == 0 {
            return Err(OpalError::ShiftOutOfBounds { direction: "left" });
        }
        self.fixed_at.1 -= 1;
        self.moving_at.1 -= 1;
        let added = self.column(0, 0);
        let removed = self.column(0, self.side);
        self.value += added - removed;
        Ok(self.value)
    }

    /// Moves both patches one row down.
    pub fn shift_down(&mut self) -> OpalResult<f64> {
        if self.fixed_at.0 + self.side >= self.fixed.height()
            || self.moving_at.0 + self.side >= self.moving.height()
        {
            return Err(OpalError::ShiftOutOfBounds { direction: "down" });
        }
        let added = self.row(self.side, 0);
        let removed = self.row(0, 0);
        self.value += added - removed;
        self.fixed_at.0 += 1;
        self.moving_at.0 += 1;
        Ok(self.value)
    }

    /// Moves both patches one row up.
    pub fn shift_up(&mut self) -> OpalResult<f64> {
        if self.fixed_at.0 == 0 || self.moving_at.0 == 0 {
            return Err(OpalError::ShiftOutOfBounds { direction: "up" });
        }
        self.fixed_at.0 -= 1;
        self.moving_at.0 -= 1;
        let added = self.row(0, 0);
        let removed = self.row(self.side, 0);
        self.value += added - removed;
        Ok(self.value)
    }

    /// Keeps both anchors but measures against a different moving grid.
    ///
    /// There is no incremental shortcut across grids, so this recomputes the
    /// full patch.
    pub fn shift_to_image(&mut self, moving: &'a Grid<ImagePixel>) -> OpalResult<f64> {
        let moving_at = top_left(moving, self.moving_center(), self.radius)?;
        self.value =
            SelectedSsd::patch_ssd(self.fixed, self.fixed_at, moving, moving_at, self.side);
        self.moving = moving;
        self.moving_at = moving_at;
        Ok(self.value)
    }

    /// Recomputes the full SSD at the current anchors.
    pub fn recompute(&self) -> f64 {
        SelectedSsd::patch_ssd(
            self.fixed,
            self.fixed_at,
            self.moving,
            self.moving_at,
            self.side,
        )
    }

    // SSD of the column `dc` columns right of each anchor (rows `dr..dr+side`).
    fn column(&self, dr: usize, dc: usize) -> f64 {
        column_ssd(
            self.fixed,
            (self.fixed_at.0 + dr, self.fixed_at.1 + dc),
            self.moving,
            (self.moving_at.0 + dr, self.moving_at.1 + dc),
            self.side,
        )
    }

    // SSD of the row `dr` rows below each anchor (cols `dc..dc+side`).
    fn row(&self, dr: usize, dc: usize) -> f64 {
        row_ssd(
            self.fixed,
            (self.fixed_at.0 + dr, self.fixed_at.1 + dc),
            self.moving,
            (self.moving_at.0 + dr, self.moving_at.1 + dc),
            self.side,
        )
    }
}

fn top_left(
    grid: &Grid<ImagePixel>,
    center: (usize, usize),
    radius: usize,
) -> OpalResult<(usize, usize)> {
    let (row, col) = center;
    let fits = row >= radius
        && col >= radius
        && row + radius < grid.height()
        && col + radius < grid.width();
    if !fits {
        return Err(OpalError::PatchOutOfBounds {
            row,
            col,
            radius,
            height: grid.height(),
            width: grid.width(),
        });
    }
    Ok((row - radius, col - radius))
}

#[cfg(test)]
mod tests {
    use super::PatchDistance;
    use crate::image::Grid;
    use crate::util::OpalError;

    fn constant(value: f64) -> Grid<f64> {
        Grid::filled(5, 5, value).unwrap()
    }

    #[test]
    fn constant_grids_give_closed_form_ssd() {
        let ones = constant(1.0);
        let fours = constant(4.0);
        let twos = constant(2.0);

        let d = PatchDistance::new(&ones, (2, 2), &fours, (2, 2), 1).unwrap();
        assert_eq!(d.value(), 81.0);
        let d = PatchDistance::new(&ones, (2, 2), &twos, (2, 2), 1).unwrap();
        assert_eq!(d.value(), 9.0);
    }

    #[test]
    fn construction_rejects_patch_outside_moving_grid() {
        let ones = constant(1.0);
        let twos = constant(2.0);
        let err = PatchDistance::new(&ones, (2, 2), &twos, (3, 1), 2)
            .err()
            .unwrap();
        assert_eq!(
            err,
            OpalError::PatchOutOfBounds {
                row: 3,
                col: 1,
                radius: 2,
                height: 5,
                width: 5,
            }
        );
    }

    #[test]
    fn failed_shift_leaves_distance_untouched() {
        let ones = constant(1.0);
        let fours = constant(4.0);
        let mut d = PatchDistance::new(&ones, (2, 2), &fours, (3, 1), 1).unwrap();
        assert_eq!(
            d.shift_down().err().unwrap(),
            OpalError::ShiftOutOfBounds { direction: "down" }
        );
        assert_eq!(d.value(), 81.0);
        assert_eq!(d.moving_center(), (3, 1));

        assert_eq!(d.shift_up().unwrap(), 81.0);
        assert_eq!(d.fixed_center(), (1, 2));
        assert_eq!(d.moving_center(), (2, 1));
    }

    #[test]
    fn shift_to_image_recomputes_against_new_grid() {
        let ones = constant(1.0);
        let fours = constant(4.0);
        let twos = constant(2.0);
        let mut d = PatchDistance::new(&ones, (2, 2), &fours, (1, 3), 1).unwrap();
        assert_eq!(d.shift_to_image(&twos).unwrap(), 9.0);
        assert_eq!(d.moving_center(), (1, 3));

        let small = Grid::filled(3, 3, 0.0).unwrap();
        assert!(matches!(
            d.shift_to_image(&small),
            Err(OpalError::PatchOutOfBounds { .. })
        ));
        assert_eq!(d.value(), 9.0);
    }

    #[test]
    fn strict_comparison_prefers_earlier_on_ties() {
        let ones = constant(1.0);
        let twos = constant(2.0);
        let a = PatchDistance::new(&ones, (1, 1), &twos, (2, 2), 1).unwrap();
        let b = PatchDistance::new(&ones, (2, 2), &twos, (3, 3), 1).unwrap();
        assert!(!a.is_better_than(&b));
        assert!(!b.is_better_than(&a));
    }
}
