//! Dense 2D grids for images, segmentations and field maps.
//!
//! `Grid<T>` stores its cells row-major in one contiguous buffer. Coordinates
//! are always `(row, col)`; row 0 is the top of the image.

use crate::util::{OpalError, OpalResult};
use std::ops::{Add, Index, IndexMut, Sub};

#[cfg(feature = "image-io")]
pub mod io;

/// Intensity type of library images.
pub type ImagePixel = f64;

/// Label type of library segmentations.
pub type Label = i32;

/// Label written to output pixels that no patch window covers.
pub const UNLABELED: Label = -1;

/// Owned row-major 2D grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    data: Vec<T>,
    height: usize,
    width: usize,
}

impl<T: Clone> Grid<T> {
    /// Creates a `height x width` grid with every cell set to `value`.
    pub fn filled(height: usize, width: usize, value: T) -> OpalResult<Self> {
        let len = checked_len(height, width)?;
        Ok(Self {
            data: vec![value; len],
            height,
            width,
        })
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Reshapes the grid, keeping the overlapping top-left region and
    /// filling new cells with `value`.
    pub fn resize(&mut self, height: usize, width: usize, value: T) -> OpalResult<()> {
        let len = checked_len(height, width)?;
        let mut data = vec![value; len];
        let rows = height.min(self.height);
        let cols = width.min(self.width);
        for row in 0..rows {
            let src = row * self.width;
            let dst = row * width;
            data[dst..dst + cols].clone_from_slice(&self.data[src..src + cols]);
        }
        self.data = data;
        self.height = height;
        self.width = width;
        Ok(())
    }
}

impl<T: Clone + Default> Grid<T> {
    /// Creates a `height x width` grid of default values.
    pub fn new(height: usize, width: usize) -> OpalResult<Self> {
        Self::filled(height, width, T::default())
    }
}

impl<T> Grid<T> {
    /// Wraps a row-major buffer of exactly `height * width` cells.
    pub fn from_vec(data: Vec<T>, height: usize, width: usize) -> OpalResult<Self> {
        let needed = checked_len(height, width)?;
        if data.len() != needed {
            return Err(OpalError::BufferLengthMismatch {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            height,
            width,
        })
    }

    /// Returns the number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Returns the row-major backing slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the row-major backing slice mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the grid and returns its row-major buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns `true` if `(row, col)` addresses a cell.
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width
    }

    /// Returns the cell at `(row, col)` if it is within bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if !self.contains(row, col) {
            return None;
        }
        self.data.get(row * self.width + col)
    }

    /// Returns the cell at `(row, col)` mutably if it is within bounds.
    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if !self.contains(row, col) {
            return None;
        }
        self.data.get_mut(row * self.width + col)
    }

    /// Overwrites the cell at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> OpalResult<()> {
        let (height, width) = self.shape();
        let cell = self.get_mut(row, col).ok_or(OpalError::CellOutOfBounds {
            row,
            col,
            height,
            width,
        })?;
        *cell = value;
        Ok(())
    }

    /// Returns row `row` as a slice of length `width`.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.height {
            return None;
        }
        let start = row * self.width;
        self.data.get(start..start + self.width)
    }

    /// Returns the rows of the grid in top-to-bottom order.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, T> {
        self.data.chunks_exact(self.width)
    }

    /// Applies `f` to every cell, producing a grid of the same shape.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            data: self.data.iter().map(f).collect(),
            height: self.height,
            width: self.width,
        }
    }

    /// Returns `true` if both grids have the same shape.
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.shape() == other.shape()
    }
}

impl<T: Copy> Grid<T> {
    /// Elementwise sum of two grids of equal shape.
    pub fn checked_add(&self, other: &Grid<T>) -> OpalResult<Grid<T>>
    where
        T: Add<Output = T>,
    {
        self.zip_with(other, |a, b| a + b)
    }

    /// Elementwise difference of two grids of equal shape.
    pub fn checked_sub(&self, other: &Grid<T>) -> OpalResult<Grid<T>>
    where
        T: Sub<Output = T>,
    {
        self.zip_with(other, |a, b| a - b)
    }

    fn zip_with<F: Fn(T, T) -> T>(&self, other: &Grid<T>, f: F) -> OpalResult<Grid<T>> {
        if !self.same_shape(other) {
            return Err(OpalError::ShapeMismatch {
                expected: self.shape(),
                got: other.shape(),
                context: "elementwise operand",
            });
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Grid {
            data,
            height: self.height,
            width: self.width,
        })
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(
            self.contains(row, col),
            "cell ({row}, {col}) out of bounds for {}x{} grid",
            self.height,
            self.width
        );
        &self.data[row * self.width + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(
            self.contains(row, col),
            "cell ({row}, {col}) out of bounds for {}x{} grid",
            self.height,
            self.width
        );
        &mut self.data[row * self.width + col]
    }
}

fn checked_len(height: usize, width: usize) -> OpalResult<usize> {
    if height == 0 || width == 0 {
        return Err(OpalError::InvalidDimensions { height, width });
    }
    height
        .checked_mul(width)
        .ok_or(OpalError::InvalidDimensions { height, width })
}

#[cfg(test)]
mod tests {
    use super::Grid;
    use crate::util::OpalError;

    #[test]
    fn resize_keeps_top_left_region() {
        let mut grid = Grid::from_vec((0..6).collect::<Vec<i32>>(), 2, 3).unwrap();
        grid.resize(3, 2, -1).unwrap();
        assert_eq!(grid.as_slice(), &[0, 1, 3, 4, -1, -1]);
    }

    #[test]
    fn elementwise_ops_require_equal_shapes() {
        let a = Grid::filled(2, 2, 5.0f64).unwrap();
        let b = Grid::filled(2, 2, 2.0f64).unwrap();
        assert_eq!(a.checked_sub(&b).unwrap().as_slice(), &[3.0; 4]);
        assert_eq!(a.checked_add(&b).unwrap().as_slice(), &[7.0; 4]);

        let c = Grid::filled(1, 4, 1.0f64).unwrap();
        assert_eq!(
            a.checked_add(&c).err().unwrap(),
            OpalError::ShapeMismatch {
                expected: (2, 2),
                got: (1, 4),
                context: "elementwise operand",
            }
        );
    }

    #[test]
    #[should_panic]
    fn index_panics_out_of_bounds() {
        let grid = Grid::filled(2, 2, 0u8).unwrap();
        let _ = grid[(0, 2)];
    }
}
