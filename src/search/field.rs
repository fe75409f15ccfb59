//! Per-pixel correspondences into the atlas.

use crate::image::Grid;
use crate::util::OpalResult;

/// Where one target pixel maps to: pixel `(row + offset_y, col + offset_x)`
/// of library entry `atlas`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Correspondence {
    /// Column offset.
    pub offset_x: i32,
    /// Row offset.
    pub offset_y: i32,
    /// Library index, always `>= 1`.
    pub atlas: usize,
}

impl Correspondence {
    /// Returns the atlas pixel matched to target pixel `(row, col)`.
    ///
    /// Offsets that would leave the grid wrap to huge coordinates, which every
    /// bounds-checked consumer rejects.
    #[inline]
    pub fn source(&self, row: usize, col: usize) -> (usize, usize) {
        (
            row.wrapping_add_signed(self.offset_y as isize),
            col.wrapping_add_signed(self.offset_x as isize),
        )
    }
}

/// Three parallel grids holding one correspondence per target pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplacementField {
    offset_x: Grid<i32>,
    offset_y: Grid<i32>,
    atlas: Grid<usize>,
}

impl DisplacementField {
    pub(crate) fn new(height: usize, width: usize) -> OpalResult<Self> {
        Ok(Self {
            offset_x: Grid::new(height, width)?,
            offset_y: Grid::new(height, width)?,
            atlas: Grid::new(height, width)?,
        })
    }

    /// Column offsets.
    pub fn offset_x(&self) -> &Grid<i32> {
        &self.offset_x
    }

    /// Row offsets.
    pub fn offset_y(&self) -> &Grid<i32> {
        &self.offset_y
    }

    /// Library indices.
    pub fn atlas(&self) -> &Grid<usize> {
        &self.atlas
    }

    /// Returns the correspondence stored at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Correspondence {
        Correspondence {
            offset_x: self.offset_x[(row, col)],
            offset_y: self.offset_y[(row, col)],
            atlas: self.atlas[(row, col)],
        }
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, c: Correspondence) {
        self.offset_x[(row, col)] = c.offset_x;
        self.offset_y[(row, col)] = c.offset_y;
        self.atlas[(row, col)] = c.atlas;
    }
}
