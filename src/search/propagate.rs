//! Raster / anti-raster propagation pass.

use super::field::DisplacementField;
use super::is_interior;
use crate::image::{Grid, ImagePixel};
use crate::patch::PatchDistance;
use crate::util::OpalResult;

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn for_iteration(iteration: usize) -> Self {
        if iteration % 2 == 0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Runs one propagation pass over the interior pixels.
///
/// Each pixel compares its cached distance with the correspondences of the
/// vertical and horizontal neighbor visited just before it, evaluated at the
/// pixel by shifting the neighbor's patch distance one step. The smallest
/// strictly better candidate replaces the pixel's correspondence and cache
/// entry. Returns the number of pixels that changed.
pub(super) fn propagate_pass(
    field: &mut DisplacementField,
    distances: &mut Grid<f64>,
    target: &Grid<ImagePixel>,
    images: &[Grid<ImagePixel>],
    radius: usize,
    iteration: usize,
) -> OpalResult<usize> {
    let (height, width) = target.shape();
    let direction = Direction::for_iteration(iteration);
    let rows: Vec<usize> = (radius..height - radius).collect();
    let cols: Vec<usize> = (radius..width - radius).collect();

    let mut improved = 0;
    let mut visit = |row: usize, col: usize| -> OpalResult<()> {
        let (vertical, horizontal) = match direction {
            Direction::Forward => (
                row.checked_sub(1).map(|r| (r, col)),
                col.checked_sub(1).map(|c| (row, c)),
            ),
            Direction::Backward => (Some((row + 1, col)), Some((row, col + 1))),
        };

        let mut best = distances[(row, col)];
        let mut winner = None;
        for (neighbor, vertical_step) in [(vertical, true), (horizontal, false)] {
            let Some((nr, nc)) = neighbor else { continue };
            if !is_interior(nr, nc, height, width, radius) {
                continue;
            }
            let c = field.get(nr, nc);
            let mut d = PatchDistance::from_cached(
                target,
                (nr, nc),
                &images[c.atlas],
                c.source(nr, nc),
                radius,
                distances[(nr, nc)],
            )?;
            let shifted = match (direction, vertical_step) {
                (Direction::Forward, true) => d.shift_down(),
                (Direction::Forward, false) => d.shift_right(),
                (Direction::Backward, true) => d.shift_up(),
                (Direction::Backward, false) => d.shift_left(),
            };
            // The neighbor's offset may not fit at this pixel.
            let Ok(value) = shifted else { continue };
            if value < best {
                best = value;
                winner = Some(c);
            }
        }

        if let Some(c) = winner {
            field.set(row, col, c);
            distances[(row, col)] = best;
            improved += 1;
        }
        Ok(())
    };

    match direction {
        Direction::Forward => {
            for &row in &rows {
                for &col in &cols {
                    visit(row, col)?;
                }
            }
        }
        Direction::Backward => {
            for &row in rows.iter().rev() {
                for &col in cols.iter().rev() {
                    visit(row, col)?;
                }
            }
        }
    }
    Ok(improved)
}
