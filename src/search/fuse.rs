//! Label fusion over patch windows.

use super::field::DisplacementField;
use super::is_interior;
use super::settings::SearchSettings;
use crate::candidate::vote::CandidateLabel;
use crate::image::{Grid, Label, UNLABELED};
use crate::kernel::try_fill_rows;
use crate::util::{OpalError, OpalResult};

/// Builds the output segmentation from the displacement field.
///
/// Every pixel of the window around an interior pixel contributes the label
/// its own correspondence points at, with weight `1.0`, in row-major window
/// order. Border pixels get `UNLABELED`.
pub(super) fn fuse_labels(
    field: &DisplacementField,
    segmentations: &[Grid<Label>],
    settings: &SearchSettings,
) -> OpalResult<Grid<Label>> {
    let radius = settings.patch_radius;
    let voter = settings.voter;
    let (height, width) = field.atlas().shape();
    let mut output = Grid::filled(height, width, UNLABELED)?;

    let fill_row = |row: usize, out: &mut [Label]| -> OpalResult<()> {
        let mut candidates = Vec::with_capacity(settings.patch_side() * settings.patch_side());
        for (col, slot) in out.iter_mut().enumerate() {
            if !is_interior(row, col, height, width, radius) {
                continue;
            }
            candidates.clear();
            for wr in row - radius..=row + radius {
                for wc in col - radius..=col + radius {
                    let label = window_label(field, segmentations, wr, wc)?;
                    candidates.push(CandidateLabel::from(label));
                }
            }
            *slot = voter.estimate_label(&candidates)?;
        }
        Ok(())
    };

    #[cfg(feature = "rayon")]
    if settings.parallel {
        crate::kernel::rayon::try_fill_rows_par(&mut output, fill_row)?;
        return Ok(output);
    }
    try_fill_rows(&mut output, fill_row)?;
    Ok(output)
}

fn window_label(
    field: &DisplacementField,
    segmentations: &[Grid<Label>],
    row: usize,
    col: usize,
) -> OpalResult<Label> {
    let c = field.get(row, col);
    let seg = segmentations.get(c.atlas).ok_or(OpalError::IndexOutOfRange {
        index: c.atlas,
        len: segmentations.len(),
        context: "segmentation",
    })?;
    let (sr, sc) = c.source(row, col);
    seg.get(sr, sc).copied().ok_or(OpalError::CellOutOfBounds {
        row: sr,
        col: sc,
        height: seg.height(),
        width: seg.width(),
    })
}

#[cfg(test)]
mod tests {
    use super::fuse_labels;
    use crate::candidate::vote::LabelVoter;
    use crate::image::{Grid, UNLABELED};
    use crate::search::field::{Correspondence, DisplacementField};
    use crate::search::settings::SearchSettings;

    fn identity_field(height: usize, width: usize, atlas: usize) -> DisplacementField {
        let mut field = DisplacementField::new(height, width).unwrap();
        for row in 0..height {
            for col in 0..width {
                field.set(row, col, Correspondence { offset_x: 0, offset_y: 0, atlas });
            }
        }
        field
    }

    #[test]
    fn uniform_window_copies_the_atlas_label() {
        let target_seg = Grid::filled(5, 5, 0).unwrap();
        let atlas_seg = Grid::filled(5, 5, 7).unwrap();
        let segs = vec![target_seg, atlas_seg];
        let settings = SearchSettings {
            patch_radius: 1,
            ..SearchSettings::default()
        };

        let out = fuse_labels(&identity_field(5, 5, 1), &segs, &settings).unwrap();
        assert_eq!(out[(2, 2)], 7);
        assert_eq!(out[(1, 3)], 7);
        assert_eq!(out[(0, 0)], UNLABELED);
        assert_eq!(out[(4, 2)], UNLABELED);
    }

    #[test]
    fn majority_of_window_wins() {
        // Left column of each 3x3 window carries label 2, the rest label 5.
        let mut atlas_seg = Grid::filled(3, 3, 5).unwrap();
        for row in 0..3 {
            atlas_seg[(row, 0)] = 2;
        }
        let segs = vec![Grid::filled(3, 3, 0).unwrap(), atlas_seg];
        let field = identity_field(3, 3, 1);

        let mut settings = SearchSettings {
            patch_radius: 1,
            ..SearchSettings::default()
        };
        assert_eq!(fuse_labels(&field, &segs, &settings).unwrap()[(1, 1)], 5);

        // Positional voter picks window element 4, the center.
        settings.voter = LabelVoter::MedianPositional;
        assert_eq!(fuse_labels(&field, &segs, &settings).unwrap()[(1, 1)], 5);
    }

    #[test]
    fn dangling_correspondence_is_reported() {
        let segs = vec![Grid::filled(3, 3, 0).unwrap(), Grid::filled(3, 3, 1).unwrap()];
        let mut field = identity_field(3, 3, 1);
        field.set(0, 0, Correspondence { offset_x: -1, offset_y: 0, atlas: 1 });
        let settings = SearchSettings {
            patch_radius: 1,
            ..SearchSettings::default()
        };
        assert!(fuse_labels(&field, &segs, &settings).is_err());
    }
}
