//! Constrained random initialization and distance cache rebuild.

use super::field::{Correspondence, DisplacementField};
use super::is_interior;
use super::settings::SearchSettings;
use crate::image::{Grid, ImagePixel};
use crate::kernel::try_fill_rows;
use crate::patch::PatchDistance;
use crate::util::OpalResult;
use rand::Rng;

/// Draws a correspondence for every pixel of `field`, border pixels included.
///
/// The atlas index is uniform in `1..atlas_count`; each offset component is
/// uniform in `[-w, w]` and then clamped so the matched pixel stays at least
/// `patch_radius` away from every edge.
pub(super) fn draw_field<R: Rng>(
    field: &mut DisplacementField,
    rng: &mut R,
    atlas_count: usize,
    settings: &SearchSettings,
) {
    let w = settings.init_window_radius as i64;
    let r = settings.patch_radius as i64;
    let (height, width) = field.offset_x().shape();
    let (height, width) = (height as i64, width as i64);

    for row in 0..height {
        for col in 0..width {
            let atlas = rng.random_range(1..atlas_count);
            let dx = rng.random_range(-w..=w);
            let dy = rng.random_range(-w..=w);
            let source_col = (col + dx).clamp(r, width - r - 1);
            let source_row = (row + dy).clamp(r, height - r - 1);
            // Dimensions were checked to fit i32, so the differences do too.
            let c = Correspondence {
                offset_x: (source_col - col) as i32,
                offset_y: (source_row - row) as i32,
                atlas,
            };
            field.set(row as usize, col as usize, c);
        }
    }
}

/// Recomputes every interior entry of `distances` from `field`; border
/// entries are set to `f64::INFINITY`.
pub(super) fn rebuild_distances(
    distances: &mut Grid<f64>,
    field: &DisplacementField,
    target: &Grid<ImagePixel>,
    images: &[Grid<ImagePixel>],
    settings: &SearchSettings,
) -> OpalResult<()> {
    let radius = settings.patch_radius;
    let (height, width) = target.shape();

    let fill_row = |row: usize, out: &mut [f64]| -> OpalResult<()> {
        for (col, slot) in out.iter_mut().enumerate() {
            if !is_interior(row, col, height, width, radius) {
                *slot = f64::INFINITY;
                continue;
            }
            let c = field.get(row, col);
            let d = PatchDistance::new(
                target,
                (row, col),
                &images[c.atlas],
                c.source(row, col),
                radius,
            )?;
            *slot = d.value();
        }
        Ok(())
    };

    #[cfg(feature = "rayon")]
    if settings.parallel {
        return crate::kernel::rayon::try_fill_rows_par(distances, fill_row);
    }
    try_fill_rows(distances, fill_row)
}

#[cfg(test)]
mod tests {
    use super::{draw_field, rebuild_distances};
    use crate::image::Grid;
    use crate::search::field::DisplacementField;
    use crate::search::settings::SearchSettings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings(window: usize, radius: usize) -> SearchSettings {
        SearchSettings {
            init_window_radius: window,
            patch_radius: radius,
            ..SearchSettings::default()
        }
    }

    #[test]
    fn drawn_sources_respect_patch_margin() {
        let s = settings(6, 2);
        let mut field = DisplacementField::new(9, 11).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        draw_field(&mut field, &mut rng, 4, &s);

        for row in 0..9 {
            for col in 0..11 {
                let c = field.get(row, col);
                assert!((1..4).contains(&c.atlas));
                assert!(c.offset_x.abs() <= 6 && c.offset_y.abs() <= 6);
                let (sr, sc) = c.source(row, col);
                assert!((2..=6).contains(&sr), "row {sr}");
                assert!((2..=8).contains(&sc), "col {sc}");
            }
        }
    }

    #[test]
    fn zero_window_maps_interior_pixels_to_themselves() {
        let s = settings(0, 1);
        let mut field = DisplacementField::new(5, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        draw_field(&mut field, &mut rng, 2, &s);

        assert_eq!(field.get(2, 3).source(2, 3), (2, 3));
        // Corners are pulled inward by the clamp.
        assert_eq!(field.get(0, 0).source(0, 0), (1, 1));
        assert_eq!(field.get(4, 4).source(4, 4), (3, 3));
    }

    #[test]
    fn border_distances_are_infinite() {
        let s = settings(0, 1);
        let target = Grid::filled(4, 4, 1.0).unwrap();
        let atlas = Grid::filled(4, 4, 3.0).unwrap();
        let images = vec![target.clone(), atlas];
        let mut field = DisplacementField::new(4, 4).unwrap();
        draw_field(&mut field, &mut StdRng::seed_from_u64(1), 2, &s);

        let mut distances = Grid::filled(4, 4, 0.0).unwrap();
        rebuild_distances(&mut distances, &field, &target, &images, &s).unwrap();

        assert_eq!(distances[(1, 1)], 36.0);
        assert_eq!(distances[(2, 2)], 36.0);
        assert!(distances[(0, 2)].is_infinite());
        assert!(distances[(3, 3)].is_infinite());
    }
}
