//! Patch correspondence search and label fusion.
//!
//! `CorrespondenceSearch` maps every target pixel to a pixel of some atlas
//! entry so that the patches around both are similar, then fuses the atlas
//! labels found this way into a segmentation of the target. The phases run
//! strictly in order:
//!
//! 1. `constrained_initialization` draws a random correspondence per pixel
//!    inside a window around the pixel itself.
//! 2. `propagation` (repeatable) lets each pixel adopt the correspondence of
//!    an already visited neighbor when that lowers the patch distance.
//! 3. `build_segmentation` votes over the labels the correspondences point at.

mod field;
mod fuse;
mod init;
mod propagate;
mod settings;

pub use field::{Correspondence, DisplacementField};
pub use settings::SearchSettings;

use crate::flow::write_flow;
use crate::image::{Grid, ImagePixel, Label};
use crate::library::ImageLibrary;
use crate::patch::PatchDistance;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{OpalError, OpalResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Phase of a `CorrespondenceSearch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    /// Fields allocated but not filled.
    Uninitialized,
    /// Random correspondences drawn, distance cache built.
    Initialized,
    /// At least one propagation pass ran.
    Propagated,
    /// Output segmentation available.
    Segmented,
}

impl SearchState {
    fn as_str(self) -> &'static str {
        match self {
            SearchState::Uninitialized => "uninitialized",
            SearchState::Initialized => "initialized",
            SearchState::Propagated => "propagated",
            SearchState::Segmented => "segmented",
        }
    }
}

/// Correspondence search between the target (library entry 0) and the atlas
/// entries of an `ImageLibrary`.
///
/// The random generator is owned by the search; `new` seeds a `StdRng` from
/// `SearchSettings::seed`, `with_rng` accepts any generator.
pub struct CorrespondenceSearch<'a, R = StdRng> {
    library: &'a ImageLibrary,
    settings: SearchSettings,
    target: Grid<ImagePixel>,
    field: DisplacementField,
    distances: Grid<f64>,
    output: Option<Grid<Label>>,
    state: SearchState,
    rng: R,
}

impl<'a> CorrespondenceSearch<'a, StdRng> {
    /// Creates a search seeded from `settings.seed`.
    pub fn new(library: &'a ImageLibrary, settings: SearchSettings) -> OpalResult<Self> {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self::with_rng(library, settings, rng)
    }
}

impl<'a, R: Rng> CorrespondenceSearch<'a, R> {
    /// Creates a search drawing its random numbers from `rng`.
    ///
    /// Fails if the library has fewer than two entries, if the settings are
    /// invalid, or if a patch does not fit into the library images.
    pub fn with_rng(
        library: &'a ImageLibrary,
        settings: SearchSettings,
        rng: R,
    ) -> OpalResult<Self> {
        match library.count() {
            0 => return Err(OpalError::EmptyLibrary),
            1 => return Err(OpalError::SingleEntryLibrary),
            _ => {}
        }
        settings.validate()?;

        let height = library.height();
        let width = library.width();
        let side = settings.patch_side();
        if side > height || side > width {
            return Err(OpalError::PatchTooLarge {
                side,
                height,
                width,
            });
        }
        if i32::try_from(height).is_err() || i32::try_from(width).is_err() {
            return Err(OpalError::InvalidDimensions { height, width });
        }

        Ok(Self {
            library,
            target: library.image(0)?.clone(),
            field: DisplacementField::new(height, width)?,
            distances: Grid::filled(height, width, f64::INFINITY)?,
            output: None,
            state: SearchState::Uninitialized,
            settings,
            rng,
        })
    }

    /// Draws a random correspondence for every pixel and builds the distance
    /// cache.
    pub fn constrained_initialization(&mut self) -> OpalResult<()> {
        self.expect_state("initialize", &[SearchState::Uninitialized])?;
        let _span = trace_span!("constrained_initialization").entered();

        init::draw_field(
            &mut self.field,
            &mut self.rng,
            self.library.count(),
            &self.settings,
        );
        init::rebuild_distances(
            &mut self.distances,
            &self.field,
            &self.target,
            self.library.images(),
            &self.settings,
        )?;
        self.state = SearchState::Initialized;

        trace_event!("initialized", mean_distance = self.mean_distance());
        self.save_diagnostics("init.flo");
        Ok(())
    }

    /// Runs one propagation pass and returns how many pixels improved.
    ///
    /// Even iterations scan top-to-bottom and left-to-right, odd iterations
    /// scan in reverse.
    pub fn propagation(&mut self, iteration: usize) -> OpalResult<usize> {
        self.expect_state(
            "propagate",
            &[SearchState::Initialized, SearchState::Propagated],
        )?;
        let _span = trace_span!("propagation", iteration = iteration).entered();

        let improved = propagate::propagate_pass(
            &mut self.field,
            &mut self.distances,
            &self.target,
            self.library.images(),
            self.settings.patch_radius,
            iteration,
        )?;
        self.state = SearchState::Propagated;

        trace_event!(
            "propagated",
            iteration = iteration,
            improved = improved,
            mean_distance = self.mean_distance()
        );
        self.save_diagnostics(&format!("iter_{iteration:03}.flo"));
        Ok(improved)
    }

    /// Fuses atlas labels into the output segmentation.
    ///
    /// Pixels closer than `patch_radius` to the border are set to
    /// `UNLABELED`.
    pub fn build_segmentation(&mut self) -> OpalResult<&Grid<Label>> {
        self.expect_state(
            "build segmentation",
            &[SearchState::Initialized, SearchState::Propagated],
        )?;
        let _span = trace_span!("build_segmentation").entered();

        let labels = fuse::fuse_labels(
            &self.field,
            self.library.segmentations(),
            &self.settings,
        )?;
        self.state = SearchState::Segmented;
        Ok(&*self.output.insert(labels))
    }

    /// Initializes, runs `max_iterations` propagation passes and builds the
    /// segmentation.
    pub fn run(&mut self) -> OpalResult<&Grid<Label>> {
        self.constrained_initialization()?;
        for iteration in 0..self.settings.max_iterations {
            self.propagation(iteration)?;
        }
        self.build_segmentation()
    }

    /// Recomputes the patch distance of `(row, col)` from its current
    /// correspondence, ignoring the cache.
    pub fn recompute_distance(&self, row: usize, col: usize) -> OpalResult<f64> {
        if self.state == SearchState::Uninitialized {
            return Err(OpalError::InvalidSequencing {
                operation: "recompute distance",
                state: self.state.as_str(),
            });
        }
        let c = self.field.get(row, col);
        let atlas = self.library.image(c.atlas)?;
        let d = PatchDistance::new(
            &self.target,
            (row, col),
            atlas,
            c.source(row, col),
            self.settings.patch_radius,
        )?;
        Ok(d.value())
    }

    /// Returns `true` if the patch around `(row, col)` fits into the image.
    pub fn is_interior(&self, row: usize, col: usize) -> bool {
        is_interior(
            row,
            col,
            self.target.height(),
            self.target.width(),
            self.settings.patch_radius,
        )
    }

    /// Mean cached distance over interior pixels.
    pub fn mean_distance(&self) -> f64 {
        let r = self.settings.patch_radius;
        let (height, width) = self.target.shape();
        let mut sum = 0.0;
        let mut count = 0usize;
        for row in r..height - r {
            for col in r..width - r {
                sum += self.distances[(row, col)];
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }

    /// Current phase.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Current displacement field.
    pub fn field(&self) -> &DisplacementField {
        &self.field
    }

    /// Cached patch distances; border pixels hold `f64::INFINITY`.
    pub fn distances(&self) -> &Grid<f64> {
        &self.distances
    }

    /// Output segmentation, once built.
    pub fn output(&self) -> Option<&Grid<Label>> {
        self.output.as_ref()
    }

    /// Settings the search runs with.
    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    fn expect_state(&self, operation: &'static str, allowed: &[SearchState]) -> OpalResult<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(OpalError::InvalidSequencing {
            operation,
            state: self.state.as_str(),
        })
    }

    fn save_diagnostics(&self, name: &str) {
        if !self.settings.diagnostics_enabled {
            return;
        }
        let dir = self.settings.diagnostics_path.as_path();
        if let Err(err) = save_field(dir, name, &self.field) {
            let reason = err.to_string();
            trace_warn!("diagnostics_write_failed", file = name, reason = reason.as_str());
        }
    }
}

fn save_field(dir: &Path, name: &str, field: &DisplacementField) -> OpalResult<()> {
    std::fs::create_dir_all(dir)?;
    write_flow(dir.join(name), field.offset_x(), field.offset_y())
}

#[inline]
pub(crate) fn is_interior(
    row: usize,
    col: usize,
    height: usize,
    width: usize,
    radius: usize,
) -> bool {
    row >= radius && col >= radius && row + radius < height && col + radius < width
}
