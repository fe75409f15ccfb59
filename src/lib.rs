//! OPAL is a patch-based multi-atlas segmentation library.
//!
//! A target image is segmented by finding, for every pixel, a similar patch
//! in one of several labeled atlas images (a PatchMatch-style search with
//! constrained random initialization and alternating-direction propagation)
//! and fusing the atlas labels those correspondences point at.
//!
//! Optional features: `rayon` parallelizes the per-pixel independent passes,
//! `simd` vectorizes full patch evaluation, `image-io` loads and saves PNG
//! grids, `tracing` emits spans and events for each search phase.

pub mod accuracy;
mod candidate;
pub mod flow;
pub mod image;
pub mod kernel;
mod library;
pub mod lowlevel;
mod patch;
pub mod search;
mod trace;
pub mod util;

pub use candidate::vote::{CandidateLabel, LabelVoter};
pub use crate::image::{Grid, ImagePixel, Label, UNLABELED};
#[cfg(feature = "image-io")]
pub use crate::image::io;
pub use library::ImageLibrary;
pub use patch::PatchDistance;
pub use search::{
    Correspondence, CorrespondenceSearch, DisplacementField, SearchSettings, SearchState,
};
pub use util::{OpalError, OpalResult};
