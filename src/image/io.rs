//! Convenience helpers for loading and saving grids via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{Grid, ImagePixel, Label};
use crate::util::{OpalError, OpalResult};
use std::path::Path;

/// Converts an 8-bit grayscale buffer into an intensity grid.
pub fn grid_from_gray_image(img: &image::GrayImage) -> OpalResult<Grid<ImagePixel>> {
    let height = img.height() as usize;
    let width = img.width() as usize;
    let data = img.as_raw().iter().map(|&v| ImagePixel::from(v)).collect();
    Grid::from_vec(data, height, width)
}

/// Converts an 8-bit grayscale buffer into a label grid.
pub fn labels_from_gray_image(img: &image::GrayImage) -> OpalResult<Grid<Label>> {
    let height = img.height() as usize;
    let width = img.width() as usize;
    let data = img.as_raw().iter().map(|&v| Label::from(v)).collect();
    Grid::from_vec(data, height, width)
}

/// Loads an image from disk as a grayscale intensity grid.
pub fn load_gray_grid<P: AsRef<Path>>(path: P) -> OpalResult<Grid<ImagePixel>> {
    let img = open(path.as_ref())?;
    grid_from_gray_image(&img.to_luma8())
}

/// Loads a segmentation from disk; each gray level is one label.
pub fn load_label_grid<P: AsRef<Path>>(path: P) -> OpalResult<Grid<Label>> {
    let img = open(path.as_ref())?;
    labels_from_gray_image(&img.to_luma8())
}

/// Saves a label grid as an 8-bit grayscale image.
///
/// Labels are clamped to `0..=255`, so `UNLABELED` border pixels become 0.
pub fn save_label_grid<P: AsRef<Path>>(labels: &Grid<Label>, path: P) -> OpalResult<()> {
    let width = u32::try_from(labels.width()).map_err(|_| OpalError::InvalidDimensions {
        height: labels.height(),
        width: labels.width(),
    })?;
    let height = u32::try_from(labels.height()).map_err(|_| OpalError::InvalidDimensions {
        height: labels.height(),
        width: labels.width(),
    })?;
    let raw: Vec<u8> = labels
        .as_slice()
        .iter()
        .map(|&label| label.clamp(0, 255) as u8)
        .collect();
    let img = image::GrayImage::from_raw(width, height, raw).ok_or(
        OpalError::BufferLengthMismatch {
            needed: labels.height() * labels.width(),
            got: labels.as_slice().len(),
        },
    )?;
    img.save(path).map_err(|err| OpalError::ImageIo {
        reason: err.to_string(),
    })
}

fn open(path: &Path) -> OpalResult<image::DynamicImage> {
    image::open(path).map_err(|err| OpalError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })
}
