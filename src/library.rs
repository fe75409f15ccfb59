//! Ordered collection of image/segmentation pairs.
//!
//! Entry 0 is the target image to be segmented; every later entry is an
//! atlas whose segmentation donates labels. All entries share one shape,
//! fixed by the first pair added.

use crate::image::{Grid, ImagePixel, Label};
use crate::util::{OpalError, OpalResult};

/// Library of equally sized image/segmentation pairs.
#[derive(Clone, Debug, Default)]
pub struct ImageLibrary {
    images: Vec<Grid<ImagePixel>>,
    segmentations: Vec<Grid<Label>>,
    names: Vec<(String, String)>,
    height: usize,
    width: usize,
}

impl ImageLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an image and its segmentation.
    pub fn add(&mut self, image: Grid<ImagePixel>, segmentation: Grid<Label>) -> OpalResult<()> {
        self.add_named(image, segmentation, "", "")
    }

    /// Appends an image and its segmentation, recording their source names.
    ///
    /// The pair must agree in shape, and must match the shape of entries
    /// already in the library.
    pub fn add_named(
        &mut self,
        image: Grid<ImagePixel>,
        segmentation: Grid<Label>,
        image_name: &str,
        segmentation_name: &str,
    ) -> OpalResult<()> {
        if !image.same_shape(&segmentation) {
            return Err(OpalError::ShapeMismatch {
                expected: image.shape(),
                got: segmentation.shape(),
                context: "segmentation",
            });
        }
        if self.images.is_empty() {
            self.height = image.height();
            self.width = image.width();
        } else if image.shape() != (self.height, self.width) {
            return Err(OpalError::ShapeMismatch {
                expected: (self.height, self.width),
                got: image.shape(),
                context: "library entry",
            });
        }

        self.images.push(image);
        self.segmentations.push(segmentation);
        self.names
            .push((image_name.to_owned(), segmentation_name.to_owned()));
        Ok(())
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.images.clear();
        self.segmentations.clear();
        self.names.clear();
        self.height = 0;
        self.width = 0;
    }

    /// Returns the number of entries, target included.
    pub fn count(&self) -> usize {
        self.images.len()
    }

    /// Returns `true` if the library holds no entries.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Returns the shared image height (0 while empty).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the shared image width (0 while empty).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image of entry `index`.
    pub fn image(&self, index: usize) -> OpalResult<&Grid<ImagePixel>> {
        self.images.get(index).ok_or(OpalError::IndexOutOfRange {
            index,
            len: self.images.len(),
            context: "image",
        })
    }

    /// Returns the segmentation of entry `index`.
    pub fn segmentation(&self, index: usize) -> OpalResult<&Grid<Label>> {
        self.segmentations
            .get(index)
            .ok_or(OpalError::IndexOutOfRange {
                index,
                len: self.segmentations.len(),
                context: "segmentation",
            })
    }

    /// Returns the `(image, segmentation)` source names of entry `index`.
    pub fn names(&self, index: usize) -> OpalResult<(&str, &str)> {
        self.names
            .get(index)
            .map(|(img, seg)| (img.as_str(), seg.as_str()))
            .ok_or(OpalError::IndexOutOfRange {
                index,
                len: self.names.len(),
                context: "name",
            })
    }

    pub(crate) fn images(&self) -> &[Grid<ImagePixel>] {
        &self.images
    }

    pub(crate) fn segmentations(&self) -> &[Grid<Label>] {
        &self.segmentations
    }
}
