//! Error types for opal.

use thiserror::Error;

/// Result alias for opal operations.
pub type OpalResult<T> = std::result::Result<T, OpalError>;

/// Errors that can occur when building inputs or running the search.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OpalError {
    /// Grid dimensions are zero or overflow.
    #[error("invalid dimensions: {height}x{width}")]
    InvalidDimensions { height: usize, width: usize },
    /// A buffer does not hold exactly `height * width` elements.
    #[error("buffer length mismatch: needed {needed}, got {got}")]
    BufferLengthMismatch { needed: usize, got: usize },
    /// Two grids that must share a shape do not.
    #[error("shape mismatch: {context} expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
        context: &'static str,
    },
    /// A grid coordinate is outside the grid.
    #[error("cell ({row}, {col}) out of bounds for {height}x{width} grid")]
    CellOutOfBounds {
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    },
    /// An index is outside the valid range.
    #[error("{context} index {index} out of range (len {len})")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// The image library has no entries.
    #[error("image library is empty")]
    EmptyLibrary,
    /// The image library only holds the target image.
    #[error("image library holds only the target entry, at least one atlas is required")]
    SingleEntryLibrary,
    /// A patch around the given center does not fit inside its grid.
    #[error(
        "patch of radius {radius} centered at ({row}, {col}) is outside the {height}x{width} grid"
    )]
    PatchOutOfBounds {
        row: usize,
        col: usize,
        radius: usize,
        height: usize,
        width: usize,
    },
    /// A patch shift would move one of the patches off its grid.
    #[error("cannot shift patch pair {direction}: destination leaves the grid")]
    ShiftOutOfBounds { direction: &'static str },
    /// Patches of the configured radius do not fit into the library images.
    #[error("patch side {side} does not fit into {height}x{width} images")]
    PatchTooLarge {
        side: usize,
        height: usize,
        width: usize,
    },
    /// A search operation was called in the wrong state.
    #[error("cannot {operation} while search is {state}")]
    InvalidSequencing {
        operation: &'static str,
        state: &'static str,
    },
    /// The candidate list handed to a voter was empty.
    #[error("no candidate labels to vote on")]
    NoCandidates,
    /// Settings text or values are invalid.
    #[error("invalid settings: {reason}")]
    InvalidSettings { reason: String },
    /// A flow file is malformed.
    #[error("invalid flow file: {reason}")]
    InvalidFlow { reason: String },
    /// Filesystem access failed.
    #[error("io error: {reason}")]
    Io { reason: String },
    /// Image decoding or encoding failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}

impl From<std::io::Error> for OpalError {
    fn from(err: std::io::Error) -> Self {
        OpalError::Io {
            reason: err.to_string(),
        }
    }
}
