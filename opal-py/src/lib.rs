//! Python bindings for the opal multi-atlas segmentation library.
//!
//! Images are passed as 2D `float64` arrays and segmentations as 2D `int32`
//! arrays; the first pair is the target, the rest form the atlas.

use std::collections::BTreeMap;

use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use opal::accuracy::{dice_scores, mean_dice};
use opal::{
    CorrespondenceSearch, Grid, ImageLibrary, Label, LabelVoter, OpalError,
    SearchSettings as RustSearchSettings, UNLABELED,
};

/// Convert an OpalError to a Python exception.
fn to_py_err(err: OpalError) -> PyErr {
    match err {
        OpalError::InvalidSettings { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn grid_from_array<T: numpy::Element + Copy>(array: &PyReadonlyArray2<'_, T>) -> PyResult<Grid<T>> {
    let shape = array.shape();
    let data = array.as_slice()?.to_vec();
    Grid::from_vec(data, shape[0], shape[1]).map_err(to_py_err)
}

fn grid_into_array<'py>(
    py: Python<'py>,
    grid: Grid<Label>,
) -> PyResult<Bound<'py, PyArray2<Label>>> {
    let shape = grid.shape();
    let array = Array2::from_shape_vec(shape, grid.into_vec())
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    Ok(array.into_pyarray(py))
}

/// Parameters of the correspondence search.
#[pyclass]
#[derive(Clone)]
pub struct SearchSettings {
    inner: RustSearchSettings,
}

#[pymethods]
impl SearchSettings {
    /// Create a new SearchSettings.
    ///
    /// Args:
    ///     init_window_radius: Half-size of the random initialization window (default: 10)
    ///     patch_radius: Patch radius; patches are 2r+1 pixels wide (default: 3)
    ///     max_iterations: Propagation passes (default: 30)
    ///     seed: Random seed (default: 0)
    ///     parallel: Parallelize independent passes (default: False)
    ///     voter: "max_vote" or "median_positional" (default: "max_vote")
    ///     diagnostics_path: Directory for flow snapshots, disabled when None
    #[new]
    #[pyo3(signature = (
        init_window_radius = 10,
        patch_radius = 3,
        max_iterations = 30,
        seed = 0,
        parallel = false,
        voter = "max_vote",
        diagnostics_path = None
    ))]
    fn new(
        init_window_radius: usize,
        patch_radius: usize,
        max_iterations: usize,
        seed: u64,
        parallel: bool,
        voter: &str,
        diagnostics_path: Option<String>,
    ) -> PyResult<Self> {
        let voter: LabelVoter = voter.to_lowercase().parse().map_err(to_py_err)?;
        let inner = RustSearchSettings {
            init_window_radius,
            patch_radius,
            max_iterations,
            diagnostics_enabled: diagnostics_path.is_some(),
            diagnostics_path: diagnostics_path.map(Into::into).unwrap_or_default(),
            seed,
            parallel,
            voter,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Load settings from a `key = value` text file.
    #[staticmethod]
    fn from_file(path: &str) -> PyResult<Self> {
        let inner = RustSearchSettings::read_from_file(path).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the settings.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    #[getter]
    fn patch_radius(&self) -> usize {
        self.inner.patch_radius
    }

    #[getter]
    fn init_window_radius(&self) -> usize {
        self.inner.init_window_radius
    }

    #[getter]
    fn max_iterations(&self) -> usize {
        self.inner.max_iterations
    }

    #[getter]
    fn seed(&self) -> u64 {
        self.inner.seed
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }

    fn __repr__(&self) -> String {
        format!(
            "SearchSettings(init_window_radius={}, patch_radius={}, max_iterations={}, seed={}, voter='{}')",
            self.inner.init_window_radius,
            self.inner.patch_radius,
            self.inner.max_iterations,
            self.inner.seed,
            self.inner.voter
        )
    }
}

/// Segment the first image using the others as atlases.
///
/// Args:
///     images: list of 2D float64 arrays, all the same shape
///     segmentations: list of 2D int32 arrays, one per image
///     settings: SearchSettings (default: SearchSettings())
///
/// Returns:
///     2D int32 array; border pixels are -1
#[pyfunction]
#[pyo3(signature = (images, segmentations, settings = None))]
fn segment<'py>(
    py: Python<'py>,
    images: Vec<PyReadonlyArray2<'py, f64>>,
    segmentations: Vec<PyReadonlyArray2<'py, i32>>,
    settings: Option<SearchSettings>,
) -> PyResult<Bound<'py, PyArray2<Label>>> {
    if images.len() != segmentations.len() {
        return Err(PyValueError::new_err(format!(
            "{} images but {} segmentations",
            images.len(),
            segmentations.len()
        )));
    }

    let mut library = ImageLibrary::new();
    for (image, seg) in images.iter().zip(&segmentations) {
        library
            .add(grid_from_array(image)?, grid_from_array(seg)?)
            .map_err(to_py_err)?;
    }

    let settings = settings.map(|s| s.inner).unwrap_or_default();
    let mut search = CorrespondenceSearch::new(&library, settings).map_err(to_py_err)?;
    let output = search.run().map_err(to_py_err)?.clone();
    grid_into_array(py, output)
}

/// Segment images loaded from files.
///
/// Args:
///     image_paths: grayscale image files; the first one is the target
///     segmentation_paths: label image files, one per image
///     settings: SearchSettings (default: SearchSettings())
#[pyfunction]
#[pyo3(signature = (image_paths, segmentation_paths, settings = None))]
fn segment_files<'py>(
    py: Python<'py>,
    image_paths: Vec<String>,
    segmentation_paths: Vec<String>,
    settings: Option<SearchSettings>,
) -> PyResult<Bound<'py, PyArray2<Label>>> {
    if image_paths.len() != segmentation_paths.len() {
        return Err(PyValueError::new_err(
            "image_paths and segmentation_paths must have the same length",
        ));
    }

    let mut library = ImageLibrary::new();
    for (image, seg) in image_paths.iter().zip(&segmentation_paths) {
        let image_grid = opal::io::load_gray_grid(image).map_err(to_py_err)?;
        let seg_grid = opal::io::load_label_grid(seg).map_err(to_py_err)?;
        library
            .add_named(image_grid, seg_grid, image, seg)
            .map_err(to_py_err)?;
    }

    let settings = settings.map(|s| s.inner).unwrap_or_default();
    let mut search = CorrespondenceSearch::new(&library, settings).map_err(to_py_err)?;
    let output = search.run().map_err(to_py_err)?.clone();
    grid_into_array(py, output)
}

/// Per-label Dice scores and their mean (border label -1 excluded).
///
/// Returns:
///     (dict label -> score, mean or None)
#[pyfunction]
fn dice(
    reference: PyReadonlyArray2<'_, i32>,
    estimate: PyReadonlyArray2<'_, i32>,
) -> PyResult<(BTreeMap<Label, f64>, Option<f64>)> {
    let reference = grid_from_array(&reference)?;
    let estimate = grid_from_array(&estimate)?;
    let scores = dice_scores(&reference, &estimate).map_err(to_py_err)?;
    let mean = mean_dice(&scores, &[UNLABELED]);
    Ok((scores, mean))
}

/// Python module for opal segmentation.
#[pymodule]
fn _opal(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<SearchSettings>()?;
    m.add_function(wrap_pyfunction!(segment, m)?)?;
    m.add_function(wrap_pyfunction!(segment_files, m)?)?;
    m.add_function(wrap_pyfunction!(dice, m)?)?;
    m.add("UNLABELED", UNLABELED)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
