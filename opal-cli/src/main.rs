use clap::Parser;
use opal::accuracy::{dice_scores, mean_dice};
use opal::io::{load_gray_grid, load_label_grid, save_label_grid};
use opal::{CorrespondenceSearch, ImageLibrary, LabelVoter, SearchSettings, UNLABELED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "OPAL multi-atlas segmentation (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for each search phase.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum VoterConfig {
    MaxVote,
    MedianPositional,
}

impl From<VoterConfig> for LabelVoter {
    fn from(value: VoterConfig) -> Self {
        match value {
            VoterConfig::MaxVote => LabelVoter::MaxVote,
            VoterConfig::MedianPositional => LabelVoter::MedianPositional,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSet {
    files: Vec<PathBuf>,
    folder: Option<PathBuf>,
    extension: String,
}

impl Default for FileSet {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            folder: None,
            extension: "png".to_owned(),
        }
    }
}

impl FileSet {
    /// Explicit files, then the folder's matching files sorted by name.
    fn resolve(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut paths = self.files.clone();
        if let Some(folder) = &self.folder {
            let mut listed = Vec::new();
            for entry in fs::read_dir(folder)? {
                let path = entry?.path();
                let matches = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()));
                if path.is_file() && matches {
                    listed.push(path);
                }
            }
            listed.sort();
            paths.extend(listed);
        }
        Ok(paths)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SearchConfigJson {
    init_window_radius: usize,
    patch_radius: usize,
    max_iterations: usize,
    seed: u64,
    parallel: bool,
    diagnostics_path: Option<PathBuf>,
}

impl Default for SearchConfigJson {
    fn default() -> Self {
        let cfg = SearchSettings::default();
        Self {
            init_window_radius: cfg.init_window_radius,
            patch_radius: cfg.patch_radius,
            max_iterations: cfg.max_iterations,
            seed: cfg.seed,
            parallel: cfg.parallel,
            diagnostics_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    images: FileSet,
    segmentations: FileSet,
    search: SearchConfigJson,
    voter: VoterConfig,
    output_path: PathBuf,
    summary_path: Option<PathBuf>,
    ground_truth_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            images: FileSet::default(),
            segmentations: FileSet::default(),
            search: SearchConfigJson::default(),
            voter: VoterConfig::MaxVote,
            output_path: PathBuf::from("segmentation.png"),
            summary_path: None,
            ground_truth_path: None,
        }
    }
}

impl Config {
    fn settings(&self) -> SearchSettings {
        let search = &self.search;
        SearchSettings {
            init_window_radius: search.init_window_radius,
            patch_radius: search.patch_radius,
            max_iterations: search.max_iterations,
            diagnostics_enabled: search.diagnostics_path.is_some(),
            diagnostics_path: search.diagnostics_path.clone().unwrap_or_default(),
            seed: search.seed,
            parallel: search.parallel,
            voter: self.voter.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    height: usize,
    width: usize,
    library_entries: usize,
    iterations: usize,
    mean_distance: f64,
    output_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    dice: Option<BTreeMap<i32, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean_dice: Option<f64>,
}

fn load_library(config: &Config) -> Result<ImageLibrary, Box<dyn std::error::Error>> {
    let images = config.images.resolve()?;
    let segmentations = config.segmentations.resolve()?;
    if images.len() != segmentations.len() {
        return Err(format!(
            "{} images but {} segmentations",
            images.len(),
            segmentations.len()
        )
        .into());
    }

    let mut library = ImageLibrary::new();
    for (image_path, seg_path) in images.iter().zip(&segmentations) {
        library.add_named(
            load_gray_grid(image_path)?,
            load_label_grid(seg_path)?,
            &display(image_path),
            &display(seg_path),
        )?;
    }
    tracing::info!(entries = library.count(), "library loaded");
    Ok(library)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("opal=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    let settings = config.settings();
    settings.validate()?;

    let library = load_library(&config)?;
    let iterations = settings.max_iterations;
    let mut search = CorrespondenceSearch::new(&library, settings)?;
    let output = search.run()?.clone();
    save_label_grid(&output, &config.output_path)?;

    let (dice, mean) = match &config.ground_truth_path {
        Some(path) => {
            let reference = load_label_grid(path)?;
            let scores = dice_scores(&reference, &output)?;
            let mean = mean_dice(&scores, &[UNLABELED]);
            (Some(scores), mean)
        }
        None => (None, None),
    };

    let summary = Summary {
        height: library.height(),
        width: library.width(),
        library_entries: library.count(),
        iterations,
        mean_distance: search.mean_distance(),
        output_path: config.output_path.clone(),
        dice,
        mean_dice: mean,
    };
    let json = serde_json::to_string_pretty(&summary)?;

    match &config.summary_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
