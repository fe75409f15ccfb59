//! Search configuration.
//!
//! Settings can be built in code (starting from `Default`) or parsed from a
//! small `key = value` text format:
//!
//! ```text
//! # window for random initial offsets
//! init_window_radius = 10
//! patch_radius = 3
//! max_iterations = 30
//! diagnostics_enabled = false
//! diagnostics_path =
//! seed = 0
//! parallel = false
//! voter = max_vote
//! ```
//!
//! Keys not present keep their default value.

use crate::candidate::vote::LabelVoter;
use crate::util::{OpalError, OpalResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Parameters of the correspondence search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSettings {
    /// Half-size of the window random initial offsets are drawn from.
    pub init_window_radius: usize,
    /// Patch radius; patches are `2 * patch_radius + 1` pixels on a side.
    pub patch_radius: usize,
    /// Number of propagation passes run by `CorrespondenceSearch::run`.
    pub max_iterations: usize,
    /// Write the displacement field after initialization and every pass.
    pub diagnostics_enabled: bool,
    /// Directory receiving diagnostic flow files.
    pub diagnostics_path: PathBuf,
    /// Seed of the random generator used for initialization.
    pub seed: u64,
    /// Use rayon for the per-pixel independent passes (requires `rayon`).
    pub parallel: bool,
    /// Label fusion policy.
    pub voter: LabelVoter,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            init_window_radius: 10,
            patch_radius: 3,
            max_iterations: 30,
            diagnostics_enabled: false,
            diagnostics_path: PathBuf::new(),
            seed: 0,
            parallel: false,
            voter: LabelVoter::MaxVote,
        }
    }
}

impl SearchSettings {
    /// Side of the square patches, `2 * patch_radius + 1`.
    pub fn patch_side(&self) -> usize {
        2 * self.patch_radius + 1
    }

    /// Side of the initialization window, `2 * init_window_radius + 1`.
    pub fn init_window_side(&self) -> usize {
        2 * self.init_window_radius + 1
    }

    /// Checks values that cannot be expressed by the field types alone.
    pub fn validate(&self) -> OpalResult<()> {
        if self.diagnostics_enabled && self.diagnostics_path.as_os_str().is_empty() {
            return Err(invalid("diagnostics_enabled requires diagnostics_path"));
        }
        if i32::try_from(self.init_window_radius).is_err() {
            return Err(invalid("init_window_radius does not fit a signed offset"));
        }
        if i32::try_from(self.patch_radius).is_err() {
            return Err(invalid("patch_radius does not fit a signed offset"));
        }
        Ok(())
    }

    /// Reads `key = value` settings from a file.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> OpalResult<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }
}

impl FromStr for SearchSettings {
    type Err = OpalError;

    fn from_str(text: &str) -> OpalResult<Self> {
        let mut settings = SearchSettings::default();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| OpalError::InvalidSettings {
                reason: format!("line {}: expected `key = value`", line_no + 1),
            })?;
            let key = key.trim();
            let value = value.trim();
            match key {
                "init_window_radius" => settings.init_window_radius = parse_field(key, value)?,
                "patch_radius" => settings.patch_radius = parse_field(key, value)?,
                "max_iterations" => settings.max_iterations = parse_field(key, value)?,
                "diagnostics_enabled" => settings.diagnostics_enabled = parse_field(key, value)?,
                "diagnostics_path" => settings.diagnostics_path = PathBuf::from(value),
                "seed" => settings.seed = parse_field(key, value)?,
                "parallel" => settings.parallel = parse_field(key, value)?,
                "voter" => settings.voter = parse_field(key, value)?,
                _ => {
                    return Err(OpalError::InvalidSettings {
                        reason: format!("line {}: unknown key `{key}`", line_no + 1),
                    })
                }
            }
        }
        settings.validate()?;
        Ok(settings)
    }
}

impl fmt::Display for SearchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "init_window_radius = {}", self.init_window_radius)?;
        writeln!(f, "patch_radius = {}", self.patch_radius)?;
        writeln!(f, "max_iterations = {}", self.max_iterations)?;
        writeln!(f, "diagnostics_enabled = {}", self.diagnostics_enabled)?;
        writeln!(f, "diagnostics_path = {}", self.diagnostics_path.display())?;
        writeln!(f, "seed = {}", self.seed)?;
        writeln!(f, "parallel = {}", self.parallel)?;
        writeln!(f, "voter = {}", self.voter)
    }
}

impl FromStr for LabelVoter {
    type Err = OpalError;

    fn from_str(value: &str) -> OpalResult<Self> {
        match value {
            "max_vote" => Ok(LabelVoter::MaxVote),
            "median_positional" => Ok(LabelVoter::MedianPositional),
            _ => Err(OpalError::InvalidSettings {
                reason: format!("unknown voter `{value}`"),
            }),
        }
    }
}

impl fmt::Display for LabelVoter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelVoter::MaxVote => f.write_str("max_vote"),
            LabelVoter::MedianPositional => f.write_str("median_positional"),
        }
    }
}

fn parse_field<T: FromStr>(key: &str, value: &str) -> OpalResult<T> {
    value.parse().map_err(|_| OpalError::InvalidSettings {
        reason: format!("`{key}` has invalid value `{value}`"),
    })
}

fn invalid(reason: &str) -> OpalError {
    OpalError::InvalidSettings {
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::SearchSettings;
    use crate::candidate::vote::LabelVoter;
    use crate::util::OpalError;

    #[test]
    fn defaults_match_documented_values() {
        let s = SearchSettings::default();
        assert_eq!(s.init_window_radius, 10);
        assert_eq!(s.patch_radius, 3);
        assert_eq!(s.patch_side(), 7);
        assert_eq!(s.init_window_side(), 21);
        assert_eq!(s.max_iterations, 30);
        assert!(!s.diagnostics_enabled);
    }

    #[test]
    fn parse_overrides_only_given_keys() {
        let text = "# comment\npatch_radius = 2\n\nvoter = median_positional\nseed=42\n";
        let s: SearchSettings = text.parse().unwrap();
        assert_eq!(s.patch_radius, 2);
        assert_eq!(s.seed, 42);
        assert_eq!(s.voter, LabelVoter::MedianPositional);
        assert_eq!(s.max_iterations, 30);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let s = SearchSettings {
            patch_radius: 1,
            max_iterations: 4,
            parallel: true,
            ..SearchSettings::default()
        };
        let parsed: SearchSettings = s.to_string().parse().unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            "patch_radius = -1".parse::<SearchSettings>(),
            Err(OpalError::InvalidSettings { .. })
        ));
        assert!(matches!(
            "radius = 1".parse::<SearchSettings>(),
            Err(OpalError::InvalidSettings { .. })
        ));
        assert!(matches!(
            "diagnostics_enabled = true".parse::<SearchSettings>(),
            Err(OpalError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn huge_patch_radius_is_rejected() {
        assert!(matches!(
            "patch_radius = 18446744073709551615".parse::<SearchSettings>(),
            Err(OpalError::InvalidSettings { .. })
        ));
        let s = SearchSettings {
            patch_radius: usize::MAX,
            ..SearchSettings::default()
        };
        assert!(matches!(s.validate(), Err(OpalError::InvalidSettings { .. })));
    }
}
