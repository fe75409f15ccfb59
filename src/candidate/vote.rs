//! Label fusion policies.
//!
//! Every pixel of a patch window votes for one label; a `LabelVoter` reduces
//! those votes to the label written to the output segmentation.

use crate::image::Label;
use crate::util::{OpalError, OpalResult};

/// A label proposed for one output pixel, with its weight in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateLabel {
    /// Proposed label.
    pub label: Label,
    /// Vote weight.
    pub weight: f64,
}

impl CandidateLabel {
    /// Creates a candidate with the given weight.
    pub fn new(label: Label, weight: f64) -> Self {
        Self { label, weight }
    }
}

impl From<Label> for CandidateLabel {
    fn from(label: Label) -> Self {
        Self { label, weight: 1.0 }
    }
}

/// Policy used to reduce candidate labels to one label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LabelVoter {
    /// Label at the middle index of the candidates as given.
    ///
    /// This is positional, not a sorted median: reordering the candidates
    /// changes the result.
    MedianPositional,
    /// Label with the largest summed weight.
    ///
    /// Ties go to the label first seen in candidate order.
    #[default]
    MaxVote,
}

impl LabelVoter {
    /// Reduces `candidates` to one label.
    pub fn estimate_label(&self, candidates: &[CandidateLabel]) -> OpalResult<Label> {
        if candidates.is_empty() {
            return Err(OpalError::NoCandidates);
        }
        let label = match self {
            LabelVoter::MedianPositional => candidates[candidates.len() / 2].label,
            LabelVoter::MaxVote => max_vote(candidates),
        };
        Ok(label)
    }
}

fn max_vote(candidates: &[CandidateLabel]) -> Label {
    // Totals stay in first-seen order; only a strictly larger sum replaces `best`.
    let mut totals: Vec<(Label, f64)> = Vec::new();
    for cand in candidates {
        match totals.iter_mut().find(|(label, _)| *label == cand.label) {
            Some((_, sum)) => *sum += cand.weight,
            None => totals.push((cand.label, cand.weight)),
        }
    }

    let mut best = totals[0];
    for &entry in &totals[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best.0
}
