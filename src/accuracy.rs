//! Segmentation overlap scores.

use crate::image::{Grid, Label};
use crate::util::{OpalError, OpalResult};
use std::collections::BTreeMap;

/// Per-label Dice coefficients `2 |A ∩ B| / (|A| + |B|)` between a reference
/// and an estimated segmentation.
///
/// Every label present in either segmentation gets an entry; labels that
/// never overlap score `0.0`.
pub fn dice_scores(
    reference: &Grid<Label>,
    estimate: &Grid<Label>,
) -> OpalResult<BTreeMap<Label, f64>> {
    if !reference.same_shape(estimate) {
        return Err(OpalError::ShapeMismatch {
            expected: reference.shape(),
            got: estimate.shape(),
            context: "estimated segmentation",
        });
    }

    // (reference count, estimate count, overlap count)
    let mut counts: BTreeMap<Label, (usize, usize, usize)> = BTreeMap::new();
    for (&r, &e) in reference.as_slice().iter().zip(estimate.as_slice()) {
        counts.entry(r).or_default().0 += 1;
        counts.entry(e).or_default().1 += 1;
        if r == e {
            counts.entry(r).or_default().2 += 1;
        }
    }

    Ok(counts
        .into_iter()
        .map(|(label, (a, b, both))| (label, (2 * both) as f64 / (a + b) as f64))
        .collect())
}

/// Mean of the Dice scores, skipping `ignore` (e.g. background or the
/// unlabeled border). Returns `None` when no label remains.
pub fn mean_dice(scores: &BTreeMap<Label, f64>, ignore: &[Label]) -> Option<f64> {
    let kept: Vec<f64> = scores
        .iter()
        .filter(|(label, _)| !ignore.contains(label))
        .map(|(_, &score)| score)
        .collect();
    if kept.is_empty() {
        return None;
    }
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}
