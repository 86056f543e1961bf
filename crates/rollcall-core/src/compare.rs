//! Descriptor comparator.
//!
//! Pure numeric comparison of two face descriptors by cosine similarity
//! and Euclidean distance, with a threshold decision. No I/O, no shared
//! state; safe to call from any number of tasks concurrently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Descriptor;

/// Cosine threshold used for verification-grade comparisons.
pub const DEFAULT_COSINE_THRESHOLD: f32 = 0.55;

/// Descriptors whose L2 norm is within this tolerance of 1.0 are treated
/// as already normalized by the extractor and are not normalized again.
const UNIT_NORM_TOLERANCE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("descriptor dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Which metric drives the match decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
}

/// Outcome of comparing two descriptors.
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    /// Cosine similarity of the (normalized) vectors, except under the
    /// Euclidean metric where it is `1 - distance/√2` clamped to [0, 1].
    pub similarity: f32,
    /// Euclidean distance between the (normalized) vectors.
    pub distance: f32,
    pub is_match: bool,
}

/// Compare two descriptors and decide a match against `threshold`.
///
/// Both vectors are brought to unit L2 norm first, unless both are
/// already unit-norm within tolerance — extractors such as face-api.js
/// emit normalized descriptors and double-normalizing would only add
/// floating-point noise.
pub fn compare(
    a: &Descriptor,
    b: &Descriptor,
    metric: Metric,
    threshold: f32,
) -> Result<Comparison, CompareError> {
    if a.dim() != b.dim() {
        return Err(CompareError::DimensionMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }

    let already_unit = (a.l2_norm() - 1.0).abs() < UNIT_NORM_TOLERANCE
        && (b.l2_norm() - 1.0).abs() < UNIT_NORM_TOLERANCE;

    let (a, b) = if already_unit {
        (a.clone(), b.clone())
    } else {
        (a.normalized(), b.normalized())
    };

    let dot: f32 = a
        .values
        .iter()
        .zip(b.values.iter())
        .map(|(x, y)| x * y)
        .sum();
    let distance: f32 = a
        .values
        .iter()
        .zip(b.values.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt();

    let comparison = match metric {
        Metric::Cosine => Comparison {
            similarity: dot,
            distance,
            is_match: dot >= threshold,
        },
        Metric::Euclidean => Comparison {
            // Map distance into a [0, 1] similarity for diagnostics;
            // unit vectors are at most √2 apart.
            similarity: (1.0 - distance / std::f32::consts::SQRT_2).clamp(0.0, 1.0),
            distance,
            is_match: distance <= threshold,
        },
    };

    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[test]
    fn identical_unit_vectors_match_at_any_threshold() {
        let v = desc(&[1.0, 0.0, 0.0]);
        let c = compare(&v, &v, Metric::Cosine, 1.0).unwrap();
        assert!((c.similarity - 1.0).abs() < 1e-6);
        assert!(c.distance.abs() < 1e-6);
        assert!(c.is_match);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let a = desc(&[1.0, 0.0]);
        let b = desc(&[1.0, 0.0, 0.0]);
        let err = compare(&a, &b, Metric::Cosine, 0.5).unwrap_err();
        assert!(matches!(
            err,
            CompareError::DimensionMismatch { left: 2, right: 3 }
        ));
    }

    #[test]
    fn orthogonal_vectors_do_not_match() {
        let a = desc(&[1.0, 0.0]);
        let b = desc(&[0.0, 1.0]);
        let c = compare(&a, &b, Metric::Cosine, 0.55).unwrap();
        assert!(c.similarity.abs() < 1e-6);
        assert!(!c.is_match);
    }

    #[test]
    fn unnormalized_inputs_are_normalized_before_comparison() {
        // Same direction, wildly different magnitudes.
        let a = desc(&[3.0, 0.0]);
        let b = desc(&[0.5, 0.0]);
        let c = compare(&a, &b, Metric::Cosine, 0.55).unwrap();
        assert!((c.similarity - 1.0).abs() < 1e-6);
        assert!(c.is_match);
    }

    #[test]
    fn near_unit_vectors_skip_renormalization() {
        // Norm 1.05 is inside the tolerance; the raw dot product is used.
        let a = desc(&[1.05, 0.0]);
        let b = desc(&[1.0, 0.0]);
        let c = compare(&a, &b, Metric::Cosine, 0.55).unwrap();
        assert!((c.similarity - 1.05).abs() < 1e-6);
    }

    #[test]
    fn euclidean_metric_decides_on_distance() {
        let a = desc(&[1.0, 0.0]);
        let b = desc(&[0.0, 1.0]);
        // Unit orthogonal vectors are √2 apart.
        let c = compare(&a, &b, Metric::Euclidean, 0.5).unwrap();
        assert!((c.distance - std::f32::consts::SQRT_2).abs() < 1e-5);
        assert!(!c.is_match);
        assert!(c.similarity.abs() < 1e-5);

        let c = compare(&a, &a, Metric::Euclidean, 0.5).unwrap();
        assert!(c.is_match);
    }

    #[test]
    fn similarity_at_threshold_matches() {
        // cos = 0.55 exactly against threshold 0.55.
        let probe = desc(&[1.0, 0.0]);
        let cand = desc(&[0.55, (1.0f32 - 0.55 * 0.55).sqrt()]);
        let c = compare(&probe, &cand, Metric::Cosine, DEFAULT_COSINE_THRESHOLD).unwrap();
        assert!(c.is_match);
    }
}
