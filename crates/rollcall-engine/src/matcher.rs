//! Gallery matcher.
//!
//! Linear scan over a snapshot of enrolled templates, applying the
//! descriptor comparator under a per-candidate timeout and an overall
//! wall-clock budget. A corrupt row or a timed-out comparison skips that
//! candidate; budget exhaustion stops the scan and returns the best
//! match found so far.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use rollcall_core::{
    compare::{compare, Metric, DEFAULT_COSINE_THRESHOLD},
    types::{Descriptor, GalleryEntry},
};

/// Default wait for a single gallery comparison.
pub const DEFAULT_CANDIDATE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default wall-clock budget for one whole gallery scan.
pub const DEFAULT_SEARCH_BUDGET: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub metric: Metric,
    pub threshold: f32,
    pub per_candidate_timeout: Duration,
    pub overall_budget: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Cosine,
            threshold: DEFAULT_COSINE_THRESHOLD,
            per_candidate_timeout: DEFAULT_CANDIDATE_TIMEOUT,
            overall_budget: DEFAULT_SEARCH_BUDGET,
        }
    }
}

/// Result of a one-to-many gallery search.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Match {
        identity_id: Uuid,
        code: String,
        display_name: String,
        similarity: f32,
    },
    /// No candidate reached the threshold. The highest similarity seen
    /// across the whole gallery is kept so callers can report how close
    /// the nearest miss was.
    Unresolved { highest_similarity: f32 },
}

/// Scan `gallery` for the best qualifying match of `probe`.
///
/// Candidates are evaluated in the order given; a tie on similarity
/// keeps the earlier-found candidate. The gallery must therefore be a
/// snapshot with a stable order, which `TemplateStore::list_gallery`
/// guarantees.
pub async fn find_best(
    probe: &Descriptor,
    gallery: Vec<GalleryEntry>,
    config: &MatchConfig,
) -> MatchOutcome {
    let total = gallery.len();
    let probe = Arc::new(probe.clone());
    let deadline = Instant::now() + config.overall_budget;

    let mut best: Option<(usize, f32)> = None;
    let mut highest_similarity = 0.0f32;
    let mut scanned = 0usize;

    for (idx, entry) in gallery.iter().enumerate() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!(
                scanned,
                total,
                "gallery scan budget exhausted, returning best so far"
            );
            break;
        }
        scanned += 1;

        let values: Vec<f32> = match serde_json::from_str(&entry.raw_descriptor) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    identity_id = %entry.identity_id,
                    error = %e,
                    "skipping gallery entry with unparseable descriptor"
                );
                continue;
            }
        };
        let candidate = Descriptor::new(values);

        let probe = Arc::clone(&probe);
        let metric = config.metric;
        let threshold = config.threshold;
        let wait = config.per_candidate_timeout.min(remaining);

        let comparison = tokio::time::timeout(
            wait,
            tokio::task::spawn_blocking(move || compare(&probe, &candidate, metric, threshold)),
        )
        .await;

        let comparison = match comparison {
            Err(_) => {
                tracing::warn!(
                    identity_id = %entry.identity_id,
                    timeout = ?wait,
                    "comparison timed out, treating as non-match"
                );
                continue;
            }
            Ok(Err(join)) => {
                tracing::warn!(identity_id = %entry.identity_id, error = %join, "comparison task failed");
                continue;
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(identity_id = %entry.identity_id, error = %e, "skipping incompatible gallery entry");
                continue;
            }
            Ok(Ok(Ok(c))) => c,
        };

        tracing::debug!(
            identity_id = %entry.identity_id,
            similarity = comparison.similarity,
            distance = comparison.distance,
            is_match = comparison.is_match,
            "gallery comparison"
        );

        if comparison.similarity > highest_similarity {
            highest_similarity = comparison.similarity;
        }

        // Strict improvement only: equal similarity keeps the
        // earlier-found candidate.
        let current_best = best.map(|(_, sim)| sim).unwrap_or(f32::NEG_INFINITY);
        if comparison.is_match && comparison.similarity > current_best {
            best = Some((idx, comparison.similarity));
        }
    }

    match best {
        Some((idx, similarity)) => {
            let entry = &gallery[idx];
            tracing::info!(
                identity_id = %entry.identity_id,
                code = %entry.code,
                similarity,
                "gallery match"
            );
            MatchOutcome::Match {
                identity_id: entry.identity_id,
                code: entry.code.clone(),
                display_name: entry.display_name.clone(),
                similarity,
            }
        }
        None => {
            tracing::info!(
                highest_similarity,
                scanned,
                total,
                "no gallery match above threshold"
            );
            MatchOutcome::Unresolved { highest_similarity }
        }
    }
}
