//! Best-match selection over a roster snapshot.
//!
//! Each candidate is scored `face_distance + (1 - feature_similarity)`,
//! ascending-is-better, and the minimum-score candidate wins if it clears
//! the acceptance threshold. The scan is a single forward pass with a
//! strict less-than comparison, so the first-encountered candidate wins
//! exact ties deterministically.

use thiserror::Error;

use crate::types::{IdentityRecord, MatchOutcome, NoMatchReason, Query};

/// Default acceptance threshold, in face-distance units.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

#[derive(Error, Debug)]
pub enum MatchError {
    /// The query is unusable as a whole; no partial scan is performed.
    #[error("invalid query: {0}")]
    InvalidQuery(&'static str),
}

/// Matching knobs. Signature dimensionality is deliberately absent: it is
/// enforced pairwise per comparison, never pre-declared.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Maximum combined score at which the best candidate still counts as
    /// a match.
    pub match_threshold: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Strategy for identifying a query against a snapshot of records.
pub trait Matcher {
    fn identify(
        &self,
        query: &Query,
        snapshot: &[IdentityRecord],
    ) -> Result<MatchOutcome, MatchError>;
}

/// Linear-scan matcher. Scans every record of the snapshot per query; no
/// index. An approximate-nearest-neighbor implementation can replace it
/// behind the [`Matcher`] seam as long as the exact top-1 is preserved.
#[derive(Debug, Default, Clone)]
pub struct LinearMatcher {
    config: MatcherConfig,
}

impl LinearMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn with_threshold(match_threshold: f32) -> Self {
        Self {
            config: MatcherConfig { match_threshold },
        }
    }

    /// Combined dissimilarity score for one candidate, ascending-is-better.
    ///
    /// The secondary term contributes only when both sides carry auxiliary
    /// features; a record or query without them is scored on face distance
    /// alone ("absent" means no opinion, not a penalty). A dimension
    /// mismatch on the primary signature excludes the candidate (`None`) —
    /// the only exclusion path.
    fn score(query: &Query, record: &IdentityRecord) -> Option<f32> {
        let face_distance = match query.primary.distance(&record.primary) {
            Ok(d) => d,
            Err(err) => {
                tracing::warn!(id = %record.id, error = %err, "candidate excluded from scan");
                return None;
            }
        };

        let secondary_term = match (&query.secondary, &record.secondary) {
            (Some(q), Some(r)) => 1.0 - q.similarity(r),
            _ => 0.0,
        };

        Some(face_distance + secondary_term)
    }
}

impl Matcher for LinearMatcher {
    fn identify(
        &self,
        query: &Query,
        snapshot: &[IdentityRecord],
    ) -> Result<MatchOutcome, MatchError> {
        if query.primary.is_empty() {
            return Err(MatchError::InvalidQuery("primary signature is empty"));
        }
        if !query.primary.is_finite() {
            return Err(MatchError::InvalidQuery(
                "primary signature contains non-finite values",
            ));
        }

        let mut best: Option<(usize, f32)> = None;
        let mut excluded = 0usize;

        // Full scan, no early exit: strict less-than keeps the first
        // candidate on exact ties, and that rule only holds over the whole
        // snapshot in order.
        for (i, record) in snapshot.iter().enumerate() {
            let Some(score) = Self::score(query, record) else {
                excluded += 1;
                continue;
            };

            let better = match best {
                None => true,
                Some((_, best_score)) => score < best_score,
            };
            if better {
                best = Some((i, score));
            }
        }

        tracing::debug!(
            candidates = snapshot.len(),
            excluded,
            best_score = best.map(|(_, s)| s),
            "scan complete"
        );

        match best {
            Some((idx, score)) if score < self.config.match_threshold => Ok(MatchOutcome::Match {
                profile: snapshot[idx].profile(),
                score,
            }),
            Some((_, best_score)) => Ok(MatchOutcome::NoMatch {
                reason: NoMatchReason::AboveThreshold { best_score },
            }),
            None => Ok(MatchOutcome::NoMatch {
                reason: NoMatchReason::NoCandidates,
            }),
        }
    }
}
