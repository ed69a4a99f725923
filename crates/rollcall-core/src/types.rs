use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when two signatures of different lengths are compared with the
/// primary (Euclidean) metric. Vectors are never truncated or padded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("signature length mismatch: expected {expected}, got {actual}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Fixed-length numeric feature vector (face signature or auxiliary
/// appearance features).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    pub values: Vec<f32>,
}

impl Signature {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Euclidean (L2) distance to another signature.
    ///
    /// Lengths must match exactly; a mismatch is a hard error so that a
    /// malformed record can be skipped by the caller instead of silently
    /// producing a bogus distance.
    pub fn distance(&self, other: &Signature) -> Result<f32, DimensionMismatch> {
        if self.len() != other.len() {
            return Err(DimensionMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }

        let sum: f32 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        Ok(sum.sqrt())
    }

    /// Cosine similarity to another signature, in [-1, 1].
    ///
    /// Unlike [`distance`](Self::distance), a length mismatch is soft and
    /// yields `0.0`: auxiliary features are best-effort and must never fail
    /// a comparison. A zero-norm vector on either side also yields `0.0`.
    pub fn similarity(&self, other: &Signature) -> f32 {
        if self.len() != other.len() {
            return 0.0;
        }

        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

impl From<Vec<f32>> for Signature {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// A registered identity with its stored signatures.
///
/// Created once at registration and immutable thereafter; removable only
/// by id. `attributes` is an opaque caller-defined bag (name, roll number,
/// thumbnail reference) that the matcher carries through uninterpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: String,
    pub attributes: serde_json::Value,
    pub primary: Signature,
    pub secondary: Option<Signature>,
    pub created_at: String,
}

impl IdentityRecord {
    /// Display-safe view of this record, with signature vectors redacted.
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id.clone(),
            attributes: self.attributes.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// A freshly extracted signature to be identified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub primary: Signature,
    pub secondary: Option<Signature>,
}

impl Query {
    pub fn new(primary: Signature) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: Signature) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

/// Display-safe subset of an [`IdentityRecord`]. The only identity shape
/// that crosses the matching boundary outward; raw vectors never do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub attributes: serde_json::Value,
    pub created_at: String,
}

/// Why an identification produced no match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoMatchReason {
    /// The snapshot held no scoreable candidates (empty roster, or every
    /// record was excluded for a dimension mismatch).
    NoCandidates,
    /// Candidates were scored but none cleared the acceptance threshold.
    /// Carries the best score seen, for diagnostics.
    AboveThreshold { best_score: f32 },
}

/// Result of matching a query against a roster snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchOutcome {
    Match { profile: Profile, score: f32 },
    NoMatch { reason: NoMatchReason },
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match { .. })
    }
}
