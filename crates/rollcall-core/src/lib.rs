//! rollcall-core — Face-signature scoring and identity matching.
//!
//! Pure, synchronous matching of a query signature against a snapshot of
//! registered identity records. Signature extraction from images is an
//! external concern; this crate only sees fixed-length numeric vectors.

pub mod matcher;
pub mod types;

pub use matcher::{LinearMatcher, MatchError, Matcher, MatcherConfig};
pub use types::{
    DimensionMismatch, IdentityRecord, MatchOutcome, NoMatchReason, Profile, Query, Signature,
};
