//! Pace records and label validation.
//!
//! # Purpose
//! Defines the pace row returned by the store and the validated label type
//! every label-accepting operation goes through before touching storage.
//!
//! # Key invariants
//! - A [`PaceLabel`] is 1 to [`MAX_LABEL_CHARS`] ASCII letters, digits, or `_`.
//! - `follower_count` mirrors the number of subscription rows for the pace.
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Longest accepted label; autocomplete choice names stop at 100 characters.
pub const MAX_LABEL_CHARS: usize = 100;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Pace {
    pub pace_id: i64,
    pub label: String,
    pub follower_count: i64,
}

/// A pace label that passed validation.
///
/// Construct with [`PaceLabel::parse`]; there is no other way in, so holding a
/// `PaceLabel` means the label is safe to hand to the store.
///
/// # Example
/// ```rust
/// use paceping::model::PaceLabel;
///
/// assert!(PaceLabel::parse("Sprint_1").is_ok());
/// assert!(PaceLabel::parse("drop table").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaceLabel(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pace label: {0:?}")]
pub struct InvalidLabel(pub String);

impl PaceLabel {
    pub fn parse(raw: &str) -> Result<Self, InvalidLabel> {
        if is_valid_label(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidLabel(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PaceLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true when `raw` is a run of 1 to [`MAX_LABEL_CHARS`] `[A-Za-z0-9_]`.
pub fn is_valid_label(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_LABEL_CHARS
        && raw
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
