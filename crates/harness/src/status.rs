//! Acceptable-status sets.
//!
//! Each step declares which HTTP statuses count as passing. A response status
//! is classified against that set into a [`StatusOutcome`], so "200 or 404"
//! branches are data on the step rather than conditionals in test code.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The set of HTTP statuses a step treats as passing.
///
/// An empty set means "any 2xx". Serializes as a plain array of integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSet {
    codes: BTreeSet<u16>,
}

impl StatusSet {
    /// Accepts any 2xx status.
    pub fn success() -> Self {
        Self::default()
    }

    /// Accepts exactly one status.
    pub fn exactly(status: u16) -> Self {
        Self::of([status])
    }

    /// Accepts any of the given statuses.
    pub fn of(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            codes: statuses.into_iter().collect(),
        }
    }

    /// Returns true if this set falls back to "any 2xx".
    pub fn is_success_range(&self) -> bool {
        self.codes.is_empty()
    }

    /// Returns true if the status is acceptable.
    pub fn accepts(&self, status: u16) -> bool {
        if self.codes.is_empty() {
            (200..300).contains(&status)
        } else {
            self.codes.contains(&status)
        }
    }

    /// Classifies a status against this set.
    pub fn evaluate(&self, status: u16) -> StatusOutcome {
        if self.accepts(status) {
            StatusOutcome::Accepted(status)
        } else {
            StatusOutcome::Rejected(status)
        }
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.codes.is_empty() {
            return write!(f, "2xx");
        }
        let codes: Vec<String> = self.codes.iter().map(u16::to_string).collect();
        write!(f, "{{{}}}", codes.join(", "))
    }
}

/// A response status tagged with whether the step accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum StatusOutcome {
    /// The status is in the acceptable set.
    Accepted(u16),
    /// The status is outside the acceptable set.
    Rejected(u16),
}

impl StatusOutcome {
    /// Returns the raw status code.
    pub fn status(&self) -> u16 {
        match self {
            StatusOutcome::Accepted(status) | StatusOutcome::Rejected(status) => *status,
        }
    }

    /// Returns true for [`StatusOutcome::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, StatusOutcome::Accepted(_))
    }
}
