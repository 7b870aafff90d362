//! Core identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a job.
///
/// Ids are integers starting at 1, assigned monotonically by the job store.
/// An id is never reused, even after the job it named is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// Create a JobId from a raw integer.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
