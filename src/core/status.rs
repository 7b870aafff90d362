//! Job status lifecycle.
//!
//! A job moves through `ready -> running -> complete | failed`, and each
//! subsequent scheduled fire takes it from `complete` or `failed` back to
//! `running`. There is no direct path between `complete` and `failed`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from illegal status transitions.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The requested transition is not part of the lifecycle.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Lifecycle status of a job.
///
/// Serialized in lowercase (`"ready"`, `"running"`, ...) to match the
/// on-disk job records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted but not yet run.
    #[default]
    Ready,
    /// An occurrence is executing right now.
    Running,
    /// The last run succeeded.
    Complete,
    /// The last run errored.
    Failed,
}

impl JobStatus {
    /// Whether moving from `self` to `to` is a legal lifecycle step.
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Ready, Running) | (Running, Complete) | (Running, Failed) | (Complete, Running) | (Failed, Running)
        )
    }

    /// Perform a transition, returning the new status or an error.
    pub fn transition(self, to: JobStatus) -> Result<JobStatus, StatusError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(StatusError::InvalidTransition { from: self, to })
        }
    }

    /// Whether a scheduled fire may start an execution from this status.
    ///
    /// `running` is excluded: a job must not start a second occurrence while
    /// one is already in flight.
    pub fn can_fire(&self) -> bool {
        !self.is_running()
    }

    /// Whether an execution is in progress.
    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Ready => "ready",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
