//! Job definitions.
//!
//! A [`Job`] is a named shell command with a cron-style recurrence, a
//! notification flag, and a lifecycle status. [`NewJob`] is the shape a job
//! has before the store assigns it an id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schedule::{Schedule, ScheduleError};
use super::status::JobStatus;
use super::types::JobId;

/// Errors that can occur when building jobs.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job name is empty.
    #[error("job name must not be empty")]
    EmptyName,

    /// The job command is empty.
    #[error("job command must not be empty")]
    EmptyCommand,

    /// The schedule expression is invalid.
    #[error(transparent)]
    InvalidSchedule(#[from] ScheduleError),
}

/// A job definition before id assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Human-readable name.
    pub name: String,
    /// The shell command to run. Opaque to the scheduler.
    pub command: String,
    /// Cron expression describing when to run.
    pub schedule: String,
    /// Whether to notify on this job's outcomes.
    #[serde(default)]
    pub email_notification: bool,
}

impl NewJob {
    /// Create a new job definition, validating name, command, and schedule.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Result<Self, JobError> {
        let name = name.into();
        let command = command.into();
        let schedule = schedule.into();

        if name.trim().is_empty() {
            return Err(JobError::EmptyName);
        }
        if command.trim().is_empty() {
            return Err(JobError::EmptyCommand);
        }
        Schedule::parse(&schedule)?;

        Ok(Self {
            name,
            command,
            schedule,
            email_notification: false,
        })
    }

    /// Set whether outcomes should be notified.
    pub fn with_notification(mut self, notify: bool) -> Self {
        self.email_notification = notify;
        self
    }
}

/// A registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier, assigned by the store.
    pub id: JobId,
    /// Human-readable name.
    pub name: String,
    /// The shell command to run.
    pub command: String,
    /// Cron expression describing when to run.
    pub schedule: String,
    /// Whether to notify on this job's outcomes.
    #[serde(default)]
    pub email_notification: bool,
    /// Lifecycle status of the last (or current) run.
    #[serde(default)]
    pub status: JobStatus,
}

impl Job {
    /// Assemble a job from a validated definition and an assigned id.
    ///
    /// New jobs start in the `ready` status.
    pub fn from_new(id: JobId, new: NewJob) -> Self {
        Self {
            id,
            name: new.name,
            command: new.command,
            schedule: new.schedule,
            email_notification: new.email_notification,
            status: JobStatus::Ready,
        }
    }

    /// Parse this job's schedule expression.
    pub fn parsed_schedule(&self) -> Result<Schedule, ScheduleError> {
        Schedule::parse(&self.schedule)
    }
}
