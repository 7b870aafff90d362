//! minicron - a small cron job scheduler.
//!
//! Jobs are named shell commands with a cron-style recurrence. The
//! [`SchedulerRegistry`] arms one timer per job, the [`ExecutionRunner`]
//! drives each occurrence through the `ready -> running -> complete | failed`
//! lifecycle, and a [`Notifier`] reports outcomes.

pub mod config;
pub mod core;
pub mod execution;
pub mod notify;
pub mod scheduler;
pub mod store;

pub use config::{Config, ConfigError, TelegramConfig};
pub use core::job::{Job, JobError, NewJob};
pub use core::schedule::{Schedule, ScheduleError};
pub use core::status::{JobStatus, StatusError};
pub use core::types::JobId;
pub use execution::{ActionError, CommandExecutor, ExecutionRunner, RunOutcome, ShellExecutor};
pub use notify::{LogNotifier, Notifier, NotifyError, TelegramNotifier};
pub use scheduler::{SchedulerError, SchedulerRegistry};
pub use store::{InMemoryJobStore, JobStore, JsonJobStore, StoreError};
