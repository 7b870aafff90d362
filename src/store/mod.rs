//! Job store abstraction.
//!
//! The store is the durable record keeper for job definitions and status.
//! The scheduler core only reads and requests updates through this trait;
//! it never touches the storage encoding directly.

mod json;
mod memory;

pub use json::JsonJobStore;
pub use memory::InMemoryJobStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::job::{Job, NewJob};
use crate::core::status::JobStatus;
use crate::core::types::JobId;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested job was not found.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// Underlying I/O failure.
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store lock was poisoned.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Durable storage for job definitions and status.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job from a validated definition, assigning the next
    /// monotonic id. New jobs start in the `ready` status.
    async fn create_job(&self, new: NewJob) -> Result<Job, StoreError>;

    /// Load all job definitions.
    async fn load_all(&self) -> Result<Vec<Job>, StoreError>;

    /// Load a job by id.
    async fn load_job(&self, id: JobId) -> Result<Job, StoreError>;

    /// Replace a job record (full update).
    async fn save_job(&self, job: Job) -> Result<(), StoreError>;

    /// Persist a status change for a job.
    async fn save_status(&self, id: JobId, status: JobStatus) -> Result<(), StoreError>;

    /// Delete a job by id.
    async fn delete_job(&self, id: JobId) -> Result<(), StoreError>;
}
