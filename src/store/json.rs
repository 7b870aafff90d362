//! JSON file job store.
//!
//! Persists jobs as a single pretty-printed JSON document holding the id
//! counter and the job list. Every mutation is a read-modify-write of the
//! whole file; the file is small (a handful of job records) so this stays
//! simple and crash-safe enough for a single-process scheduler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{JobStore, StoreError};
use crate::core::job::{Job, NewJob};
use crate::core::status::JobStatus;
use crate::core::types::JobId;

/// On-disk document layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    /// Next id to assign. Persisted so ids survive deletes.
    next_id: u64,
    /// All job records.
    jobs: Vec<Job>,
}

/// JSON-file-backed job store.
///
/// The `Mutex` serializes read-modify-write cycles; individual store calls
/// are short, so contention is negligible next to job execution times.
pub struct JsonJobStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonJobStore {
    /// Open a store at the given path. The file is created on first write;
    /// a missing file reads as an empty store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document {
                next_id: 1,
                jobs: Vec::new(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, doc: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    /// Run a read-modify-write cycle under the store lock.
    fn with_document<T>(
        &self,
        f: impl FnOnce(&mut Document) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut doc = self.read_document()?;
        let result = f(&mut doc)?;
        self.write_document(&doc)?;
        Ok(result)
    }
}

#[async_trait]
impl JobStore for JsonJobStore {
    async fn create_job(&self, new: NewJob) -> Result<Job, StoreError> {
        self.with_document(|doc| {
            let id = JobId::new(doc.next_id);
            doc.next_id += 1;

            let job = Job::from_new(id, new);
            doc.jobs.push(job.clone());
            Ok(job)
        })
    }

    async fn load_all(&self) -> Result<Vec<Job>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(self.read_document()?.jobs)
    }

    async fn load_job(&self, id: JobId) -> Result<Job, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.read_document()?
            .jobs
            .into_iter()
            .find(|j| j.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    async fn save_job(&self, job: Job) -> Result<(), StoreError> {
        self.with_document(|doc| {
            let slot = doc
                .jobs
                .iter_mut()
                .find(|j| j.id == job.id)
                .ok_or(StoreError::NotFound(job.id))?;
            *slot = job;
            Ok(())
        })
    }

    async fn save_status(&self, id: JobId, status: JobStatus) -> Result<(), StoreError> {
        self.with_document(|doc| {
            let job = doc
                .jobs
                .iter_mut()
                .find(|j| j.id == id)
                .ok_or(StoreError::NotFound(id))?;
            job.status = status;
            Ok(())
        })
    }

    async fn delete_job(&self, id: JobId) -> Result<(), StoreError> {
        self.with_document(|doc| {
            let before = doc.jobs.len();
            doc.jobs.retain(|j| j.id != id);
            if doc.jobs.len() == before {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_job(name: &str) -> NewJob {
        NewJob::new(name, "echo hi", "* * * * *").unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = JsonJobStore::new(dir.path().join("jobs.json"));

        let jobs = store.load_all().await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_create_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let store = JsonJobStore::new(&path);
        let job = store
            .create_job(new_job("backup").with_notification(true))
            .await
            .unwrap();
        assert_eq!(job.id, JobId::new(1));

        // A fresh store handle over the same file sees the job.
        let reopened = JsonJobStore::new(&path);
        let loaded = reopened.load_job(job.id).await.unwrap();
        assert_eq!(loaded.name, "backup");
        assert!(loaded.email_notification);
        assert_eq!(loaded.status, JobStatus::Ready);
    }

    #[tokio::test]
    async fn test_id_counter_survives_deletes() {
        let dir = tempdir().unwrap();
        let store = JsonJobStore::new(dir.path().join("jobs.json"));

        let a = store.create_job(new_job("a")).await.unwrap();
        let b = store.create_job(new_job("b")).await.unwrap();
        store.delete_job(a.id).await.unwrap();
        store.delete_job(b.id).await.unwrap();

        let c = store.create_job(new_job("c")).await.unwrap();
        assert_eq!(c.id, JobId::new(3));
    }

    #[tokio::test]
    async fn test_save_status_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonJobStore::new(dir.path().join("jobs.json"));

        let job = store.create_job(new_job("a")).await.unwrap();
        store
            .save_status(job.id, JobStatus::Running)
            .await
            .unwrap();
        store
            .save_status(job.id, JobStatus::Complete)
            .await
            .unwrap();

        let loaded = store.load_job(job.id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn test_save_status_unknown_job() {
        let dir = tempdir().unwrap();
        let store = JsonJobStore::new(dir.path().join("jobs.json"));

        let result = store.save_status(JobId::new(9), JobStatus::Running).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_job() {
        let dir = tempdir().unwrap();
        let store = JsonJobStore::new(dir.path().join("jobs.json"));

        let result = store.delete_job(JobId::new(5)).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonJobStore::new(&path);
        let result = store.load_all().await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_file_is_pretty_printed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let store = JsonJobStore::new(&path);
        store.create_job(new_job("a")).await.unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        assert!(data.contains('\n'));
        assert!(data.contains("\"next_id\": 2"));
    }
}
