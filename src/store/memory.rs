//! In-memory job store.
//!
//! Thread-safe map backend for tests and ephemeral runs. Data is not
//! persisted across restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{JobStore, StoreError};
use crate::core::job::{Job, NewJob};
use crate::core::status::JobStatus;
use crate::core::types::JobId;

struct Inner {
    jobs: HashMap<JobId, Job>,
    next_id: u64,
}

/// In-memory job store backend.
pub struct InMemoryJobStore {
    inner: RwLock<Inner>,
}

impl InMemoryJobStore {
    /// Create a new empty store. The first created job gets id 1.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                jobs: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, new: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let id = JobId::new(inner.next_id);
        inner.next_id += 1;

        let job = Job::from_new(id, new);
        inner.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn load_all(&self) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut jobs: Vec<_> = inner.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| j.id);
        Ok(jobs)
    }

    async fn load_job(&self, id: JobId) -> Result<Job, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        inner
            .jobs
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn save_job(&self, job: Job) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        if !inner.jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound(job.id));
        }
        inner.jobs.insert(job.id, job);
        Ok(())
    }

    async fn save_status(&self, id: JobId, status: JobStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let job = inner.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.status = status;
        Ok(())
    }

    async fn delete_job(&self, id: JobId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.jobs.remove(&id).ok_or(StoreError::NotFound(id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(name: &str) -> NewJob {
        NewJob::new(name, "echo hi", "* * * * *").unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_monotonic_ids() {
        let store = InMemoryJobStore::new();

        let a = store.create_job(new_job("a")).await.unwrap();
        let b = store.create_job(new_job("b")).await.unwrap();

        assert_eq!(a.id, JobId::new(1));
        assert_eq!(b.id, JobId::new(2));
        assert_eq!(a.status, JobStatus::Ready);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = InMemoryJobStore::new();

        let a = store.create_job(new_job("a")).await.unwrap();
        store.delete_job(a.id).await.unwrap();

        let b = store.create_job(new_job("b")).await.unwrap();
        assert_eq!(b.id, JobId::new(2));
    }

    #[tokio::test]
    async fn test_load_job_not_found() {
        let store = InMemoryJobStore::new();
        let result = store.load_job(JobId::new(99)).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_status_persists() {
        let store = InMemoryJobStore::new();
        let job = store.create_job(new_job("a")).await.unwrap();

        store
            .save_status(job.id, JobStatus::Running)
            .await
            .unwrap();

        let loaded = store.load_job(job.id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_save_job_full_update() {
        let store = InMemoryJobStore::new();
        let mut job = store.create_job(new_job("a")).await.unwrap();

        job.schedule = "0 2 * * *".to_string();
        job.email_notification = true;
        store.save_job(job.clone()).await.unwrap();

        let loaded = store.load_job(job.id).await.unwrap();
        assert_eq!(loaded.schedule, "0 2 * * *");
        assert!(loaded.email_notification);
    }

    #[tokio::test]
    async fn test_save_unknown_job_fails() {
        let store = InMemoryJobStore::new();
        let job = Job::from_new(JobId::new(42), new_job("ghost"));
        assert!(matches!(
            store.save_job(job).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_all_ordered_by_id() {
        let store = InMemoryJobStore::new();
        for name in ["a", "b", "c"] {
            store.create_job(new_job(name)).await.unwrap();
        }

        let jobs = store.load_all().await.unwrap();
        assert_eq!(jobs.len(), 3);
        assert!(jobs.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_store_is_thread_safe() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryJobStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create_job(new_job(&format!("job_{}", i))).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let jobs = store.load_all().await.unwrap();
        assert_eq!(jobs.len(), 10);

        // All ids distinct
        let mut ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }
}
