//! Execution runner: drives one job occurrence.
//!
//! Each run is persisted as `running`, executed through the command
//! boundary, persisted as `complete` or `failed`, and (when the job asks
//! for it) reported through the notifier. Every status write is checked
//! against the lifecycle: the current status is read back from the store
//! and the step applied through [`JobStatus::transition`], so an illegal
//! step (say `complete` directly to `failed` after a lost intermediate
//! write) is refused and logged rather than persisted. Store and notifier
//! failures are logged and never escalate into the scheduling path.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::command::CommandExecutor;
use crate::core::job::Job;
use crate::core::status::JobStatus;
use crate::notify::Notifier;
use crate::store::JobStore;

/// Default upper bound on a single notification send.
const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a single run, used for logging by the caller. Re-arming does
/// not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The command exited successfully.
    Succeeded,
    /// The command errored or could not be started.
    Failed,
}

/// Runs one occurrence of a job.
pub struct ExecutionRunner<S> {
    store: Arc<S>,
    executor: Arc<dyn CommandExecutor>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl<S: JobStore> ExecutionRunner<S> {
    /// Create a runner over the given collaborators.
    pub fn new(
        store: Arc<S>,
        executor: Arc<dyn CommandExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            executor,
            notifier,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Set the upper bound on a single notification send.
    pub fn with_notify_timeout(mut self, limit: Duration) -> Self {
        self.notify_timeout = limit;
        self
    }

    /// Run one occurrence of the job.
    pub async fn run(&self, job: &Job) -> RunOutcome {
        // Status writes are best-effort telemetry, not a gate: a failed
        // write is logged and the run proceeds.
        self.save_status(job, JobStatus::Running).await;

        match self.executor.execute(&job.command).await {
            Ok(()) => {
                self.save_status(job, JobStatus::Complete).await;
                if job.email_notification {
                    self.notify(job, &format!(
                        "Cron Job:\nName: {}\nCommand: {}\nSchedule: {}",
                        job.name, job.command, job.schedule
                    ))
                    .await;
                }
                RunOutcome::Succeeded
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "job command failed");
                self.save_status(job, JobStatus::Failed).await;
                if job.email_notification {
                    self.notify(job, &format!(
                        "Cron Job Failed:\nName: {}\nCommand: {}\nSchedule: {}",
                        job.name, job.command, job.schedule
                    ))
                    .await;
                }
                RunOutcome::Failed
            }
        }
    }

    /// Apply a lifecycle step and persist it.
    ///
    /// The step is validated against the status currently in the store, not
    /// the caller's in-memory copy, so concurrent writers cannot smuggle in
    /// an illegal transition.
    async fn save_status(&self, job: &Job, status: JobStatus) {
        let current = match self.store.load_job(job.id).await {
            Ok(stored) => stored.status,
            Err(e) => {
                tracing::warn!(job_id = %job.id, %status, error = %e, "failed to load job for status update");
                return;
            }
        };

        match current.transition(status) {
            Ok(next) => {
                if let Err(e) = self.store.save_status(job.id, next).await {
                    tracing::warn!(job_id = %job.id, %status, error = %e, "failed to persist job status");
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "status update refused");
            }
        }
    }

    async fn notify(&self, job: &Job, message: &str) {
        match timeout(self.notify_timeout, self.notifier.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(job_id = %job.id, error = %e, "notification failed");
            }
            Err(_) => {
                tracing::warn!(
                    job_id = %job.id,
                    limit = ?self.notify_timeout,
                    "notification timed out"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::NewJob;
    use crate::execution::command::ActionError;
    use crate::notify::NotifyError;
    use crate::store::{InMemoryJobStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Executor that succeeds or fails on demand.
    struct FakeExecutor {
        fail: bool,
    }

    #[async_trait]
    impl CommandExecutor for FakeExecutor {
        async fn execute(&self, _command: &str) -> Result<(), ActionError> {
            if self.fail {
                Err(ActionError::CommandFailed {
                    code: 1,
                    stderr: "boom".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    /// Notifier that records every message.
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
        fail: AtomicBool,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                messages: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) -> Result<(), NotifyError> {
            self.messages.lock().unwrap().push(message.to_string());
            if self.fail.load(Ordering::SeqCst) {
                Err(NotifyError::Send("injected".into()))
            } else {
                Ok(())
            }
        }
    }

    /// Store wrapper whose status writes can be made to fail.
    struct FailingStore {
        inner: InMemoryJobStore,
        fail_save_status: AtomicBool,
    }

    /// Store that silently swallows the first status write.
    struct DroppingStore {
        inner: InMemoryJobStore,
        dropped: AtomicBool,
    }

    #[async_trait]
    impl JobStore for DroppingStore {
        async fn create_job(&self, new: NewJob) -> Result<Job, StoreError> {
            self.inner.create_job(new).await
        }

        async fn load_all(&self) -> Result<Vec<Job>, StoreError> {
            self.inner.load_all().await
        }

        async fn load_job(&self, id: crate::JobId) -> Result<Job, StoreError> {
            self.inner.load_job(id).await
        }

        async fn save_job(&self, job: Job) -> Result<(), StoreError> {
            self.inner.save_job(job).await
        }

        async fn save_status(
            &self,
            id: crate::JobId,
            status: JobStatus,
        ) -> Result<(), StoreError> {
            if !self.dropped.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            self.inner.save_status(id, status).await
        }

        async fn delete_job(&self, id: crate::JobId) -> Result<(), StoreError> {
            self.inner.delete_job(id).await
        }
    }

    #[async_trait]
    impl JobStore for FailingStore {
        async fn create_job(&self, new: NewJob) -> Result<Job, StoreError> {
            self.inner.create_job(new).await
        }

        async fn load_all(&self) -> Result<Vec<Job>, StoreError> {
            self.inner.load_all().await
        }

        async fn load_job(&self, id: crate::JobId) -> Result<Job, StoreError> {
            self.inner.load_job(id).await
        }

        async fn save_job(&self, job: Job) -> Result<(), StoreError> {
            self.inner.save_job(job).await
        }

        async fn save_status(
            &self,
            id: crate::JobId,
            status: JobStatus,
        ) -> Result<(), StoreError> {
            if self.fail_save_status.load(Ordering::SeqCst) {
                return Err(StoreError::LockPoisoned);
            }
            self.inner.save_status(id, status).await
        }

        async fn delete_job(&self, id: crate::JobId) -> Result<(), StoreError> {
            self.inner.delete_job(id).await
        }
    }

    async fn setup_job(store: &impl JobStore, notify: bool) -> Job {
        store
            .create_job(
                NewJob::new("demo", "echo hi", "* * * * *")
                    .unwrap()
                    .with_notification(notify),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_persists_complete_and_notifies() {
        let store = Arc::new(InMemoryJobStore::new());
        let notifier = RecordingNotifier::new();
        let runner = ExecutionRunner::new(
            Arc::clone(&store),
            Arc::new(FakeExecutor { fail: false }),
            notifier.clone(),
        );

        let job = setup_job(store.as_ref(), true).await;
        let outcome = runner.run(&job).await;

        assert_eq!(outcome, RunOutcome::Succeeded);
        assert_eq!(
            store.load_job(job.id).await.unwrap().status,
            JobStatus::Complete
        );

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Cron Job:\n"));
        assert!(messages[0].contains("Name: demo"));
        assert!(messages[0].contains("Command: echo hi"));
        assert!(messages[0].contains("Schedule: * * * * *"));
    }

    #[tokio::test]
    async fn test_failed_run_persists_failed_and_notifies() {
        let store = Arc::new(InMemoryJobStore::new());
        let notifier = RecordingNotifier::new();
        let runner = ExecutionRunner::new(
            Arc::clone(&store),
            Arc::new(FakeExecutor { fail: true }),
            notifier.clone(),
        );

        let job = setup_job(store.as_ref(), true).await;
        let outcome = runner.run(&job).await;

        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(
            store.load_job(job.id).await.unwrap().status,
            JobStatus::Failed
        );

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Cron Job Failed:\n"));
    }

    #[tokio::test]
    async fn test_no_notification_when_flag_unset() {
        let store = Arc::new(InMemoryJobStore::new());
        let notifier = RecordingNotifier::new();
        let runner = ExecutionRunner::new(
            Arc::clone(&store),
            Arc::new(FakeExecutor { fail: false }),
            notifier.clone(),
        );

        let job = setup_job(store.as_ref(), false).await;
        runner.run(&job).await;

        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_change_outcome() {
        let store = Arc::new(InMemoryJobStore::new());
        let notifier = RecordingNotifier::new();
        notifier.fail.store(true, Ordering::SeqCst);

        let runner = ExecutionRunner::new(
            Arc::clone(&store),
            Arc::new(FakeExecutor { fail: false }),
            notifier.clone(),
        );

        let job = setup_job(store.as_ref(), true).await;
        let outcome = runner.run(&job).await;

        // The send failed but the run outcome and status are untouched.
        assert_eq!(outcome, RunOutcome::Succeeded);
        assert_eq!(
            store.load_job(job.id).await.unwrap().status,
            JobStatus::Complete
        );
    }

    #[tokio::test]
    async fn test_run_proceeds_when_status_write_fails() {
        let store = Arc::new(FailingStore {
            inner: InMemoryJobStore::new(),
            fail_save_status: AtomicBool::new(false),
        });
        let notifier = RecordingNotifier::new();
        let runner = ExecutionRunner::new(
            Arc::clone(&store),
            Arc::new(FakeExecutor { fail: false }),
            notifier.clone(),
        );

        let job = setup_job(store.as_ref(), true).await;
        store.fail_save_status.store(true, Ordering::SeqCst);

        let outcome = runner.run(&job).await;

        // Status writes failed, but the command still ran and the
        // notification still went out.
        assert_eq!(outcome, RunOutcome::Succeeded);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_illegal_status_step_is_refused() {
        // The `running` write is silently lost, so the store still says
        // `ready` when the run finishes. `ready -> complete` skips
        // `running` and must be refused, leaving the stored status alone.
        let store = Arc::new(DroppingStore {
            inner: InMemoryJobStore::new(),
            dropped: AtomicBool::new(false),
        });
        let runner = ExecutionRunner::new(
            Arc::clone(&store),
            Arc::new(FakeExecutor { fail: false }),
            RecordingNotifier::new(),
        );

        let job = setup_job(store.as_ref(), false).await;
        let outcome = runner.run(&job).await;

        assert_eq!(outcome, RunOutcome::Succeeded);
        assert_eq!(
            store.load_job(job.id).await.unwrap().status,
            JobStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_status_sequence_passes_through_running() {
        // Observe the intermediate `running` status from a slow executor.
        struct SlowExecutor;

        #[async_trait]
        impl CommandExecutor for SlowExecutor {
            async fn execute(&self, _command: &str) -> Result<(), ActionError> {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            }
        }

        let store = Arc::new(InMemoryJobStore::new());
        let runner = Arc::new(ExecutionRunner::new(
            Arc::clone(&store),
            Arc::new(SlowExecutor),
            RecordingNotifier::new(),
        ));

        let job = setup_job(store.as_ref(), false).await;

        let run = tokio::spawn({
            let runner = Arc::clone(&runner);
            let job = job.clone();
            async move { runner.run(&job).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            store.load_job(job.id).await.unwrap().status,
            JobStatus::Running
        );

        run.await.unwrap();
        assert_eq!(
            store.load_job(job.id).await.unwrap().status,
            JobStatus::Complete
        );
    }
}
