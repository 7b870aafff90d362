//! Scheduler registry implementation.
//!
//! The registry owns the map of armed timers, keyed by job id. It is the
//! only component that starts or stops timers. Each armed job runs one
//! lightweight task that sleeps to the next fire instant, hands the
//! occurrence to the execution runner, and re-arms itself while the job is
//! still registered.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::core::job::Job;
use crate::core::schedule::{Schedule, ScheduleError};
use crate::core::types::JobId;
use crate::execution::ExecutionRunner;
use crate::store::{JobStore, StoreError};

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The job id is unknown to the store.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// A timer is already armed for this job id. Unschedule first.
    #[error("job already scheduled: {0}")]
    AlreadyScheduled(JobId),

    /// The job's schedule expression failed to parse.
    #[error(transparent)]
    InvalidSchedule(#[from] ScheduleError),

    /// The store failed while loading the job.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SchedulerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SchedulerError::JobNotFound(id),
            other => SchedulerError::Store(other),
        }
    }
}

/// An armed timer for one job. Owned exclusively by the registry.
struct ArmedTimer {
    /// The computed next fire instant.
    next_fire: DateTime<Utc>,
    /// Handle of the timer task, retained so cancellation is explicit.
    handle: JoinHandle<()>,
}

type TimerMap = HashMap<JobId, ArmedTimer>;

/// Registry of live job timers.
///
/// Created at process start and passed by reference to the surrounding
/// layer; [`SchedulerRegistry::shutdown`] cancels every timer. Mutations
/// serialize on the registry lock, which is only ever held for map updates,
/// never across a job's execution, so one job's long run cannot delay
/// another job's fire or cancellation.
pub struct SchedulerRegistry<S> {
    store: Arc<S>,
    runner: Arc<ExecutionRunner<S>>,
    timers: Arc<RwLock<TimerMap>>,
}

impl<S: JobStore + 'static> SchedulerRegistry<S> {
    /// Create a registry over the given store and runner.
    pub fn new(store: Arc<S>, runner: ExecutionRunner<S>) -> Self {
        Self {
            store,
            runner: Arc::new(runner),
            timers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Arm a timer for the job.
    ///
    /// Loads the job fresh from the store, validates its schedule, and arms
    /// the first occurrence. Fails with [`SchedulerError::AlreadyScheduled`]
    /// if a timer exists for this id; callers must unschedule first.
    /// Returns the computed first fire instant without blocking on it.
    pub async fn schedule(&self, id: JobId) -> Result<DateTime<Utc>, SchedulerError> {
        let mut timers = self.timers.write().await;
        if timers.contains_key(&id) {
            return Err(SchedulerError::AlreadyScheduled(id));
        }

        let job = self.store.load_job(id).await?;
        self.arm(&mut timers, &job)
    }

    /// Cancel and remove the timer for the job, if any.
    ///
    /// Idempotent: unscheduling an absent id is a no-op, so deleting an
    /// already-completed or never-scheduled job never errors. A fire already
    /// in flight is allowed to finish its runner pass; its status write may
    /// still land (see the module docs on the known race).
    pub async fn unschedule(&self, id: JobId) {
        let mut timers = self.timers.write().await;
        if let Some(timer) = timers.remove(&id) {
            timer.handle.abort();
            tracing::debug!(job_id = %id, "timer cancelled");
        }
    }

    /// Replace the timer for the job with one armed from a fresh store read.
    ///
    /// Performed under a single critical section: once accepted, no fire can
    /// be observed on the stale schedule.
    pub async fn reschedule(&self, id: JobId) -> Result<DateTime<Utc>, SchedulerError> {
        let mut timers = self.timers.write().await;
        if let Some(timer) = timers.remove(&id) {
            timer.handle.abort();
        }

        let job = self.store.load_job(id).await?;
        self.arm(&mut timers, &job)
    }

    /// Schedule every job in the store, logging and skipping jobs whose
    /// schedule fails to parse. Returns the number of timers armed.
    pub async fn schedule_all(&self) -> Result<usize, SchedulerError> {
        let jobs = self.store.load_all().await.map_err(SchedulerError::Store)?;

        let mut timers = self.timers.write().await;
        let mut armed = 0;
        for job in jobs {
            if timers.contains_key(&job.id) {
                continue;
            }
            match self.arm(&mut timers, &job) {
                Ok(next) => {
                    tracing::info!(job_id = %job.id, %next, "job scheduled");
                    armed += 1;
                }
                Err(e) => {
                    tracing::warn!(job_id = %job.id, error = %e, "skipping job with invalid schedule");
                }
            }
        }
        Ok(armed)
    }

    /// Cancel all timers. The registry can be reused afterwards.
    pub async fn shutdown(&self) {
        let mut timers = self.timers.write().await;
        for (id, timer) in timers.drain() {
            timer.handle.abort();
            tracing::debug!(job_id = %id, "timer cancelled at shutdown");
        }
    }

    /// Whether a timer is armed for the job.
    pub async fn is_scheduled(&self, id: JobId) -> bool {
        self.timers.read().await.contains_key(&id)
    }

    /// Number of armed timers.
    pub async fn armed_count(&self) -> usize {
        self.timers.read().await.len()
    }

    /// The next fire instant for the job, if armed.
    pub async fn next_fire(&self, id: JobId) -> Option<DateTime<Utc>> {
        self.timers.read().await.get(&id).map(|t| t.next_fire)
    }

    /// Validate the job's schedule, spawn its timer task, and record the
    /// armed timer. Caller holds the registry write lock.
    fn arm(&self, timers: &mut TimerMap, job: &Job) -> Result<DateTime<Utc>, SchedulerError> {
        let schedule = job.parsed_schedule()?;
        let next = schedule.next_after(Utc::now())?;

        let id = job.id;
        let handle = tokio::spawn(Self::timer_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.timers),
            Arc::clone(&self.runner),
            id,
            schedule,
            next,
        ));

        timers.insert(id, ArmedTimer { next_fire: next, handle });
        Ok(next)
    }

    /// Per-job timer task: sleep to the fire instant, run the occurrence,
    /// re-arm while still registered.
    ///
    /// Each fire reloads the job from the store, so edits made by another
    /// process (name, command, notification flag) take effect at the next
    /// occurrence, a record deleted out from under a live timer disarms it
    /// instead of firing forever, and a record marked `running` elsewhere
    /// is skipped for this occurrence.
    ///
    /// The run itself happens in a detached task, so cancelling this timer
    /// mid-fire lets the in-flight run finish (the documented race) while a
    /// pending, not-yet-fired timer cancels deterministically. Re-arming
    /// happens only after the run completes: a slow command never overlaps
    /// with its own next occurrence.
    async fn timer_loop(
        store: Arc<S>,
        timers: Arc<RwLock<TimerMap>>,
        runner: Arc<ExecutionRunner<S>>,
        id: JobId,
        schedule: Schedule,
        mut next: DateTime<Utc>,
    ) {
        loop {
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            let job = match store.load_job(id).await {
                Ok(job) => Some(job),
                Err(StoreError::NotFound(_)) => {
                    tracing::info!(job_id = %id, "job no longer in the store, disarming");
                    timers.write().await.remove(&id);
                    return;
                }
                Err(e) => {
                    tracing::warn!(job_id = %id, error = %e, "store read failed, skipping this occurrence");
                    None
                }
            };

            match job {
                Some(job) if job.status.can_fire() => {
                    tracing::debug!(job_id = %id, fire = %next, "timer fired");
                    let run = tokio::spawn({
                        let runner = Arc::clone(&runner);
                        async move { runner.run(&job).await }
                    });

                    match run.await {
                        Ok(outcome) => {
                            tracing::info!(job_id = %id, ?outcome, "run finished");
                        }
                        Err(e) => {
                            tracing::error!(job_id = %id, error = %e, "run task panicked");
                        }
                    }
                }
                Some(job) => {
                    tracing::warn!(job_id = %id, status = %job.status, "occurrence already running, skipping");
                }
                None => {}
            }

            // Re-arm the next occurrence, unless the job was unscheduled
            // while we were running.
            let mut guard = timers.write().await;
            match guard.get_mut(&id) {
                Some(armed) => match schedule.next_after(Utc::now()) {
                    Ok(n) => {
                        next = n;
                        armed.next_fire = n;
                    }
                    Err(e) => {
                        tracing::warn!(job_id = %id, error = %e, "no further occurrences, disarming");
                        guard.remove(&id);
                        return;
                    }
                },
                None => return,
            }
        }
    }
}
