//! Manages the state of long-running document analysis jobs.
//!
//! Analysis runs outside the request/response cycle. Handlers register a job
//! here, the worker in `crate::worker` reports progress over an MPSC channel,
//! and clients poll snapshots through `services::analysis`.
//!
//! The main components are:
//! - `JobsState`: a clonable, thread-safe handle on every known job plus the
//!   result cache. It is injected into the Actix application state in `main.rs`.
//! - `JobUpdate`: a progress message from a worker back to the state manager.
//! - `start_job_updater`: the long-running task that drains the channel and is
//!   the only writer of worker progress.

use crate::job_controller::cache::AnalysisCache;
use crate::job_controller::job::AnalysisJob;
use chrono::{DateTime, Duration, Utc};
use common::jobs::JobStatus;
use common::model::analysis::{AnalysisSnapshot, ParagraphResult};
use common::model::history::HistoryPage;
use log::{debug, info, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Capacity of the worker → updater channel.
pub const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// How often `start_retention_sweeper` looks for expired jobs.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(600);

/// A thread-safe, shareable container for the state of all analysis jobs.
#[derive(Clone)]
pub struct JobsState {
    /// Job id → job record. The single source of truth for job progress.
    ///
    /// Protected by an `Arc<RwLock>` so status polls read concurrently while
    /// the updater task (and `stop`) take short exclusive locks.
    pub jobs: Arc<RwLock<HashMap<String, AnalysisJob>>>,

    /// Session ids of completed analyses keyed by document hash.
    pub cache: AnalysisCache,

    /// Sender half of the progress channel, cloned into every worker.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// What a worker reports about its job.
#[derive(Debug)]
pub enum JobEvent {
    /// Segmentation finished; the job is now `processing`.
    Started { total_paragraphs: usize },
    /// A batch of analysed paragraphs, in index order.
    Paragraphs(Vec<ParagraphResult>),
    Completed,
    Failed(String),
}

/// A status update for a specific job, sent by workers via `JobsState.tx`.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) event: JobEvent,
}

impl JobsState {
    /// Builds an empty state and the receiver to hand to `start_job_updater`.
    pub fn new(cache: AnalysisCache) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cache,
            tx,
        };
        (state, rx)
    }

    pub async fn insert(&self, job: AnalysisJob) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn snapshot(&self, job_id: &str) -> Option<AnalysisSnapshot> {
        self.jobs.read().await.get(job_id).map(AnalysisJob::snapshot)
    }

    pub async fn contains(&self, job_id: &str) -> bool {
        self.jobs.read().await.contains_key(job_id)
    }

    /// Applies one worker update.
    ///
    /// Updates for unknown or terminal jobs are dropped, which is how a stop
    /// wins over a worker still finishing its current batch.
    pub async fn apply(&self, update: JobUpdate) {
        let completed = self.apply_locked(update).await;
        if let Some((hash, job_id)) = completed {
            self.cache.store(&hash, &job_id, Utc::now()).await;
        }
    }

    /// Applies `update` under the jobs lock. Returns the `(document_hash,
    /// job_id)` of a job that just completed so the caller can cache it once
    /// the lock is released.
    async fn apply_locked(&self, update: JobUpdate) -> Option<(String, String)> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&update.job_id) else {
            debug!("Dropping update for unknown job {}", update.job_id);
            return None;
        };
        if job.status.is_terminal() {
            debug!(
                "Dropping {:?} for job {} already {}",
                update.event, job.id, job.status
            );
            return None;
        }

        match update.event {
            JobEvent::Started { total_paragraphs } => {
                job.total_paragraphs = total_paragraphs;
                job.transition(JobStatus::Processing);
            }
            JobEvent::Paragraphs(batch) => {
                if job.status == JobStatus::Queued {
                    job.transition(JobStatus::Processing);
                }
                let offered = batch.len();
                let accepted = job.record_paragraphs(batch);
                if accepted < offered {
                    warn!(
                        "Job {}: dropped {} duplicate or out-of-order paragraph results",
                        job.id,
                        offered - accepted
                    );
                }
                debug!(
                    "Job {}: {}/{} paragraphs",
                    job.id, job.paragraphs_processed, job.total_paragraphs
                );
            }
            JobEvent::Completed => {
                if job.status == JobStatus::Queued {
                    job.transition(JobStatus::Processing);
                }
                if job.transition(JobStatus::Completed) {
                    info!(
                        "Job {} completed: {} paragraphs",
                        job.id, job.paragraphs_processed
                    );
                    return Some((job.document_hash.clone(), job.id.clone()));
                }
            }
            JobEvent::Failed(reason) => {
                if job.transition(JobStatus::Failed) {
                    warn!("Job {} failed: {}", job.id, reason);
                    job.failure = Some(reason);
                }
            }
        }
        None
    }

    /// Asks a job owned by `owner` to stop. Returns the status the job had
    /// before the call, or `None` for unknown ids and other users' jobs.
    ///
    /// Terminal jobs are left untouched. Otherwise the job becomes `stopped`
    /// immediately and its worker is signalled to quit at the next batch.
    pub async fn request_stop(&self, job_id: &str, owner: &str) -> Option<JobStatus> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id).filter(|job| job.owner == owner)?;
        let previous = job.status;
        if !previous.is_terminal() && job.transition(JobStatus::Stopped) {
            job.cancel.cancel();
            info!(
                "Job {} stopped after {} paragraphs",
                job.id, job.paragraphs_processed
            );
        }
        Some(previous)
    }

    /// The caller's jobs, newest first.
    pub async fn history(&self, owner: &str, limit: usize, offset: usize) -> HistoryPage {
        let jobs = self.jobs.read().await;
        let mut owned: Vec<&AnalysisJob> = jobs.values().filter(|j| j.owner == owner).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        HistoryPage {
            total: owned.len(),
            analyses: owned
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(AnalysisJob::history_entry)
                .collect(),
            limit,
            offset,
        }
    }

    /// Removes a job owned by `owner`, cancelling it if still running.
    pub async fn remove(&self, job_id: &str, owner: &str) -> bool {
        let removed = {
            let mut jobs = self.jobs.write().await;
            match jobs.get(job_id) {
                Some(job) if job.owner == owner => jobs.remove(job_id),
                _ => None,
            }
        };
        match removed {
            Some(job) => {
                job.cancel.cancel();
                self.cache.forget_session(job_id).await;
                true
            }
            None => false,
        }
    }

    /// Forgets terminal jobs that finished at least `retention` before `now`,
    /// along with their cache entries. Running jobs are never evicted.
    pub async fn evict_finished(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let evicted: Vec<String> = {
            let mut jobs = self.jobs.write().await;
            let expired: Vec<String> = jobs
                .values()
                .filter(|job| job.status.is_terminal())
                .filter(|job| job.completed_at.is_some_and(|at| at + retention <= now))
                .map(|job| job.id.clone())
                .collect();
            for id in &expired {
                jobs.remove(id);
            }
            expired
        };
        for id in &evicted {
            self.cache.forget_session(id).await;
        }
        evicted.len()
    }

    pub async fn rename(&self, job_id: &str, owner: &str, title: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(job) if job.owner == owner => {
                job.title = Some(title.to_string());
                true
            }
            _ => false,
        }
    }
}

/// Starts the central job state updater task.
///
/// Spawned once in `main.rs`. It runs until every sender is dropped, applying
/// each `JobUpdate` in arrival order.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        state.apply(update).await;
    }
}

/// Periodically evicts finished jobs older than `retention`.
///
/// Spawned once in `main.rs` unless retention is disabled.
pub async fn start_retention_sweeper(state: JobsState, retention: Duration) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let evicted = state.evict_finished(Utc::now(), retention).await;
        if evicted > 0 {
            info!(
                "Evicted {} analyses finished more than {}h ago",
                evicted,
                retention.num_hours()
            );
        }
    }
}
