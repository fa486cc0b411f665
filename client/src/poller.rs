//! The poll loop that follows one analysis until it ends.
//!
//! Polls are strictly sequential: the next one is scheduled only after the
//! previous response was handled. A failed poll ends the loop without
//! retrying; the job keeps running server-side and a fresh `watch` resumes
//! observation.
//!
//! Estimates are timed from the job's `created_at`, so re-attaching to a job
//! that is already part-way through credits earlier progress to the time it
//! actually took. The job's age is read once from the wall clock on the first
//! poll; later polls add the monotonic time since then.

use crate::api::JobApi;
use crate::error::ClientError;
use crate::progress::{Eta, EtaTuning, PollSchedule, ProgressEstimator};
use chrono::{DateTime, Utc};
use common::jobs::JobStatus;
use common::model::analysis::AnalysisSnapshot;
use log::debug;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// What a successful poll looked like.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub snapshot: AnalysisSnapshot,
    /// Processed count clamped to the results actually present, so partial
    /// result lists never show more progress than they hold.
    pub visible_processed: usize,
    pub percent: f64,
    pub eta: Option<Eta>,
}

#[derive(Debug, Clone)]
pub enum PollOutcome {
    Completed(AnalysisSnapshot),
    Failed(AnalysisSnapshot),
    Stopped(AnalysisSnapshot),
    /// The watcher was cancelled; nothing is known about the job's fate.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("status poll failed: {0}")]
    TransientPoll(#[source] ClientError),

    #[error("analysis still running after {attempts} polls")]
    TimedOut { attempts: u32 },
}

/// Polls `session_id` until it reaches a terminal status, `cancel` fires,
/// a poll fails, or the schedule's attempt limit is hit. `updates` is called
/// after every successful poll.
pub async fn watch<A, F>(
    api: &A,
    session_id: &str,
    schedule: &PollSchedule,
    tuning: EtaTuning,
    cancel: &CancellationToken,
    mut updates: F,
) -> Result<PollOutcome, WatchError>
where
    A: JobApi + ?Sized,
    F: FnMut(ProgressUpdate),
{
    let mut estimator = ProgressEstimator::new(tuning);
    // (job age at the first poll, when that poll returned)
    let mut origin: Option<(Duration, Instant)> = None;

    for attempt in 1..=schedule.max_attempts {
        let snapshot = tokio::select! {
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            polled = api.status(session_id) => polled.map_err(WatchError::TransientPoll)?,
        };

        let terminal = snapshot.status.is_terminal();
        let (age_at_first_poll, first_poll) = *origin
            .get_or_insert_with(|| (job_age(snapshot.created_at, Utc::now()), Instant::now()));
        let eta = estimator.observe(
            age_at_first_poll + first_poll.elapsed(),
            snapshot.paragraphs_processed,
            snapshot.total_paragraphs,
        );
        debug!(
            "Poll {} of {}: {} {}/{}",
            attempt,
            session_id,
            snapshot.status,
            snapshot.paragraphs_processed,
            snapshot.total_paragraphs
        );
        updates(ProgressUpdate {
            visible_processed: snapshot
                .paragraphs_processed
                .min(snapshot.paragraphs.len()),
            percent: snapshot.progress_percentage,
            eta: if terminal { None } else { eta },
            snapshot: snapshot.clone(),
        });

        match snapshot.status {
            JobStatus::Completed => return Ok(PollOutcome::Completed(snapshot)),
            JobStatus::Failed => return Ok(PollOutcome::Failed(snapshot)),
            JobStatus::Stopped => return Ok(PollOutcome::Stopped(snapshot)),
            JobStatus::Queued | JobStatus::Processing => {}
        }

        if attempt == schedule.max_attempts {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            _ = sleep(schedule.delay_after(attempt)) => {}
        }
    }

    Err(WatchError::TimedOut {
        attempts: schedule.max_attempts,
    })
}

/// Time since `created_at`. Server clocks ahead of ours count as zero.
fn job_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - created_at).to_std().unwrap_or_default()
}
