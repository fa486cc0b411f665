//! # Analysis Worker
//!
//! Runs one analysis job outside the request/response cycle.
//!
//! ## Workflow:
//!
//! 1.  **Scheduling**: `AnalysisWorker::spawn` starts a Tokio task for the job and
//!     returns at once. The task hands the CPU-bound work to
//!     `tokio::task::spawn_blocking` so the server's async runtime stays free.
//!
//! 2.  **Segmentation**: `analyse_blocking` splits the document with
//!     `segment::split_into_paragraphs` and reports `JobEvent::Started` with the
//!     paragraph total.
//!
//! 3.  **Batches**: paragraphs are analysed `batch_size` at a time on the rayon
//!     pool, keeping document order. Each finished batch is sent as one
//!     `JobEvent::Paragraphs`, so progress moves in bursts.
//!
//! 4.  **Retries**: a paragraph whose analysis fails with a transient error is
//!     retried with a growing pause, up to `RetryPolicy::max_attempts` tries.
//!     Paragraphs that still fail, or that have not started when the batch's
//!     time limit runs out, are recorded with an `error` instead of findings.
//!
//! 5.  **Stop checkpoint**: the job's cancellation token is checked before every
//!     batch. A stopped job ends quietly; whatever was already sent stays recorded.
//!
//! 6.  **Outcome**: the Tokio task turns the blocking result into
//!     `JobEvent::Completed` or `JobEvent::Failed` for the job updater. A job
//!     completes as long as at least one paragraph was analysed.

pub mod analyzer;
pub mod segment;

use crate::job_controller::state::{JobEvent, JobUpdate};
use crate::worker::analyzer::{AnalyzerError, Findings, ParagraphAnalyzer};
use common::model::analysis::ParagraphResult;
use common::model::rule_set::Rule;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("none of the {failed} paragraphs could be analysed")]
    NothingAnalysed { failed: usize },
    #[error("job updater channel closed")]
    ChannelClosed,
}

/// Why a single paragraph ended up without findings.
#[derive(Debug, Error)]
enum ParagraphError {
    #[error("batch time limit reached before analysis started")]
    TimedOut,
    #[error("gave up after {attempts} attempt(s): {source}")]
    Analyzer {
        attempts: u32,
        #[source]
        source: AnalyzerError,
    },
}

impl ParagraphError {
    /// Reason stored on the paragraph and shown to clients.
    fn public_reason(&self) -> &'static str {
        match self {
            ParagraphError::TimedOut => "Analysis timed out",
            ParagraphError::Analyzer { .. } => "Analysis failed",
        }
    }
}

/// Bounds on how hard the worker tries before giving up on a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Tries per paragraph, the first one included.
    pub max_attempts: u32,
    /// Pause before retry `n` is `backoff * n`.
    pub backoff: Duration,
    /// Paragraphs not started this long after their batch began are failed.
    pub batch_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_secs(3),
            batch_timeout: Duration::from_secs(90),
        }
    }
}

/// Everything a worker needs to process one job.
pub struct WorkOrder {
    pub job_id: String,
    pub document_text: String,
    /// Rules in force for the job's effective date.
    pub catalog: Vec<Rule>,
    pub cancel: CancellationToken,
}

/// How a blocking run ended when no error occurred.
#[derive(Debug, PartialEq, Eq)]
enum RunEnd {
    Finished { failed: usize },
    Stopped { processed: usize },
}

#[derive(Clone)]
pub struct AnalysisWorker {
    analyzer: Arc<dyn ParagraphAnalyzer>,
    batch_size: usize,
    min_paragraph_chars: usize,
    retry: RetryPolicy,
}

impl AnalysisWorker {
    pub fn new(
        analyzer: Arc<dyn ParagraphAnalyzer>,
        batch_size: usize,
        min_paragraph_chars: usize,
    ) -> Self {
        AnalysisWorker {
            analyzer,
            batch_size: batch_size.max(1),
            min_paragraph_chars,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };
        self
    }

    /// Schedules `order` in the background. Progress and the final outcome
    /// are reported through `tx`.
    pub fn spawn(&self, tx: mpsc::Sender<JobUpdate>, order: WorkOrder) {
        let worker = self.clone();
        tokio::spawn(async move {
            let job_id = order.job_id.clone();
            let blocking_tx = tx.clone();
            let handle =
                tokio::task::spawn_blocking(move || worker.analyse_blocking(&blocking_tx, order));

            let event = match handle.await {
                Ok(Ok(RunEnd::Finished { failed })) => {
                    if failed > 0 {
                        warn!("Job {} finished with {} failed paragraphs", job_id, failed);
                    }
                    Some(JobEvent::Completed)
                }
                Ok(Ok(RunEnd::Stopped { processed })) => {
                    info!("Job {} halted after {} paragraphs", job_id, processed);
                    None
                }
                Ok(Err(WorkerError::ChannelClosed)) => {
                    error!("Job {}: updater gone, abandoning work", job_id);
                    None
                }
                Ok(Err(e)) => Some(JobEvent::Failed(e.to_string())),
                Err(e) => Some(JobEvent::Failed(format!("Task join error: {}", e))),
            };

            if let Some(event) = event {
                let _ = tx.send(JobUpdate { job_id, event }).await;
            }
        });
    }

    /// The synchronous part of a job, run via `spawn_blocking`.
    fn analyse_blocking(
        &self,
        tx: &mpsc::Sender<JobUpdate>,
        order: WorkOrder,
    ) -> Result<RunEnd, WorkerError> {
        let send = |event: JobEvent| {
            tx.blocking_send(JobUpdate {
                job_id: order.job_id.clone(),
                event,
            })
            .map_err(|_| WorkerError::ChannelClosed)
        };

        let paragraphs =
            segment::split_into_paragraphs(&order.document_text, self.min_paragraph_chars);
        let total = paragraphs.len();
        info!(
            "Job {}: analysing {} paragraphs against {} rules",
            order.job_id,
            total,
            order.catalog.len()
        );
        send(JobEvent::Started {
            total_paragraphs: total,
        })?;

        let mut failed = 0;
        for (batch_no, batch) in paragraphs.chunks(self.batch_size).enumerate() {
            if order.cancel.is_cancelled() {
                return Ok(RunEnd::Stopped {
                    processed: batch_no * self.batch_size,
                });
            }
            let offset = batch_no * self.batch_size;
            let results = self.analyse_batch(&order.job_id, offset, batch, &order.catalog);
            failed += results.iter().filter(|r| r.error.is_some()).count();
            debug!(
                "Job {}: batch {} done ({}/{})",
                order.job_id,
                batch_no,
                offset + results.len(),
                total
            );
            send(JobEvent::Paragraphs(results))?;
        }

        if total > 0 && failed == total {
            return Err(WorkerError::NothingAnalysed { failed });
        }
        Ok(RunEnd::Finished { failed })
    }

    fn analyse_batch(
        &self,
        job_id: &str,
        offset: usize,
        batch: &[String],
        catalog: &[Rule],
    ) -> Vec<ParagraphResult> {
        let deadline = Instant::now() + self.retry.batch_timeout;
        batch
            .par_iter()
            .enumerate()
            .map(|(i, content)| {
                let index = offset + i;
                match self.analyse_with_retry(content, catalog, deadline) {
                    Ok(findings) => ParagraphResult {
                        index,
                        content: content.clone(),
                        applicable_rules: findings.applicable_rules,
                        issues: findings.issues,
                        error: None,
                    },
                    Err(e) => {
                        error!("Job {}: paragraph {}: {}", job_id, index, e);
                        ParagraphResult::failed(index, content.clone(), e.public_reason())
                    }
                }
            })
            .collect()
    }

    fn analyse_with_retry(
        &self,
        content: &str,
        catalog: &[Rule],
        deadline: Instant,
    ) -> Result<Findings, ParagraphError> {
        let mut attempt = 1;
        loop {
            if Instant::now() >= deadline {
                return Err(ParagraphError::TimedOut);
            }
            match self.analyzer.analyze(content, catalog) {
                Ok(findings) => return Ok(findings),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let pause = self.retry.backoff * attempt;
                    warn!(
                        "Retrying paragraph (attempt {}/{}) in {:?}: {}",
                        attempt + 1,
                        self.retry.max_attempts,
                        pause,
                        e
                    );
                    std::thread::sleep(pause);
                    attempt += 1;
                }
                Err(source) => {
                    return Err(ParagraphError::Analyzer {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }
}
