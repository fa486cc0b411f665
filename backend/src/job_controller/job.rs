use chrono::{DateTime, NaiveDate, Utc};
use common::jobs::JobStatus;
use common::model::analysis::{progress_percentage, AnalysisSnapshot, ParagraphResult};
use common::model::history::HistoryEntry;
use log::warn;
use tokio_util::sync::CancellationToken;

/// Characters of the document used as a title when none was given.
const TITLE_PREVIEW_CHARS: usize = 50;

/// Server-side record of one analysis job.
///
/// Only the job updater writes progress fields; handlers read snapshots and
/// may flip the status to `stopped`.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub id: String,
    pub owner: String,
    pub title: Option<String>,
    pub status: JobStatus,
    pub document_text: String,
    /// Cache key of (text, rule set, effective date).
    pub document_hash: String,
    pub rule_set_id: i64,
    pub rule_set_name: String,
    pub effective_date: Option<NaiveDate>,
    pub total_paragraphs: usize,
    pub paragraphs_processed: usize,
    pub paragraphs: Vec<ParagraphResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Worker-side reason for a `failed` job. Never sent to clients.
    pub failure: Option<String>,
    /// Tripped by `stop`; the worker checks it between batches.
    pub cancel: CancellationToken,
}

/// Inputs fixed at submission time.
pub struct NewJob {
    pub owner: String,
    pub document_text: String,
    pub document_hash: String,
    pub rule_set_id: i64,
    pub rule_set_name: String,
    pub effective_date: Option<NaiveDate>,
}

impl AnalysisJob {
    pub fn new(id: String, new: NewJob) -> Self {
        let now = Utc::now();
        AnalysisJob {
            id,
            owner: new.owner,
            title: None,
            status: JobStatus::Queued,
            document_text: new.document_text,
            document_hash: new.document_hash,
            rule_set_id: new.rule_set_id,
            rule_set_name: new.rule_set_name,
            effective_date: new.effective_date,
            total_paragraphs: 0,
            paragraphs_processed: 0,
            paragraphs: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            failure: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Moves to `next` if the state machine allows it. Terminal targets also
    /// stamp `completed_at`.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            warn!(
                "Job {}: refusing transition {} -> {}",
                self.id, self.status, next
            );
            return false;
        }
        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        true
    }

    /// Appends results in index order, dropping duplicates, out-of-order
    /// retries and indices past the known total. The processed count always
    /// equals the number of results held.
    pub fn record_paragraphs(&mut self, batch: Vec<ParagraphResult>) -> usize {
        let mut accepted = 0;
        for result in batch {
            let in_order = self
                .paragraphs
                .last()
                .is_none_or(|last| result.index > last.index);
            let in_range = self.total_paragraphs == 0 || result.index < self.total_paragraphs;
            if in_order && in_range {
                self.paragraphs.push(result);
                accepted += 1;
            }
        }
        self.paragraphs_processed = self.paragraphs.len();
        self.updated_at = Utc::now();
        accepted
    }

    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        let trimmed = self.document_text.trim();
        let preview: String = trimmed.chars().take(TITLE_PREVIEW_CHARS).collect();
        if trimmed.chars().count() > TITLE_PREVIEW_CHARS {
            format!("{}...", preview.trim_end())
        } else {
            preview
        }
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            session_id: self.id.clone(),
            status: self.status,
            title: self.title.clone(),
            rule_set_id: self.rule_set_id,
            effective_date: self.effective_date,
            total_paragraphs: self.total_paragraphs,
            paragraphs_processed: self.paragraphs_processed,
            progress_percentage: progress_percentage(
                self.paragraphs_processed,
                self.total_paragraphs,
            ),
            paragraphs: self.paragraphs.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        }
    }

    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            session_id: self.id.clone(),
            status: self.status,
            created_at: self.created_at,
            completed_at: self.completed_at,
            title: self.display_title(),
            rule_set_name: self.rule_set_name.clone(),
            total_paragraphs: self.total_paragraphs,
            issues_count: self.paragraphs.iter().map(|p| p.issues.len()).sum(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_job(id: &str, owner: &str, text: &str) -> AnalysisJob {
    AnalysisJob::new(
        id.to_string(),
        NewJob {
            owner: owner.to_string(),
            document_text: text.to_string(),
            document_hash: format!("hash-{id}"),
            rule_set_id: 1,
            rule_set_name: "FINRA".to_string(),
            effective_date: None,
        },
    )
}
