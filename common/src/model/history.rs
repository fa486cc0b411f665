use crate::jobs::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a user's analysis history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub session_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub title: String,
    pub rule_set_name: String,
    pub total_paragraphs: usize,
    pub issues_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub analyses: Vec<HistoryEntry>,
    /// Entries the user owns, regardless of paging.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}
