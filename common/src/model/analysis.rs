use crate::jobs::JobStatus;
use crate::model::issue::{Issue, Severity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Analysis outcome for one segment of the submitted document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParagraphResult {
    /// 0-based position among the analysed paragraphs.
    pub index: usize,
    pub content: String,
    /// Rule numbers judged relevant to this paragraph.
    pub applicable_rules: Vec<String>,
    /// Findings in the order the analyzer produced them. Empty means compliant.
    pub issues: Vec<Issue>,
    /// Set when the paragraph could not be analysed; `issues` is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParagraphResult {
    /// A paragraph the analyzer gave up on.
    pub fn failed(index: usize, content: String, reason: impl Into<String>) -> Self {
        ParagraphResult {
            index,
            content,
            applicable_rules: Vec::new(),
            issues: Vec::new(),
            error: Some(reason.into()),
        }
    }

    /// The badge severity for the paragraph, `None` when nothing was found.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|issue| issue.severity).max()
    }

    /// A paragraph is compliant when it was analysed and none of its findings
    /// need remediation.
    pub fn is_compliant(&self) -> bool {
        self.error.is_none() && self.issues.iter().all(|issue| !issue.severity.is_risk())
    }
}

/// Point-in-time view of an analysis job, as served by the status endpoint.
///
/// Partial results are visible: `paragraphs` may be non-empty while the job
/// is still `processing`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub session_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub title: Option<String>,
    pub rule_set_id: i64,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    /// Zero until segmentation has finished.
    pub total_paragraphs: usize,
    pub paragraphs_processed: usize,
    pub progress_percentage: f64,
    pub paragraphs: Vec<ParagraphResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisSnapshot {
    /// Number of issues across all received paragraphs, confirmations included.
    pub fn issues_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.issues.len()).sum()
    }

    pub fn risk_summary(&self) -> RiskSummary {
        RiskSummary::from_paragraphs(&self.paragraphs)
    }
}

/// Percentage of work done, rounded to one decimal place.
pub fn progress_percentage(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = processed as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Aggregate counts used by report headers and the CLI summary line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub success: usize,
    pub compliant_paragraphs: usize,
    #[serde(default)]
    pub failed_paragraphs: usize,
}

impl RiskSummary {
    pub fn from_paragraphs(paragraphs: &[ParagraphResult]) -> Self {
        let mut summary = RiskSummary::default();
        for paragraph in paragraphs {
            if paragraph.error.is_some() {
                summary.failed_paragraphs += 1;
            } else if paragraph.is_compliant() {
                summary.compliant_paragraphs += 1;
            }
            for issue in &paragraph.issues {
                match issue.severity {
                    Severity::Critical => summary.critical += 1,
                    Severity::High => summary.high += 1,
                    Severity::Medium => summary.medium += 1,
                    Severity::Low => summary.low += 1,
                    Severity::Success => summary.success += 1,
                }
            }
        }
        summary
    }

    /// Findings that need remediation.
    pub fn risks(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}
