use crate::jobs::JobStatus;
use crate::model::rule_set::{CatalogEntry, Rule};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Request payload for starting a document analysis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzeDocumentRequest {
    pub document_text: String,
    pub rule_set_id: i64,
    /// Only rules in force on this date are considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    /// Skip the result cache and always start a fresh job.
    #[serde(default)]
    pub force_new: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzeDocumentResponse {
    pub session_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Generic acknowledgement body for stop/delete/rename.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_history_limit() -> usize {
    20
}

impl Default for HistoryQuery {
    fn default() -> Self {
        HistoryQuery {
            limit: default_history_limit(),
            offset: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateRuleSetRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddRulesRequest {
    pub rules: Vec<Rule>,
}

/// Partial update of one rule; absent fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateRuleRequest {
    #[serde(default)]
    pub rule_title: Option<String>,
    #[serde(default)]
    pub rule_text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleCatalog {
    pub catalog: Vec<CatalogEntry>,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

fn default_ttl_hours() -> u32 {
    24
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheStatus {
    pub cache_enabled: bool,
    pub ttl_hours: u32,
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

/// Artifact formats offered by the export endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!("unsupported export format '{other}'")),
        }
    }
}
