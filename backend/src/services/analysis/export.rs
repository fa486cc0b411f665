//! # Report Export Service
//!
//! Provides `GET /api/compliance/results/{session_id}/export/{format}`.
//!
//! Unknown sessions answer `404` whatever the format. Only `completed`
//! analyses can be exported; any other status answers `409`.
//! `json` and `csv` are rendered in place. `pdf` goes through `genpdf` on the
//! blocking pool because font loading and layout are CPU and file bound.

use crate::config::Config;
use crate::error::ApiError;
use crate::job_controller::state::JobsState;
use crate::services::analysis::pdf;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use common::jobs::JobStatus;
use common::model::analysis::{ParagraphResult, RiskSummary};
use common::requests::ExportFormat;
use serde::Serialize;

/// A completed analysis, flattened for rendering.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Report {
    pub session_id: String,
    pub title: String,
    pub rule_set_name: String,
    pub effective_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
    pub risk_summary: RiskSummary,
    pub paragraphs: Vec<ParagraphResult>,
}

pub(crate) async fn process(
    path: web::Path<(String, String)>,
    state: web::Data<JobsState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let (session_id, format) = path.into_inner();
    let report = load_report(&state, &session_id).await?;
    let format: ExportFormat = format.parse().map_err(ApiError::Validation)?;

    let body = match format {
        ExportFormat::Json => render_json(&report)?,
        ExportFormat::Csv => render_csv(&report)?,
        ExportFormat::Pdf => {
            let fonts_dir = config.fonts_dir.clone();
            web::block(move || pdf::render_report(&report, &fonts_dir))
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))??
        }
    };

    let filename = format!(
        "compliance_analysis_{}_{}.{}",
        session_id.chars().take(8).collect::<String>(),
        Utc::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    );
    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", filename),
        ))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(body))
}

async fn load_report(state: &JobsState, session_id: &str) -> Result<Report, ApiError> {
    let jobs = state.jobs.read().await;
    let job = jobs
        .get(session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Analysis {} not found", session_id)))?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::InvalidState(format!(
            "Analysis is {}; only completed analyses can be exported",
            job.status
        )));
    }
    Ok(Report {
        session_id: job.id.clone(),
        title: job.display_title(),
        rule_set_name: job.rule_set_name.clone(),
        effective_date: job.effective_date,
        completed_at: job.completed_at,
        generated_at: Utc::now(),
        risk_summary: RiskSummary::from_paragraphs(&job.paragraphs),
        paragraphs: job.paragraphs.clone(),
    })
}

fn render_json(report: &Report) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec_pretty(report).map_err(|e| ApiError::Export(e.to_string()))
}

/// One row per issue; paragraphs without findings get a single row with
/// empty issue columns. `analysis_error` is set for paragraphs the analyzer
/// gave up on.
fn render_csv(report: &Report) -> Result<Vec<u8>, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let export_err = |e: csv::Error| ApiError::Export(e.to_string());

    writer
        .write_record([
            "paragraph_index",
            "paragraph",
            "rule_number",
            "rule_title",
            "severity",
            "issue_type",
            "description",
            "current_text",
            "required_text",
            "suggested_fix",
            "analysis_error",
        ])
        .map_err(export_err)?;

    for paragraph in &report.paragraphs {
        let index = paragraph.index.to_string();
        let analysis_error = paragraph.error.as_deref().unwrap_or("");
        if paragraph.issues.is_empty() {
            writer
                .write_record([
                    index.as_str(),
                    paragraph.content.as_str(),
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    analysis_error,
                ])
                .map_err(export_err)?;
            continue;
        }
        for issue in &paragraph.issues {
            writer
                .write_record([
                    index.as_str(),
                    paragraph.content.as_str(),
                    issue.rule_number.as_str(),
                    issue.rule_title.as_str(),
                    issue.severity.as_str(),
                    issue.issue_type.as_str(),
                    issue.description.as_str(),
                    issue.current_text.as_deref().unwrap_or(""),
                    issue.required_text.as_deref().unwrap_or(""),
                    issue.suggested_fix.as_deref().unwrap_or(""),
                    analysis_error,
                ])
                .map_err(export_err)?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Export(e.to_string()))
}
