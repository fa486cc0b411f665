//! # Analysis Submission Service
//!
//! Provides `POST /api/compliance/analyze`, which accepts a document and starts
//! a background analysis job.
//!
//! ## Workflow:
//!
//! 1.  **Validation**: the trimmed text must be between `min_document_chars` and
//!     `max_document_chars` characters, and the rule set must exist and be active.
//!
//! 2.  **Rule catalog**: the rules in force on `effective_date` are loaded once,
//!     so later edits to the rule set do not affect a running job.
//!
//! 3.  **Cache**: unless `force_new` is set, an identical earlier submission
//!     (same text, rule set and date) whose job is still known is returned as is.
//!
//! 4.  **Scheduling**: a new job is registered as `queued` and handed to the
//!     `AnalysisWorker`. The `session_id` is returned immediately for polling.

use crate::caller::Caller;
use crate::config::Config;
use crate::db::Db;
use crate::error::ApiError;
use crate::job_controller::cache::document_hash;
use crate::job_controller::job::{AnalysisJob, NewJob};
use crate::job_controller::state::JobsState;
use crate::worker::{AnalysisWorker, WorkOrder};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::jobs::JobStatus;
use common::requests::{AnalyzeDocumentRequest, AnalyzeDocumentResponse};
use log::info;
use uuid::Uuid;

pub(crate) async fn process(
    jobs: web::Data<JobsState>,
    db: web::Data<Db>,
    worker: web::Data<AnalysisWorker>,
    config: web::Data<Config>,
    caller: Caller,
    payload: web::Json<AnalyzeDocumentRequest>,
) -> Result<HttpResponse, ApiError> {
    let response =
        schedule_analysis(&jobs, &db, &worker, &config, caller, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

fn validate_document(text: &str, config: &Config) -> Result<(), ApiError> {
    let chars = text.trim().chars().count();
    if chars < config.min_document_chars {
        return Err(ApiError::Validation(format!(
            "Document text must be at least {} characters",
            config.min_document_chars
        )));
    }
    if chars > config.max_document_chars {
        return Err(ApiError::Validation(format!(
            "Document text must be at most {} characters",
            config.max_document_chars
        )));
    }
    Ok(())
}

async fn schedule_analysis(
    jobs: &JobsState,
    db: &Db,
    worker: &AnalysisWorker,
    config: &Config,
    caller: Caller,
    req: AnalyzeDocumentRequest,
) -> Result<AnalyzeDocumentResponse, ApiError> {
    validate_document(&req.document_text, config)?;

    let rule_set = db
        .get_rule_set(req.rule_set_id)?
        .filter(|set| set.is_active)
        .ok_or_else(|| {
            ApiError::Validation(format!("Rule set {} not found", req.rule_set_id))
        })?;
    let catalog = db.rule_catalog(rule_set.id, req.effective_date)?;

    let hash = document_hash(&req.document_text, rule_set.id, req.effective_date);
    if !req.force_new {
        if let Some(session_id) = jobs.cache.lookup(&hash, Utc::now()).await {
            if jobs.contains(&session_id).await {
                info!("Cache hit for document {}: reusing {}", hash, session_id);
                return Ok(AnalyzeDocumentResponse {
                    session_id,
                    status: JobStatus::Completed,
                    message: "Using cached analysis results".to_string(),
                });
            }
            jobs.cache.invalidate(&hash).await;
        }
    }

    let job_id = Uuid::new_v4().to_string();
    let job = AnalysisJob::new(
        job_id.clone(),
        NewJob {
            owner: caller.0,
            document_text: req.document_text,
            document_hash: hash,
            rule_set_id: rule_set.id,
            rule_set_name: rule_set.name,
            effective_date: req.effective_date,
        },
    );
    let order = WorkOrder {
        job_id: job_id.clone(),
        document_text: job.document_text.clone(),
        catalog,
        cancel: job.cancel.clone(),
    };
    jobs.insert(job).await;
    worker.spawn(jobs.tx.clone(), order);
    info!("Job {} queued for rule set {}", job_id, rule_set.id);

    Ok(AnalyzeDocumentResponse {
        session_id: job_id,
        status: JobStatus::Queued,
        message: "Analysis started".to_string(),
    })
}
