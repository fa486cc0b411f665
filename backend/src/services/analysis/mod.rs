//! # Compliance Analysis Service Module
//!
//! Routes for the analysis job lifecycle under `/api/compliance`.
//!
//! ## Sub-modules:
//! - `submit`: validates a document and schedules its analysis job.
//! - `get_status`: serves the current snapshot of a job, partial results included.
//! - `stop`: cooperative cancellation of a running job.
//! - `history`: the caller's past analyses (list, rename, delete).
//! - `export`: downloadable reports of completed analyses.

mod export;
mod get_status;
mod history;
mod pdf;
mod stop;
mod submit;

use actix_web::web::{delete, get, patch, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/compliance";

/// Configures and returns the Actix `Scope` for all analysis routes.
///
/// # Registered Routes:
///
/// *   **`POST /analyze`**: starts (or reuses from cache) an analysis job and
///     returns its `session_id`.
/// *   **`GET /results/{session_id}`**: the job's `AnalysisSnapshot`.
/// *   **`POST /analysis/{session_id}/stop`**: stops a queued or processing job.
/// *   **`GET /results/{session_id}/export/{format}`**: `json`, `csv` or `pdf`
///     report of a completed job.
/// *   **`GET /history`**, **`DELETE /history/{session_id}`**,
///     **`PATCH /history/{session_id}`**: the caller's analyses.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/analyze", post().to(submit::process))
        .route("/results/{session_id}", get().to(get_status::process))
        .route(
            "/results/{session_id}/export/{format}",
            get().to(export::process),
        )
        .route("/analysis/{session_id}/stop", post().to(stop::process))
        .route("/history", get().to(history::list))
        .route("/history/{session_id}", delete().to(history::remove))
        .route("/history/{session_id}", patch().to(history::rename))
}

#[cfg(test)]
mod tests;
