//! `POST /api/compliance/analysis/{session_id}/stop`.
//!
//! Stopping is cooperative: the job is marked `stopped` at once and its worker
//! quits before the next batch. Paragraphs already analysed stay available.
//! Stopping a finished job answers `200` and changes nothing. Only the user
//! who submitted a job may stop it; anyone else gets `404`.

use crate::caller::Caller;
use crate::error::ApiError;
use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse};
use common::requests::MessageResponse;

pub(crate) async fn process(
    session_id: web::Path<String>,
    state: web::Data<JobsState>,
    caller: Caller,
) -> Result<HttpResponse, ApiError> {
    let session_id = session_id.into_inner();
    let previous = state
        .request_stop(&session_id, &caller.0)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Analysis {} not found", session_id)))?;

    let message = if previous.is_terminal() {
        format!("Analysis already {}", previous)
    } else {
        "Analysis stopped".to_string()
    };
    Ok(HttpResponse::Ok().json(MessageResponse { message }))
}
