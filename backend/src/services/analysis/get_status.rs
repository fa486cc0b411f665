use crate::error::ApiError;
use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse};

pub(crate) async fn process(
    session_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> Result<HttpResponse, ApiError> {
    let session_id = session_id.into_inner();
    let snapshot = state
        .snapshot(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Analysis {} not found", session_id)))?;
    Ok(HttpResponse::Ok().json(snapshot))
}
