//! The caller's analysis history. Every route here is scoped to the
//! `X-User-Id` of the request.

use crate::caller::Caller;
use crate::error::ApiError;
use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse};
use common::requests::{HistoryQuery, MessageResponse, UpdateTitleRequest};

const MAX_PAGE: usize = 100;
const MAX_TITLE_CHARS: usize = 200;

pub(crate) async fn list(
    state: web::Data<JobsState>,
    caller: Caller,
    query: web::Query<HistoryQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let page = state
        .history(&caller.0, query.limit.min(MAX_PAGE), query.offset)
        .await;
    HttpResponse::Ok().json(page)
}

pub(crate) async fn remove(
    session_id: web::Path<String>,
    state: web::Data<JobsState>,
    caller: Caller,
) -> Result<HttpResponse, ApiError> {
    let session_id = session_id.into_inner();
    if !state.remove(&session_id, &caller.0).await {
        return Err(ApiError::NotFound(format!(
            "Analysis {} not found",
            session_id
        )));
    }
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Analysis deleted".to_string(),
    }))
}

pub(crate) async fn rename(
    session_id: web::Path<String>,
    state: web::Data<JobsState>,
    caller: Caller,
    payload: web::Json<UpdateTitleRequest>,
) -> Result<HttpResponse, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    let session_id = session_id.into_inner();
    if !state.rename(&session_id, &caller.0, title).await {
        return Err(ApiError::NotFound(format!(
            "Analysis {} not found",
            session_id
        )));
    }
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Title updated".to_string(),
    }))
}
