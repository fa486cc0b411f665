//! Cache administration under `/api/admin/cache`.

use crate::error::ApiError;
use crate::job_controller::state::JobsState;
use actix_web::web::{self, get, post, scope};
use actix_web::{HttpResponse, Scope};
use chrono::Utc;
use common::requests::{CacheConfig, MessageResponse};
use log::info;

const API_PATH: &str = "/api/admin/cache";
const MAX_TTL_HOURS: u32 = 24 * 30;

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/status", get().to(status))
        .route("/configure", post().to(configure))
        .route("/clear", post().to(clear))
}

async fn status(state: web::Data<JobsState>) -> HttpResponse {
    HttpResponse::Ok().json(state.cache.status(Utc::now()).await)
}

async fn configure(
    state: web::Data<JobsState>,
    payload: web::Json<CacheConfig>,
) -> Result<HttpResponse, ApiError> {
    let config = payload.into_inner();
    if !(1..=MAX_TTL_HOURS).contains(&config.ttl_hours) {
        return Err(ApiError::Validation(format!(
            "ttl_hours must be between 1 and {}",
            MAX_TTL_HOURS
        )));
    }
    state.cache.configure(&config).await;
    info!(
        "Analysis cache {} (ttl {}h)",
        if config.enabled { "enabled" } else { "disabled" },
        config.ttl_hours
    );
    Ok(HttpResponse::Ok().json(state.cache.status(Utc::now()).await))
}

async fn clear(state: web::Data<JobsState>) -> HttpResponse {
    let removed = state.cache.clear().await;
    info!("Cleared {} cached analyses", removed);
    HttpResponse::Ok().json(MessageResponse {
        message: format!("Cleared {} cache entries", removed),
    })
}

#[cfg(test)]
mod tests {
    use crate::services::testing::TestContext;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use chrono::Utc;
    use common::requests::{CacheConfig, CacheStatus};

    #[actix_web::test]
    async fn configure_and_clear() {
        let ctx = TestContext::new();
        ctx.jobs.cache.store("hash", "session", Utc::now()).await;
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::get()
            .uri("/api/admin/cache/status")
            .to_request();
        let status: CacheStatus = test::call_and_read_body_json(&app, req).await;
        assert!(status.cache_enabled);
        assert_eq!(status.valid_entries, 1);

        let req = test::TestRequest::post()
            .uri("/api/admin/cache/configure")
            .set_json(CacheConfig {
                enabled: false,
                ttl_hours: 0,
            })
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::post()
            .uri("/api/admin/cache/configure")
            .set_json(CacheConfig {
                enabled: false,
                ttl_hours: 48,
            })
            .to_request();
        let status: CacheStatus = test::call_and_read_body_json(&app, req).await;
        assert!(!status.cache_enabled);
        assert_eq!(status.ttl_hours, 48);

        let req = test::TestRequest::post()
            .uri("/api/admin/cache/clear")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(ctx.jobs.cache.status(Utc::now()).await.total_entries, 0);
    }
}
