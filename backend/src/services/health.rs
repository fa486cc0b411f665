use actix_web::web::{get, scope};
use actix_web::{HttpResponse, Scope};
use serde_json::json;

pub fn configure_routes() -> Scope {
    scope("/api/health").route("", get().to(process))
}

async fn process() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
