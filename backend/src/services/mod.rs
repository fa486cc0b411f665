pub mod admin;
pub mod analysis;
pub mod health;
pub mod rule_sets;

use actix_web::web;

/// Registers every API scope on the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analysis::configure_routes())
        .service(rule_sets::configure_routes())
        .service(admin::configure_routes())
        .service(health::configure_routes());
}
