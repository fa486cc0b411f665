mod caller;
mod config;
mod db;
mod error;
mod job_controller;
mod services;
mod worker;

use crate::config::Config;
use crate::db::Db;
use crate::job_controller::cache::AnalysisCache;
use crate::job_controller::state::{start_job_updater, start_retention_sweeper, JobsState};
use crate::worker::analyzer::KeywordAnalyzer;
use crate::worker::{AnalysisWorker, RetryPolicy};
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::from_env();

    let db = Db::open(&config.database_path).map_err(io::Error::other)?;
    db.migrate().map_err(io::Error::other)?;

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new(AnalysisCache::new(
        config.cache_enabled,
        config.cache_ttl_hours,
    ));

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        start_job_updater(updater_state, rx).await;
    });

    if config.job_retention_hours > 0 {
        let retention = chrono::Duration::hours(i64::from(config.job_retention_hours));
        tokio::spawn(start_retention_sweeper(jobs_state.clone(), retention));
    }

    let worker = AnalysisWorker::new(
        Arc::new(KeywordAnalyzer),
        config.batch_size,
        config.min_paragraph_chars,
    )
    .with_retry(RetryPolicy {
        max_attempts: config.analyzer_attempts,
        backoff: Duration::from_millis(config.retry_backoff_ms),
        batch_timeout: Duration::from_secs(config.batch_timeout_secs),
    });

    let bind = (config.host.clone(), config.port);
    info!(
        "Server running at http://{}:{} (rule sets in {})",
        bind.0, bind.1, config.database_path
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(config.json_limit))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(worker.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(services::configure)
    })
    .bind(bind)?
    .run()
    .await
}
