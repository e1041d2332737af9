//! Scoring API: field validation, request schemas, authentication and
//! dispatch of the `online_score` and `clients_interests` methods.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod fields;
pub mod handlers;
pub mod metrics_defs;
pub mod requests;
pub mod schema;
pub mod scoring;
pub mod service;

use dispatch::Dispatcher;
use scoring::CachedScoring;
use service::ScoringService;
use shared::http::run_http_service;
use shared::metrics_defs::describe_all;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] store::BackendError),
}

pub async fn run(config: config::Config) -> Result<(), ServiceError> {
    describe_all(metrics_defs::ALL_METRICS);
    describe_all(store::metrics_defs::ALL_METRICS);

    let store = store::from_config(&config.store)?;
    let dispatcher = Dispatcher::new(config.auth.clone(), Arc::new(CachedScoring));
    let service = ScoringService::new(dispatcher, Arc::new(store));

    run_http_service(&config.listener.host, config.listener.port, service).await
}
