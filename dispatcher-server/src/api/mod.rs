//! API Module
//!
//! HTTP API layer for the dispatcher.
//! Each submodule handles endpoints for a specific domain.

pub mod dispatch;
pub mod error;
pub mod health;
pub mod identity;
pub mod run;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::connector::Dispatcher;
use crate::repository::RunStore;
use crate::service::admission::AdmissionLimiter;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RunStore>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub limiter: Arc<AdmissionLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RunStore>,
        dispatcher: Arc<dyn Dispatcher>,
        config: Config,
    ) -> Self {
        let limiter = AdmissionLimiter::new(config.rate_limit_per_second, config.rate_limit_burst);
        Self {
            store,
            dispatcher,
            limiter: Arc::new(limiter),
            config: Arc::new(config),
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Public read endpoints
        .route(run::RUNS_PATH, get(run::list_runs))
        .route(run::RUN_HOSTS_PATH, get(run::list_run_hosts))
        // Internal endpoints
        .route("/internal/dispatch", post(dispatch::dispatch_runs))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
