use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod upstream;

use config::Config;
use upstream::WeatherUpstream;

#[derive(Clone)]
pub struct AppState {
    pub api_base: Arc<str>,
    pub mcp_path: Arc<str>,
    pub upstream: Arc<dyn WeatherUpstream>,
}

impl AppState {
    pub fn new(config: &Config, upstream: Arc<dyn WeatherUpstream>) -> Self {
        Self {
            api_base: Arc::<str>::from(config.api_base.as_str()),
            mcp_path: Arc::<str>::from(config.mcp_path.as_str()),
            upstream,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::root))
        .route("/ping", get(http::handlers::ping))
        .route(&state.mcp_path, post(http::handlers::mcp_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
