use std::sync::Arc;

use tracing::info;
use weather_advisor_mcp::{
    build_app, config::Config, logging, upstream::HttpForwarder, AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let forwarder = Arc::new(HttpForwarder::new(config.api_base.clone())?);
    let bind_socket = config.bind_socket()?;
    let state = AppState::new(&config, forwarder);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        mcp_path = %config.mcp_path,
        api_base = %config.api_base,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
