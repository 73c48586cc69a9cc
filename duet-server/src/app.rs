use crate::config::ServerConfig;
use crate::hub::HubStats;
use crate::signaling::{SignalingService, ws_handler};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// HTTP surface: the signaling socket plus a health probe. CORS is wide
/// open since the server keeps nothing sensitive.
pub fn router(service: SignalingService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(service)
}

async fn health(State(service): State<SignalingService>) -> Result<Json<HubStats>, StatusCode> {
    service
        .stats()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

/// Binds the configured address and serves until the listener fails.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.bind_address()?;
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, &config).await
}

/// Serves on an already bound listener (tests bind port 0).
pub async fn serve_on(listener: TcpListener, config: &ServerConfig) -> anyhow::Result<()> {
    let service = SignalingService::spawn(config);
    let app = router(service);

    info!("Signaling server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
