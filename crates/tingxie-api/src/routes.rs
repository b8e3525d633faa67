//! Router setup with all routes and middleware.

use std::path::Path;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tingxie_core::{TingxieConfig, TingxieError};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;
use crate::ws;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let origins = [server.host.as_str(), "localhost", "127.0.0.1"]
        .iter()
        .filter_map(|host| format!("http://{}:{}", host, server.port).parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let limiter = RateLimiter::new(server.rate_limit_per_sec);
    let translate_routes = Router::new()
        .route("/translate/{word}", get(handlers::translate))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_handler))
        .merge(translate_routes);

    let public_dir = Path::new(&server.public_dir);
    if public_dir.is_dir() {
        router = router.fallback_service(ServeDir::new(public_dir));
    } else {
        warn!(dir = %public_dir.display(), "Static asset directory not found; serving API only");
    }

    router
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind to the configured address and serve until the process exits.
pub async fn start_server(config: &TingxieConfig, state: AppState) -> Result<(), TingxieError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TingxieError::Api(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Tingxie server listening on http://{}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| TingxieError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
