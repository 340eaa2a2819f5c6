use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use superflawed::{
    api, catalog::CardCatalog, config::ServerConfig, origin::OriginPolicy, state::AppState, ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "superflawed=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Super Flawed backend...");

    let config = ServerConfig::from_env();

    let catalog = match &config.card_deck_path {
        Some(path) => match CardCatalog::from_json_file(path) {
            Ok(catalog) => {
                tracing::info!(
                    "Loaded {} prompts and {} responses from {}",
                    catalog.prompts.len(),
                    catalog.responses.len(),
                    path.display()
                );
                catalog
            }
            Err(e) => {
                tracing::warn!("Failed to load card deck: {}. Using built-in deck.", e);
                CardCatalog::builtin()
            }
        },
        None => CardCatalog::builtin(),
    };

    let origins = Arc::new(OriginPolicy::new(config.allowed_origins.clone()));
    if origins.is_permissive() {
        tracing::info!("No ALLOWED_ORIGINS set, accepting every origin");
    }

    let state = AppState::with_config(catalog, config.game.clone());

    // WebSocket route with origin allow-listing
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(
            origins.clone(),
            superflawed::origin::ws_origin_middleware,
        ));

    let app = Router::new()
        .route("/", get(api::health))
        .route("/health", get(api::health))
        .route("/status", get(api::status))
        .merge(ws_routes)
        .layer(origins.cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
