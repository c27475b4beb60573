//! # Server Module
//!
//! HTTP server setup and route configuration for the AgriSense server.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::post;
use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

use anyhow::{Context, Result};

use crate::ai::GeminiClient;
use crate::auth::{SessionGate, SessionStore};
use crate::config::Config;
use crate::database::{CredentialStore, DatabaseConfig, DatabaseConnection, migrations};
use crate::intake::ArtifactStaging;
use crate::routes::{analysis, auth, health};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub gate: Arc<SessionGate>,
    pub staging: ArtifactStaging,
    pub ai: Arc<GeminiClient>,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
}

/// Starts the AgriSense HTTP server.
///
/// Loads configuration, connects the database pool, bootstraps the users
/// table and the upload staging directory, then serves the router until
/// the process is terminated.
pub async fn start() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let db_config = DatabaseConfig::from_env().context("Failed to load DB config from env")?;
    let db = DatabaseConnection::new(db_config)
        .await
        .context("Failed to connect to DB")?;
    migrations::run_migrations(db.pool()).await?;

    let staging = ArtifactStaging::new(config.uploads.dir.clone())
        .await
        .context("Failed to create upload staging directory")?;

    // One gate per process, handed to the router by state
    let gate = Arc::new(SessionGate::new(Arc::new(SessionStore::new(
        config.session_ttl_hours,
    ))));

    let ai = Arc::new(GeminiClient::new(&config.ai).context("Failed to build Gemini client")?);

    let app_state = AppState {
        credentials: CredentialStore::new(db),
        gate: gate.clone(),
        staging,
        ai,
        session_ttl_hours: config.session_ttl_hours,
        cookie_secure: config.cookie_secure,
    };

    // Capability endpoints are gated; no staging and no model call happens
    // for an unauthenticated caller. The body limit must admit
    // phone-camera JPEGs, which overrun axum's 2 MB default.
    let gated_routes = Router::new()
        .route("/generate-response", post(analysis::generate_response))
        .route("/analyze-soil", post(analysis::analyze_soil))
        .layer(DefaultBodyLimit::max(config.uploads.max_bytes))
        .layer(middleware::from_fn_with_state(
            gate.clone(),
            SessionGate::require_session,
        ));

    let mut allowed_origins: Vec<HeaderValue> = vec![
        "http://localhost:3001"
            .parse()
            .expect("static origin parses"),
    ];
    if let Some(origin) = &config.cors_allowed_origin {
        allowed_origins.push(
            origin
                .parse()
                .with_context(|| format!("Invalid CORS origin: {origin}"))?,
        );
    }

    let app = Router::new()
        .route("/ping", axum::routing::get(health::ping))
        .merge(auth::create_auth_routes())
        .merge(gated_routes)
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(allowed_origins))
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::OPTIONS,
                    ])
                    .allow_headers([
                        axum::http::header::ORIGIN,
                        axum::http::header::CONTENT_TYPE,
                        axum::http::header::ACCEPT,
                    ])
                    .allow_credentials(true),
            ),
        )
        .with_state(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("AgriSense server starting...");
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/ping", addr);
    tracing::info!("Model: {}", config.ai.model);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")
}
