//! # AgriSense Server
//!
//! Session-gated HTTP API that forwards user prompts and soil/crop images
//! to the Gemini generative model and relays the result, backed by a
//! PostgreSQL store for user credentials.
//!
//! ## Architecture
//! The server is organized into modules:
//! - `server`: Router assembly, shared state, bind + serve
//! - `config`: Environment variable configuration management
//! - `database`: Connection pool, credential store, migrations
//! - `auth`: Server-side session store and the session gate middleware
//! - `intake`: Upload staging with guaranteed cleanup
//! - `ai`: Gemini dispatch client
//! - `routes`: HTTP route handlers organized by functionality
//!
//! ## Environment Setup
//! Copy `.env.example` to `.env` and configure the database URL and the
//! `GEMINI_API_KEY` before running.
//!
//! ## Running the Server
//! ```bash
//! cargo run
//! ```

mod ai;
mod auth;
mod config;
mod database;
mod error;
mod intake;
mod routes;
mod server;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    server::start().await
}
