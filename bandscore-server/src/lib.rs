// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

pub mod api;
pub mod config;

use anyhow::Result;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use bandscore_evals::RatingService;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{health_check, rate_writing, AppState};
use config::{HttpServerConfig, ServerConfig};

/// Install the global tracing subscriber
pub fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "bandscore_server=info,bandscore_evals=info,tower_http=info".into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the application router
pub fn build_router(state: AppState, http: &HttpServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/rate", post(rate_writing))
        .route("/api/v1/rate", post(rate_writing))
        .with_state(state)
        .layer(cors_layer(http))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(http: &HttpServerConfig) -> CorsLayer {
    if !http.enable_cors {
        return CorsLayer::new();
    }

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if http.cors_origins.is_empty() {
        tracing::warn!(
            "CORS: Allowing all origins (development mode). Set cors_origins in production!"
        );
        return cors.allow_origin(Any);
    }

    tracing::info!("CORS: Allowing origins: {:?}", http.cors_origins);
    let origins: Vec<HeaderValue> = http
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("CORS: Ignoring invalid origin {:?}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    tracing::info!("Starting Bandscore Server");
    tracing::info!("Configuration: {:#?}", config);

    config.validate()?;

    let service = RatingService::from_config(&config.llm)?;
    let state = AppState::new(
        service,
        &config.llm,
        Duration::from_secs(config.server.request_timeout_secs),
    );
    let app = build_router(state, &config.server);

    let addr = config.socket_addr()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
