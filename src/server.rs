use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::{middleware, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    decompression::RequestDecompressionLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use crate::{
    middleware::{
        method_not_allowed::method_not_allowed, not_found::not_found,
        trace_response_body::trace_response_body,
    },
    rate_limit::{self, RateLimiter, RateLimiterConfig},
    route,
    state::ApiState,
    store::BookStore,
};

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    socket_address: SocketAddr,
    database: DatabaseSettings,
    #[serde(default)]
    rate_limit: RateLimitSettings,
}

impl ServerConfig {
    pub async fn from_config_file(path: &str) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        serde_yaml::from_str(&raw).context("Failed to parse config file")
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseSettings {
    path: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitSettings {
    #[serde(default = "RateLimitSettings::default_max_requests")]
    max_requests: usize,
    #[serde(default = "RateLimitSettings::default_window_seconds")]
    window_seconds: u64,
}

impl RateLimitSettings {
    fn default_max_requests() -> usize {
        100
    }

    fn default_window_seconds() -> u64 {
        15 * 60
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: Self::default_max_requests(),
            window_seconds: Self::default_window_seconds(),
        }
    }
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let store =
            BookStore::open(&self.config.database.path).context("Failed to open book store")?;
        let rate_limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: self.config.rate_limit.max_requests,
            window: Duration::from_secs(self.config.rate_limit.window_seconds),
        });
        let state = ApiState::new(store, rate_limiter);

        let app = router(state).layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                        .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                        .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
                )
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        );

        tracing::info!(addr = %self.config.socket_address, "Starting server");

        let listener = TcpListener::bind(&self.config.socket_address)
            .await
            .context("Bind failed")?;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

        Ok(())
    }
}

/// Assembles the application router.
///
/// The rate limit middleware wraps only the books routes. The request then
/// passes validation inside the handler's extractors, so the
/// rate-limit -> validation -> persistence order is fixed.
pub(crate) fn router(state: ApiState) -> Router {
    let books = route::books::app().layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::rate_limit,
    ));

    Router::new()
        .merge(books)
        .fallback(not_found)
        .layer(middleware::from_fn(method_not_allowed))
        .layer(middleware::from_fn(trace_response_body))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");

        tracing::info!("CTRL+C received");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;

        tracing::info!("SIGTERM received");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}
