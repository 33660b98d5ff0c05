//! # blobcopy: server-side blob copies over HTTP
//!
//! `blobcopy` exposes a single operation: given a source blob URL and a destination storage
//! account, container and file name, it asks the destination account's blob service to copy
//! the source into that blob, and returns the copy status the service reported.
//!
//! ## Request Flow
//!
//! A `POST /api/CopyBlobBetweenStorage` request goes through three steps:
//!
//! 1. **Decode**: the body is parsed into [`api::models::copy::CopyRequest`].
//! 2. **Validate**: required fields are checked in a fixed order; the first missing one is
//!    reported by name and nothing else happens.
//! 3. **Delegate**: a [`storage::BlobCopier`] signs a Copy Blob request with the destination
//!    account's key and sends it. The copy runs on the storage service; the handler does not
//!    wait for it to finish.
//!
//! Failures in step 3 come back as `400` with an `Error: <message>` body. See [`errors`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use blobcopy::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     blobcopy::install_crypto_provider();
//!     let args = blobcopy::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     blobcopy::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config)?
//!         .serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod errors;
mod openapi;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use storage::{AzureBlobCopier, BlobCopier};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::openapi::ApiDoc;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .copier(Arc::new(AzureBlobCopier::new(&storage_config)?))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub copier: Arc<dyn BlobCopier>,
}

/// Install the process-wide rustls crypto provider. The HTTP client is built without one, so
/// this must run before any [`AzureBlobCopier`] is created. Calling it again is harmless.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Build the application router.
///
/// - `POST /api/CopyBlobBetweenStorage`: the copy handler
/// - `GET /healthz`: liveness probe
/// - `GET /openapi.json`, `GET /docs`: API documentation (when `enable_docs`)
/// - `GET /internal/metrics`: Prometheus metrics (when `enable_metrics`)
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/CopyBlobBetweenStorage", post(api::handlers::copy::copy_blob))
        .layer(DefaultBodyLimit::max(state.config.limits.max_body_bytes))
        .with_state(state.clone());

    if state.config.enable_docs {
        router = router
            .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
            .merge(Scalar::with_url("/docs", ApiDoc::openapi()));
    }

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The HTTP service: router plus the configuration it was built from.
///
/// 1. **Create**: [`Application::new`] builds the shared blob-service HTTP client and router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves, letting in-flight requests finish
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting blobcopy with configuration: {:#?}", config);

        let copier = AzureBlobCopier::new(&config.storage)?;
        let app_state = AppState::builder().config(config.clone()).copier(Arc::new(copier)).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "blobcopy listening on http://{}, copy endpoint at http://localhost:{}/api/CopyBlobBetweenStorage",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
