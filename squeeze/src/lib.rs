//! # squeeze: image re-compression service
//!
//! `squeeze` accepts an uploaded raster image over HTTP, re-encodes it as JPEG at a
//! caller-supplied quality, stores the result on local disk and answers with the original and
//! compressed sizes, the percentage saved and a URL the result can be downloaded from.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum). Decoding and encoding
//! are delegated to the [`image`](https://docs.rs/image) crate; see [`codec`]. Compressed files
//! live in a flat directory managed by [`store`] and are served back with `tower-http`'s
//! `ServeDir`.
//!
//! ### Request Flow
//!
//! A `POST /api/compress` request is parsed as `multipart/form-data`. The `image` part is
//! decoded by sniffing its magic bytes, an artifact file named after the current time in
//! nanoseconds is created, the image is encoded into it as JPEG, and the file is stat'ed to
//! compute the savings. Codec work and file I/O run on the blocking pool. Every failure is
//! terminal for the request and reported synchronously; see [`errors`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use squeeze::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = squeeze::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     squeeze::telemetry::init_telemetry(config.log_format)?;
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
pub mod codec;
pub mod config;
pub mod errors;
mod openapi;
pub mod store;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use crate::api::handlers::{compress, root};
use crate::openapi::ApiDoc;
use crate::store::ArtifactStore;
use anyhow::Context;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{any, get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// Built once at startup and never mutated afterwards.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(Arc::new(store))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<ArtifactStore>,
}

/// Create CORS layer from configuration.
///
/// The layer answers every OPTIONS request itself (200, empty body), with or without the
/// preflight headers, so OPTIONS never reaches a handler.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = config.cors_origin().parse::<HeaderValue>()?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

/// Build the main application router with all endpoints and middleware.
///
/// - `/` and every unmatched path: welcome payload
/// - `/api/compress`: compress handler (CORS)
/// - `/download/*`: stored artifacts (CORS)
/// - `/healthz`, `/api-docs/openapi.json`, `/docs`
///
/// # Errors
///
/// Returns an error if the configured CORS origin is not a valid header value.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;

    let compress_routes = Router::new()
        .route(
            "/api/compress",
            post(compress::compress_image).fallback(root::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .layer(cors_layer.clone())
        .with_state(state.clone());

    let download_routes = Router::new()
        .nest_service("/download", ServeDir::new(state.store.dir()))
        .layer(cors_layer);

    let router = Router::new()
        .route("/", any(root::welcome))
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .merge(compress_routes)
        .merge(download_routes)
        .fallback(root::welcome);

    let router = router
        .layer(RequestBodyTimeoutLayer::new(state.config.read_timeout))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.write_timeout,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct.
///
/// 1. **Create**: [`Application::new`] validates the configuration, opens the artifact store and
///    builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting squeeze with configuration: {:#?}", config);

        config.validate()?;

        let store = ArtifactStore::open(&config.output_dir)
            .with_context(|| format!("Failed to create output directory {}", config.output_dir.display()))?;

        let app_state = AppState::builder().config(config.clone()).store(Arc::new(store)).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Squeeze API listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::*;
    use axum_test::multipart::MultipartForm;
    use std::time::Duration;

    #[test]
    fn test_application_creates_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("compressed");

        let _app = Application::new(create_test_config(&dir)).unwrap();

        assert!(dir.is_dir());
    }

    #[test]
    fn test_application_rejects_invalid_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            default_quality: 0,
            ..create_test_config(tmp.path())
        };

        assert!(Application::new(config).is_err());
    }

    #[tokio::test]
    async fn test_production_cors_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            environment: config::Environment::Production,
            allowed_origin: Some("https://squeeze.example.com".to_string()),
            ..create_test_config(tmp.path())
        };
        let server = create_test_server(config);

        let response = server.method(Method::OPTIONS, "/api/compress").await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.header("access-control-allow-origin"), "https://squeeze.example.com");
    }

    #[tokio::test]
    async fn test_root_is_not_cors_wrapped() {
        let tmp = tempfile::tempdir().unwrap();
        let server = create_test_server(create_test_config(tmp.path()));

        let response = server.get("/").add_header("origin", "http://localhost:4321").await;

        response.assert_status(StatusCode::OK);
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            write_timeout: Duration::from_millis(1),
            ..create_test_config(tmp.path())
        };
        let server = create_test_server(config);
        let png = sample_png(1024, 1024);

        let response = server
            .post("/api/compress")
            .multipart(MultipartForm::new().add_part("image", image_part(&png, "large.png")))
            .await;

        response.assert_status(StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_bare_options_answered_by_cors_layer() {
        let tmp = tempfile::tempdir().unwrap();
        let server = create_test_server(create_test_config(tmp.path()));

        let response = server.method(Method::OPTIONS, "/api/compress").await;

        response.assert_status(StatusCode::OK);
        assert!(response.as_bytes().is_empty());
        assert_eq!(response.header("access-control-allow-credentials"), "true");
        let methods = response.header("access-control-allow-methods");
        assert_eq!(methods.to_str().unwrap(), "POST,GET,OPTIONS");
        let vary = response.header("vary");
        assert!(vary.to_str().unwrap().contains("access-control-request-method"));
    }
}
