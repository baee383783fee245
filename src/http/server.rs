//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router whose fallback forwards every request to the endpoint
//! - Wire up middleware (request ID, tracing, timeout, limits, decompression)
//! - Enforce the JSON content type on request bodies
//! - Run dispatch off the reactor and map its result to a response
//! - Gzip payloads of routes that ask for it when the client accepts gzip
//! - Serve the route listing
//! - Serve over plain TCP or TLS
//! - Record request metrics

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    decompression::RequestDecompressionLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::MuxConfig;
use crate::error::{ErrorKind, RequestError};
use crate::http::docs::{self, RouteDoc};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::{error_response, payload_response};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::Endpoint;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub endpoint: Arc<Endpoint>,
    pub docs: Arc<Vec<RouteDoc>>,
    pub require_json: bool,
    pub max_body_bytes: usize,
}

/// HTTP server exposing an [`Endpoint`].
pub struct HttpServer {
    router: Router,
    config: MuxConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: MuxConfig, endpoint: Arc<Endpoint>) -> Self {
        metrics::record_routes(endpoint.len());

        let state = AppState {
            docs: Arc::new(docs::listing(&endpoint)),
            endpoint,
            require_json: config.endpoint.require_json,
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MuxConfig, state: AppState) -> Router {
        let mut router = Router::new();
        if let Some(docs_path) = &config.endpoint.docs_path {
            router = router.route(docs_path, get(docs_handler).fallback(dispatch_handler));
        }

        router
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request.request_id(),
                        )
                    }))
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.limits.request_timeout_secs)))
                    .layer(RequestDecompressionLayer::new()),
            )
    }

    /// Run the server until `shutdown` triggers, then drain in-flight requests.
    ///
    /// Subscribes before returning, so a trigger sent after this call is
    /// never missed.
    pub fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> impl Future<Output = Result<(), std::io::Error>> {
        let mut stop = shutdown.subscribe();

        async move {
            let addr = listener.local_addr()?;
            tracing::info!(
                address = %addr,
                root = %self.config.endpoint.root,
                docs_path = ?self.config.endpoint.docs_path,
                "HTTP server starting"
            );

            axum::serve(listener, self.router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await?;

            tracing::info!("HTTP server stopped");
            Ok(())
        }
    }

    /// Serve HTTPS on `addr` until `shutdown` triggers, then drain in-flight
    /// requests.
    pub fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: Shutdown,
    ) -> impl Future<Output = Result<(), std::io::Error>> {
        let mut stop = shutdown.subscribe();

        async move {
            tracing::info!(
                address = %addr,
                root = %self.config.endpoint.root,
                docs_path = ?self.config.endpoint.docs_path,
                "HTTPS server starting"
            );

            let handle = axum_server::Handle::new();
            let drain = handle.clone();
            tokio::spawn(async move {
                let _ = stop.recv().await;
                drain.graceful_shutdown(None);
            });

            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(self.router.into_make_service())
                .await?;

            tracing::info!("HTTPS server stopped");
            Ok(())
        }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }
}

/// Forward one request to the endpoint.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            let err = state.endpoint.map_error(RequestError::new(
                ErrorKind::ReadBodyError,
                format!("invalid request body: {}", e),
            ));
            return rejected(&method, &err, start);
        }
    };

    if state.require_json && !body.is_empty() && !is_json(&parts.headers) {
        tracing::warn!(request_id = %request_id, path = %path, "Unsupported content type");
        let err = state.endpoint.map_error(RequestError::new(
            ErrorKind::UnsupportedContentType,
            "unsupported content type: expected application/json",
        ));
        return rejected(&method, &err, start);
    }

    let gzip_accepted = accepts_gzip(&parts.headers);
    let endpoint = Arc::clone(&state.endpoint);
    let (dispatch_method, dispatch_path) = (method.clone(), path.clone());
    let result =
        tokio::task::spawn_blocking(move || endpoint.serve(&dispatch_method, &dispatch_path, &body))
            .await;

    let (response, outcome) = match result {
        Ok(Ok(served)) => {
            let gzip_level = served.gzip_level.filter(|_| gzip_accepted);
            (payload_response(served.payload, gzip_level), "ok")
        }
        Ok(Err(e)) => (error_response(&e), e.kind().as_str()),
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Handler task failed");
            (
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response(),
                "panic",
            )
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), outcome, start);
    response
}

/// Answer a request refused before dispatch.
fn rejected(method: &axum::http::Method, err: &RequestError, start: Instant) -> Response {
    let response = error_response(err);
    metrics::record_request(method.as_str(), response.status().as_u16(), err.kind().as_str(), start);
    response
}

async fn docs_handler(State(state): State<AppState>) -> Json<Vec<RouteDoc>> {
    Json(state.docs.as_ref().clone())
}

/// Whether the request declares a JSON body. Parameters such as `charset`
/// are ignored.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Whether the client lists gzip in `Accept-Encoding` with a non-zero
/// quality.
fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|coding| {
            let mut parts = coding.split(';');
            let name = parts.next().unwrap_or_default().trim();
            let refused = parts.any(|param| {
                param
                    .trim()
                    .strip_prefix("q=")
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .is_some_and(|q| q == 0.0)
            });
            (name.eq_ignore_ascii_case("gzip") || name == "*") && !refused
        })
}
