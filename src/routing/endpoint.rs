//! Endpoint registration and dispatch.
//!
//! Routes are registered on an [`EndpointBuilder`]. `build()` consumes the
//! builder into an [`Endpoint`], which has no mutating methods and is shared
//! by every request through an `Arc`.
//!
//! Request paths are split on `/` first and each segment is then
//! percent-decoded, so an encoded `%2F` stays inside its segment.

use std::borrow::Cow;
use std::sync::Arc;

use axum::http::Method;
use percent_encoding::percent_decode_str;

use crate::error::{BoxError, ConfigurationError, ErrorKind, RequestError};
use crate::routing::path::split_path;
use crate::routing::route::Route;
use crate::routing::trie::Router;

/// A set of routes registered together.
///
/// Implemented by types that own state their handlers share. The handlers
/// usually capture a clone of `self`.
pub trait Service: Send + Sync + 'static {
    fn routes(self: &Arc<Self>) -> Result<Vec<Route>, ConfigurationError>;
}

/// Rewrites the cause of every request error before it reaches the
/// transport. Returning a [`CodedError`](crate::error::CodedError) selects
/// the response status.
pub type ErrorMapper = dyn Fn(ErrorKind, BoxError) -> BoxError + Send + Sync;

/// Normalize a root prefix to `/` followed by its trimmed components.
pub fn normalize_root(root: &str) -> String {
    format!("/{}", split_path(root).join("/"))
}

/// Mutable registration stage of an [`Endpoint`].
pub struct EndpointBuilder {
    root: String,
    router: Router,
    error_mapper: Option<Box<ErrorMapper>>,
}

impl EndpointBuilder {
    pub fn new(root: &str) -> Self {
        Self {
            root: normalize_root(root),
            router: Router::new(),
            error_mapper: None,
        }
    }

    /// Register one compiled route.
    pub fn add_route(&mut self, route: Route) -> Result<&mut Self, ConfigurationError> {
        tracing::debug!(route = %route, root = %self.root, "Registering route");
        self.router.add(route)?;
        Ok(self)
    }

    /// Register every route of `service`.
    pub fn add_service<S: Service>(&mut self, service: &Arc<S>) -> Result<&mut Self, ConfigurationError> {
        for route in service.routes()? {
            self.add_route(route)?;
        }
        Ok(self)
    }

    /// Install the error mapper, replacing any previous one.
    pub fn on_error<F>(&mut self, mapper: F) -> &mut Self
    where
        F: Fn(ErrorKind, BoxError) -> BoxError + Send + Sync + 'static,
    {
        self.error_mapper = Some(Box::new(mapper));
        self
    }

    pub fn build(self) -> Endpoint {
        tracing::info!(
            routes = self.router.len(),
            root = %self.root,
            error_mapper = self.error_mapper.is_some(),
            "Endpoint ready"
        );
        Endpoint {
            root_segments: split_path(&self.root).into_iter().map(str::to_string).collect(),
            root: self.root,
            router: self.router,
            error_mapper: self.error_mapper,
        }
    }
}

/// A successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    /// JSON payload, empty for "no content".
    pub payload: Vec<u8>,
    /// Response compression level of the matched route.
    pub gzip_level: Option<u32>,
}

/// Frozen route set.
pub struct Endpoint {
    root: String,
    root_segments: Vec<String>,
    router: Router,
    error_mapper: Option<Box<ErrorMapper>>,
}

impl Endpoint {
    pub fn builder(root: &str) -> EndpointBuilder {
        EndpointBuilder::new(root)
    }

    /// Route one request and run its handler.
    ///
    /// Returns the JSON response payload, empty for "no content".
    pub fn dispatch(&self, method: &Method, path: &str, body: &[u8]) -> Result<Vec<u8>, RequestError> {
        self.serve(method, path, body).map(|served| served.payload)
    }

    /// Like [`dispatch`](Self::dispatch), also reporting how the matched
    /// route wants its payload sent.
    pub fn serve(&self, method: &Method, path: &str, body: &[u8]) -> Result<Served, RequestError> {
        self.route_and_invoke(method, path, body)
            .map_err(|e| self.map_error(e))
    }

    /// Pass `err` through the error mapper, if one is installed.
    pub fn map_error(&self, err: RequestError) -> RequestError {
        match &self.error_mapper {
            Some(mapper) => {
                let (kind, cause) = err.into_parts();
                RequestError::new(kind, mapper(kind, cause))
            }
            None => err,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Registered routes, sorted by path then method.
    pub fn routes(&self) -> Vec<&Route> {
        self.router.routes()
    }

    pub fn len(&self) -> usize {
        self.router.len()
    }

    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    fn route_and_invoke(&self, method: &Method, path: &str, body: &[u8]) -> Result<Served, RequestError> {
        let not_found = || RequestError::route_not_found(method.as_str(), path);

        let decoded = decode_segments(path)?;
        let segments: Vec<&str> = decoded.iter().map(AsRef::as_ref).collect();
        let relative = self.strip_root(&segments).ok_or_else(not_found)?;
        let matched = self
            .router
            .match_segments(method, relative)
            .ok_or_else(not_found)?;

        let result = matched.route.invoke(&matched.params, body);
        match &result {
            Ok(payload) => tracing::debug!(
                route = %matched.route,
                bytes = payload.len(),
                "Request served"
            ),
            Err(e) => tracing::warn!(
                route = %matched.route,
                kind = %e.kind(),
                error = %e,
                "Request failed"
            ),
        }
        result.map(|payload| Served {
            payload,
            gzip_level: matched.route.gzip_level(),
        })
    }

    /// Remove the root prefix on segment boundaries.
    fn strip_root<'s, 'a>(&self, segments: &'s [&'a str]) -> Option<&'s [&'a str]> {
        if segments.len() < self.root_segments.len() {
            return None;
        }
        let (head, rest) = segments.split_at(self.root_segments.len());
        head.iter()
            .zip(&self.root_segments)
            .all(|(segment, root)| *segment == root.as_str())
            .then_some(rest)
    }
}

fn decode_segments(path: &str) -> Result<Vec<Cow<'_, str>>, RequestError> {
    split_path(path)
        .into_iter()
        .map(|segment| {
            percent_decode_str(segment).decode_utf8().map_err(|e| {
                RequestError::new(
                    ErrorKind::DecodeError,
                    format!("path segment '{}' is not valid UTF-8: {}", segment, e),
                )
            })
        })
        .collect()
}
