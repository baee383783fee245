//! Route compilation.
//!
//! `Route::new` is the registration-time step that turns a method, a raw
//! template and a typed handler into a [`Route`] carrying its
//! [`InvocationPlan`]. All signature checks happen here so that the request
//! path never has to validate a handler shape.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::error::ConfigurationError;
use crate::routing::handler::{ArgKind, ErasedHandler, Handler, HandlerFn, ReplyKind, Replies};
use crate::routing::path::{PathTemplate, Segment};

/// Where the value of one handler parameter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSource {
    /// The path segment bound to this parameter's index.
    Path,
    /// The request body.
    Body,
}

/// Per-route binding of handler parameters and return slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPlan {
    /// Declared kind of every parameter, by index.
    pub args: Vec<ArgKind>,
    pub body_param: Option<usize>,
    pub output_body: Option<usize>,
    pub output_error: Option<usize>,
}

impl InvocationPlan {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn source(&self, index: usize) -> ArgSource {
        if self.body_param == Some(index) {
            ArgSource::Body
        } else {
            ArgSource::Path
        }
    }
}

/// A handler bound to an HTTP method and a path template.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: PathTemplate,
    plan: InvocationPlan,
    handler: Arc<dyn ErasedHandler>,
    gzip_level: Option<u32>,
}

impl Route {
    /// Compile a route, validating the handler signature against the path.
    pub fn new<H, Args>(method: Method, path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let path = PathTemplate::parse(path)?;
        let args = H::params();
        let returns = <H::Output as Replies>::kinds();
        let plan = compile(&method, &path, args, &returns)?;

        tracing::debug!(
            method = %method,
            path = %path,
            arity = plan.arity(),
            body_param = ?plan.body_param,
            "Route compiled"
        );

        Ok(Self {
            method,
            path,
            plan,
            handler: Arc::new(HandlerFn::new(handler)),
            gzip_level: None,
        })
    }

    /// Gzip response payloads of this route at `level` (1 to 9) for clients
    /// that accept it.
    pub fn with_gzip(mut self, level: u32) -> Result<Self, ConfigurationError> {
        if !(1..=9).contains(&level) {
            return Err(ConfigurationError::InvalidGzipLevel {
                route: self.to_string(),
                level,
            });
        }
        self.gzip_level = Some(level);
        Ok(self)
    }

    pub fn get<H, Args>(path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self::new(Method::GET, path, handler)
    }

    pub fn post<H, Args>(path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self::new(Method::POST, path, handler)
    }

    pub fn put<H, Args>(path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self::new(Method::PUT, path, handler)
    }

    pub fn delete<H, Args>(path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self::new(Method::DELETE, path, handler)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    pub fn plan(&self) -> &InvocationPlan {
        &self.plan
    }

    pub fn gzip_level(&self) -> Option<u32> {
        self.gzip_level
    }

    pub(crate) fn handler(&self) -> &dyn ErasedHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path.to_string())
            .field("plan", &self.plan)
            .field("gzip_level", &self.gzip_level)
            .finish()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} {} }}", self.method, self.path)
    }
}

/// Build the invocation plan of a handler bound to `path`.
fn compile(
    method: &Method,
    path: &PathTemplate,
    args: Vec<ArgKind>,
    returns: &[ReplyKind],
) -> Result<InvocationPlan, ConfigurationError> {
    let route = || format!("{{ {} {} }}", method, path);
    let body_param = path.bind(args.len())?;

    for segment in path.segments() {
        let Segment::Positional { index, .. } = segment else {
            continue;
        };
        if let ArgKind::Structured(type_name) = args[*index] {
            return Err(ConfigurationError::NonScalarPathArgument {
                route: route(),
                index: *index,
                type_name,
            });
        }
    }

    let mut output_body = None;
    let mut output_error = None;
    for (slot, kind) in returns.iter().enumerate() {
        match kind {
            ReplyKind::Error if output_error.is_some() => {
                return Err(ConfigurationError::TooManyErrorReturns { route: route() });
            }
            ReplyKind::Error => output_error = Some(slot),
            ReplyKind::Body if output_body.is_some() => {
                return Err(ConfigurationError::TooManyBodyReturns { route: route() });
            }
            ReplyKind::Body => output_body = Some(slot),
        }
    }

    Ok(InvocationPlan {
        args,
        body_param,
        output_body,
        output_error,
    })
}
