//! Endpoints: a request type bound to a route template and a handler.
//!
//! An [`Endpoint`] binds every incoming request into its request type before the handler
//! sees it. Bind failures never reach the handler; they become a `400 Bad Request` listing
//! each failure.
//!
//! Handlers come in two shapes:
//!
//! - [`Responder`]: returns a [`Reply`] (status plus optional JSON body) or a [`RouteError`]
//! - [`CustomResponder`]: builds the axum [`Response`] itself
//!
//! Both are implemented for async closures taking a [`RequestContext`] and the bound value.

use crate::config::RouterConfig;
use crate::error::{RouteError, parsing_error_response};
use crate::metrics::RequestMetrics;
use axum::{
    Json,
    body::Body,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, request::Parts},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use route_bind_core::{Bindable, BuildError, DescriptorCache, Payload, RequestDescriptor};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Header naming the bound request type in development mode.
pub const REQUEST_TYPE_HEADER: &str = "x-router-request-type";
/// Header naming the reply body type in development mode.
pub const RESPONSE_TYPE_HEADER: &str = "x-router-response-type";

/// What a router needs from a mounted handler.
pub trait RouteHandler: Send + Sync + 'static {
    /// Route template, in the notation it was registered with.
    fn path(&self) -> &str;

    /// Serve one request.
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response>;

    /// Name used in logs and metrics.
    fn handler_name(&self) -> &str;

    /// Template parameter names, in template order.
    fn path_params(&self) -> &[String];
}

/// Request data available to handlers besides the bound value.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    raw_body: Option<Payload>,
}

impl RequestContext {
    /// Request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Body kept as-is because its content type has no decoder.
    #[must_use]
    pub const fn raw_body(&self) -> Option<&Payload> {
        self.raw_body.as_ref()
    }

    /// All request parts.
    #[must_use]
    pub const fn parts(&self) -> &Parts {
        &self.parts
    }
}

/// Status and optional JSON body returned by a [`Responder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<R> {
    /// HTTP status code; anything outside `100..=999` becomes `502 Bad Gateway`
    pub status: u16,
    /// Body, serialized as JSON
    pub body: Option<R>,
}

impl<R> Reply<R> {
    /// Reply with `status` and `body`.
    #[must_use]
    pub const fn new(status: u16, body: R) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// `200 OK` with `body`.
    #[must_use]
    pub const fn ok(body: R) -> Self {
        Self::new(200, body)
    }

    /// `201 Created` with `body`.
    #[must_use]
    pub const fn created(body: R) -> Self {
        Self::new(201, body)
    }

    /// `status` without a body.
    #[must_use]
    pub const fn empty(status: u16) -> Self {
        Self { status, body: None }
    }
}

/// Handler returning a [`Reply`].
pub trait Responder<T>: Send + Sync + 'static {
    /// Reply body type.
    type Body: Serialize + Send + 'static;
    /// Future produced per request.
    type Future: Future<Output = Result<Reply<Self::Body>, RouteError>> + Send + 'static;

    /// Handle one bound request.
    fn respond(&self, ctx: RequestContext, request: T) -> Self::Future;
}

impl<T, F, Fut, R> Responder<T> for F
where
    F: Fn(RequestContext, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply<R>, RouteError>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    type Body = R;
    type Future = Fut;

    fn respond(&self, ctx: RequestContext, request: T) -> Fut {
        self(ctx, request)
    }
}

/// Handler building its own response.
pub trait CustomResponder<T>: Send + Sync + 'static {
    /// Future produced per request.
    type Future: Future<Output = Response> + Send + 'static;

    /// Handle one bound request.
    fn respond(&self, ctx: RequestContext, request: T) -> Self::Future;
}

impl<T, F, Fut> CustomResponder<T> for F
where
    F: Fn(RequestContext, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    type Future = Fut;

    fn respond(&self, ctx: RequestContext, request: T) -> Fut {
        self(ctx, request)
    }
}

type HandlerFn<T> = dyn Fn(RequestContext, T, Arc<RouterConfig>) -> BoxFuture<'static, Response> + Send + Sync;

/// A request type, its compiled descriptor and its handler.
pub struct Endpoint<T> {
    descriptor: Arc<RequestDescriptor<T>>,
    config: Arc<RouterConfig>,
    handler: Arc<HandlerFn<T>>,
}

impl<T> Clone for Endpoint<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            config: Arc::clone(&self.config),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> std::fmt::Debug for Endpoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("descriptor", &self.descriptor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Bindable + Send + 'static> Endpoint<T> {
    /// Endpoint for `template` served by a [`Responder`].
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] of the request type's descriptor.
    pub fn new<H: Responder<T>>(
        cache: &DescriptorCache,
        config: Arc<RouterConfig>,
        template: &str,
        responder: H,
    ) -> Result<Self, BuildError> {
        let responder = Arc::new(responder);
        let handler = move |ctx: RequestContext, request: T, config: Arc<RouterConfig>| {
            let reply = responder.respond(ctx, request);
            Box::pin(async move { render_reply::<T, H::Body>(reply.await, &config) }) as BoxFuture<'static, Response>
        };
        Self::with_handler(cache, config, template, Arc::new(handler))
    }

    /// Endpoint for `template` served by a [`CustomResponder`].
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] of the request type's descriptor.
    pub fn custom<H: CustomResponder<T>>(
        cache: &DescriptorCache,
        config: Arc<RouterConfig>,
        template: &str,
        responder: H,
    ) -> Result<Self, BuildError> {
        let handler = move |ctx: RequestContext, request: T, _: Arc<RouterConfig>| {
            Box::pin(responder.respond(ctx, request)) as BoxFuture<'static, Response>
        };
        Self::with_handler(cache, config, template, Arc::new(handler))
    }

    fn with_handler(
        cache: &DescriptorCache,
        config: Arc<RouterConfig>,
        template: &str,
        handler: Arc<HandlerFn<T>>,
    ) -> Result<Self, BuildError> {
        let descriptor = cache.get_or_build::<T>(template)?;
        Ok(Self {
            descriptor,
            config,
            handler,
        })
    }

    /// The compiled descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &RequestDescriptor<T> {
        &self.descriptor
    }
}

impl<T: Bindable + Send + 'static> RouteHandler for Endpoint<T> {
    fn path(&self) -> &str {
        self.descriptor.template()
    }

    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let descriptor = Arc::clone(&self.descriptor);
        let config = Arc::clone(&self.config);
        let handler = Arc::clone(&self.handler);

        Box::pin(async move {
            let started = Instant::now();
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, config.body_limit)
                .await
                .map_err(std::io::Error::other);
            let outcome = descriptor.bind(&parts, body);

            let method = parts.method.clone();
            let path = parts.uri.path().to_string();
            let response = match outcome.result {
                Ok(()) => {
                    let ctx = RequestContext {
                        parts,
                        raw_body: outcome.raw_body,
                    };
                    handler(ctx, outcome.value, Arc::clone(&config)).await
                }
                Err(errors) => parsing_error_response(&errors, config.development),
            };

            let status = response.status();
            RequestMetrics::record(T::TYPE_NAME, status);
            RequestMetrics::record_duration(T::TYPE_NAME, started.elapsed());
            if config.logging {
                log_request(&method, T::TYPE_NAME, &path, status, started);
            }
            response
        })
    }

    fn handler_name(&self) -> &str {
        T::TYPE_NAME
    }

    fn path_params(&self) -> &[String] {
        self.descriptor.path_params()
    }
}

fn render_reply<T: Bindable, R: Serialize>(
    reply: Result<Reply<R>, RouteError>,
    config: &RouterConfig,
) -> Response {
    let mut response = match reply {
        Ok(reply) => {
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
            match reply.body {
                Some(body) => (status, Json(body)).into_response(),
                None => status.into_response(),
            }
        }
        Err(error) => error.render(config.development),
    };

    if config.development {
        let headers = response.headers_mut();
        for (name, value) in [
            (REQUEST_TYPE_HEADER, T::TYPE_NAME),
            (RESPONSE_TYPE_HEADER, std::any::type_name::<R>()),
        ] {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
    }
    response
}

#[allow(clippy::cast_possible_truncation)]
fn log_request(method: &Method, handler: &str, path: &str, status: StatusCode, started: Instant) {
    let ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::warn!(%method, handler, path, status = status.as_u16(), ms, "Request handled");
    } else {
        tracing::debug!(%method, handler, path, status = status.as_u16(), ms, "Request handled");
    }
}
