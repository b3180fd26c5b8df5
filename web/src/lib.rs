//! Axum integration for Route Bind.
//!
//! Request types derive [`Bindable`]; this crate mounts them onto axum. Every request is
//! bound into its type before the handler runs, and bind failures are answered with a
//! `400 Bad Request` listing each problem.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at the axum route mounted by [`Router::into_axum`]
//! 2. **Read body** up to the configured limit
//! 3. **Bind** body, path, query and headers into the request type, then validate
//! 4. **Handle** the bound value with a [`Responder`] or [`CustomResponder`]
//! 5. **Respond** with the handler's reply, or the bind errors
//!
//! # Example
//!
//! ```ignore
//! use route_bind_web::{Bindable, Reply, RequestContext, RouteError, Router, RouterConfig};
//!
//! #[derive(Bindable, Debug, Default)]
//! struct GetUser {
//!     #[bind(path = "id")]
//!     id: u64,
//! }
//!
//! async fn get_user(_ctx: RequestContext, request: GetUser) -> Result<Reply<User>, RouteError> {
//!     Ok(Reply::ok(load_user(request.id).await?))
//! }
//!
//! let router = Router::new().with_config(RouterConfig::from_env()?);
//! let endpoint = router.endpoint("/users/{id}", get_user)?;
//! let app = router.get(endpoint).into_axum();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod router;

// Re-export key types for convenience
pub use config::{ConfigError, RouterConfig};
pub use endpoint::{CustomResponder, Endpoint, Reply, RequestContext, Responder, RouteHandler};
pub use error::RouteError;
pub use metrics::MetricsServer;
pub use router::{RouteInfo, Router, RouterInfo};
pub use route_bind_macros::Bindable;

/// Result type alias for route handlers.
pub type RouteResult<R> = Result<Reply<R>, RouteError>;
