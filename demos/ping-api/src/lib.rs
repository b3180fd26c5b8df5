//! Ping API demo.
//!
//! Three endpoints showing the two path notations, a required header and a handler
//! that fails on purpose:
//!
//! - `GET /ping`
//! - `GET /users/{id}` (header `auth` required)
//! - `GET /products/:id` (always answers `502 Bad Gateway`)

use route_bind_core::BuildError;
use route_bind_macros::Bindable;
use route_bind_web::{Reply, RequestContext, RouteError, RouteResult, Router, RouterConfig};
use serde::{Deserialize, Serialize};

/// `GET /ping`
#[derive(Bindable, Debug, Default)]
pub struct PingRequest {}

/// Reply to [`PingRequest`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingResponse {
    /// Always `PONG`
    pub message: String,
}

/// `GET /users/{id}`
#[derive(Bindable, Debug, Default)]
pub struct UserRequest {
    /// User id
    #[bind(path = "id")]
    pub id: i64,

    /// Caller credentials
    #[bind(header = "auth", validate = "required", description = "caller credentials")]
    pub auth: String,
}

/// Reply to [`UserRequest`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    /// Requested id
    pub old_id: i64,
    /// Id after migration
    pub new_id: i64,
}

/// `GET /products/:id`
#[derive(Bindable, Debug, Default)]
pub struct ProductRequest {
    /// Product id
    #[bind(path = "id")]
    pub id: i64,
}

/// Reply to [`ProductRequest`]; never sent.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// Message
    pub message: String,
}

async fn ping(_ctx: RequestContext, _request: PingRequest) -> RouteResult<PingResponse> {
    Ok(Reply::ok(PingResponse {
        message: "PONG".to_string(),
    }))
}

async fn user(_ctx: RequestContext, request: UserRequest) -> RouteResult<UserResponse> {
    Ok(Reply::ok(UserResponse {
        old_id: request.id,
        new_id: request.id + 1,
    }))
}

async fn product(_ctx: RequestContext, request: ProductRequest) -> RouteResult<ProductResponse> {
    Err(RouteError::bad_gateway(format!("Forced error code: {}", request.id)))
}

/// Router with every demo endpoint registered.
///
/// # Errors
///
/// Returns a [`BuildError`] if a request type does not fit its template.
pub fn router(config: RouterConfig) -> Result<Router, BuildError> {
    let router = Router::new()
        .title("Ping API")
        .version(env!("CARGO_PKG_VERSION"))
        .description("Request binding demo")
        .with_config(config);

    let ping_endpoint = router.endpoint("/ping", ping)?;
    let user_endpoint = router.endpoint("/users/{id}", user)?;
    let product_endpoint = router.endpoint("/products/:id", product)?;
    Ok(router
        .get(ping_endpoint)
        .get(user_endpoint)
        .get(product_endpoint))
}
