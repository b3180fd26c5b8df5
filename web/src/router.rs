//! Route table for endpoints.
//!
//! A [`Router`] collects handlers by method and template and mounts them onto an
//! [`axum::Router`]. Endpoints built through the router share its descriptor cache and
//! configuration.

use crate::config::RouterConfig;
use crate::endpoint::{CustomResponder, Endpoint, Responder, RouteHandler};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::IntoResponse,
    routing::{MethodFilter, MethodRouter, on},
};
use route_bind_core::{Bindable, BuildError, DescriptorCache, PathPattern};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Descriptive information about an API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouterInfo {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    pub description: String,
}

/// One registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    /// HTTP method
    pub method: String,
    /// Route template
    pub path: String,
    /// Handler name
    pub handler: String,
    /// Template parameters, in template order
    pub params: Vec<String>,
}

/// Table of handlers keyed by template and method.
pub struct Router {
    info: RouterInfo,
    config: Arc<RouterConfig>,
    cache: Arc<DescriptorCache>,
    routes: BTreeMap<(String, String), Arc<dyn RouteHandler>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("info", &self.info)
            .field("config", &self.config)
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Empty router with default configuration and its own descriptor cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: RouterInfo::default(),
            config: Arc::new(RouterConfig::default()),
            cache: Arc::new(DescriptorCache::new()),
            routes: BTreeMap::new(),
        }
    }

    /// Set the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.info.title = title.into();
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.info.version = version.into();
        self
    }

    /// Set the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }

    /// Use `config` for endpoints built from now on.
    #[must_use]
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Share `cache` with other routers.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<DescriptorCache>) -> Self {
        self.cache = cache;
        self
    }

    /// API information.
    #[must_use]
    pub const fn info(&self) -> &RouterInfo {
        &self.info
    }

    /// Router configuration.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Descriptor cache shared by this router's endpoints.
    #[must_use]
    pub const fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    /// Build an endpoint for `template` served by `responder`.
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] of the request type's descriptor.
    pub fn endpoint<T, H>(&self, template: &str, responder: H) -> Result<Endpoint<T>, BuildError>
    where
        T: Bindable + Send + 'static,
        H: Responder<T>,
    {
        Endpoint::new(&self.cache, Arc::clone(&self.config), template, responder)
    }

    /// Build an endpoint for `template` served by a custom responder.
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] of the request type's descriptor.
    pub fn custom_endpoint<T, H>(&self, template: &str, responder: H) -> Result<Endpoint<T>, BuildError>
    where
        T: Bindable + Send + 'static,
        H: CustomResponder<T>,
    {
        Endpoint::custom(&self.cache, Arc::clone(&self.config), template, responder)
    }

    /// Register `handler` for `method`. A handler already registered for the same method
    /// and template is replaced.
    #[must_use]
    pub fn add(mut self, method: Method, handler: impl RouteHandler) -> Self {
        let key = (handler.path().to_string(), method.as_str().to_string());
        tracing::debug!(
            method = %method,
            path = handler.path(),
            handler = handler.handler_name(),
            "Route registered"
        );
        if let Some(previous) = self.routes.insert(key, Arc::new(handler)) {
            tracing::debug!(
                method = %method,
                path = previous.path(),
                handler = previous.handler_name(),
                "Route replaced"
            );
        }
        self
    }

    /// Register `handler` for `GET`.
    #[must_use]
    pub fn get(self, handler: impl RouteHandler) -> Self {
        self.add(Method::GET, handler)
    }

    /// Register `handler` for `POST`.
    #[must_use]
    pub fn post(self, handler: impl RouteHandler) -> Self {
        self.add(Method::POST, handler)
    }

    /// Register `handler` for `PUT`.
    #[must_use]
    pub fn put(self, handler: impl RouteHandler) -> Self {
        self.add(Method::PUT, handler)
    }

    /// Register `handler` for `PATCH`.
    #[must_use]
    pub fn patch(self, handler: impl RouteHandler) -> Self {
        self.add(Method::PATCH, handler)
    }

    /// Register `handler` for `DELETE`.
    #[must_use]
    pub fn delete(self, handler: impl RouteHandler) -> Self {
        self.add(Method::DELETE, handler)
    }

    /// Registered routes, ordered by template then method.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|((path, method), handler)| RouteInfo {
                method: method.clone(),
                path: path.clone(),
                handler: handler.handler_name().to_string(),
                params: handler.path_params().to_vec(),
            })
            .collect()
    }

    /// Mount every route onto an axum router.
    ///
    /// Routes are mounted by [`PathPattern::route_shape`], so templates that differ only in
    /// parameter names share one axum route. A request is served by the first route of its
    /// method, in [`routes`](Self::routes) order, whose template matches the request path;
    /// when none matches the answer is `404 Not Found`. Methods axum cannot filter on are
    /// skipped with a warning.
    #[must_use]
    pub fn into_axum(self) -> axum::Router {
        let mut mounts: BTreeMap<(String, String), Vec<Candidate>> = BTreeMap::new();
        for ((path, method), handler) in self.routes {
            match PathPattern::compile(&path) {
                Ok(pattern) => mounts
                    .entry((pattern.route_shape(), method))
                    .or_default()
                    .push((pattern, handler)),
                Err(error) => {
                    tracing::warn!(method = %method, path = %path, %error, "Invalid template, route skipped");
                }
            }
        }

        let mut grouped: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for ((shape, method), candidates) in mounts {
            let Ok(method) = Method::from_bytes(method.as_bytes()) else {
                continue;
            };
            let Ok(filter) = MethodFilter::try_from(method.clone()) else {
                tracing::warn!(method = %method, shape = %shape, "Unsupported method, route skipped");
                continue;
            };
            if candidates.len() > 1 {
                tracing::debug!(
                    method = %method,
                    shape = %shape,
                    templates = ?candidates.iter().map(|(p, _)| p.template()).collect::<Vec<_>>(),
                    "Templates share a route"
                );
            }

            let candidates: Arc<[Candidate]> = candidates.into();
            let service = move |request: Request<Body>| {
                let handler = select(&candidates, request.uri().path());
                async move {
                    match handler {
                        Some(handler) => handler.handle(request).await,
                        None => StatusCode::NOT_FOUND.into_response(),
                    }
                }
            };
            let entry = grouped.remove(&shape);
            let method_router = match entry {
                Some(existing) => existing.on(filter, service),
                None => on(filter, service),
            };
            grouped.insert(shape, method_router);
        }

        grouped
            .into_iter()
            .fold(axum::Router::new(), |router, (shape, method_router)| {
                router.route(&shape, method_router)
            })
    }
}

type Candidate = (PathPattern, Arc<dyn RouteHandler>);

fn select(candidates: &[Candidate], path: &str) -> Option<Arc<dyn RouteHandler>> {
    candidates
        .iter()
        .find(|(pattern, _)| pattern.is_match(path))
        .map(|(_, handler)| Arc::clone(handler))
}
