//! # Route Bind Testing
//!
//! Testing utilities and helpers for Route Bind.
//!
//! This crate provides:
//! - [`TestRequest`]: a builder for request parts and body results, including failing bodies
//! - Assertion helpers for collected binding errors
//! - Property-based testing strategies for templates and textual values
//!
//! ## Example
//!
//! ```ignore
//! use route_bind_testing::TestRequest;
//!
//! let outcome = TestRequest::get("/users/42?verbose=true")
//!     .header("apikey", "secret")
//!     .bind(&descriptor);
//! assert!(outcome.is_ok());
//! ```

/// Request builders
pub mod request {
    use bytes::Bytes;
    use http::request::Parts;
    use http::{HeaderName, HeaderValue, Method, Request};
    use route_bind_core::{BindOutcome, Bindable, BodyResult, RequestDescriptor};
    use serde::Serialize;
    use std::io;

    /// Builder for the inputs of one binding run.
    #[derive(Debug, Clone)]
    pub struct TestRequest {
        method: Method,
        uri: String,
        headers: Vec<(HeaderName, HeaderValue)>,
        body: Result<Bytes, String>,
    }

    impl TestRequest {
        /// A request with `method` for `uri` (path plus optional query).
        #[must_use]
        pub fn new(method: Method, uri: impl Into<String>) -> Self {
            Self {
                method,
                uri: uri.into(),
                headers: Vec::new(),
                body: Ok(Bytes::new()),
            }
        }

        /// A `GET` request.
        #[must_use]
        pub fn get(uri: impl Into<String>) -> Self {
            Self::new(Method::GET, uri)
        }

        /// A `POST` request.
        #[must_use]
        pub fn post(uri: impl Into<String>) -> Self {
            Self::new(Method::POST, uri)
        }

        /// A `PUT` request.
        #[must_use]
        pub fn put(uri: impl Into<String>) -> Self {
            Self::new(Method::PUT, uri)
        }

        /// Add a header.
        ///
        /// # Panics
        ///
        /// Panics if `name` is not a valid header name or `value` is not a valid header value.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn header(mut self, name: &str, value: &str) -> Self {
            let name = HeaderName::from_bytes(name.as_bytes()).expect("test header name should be valid");
            let value = HeaderValue::from_str(value).expect("test header value should be valid");
            self.headers.push((name, value));
            self
        }

        /// Add a header whose value is arbitrary bytes.
        ///
        /// # Panics
        ///
        /// Panics if `name` is not a valid header name or `value` contains control bytes.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn header_bytes(mut self, name: &str, value: &[u8]) -> Self {
            let name = HeaderName::from_bytes(name.as_bytes()).expect("test header name should be valid");
            let value = HeaderValue::from_bytes(value).expect("test header bytes should be valid");
            self.headers.push((name, value));
            self
        }

        /// Set the `Content-Type` header.
        #[must_use]
        pub fn content_type(self, content_type: &str) -> Self {
            self.header("content-type", content_type)
        }

        /// Set the body.
        #[must_use]
        pub fn body(mut self, body: impl Into<Bytes>) -> Self {
            self.body = Ok(body.into());
            self
        }

        /// Set a JSON body and content type.
        ///
        /// # Panics
        ///
        /// Panics if `value` cannot be serialized.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn json<T: Serialize>(self, value: &T) -> Self {
            let bytes = serde_json::to_vec(value).expect("test body should serialize");
            self.content_type("application/json").body(bytes)
        }

        /// Make reading the body fail with `reason`.
        #[must_use]
        pub fn failing_body(mut self, reason: impl Into<String>) -> Self {
            self.body = Err(reason.into());
            self
        }

        #[allow(clippy::expect_used)]
        fn request(&self) -> Request<()> {
            let mut builder = Request::builder().method(self.method.clone()).uri(self.uri.as_str());
            for (name, value) in &self.headers {
                builder = builder.header(name, value);
            }
            builder.body(()).expect("test request should be valid")
        }

        /// Split into request parts and the body result the binder consumes.
        ///
        /// # Panics
        ///
        /// Panics if the URI is invalid.
        #[must_use]
        pub fn into_parts(self) -> (Parts, BodyResult) {
            let (parts, ()) = self.request().into_parts();
            let body = self.body.map_err(io::Error::other);
            (parts, body)
        }

        /// Build a full request carrying the body bytes.
        ///
        /// A failing body becomes an empty one.
        ///
        /// # Panics
        ///
        /// Panics if the URI is invalid.
        #[must_use]
        pub fn into_request(self) -> Request<Bytes> {
            let body = self.body.clone().unwrap_or_default();
            self.request().map(|()| body)
        }

        /// Bind this request with `descriptor`.
        #[must_use]
        pub fn bind<T: Bindable>(self, descriptor: &RequestDescriptor<T>) -> BindOutcome<T> {
            let (parts, body) = self.into_parts();
            descriptor.bind(&parts, body)
        }
    }
}

/// Assertion helpers
pub mod assertions {
    use route_bind_core::{BindError, BindErrors, BindOutcome};

    /// Errors of a failed outcome.
    ///
    /// # Panics
    ///
    /// Panics if binding succeeded.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn expect_errors<T>(outcome: &BindOutcome<T>) -> &BindErrors {
        match &outcome.result {
            Ok(()) => panic!("expected binding to fail, but it succeeded"),
            Err(errors) => errors,
        }
    }

    /// Fields named by coercion failures, in order.
    #[must_use]
    pub fn coercion_fields(errors: &BindErrors) -> Vec<&str> {
        errors
            .iter()
            .filter_map(|error| match error {
                BindError::Coercion(coercion) => Some(coercion.field()),
                _ => None,
            })
            .collect()
    }

    /// Assert that some message contains `needle`.
    ///
    /// # Panics
    ///
    /// Panics if no message contains `needle`.
    #[allow(clippy::panic)]
    pub fn assert_mentions(errors: &BindErrors, needle: &str) {
        if !errors.messages().iter().any(|m| m.contains(needle)) {
            panic!("no error mentions {needle:?}; errors were:\n{errors}");
        }
    }
}

/// Property-based testing utilities
pub mod properties {
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// A parameter or literal segment name.
    pub fn identifier() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,7}"
    }

    /// A non-empty path segment value made of unreserved characters.
    pub fn segment_value() -> impl Strategy<Value = String> {
        "[A-Za-z0-9._~-]{1,12}"
    }

    /// A template segment: literal or placeholder.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TemplateSegment {
        /// Fixed text.
        Literal(String),
        /// A named placeholder.
        Param(String),
    }

    /// Segments of a template with unique placeholder names.
    pub fn template_segments() -> impl Strategy<Value = Vec<TemplateSegment>> {
        vec((any::<bool>(), identifier()), 1..6).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (is_param, name))| {
                    if is_param {
                        TemplateSegment::Param(format!("{name}{i}"))
                    } else {
                        TemplateSegment::Literal(name)
                    }
                })
                .collect()
        })
    }

    /// Render segments as a `:name` template.
    #[must_use]
    pub fn colon_template(segments: &[TemplateSegment]) -> String {
        segments.iter().fold(String::new(), |mut out, segment| {
            out.push('/');
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Param(name) => {
                    out.push(':');
                    out.push_str(name);
                }
            }
            out
        })
    }

    /// Render segments as a `{name}` template.
    #[must_use]
    pub fn brace_template(segments: &[TemplateSegment]) -> String {
        segments.iter().fold(String::new(), |mut out, segment| {
            out.push('/');
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Param(name) => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            out
        })
    }
}

/// Install a test-friendly tracing subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_bind_core=debug,route_bind_web=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use assertions::{assert_mentions, coercion_fields, expect_errors};
pub use request::TestRequest;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_into_parts() {
        let (parts, body) = TestRequest::post("/a/b?x=1")
            .header("apikey", "k")
            .body("hello")
            .into_parts();
        assert_eq!(parts.method, Method::POST);
        assert_eq!(parts.uri.path(), "/a/b");
        assert_eq!(parts.uri.query(), Some("x=1"));
        assert_eq!(parts.headers["apikey"], "k");
        assert_eq!(body.expect("readable body"), "hello");
    }

    #[test]
    fn test_failing_body() {
        let (_, body) = TestRequest::post("/").failing_body("connection reset").into_parts();
        assert_eq!(body.expect_err("failing body").to_string(), "connection reset");
    }

    #[test]
    fn test_templates() {
        let segments = vec![
            properties::TemplateSegment::Literal("users".into()),
            properties::TemplateSegment::Param("id".into()),
        ];
        assert_eq!(properties::colon_template(&segments), "/users/:id");
        assert_eq!(properties::brace_template(&segments), "/users/{id}");
    }
}
