//! # Route Bind Core
//!
//! Compiles request types into binding plans and populates them from HTTP requests.
//!
//! A request type declares where each field comes from with `#[bind(...)]` tags:
//!
//! - `path = "id"`: a placeholder of the route template (`/users/:id` or `/users/{id}`)
//! - `query = "page"`, `query = "page,required"`: a query parameter
//! - `header = "apikey"`, `header = "apikey,required"`: a request header
//! - `body`: the request body (raw bytes, UTF-8 text, or a JSON/XML/YAML document)
//! - `validate = "required,min=3"`: validation rules
//! - `description = "..."`: free text for documentation
//!
//! `#[derive(Bindable)]` (from `route-bind-macros`) turns those tags into a static field
//! table. [`RequestDescriptor::build`] checks the table against a route template once;
//! [`RequestDescriptor::bind`] then runs the body, path, query, header, validation and hook
//! stages for each request, collecting every failure into [`BindErrors`].
//!
//! ## Example
//!
//! ```ignore
//! use route_bind_core::{DescriptorCache, Bindable};
//!
//! #[derive(Debug, Default, Bindable)]
//! struct GetUser {
//!     #[bind(path = "id")]
//!     id: u64,
//!     #[bind(header = "apikey,required")]
//!     api_key: String,
//! }
//!
//! let cache = DescriptorCache::new();
//! let descriptor = cache.get_or_build::<GetUser>("/users/:id")?;
//! let outcome = descriptor.bind(&parts, body);
//! let user = outcome.into_result()?;
//! ```

pub mod bindable;
pub mod binder;
pub mod cache;
pub mod coerce;
pub mod descriptor;
pub mod duration;
pub mod error;
pub mod field;
pub mod metrics;
pub mod pattern;
pub mod payload;
pub mod timestamp;
pub mod validate;

pub use bindable::{
    Bindable, BodyValue, Capabilities, PostParseHook, Validatable, ValidatorFactory,
};
pub use binder::{BindOutcome, BindStage, BodyResult};
pub use cache::DescriptorCache;
pub use coerce::{Coerce, coerce_into};
pub use descriptor::{BodyStrategy, FieldBinding, FieldRules, RequestDescriptor, Source};
pub use error::{
    BindError, BindErrors, BindingError, BuildError, CoercionError, CoercionErrorKind,
    PatternError, ValidationError,
};
pub use field::{FieldKind, FieldSpec, FieldTags, FieldValue, Inspect, Tag};
pub use pattern::{Notation, PathCaptures, PathPattern};
pub use payload::{Format, Payload};
pub use validate::Validator;
