//! Per-type binding plans.
//!
//! A [`RequestDescriptor`] is built once per request type and route template. It records
//! which field receives each path parameter, query parameter and header, how the body is
//! delivered, which fields carry validation rules, and which hooks the type implements.
//! Building checks that path-tagged fields and template parameters correspond one-to-one, so
//! a mismatch is a registration failure instead of a per-request surprise.

use crate::bindable::{Bindable, Capabilities};
use crate::error::BuildError;
use crate::field::{FieldKind, FieldSpec, Tag};
use crate::pattern::PathPattern;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Where a bound value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// A path parameter.
    Path,
    /// A query parameter.
    Query,
    /// A request header.
    Header,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
        })
    }
}

/// One field bound to a wire name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// Field index in the type's field table.
    pub index: usize,
    /// Rust field name.
    pub field: &'static str,
    /// Value source.
    pub source: Source,
    /// Parameter or header name on the wire.
    pub wire_name: String,
    /// Absence is an error.
    pub required: bool,
}

/// How the request body reaches the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    /// The body is ignored.
    None,
    /// The body bytes are copied into a byte-sequence field.
    RawBytes {
        /// Field index.
        index: usize,
        /// Field name.
        field: &'static str,
    },
    /// The body is stored as UTF-8 text in a string field.
    RawString {
        /// Field index.
        index: usize,
        /// Field name.
        field: &'static str,
    },
    /// The body is decoded into a struct, map or sequence field.
    Decode {
        /// Field index.
        index: usize,
        /// Field name.
        field: &'static str,
        /// Field type as written in the source.
        target: &'static str,
    },
    /// The body is decoded into the whole value.
    DecodeSelf,
}

/// Validation rules declared on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    /// Field index.
    pub index: usize,
    /// Field name.
    pub field: &'static str,
    /// Comma-separated rule list.
    pub rules: &'static str,
}

/// Compiled binding plan for request type `T` under one route template.
///
/// Immutable after construction and safe to share between threads.
pub struct RequestDescriptor<T> {
    type_name: &'static str,
    pattern: PathPattern,
    paths: Vec<FieldBinding>,
    queries: Vec<FieldBinding>,
    headers: Vec<FieldBinding>,
    body: BodyStrategy,
    rules: Vec<FieldRules>,
    descriptions: HashMap<&'static str, &'static str>,
    capabilities: Capabilities,
    _marker: PhantomData<fn() -> T>,
}

fn binding(index: usize, spec: &FieldSpec, source: Source, tag: &Tag) -> FieldBinding {
    let wire_name = if tag.name().is_empty() {
        spec.name.to_string()
    } else {
        tag.name().to_string()
    };
    FieldBinding {
        index,
        field: spec.name,
        source,
        wire_name,
        required: tag.has_modifier("required"),
    }
}

fn body_strategy(type_name: &'static str, index: usize, spec: &FieldSpec) -> Result<BodyStrategy, BuildError> {
    match spec.kind {
        FieldKind::Bytes => Ok(BodyStrategy::RawBytes {
            index,
            field: spec.name,
        }),
        FieldKind::Text => Ok(BodyStrategy::RawString {
            index,
            field: spec.name,
        }),
        FieldKind::Struct | FieldKind::Map | FieldKind::Sequence => Ok(BodyStrategy::Decode {
            index,
            field: spec.name,
            target: spec.ty,
        }),
        FieldKind::Scalar => Err(BuildError::UnsupportedBody {
            type_name,
            field: spec.name,
            kind: spec.kind,
        }),
    }
}

fn check_path_bindings(
    type_name: &'static str,
    pattern: &PathPattern,
    paths: &[FieldBinding],
) -> Result<(), BuildError> {
    let mut by_param: HashMap<&str, &'static str> = HashMap::new();
    for binding in paths {
        if let Some(first) = by_param.insert(binding.wire_name.as_str(), binding.field) {
            return Err(BuildError::DuplicatePathField {
                type_name,
                param: binding.wire_name.clone(),
                first,
                second: binding.field,
            });
        }
    }

    for param in pattern.params() {
        if !by_param.contains_key(param.as_str()) {
            return Err(BuildError::MissingPathField {
                type_name,
                template: pattern.template().to_string(),
                param: param.clone(),
            });
        }
    }

    for binding in paths {
        if !pattern.params().contains(&binding.wire_name) {
            return Err(BuildError::MissingPathParam {
                type_name,
                template: pattern.template().to_string(),
                field: binding.field,
                param: binding.wire_name.clone(),
            });
        }
    }
    Ok(())
}

impl<T: Bindable> RequestDescriptor<T> {
    /// Build the binding plan for `T` under `template`.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] when two fields claim the body, the body field cannot hold a
    /// body, the template is invalid, or path fields and template parameters do not
    /// correspond one-to-one.
    pub fn build(template: &str) -> Result<Self, BuildError> {
        let type_name = T::TYPE_NAME;
        let mut paths = Vec::new();
        let mut queries = Vec::new();
        let mut headers = Vec::new();
        let mut rules = Vec::new();
        let mut descriptions = HashMap::new();
        let mut body_field: Option<(usize, &FieldSpec)> = None;
        let mut any_json = false;

        for (index, spec) in T::FIELDS.iter().enumerate() {
            any_json |= spec.json;

            if let Some(tag) = spec.tags.path.and_then(Tag::parse) {
                paths.push(binding(index, spec, Source::Path, &tag));
            }
            if let Some(tag) = spec.tags.query.and_then(Tag::parse) {
                queries.push(binding(index, spec, Source::Query, &tag));
            }
            if let Some(tag) = spec.tags.header.and_then(Tag::parse) {
                headers.push(binding(index, spec, Source::Header, &tag));
            }
            if spec.tags.body.is_some_and(|b| !b.is_empty()) {
                if let Some((_, first)) = body_field {
                    return Err(BuildError::DuplicateBody {
                        type_name,
                        first: first.name,
                        second: spec.name,
                    });
                }
                body_field = Some((index, spec));
            }
            if let Some(list) = spec.tags.validate.filter(|v| !v.is_empty()) {
                rules.push(FieldRules {
                    index,
                    field: spec.name,
                    rules: list,
                });
            }
            if let Some(text) = spec.tags.description.filter(|d| !d.is_empty()) {
                descriptions.insert(spec.name, text);
            }
        }

        let body = match body_field {
            Some((index, spec)) => body_strategy(type_name, index, spec)?,
            None if any_json => BodyStrategy::DecodeSelf,
            None => BodyStrategy::None,
        };

        let pattern = PathPattern::compile(template)?;
        check_path_bindings(type_name, &pattern, &paths)?;

        Ok(Self {
            type_name,
            pattern,
            paths,
            queries,
            headers,
            body,
            rules,
            descriptions,
            capabilities: T::CAPABILITIES,
            _marker: PhantomData,
        })
    }
}

impl<T> RequestDescriptor<T> {
    /// Name of the request type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Route template the descriptor was built for.
    #[must_use]
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    /// Compiled route template.
    #[must_use]
    pub const fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Template parameter names, in order.
    #[must_use]
    pub fn path_params(&self) -> &[String] {
        self.pattern.params()
    }

    /// Path parameter bindings.
    #[must_use]
    pub fn path_bindings(&self) -> &[FieldBinding] {
        &self.paths
    }

    /// Query parameter bindings.
    #[must_use]
    pub fn query_bindings(&self) -> &[FieldBinding] {
        &self.queries
    }

    /// Header bindings.
    #[must_use]
    pub fn header_bindings(&self) -> &[FieldBinding] {
        &self.headers
    }

    /// Body delivery strategy.
    #[must_use]
    pub const fn body(&self) -> BodyStrategy {
        self.body
    }

    /// Whether any field declares validation rules.
    #[must_use]
    pub fn requires_validation(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Per-field validation rules.
    #[must_use]
    pub fn validation_rules(&self) -> &[FieldRules] {
        &self.rules
    }

    /// Hooks implemented by the type.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Free-text description declared on `field`.
    #[must_use]
    pub fn description(&self, field: &str) -> Option<&'static str> {
        self.descriptions.get(field).copied()
    }
}

impl<T> fmt::Debug for RequestDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("type_name", &self.type_name)
            .field("template", &self.pattern.template())
            .field("paths", &self.paths)
            .field("queries", &self.queries)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("rules", &self.rules)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl<T> PartialEq for RequestDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.pattern == other.pattern
            && self.paths == other.paths
            && self.queries == other.queries
            && self.headers == other.headers
            && self.body == other.body
            && self.rules == other.rules
            && self.descriptions == other.descriptions
            && self.capabilities == other.capabilities
    }
}

impl<T> Eq for RequestDescriptor<T> {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::bindable::BodyValue;
    use crate::error::{BindingError, CoercionError, CoercionErrorKind};
    use crate::field::{FieldTags, FieldValue};

    macro_rules! spec {
        ($name:literal, $kind:ident, $($tag:ident = $value:literal),*) => {
            FieldSpec {
                name: $name,
                ty: "T",
                kind: FieldKind::$kind,
                tags: FieldTags { $($tag: Some($value),)* ..FieldTags::NONE },
                json: false,
            }
        };
    }

    macro_rules! fixture {
        ($ty:ident, [$($spec:expr),* $(,)?]) => {
            #[derive(Default)]
            struct $ty;

            impl Bindable for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);
                const FIELDS: &'static [FieldSpec] = &[$($spec),*];

                fn coerce_field(&mut self, index: usize, _raw: &str) -> Result<(), CoercionError> {
                    Err(CoercionError::new(Self::TYPE_NAME, CoercionErrorKind::UnknownField(index)))
                }

                fn assign_body(&mut self, _index: usize, body: BodyValue<'_>) -> Result<(), BindingError> {
                    Err(BindingError::BodyMismatch { field: Self::TYPE_NAME.into(), strategy: body.strategy() })
                }

                fn field_value(&self, _index: usize) -> Option<FieldValue<'_>> {
                    None
                }
            }
        };
    }

    fixture!(UserRequest, [
        spec!("id", Scalar, path = "id"),
        spec!("verbose", Scalar, query = "verbose,required"),
        spec!("api_key", Text, header = "apikey", validate = "required", description = "caller key"),
        spec!("payload", Struct, body = "payload"),
    ]);

    fixture!(TwoBodies, [
        spec!("first", Struct, body = "first"),
        spec!("second", Text, body = "second"),
    ]);

    fixture!(ScalarBody, [spec!("count", Scalar, body = "count")]);

    fixture!(SharedParam, [
        spec!("a", Scalar, path = "id"),
        spec!("b", Scalar, path = "id"),
    ]);

    fixture!(EmptyTags, [spec!("ignored", Scalar, path = "", query = "")]);

    #[test]
    fn test_build_records_bindings() {
        let descriptor = RequestDescriptor::<UserRequest>::build("/users/:id").expect("valid");
        assert_eq!(descriptor.type_name(), "UserRequest");
        assert_eq!(descriptor.path_params(), ["id".to_string()]);
        assert_eq!(descriptor.path_bindings()[0].field, "id");

        let query = &descriptor.query_bindings()[0];
        assert_eq!(query.wire_name, "verbose");
        assert!(query.required);

        let header = &descriptor.header_bindings()[0];
        assert_eq!(header.wire_name, "apikey");
        assert!(!header.required);

        assert_eq!(
            descriptor.body(),
            BodyStrategy::Decode {
                index: 3,
                field: "payload",
                target: "T"
            }
        );
        assert!(descriptor.requires_validation());
        assert_eq!(descriptor.description("api_key"), Some("caller key"));
        assert_eq!(descriptor.description("id"), None);
    }

    #[test]
    fn test_duplicate_body() {
        assert_eq!(
            RequestDescriptor::<TwoBodies>::build("/x"),
            Err(BuildError::DuplicateBody {
                type_name: "TwoBodies",
                first: "first",
                second: "second"
            })
        );
    }

    #[test]
    fn test_scalar_body_rejected() {
        assert!(matches!(
            RequestDescriptor::<ScalarBody>::build("/x"),
            Err(BuildError::UnsupportedBody { field: "count", .. })
        ));
    }

    #[test]
    fn test_path_correspondence() {
        assert!(matches!(
            RequestDescriptor::<UserRequest>::build("/users"),
            Err(BuildError::MissingPathParam { field: "id", .. })
        ));
        assert!(matches!(
            RequestDescriptor::<UserRequest>::build("/users/:id/:extra"),
            Err(BuildError::MissingPathField { ref param, .. }) if param == "extra"
        ));
        assert!(matches!(
            RequestDescriptor::<SharedParam>::build("/x/:id"),
            Err(BuildError::DuplicatePathField { first: "a", second: "b", .. })
        ));
    }

    #[test]
    fn test_pattern_errors_propagate() {
        assert!(matches!(
            RequestDescriptor::<UserRequest>::build("/users/{id"),
            Err(BuildError::Pattern(_))
        ));
    }

    #[test]
    fn test_empty_tags_are_absent() {
        let descriptor = RequestDescriptor::<EmptyTags>::build("/x").expect("valid");
        assert!(descriptor.path_bindings().is_empty());
        assert!(descriptor.query_bindings().is_empty());
        assert_eq!(descriptor.body(), BodyStrategy::None);
        assert!(!descriptor.requires_validation());
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = RequestDescriptor::<UserRequest>::build("/users/{id}").expect("valid");
        let second = RequestDescriptor::<UserRequest>::build("/users/{id}").expect("valid");
        assert_eq!(first, second);
    }
}
