//! Error taxonomy for descriptor building and request binding.
//!
//! Two families live here:
//!
//! - **Build errors** ([`BuildError`], [`PatternError`]) are programming-time contract
//!   violations. They surface once, when a request type is registered, and must never be
//!   retried with partial state.
//! - **Bind errors** ([`CoercionError`], [`BindingError`], [`ValidationError`]) describe bad
//!   input on a single request. They are recoverable and accumulate into [`BindErrors`] so one
//!   bad header does not hide a bad query parameter.

use crate::field::FieldKind;
use std::fmt;
use thiserror::Error;

/// Errors raised while compiling a path template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The template could not be parsed.
    #[error("malformed path template '{template}': {reason}")]
    Malformed {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The template uses both `:name` and `{name}` placeholders.
    #[error("path template '{template}' mixes ':name' and '{{name}}' placeholders")]
    MixedNotation {
        /// The offending template.
        template: String,
    },

    /// A parameter name appears more than once.
    #[error("path template '{template}' declares parameter '{name}' more than once")]
    DuplicateParameter {
        /// The offending template.
        template: String,
        /// The repeated parameter name.
        name: String,
    },

    /// The generated match expression was rejected by the regex engine.
    #[error("path template '{template}' could not be compiled: {reason}")]
    Compile {
        /// The offending template.
        template: String,
        /// Regex engine diagnostic.
        reason: String,
    },
}

/// Fatal errors raised while building a [`RequestDescriptor`](crate::RequestDescriptor).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The route template is invalid.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Two fields carry the `body` tag.
    #[error(
        "field '{second}' of {type_name} has tag body, but previous field '{first}' also has it; only one field may own the body"
    )]
    DuplicateBody {
        /// Request type name.
        type_name: &'static str,
        /// The field that claimed the body first.
        first: &'static str,
        /// The field that tried to claim it again.
        second: &'static str,
    },

    /// The body field's type cannot hold a request body.
    #[error("field '{field}' of {type_name} cannot own the body: {kind} fields are not decodable")]
    UnsupportedBody {
        /// Request type name.
        type_name: &'static str,
        /// The body field.
        field: &'static str,
        /// Its classified kind.
        kind: FieldKind,
    },

    /// Two fields are bound to the same path parameter.
    #[error("fields '{first}' and '{second}' of {type_name} are both bound to path parameter '{param}'")]
    DuplicatePathField {
        /// Request type name.
        type_name: &'static str,
        /// Parameter name.
        param: String,
        /// First bound field.
        first: &'static str,
        /// Second bound field.
        second: &'static str,
    },

    /// The template declares a parameter that no field is bound to.
    #[error("expected a field with 'path' tag '{param}' in {type_name} for endpoint path '{template}'")]
    MissingPathField {
        /// Request type name.
        type_name: &'static str,
        /// Route template.
        template: String,
        /// The unbound parameter.
        param: String,
    },

    /// A field is bound to a parameter the template does not declare.
    #[error("field '{field}' of {type_name} expects path param '{param}' in endpoint path '{template}'")]
    MissingPathParam {
        /// Request type name.
        type_name: &'static str,
        /// Route template.
        template: String,
        /// The field carrying the `path` tag.
        field: &'static str,
        /// The parameter it names.
        param: String,
    },

    /// The type is already cached under a different template.
    #[error("{type_name} is registered with template '{registered}' and cannot be registered with '{requested}'")]
    TemplateConflict {
        /// Request type name.
        type_name: &'static str,
        /// Template already in the cache.
        registered: String,
        /// Template requested now.
        requested: String,
    },
}

/// The reason a textual value could not be coerced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionErrorKind {
    /// The text is not valid for the target kind.
    #[error("parsing \"{value}\" as {target}: invalid syntax")]
    Syntax {
        /// Target kind name.
        target: &'static str,
        /// The rejected text.
        value: String,
    },

    /// The text is well-formed but does not fit the target width.
    #[error("parsing \"{value}\" as {target}: value out of range")]
    Range {
        /// Target kind name.
        target: &'static str,
        /// The rejected text.
        value: String,
    },

    /// No timestamp layout accepted the text.
    #[error("value \"{value}\" could not be parsed as a timestamp")]
    Timestamp {
        /// The rejected text.
        value: String,
    },

    /// The text is not a valid duration.
    #[error("invalid duration \"{value}\": {reason}")]
    Duration {
        /// The rejected text.
        value: String,
        /// Grammar violation.
        reason: &'static str,
    },

    /// The binder addressed a field that has no coercion arm.
    #[error("no coercible field at index {0}")]
    UnknownField(usize),
}

/// A coercion failure attributed to the field that owns the value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} - {kind}")]
pub struct CoercionError {
    field: String,
    #[source]
    kind: CoercionErrorKind,
}

impl CoercionError {
    /// Attribute a coercion failure to `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: CoercionErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    /// Name of the field the value was destined for.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Why the value was rejected.
    #[must_use]
    pub const fn kind(&self) -> &CoercionErrorKind {
        &self.kind
    }
}

/// Request-shape failures that are not tied to converting a single value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The request path does not match the endpoint template.
    ///
    /// This is a total failure: the pipeline stops and no hook may clear it.
    #[error("path '{path}' does not match endpoint template '{template}'")]
    PathMismatch {
        /// Request path.
        path: String,
        /// Endpoint template.
        template: String,
    },

    /// A captured path segment is not valid percent-encoded UTF-8.
    #[error("path parameter '{name}' is not valid percent-encoded UTF-8")]
    InvalidPathEncoding {
        /// Parameter name.
        name: String,
    },

    /// A header declared `required` is absent.
    #[error("missing required header {name} from request")]
    MissingHeader {
        /// Header name.
        name: String,
    },

    /// A header value contains bytes that are not visible ASCII.
    #[error("header {name} contains characters that are not visible ASCII")]
    InvalidHeader {
        /// Header name.
        name: String,
    },

    /// A query parameter declared `required` is absent.
    #[error("missing required query parameter {name} from request")]
    MissingQuery {
        /// Query parameter name.
        name: String,
    },

    /// The query string could not be parsed.
    #[error("malformed query string: {reason}")]
    MalformedQuery {
        /// Parser diagnostic.
        reason: String,
    },

    /// Reading the request body failed (including cancellation).
    #[error("failed to read request body: {reason}")]
    BodyRead {
        /// I/O diagnostic.
        reason: String,
    },

    /// The body could not be decoded with the selected codec.
    #[error("failed to decode {format} body into '{target}': {reason}")]
    Decode {
        /// Field (or type) receiving the body.
        target: String,
        /// Codec name.
        format: &'static str,
        /// Codec diagnostic.
        reason: String,
    },

    /// The request content type has no decoder.
    #[error("content type '{content_type}' cannot be decoded into '{target}'")]
    UnsupportedContentType {
        /// Field (or type) receiving the body.
        target: String,
        /// Content type sent by the client.
        content_type: String,
    },

    /// A raw-string body is not valid UTF-8.
    #[error("body for field '{field}' is not valid UTF-8")]
    InvalidUtf8 {
        /// Body field.
        field: String,
    },

    /// The generated body setter received a body shape it does not accept.
    #[error("field '{field}' cannot receive a {strategy} body")]
    BodyMismatch {
        /// Body field.
        field: String,
        /// Strategy the binder tried to apply.
        strategy: &'static str,
    },
}

/// A structural validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field failed a declared rule.
    #[error("field validation for '{field}' failed on the '{rule}' rule")]
    Rule {
        /// Field name.
        field: String,
        /// Rule name (without parameter).
        rule: String,
    },

    /// A field declares a rule the validator does not know.
    #[error("field '{field}' declares undefined validation rule '{rule}'")]
    UndefinedRule {
        /// Field name.
        field: String,
        /// Unknown rule name.
        rule: String,
    },

    /// A rule parameter could not be interpreted.
    #[error("field '{field}' has an invalid parameter for rule '{rule}': '{param}'")]
    InvalidParameter {
        /// Field name.
        field: String,
        /// Rule name.
        rule: String,
        /// Rejected parameter.
        param: String,
    },

    /// Free-form failure produced by a type's own validation hook.
    #[error("{0}")]
    Custom(String),
}

impl ValidationError {
    /// Create a free-form validation failure.
    #[must_use]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Any recoverable, per-request failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A value could not be converted for its field.
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// The request shape is wrong.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The populated value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl BindError {
    /// Whether this is the total-failure path mismatch.
    #[must_use]
    pub const fn is_path_mismatch(&self) -> bool {
        matches!(self, Self::Binding(BindingError::PathMismatch { .. }))
    }
}

/// Composite of every failure collected while binding one request.
///
/// Displays as the individual messages joined by newlines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindErrors {
    errors: Vec<BindError>,
}

impl BindErrors {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Append one failure.
    pub fn push(&mut self, error: impl Into<BindError>) {
        self.errors.push(error.into());
    }

    /// Append every failure of `other`.
    pub fn append(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Join a stage result into this collection.
    pub fn join<E: Into<BindError>>(&mut self, result: Result<(), E>) {
        if let Err(error) = result {
            self.push(error);
        }
    }

    /// Number of collected failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate the collected failures in the order they happened.
    pub fn iter(&self) -> std::slice::Iter<'_, BindError> {
        self.errors.iter()
    }

    /// One human-readable message per failure.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one failure was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for BindErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BindErrors {}

macro_rules! impl_from_single {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for BindErrors {
                fn from(error: $source) -> Self {
                    Self {
                        errors: vec![error.into()],
                    }
                }
            }
        )*
    };
}

impl_from_single!(BindError, CoercionError, BindingError, ValidationError);

impl IntoIterator for BindErrors {
    type Item = BindError;
    type IntoIter = std::vec::IntoIter<BindError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a BindErrors {
    type Item = &'a BindError;
    type IntoIter = std::slice::Iter<'a, BindError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
