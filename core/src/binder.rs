//! The binding pipeline.
//!
//! [`RequestDescriptor::bind`] populates a fresh value from one request in fixed stages:
//! body, path, query, header, validation, hooks. Failures accumulate, so a response can
//! report every bad input at once. The one exception is a request path that does not match
//! the template: nothing else about such a request is meaningful, so the pipeline stops
//! there and no hook runs.

use crate::bindable::{Bindable, BodyValue};
use crate::descriptor::{BodyStrategy, FieldBinding, RequestDescriptor};
use crate::error::{BindErrors, BindingError, ValidationError};
use crate::metrics::BindMetrics;
use crate::payload::Payload;
use bytes::Bytes;
use http::request::Parts;

/// Body bytes as delivered by the transport.
pub type BodyResult = Result<Bytes, std::io::Error>;

/// Last pipeline stage that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindStage {
    /// Nothing ran.
    NotStarted,
    /// The body stage finished.
    BodyDone,
    /// The path stage finished.
    PathDone,
    /// The query stage finished.
    QueryDone,
    /// The header stage finished.
    HeaderDone,
    /// Structural and custom validation finished.
    Validated,
    /// The post-parse hook ran (or was not declared).
    Finalized,
}

impl BindStage {
    /// Stage name used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::BodyDone => "body",
            Self::PathDone => "path",
            Self::QueryDone => "query",
            Self::HeaderDone => "header",
            Self::Validated => "validated",
            Self::Finalized => "finalized",
        }
    }
}

/// Result of binding one request.
///
/// `value` is always returned, populated as far as binding got, so callers can log or
/// inspect partial input.
#[derive(Debug)]
pub struct BindOutcome<T> {
    /// The (possibly partially) populated value.
    pub value: T,
    /// `Ok(())` or every collected failure.
    pub result: Result<(), BindErrors>,
    /// Last completed stage.
    pub stage: BindStage,
    /// Body kept as-is because its content type has no decoder.
    pub raw_body: Option<Payload>,
}

impl<T> BindOutcome<T> {
    /// Whether binding succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// The value on success, the errors otherwise.
    ///
    /// # Errors
    ///
    /// Returns the collected [`BindErrors`].
    pub fn into_result(self) -> Result<T, BindErrors> {
        self.result.map(|()| self.value)
    }
}

struct Binder<'a, T> {
    descriptor: &'a RequestDescriptor<T>,
    parts: &'a Parts,
    value: T,
    errors: BindErrors,
    stage: BindStage,
    raw_body: Option<Payload>,
}

impl<T: Bindable> RequestDescriptor<T> {
    /// Bind one request into a fresh `T`.
    pub fn bind(&self, parts: &Parts, body: BodyResult) -> BindOutcome<T> {
        let outcome = Binder::new(self, parts).run(body);
        if let Err(errors) = &outcome.result {
            BindMetrics::record_failure(self.type_name(), outcome.stage.as_str());
            tracing::debug!(
                type_name = self.type_name(),
                path = parts.uri.path(),
                stage = outcome.stage.as_str(),
                errors = errors.len(),
                "Request binding failed"
            );
        }
        outcome
    }
}

impl<'a, T: Bindable> Binder<'a, T> {
    fn new(descriptor: &'a RequestDescriptor<T>, parts: &'a Parts) -> Self {
        Self {
            descriptor,
            parts,
            value: T::default(),
            errors: BindErrors::new(),
            stage: BindStage::NotStarted,
            raw_body: None,
        }
    }

    fn run(mut self, body: BodyResult) -> BindOutcome<T> {
        self.bind_body(body);
        self.stage = BindStage::BodyDone;

        if let Err(mismatch) = self.bind_path() {
            let mut errors = self.errors;
            errors.push(mismatch);
            return BindOutcome {
                value: self.value,
                result: Err(errors),
                stage: self.stage,
                raw_body: self.raw_body,
            };
        }
        self.stage = BindStage::PathDone;

        self.bind_query();
        self.stage = BindStage::QueryDone;

        self.bind_headers();
        self.stage = BindStage::HeaderDone;

        self.validate();
        self.stage = BindStage::Validated;

        let accumulated = std::mem::take(&mut self.errors).into_result();
        let result = if self.descriptor.capabilities().post_parse {
            self.value.hook_post_parse(accumulated)
        } else {
            accumulated
        };
        BindOutcome {
            value: self.value,
            result,
            stage: BindStage::Finalized,
            raw_body: self.raw_body,
        }
    }

    fn bind_body(&mut self, body: BodyResult) {
        let strategy = self.descriptor.body();
        if strategy == BodyStrategy::None {
            return;
        }
        let bytes = match body {
            Ok(bytes) => bytes,
            Err(error) => {
                self.errors.push(BindingError::BodyRead {
                    reason: error.to_string(),
                });
                return;
            }
        };

        let result = match strategy {
            BodyStrategy::None => Ok(()),
            BodyStrategy::RawBytes { index, .. } => self.value.assign_body(index, BodyValue::Bytes(bytes)),
            BodyStrategy::RawString { index, field } => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => self.value.assign_body(index, BodyValue::Text(text)),
                Err(_) => Err(BindingError::InvalidUtf8 {
                    field: field.to_string(),
                }),
            },
            BodyStrategy::Decode { index, .. } => {
                let payload = Payload::from_headers(&self.parts.headers, bytes);
                self.decode_into(&payload, |value, payload| {
                    value.assign_body(index, BodyValue::Encoded(payload))
                })
            }
            BodyStrategy::DecodeSelf => {
                let payload = Payload::from_headers(&self.parts.headers, bytes);
                self.decode_into(&payload, |value, payload| {
                    *value = T::decode_self(payload)?;
                    Ok(())
                })
            }
        };
        self.errors.join(result);
    }

    /// Empty bodies leave the target at its default. Bodies without a decoder are kept raw.
    fn decode_into(
        &mut self,
        payload: &Payload,
        apply: impl FnOnce(&mut T, &Payload) -> Result<(), BindingError>,
    ) -> Result<(), BindingError> {
        if payload.is_empty() {
            return Ok(());
        }
        if !payload.format().is_decodable() {
            self.raw_body = Some(payload.clone());
            return Ok(());
        }
        apply(&mut self.value, payload)
    }

    /// Runs the match even when no field binds a parameter.
    fn bind_path(&mut self) -> Result<(), BindingError> {
        let bindings = self.descriptor.path_bindings();
        let pattern = self.descriptor.pattern();
        let path = self.parts.uri.path();
        let Some(captures) = pattern.captures(path) else {
            return Err(BindingError::PathMismatch {
                path: path.to_string(),
                template: pattern.template().to_string(),
            });
        };

        for binding in bindings {
            let Some(raw) = captures.get(&binding.wire_name) else {
                continue;
            };
            match urlencoding::decode(raw) {
                Ok(decoded) => {
                    let result = self.value.coerce_field(binding.index, &decoded);
                    self.errors.join(result);
                }
                Err(_) => self.errors.push(BindingError::InvalidPathEncoding {
                    name: binding.wire_name.clone(),
                }),
            }
        }
        Ok(())
    }

    fn bind_query(&mut self) {
        let bindings = self.descriptor.query_bindings();
        if bindings.is_empty() {
            return;
        }
        let query = self.parts.uri.query().unwrap_or_default();
        let pairs: Vec<(String, String)> = match serde_urlencoded::from_str(query) {
            Ok(pairs) => pairs,
            Err(error) => {
                self.errors.push(BindingError::MalformedQuery {
                    reason: error.to_string(),
                });
                return;
            }
        };

        for binding in bindings {
            let value = pairs
                .iter()
                .find(|(key, _)| *key == binding.wire_name)
                .map(|(_, value)| value.as_str())
                .filter(|value| !value.is_empty());
            match value {
                Some(raw) => {
                    let result = self.value.coerce_field(binding.index, raw);
                    self.errors.join(result);
                }
                None if binding.required => self.errors.push(BindingError::MissingQuery {
                    name: binding.wire_name.clone(),
                }),
                None => {}
            }
        }
    }

    fn bind_headers(&mut self) {
        for binding in self.descriptor.header_bindings() {
            match header_value(self.parts, binding) {
                Ok(Some(raw)) => {
                    let result = self.value.coerce_field(binding.index, raw);
                    self.errors.join(result);
                }
                Ok(None) if binding.required => self.errors.push(BindingError::MissingHeader {
                    name: binding.wire_name.clone(),
                }),
                Ok(None) => {}
                Err(error) => self.errors.push(error),
            }
        }
    }

    fn validate(&mut self) {
        let capabilities = self.descriptor.capabilities();
        if self.descriptor.requires_validation() {
            let validator = if capabilities.validator_factory {
                self.value.hook_validator()
            } else {
                crate::validate::Validator::default()
            };
            for rules in self.descriptor.validation_rules() {
                let result = match self.value.field_value(rules.index) {
                    Some(view) => validator.validate_field(rules.field, rules.rules, &view),
                    None => Err(ValidationError::custom(format!(
                        "field '{}' cannot be inspected for validation",
                        rules.field
                    ))),
                };
                self.errors.join(result);
            }
        }
        if capabilities.custom_validator {
            let result = self.value.hook_validate();
            self.errors.join(result);
        }
    }
}

/// Header text for `binding`; empty values count as absent.
fn header_value<'p>(parts: &'p Parts, binding: &FieldBinding) -> Result<Option<&'p str>, BindingError> {
    let Some(value) = parts.headers.get(binding.wire_name.as_str()) else {
        return Ok(None);
    };
    let text = value.to_str().map_err(|_| BindingError::InvalidHeader {
        name: binding.wire_name.clone(),
    })?;
    Ok(Some(text).filter(|t| !t.is_empty()))
}
