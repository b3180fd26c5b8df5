//! The contract between request types and the binder.
//!
//! Request types normally get their [`Bindable`] implementation from
//! `#[derive(Bindable)]`, which emits the static field table and the per-field setters the
//! binder dispatches to by index. Optional behaviour is expressed through three hook traits.
//! A type opts into each hook with a struct-level flag (`#[bind(validate_self)]`,
//! `#[bind(validator_factory)]`, `#[bind(post_parse)]`) and implements the trait by hand.

use crate::error::{BindErrors, BindingError, CoercionError, ValidationError};
use crate::field::{FieldSpec, FieldValue};
use crate::payload::Payload;
use crate::validate::Validator;
use bytes::Bytes;

/// Optional hooks a request type opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// The type implements [`Validatable`].
    pub custom_validator: bool,
    /// The type implements [`ValidatorFactory`].
    pub validator_factory: bool,
    /// The type implements [`PostParseHook`].
    pub post_parse: bool,
}

impl Capabilities {
    /// No hooks.
    pub const NONE: Self = Self {
        custom_validator: false,
        validator_factory: false,
        post_parse: false,
    };
}

/// A type that validates itself after structural validation.
pub trait Validatable {
    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns the violated invariant.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A type that supplies its own [`Validator`], typically to register custom rules.
pub trait ValidatorFactory {
    /// Build the validator used for this request.
    fn new_validator(&self) -> Validator;
}

/// A type that inspects (and may replace) the binding outcome.
pub trait PostParseHook {
    /// Receive the accumulated outcome and return the final one.
    ///
    /// # Errors
    ///
    /// Returns the errors that should be reported for the request.
    fn post_parse(&mut self, outcome: Result<(), BindErrors>) -> Result<(), BindErrors>;
}

/// A body handed to a field setter.
#[derive(Debug)]
pub enum BodyValue<'a> {
    /// Raw bytes for byte-sequence fields.
    Bytes(Bytes),
    /// UTF-8 text for string fields.
    Text(String),
    /// A payload to decode into the field's type.
    Encoded(&'a Payload),
}

impl BodyValue<'_> {
    /// Strategy name used in error messages.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "raw-bytes",
            Self::Text(_) => "raw-string",
            Self::Encoded(_) => "decoded",
        }
    }
}

/// A request type the binder can populate.
///
/// Fields are addressed by their index in [`FIELDS`](Bindable::FIELDS).
pub trait Bindable: Default + Send + Sized + 'static {
    /// Type name used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Every named field, in declaration order.
    const FIELDS: &'static [FieldSpec];

    /// Hooks this type implements.
    const CAPABILITIES: Capabilities = Capabilities::NONE;

    /// Coerce `raw` into the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionError`] naming the field when `raw` is invalid; the field keeps its
    /// previous value.
    fn coerce_field(&mut self, index: usize, raw: &str) -> Result<(), CoercionError>;

    /// Store a request body in the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] when decoding fails or the field cannot take this body shape.
    fn assign_body(&mut self, index: usize, body: BodyValue<'_>) -> Result<(), BindingError>;

    /// Decode the whole type from the body.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] when the type is not deserializable or decoding fails.
    fn decode_self(payload: &Payload) -> Result<Self, BindingError> {
        let _ = payload;
        Err(BindingError::BodyMismatch {
            field: Self::TYPE_NAME.to_string(),
            strategy: "decode-self",
        })
    }

    /// View the field at `index` for validation.
    fn field_value(&self, index: usize) -> Option<FieldValue<'_>>;

    /// Dispatch to [`Validatable::validate`] when declared.
    ///
    /// # Errors
    ///
    /// Returns the type's own validation failure.
    fn hook_validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Dispatch to [`ValidatorFactory::new_validator`] when declared.
    fn hook_validator(&self) -> Validator {
        Validator::default()
    }

    /// Dispatch to [`PostParseHook::post_parse`] when declared.
    ///
    /// # Errors
    ///
    /// Returns the outcome produced by the hook.
    fn hook_post_parse(&mut self, outcome: Result<(), BindErrors>) -> Result<(), BindErrors> {
        outcome
    }
}
