//! Static field metadata emitted by `#[derive(Bindable)]`.
//!
//! The derive macro turns every named field of a request type into a [`FieldSpec`]: the
//! field's name, a syntactic classification of its type ([`FieldKind`]) and the raw text of
//! its `#[bind(...)]` tags. The descriptor builder interprets these tables at runtime; nothing
//! here performs any binding work on its own.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Syntactic classification of a field's type.
///
/// `Option<T>`, `Box<T>` and friends are classified by their inner type, so a boxed struct
/// counts as [`FieldKind::Struct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `Vec<u8>`, `Bytes`. Fixed-size arrays are sequences.
    Bytes,
    /// `String`, `&str`.
    Text,
    /// Numbers, booleans, timestamps, durations.
    Scalar,
    /// Any other named type.
    Struct,
    /// `HashMap`, `BTreeMap`.
    Map,
    /// `Vec<T>` for non-byte `T`, sets, tuples.
    Sequence,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bytes => "byte-sequence",
            Self::Text => "string",
            Self::Scalar => "scalar",
            Self::Struct => "struct",
            Self::Map => "map",
            Self::Sequence => "sequence",
        };
        f.write_str(name)
    }
}

/// Raw tag values declared on one field.
///
/// Each value is the literal text from `#[bind(tag = "...")]`, modifiers included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldTags {
    /// `path = "name"`
    pub path: Option<&'static str>,
    /// `query = "name[,required]"`
    pub query: Option<&'static str>,
    /// `header = "name[,required]"`
    pub header: Option<&'static str>,
    /// `body` or `body = "name"`
    pub body: Option<&'static str>,
    /// `validate = "rule,rule=param"`
    pub validate: Option<&'static str>,
    /// `description = "free text"`
    pub description: Option<&'static str>,
}

impl FieldTags {
    /// A field without any binding tags.
    pub const NONE: Self = Self {
        path: None,
        query: None,
        header: None,
        body: None,
        validate: None,
        description: None,
    };
}

/// Metadata for one named field of a request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Rust field name.
    pub name: &'static str,
    /// Field type as written in the source.
    pub ty: &'static str,
    /// Classification of the field type.
    pub kind: FieldKind,
    /// Declared binding tags.
    pub tags: FieldTags,
    /// Whether the field participates in serde decoding of the whole type.
    pub json: bool,
}

/// A parsed tag value: the wire name plus trailing modifiers.
///
/// `"apikey,required"` parses to name `apikey` with modifier `required`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    modifiers: Vec<String>,
}

impl Tag {
    /// Parse a raw tag value. An empty value means the tag is absent.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let mut parts = raw.split(',');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let modifiers = parts
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        Some(Self { name, modifiers })
    }

    /// Wire name (text before the first comma).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modifiers (text after the first comma).
    #[must_use]
    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }

    /// Whether `modifier` was declared.
    #[must_use]
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }
}

/// Read-only view of a populated field, consumed by the validator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// `None`.
    Absent,
    /// Textual value.
    Text(&'a str),
    /// Boolean value.
    Bool(bool),
    /// Signed number (durations report nanoseconds).
    Int(i128),
    /// Unsigned number (durations report nanoseconds).
    UInt(u128),
    /// Floating-point number.
    Float(f64),
    /// Raw bytes.
    Bytes(&'a [u8]),
    /// A collection, reported by its length.
    Collection(usize),
    /// A value with no measurable size; only its zero-ness is known.
    Opaque {
        /// Whether the value equals its type's zero value.
        zero: bool,
    },
}

impl FieldValue<'_> {
    /// Whether the value equals its type's zero value.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_zero(&self) -> bool {
        match *self {
            Self::Absent => true,
            Self::Text(s) => s.is_empty(),
            Self::Bool(b) => !b,
            Self::Int(n) => n == 0,
            Self::UInt(n) => n == 0,
            Self::Float(n) => n == 0.0,
            Self::Bytes(b) => b.is_empty(),
            Self::Collection(len) => len == 0,
            Self::Opaque { zero } => zero,
        }
    }

    /// Length used by size rules: characters for text, elements for collections.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match *self {
            Self::Text(s) => Some(s.chars().count()),
            Self::Bytes(b) => Some(b.len()),
            Self::Collection(len) => Some(len),
            _ => None,
        }
    }

    /// Numeric magnitude used by size rules on numbers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn number(&self) -> Option<f64> {
        match *self {
            Self::Int(n) => Some(n as f64),
            Self::UInt(n) => Some(n as f64),
            Self::Float(n) => Some(n),
            Self::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// Produce a [`FieldValue`] view of a field for validation.
///
/// Implemented for the scalar, text, collection and time types the binder understands.
/// Request types with `validate` tags on custom field types implement it for those types.
pub trait Inspect {
    /// View this value.
    fn inspect(&self) -> FieldValue<'_>;
}

impl Inspect for String {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Text(self)
    }
}

impl Inspect for &str {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Text(self)
    }
}

impl Inspect for bool {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Bool(*self)
    }
}

macro_rules! inspect_signed {
    ($($ty:ty),*) => {
        $(impl Inspect for $ty {
            fn inspect(&self) -> FieldValue<'_> {
                FieldValue::Int(i128::from(*self))
            }
        })*
    };
}

macro_rules! inspect_unsigned {
    ($($ty:ty),*) => {
        $(impl Inspect for $ty {
            fn inspect(&self) -> FieldValue<'_> {
                FieldValue::UInt(u128::from(*self))
            }
        })*
    };
}

inspect_signed!(i8, i16, i32, i64);
inspect_unsigned!(u8, u16, u32, u64);

impl Inspect for i128 {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Int(*self)
    }
}

impl Inspect for u128 {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::UInt(*self)
    }
}

impl Inspect for isize {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Int(*self as i128)
    }
}

impl Inspect for usize {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::UInt(*self as u128)
    }
}

impl Inspect for f32 {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Float(f64::from(*self))
    }
}

impl Inspect for f64 {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Float(*self)
    }
}

impl Inspect for bytes::Bytes {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Bytes(self)
    }
}

impl<T> Inspect for Vec<T> {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Collection(self.len())
    }
}

impl<K, V, S> Inspect for HashMap<K, V, S> {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Collection(self.len())
    }
}

impl<K, V> Inspect for BTreeMap<K, V> {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Collection(self.len())
    }
}

impl<T: Inspect> Inspect for Option<T> {
    fn inspect(&self) -> FieldValue<'_> {
        self.as_ref().map_or(FieldValue::Absent, Inspect::inspect)
    }
}

impl<T: Inspect + ?Sized> Inspect for Box<T> {
    fn inspect(&self) -> FieldValue<'_> {
        (**self).inspect()
    }
}

impl<Tz: chrono::TimeZone> Inspect for chrono::DateTime<Tz> {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Opaque {
            zero: self.timestamp() == 0 && self.timestamp_subsec_nanos() == 0,
        }
    }
}

impl Inspect for chrono::NaiveDateTime {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Opaque {
            zero: *self == Self::default(),
        }
    }
}

impl Inspect for chrono::NaiveDate {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Opaque {
            zero: *self == Self::default(),
        }
    }
}

impl Inspect for chrono::NaiveTime {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Opaque {
            zero: *self == Self::default(),
        }
    }
}

impl Inspect for std::time::SystemTime {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Opaque {
            zero: *self == Self::UNIX_EPOCH,
        }
    }
}

impl Inspect for char {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Opaque { zero: *self == '\0' }
    }
}

impl Inspect for chrono::Duration {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::Int(self.num_nanoseconds().map_or(i128::MAX, i128::from))
    }
}

impl Inspect for std::time::Duration {
    fn inspect(&self) -> FieldValue<'_> {
        FieldValue::UInt(self.as_nanos())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_tag_parse_name_and_modifiers() {
        let tag = Tag::parse("apikey,required").expect("non-empty tag");
        assert_eq!(tag.name(), "apikey");
        assert!(tag.has_modifier("required"));
        assert!(!tag.has_modifier("optional"));
    }

    #[test]
    fn test_tag_parse_empty_is_absent() {
        assert_eq!(Tag::parse(""), None);
    }

    #[test]
    fn test_tag_parse_modifiers_only() {
        let tag = Tag::parse(",required").expect("non-empty tag");
        assert_eq!(tag.name(), "");
        assert_eq!(tag.modifiers(), ["required".to_string()]);
    }

    #[test]
    fn test_zero_values() {
        assert!(FieldValue::Text("").is_zero());
        assert!(!FieldValue::Text("x").is_zero());
        assert!(0_i64.inspect().is_zero());
        assert!(Inspect::inspect(&Option::<String>::None).is_zero());
        assert!(!Inspect::inspect(&Some(3_u8)).is_zero());
        assert!(Vec::<u32>::new().inspect().is_zero());
    }

    #[test]
    fn test_length_counts_characters() {
        assert_eq!("héllo".to_string().inspect().length(), Some(5));
        assert_eq!(vec![1, 2, 3].inspect().length(), Some(3));
        assert_eq!(5_i32.inspect().length(), None);
    }
}
