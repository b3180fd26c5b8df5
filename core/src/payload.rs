//! Request body payloads and their codecs.
//!
//! The codec is chosen from the request's `Content-Type`: JSON (also the default when no
//! content type is sent), XML and YAML. Any other content type is carried as raw bytes and
//! cannot be decoded.

use crate::error::BindingError;
use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

/// Body codec selected from a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `application/json`, `*/*+json`, or no content type.
    Json,
    /// `application/xml`, `text/xml`, `*/*+xml`.
    Xml,
    /// `application/yaml`, `application/x-yaml`, `text/yaml`.
    Yaml,
    /// Anything else.
    Raw,
}

impl Format {
    /// Select the codec for a `Content-Type` value. Parameters such as `charset` are ignored.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(value) = content_type else {
            return Self::Json;
        };
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "" | "application/json" => Self::Json,
            "application/xml" | "text/xml" => Self::Xml,
            "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => Self::Yaml,
            other if other.ends_with("+json") => Self::Json,
            other if other.ends_with("+xml") => Self::Xml,
            _ => Self::Raw,
        }
    }

    /// Codec name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Yaml => "YAML",
            Self::Raw => "raw",
        }
    }

    /// Whether this format has a decoder.
    #[must_use]
    pub const fn is_decodable(self) -> bool {
        !matches!(self, Self::Raw)
    }
}

/// A fully read request body together with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    content_type: Option<String>,
    format: Format,
    bytes: Bytes,
}

impl Payload {
    /// Wrap `bytes` sent with `content_type`.
    #[must_use]
    pub fn new(content_type: Option<&str>, bytes: Bytes) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            format: Format::from_content_type(content_type),
            bytes,
        }
    }

    /// Wrap `bytes` using the request's `Content-Type` header.
    ///
    /// A header value that is not visible ASCII is treated as an unknown content type.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, bytes: Bytes) -> Self {
        match headers.get(CONTENT_TYPE) {
            None => Self::new(None, bytes),
            Some(value) => Self::new(Some(value.to_str().unwrap_or("application/octet-stream")), bytes),
        }
    }

    /// The codec that will be used by [`decode`](Self::decode).
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// `Content-Type` as sent by the client.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Raw body bytes.
    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the payload into `T`. `target` names the receiving field or type.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Decode`] when the codec rejects the payload and
    /// [`BindingError::UnsupportedContentType`] when the content type has no codec.
    pub fn decode<T: DeserializeOwned>(&self, target: &str) -> Result<T, BindingError> {
        let decode_error = |reason: String| BindingError::Decode {
            target: target.to_string(),
            format: self.format.name(),
            reason,
        };
        match self.format {
            Format::Json => serde_json::from_slice(&self.bytes).map_err(|e| decode_error(e.to_string())),
            Format::Yaml => serde_yaml::from_slice(&self.bytes).map_err(|e| decode_error(e.to_string())),
            Format::Xml => {
                let text = std::str::from_utf8(&self.bytes).map_err(|e| decode_error(e.to_string()))?;
                quick_xml::de::from_str(text).map_err(|e| decode_error(e.to_string()))
            }
            Format::Raw => Err(BindingError::UnsupportedContentType {
                target: target.to_string(),
                content_type: self.content_type.clone().unwrap_or_default(),
            }),
        }
    }
}
