//! `#[bind(...)]` attribute parsing.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Field, LitStr, Token};

/// Tags declared on one field.
#[derive(Default)]
pub struct FieldAttrs {
    pub path: Option<String>,
    pub query: Option<String>,
    pub header: Option<String>,
    pub body: Option<String>,
    pub validate: Option<String>,
    pub description: Option<String>,
}

impl FieldAttrs {
    pub fn parse(field: &Field, field_name: &str) -> syn::Result<Self> {
        let mut attrs = Self::default();
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("bind")) {
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let slot = match key.as_str() {
                    "path" => &mut attrs.path,
                    "query" => &mut attrs.query,
                    "header" => &mut attrs.header,
                    "body" => &mut attrs.body,
                    "validate" => &mut attrs.validate,
                    "description" => &mut attrs.description,
                    _ => {
                        return Err(meta.error(
                            "unsupported bind attribute; expected path, query, header, body, validate or description",
                        ));
                    }
                };
                if slot.is_some() {
                    return Err(meta.error(format!("duplicate `{key}` attribute")));
                }
                let value = if meta.input.peek(Token![=]) {
                    meta.value()?.parse::<LitStr>()?.value()
                } else if key == "body" {
                    field_name.to_string()
                } else {
                    return Err(meta.error(format!("`{key}` expects a string value")));
                };
                *slot = Some(value);
                Ok(())
            })?;
        }
        Ok(attrs)
    }

    /// Whether the field receives text from the path, query or headers.
    pub fn is_coerced(&self) -> bool {
        [&self.path, &self.query, &self.header]
            .iter()
            .any(|tag| tag.as_deref().is_some_and(|t| !t.is_empty()))
    }
}

/// Flags declared on the struct.
#[derive(Default)]
pub struct StructAttrs {
    pub json: bool,
    pub validate_self: bool,
    pub validator_factory: bool,
    pub post_parse: bool,
}

impl StructAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut flags = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("bind")) {
            attr.parse_nested_meta(|meta| {
                let slot = if meta.path.is_ident("json") {
                    &mut flags.json
                } else if meta.path.is_ident("validate_self") {
                    &mut flags.validate_self
                } else if meta.path.is_ident("validator_factory") {
                    &mut flags.validator_factory
                } else if meta.path.is_ident("post_parse") {
                    &mut flags.post_parse
                } else {
                    return Err(meta.error(
                        "unsupported bind flag; expected json, validate_self, validator_factory or post_parse",
                    ));
                };
                *slot = true;
                Ok(())
            })?;
        }
        Ok(flags)
    }
}

/// Whether the attribute list carries a serde attribute.
pub fn has_serde(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident("serde"))
}

pub fn opt_str(value: Option<&str>) -> TokenStream2 {
    match value {
        Some(text) => quote!(::core::option::Option::Some(#text)),
        None => quote!(::core::option::Option::None),
    }
}
