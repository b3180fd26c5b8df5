//! Derive macros for Route Bind
//!
//! # Available Macros
//!
//! - `#[derive(Bindable)]` - Generates the field table and setters the binder needs
//!
//! # Example
//!
//! ```ignore
//! use route_bind_macros::Bindable;
//!
//! #[derive(Bindable, Default, Debug)]
//! #[bind(validate_self)]
//! struct CreatePost {
//!     #[bind(path = "user_id")]
//!     user_id: u64,
//!
//!     #[bind(header = "apikey,required", validate = "min=8")]
//!     api_key: String,
//!
//!     #[bind(query = "draft")]
//!     draft: Option<bool>,
//!
//!     #[bind(body, description = "post content")]
//!     post: NewPost,
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod attrs;
mod kind;

use attrs::{FieldAttrs, StructAttrs};
use kind::Kind;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for request types
///
/// Implements `route_bind_core::Bindable` for a struct with named fields.
///
/// # Field attributes
///
/// - `#[bind(path = "name")]` - Bind a route template parameter
/// - `#[bind(query = "name")]` / `#[bind(query = "name,required")]` - Bind a query parameter
/// - `#[bind(header = "name")]` / `#[bind(header = "name,required")]` - Bind a header
/// - `#[bind(body)]` - Receive the request body
/// - `#[bind(validate = "rules")]` - Validation rules, e.g. `required,min=1`
/// - `#[bind(description = "text")]` - Documentation text
///
/// Fields bound to path, query or header must implement `Coerce`; validated fields must
/// implement `Inspect`. Fields carrying a `#[serde(...)]` attribute make the whole type
/// decodable from the body when no field owns it.
///
/// # Struct attributes
///
/// - `#[bind(json)]` - Decode the whole type from the body when no field owns it
/// - `#[bind(validate_self)]` - The type implements `Validatable`
/// - `#[bind(validator_factory)]` - The type implements `ValidatorFactory`
/// - `#[bind(post_parse)]` - The type implements `PostParseHook`
///
/// # Errors
///
/// Produces a compile error when applied to anything but a struct with named fields, or
/// when a `bind` attribute is unknown, repeated or missing its value.
#[proc_macro_derive(Bindable, attributes(bind))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct BoundField {
    index: usize,
    ident: syn::Ident,
    name: String,
    kind: Kind,
    attrs: FieldAttrs,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = name.to_string();

    let Data::Struct(data_struct) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Bindable)] can only be used on structs",
        ));
    };
    let fields = match &data_struct.fields {
        Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "#[derive(Bindable)] requires named fields",
            ));
        }
    };

    let struct_attrs = StructAttrs::parse(&input.attrs)?;

    let mut bound = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "field must be named"));
        };
        let name = ident.to_string();
        let attrs = FieldAttrs::parse(field, &name)?;
        bound.push(BoundField {
            index,
            kind: Kind::classify(&field.ty),
            ident,
            name,
            attrs,
        });
    }

    let specs = bound.iter().zip(&fields).map(|(field, syn_field)| {
        field_spec(field, &syn_field.ty, struct_attrs.json || attrs::has_serde(&syn_field.attrs))
    });
    let any_json =
        struct_attrs.json || fields.iter().any(|f| attrs::has_serde(&f.attrs));

    let coerce_arms = bound.iter().filter(|f| f.attrs.is_coerced()).map(|f| {
        let index = f.index;
        let ident = &f.ident;
        let field_name = &f.name;
        quote! {
            #index => ::route_bind_core::coerce_into(&mut self.#ident, raw, #field_name),
        }
    });

    let body_arms = bound
        .iter()
        .filter(|f| f.attrs.body.is_some())
        .filter_map(body_arm);

    let inspect_arms = bound
        .iter()
        .filter(|f| f.attrs.validate.is_some())
        .map(|f| {
            let index = f.index;
            let ident = &f.ident;
            quote! {
                #index => ::core::option::Option::Some(::route_bind_core::Inspect::inspect(&self.#ident)),
            }
        });

    let decode_self = any_json.then(|| {
        quote! {
            fn decode_self(
                payload: &::route_bind_core::Payload,
            ) -> ::core::result::Result<Self, ::route_bind_core::BindingError> {
                payload.decode(Self::TYPE_NAME)
            }
        }
    });

    let hook_validate = struct_attrs.validate_self.then(|| {
        quote! {
            fn hook_validate(&self) -> ::core::result::Result<(), ::route_bind_core::ValidationError> {
                <Self as ::route_bind_core::Validatable>::validate(self)
            }
        }
    });
    let hook_validator = struct_attrs.validator_factory.then(|| {
        quote! {
            fn hook_validator(&self) -> ::route_bind_core::Validator {
                <Self as ::route_bind_core::ValidatorFactory>::new_validator(self)
            }
        }
    });
    let hook_post_parse = struct_attrs.post_parse.then(|| {
        quote! {
            fn hook_post_parse(
                &mut self,
                outcome: ::core::result::Result<(), ::route_bind_core::BindErrors>,
            ) -> ::core::result::Result<(), ::route_bind_core::BindErrors> {
                <Self as ::route_bind_core::PostParseHook>::post_parse(self, outcome)
            }
        }
    });

    let custom_validator = struct_attrs.validate_self;
    let validator_factory = struct_attrs.validator_factory;
    let post_parse = struct_attrs.post_parse;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::route_bind_core::Bindable for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            const FIELDS: &'static [::route_bind_core::FieldSpec] = &[
                #(#specs),*
            ];

            const CAPABILITIES: ::route_bind_core::Capabilities = ::route_bind_core::Capabilities {
                custom_validator: #custom_validator,
                validator_factory: #validator_factory,
                post_parse: #post_parse,
            };

            #[allow(unused_variables)]
            fn coerce_field(
                &mut self,
                index: usize,
                raw: &str,
            ) -> ::core::result::Result<(), ::route_bind_core::CoercionError> {
                match index {
                    #(#coerce_arms)*
                    _ => ::core::result::Result::Err(::route_bind_core::CoercionError::new(
                        Self::TYPE_NAME,
                        ::route_bind_core::CoercionErrorKind::UnknownField(index),
                    )),
                }
            }

            fn assign_body(
                &mut self,
                index: usize,
                body: ::route_bind_core::BodyValue<'_>,
            ) -> ::core::result::Result<(), ::route_bind_core::BindingError> {
                match (index, body) {
                    #(#body_arms)*
                    (_, other) => ::core::result::Result::Err(::route_bind_core::BindingError::BodyMismatch {
                        field: ::std::string::ToString::to_string(Self::TYPE_NAME),
                        strategy: other.strategy(),
                    }),
                }
            }

            #decode_self

            fn field_value(&self, index: usize) -> ::core::option::Option<::route_bind_core::FieldValue<'_>> {
                match index {
                    #(#inspect_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            #hook_validate
            #hook_validator
            #hook_post_parse
        }
    })
}

fn field_spec(field: &BoundField, ty: &syn::Type, json: bool) -> TokenStream2 {
    let name = &field.name;
    let ty = kind::render_type(ty);
    let kind = field.kind.variant();
    let path = attrs::opt_str(field.attrs.path.as_deref());
    let query = attrs::opt_str(field.attrs.query.as_deref());
    let header = attrs::opt_str(field.attrs.header.as_deref());
    let body = attrs::opt_str(field.attrs.body.as_deref());
    let validate = attrs::opt_str(field.attrs.validate.as_deref());
    let description = attrs::opt_str(field.attrs.description.as_deref());
    quote! {
        ::route_bind_core::FieldSpec {
            name: #name,
            ty: #ty,
            kind: ::route_bind_core::FieldKind::#kind,
            tags: ::route_bind_core::FieldTags {
                path: #path,
                query: #query,
                header: #header,
                body: #body,
                validate: #validate,
                description: #description,
            },
            json: #json,
        }
    }
}

/// Setter arm for a body field; scalar fields get none and are rejected when the
/// descriptor is built.
fn body_arm(field: &BoundField) -> Option<TokenStream2> {
    let index = field.index;
    let ident = &field.ident;
    let name = &field.name;
    match field.kind {
        Kind::Bytes => Some(quote! {
            (#index, ::route_bind_core::BodyValue::Bytes(bytes)) => {
                self.#ident = ::core::convert::From::from(bytes.to_vec());
                ::core::result::Result::Ok(())
            }
        }),
        Kind::Text => Some(quote! {
            (#index, ::route_bind_core::BodyValue::Text(text)) => {
                self.#ident = ::core::convert::From::from(text);
                ::core::result::Result::Ok(())
            }
        }),
        Kind::Struct | Kind::Map | Kind::Sequence => Some(quote! {
            (#index, ::route_bind_core::BodyValue::Encoded(payload)) => {
                self.#ident = payload.decode(#name)?;
                ::core::result::Result::Ok(())
            }
        }),
        Kind::Scalar => None,
    }
}
