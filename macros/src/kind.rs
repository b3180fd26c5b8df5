//! Syntactic classification of field types.

use proc_macro2::{Ident, Span};
use quote::ToTokens;
use syn::{GenericArgument, PathArguments, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bytes,
    Text,
    Scalar,
    Struct,
    Map,
    Sequence,
}

const SCALARS: &[&str] = &[
    "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64",
    "u128", "usize", "f32", "f64", "Duration", "TimeDelta", "DateTime", "NaiveDateTime",
    "NaiveDate", "NaiveTime", "SystemTime",
];

impl Kind {
    /// Classify `ty` by its outermost name; wrappers are looked through.
    pub fn classify(ty: &Type) -> Self {
        match ty {
            Type::Reference(reference) => Self::classify(&reference.elem),
            Type::Paren(paren) => Self::classify(&paren.elem),
            Type::Group(group) => Self::classify(&group.elem),
            Type::Array(_) | Type::Slice(_) | Type::Tuple(_) => Self::Sequence,
            Type::Path(type_path) => {
                let Some(segment) = type_path.path.segments.last() else {
                    return Self::Struct;
                };
                let ident = segment.ident.to_string();
                match ident.as_str() {
                    "Option" | "Box" | "Arc" | "Rc" => {
                        first_type_arg(&segment.arguments).map_or(Self::Struct, Self::classify)
                    }
                    "String" | "str" | "Cow" => Self::Text,
                    "Bytes" | "BytesMut" => Self::Bytes,
                    "Vec" => match first_type_arg(&segment.arguments) {
                        Some(inner) if is_u8(inner) => Self::Bytes,
                        _ => Self::Sequence,
                    },
                    "VecDeque" | "HashSet" | "BTreeSet" => Self::Sequence,
                    "HashMap" | "BTreeMap" | "Map" => Self::Map,
                    name if SCALARS.contains(&name) => Self::Scalar,
                    _ => Self::Struct,
                }
            }
            _ => Self::Struct,
        }
    }

    /// Matching `FieldKind` variant name.
    pub fn variant(self) -> Ident {
        let name = match self {
            Self::Bytes => "Bytes",
            Self::Text => "Text",
            Self::Scalar => "Scalar",
            Self::Struct => "Struct",
            Self::Map => "Map",
            Self::Sequence => "Sequence",
        };
        Ident::new(name, Span::call_site())
    }
}

fn first_type_arg(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.path.is_ident("u8"))
}

/// Render a type the way it was written, minus token spacing around punctuation.
pub fn render_type(ty: &Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let chars: Vec<char> = raw.chars().collect();
    let tight = |c: char| matches!(c, '<' | '>' | ':' | '&' | ',' | '(' | ')' | '[' | ']' | ';');
    let mut out = String::with_capacity(raw.len());
    for (i, c) in chars.iter().enumerate() {
        if *c == ' ' {
            let prev = out.chars().last();
            let next = chars.get(i + 1).copied();
            let keep = prev.is_some_and(|p| !tight(p) || p == ',' || p == ';')
                && next.is_some_and(|n| !tight(n));
            if !keep {
                continue;
            }
        }
        out.push(*c);
    }
    out
}
