//! Implementation of the `#[derive(Config)]` macro.
//!
//! Rust types map to value types as follows:
//!
//! | Rust type                         | Value type                 |
//! |-----------------------------------|----------------------------|
//! | `String`                          | `String` (`Choice` with `choices`) |
//! | `i8`..`i64`, `u8`..`u64`, `isize`, `usize` | `Integer`         |
//! | `f32`, `f64`                      | `Float`                    |
//! | `bool`                            | `Boolean`                  |
//! | `Vec<String>`                     | `StringList`               |
//! | `Option<T>`                       | `Optional(T)`              |
//!
//! Fields that are not `bool`, `Vec` or `Option` and carry no default are
//! required.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    spanned::Spanned, Data, DeriveInput, Error, Fields, GenericArgument, PathArguments,
    PathSegment, Result, Type,
};

use super::attrs::{doc_help, parse_config_attrs};

/// What kind of value a field holds, for deciding whether it is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Scalar,
    Flag,
    List,
    Optional,
}

const INTEGER_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize",
];

/// Main implementation of the Config derive macro.
pub fn config_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Config can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Config can only be derived for structs",
            ))
        }
    };

    let mut field_exprs: Vec<TokenStream> = Vec::new();

    for field in fields.iter() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;

        let attrs = parse_config_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let name = ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
        let (value_type, kind) = value_type(&field.ty, attrs.choices.as_deref())?;

        let mut modifiers: Vec<TokenStream> = Vec::new();
        if let Some(help) = attrs.help.or_else(|| doc_help(&field.attrs)) {
            modifiers.push(quote! { .help(#help) });
        }
        if let Some(short) = attrs.short {
            modifiers.push(quote! { .short(#short) });
        }
        if let Some(env) = &attrs.env {
            modifiers.push(quote! { .env(#env) });
        }
        if attrs.positional {
            modifiers.push(quote! { .positional() });
        }

        let required = attrs.required || (attrs.default.is_none() && kind == FieldKind::Scalar);
        if let Some(default) = &attrs.default {
            modifiers.push(quote! { .default(#default) });
        }
        if required {
            modifiers.push(quote! { .required() });
        }

        field_exprs.push(quote! {
            ::cmdtree::ConfigField::new(#name, #value_type) #(#modifiers)*
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::cmdtree::ConfigRecord for #struct_name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::cmdtree::ConfigField> {
                ::std::vec![#(#field_exprs),*]
            }
        }
    };

    Ok(expanded)
}

fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn single_argument(segment: &PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first() {
        Some(GenericArgument::Type(ty)) => Some(ty),
        _ => None,
    }
}

fn is_string(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|s| s.ident == "String" && s.arguments.is_empty())
}

/// The `cmdtree::ValueType` expression for a Rust field type.
fn value_type(ty: &Type, choices: Option<&[String]>) -> Result<(TokenStream, FieldKind)> {
    let unsupported = || {
        Error::new(
            ty.span(),
            "unsupported config field type. Expected String, an integer, a float, bool, Vec<String> or Option<T>",
        )
    };
    let segment = last_segment(ty).ok_or_else(unsupported)?;
    let name = segment.ident.to_string();

    if name == "Option" {
        let inner = single_argument(segment).ok_or_else(unsupported)?;
        let (inner_tokens, inner_kind) = value_type(inner, choices)?;
        if inner_kind == FieldKind::Optional {
            return Err(Error::new(ty.span(), "nested Option is not supported"));
        }
        return Ok((
            quote! { ::cmdtree::ValueType::optional(#inner_tokens) },
            FieldKind::Optional,
        ));
    }

    if let Some(choices) = choices {
        if !is_string(ty) {
            return Err(Error::new(
                ty.span(),
                "choices can only be used on String or Option<String> fields",
            ));
        }
        return Ok((
            quote! { ::cmdtree::ValueType::choice([#(#choices),*]) },
            FieldKind::Scalar,
        ));
    }

    if name == "Vec" {
        return match single_argument(segment) {
            Some(inner) if is_string(inner) => {
                Ok((quote! { ::cmdtree::ValueType::StringList }, FieldKind::List))
            }
            _ => Err(Error::new(ty.span(), "only Vec<String> lists are supported")),
        };
    }

    if !segment.arguments.is_empty() {
        return Err(unsupported());
    }
    match name.as_str() {
        "String" => Ok((quote! { ::cmdtree::ValueType::String }, FieldKind::Scalar)),
        "bool" => Ok((quote! { ::cmdtree::ValueType::Boolean }, FieldKind::Flag)),
        "f32" | "f64" => Ok((quote! { ::cmdtree::ValueType::Float }, FieldKind::Scalar)),
        n if INTEGER_TYPES.contains(&n) => {
            Ok((quote! { ::cmdtree::ValueType::Integer }, FieldKind::Scalar))
        }
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand(input: DeriveInput) -> String {
        config_derive_impl(input).unwrap().to_string()
    }

    fn compact(tokens: &str) -> String {
        tokens.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_required_inference() {
        let out = compact(&expand(parse_quote! {
            struct Args {
                email: String,
                retries: u32,
                dry_run: bool,
                tags: Vec<String>,
                note: Option<String>,
            }
        }));
        assert_eq!(out.matches(".required()").count(), 2, "{out}");
        assert!(out.contains("ValueType::Integer"), "{out}");
        assert!(out.contains("ValueType::StringList"), "{out}");
        assert!(out.contains("ValueType::optional(::cmdtree::ValueType::String)"));
    }

    #[test]
    fn test_default_removes_required() {
        let out = compact(&expand(parse_quote! {
            struct Args {
                #[config(default = 3)]
                retries: i64,
            }
        }));
        assert!(out.contains(".default(3)"), "{out}");
        assert!(!out.contains(".required()"), "{out}");
    }

    #[test]
    fn test_doc_comment_becomes_help() {
        let out = expand(parse_quote! {
            struct Args {
                /// Address of the new user
                #[config(short = 'e', env = "USER_EMAIL")]
                email: String,
            }
        });
        assert!(out.contains("\"Address of the new user\""), "{out}");
        let out = compact(&out);
        assert!(out.contains(".short('e')"), "{out}");
        assert!(out.contains(".env(\"USER_EMAIL\")"), "{out}");
    }

    #[test]
    fn test_choices() {
        let out = compact(&expand(parse_quote! {
            struct Args {
                #[config(choices = ["json", "text"], default = "text")]
                format: String,
            }
        }));
        assert!(out.contains("ValueType::choice([\"json\",\"text\"])"), "{out}");
        assert!(!out.contains(".required()"), "{out}");
    }

    #[test]
    fn test_skip() {
        let out = expand(parse_quote! {
            struct Args {
                #[config(skip)]
                cache: Vec<u8>,
                name: String,
            }
        });
        assert!(!out.contains("\"cache\""), "{out}");
        assert!(out.contains("\"name\""), "{out}");
    }

    #[test]
    fn test_rejects_unsupported_types() {
        let input: DeriveInput = parse_quote! {
            struct Args { when: std::time::Instant }
        };
        assert!(config_derive_impl(input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Args { ids: Vec<u32> }
        };
        assert!(config_derive_impl(input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Args {
                #[config(choices = ["a"])]
                level: u8,
            }
        };
        assert!(config_derive_impl(input).is_err());
    }

    #[test]
    fn test_rejects_enums_and_tuple_structs() {
        let input: DeriveInput = parse_quote! { enum Mode { A, B } };
        assert!(config_derive_impl(input).is_err());
        let input: DeriveInput = parse_quote! { struct Pair(String, String); };
        assert!(config_derive_impl(input).is_err());
    }
}
