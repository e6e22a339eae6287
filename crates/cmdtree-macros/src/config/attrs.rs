//! Attribute parsing for the Config derive macro.
//!
//! This module provides parsers for the `#[config(...)]` field attributes
//! and for the doc comments used as help text.

use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Expr, ExprLit, Lit, Meta, Result, Token,
};

/// Field-level attributes from `#[config(...)]`.
#[derive(Default)]
pub struct ConfigAttr {
    /// Help text; overrides the doc comment.
    pub help: Option<String>,
    pub short: Option<char>,
    pub env: Option<String>,
    /// Default value expression, anything `Into<cmdtree::Value>`.
    pub default: Option<Expr>,
    /// Allowed values; turns a string field into a choice.
    pub choices: Option<Vec<String>>,
    pub positional: bool,
    /// Forces the field to be required even if its type would not be.
    pub required: bool,
    /// Leave this field out of the schema.
    pub skip: bool,
}

fn string_literal(expr: &Expr, what: &str) -> Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(Error::new(
            other.span(),
            format!("{what} must be a string literal"),
        )),
    }
}

fn char_literal(expr: &Expr) -> Result<char> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Char(c), ..
        }) => Ok(c.value()),
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) if s.value().chars().count() == 1 => {
            s.value().chars().next().ok_or_else(|| Error::new(s.span(), "empty short"))
        }
        other => Err(Error::new(
            other.span(),
            "short must be a character literal, e.g. short = 'v'",
        )),
    }
}

fn choice_list(expr: &Expr) -> Result<Vec<String>> {
    match expr {
        Expr::Array(array) => array
            .elems
            .iter()
            .map(|e| string_literal(e, "each choice"))
            .collect(),
        other => Err(Error::new(
            other.span(),
            "choices must be an array of string literals, e.g. choices = [\"a\", \"b\"]",
        )),
    }
}

impl Parse for ConfigAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = ConfigAttr::default();

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) => {
                    if p.is_ident("positional") {
                        attr.positional = true;
                    } else if p.is_ident("required") {
                        attr.required = true;
                    } else if p.is_ident("skip") {
                        attr.skip = true;
                    } else {
                        return Err(Error::new(
                            p.span(),
                            "unknown config flag. Expected: positional, required or skip",
                        ));
                    }
                }

                Meta::NameValue(nv) => {
                    if nv.path.is_ident("help") {
                        attr.help = Some(string_literal(&nv.value, "help")?);
                    } else if nv.path.is_ident("short") {
                        attr.short = Some(char_literal(&nv.value)?);
                    } else if nv.path.is_ident("env") {
                        attr.env = Some(string_literal(&nv.value, "env")?);
                    } else if nv.path.is_ident("default") {
                        attr.default = Some(nv.value.clone());
                    } else if nv.path.is_ident("choices") {
                        let choices = choice_list(&nv.value)?;
                        if choices.is_empty() {
                            return Err(Error::new(nv.value.span(), "choices cannot be empty"));
                        }
                        attr.choices = Some(choices);
                    } else {
                        return Err(Error::new(
                            nv.path.span(),
                            "unknown attribute. Expected: help, short, env, default or choices",
                        ));
                    }
                }

                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown config attribute. Expected: help = \"...\", short = 'x', env = \"VAR\", default = <expr>, choices = [...], positional, required or skip",
                    ));
                }
            }
        }

        Ok(attr)
    }
}

/// Extract `#[config(...)]` attributes from a field's attributes.
pub fn parse_config_attrs(attrs: &[Attribute]) -> Result<ConfigAttr> {
    let mut found = None;
    for attr in attrs {
        if attr.path().is_ident("config") {
            if found.is_some() {
                return Err(Error::new(attr.span(), "duplicate #[config] attribute"));
            }
            found = Some(attr.parse_args::<ConfigAttr>()?);
        }
    }
    Ok(found.unwrap_or_default())
}

/// The first paragraph of the doc comment, joined into one line.
pub fn doc_help(attrs: &[Attribute]) -> Option<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let Meta::NameValue(nv) = &attr.meta else {
            continue;
        };
        let Ok(line) = string_literal(&nv.value, "doc") else {
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(line.to_string());
    }
    (!lines.is_empty()).then(|| lines.join(" "))
}
