//! Proc macros for cmdtree.
//!
//! This crate provides the derive macro for declaring configuration records:
//!
//! - [`Config`]: derives `cmdtree::ConfigRecord` from a struct's fields
//!
//! Use it through the `cmdtree` crate, which re-exports it.

mod config;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `cmdtree::ConfigRecord` for a struct with named fields.
///
/// Each field becomes one `ConfigField` named after it. Doc comments become
/// the help text.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `help = "..."` | Help text, instead of the doc comment |
/// | `short = 'x'` | Explicit short alias |
/// | `env = "VAR"` | Environment variable read when the flag is absent |
/// | `default = <expr>` | Default value (anything `Into<cmdtree::Value>`) |
/// | `choices = ["a", "b"]` | Restrict a string field to these values |
/// | `positional` | Take the value positionally |
/// | `required` | Require the field even if its type would not |
/// | `skip` | Leave the field out of the schema |
///
/// Fields that are not `bool`, `Vec<String>` or `Option<T>` and have no
/// default are required.
///
/// # Example
///
/// ```ignore
/// use cmdtree::Config;
/// use serde::Deserialize;
///
/// #[derive(Config, Deserialize)]
/// struct CreateArgs {
///     /// Address of the new user
///     #[config(env = "USER_EMAIL")]
///     email: String,
///     #[config(default = false)]
///     dry_run: bool,
///     #[config(choices = ["plain", "json"], default = "plain")]
///     format: String,
/// }
/// ```
#[proc_macro_derive(Config, attributes(config))]
pub fn config_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    config::config_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
