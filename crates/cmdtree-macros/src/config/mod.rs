//! Implementation of the `#[derive(Config)]` macro.
//!
//! This module turns a struct's named fields into a `cmdtree::ConfigRecord`
//! implementation listing one `ConfigField` per field.

mod attrs;
mod derive;

pub use derive::config_derive_impl;
