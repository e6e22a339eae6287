//! Typed configuration schemas.
//!
//! A [`Schema`] is the ordered, validated set of [`ConfigField`]s visible at
//! one node of the command tree. Schemas are built once per scan, never per
//! dispatch.
//!
//! Fields can be declared three ways, all producing the same field list:
//!
//! - directly with the [`ConfigField`] builders,
//! - as a `fields:` list in a YAML package or module descriptor,
//! - with `#[derive(Config)]` on a struct, which implements [`ConfigRecord`].

mod field;
mod value;

pub use field::ConfigField;
pub use value::{Value, ValueType};

use crate::error::SchemaConflict;
use crate::identity::normalize_name;

/// Field names the parser reserves for itself at every level.
pub const RESERVED_FIELD_NAMES: &[&str] = &["help"];

/// A typed record whose field list can be introspected.
///
/// Usually implemented with `#[derive(Config)]`:
///
/// ```rust,ignore
/// #[derive(Config, Deserialize)]
/// struct CreateArgs {
///     /// Address of the new user
///     email: String,
///     #[config(default = false)]
///     dry_run: bool,
/// }
/// ```
pub trait ConfigRecord {
    fn fields() -> Vec<ConfigField>;
}

/// The standard global options every application gets at its root unless
/// they are disabled: `--verbose`/`-v` and `--log_level`.
pub fn standard_root_fields() -> Vec<ConfigField> {
    vec![
        ConfigField::boolean("verbose")
            .short('v')
            .default(false)
            .help("Enable verbose output logging"),
        ConfigField::choice("log_level", ["DEBUG", "INFO", "WARN", "ERROR"])
            .default("INFO")
            .help("Set the logging level"),
    ]
}

/// An ordered set of uniquely named, validated fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<ConfigField>,
}

impl Schema {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates one level's fields.
    ///
    /// Names are normalized like command names (`Dry-Run` becomes
    /// `dry_run`) and must then be unique, defaults must fit their types
    /// (integers are widened to floats), and a positional list must come
    /// after every other positional.
    pub fn from_fields<I>(fields: I) -> Result<Self, SchemaConflict>
    where
        I: IntoIterator<Item = ConfigField>,
    {
        let mut validated: Vec<ConfigField> = Vec::new();
        for mut field in fields {
            field.name = normalize_name(&field.name);
            validate_name(&field.name)?;
            if validated.iter().any(|f| f.name == field.name) {
                return Err(SchemaConflict::DuplicateField(field.name));
            }
            if let Some(default) = field.default.take() {
                let coerced =
                    field
                        .ty
                        .coerce(default)
                        .map_err(|reason| SchemaConflict::InvalidDefault {
                            field: field.name.clone(),
                            reason,
                        })?;
                field.default = Some(coerced);
            }
            validated.push(field);
        }
        let schema = Self { fields: validated };
        schema.check_positionals()?;
        Ok(schema)
    }

    /// Like [`from_fields`](Self::from_fields) for a typed record.
    pub fn of<R: ConfigRecord>() -> Result<Self, SchemaConflict> {
        Self::from_fields(R::fields())
    }

    /// Computes the schema a child sees: this schema overlaid with the
    /// child's own fields.
    ///
    /// Inherited fields keep their position. A redefinition replaces the
    /// inherited default/help/required/short/env attributes but must keep the
    /// type (a choice may narrow). New fields are appended in declaration
    /// order.
    pub fn inherit(&self, own: &Schema) -> Result<Schema, SchemaConflict> {
        let mut fields = self.fields.clone();
        for field in &own.fields {
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => {
                    if !existing.ty.accepts_override(&field.ty) {
                        return Err(SchemaConflict::TypeChanged {
                            field: field.name.clone(),
                            ancestor: existing.ty.clone(),
                            descendant: field.ty.clone(),
                        });
                    }
                    *existing = existing.overridden_by(field);
                }
                None => fields.push(field.clone()),
            }
        }
        let merged = Schema { fields };
        merged.check_positionals()?;
        Ok(merged)
    }

    /// Rejects names the parser owns (`help`, plus `version` when the
    /// application has a version flag).
    pub fn check_reserved(&self, extra: &[&str]) -> Result<(), SchemaConflict> {
        for field in &self.fields {
            if RESERVED_FIELD_NAMES.contains(&field.name.as_str())
                || extra.contains(&field.name.as_str())
            {
                return Err(SchemaConflict::ReservedName(field.name.clone()));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigField> {
        self.fields.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn positionals(&self) -> impl Iterator<Item = &ConfigField> {
        self.fields.iter().filter(|f| f.positional)
    }

    fn check_positionals(&self) -> Result<(), SchemaConflict> {
        let positionals: Vec<&ConfigField> = self.positionals().collect();
        if let Some((_, init)) = positionals.split_last() {
            if let Some(list) = init.iter().find(|f| f.ty.is_list()) {
                return Err(SchemaConflict::VariadicPositionalNotLast(list.name.clone()));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a ConfigField;
    type IntoIter = std::slice::Iter<'a, ConfigField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

fn validate_name(name: &str) -> Result<(), SchemaConflict> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false);
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(SchemaConflict::InvalidName(name.to_string()))
    }
}
