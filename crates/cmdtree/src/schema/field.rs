//! Typed argument definitions.

use super::value::{Value, ValueType};

/// One typed, named argument/option definition.
///
/// Fields are built with a small fluent API:
///
/// ```
/// use cmdtree::{ConfigField, ValueType};
///
/// let email = ConfigField::string("email")
///     .required()
///     .help("Address of the new user")
///     .env("USER_EMAIL");
///
/// assert!(email.required);
/// assert_eq!(email.ty, ValueType::String);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigField {
    pub name: String,
    pub ty: ValueType,
    pub default: Option<Value>,
    pub required: bool,
    pub help: String,
    pub short: Option<char>,
    pub positional: bool,
    /// Environment variable consulted when the command line is silent.
    pub env: Option<String>,
}

impl ConfigField {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            required: false,
            help: String::new(),
            short: None,
            positional: false,
            env: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Boolean)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::StringList)
    }

    pub fn choice<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ValueType::choice(values))
    }

    pub fn optional(name: impl Into<String>, inner: ValueType) -> Self {
        Self::new(name, ValueType::optional(inner))
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    /// Applies a descendant's redefinition of this field.
    ///
    /// Callers check type compatibility first; this only layers attributes.
    /// The descendant's type is kept so a narrowed choice takes effect.
    pub(crate) fn overridden_by(&self, descendant: &ConfigField) -> ConfigField {
        ConfigField {
            name: self.name.clone(),
            ty: descendant.ty.clone(),
            default: descendant.default.clone().or_else(|| self.default.clone()),
            required: descendant.required,
            help: if descendant.help.is_empty() {
                self.help.clone()
            } else {
                descendant.help.clone()
            },
            short: descendant.short.or(self.short),
            positional: descendant.positional,
            env: descendant.env.clone().or_else(|| self.env.clone()),
        }
    }

    /// The long option spelling (`--dry_run`).
    pub fn long(&self) -> &str {
        &self.name
    }

    /// The hyphenated spelling, if it differs from [`long`](Self::long).
    pub fn hyphenated(&self) -> Option<String> {
        if self.name.contains('_') {
            Some(self.name.replace('_', "-"))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let field = ConfigField::integer("limit");
        assert_eq!(field.name, "limit");
        assert_eq!(field.ty, ValueType::Integer);
        assert!(!field.required);
        assert!(!field.positional);
        assert!(field.default.is_none());
        assert!(field.help.is_empty());
    }

    #[test]
    fn test_builder_chaining() {
        let field = ConfigField::choice("log_level", ["DEBUG", "INFO"])
            .default("INFO")
            .short('l')
            .help("Logging level");
        assert_eq!(field.default, Some(Value::from("INFO")));
        assert_eq!(field.short, Some('l'));
        assert_eq!(field.help, "Logging level");
    }

    #[test]
    fn test_override_keeps_ancestor_help_when_blank() {
        let ancestor = ConfigField::string("region").help("Target region").default("eu");
        let descendant = ConfigField::string("region").default("us");
        let merged = ancestor.overridden_by(&descendant);
        assert_eq!(merged.help, "Target region");
        assert_eq!(merged.default, Some(Value::from("us")));
    }

    #[test]
    fn test_override_keeps_ancestor_default_when_unset() {
        let ancestor = ConfigField::integer("retries").default(3);
        let descendant = ConfigField::integer("retries").help("How often to retry");
        let merged = ancestor.overridden_by(&descendant);
        assert_eq!(merged.default, Some(Value::Int(3)));
        assert_eq!(merged.help, "How often to retry");
    }

    #[test]
    fn test_hyphenated() {
        assert_eq!(
            ConfigField::boolean("dry_run").hyphenated(),
            Some("dry-run".to_string())
        );
        assert_eq!(ConfigField::boolean("force").hyphenated(), None);
    }
}
