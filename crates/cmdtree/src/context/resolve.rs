use tracing::trace;

use super::merge::SuppliedValues;
use super::{ResolvedContext, ResolvedEntry, ValueSource};
use crate::env::EnvReader;
use crate::error::UsageError;
use crate::identity::CommandIdentity;
use crate::schema::{ConfigField, Schema, Value};

/// Resolves every field of `schema` into a frozen context.
///
/// Each field takes the first value found in this order:
///
/// 1. the command line (`supplied`),
/// 2. the field's environment variable, parsed per its type,
/// 3. the declared default,
/// 4. the implicit value (`false` for flags, empty for lists, `null` for
///    optionals).
///
/// A field left without a value is a [`UsageError::MissingRequiredField`]
/// naming the field and the command.
pub fn resolve(
    identity: &CommandIdentity,
    schema: &Schema,
    supplied: &SuppliedValues,
    env: &dyn EnvReader,
) -> Result<ResolvedContext, UsageError> {
    let mut entries = Vec::with_capacity(schema.len());
    for field in schema {
        let (value, source) = resolve_field(identity, field, supplied, env)?;
        trace!(command = %identity, field = %field.name, ?source, "resolved field");
        entries.push(ResolvedEntry {
            name: field.name.clone(),
            value,
            source,
        });
    }
    Ok(ResolvedContext::new(identity.clone(), entries))
}

fn resolve_field(
    identity: &CommandIdentity,
    field: &ConfigField,
    supplied: &SuppliedValues,
    env: &dyn EnvReader,
) -> Result<(Value, ValueSource), UsageError> {
    if let Some(value) = supplied.get(&field.name) {
        return Ok((value.clone(), ValueSource::CommandLine));
    }

    if let Some(var) = &field.env {
        if let Some(raw) = env.var(var) {
            let value =
                field
                    .ty
                    .parse_str(&raw)
                    .map_err(|reason| UsageError::InvalidEnvironmentValue {
                        var: var.clone(),
                        field: field.name.clone(),
                        reason,
                    })?;
            return Ok((value, ValueSource::Environment));
        }
    }

    if let Some(default) = &field.default {
        return Ok((default.clone(), ValueSource::Default));
    }

    // A required flag that nobody set is simply off.
    let implicit = if field.required && !field.ty.is_flag() {
        None
    } else {
        field.ty.implicit_value()
    };

    implicit
        .map(|value| (value, ValueSource::Implicit))
        .ok_or_else(|| UsageError::MissingRequiredField {
            field: field.name.clone(),
            command: identity.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MockEnv;
    use crate::schema::ValueType;

    fn identity() -> CommandIdentity {
        CommandIdentity::parse("user.create")
    }

    fn schema() -> Schema {
        Schema::from_fields([
            ConfigField::boolean("verbose").default(false),
            ConfigField::string("email").required().env("USER_EMAIL"),
            ConfigField::boolean("dry_run").default(false),
            ConfigField::integer("retries").default(3).env("RETRIES"),
            ConfigField::list("tags"),
            ConfigField::optional("note", ValueType::String),
        ])
        .unwrap()
    }

    #[test]
    fn test_command_line_wins() {
        let supplied: SuppliedValues = [
            ("email", Value::from("cli@b.com")),
            ("retries", Value::Int(9)),
        ]
        .into_iter()
        .collect();
        let env = MockEnv::new()
            .with_var("USER_EMAIL", "env@b.com")
            .with_var("RETRIES", "5");

        let ctx = resolve(&identity(), &schema(), &supplied, &env).unwrap();
        assert_eq!(ctx.get_str("email"), Some("cli@b.com"));
        assert_eq!(ctx.get_int("retries"), Some(9));
        assert_eq!(ctx.source("retries"), Some(ValueSource::CommandLine));
    }

    #[test]
    fn test_environment_beats_default() {
        let env = MockEnv::new()
            .with_var("USER_EMAIL", "env@b.com")
            .with_var("RETRIES", "5");

        let ctx = resolve(&identity(), &schema(), &SuppliedValues::new(), &env).unwrap();
        assert_eq!(ctx.get_str("email"), Some("env@b.com"));
        assert_eq!(ctx.get_int("retries"), Some(5));
        assert_eq!(ctx.source("email"), Some(ValueSource::Environment));
    }

    #[test]
    fn test_defaults_and_implicit_values() {
        let supplied: SuppliedValues = [("email", Value::from("a@b.com"))].into_iter().collect();
        let ctx = resolve(&identity(), &schema(), &supplied, &MockEnv::new()).unwrap();

        assert_eq!(ctx.get_bool("dry_run"), Some(false));
        assert_eq!(ctx.source("dry_run"), Some(ValueSource::Default));
        assert_eq!(ctx.get_int("retries"), Some(3));
        assert_eq!(ctx.get_list("tags"), Some(&[][..]));
        assert_eq!(ctx.source("tags"), Some(ValueSource::Implicit));
        assert_eq!(ctx.get("note"), Some(&Value::Null));
        assert_eq!(ctx.len(), 6);
    }

    #[test]
    fn test_missing_required_names_field_and_command() {
        let err = resolve(&identity(), &schema(), &SuppliedValues::new(), &MockEnv::new())
            .unwrap_err();
        assert_eq!(
            err,
            UsageError::MissingRequiredField {
                field: "email".into(),
                command: identity(),
            }
        );
    }

    #[test]
    fn test_plain_string_without_default_is_missing() {
        let schema = Schema::from_fields([ConfigField::string("name")]).unwrap();
        let err = resolve(&identity(), &schema, &SuppliedValues::new(), &MockEnv::new())
            .unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_required_flag_resolves_to_false() {
        let schema = Schema::from_fields([ConfigField::boolean("confirm").required()]).unwrap();
        let ctx = resolve(&identity(), &schema, &SuppliedValues::new(), &MockEnv::new()).unwrap();
        assert_eq!(ctx.get_bool("confirm"), Some(false));
    }

    #[test]
    fn test_malformed_environment_value() {
        let env = MockEnv::new()
            .with_var("USER_EMAIL", "a@b.com")
            .with_var("RETRIES", "many");
        let err = resolve(&identity(), &schema(), &SuppliedValues::new(), &env).unwrap_err();
        assert!(matches!(
            err,
            UsageError::InvalidEnvironmentValue { ref var, ref field, .. }
                if var == "RETRIES" && field == "retries"
        ));
    }
}
