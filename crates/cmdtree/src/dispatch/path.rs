//! Following the matched subcommand chain.
//!
//! Core utilities for extracting command paths from clap `ArgMatches` and
//! reading typed values back out of them.

use clap::parser::ValueSource as ClapSource;
use clap::parser::MatchesError;
use clap::ArgMatches;

use crate::context::SuppliedValues;
use crate::error::InternalError;
use crate::parser::level_fields;
use crate::schema::{ConfigField, Value, ValueType};
use crate::tree::CommandNode;

/// Extracts the command path from ArgMatches by following the subcommand chain.
///
/// For example, `myapp user create` produces `["user", "create"]`.
pub fn extract_command_path(matches: &ArgMatches) -> Vec<String> {
    matches_chain(matches)
        .into_iter()
        .skip(1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// The matches of every level from the root down, paired with the
/// subcommand name that selected them (empty for the root).
pub fn matches_chain(matches: &ArgMatches) -> Vec<(&str, &ArgMatches)> {
    let mut chain = vec![("", matches)];
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        chain.push((name, sub));
        current = sub;
    }
    chain
}

/// Converts a command path vector to a dot-separated string.
///
/// For example, `["db", "migrate"]` becomes `"db.migrate"`.
pub fn path_to_string(path: &[String]) -> String {
    path.join(".")
}

/// Adds the values supplied on the command line at `node`'s level.
///
/// Only values that actually came from the command line are taken; clap
/// never sees defaults, so anything else is left to the merger.
pub fn collect_level(
    node: &CommandNode,
    matches: &ArgMatches,
    supplied: &mut SuppliedValues,
) -> Result<(), InternalError> {
    for field in level_fields(node) {
        if let Some(value) = read_value(matches, field)? {
            supplied.insert(field.name.clone(), value);
        }
    }
    Ok(())
}

fn read_value(matches: &ArgMatches, field: &ConfigField) -> Result<Option<Value>, InternalError> {
    let id = field.name.as_str();
    if matches.value_source(id) != Some(ClapSource::CommandLine) {
        return Ok(None);
    }

    let extraction = |e: MatchesError| InternalError::ValueExtraction {
        field: field.name.clone(),
        reason: e.to_string(),
    };
    let value = match field.ty.base() {
        ValueType::Boolean => matches
            .try_get_one::<bool>(id)
            .map_err(extraction)?
            .map(|b| Value::Bool(*b)),
        ValueType::Integer => matches
            .try_get_one::<i64>(id)
            .map_err(extraction)?
            .map(|i| Value::Int(*i)),
        ValueType::Float => matches
            .try_get_one::<f64>(id)
            .map_err(extraction)?
            .map(|f| Value::Float(*f)),
        ValueType::StringList => matches
            .try_get_many::<String>(id)
            .map_err(extraction)?
            .map(|values| Value::List(values.cloned().collect())),
        ValueType::String | ValueType::Choice(_) | ValueType::Optional(_) => matches
            .try_get_one::<String>(id)
            .map_err(extraction)?
            .map(|s| Value::Str(s.clone())),
    };
    Ok(value)
}
