//! The frozen, fully merged context handed to a handler.
//!
//! A [`ResolvedContext`] holds one value for every field of a leaf's
//! effective schema, together with where that value came from. It is built
//! once per dispatch by [`resolve`] and has no mutating API.

mod merge;
mod resolve;

pub use merge::{effective_schema, SuppliedValues};
pub use resolve::resolve;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::identity::CommandIdentity;
use crate::schema::Value;

/// Which layer supplied a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    CommandLine,
    Environment,
    Default,
    /// `false` for flags, empty for lists, `null` for optionals.
    Implicit,
}

/// One resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub name: String,
    pub value: Value,
    pub source: ValueSource,
}

/// Immutable mapping from field name to resolved value.
///
/// Entries keep the order of the effective schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    identity: CommandIdentity,
    entries: Vec<ResolvedEntry>,
}

impl ResolvedContext {
    pub(crate) fn new(identity: CommandIdentity, entries: Vec<ResolvedEntry>) -> Self {
        Self { identity, entries }
    }

    /// The command this context was resolved for.
    pub fn identity(&self) -> &CommandIdentity {
        &self.identity
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entry(name).map(|e| &e.value)
    }

    pub fn entry(&self, name: &str) -> Option<&ResolvedEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn source(&self, name: &str) -> Option<ValueSource> {
        self.entry(name).map(|e| e.source)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(Value::as_list)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The context as a JSON object keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|e| (e.name.clone(), e.value.to_json()))
                .collect(),
        )
    }

    /// Deserializes the context into a typed record.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl Serialize for ResolvedContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.value)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a ResolvedContext {
    type Item = &'a ResolvedEntry;
    type IntoIter = std::slice::Iter<'a, ResolvedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
