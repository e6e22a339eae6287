//! Root-to-leaf schema merging and command-line value collection.

use crate::error::SchemaConflict;
use crate::schema::{Schema, Value};

/// Folds the own schemas along a root-to-leaf path into the leaf's
/// effective schema.
///
/// Applying this to the same path always gives the same result, which is
/// what makes per-node effective schemas safe to compute once at scan time.
pub fn effective_schema<'a, I>(path: I) -> Result<Schema, SchemaConflict>
where
    I: IntoIterator<Item = &'a Schema>,
{
    path.into_iter()
        .try_fold(Schema::empty(), |acc, own| acc.inherit(own))
}

/// Values the command line supplied, collected along the matched path.
///
/// Inserting a name a second time replaces the earlier value, so collecting
/// from the root down lets deeper levels win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuppliedValues {
    values: Vec<(String, Value)>,
}

impl SuppliedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for SuppliedValues {
    fn from_iter<T: IntoIterator<Item = (N, Value)>>(iter: T) -> Self {
        let mut supplied = SuppliedValues::new();
        for (name, value) in iter {
            supplied.insert(name, value);
        }
        supplied
    }
}
