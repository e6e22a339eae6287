//! Short option assignment.
//!
//! Letters are handed out in two passes over a schema in field order:
//! explicit `short` declarations first, then the initial letters of the
//! words of each remaining field name (`dry_run` tries `d`, then `r`). A
//! letter that is taken, reserved or already assigned is never reused; a
//! field that runs out of candidates is long-only.

use std::collections::{HashMap, HashSet};

use crate::schema::{ConfigField, Schema};

/// The short alias of `-h/--help`.
pub const HELP_SHORT: char = 'h';
/// The short alias of `-V/--version` on a versioned root.
pub const VERSION_SHORT: char = 'V';

/// Short letters assigned to the fields of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortAliases {
    assigned: HashMap<String, char>,
}

impl ShortAliases {
    /// Assigns letters to the non-positional fields of `fields`.
    pub fn assign<'a, I>(fields: I, reserved: &[char]) -> Self
    where
        I: IntoIterator<Item = &'a ConfigField>,
    {
        let fields: Vec<&ConfigField> = fields.into_iter().filter(|f| !f.positional).collect();
        let mut taken: HashSet<char> = reserved.iter().copied().collect();
        let mut assigned = HashMap::new();

        for field in &fields {
            if let Some(short) = field.short {
                if taken.insert(short) {
                    assigned.insert(field.name.clone(), short);
                }
            }
        }

        for field in &fields {
            if assigned.contains_key(&field.name) {
                continue;
            }
            if let Some(letter) = word_initials(&field.name).find(|c| !taken.contains(c)) {
                taken.insert(letter);
                assigned.insert(field.name.clone(), letter);
            }
        }

        Self { assigned }
    }

    /// Shorthand for [`assign`](Self::assign) over a whole schema.
    pub fn for_schema(schema: &Schema, reserved: &[char]) -> Self {
        Self::assign(schema.iter(), reserved)
    }

    pub fn get(&self, field: &str) -> Option<char> {
        self.assigned.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

fn word_initials(name: &str) -> impl Iterator<Item = char> + '_ {
    name.split(['_', '-'])
        .filter_map(|word| word.chars().next())
        .filter(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(list: Vec<ConfigField>) -> Schema {
        Schema::from_fields(list).unwrap()
    }

    #[test]
    fn test_initial_letters() {
        let schema = fields(vec![
            ConfigField::boolean("verbose"),
            ConfigField::string("email"),
            ConfigField::boolean("dry_run"),
        ]);
        let aliases = ShortAliases::for_schema(&schema, &[HELP_SHORT]);
        assert_eq!(aliases.get("verbose"), Some('v'));
        assert_eq!(aliases.get("email"), Some('e'));
        assert_eq!(aliases.get("dry_run"), Some('d'));
    }

    #[test]
    fn test_falls_back_to_later_words() {
        let schema = fields(vec![
            ConfigField::boolean("dry_run"),
            ConfigField::boolean("debug_run"),
            ConfigField::boolean("deep_rescan"),
        ]);
        let aliases = ShortAliases::for_schema(&schema, &[]);
        assert_eq!(aliases.get("dry_run"), Some('d'));
        assert_eq!(aliases.get("debug_run"), Some('r'));
        assert_eq!(aliases.get("deep_rescan"), None);
    }

    #[test]
    fn test_explicit_shorts_come_first() {
        let schema = fields(vec![
            ConfigField::string("email"),
            ConfigField::string("env_name").short('e'),
        ]);
        let aliases = ShortAliases::for_schema(&schema, &[]);
        assert_eq!(aliases.get("env_name"), Some('e'));
        assert_eq!(aliases.get("email"), None);
    }

    #[test]
    fn test_reserved_letters_are_skipped() {
        let schema = fields(vec![
            ConfigField::boolean("host"),
            ConfigField::string("v_mode").short('V'),
        ]);
        let aliases = ShortAliases::for_schema(&schema, &[HELP_SHORT, VERSION_SHORT]);
        assert_eq!(aliases.get("host"), None);
        assert_eq!(aliases.get("v_mode"), Some('v'));
    }

    #[test]
    fn test_positionals_get_no_short() {
        let schema = fields(vec![ConfigField::string("target").positional()]);
        assert!(ShortAliases::for_schema(&schema, &[]).is_empty());
    }
}
