//! Turns a [`CommandTree`] into a `clap` command.
//!
//! Every node becomes a `clap::Command` carrying the node's effective
//! schema, so fields declared at the root act as global options accepted at
//! every level. Groups require a subcommand; leaves accept their fields.
//!
//! Defaults, environment variables and required fields are *not* handed to
//! clap. They are shown in the help text but applied by
//! [`resolve`](crate::context::resolve), which keeps the command line, the
//! environment and declared defaults in one precedence chain.

mod alias;

pub use alias::{ShortAliases, HELP_SHORT, VERSION_SHORT};

use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, Command};

use crate::schema::{ConfigField, ValueType};
use crate::tree::{CommandNode, CommandTree};

/// Builds the `clap` command for a tree.
#[derive(Debug, Clone, Default)]
pub struct ParserBuilder {
    version: Option<String>,
    about: Option<String>,
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables `-V/--version` on the root.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Root description, used when the root package has no help of its own.
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    /// Short letters never handed to fields at `node`.
    pub fn reserved_shorts(&self, node: &CommandNode) -> Vec<char> {
        let mut reserved = vec![HELP_SHORT];
        if node.parent.is_none() && self.has_version() {
            reserved.push(VERSION_SHORT);
        }
        reserved
    }

    pub fn build(&self, tree: &CommandTree) -> Command {
        let root = tree.root();
        let mut cmd = self.build_node(tree, root);
        if let Some(version) = &self.version {
            cmd = cmd.version(version.clone());
        }
        if root.help.is_empty() {
            if let Some(about) = &self.about {
                cmd = cmd.about(about.clone());
            }
        }
        cmd
    }

    /// Renders the help of the node at `path` (child names from the root).
    pub fn render_help<S: AsRef<str>>(&self, tree: &CommandTree, path: &[S]) -> Option<String> {
        let mut cmd = self.build(tree);
        cmd.build();
        let mut current = &mut cmd;
        for segment in path {
            current = current.find_subcommand_mut(segment.as_ref())?;
        }
        Some(current.render_help().to_string())
    }

    fn build_node(&self, tree: &CommandTree, node: &CommandNode) -> Command {
        let mut cmd = Command::new(node.name.clone());
        if !node.help.is_empty() {
            cmd = cmd.about(node.help.clone());
        }
        if let Some(hyphenated) = hyphenated(&node.name) {
            cmd = cmd.alias(hyphenated);
        }

        let shorts = ShortAliases::assign(level_fields(node), &self.reserved_shorts(node));
        for field in level_fields(node) {
            cmd = cmd.arg(build_arg(field, shorts.get(&field.name)));
        }

        if node.is_group() {
            cmd = cmd
                .subcommand_required(true)
                .arg_required_else_help(true)
                .disable_help_subcommand(true);
            for child in tree.children(node.id) {
                cmd = cmd.subcommand(self.build_node(tree, child));
            }
        }
        cmd
    }
}

/// The fields a node exposes as arguments. Groups take options only;
/// positionals belong to the command that consumes them.
pub fn level_fields(node: &CommandNode) -> impl Iterator<Item = &ConfigField> {
    let group = node.is_group();
    node.schema.iter().filter(move |f| !(group && f.positional))
}

fn hyphenated(name: &str) -> Option<String> {
    name.contains('_').then(|| name.replace('_', "-"))
}

/// The help line of a field with its effective default, environment
/// variable and required marker appended.
pub fn help_line(field: &ConfigField) -> String {
    let mut parts = Vec::new();
    if !field.help.is_empty() {
        parts.push(field.help.clone());
    }
    if let Some(default) = &field.default {
        if !default.is_null() {
            parts.push(format!("[default: {default}]"));
        }
    }
    if let Some(env) = &field.env {
        parts.push(format!("[env: {env}]"));
    }
    if field.required {
        parts.push("[required]".to_string());
    }
    parts.join(" ")
}

fn build_arg(field: &ConfigField, short: Option<char>) -> Arg {
    let mut arg = Arg::new(field.name.clone()).help(help_line(field));

    if field.positional {
        arg = arg.value_name(field.name.to_uppercase());
    } else {
        arg = arg.long(field.long().to_string());
        if let Some(hyphenated) = field.hyphenated() {
            arg = arg.alias(hyphenated);
        }
        if let Some(short) = short {
            arg = arg.short(short);
        }
    }

    match field.ty.base() {
        ValueType::Boolean if !field.positional => arg.action(ArgAction::SetTrue),
        ValueType::Boolean => arg
            .action(ArgAction::Set)
            .value_parser(clap::builder::BoolishValueParser::new()),
        ValueType::Integer => arg
            .action(ArgAction::Set)
            .value_name(value_name(field))
            .value_parser(value_parser!(i64)),
        ValueType::Float => arg
            .action(ArgAction::Set)
            .value_name(value_name(field))
            .value_parser(value_parser!(f64)),
        ValueType::Choice(values) => arg
            .action(ArgAction::Set)
            .value_name(value_name(field))
            .value_parser(PossibleValuesParser::new(values.clone())),
        ValueType::StringList if field.positional => arg
            .action(ArgAction::Append)
            .num_args(1..)
            .value_parser(value_parser!(String)),
        ValueType::StringList => arg
            .action(ArgAction::Append)
            .value_name(value_name(field))
            .value_delimiter(',')
            .value_parser(value_parser!(String)),
        ValueType::String | ValueType::Optional(_) => arg
            .action(ArgAction::Set)
            .value_name(value_name(field))
            .value_parser(value_parser!(String)),
    }
}

fn value_name(field: &ConfigField) -> String {
    if field.positional {
        field.name.to_uppercase()
    } else {
        "VALUE".to_string()
    }
}
