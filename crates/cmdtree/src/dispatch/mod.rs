//! Routing a command line to its handler.
//!
//! Dispatch happens in two steps. [`Dispatcher::parse`] tokenizes the
//! arguments with clap, walks the matched subcommand chain down the
//! command tree, collects command-line values along the way (deeper levels
//! win) and resolves them into a [`ResolvedContext`]. [`Invocation::run`]
//! then calls the handler. [`Dispatcher::dispatch_from`] does both.
//!
//! ```text
//! Unscanned -> Scanned -> Parsing -> Dispatching -> Completed
//!                            |            |
//!                            +------------+-----> UserError | InternalError
//! ```

mod path;

pub use path::{collect_level, extract_command_path, matches_chain, path_to_string};

use clap::error::ErrorKind;
use std::ffi::OsString;
use std::sync::Arc;
use tracing::{debug, error};

use crate::context::{resolve, ResolvedContext, SuppliedValues};
use crate::env::EnvReader;
use crate::error::{DispatchError, InternalError, UsageError};
use crate::handler::Output;
use crate::identity::CommandIdentity;
use crate::parser::ParserBuilder;
use crate::registry::{CommandEntry, Registry};
use crate::tree::CommandTree;

/// Where an application is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unscanned,
    Scanned,
    Parsing,
    Dispatching,
    Completed,
    UserError,
    InternalError,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::UserError | Phase::InternalError)
    }

    /// The terminal phase a dispatch result leads to.
    pub fn after(result: &Result<RunResult, DispatchError>) -> Phase {
        match result {
            Ok(_) | Err(DispatchError::Handler { .. }) => Phase::Completed,
            Err(DispatchError::Usage(_)) => Phase::UserError,
            Err(DispatchError::Scan(_)) | Err(DispatchError::Internal(_)) => Phase::InternalError,
        }
    }
}

/// The result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// `--help` or `--version` was requested; contains the rendered text.
    Help(String),
    /// A handler ran.
    Handled {
        identity: CommandIdentity,
        output: Output,
    },
}

impl RunResult {
    pub fn is_help(&self) -> bool {
        matches!(self, RunResult::Help(_))
    }

    pub fn output(&self) -> Option<&Output> {
        match self {
            RunResult::Handled { output, .. } => Some(output),
            RunResult::Help(_) => None,
        }
    }

    /// Text to print on stdout, if any.
    pub fn render(&self) -> Option<String> {
        match self {
            RunResult::Help(text) => Some(text.clone()),
            RunResult::Handled { output, .. } => output.render(),
        }
    }
}

/// A resolved command, ready to run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub entry: Arc<CommandEntry>,
    pub context: ResolvedContext,
}

impl Invocation {
    pub fn identity(&self) -> &CommandIdentity {
        &self.entry.identity
    }

    /// Calls the handler. Its error is passed through untouched.
    pub fn run(&self) -> Result<Output, DispatchError> {
        debug!(command = %self.entry.identity, "invoking handler");
        self.entry
            .handler
            .call(&self.context)
            .map_err(|source| DispatchError::Handler {
                identity: self.entry.identity.clone(),
                source,
            })
    }
}

/// What parsing a command line produced.
#[derive(Debug, Clone)]
pub enum Parsed {
    Help(String),
    Command(Invocation),
}

/// Parses command lines against one scanned tree.
pub struct Dispatcher {
    tree: Arc<CommandTree>,
    registry: Registry,
    command: clap::Command,
    env: Arc<dyn EnvReader>,
}

impl Dispatcher {
    pub fn new(
        tree: Arc<CommandTree>,
        registry: Registry,
        parser: &ParserBuilder,
        env: Arc<dyn EnvReader>,
    ) -> Self {
        let command = parser.build(&tree);
        Self {
            tree,
            registry,
            command,
            env,
        }
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// The generated clap command.
    pub fn command(&self) -> &clap::Command {
        &self.command
    }

    /// Parses `args` (program name first) and resolves the context.
    pub fn parse<I, T>(&self, args: I) -> Result<Parsed, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.command.clone().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                        Ok(Parsed::Help(e.render().to_string()))
                    }
                    _ => Err(UsageError::Parse {
                        message: e.render().to_string(),
                    }
                    .into()),
                };
            }
        };

        let mut supplied = SuppliedValues::new();
        let mut node = self.tree.root();
        for (depth, (name, level)) in matches_chain(&matches).into_iter().enumerate() {
            if depth > 0 {
                node = self
                    .tree
                    .children(node.id)
                    .find(|child| child.name == name)
                    .ok_or_else(|| {
                        let path = path_to_string(&extract_command_path(&matches));
                        error!(%path, "parser matched a path outside the command tree");
                        InternalError::UnknownPath(path)
                    })?;
            }
            collect_level(node, level, &mut supplied)?;
        }

        if node.is_group() {
            error!(command = %node.identity, "parser stopped at a group");
            return Err(InternalError::NotALeaf(node.identity.clone()).into());
        }

        let entry = self.registry.lookup(&node.identity).map_err(|e| {
            error!(
                command = %node.identity,
                registered = self.registry.len(),
                error = %e,
                "parsed command is missing from the registry"
            );
            InternalError::RegistryMismatch(node.identity.clone())
        })?;

        let context = resolve(&entry.identity, &entry.schema, &supplied, self.env.as_ref())?;
        Ok(Parsed::Command(Invocation { entry, context }))
    }

    /// Parses `args`, then runs the matched handler.
    pub fn dispatch_from<I, T>(&self, args: I) -> Result<RunResult, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self.parse(args)? {
            Parsed::Help(text) => Ok(RunResult::Help(text)),
            Parsed::Command(invocation) => {
                let output = invocation.run()?;
                Ok(RunResult::Handled {
                    identity: invocation.entry.identity.clone(),
                    output,
                })
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("nodes", &self.tree.len())
            .field("registry", &self.registry.len())
            .finish_non_exhaustive()
    }
}
