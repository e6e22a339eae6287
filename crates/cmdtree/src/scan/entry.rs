//! Entry-point strategies: which functions of a module become commands.
//!
//! The scanner asks each strategy in turn and uses the first one that
//! finds anything. The default chain is [`MarkedEntryPoints`] followed by
//! [`ConventionalEntryPoints`].

use tracing::debug;

use super::source::ModuleUnit;
use crate::error::DiscoveryError;
use crate::handler::Handler;
use crate::identity::normalize_name;
use crate::schema::ConfigField;
use crate::tree::CommandOrigin;

/// Function names the conventional strategy accepts.
pub const CONVENTIONAL_TOKENS: &[&str] = &["main", "run", "exec"];

/// A function selected to become a command.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    /// Normalized command name.
    pub name: String,
    pub help: String,
    /// Fields contributed by the entry point itself, on top of the
    /// module's.
    pub fields: Vec<ConfigField>,
    pub handler: Handler,
    pub origin: CommandOrigin,
}

/// Picks the command functions of a module.
pub trait EntryPointStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the module's entry points, or an empty list if this strategy
    /// finds none.
    fn entry_points(&self, module: &ModuleUnit) -> Result<Vec<EntryPoint>, DiscoveryError>;
}

/// Every function carrying a [`CommandMark`](super::CommandMark).
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkedEntryPoints;

impl EntryPointStrategy for MarkedEntryPoints {
    fn name(&self) -> &'static str {
        "marked"
    }

    fn entry_points(&self, module: &ModuleUnit) -> Result<Vec<EntryPoint>, DiscoveryError> {
        Ok(module
            .functions
            .iter()
            .filter_map(|function| {
                let mark = function.mark.as_ref()?;
                let name = mark.name.as_deref().unwrap_or(&function.name);
                Some(EntryPoint {
                    name: normalize_name(name),
                    help: mark.help.clone().unwrap_or_else(|| module.help.clone()),
                    fields: mark.fields.clone(),
                    handler: function.handler.clone(),
                    origin: CommandOrigin {
                        module: module.path.to_string(),
                        function: function.name.clone(),
                        strategy: self.name(),
                    },
                })
            })
            .collect())
    }
}

/// The fallback for modules without marks: a single unmarked function with
/// a conventional name becomes a command named after the module.
#[derive(Debug, Clone)]
pub struct ConventionalEntryPoints {
    tokens: Vec<String>,
}

impl Default for ConventionalEntryPoints {
    fn default() -> Self {
        Self::with_tokens(CONVENTIONAL_TOKENS.iter().copied())
    }
}

impl ConventionalEntryPoints {
    pub fn with_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl EntryPointStrategy for ConventionalEntryPoints {
    fn name(&self) -> &'static str {
        "conventional"
    }

    fn entry_points(&self, module: &ModuleUnit) -> Result<Vec<EntryPoint>, DiscoveryError> {
        if module.functions.iter().any(|f| f.is_marked()) {
            return Ok(Vec::new());
        }

        let candidates: Vec<_> = module
            .functions
            .iter()
            .filter(|f| self.tokens.iter().any(|t| *t == f.name))
            .collect();

        match candidates.as_slice() {
            [] => Ok(Vec::new()),
            [function] => {
                debug!(
                    module = %module.path,
                    function = %function.name,
                    "using conventional entry point"
                );
                Ok(vec![EntryPoint {
                    name: normalize_name(&module.path.stem),
                    help: module.help.clone(),
                    fields: Vec::new(),
                    handler: function.handler.clone(),
                    origin: CommandOrigin {
                        module: module.path.to_string(),
                        function: function.name.clone(),
                        strategy: self.name(),
                    },
                }])
            }
            many => Err(DiscoveryError::AmbiguousEntryPoint {
                candidates: many.iter().map(|f| f.name.clone()).collect(),
            }),
        }
    }
}

/// The default strategy chain.
pub fn default_strategies(with_fallback: bool) -> Vec<Box<dyn EntryPointStrategy>> {
    let mut strategies: Vec<Box<dyn EntryPointStrategy>> = vec![Box::new(MarkedEntryPoints)];
    if with_fallback {
        strategies.push(Box::new(ConventionalEntryPoints::default()));
    }
    strategies
}
