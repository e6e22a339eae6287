//! The application entry point.
//!
//! [`App`] ties the pieces together: it scans its [`PackageSource`] into a
//! [`Registry`] on first use, builds the parser from the resulting tree and
//! dispatches command lines against it.
//!
//! ```rust,ignore
//! use cmdtree::{App, FsSource, HandlerTable};
//!
//! let handlers = HandlerTable::new().bind("list::main", list_notes);
//! let mut app = App::builder("notes")
//!     .version(env!("CARGO_PKG_VERSION"))
//!     .source(FsSource::new("commands", handlers))
//!     .build()?;
//! std::process::exit(app.run_from_env());
//! ```

use std::ffi::OsString;
use std::sync::Arc;
use tracing::debug;

use crate::dispatch::{Dispatcher, Parsed, Phase, RunResult};
use crate::env::{EnvReader, RealEnv};
use crate::error::{DispatchError, ScanError, UsageError, EXIT_SUCCESS};
use crate::identity::CommandIdentity;
use crate::parser::ParserBuilder;
use crate::registry::Registry;
use crate::scan::{
    default_strategies, EntryPointStrategy, PackageSource, ScanOptions, ScanReport, Scanner,
};
use crate::schema::{standard_root_fields, ConfigField};

/// Builder for constructing an [`App`].
pub struct AppBuilder {
    name: String,
    version: Option<String>,
    about: Option<String>,
    source: Option<Box<dyn PackageSource>>,
    registry: Option<Registry>,
    env: Option<Arc<dyn EnvReader>>,
    root_fields: Vec<ConfigField>,
    standard_flags: bool,
    fallback_discovery: bool,
    strategies: Option<Vec<Box<dyn EntryPointStrategy>>>,
}

impl AppBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            about: None,
            source: None,
            registry: None,
            env: None,
            root_fields: Vec::new(),
            standard_flags: true,
            fallback_discovery: true,
            strategies: None,
        }
    }

    /// Enables `-V/--version` and reserves `version` at the root.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Where commands are discovered from.
    pub fn source(mut self, source: impl PackageSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Registers into `registry` instead of the process-wide one.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Reads environment variables through `env` instead of the process
    /// environment.
    pub fn env(mut self, env: impl EnvReader + 'static) -> Self {
        self.env = Some(Arc::new(env));
        self
    }

    /// Adds a field available to every command.
    pub fn root_field(mut self, field: ConfigField) -> Self {
        self.root_fields.push(field);
        self
    }

    pub fn root_fields(mut self, fields: impl IntoIterator<Item = ConfigField>) -> Self {
        self.root_fields.extend(fields);
        self
    }

    /// Leaves out the standard `verbose` and `log_level` root fields.
    pub fn without_standard_flags(mut self) -> Self {
        self.standard_flags = false;
        self
    }

    /// Only functions carrying a command mark become commands.
    pub fn without_fallback_discovery(mut self) -> Self {
        self.fallback_discovery = false;
        self
    }

    /// Replaces the entry point strategy chain.
    pub fn strategies(mut self, strategies: Vec<Box<dyn EntryPointStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn build(self) -> Result<App, ScanError> {
        let source = self
            .source
            .ok_or_else(|| ScanError::MissingSource(self.name.clone()))?;

        let mut root_fields = if self.standard_flags {
            standard_root_fields()
        } else {
            Vec::new()
        };
        root_fields.extend(self.root_fields);

        let reserved_root_names = if self.version.is_some() {
            vec!["version"]
        } else {
            Vec::new()
        };

        let options = ScanOptions {
            program: self.name.clone(),
            root_fields,
            reserved_root_names,
            strategies: self
                .strategies
                .unwrap_or_else(|| default_strategies(self.fallback_discovery)),
        };

        let mut parser = ParserBuilder::new();
        if let Some(version) = self.version {
            parser = parser.version(version);
        }
        if let Some(about) = self.about {
            parser = parser.about(about);
        }

        Ok(App {
            name: self.name,
            source,
            options,
            parser,
            registry: self.registry.unwrap_or_default(),
            env: self.env.unwrap_or_else(|| Arc::new(RealEnv)),
            scanned: None,
            phase: Phase::Unscanned,
        })
    }
}

struct Scanned {
    report: ScanReport,
    dispatcher: Dispatcher,
}

/// A scanned-on-demand command line application.
pub struct App {
    name: String,
    source: Box<dyn PackageSource>,
    options: ScanOptions,
    parser: ParserBuilder,
    registry: Registry,
    env: Arc<dyn EnvReader>,
    scanned: Option<Scanned>,
    phase: Phase,
}

impl App {
    pub fn builder(name: impl Into<String>) -> AppBuilder {
        AppBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The scan report, once scanned.
    pub fn report(&self) -> Option<&ScanReport> {
        self.scanned.as_ref().map(|s| &s.report)
    }

    /// Scans the source. Later calls return the first report.
    pub fn scan(&mut self) -> Result<&ScanReport, ScanError> {
        let scanned = match self.scanned.take() {
            Some(scanned) => scanned,
            None => self.scan_source()?,
        };
        Ok(&self.scanned.insert(scanned).report)
    }

    /// Renders the help of the command at `path` (names below the root).
    pub fn render_help<S: AsRef<str>>(&mut self, path: &[S]) -> Result<Option<String>, ScanError> {
        let tree = self.scan()?.tree.clone();
        Ok(self.parser.render_help(&tree, path))
    }

    /// Parses `args` (program name first) and runs the matched handler,
    /// scanning first if needed.
    pub fn dispatch_from<I, T>(&mut self, args: I) -> Result<RunResult, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let scanned = match self.scanned.take() {
            Some(scanned) => scanned,
            None => match self.scan_source() {
                Ok(scanned) => scanned,
                Err(e) => {
                    self.phase = Phase::InternalError;
                    return Err(e.into());
                }
            },
        };

        let result = drive(&scanned.dispatcher, &mut self.phase, args);
        self.phase = Phase::after(&result);
        self.scanned = Some(scanned);
        result
    }

    /// Dispatches `args`, prints the outcome and returns the exit code.
    pub fn run<I, T>(&mut self, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self.dispatch_from(args) {
            Ok(result) => {
                if let Some(text) = result.render() {
                    if text.ends_with('\n') {
                        print!("{text}");
                    } else {
                        println!("{text}");
                    }
                }
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("{}", self.error_message(&err));
                err.exit_code()
            }
        }
    }

    /// [`run`](Self::run) with the process arguments.
    pub fn run_from_env(&mut self) -> i32 {
        self.run(std::env::args_os())
    }

    /// How `err` is shown to the user.
    pub fn error_message(&self, err: &DispatchError) -> String {
        match err {
            DispatchError::Usage(UsageError::Parse { message }) => {
                message.trim_end().to_string()
            }
            DispatchError::Usage(usage) => {
                let command = match usage {
                    UsageError::MissingRequiredField { command, .. } => Some(command),
                    _ => None,
                };
                format!(
                    "error: {usage}\n\nFor more information, try '{}'.",
                    self.help_hint(command)
                )
            }
            DispatchError::Handler { source, .. } => format!("error: {source:#}"),
            other => format!("error: {other}"),
        }
    }

    fn help_hint(&self, command: Option<&CommandIdentity>) -> String {
        let mut hint = vec![self.name.as_str()];
        if let Some(command) = command {
            hint.extend(command.segments().iter().map(String::as_str));
        }
        hint.push("--help");
        hint.join(" ")
    }

    fn scan_source(&mut self) -> Result<Scanned, ScanError> {
        let report = Scanner::new(self.source.as_ref(), &self.options).scan(&self.registry)?;
        let dispatcher = Dispatcher::new(
            report.tree.clone(),
            self.registry.clone(),
            &self.parser,
            self.env.clone(),
        );
        self.phase = Phase::Scanned;
        Ok(Scanned { report, dispatcher })
    }
}

fn drive<I, T>(
    dispatcher: &Dispatcher,
    phase: &mut Phase,
    args: I,
) -> Result<RunResult, DispatchError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    *phase = Phase::Parsing;
    match dispatcher.parse(args)? {
        Parsed::Help(text) => Ok(RunResult::Help(text)),
        Parsed::Command(invocation) => {
            *phase = Phase::Dispatching;
            debug!(command = %invocation.identity(), "dispatching");
            let output = invocation.run()?;
            Ok(RunResult::Handled {
                identity: invocation.entry.identity.clone(),
                output,
            })
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("options", &self.options)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}
