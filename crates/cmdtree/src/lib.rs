//! # cmdtree - Hierarchical CLI Discovery and Dispatch
//!
//! cmdtree builds a nested `clap` command line from a tree of packages and
//! command units, and routes each invocation to its handler with a fully
//! merged, immutable context:
//!
//! - Commands are discovered once, depth first, from a [`PackageSource`]
//!   (a directory of YAML descriptors, or the same tree declared in code)
//! - Configuration fields are inherited down the tree; a command's
//!   effective schema is the union of its ancestors' fields and its own
//! - Values are layered command line > environment > default
//! - Every level gets contextual `--help`
//!
//! ## Core Concepts
//!
//! - [`ConfigField`] / [`Schema`]: typed field declarations and their
//!   inheritance ([`Schema::inherit`])
//! - [`Registry`]: identity to handler, filled by the [`Scanner`]
//! - [`CommandTree`]: the discovered groups and commands
//! - [`ResolvedContext`]: the frozen values a handler receives
//! - [`App`]: scans on first use, parses, dispatches and maps errors to
//!   exit codes
//!
//! ## Quick Start
//!
//! ```rust
//! use cmdtree::{
//!     App, CommandMark, ConfigField, Handler, HandlerResult, Output, Registry, StaticModule,
//!     StaticPackage, StaticSource,
//! };
//!
//! let create = Handler::new(|ctx| -> HandlerResult {
//!     Ok(Output::Text(format!("created {}", ctx.get_str("email").unwrap_or_default())))
//! });
//! let source = StaticSource::new(StaticPackage::new().package(
//!     "user",
//!     StaticPackage::new().module(StaticModule::new("create").command(
//!         "create",
//!         create,
//!         CommandMark::new().field(ConfigField::string("email").required()),
//!     )),
//! ));
//!
//! let mut app = App::builder("admin")
//!     .source(source)
//!     .registry(Registry::isolated())
//!     .build()
//!     .unwrap();
//! let result = app
//!     .dispatch_from(["admin", "user", "create", "--email", "a@b.com"])
//!     .unwrap();
//! assert_eq!(result.render().as_deref(), Some("created a@b.com"));
//! ```
//!
//! ## Typed Records
//!
//! Fields can be declared on a struct with `#[derive(Config)]` and read back
//! with [`Handler::typed`]:
//!
//! ```rust
//! use cmdtree::{Config, ConfigRecord, Handler, HandlerResult, Output};
//! use serde::Deserialize;
//!
//! #[derive(Config, Deserialize)]
//! struct Create {
//!     /// Address of the new user
//!     email: String,
//!     #[config(default = false)]
//!     dry_run: bool,
//! }
//!
//! assert_eq!(Create::fields().len(), 2);
//! let handler = Handler::typed(|args: Create| -> HandlerResult {
//!     Ok(Output::Text(args.email))
//! });
//! # let _ = handler;
//! ```

extern crate self as cmdtree;

pub mod app;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod handler;
pub mod identity;
pub mod parser;
pub mod registry;
pub mod scan;
pub mod schema;
pub mod tree;

pub use app::{App, AppBuilder};
pub use context::{resolve, ResolvedContext, ResolvedEntry, SuppliedValues, ValueSource};
pub use dispatch::{Dispatcher, Invocation, Parsed, Phase, RunResult};
pub use env::{EnvReader, MockEnv, RealEnv};
pub use error::{
    DiscoveryError, DispatchError, ImportError, InternalError, RegistryError, ScanError,
    SchemaConflict, UsageError, EXIT_HANDLER_FAILURE, EXIT_INTERNAL, EXIT_SUCCESS, EXIT_USAGE,
};
pub use handler::{Handler, HandlerResult, IntoHandlerResult, Output};
pub use identity::{is_valid_name, normalize_name, CommandIdentity};
pub use parser::ParserBuilder;
pub use registry::{CommandEntry, CommandMetadata, Registry, ScanGuard};
pub use scan::{
    CommandMark, Diagnostic, EntryPointStrategy, FsSource, FunctionDecl, HandlerTable,
    ModulePath, ModuleUnit, PackagePath, PackageSource, ScanOptions, ScanReport, Scanner,
    StaticModule, StaticPackage, StaticSource,
};
pub use schema::{standard_root_fields, ConfigField, ConfigRecord, Schema, Value, ValueType};
pub use tree::{CommandNode, CommandOrigin, CommandTree, NodeId, NodeKind};

pub use cmdtree_macros::Config;
