//! Command discovery.
//!
//! The [`Scanner`] walks a [`PackageSource`] once, depth first:
//!
//! 1. the root must be a package, otherwise the scan fails with
//!    [`ScanError::InvalidPackage`];
//! 2. every package becomes a group node, every entry point found by the
//!    strategy chain becomes a command;
//! 3. each level's fields are merged into the schema passed down;
//! 4. problems with one module or subtree are recorded as [`Diagnostic`]s
//!    and the rest of the scan carries on;
//! 5. groups without any command are pruned;
//! 6. every command is registered in depth-first, alphabetical order; a
//!    command the registry refuses is left out of the tree.
//!
//! Given the same source, two scans produce identical trees and registry
//! contents.

mod entry;
mod fs;
mod source;
mod table;

pub use entry::{
    default_strategies, ConventionalEntryPoints, EntryPoint, EntryPointStrategy,
    MarkedEntryPoints, CONVENTIONAL_TOKENS,
};
pub use fs::{FsSource, PACKAGE_MARKER};
pub use source::{
    CommandMark, DirListing, FunctionDecl, ModulePath, ModuleUnit, PackagePath, PackageSource,
};
pub use table::{HandlerTable, StaticModule, StaticPackage, StaticSource};

use std::collections::btree_map::Entry as MapEntry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{DiscoveryError, ScanError, SchemaConflict};
use crate::identity::{is_valid_name, normalize_name, CommandIdentity};
use crate::registry::{CommandMetadata, Registry};
use crate::schema::{ConfigField, Schema};
use crate::tree::{CommandTree, NodeKind, PendingNode};

/// A non-fatal problem found during a scan.
#[derive(Debug)]
pub struct Diagnostic {
    /// The package, module or command the problem was found at.
    pub location: String,
    pub error: DiscoveryError,
}

impl Diagnostic {
    pub fn is_authoring_error(&self) -> bool {
        self.error.is_authoring_error()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.error)
    }
}

/// The outcome of a scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub tree: Arc<CommandTree>,
    pub diagnostics: Arc<Vec<Diagnostic>>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn authoring_errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_authoring_error())
    }
}

/// Scan-wide settings.
pub struct ScanOptions {
    /// Program name, shown as the root node's name.
    pub program: String,
    /// Fields the application declares beneath the root package record.
    pub root_fields: Vec<ConfigField>,
    /// Extra names reserved at the root, e.g. `version`.
    pub reserved_root_names: Vec<&'static str>,
    pub strategies: Vec<Box<dyn EntryPointStrategy>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            program: String::new(),
            root_fields: Vec::new(),
            reserved_root_names: Vec::new(),
            strategies: default_strategies(true),
        }
    }
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOptions")
            .field("program", &self.program)
            .field("root_fields", &self.root_fields)
            .field("reserved_root_names", &self.reserved_root_names)
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Walks a package source and populates a registry.
pub struct Scanner<'a> {
    source: &'a dyn PackageSource,
    options: &'a ScanOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a dyn PackageSource, options: &'a ScanOptions) -> Self {
        Self {
            source,
            options,
            diagnostics: Vec::new(),
        }
    }

    /// Runs the scan and registers every command into `registry`.
    pub fn scan(mut self, registry: &Registry) -> Result<ScanReport, ScanError> {
        let guard = registry.begin_scan()?;

        let root_path = self.source.root()?;
        let listing = self
            .source
            .list(&root_path)
            .map_err(|e| ScanError::InvalidPackage {
                path: self.source.describe(&root_path).into(),
                reason: e.to_string(),
            })?;

        let app_schema = Schema::from_fields(self.options.root_fields.clone())?;
        let package_schema = Schema::from_fields(listing.fields.clone())?;
        let root_own = app_schema.inherit(&package_schema)?;
        root_own.check_reserved(&self.options.reserved_root_names)?;

        let mut root = PendingNode::group(
            self.options.program.clone(),
            listing.help.clone(),
            root_own.clone(),
            root_own,
        );
        self.fill_package(&mut root, &CommandIdentity::root(), &root_path, listing);

        // Registering before flattening keeps the tree in step with the
        // registry: a command the registry refuses never reaches the parser.
        let mut refused = Vec::new();
        root.retain_commands(&CommandIdentity::root(), &mut |identity, node| {
            let NodeKind::Command { handler, origin } = &node.kind else {
                return true;
            };
            let metadata = CommandMetadata::new(node.name.clone())
                .help(node.help.clone())
                .schema(node.schema.clone())
                .origin(origin.clone());
            match guard
                .registry()
                .register(identity.clone(), handler.clone(), metadata)
            {
                Ok(_) => true,
                Err(e) => {
                    refused.push((identity.to_string(), e));
                    false
                }
            }
        });
        for (location, e) in refused {
            self.record(location, e.into());
        }
        let tree = CommandTree::from_pending(root);
        guard.finish();

        info!(
            commands = registry.len(),
            nodes = tree.len(),
            diagnostics = self.diagnostics.len(),
            "scan complete"
        );
        Ok(ScanReport {
            tree: Arc::new(tree),
            diagnostics: Arc::new(self.diagnostics),
        })
    }

    fn record(&mut self, location: String, error: DiscoveryError) {
        warn!(%location, %error, "discovery problem");
        self.diagnostics.push(Diagnostic { location, error });
    }

    /// Scans a package that is not the root. Returns `None` when the whole
    /// subtree has to be dropped.
    fn scan_package(
        &mut self,
        path: &PackagePath,
        identity: &CommandIdentity,
        inherited: &Schema,
    ) -> Option<PendingNode> {
        let location = self.source.describe(path);
        let listing = match self.source.list(path) {
            Ok(listing) => listing,
            Err(e) => {
                self.record(location, e.into());
                return None;
            }
        };

        let schemas = Schema::from_fields(listing.fields.clone())
            .and_then(|own| own.check_reserved(&[]).map(|_| own))
            .and_then(|own| inherited.inherit(&own).map(|merged| (own, merged)));
        let (own, schema) = match schemas {
            Ok(pair) => pair,
            Err(conflict) => {
                self.record(location, conflict.into());
                return None;
            }
        };

        let name = identity.name().unwrap_or_default().to_string();
        let mut node = PendingNode::group(name, listing.help.clone(), own, schema);
        self.fill_package(&mut node, identity, path, listing);
        Some(node)
    }

    fn fill_package(
        &mut self,
        node: &mut PendingNode,
        identity: &CommandIdentity,
        path: &PackagePath,
        listing: DirListing,
    ) {
        debug!(package = %path, modules = listing.modules.len(), "scanning package");

        for module in &listing.modules {
            self.scan_module(node, identity, module);
        }

        for skipped in &listing.non_packages {
            self.record(self.source.describe(skipped), DiscoveryError::NotAPackage);
        }

        for child_path in &listing.packages {
            let Some(raw) = child_path.name() else {
                continue;
            };
            let name = normalize_name(raw);
            if !is_valid_name(&name) {
                self.record(
                    self.source.describe(child_path),
                    DiscoveryError::InvalidName(raw.to_string()),
                );
                continue;
            }
            let child_identity = identity.child(&name);
            if node.children.contains_key(&name) {
                self.record(
                    self.source.describe(child_path),
                    DiscoveryError::DuplicateCommand(child_identity),
                );
                continue;
            }
            if let Some(child) = self.scan_package(child_path, &child_identity, &node.schema) {
                node.children.insert(name, child);
            }
        }
    }

    fn scan_module(
        &mut self,
        node: &mut PendingNode,
        identity: &CommandIdentity,
        path: &ModulePath,
    ) {
        let location = path.to_string();
        let unit = match self.source.load(path) {
            Ok(unit) => unit,
            Err(e) => {
                self.record(location, e.into());
                return;
            }
        };
        debug!(module = %location, functions = unit.functions.len(), "loaded module");

        let module_schema = match Schema::from_fields(unit.fields.clone()) {
            Ok(schema) => schema,
            Err(conflict) => {
                self.record(location, conflict.into());
                return;
            }
        };

        let options = self.options;
        let mut entries = Vec::new();
        for strategy in &options.strategies {
            match strategy.entry_points(&unit) {
                Ok(found) if found.is_empty() => continue,
                Ok(found) => {
                    entries = found;
                    break;
                }
                Err(e) => {
                    self.record(location, e);
                    return;
                }
            }
        }
        if entries.is_empty() {
            debug!(module = %location, "module has no entry points");
        }

        for entry in entries {
            if !is_valid_name(&entry.name) {
                self.record(location.clone(), DiscoveryError::InvalidName(entry.name));
                continue;
            }
            let command_identity = identity.child(&entry.name);
            let schemas = Self::leaf_schemas(&node.schema, &module_schema, &entry.fields);
            let (own, schema) = match schemas {
                Ok(pair) => pair,
                Err(conflict) => {
                    self.record(command_identity.to_string(), conflict.into());
                    continue;
                }
            };

            match node.children.entry(entry.name.clone()) {
                MapEntry::Occupied(_) => {
                    self.record(
                        location.clone(),
                        DiscoveryError::DuplicateCommand(command_identity),
                    );
                }
                MapEntry::Vacant(slot) => {
                    debug!(
                        command = %command_identity,
                        function = %entry.origin.function,
                        strategy = entry.origin.strategy,
                        "found command"
                    );
                    slot.insert(PendingNode {
                        name: entry.name,
                        help: entry.help,
                        kind: NodeKind::Command {
                            handler: entry.handler,
                            origin: entry.origin,
                        },
                        own_schema: own,
                        schema,
                        children: Default::default(),
                    });
                }
            }
        }
    }

    /// A command's own fields are its module's plus its mark's.
    fn leaf_schemas(
        inherited: &Schema,
        module: &Schema,
        mark_fields: &[ConfigField],
    ) -> Result<(Schema, Schema), SchemaConflict> {
        let mark = Schema::from_fields(mark_fields.to_vec())?;
        let own = module.inherit(&mark)?;
        own.check_reserved(&[])?;
        let schema = inherited.inherit(&own)?;
        Ok((own, schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::handler::{Handler, HandlerResult, Output};
    use crate::schema::ValueType;

    fn text(s: &'static str) -> Handler {
        Handler::new(move |_| -> HandlerResult { Ok(Output::Text(s.into())) })
    }

    fn options() -> ScanOptions {
        ScanOptions {
            program: "app".into(),
            root_fields: vec![ConfigField::boolean("verbose").default(false)],
            ..ScanOptions::default()
        }
    }

    fn user_package() -> StaticPackage {
        StaticPackage::new()
            .help("Manage users")
            .module(
                StaticModule::new("create")
                    .help("Create a user")
                    .field(ConfigField::string("email").required())
                    .command(
                        "create",
                        text("created"),
                        CommandMark::new().field(ConfigField::boolean("dry_run").default(false)),
                    ),
            )
            .module(StaticModule::new("delete").function("main", text("deleted")))
    }

    fn scan(source: &StaticSource, options: &ScanOptions) -> (ScanReport, Registry) {
        let registry = Registry::isolated();
        let report = Scanner::new(source, options).scan(&registry).unwrap();
        (report, registry)
    }

    #[test]
    fn test_builds_tree_and_registers_commands() {
        let source = StaticSource::new(StaticPackage::new().package("user", user_package()));
        let (report, registry) = scan(&source, &options());

        assert!(report.is_clean(), "{:?}", report.diagnostics);
        assert_eq!(
            registry.identities(),
            vec![
                CommandIdentity::parse("user.create"),
                CommandIdentity::parse("user.delete")
            ]
        );
        let create = report
            .tree
            .find(&CommandIdentity::parse("user.create"))
            .unwrap();
        assert_eq!(create.schema.names(), vec!["verbose", "email", "dry_run"]);
        assert_eq!(create.own_schema.names(), vec!["email", "dry_run"]);
        assert!(registry.is_sealed());
    }

    #[test]
    fn test_conventional_command_named_after_module() {
        let source = StaticSource::new(StaticPackage::new().package("user", user_package()));
        let (report, _) = scan(&source, &options());
        let delete = report
            .tree
            .find(&CommandIdentity::parse("user.delete"))
            .unwrap();
        assert_eq!(delete.origin().unwrap().strategy, "conventional");
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let source = StaticSource::new(StaticPackage::new().package("user", user_package()));
        let options = ScanOptions {
            strategies: default_strategies(false),
            ..options()
        };
        let (_, registry) = scan(&source, &options);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sibling_modules_declaring_same_command() {
        let source = StaticSource::new(
            StaticPackage::new().package(
                "user",
                StaticPackage::new()
                    .module(StaticModule::new("a").command(
                        "create",
                        text("first"),
                        CommandMark::new(),
                    ))
                    .module(StaticModule::new("b").command(
                        "create",
                        text("second"),
                        CommandMark::new(),
                    ))
                    .module(StaticModule::new("c").command(
                        "list",
                        text("list"),
                        CommandMark::new(),
                    )),
            ),
        );
        let (report, registry) = scan(&source, &options());

        assert_eq!(report.diagnostics.len(), 1);
        assert!(matches!(
            &report.diagnostics[0].error,
            DiscoveryError::DuplicateCommand(id) if id.to_string() == "user.create"
        ));
        let create = registry
            .lookup(&CommandIdentity::parse("user.create"))
            .unwrap();
        assert_eq!(create.origin.as_ref().unwrap().module, "user/a");
        assert!(registry.contains(&CommandIdentity::parse("user.list")));
    }

    #[test]
    fn test_refused_registration_leaves_tree_without_node() {
        let registry = Registry::isolated();
        registry
            .register(
                CommandIdentity::parse("go"),
                text("earlier"),
                CommandMetadata::new("go"),
            )
            .unwrap();
        let source = StaticSource::new(
            StaticPackage::new()
                .module(StaticModule::new("go").function("main", text("scanned")))
                .module(StaticModule::new("stop").function("main", text("stop"))),
        );
        let report = Scanner::new(&source, &options()).scan(&registry).unwrap();

        assert_eq!(report.diagnostics.len(), 1);
        assert!(matches!(
            &report.diagnostics[0].error,
            DiscoveryError::DuplicateCommand(id) if id.to_string() == "go"
        ));
        assert!(report.tree.find(&CommandIdentity::parse("go")).is_none());
        for node in report.tree.commands() {
            assert!(registry.contains(&node.identity), "{}", node.identity);
        }
        assert!(registry.lookup(&CommandIdentity::parse("go")).unwrap().origin.is_none());
    }

    #[test]
    fn test_refused_group_members_prune_their_group() {
        let registry = Registry::isolated();
        registry
            .register(
                CommandIdentity::parse("user.create"),
                text("earlier"),
                CommandMetadata::new("create"),
            )
            .unwrap();
        let source = StaticSource::new(StaticPackage::new().package(
            "user",
            StaticPackage::new().module(StaticModule::new("create").function("main", text("x"))),
        ));
        let report = Scanner::new(&source, &options()).scan(&registry).unwrap();

        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.tree.find(&CommandIdentity::parse("user")).is_none());
    }

    #[test]
    fn test_invalid_command_names_are_skipped() {
        let source = StaticSource::new(
            StaticPackage::new()
                .module(StaticModule::new("blank").command(
                    "hidden",
                    text("x"),
                    CommandMark::new().name(""),
                ))
                .module(StaticModule::new("ok").function("main", text("ok")))
                .package(
                    "my pkg",
                    StaticPackage::new().module(StaticModule::new("inner").function("main", text("i"))),
                ),
        );
        let (report, registry) = scan(&source, &options());

        assert_eq!(registry.identities(), vec![CommandIdentity::parse("ok")]);
        let invalid: Vec<&str> = report
            .diagnostics
            .iter()
            .filter_map(|d| match &d.error {
                DiscoveryError::InvalidName(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(invalid, vec!["", "my pkg"]);
        assert_eq!(report.authoring_errors().count(), 2);
        assert_eq!(report.tree.commands().count(), 1);
    }

    #[test]
    fn test_schema_conflict_drops_only_that_subtree() {
        let source = StaticSource::new(
            StaticPackage::new()
                .package(
                    "bad",
                    StaticPackage::new()
                        .field(ConfigField::string("verbose"))
                        .module(StaticModule::new("x").function("main", text("x"))),
                )
                .package(
                    "good",
                    StaticPackage::new().module(StaticModule::new("y").function("main", text("y"))),
                ),
        );
        let (report, registry) = scan(&source, &options());

        assert_eq!(registry.identities(), vec![CommandIdentity::parse("good.y")]);
        assert!(matches!(
            report.diagnostics[0].error,
            DiscoveryError::SchemaConflict(SchemaConflict::TypeChanged {
                ancestor: ValueType::Boolean,
                ..
            })
        ));
        assert!(report.tree.find(&CommandIdentity::parse("bad")).is_none());
    }

    #[test]
    fn test_ambiguous_module_is_skipped() {
        let source = StaticSource::new(
            StaticPackage::new().module(
                StaticModule::new("sync")
                    .function("main", text("a"))
                    .function("run", text("b")),
            ),
        );
        let (report, registry) = scan(&source, &options());
        assert!(registry.is_empty());
        assert_eq!(report.authoring_errors().count(), 1);
    }

    #[test]
    fn test_empty_groups_are_pruned() {
        let source = StaticSource::new(
            StaticPackage::new()
                .package("empty", StaticPackage::new().help("Nothing here"))
                .package("user", user_package()),
        );
        let (report, _) = scan(&source, &options());
        assert!(report
            .tree
            .find(&CommandIdentity::parse("empty"))
            .is_none());
        assert!(report.is_clean());
    }

    #[test]
    fn test_reserved_field_name_in_module() {
        let source = StaticSource::new(StaticPackage::new().module(
            StaticModule::new("hello")
                .field(ConfigField::boolean("help"))
                .function("main", text("hi")),
        ));
        let (report, registry) = scan(&source, &options());
        assert!(registry.is_empty());
        assert!(matches!(
            report.diagnostics[0].error,
            DiscoveryError::SchemaConflict(SchemaConflict::ReservedName(_))
        ));
    }

    #[test]
    fn test_root_schema_conflict_is_fatal() {
        let source = StaticSource::new(StaticPackage::new().field(ConfigField::integer("verbose")));
        let err = Scanner::new(&source, &options())
            .scan(&Registry::isolated())
            .unwrap_err();
        assert!(matches!(err, ScanError::RootSchema(_)));
    }

    #[test]
    fn test_version_reserved_at_versioned_root() {
        let source = StaticSource::new(StaticPackage::new().field(ConfigField::string("version")));
        let options = ScanOptions {
            reserved_root_names: vec!["version"],
            ..options()
        };
        let err = Scanner::new(&source, &options)
            .scan(&Registry::isolated())
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::RootSchema(SchemaConflict::ReservedName(_))
        ));
    }

    #[test]
    fn test_second_scan_of_sealed_registry_fails() {
        let source = StaticSource::new(StaticPackage::new().package("user", user_package()));
        let options = options();
        let registry = Registry::isolated();
        Scanner::new(&source, &options).scan(&registry).unwrap();
        let err = Scanner::new(&source, &options).scan(&registry).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Registry(RegistryError::AlreadyScanned)
        ));
    }

    #[test]
    fn test_failed_scan_reopens_registry() {
        let source = StaticSource::new(StaticPackage::new().field(ConfigField::integer("verbose")));
        let registry = Registry::isolated();
        assert!(Scanner::new(&source, &options()).scan(&registry).is_err());
        assert!(!registry.is_sealed());
        assert!(!registry.is_scanning());
    }
}
