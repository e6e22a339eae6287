//! Handler tables and in-code command trees.

use std::collections::HashMap;

use super::source::{
    CommandMark, DirListing, FunctionDecl, ModulePath, ModuleUnit, PackagePath, PackageSource,
};
use crate::error::{ImportError, ScanError};
use crate::handler::Handler;
use crate::schema::ConfigField;

/// Binds handler symbols (`user::create::main`) to handlers.
///
/// [`FsSource`](super::FsSource) resolves every function a descriptor
/// declares through this table.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `symbol`, replacing any earlier binding.
    pub fn bind(mut self, symbol: impl Into<String>, handler: Handler) -> Self {
        self.insert(symbol, handler);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, handler: Handler) {
        self.handlers.insert(symbol.into(), handler);
    }

    pub fn get(&self, symbol: &str) -> Option<&Handler> {
        self.handlers.get(symbol)
    }

    /// Looks up a symbol, failing the import when it is unbound.
    pub fn resolve(&self, symbol: &str) -> Result<Handler, ImportError> {
        self.get(symbol)
            .cloned()
            .ok_or_else(|| ImportError::UnresolvedSymbol(symbol.to_string()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A module declared in code.
#[derive(Debug, Clone)]
pub struct StaticModule {
    stem: String,
    help: String,
    fields: Vec<ConfigField>,
    functions: Vec<FunctionDecl>,
}

impl StaticModule {
    pub fn new(stem: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            help: String::new(),
            fields: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn field(mut self, field: ConfigField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields<I: IntoIterator<Item = ConfigField>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }

    /// An unmarked function; a candidate for the conventional fallback.
    pub fn function(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.functions.push(FunctionDecl::new(name, handler));
        self
    }

    /// A function marked as a command.
    pub fn command(
        mut self,
        name: impl Into<String>,
        handler: Handler,
        mark: CommandMark,
    ) -> Self {
        self.functions.push(FunctionDecl::new(name, handler).marked(mark));
        self
    }
}

/// A package declared in code.
#[derive(Debug, Clone, Default)]
pub struct StaticPackage {
    help: String,
    fields: Vec<ConfigField>,
    modules: Vec<StaticModule>,
    packages: Vec<(String, StaticPackage)>,
}

impl StaticPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn field(mut self, field: ConfigField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields<I: IntoIterator<Item = ConfigField>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn module(mut self, module: StaticModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn package(mut self, name: impl Into<String>, package: StaticPackage) -> Self {
        self.packages.push((name.into(), package));
        self
    }

    fn descend(&self, path: &PackagePath) -> Option<&StaticPackage> {
        path.segments().iter().try_fold(self, |pkg, segment| {
            pkg.packages
                .iter()
                .find(|(name, _)| name == segment)
                .map(|(_, child)| child)
        })
    }
}

/// Serves an in-code package tree.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    root: StaticPackage,
}

impl StaticSource {
    pub fn new(root: StaticPackage) -> Self {
        Self { root }
    }

    fn package(&self, path: &PackagePath) -> Result<&StaticPackage, ImportError> {
        self.root
            .descend(path)
            .ok_or_else(|| ImportError::Other(format!("no package at '{path}'")))
    }
}

impl PackageSource for StaticSource {
    fn root(&self) -> Result<PackagePath, ScanError> {
        Ok(PackagePath::root())
    }

    fn list(&self, path: &PackagePath) -> Result<DirListing, ImportError> {
        let pkg = self.package(path)?;
        Ok(DirListing {
            help: pkg.help.clone(),
            fields: pkg.fields.clone(),
            modules: pkg.modules.iter().map(|m| path.module(&m.stem)).collect(),
            packages: pkg.packages.iter().map(|(name, _)| path.child(name)).collect(),
            non_packages: Vec::new(),
        })
    }

    fn load(&self, module: &ModulePath) -> Result<ModuleUnit, ImportError> {
        let pkg = self.package(&module.package)?;
        let unit = pkg
            .modules
            .iter()
            .find(|m| m.stem == module.stem)
            .ok_or_else(|| ImportError::Other(format!("no module at '{module}'")))?;
        Ok(ModuleUnit {
            path: module.clone(),
            help: unit.help.clone(),
            fields: unit.fields.clone(),
            functions: unit.functions.clone(),
        })
    }
}
