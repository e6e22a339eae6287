//! Where command units come from.
//!
//! The scanner never touches the filesystem directly. It asks a
//! [`PackageSource`] for the root package, for the contents of each package
//! and for each module's declared functions. [`FsSource`](super::FsSource)
//! reads YAML descriptors from disk, [`StaticSource`](super::StaticSource)
//! serves a tree declared in code.

use std::fmt;

use crate::error::{ImportError, ScanError};
use crate::handler::Handler;
use crate::schema::ConfigField;

/// Location of a package relative to the scan root, as raw directory names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackagePath {
    segments: Vec<String>,
}

impl PackagePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    pub fn module(&self, stem: impl Into<String>) -> ModulePath {
        ModulePath {
            package: self.clone(),
            stem: stem.into(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PackagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.segments.join("/"))
        }
    }
}

/// Location of a module: its package plus the file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath {
    pub package: PackagePath,
    pub stem: String,
}

impl ModulePath {
    /// The handler symbol of a function in this module, e.g.
    /// `user::create::main`.
    pub fn symbol(&self, function: &str) -> String {
        let mut parts: Vec<&str> = self.package.segments().iter().map(String::as_str).collect();
        parts.push(&self.stem);
        parts.push(function);
        parts.join("::")
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_root() {
            f.write_str(&self.stem)
        } else {
            write!(f, "{}/{}", self.package, self.stem)
        }
    }
}

/// Command registration metadata attached to a function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandMark {
    /// Command name; the function name when unset.
    pub name: Option<String>,
    pub help: Option<String>,
    /// Fields contributed by this command only.
    pub fields: Vec<ConfigField>,
}

impl CommandMark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
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
}

/// A top-level function of a module.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub handler: Handler,
    pub mark: Option<CommandMark>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            handler,
            mark: None,
        }
    }

    pub fn marked(mut self, mark: CommandMark) -> Self {
        self.mark = Some(mark);
        self
    }

    pub fn is_marked(&self) -> bool {
        self.mark.is_some()
    }
}

/// A loaded module.
#[derive(Debug, Clone)]
pub struct ModuleUnit {
    pub path: ModulePath,
    pub help: String,
    /// Fields shared by every command of the module.
    pub fields: Vec<ConfigField>,
    pub functions: Vec<FunctionDecl>,
}

/// What a package directory contains.
#[derive(Debug, Clone, Default)]
pub struct DirListing {
    pub help: String,
    /// Fields of the package marker, inherited by the whole subtree.
    pub fields: Vec<ConfigField>,
    pub modules: Vec<ModulePath>,
    pub packages: Vec<PackagePath>,
    /// Subdirectories without a package marker.
    pub non_packages: Vec<PackagePath>,
}

/// A provider of packages and modules.
pub trait PackageSource: Send + Sync {
    /// The root package. Fails when the root carries no package marker.
    fn root(&self) -> Result<PackagePath, ScanError>;

    /// The marker record and entries of a package.
    fn list(&self, package: &PackagePath) -> Result<DirListing, ImportError>;

    /// Loads one module.
    fn load(&self, module: &ModulePath) -> Result<ModuleUnit, ImportError>;

    /// A human-readable location for diagnostics.
    fn describe(&self, package: &PackagePath) -> String {
        package.to_string()
    }
}
