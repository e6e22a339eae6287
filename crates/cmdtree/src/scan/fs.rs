//! Command units described by YAML files on disk.
//!
//! A package is a directory containing `package.yaml`. Every other `.yaml`
//! or `.yml` file in it is a module descriptor:
//!
//! ```yaml
//! help: Create a user
//! fields:
//!   - name: email
//!     type: string
//!     required: true
//!     env: USER_EMAIL
//! functions:
//!   - name: create
//!     command:
//!       help: Create a new user
//!       fields:
//!         - { name: dry_run, type: boolean, default: false }
//!   - name: helper
//! ```
//!
//! Functions are bound to Rust handlers through a [`HandlerTable`] by their
//! symbol, e.g. `user::create::create`. Entries whose name begins with `_`
//! or `.` are ignored.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::source::{
    CommandMark, DirListing, FunctionDecl, ModulePath, ModuleUnit, PackagePath, PackageSource,
};
use super::table::HandlerTable;
use crate::error::{ImportError, ScanError};
use crate::schema::{ConfigField, Value, ValueType};

/// Name of the file that makes a directory a package.
pub const PACKAGE_MARKER: &str = "package.yaml";

const MODULE_EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageSpec {
    #[serde(default)]
    help: String,
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleSpec {
    #[serde(default)]
    help: String,
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    functions: Vec<FunctionSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionSpec {
    name: String,
    #[serde(default)]
    command: Option<MarkSpec>,
}

/// `command: true` or a detailed mark.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarkSpec {
    Flag(bool),
    Detailed(MarkDetail),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MarkDetail {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    help: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TypeSpec {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Choice,
    List,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSpec {
    name: String,
    #[serde(rename = "type", default)]
    ty: TypeSpec,
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    default: Option<serde_yaml::Value>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    help: String,
    #[serde(default)]
    short: Option<char>,
    #[serde(default)]
    positional: bool,
    #[serde(default)]
    env: Option<String>,
}

impl FieldSpec {
    fn into_field(self) -> Result<ConfigField, String> {
        let base = match self.ty {
            TypeSpec::String => ValueType::String,
            TypeSpec::Integer => ValueType::Integer,
            TypeSpec::Float => ValueType::Float,
            TypeSpec::Boolean => ValueType::Boolean,
            TypeSpec::List => ValueType::StringList,
            TypeSpec::Choice if self.choices.is_empty() => {
                return Err(format!("choice field '{}' lists no choices", self.name));
            }
            TypeSpec::Choice => ValueType::Choice(self.choices),
        };
        let ty = if self.optional {
            ValueType::optional(base)
        } else {
            base
        };

        let mut field = ConfigField::new(self.name, ty).help(self.help);
        if let Some(default) = self.default {
            field.default = Some(yaml_to_value(&field.name, default)?);
        }
        field.required = self.required;
        field.short = self.short;
        field.positional = self.positional;
        field.env = self.env;
        Ok(field)
    }
}

fn yaml_to_value(field: &str, yaml: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(b)),
        Yaml::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .ok_or_else(|| format!("default of '{field}' is out of range")),
        Yaml::String(s) => Ok(Value::Str(s)),
        Yaml::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                Yaml::String(s) => Ok(s),
                Yaml::Number(n) => Ok(n.to_string()),
                Yaml::Bool(b) => Ok(b.to_string()),
                _ => Err(format!("default of '{field}' must be a list of scalars")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        _ => Err(format!("default of '{field}' must be a scalar or a list")),
    }
}

fn convert_fields(path: &Path, specs: Vec<FieldSpec>) -> Result<Vec<ConfigField>, ImportError> {
    specs
        .into_iter()
        .map(|spec| {
            spec.into_field().map_err(|reason| ImportError::Malformed {
                path: path.to_path_buf(),
                reason,
            })
        })
        .collect()
}

/// Reads a YAML document, treating an empty or comment-only file as the
/// default record.
fn read_yaml<T>(path: &Path) -> Result<T, ImportError>
where
    T: Default + serde::de::DeserializeOwned,
{
    let content = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |e: serde_yaml::Error| ImportError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let value: serde_yaml::Value = serde_yaml::from_str(&content).map_err(malformed)?;
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value).map_err(malformed)
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

/// Package source backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    handlers: HandlerTable,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>, handlers: HandlerTable) -> Self {
        Self {
            root: root.into(),
            handlers,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    fn dir(&self, package: &PackagePath) -> PathBuf {
        package
            .segments()
            .iter()
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    fn module_file(&self, module: &ModulePath) -> Result<PathBuf, ImportError> {
        let dir = self.dir(&module.package);
        MODULE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", module.stem, ext)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ImportError::Io {
                path: dir.join(format!("{}.yaml", module.stem)),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "module file not found"),
            })
    }
}

impl PackageSource for FsSource {
    fn root(&self) -> Result<PackagePath, ScanError> {
        if !self.root.is_dir() {
            return Err(ScanError::InvalidPackage {
                path: self.root.clone(),
                reason: "not a directory".to_string(),
            });
        }
        if !self.root.join(PACKAGE_MARKER).is_file() {
            return Err(ScanError::InvalidPackage {
                path: self.root.clone(),
                reason: format!("missing {PACKAGE_MARKER}"),
            });
        }
        Ok(PackagePath::root())
    }

    fn list(&self, package: &PackagePath) -> Result<DirListing, ImportError> {
        let dir = self.dir(package);
        let marker = dir.join(PACKAGE_MARKER);
        let spec: PackageSpec = read_yaml(&marker)?;

        let io_err = |source| ImportError::Io {
            path: dir.clone(),
            source,
        };
        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if !is_ignored(&name) {
                entries.push((name, entry.path()));
            }
        }
        entries.sort();

        let mut listing = DirListing {
            help: spec.help,
            fields: convert_fields(&marker, spec.fields)?,
            ..DirListing::default()
        };
        for (name, path) in entries {
            if path.is_dir() {
                if path.join(PACKAGE_MARKER).is_file() {
                    listing.packages.push(package.child(name));
                } else {
                    listing.non_packages.push(package.child(name));
                }
                continue;
            }
            if name == PACKAGE_MARKER {
                continue;
            }
            let is_module = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| MODULE_EXTENSIONS.contains(&e))
                .unwrap_or(false);
            if let (true, Some(stem)) = (is_module, path.file_stem().and_then(|s| s.to_str())) {
                // `x.yaml` sorts before `x.yml` and is the file `load` reads.
                let module = package.module(stem);
                if !listing.modules.contains(&module) {
                    listing.modules.push(module);
                }
            }
        }
        Ok(listing)
    }

    fn load(&self, module: &ModulePath) -> Result<ModuleUnit, ImportError> {
        let file = self.module_file(module)?;
        let spec: ModuleSpec = read_yaml(&file)?;

        let mut functions = Vec::with_capacity(spec.functions.len());
        for function in spec.functions {
            let handler = self.handlers.resolve(&module.symbol(&function.name))?;
            let mark = match function.command {
                None | Some(MarkSpec::Flag(false)) => None,
                Some(MarkSpec::Flag(true)) => Some(CommandMark::new()),
                Some(MarkSpec::Detailed(detail)) => Some(CommandMark {
                    name: detail.name,
                    help: detail.help,
                    fields: convert_fields(&file, detail.fields)?,
                }),
            };
            functions.push(FunctionDecl {
                name: function.name,
                handler,
                mark,
            });
        }

        Ok(ModuleUnit {
            path: module.clone(),
            help: spec.help,
            fields: convert_fields(&file, spec.fields)?,
            functions,
        })
    }

    fn describe(&self, package: &PackagePath) -> String {
        self.dir(package).display().to_string()
    }
}
