//! Error types for discovery, parsing and dispatch.
//!
//! Errors fall into the classes the framework treats differently:
//!
//! | Class | Types | Effect |
//! |-------|-------|--------|
//! | Authoring | [`DiscoveryError::DuplicateCommand`], [`DiscoveryError::SchemaConflict`], [`DiscoveryError::AmbiguousEntryPoint`], [`DiscoveryError::InvalidName`] | affected subtree dropped, diagnostic recorded |
//! | Recoverable discovery | [`DiscoveryError::ImportFailed`], [`DiscoveryError::NotAPackage`] | module or directory skipped, diagnostic recorded |
//! | Fatal scan | [`ScanError`] | no tree is produced |
//! | Usage | [`UsageError`] | reported to the user with a help hint, exit 2 |
//! | Internal | [`InternalError`] | framework defect, logged, exit 70 |

use std::path::PathBuf;

use crate::identity::CommandIdentity;
use crate::schema::ValueType;

/// Exit status for a successful run, including `--help` and `--version`.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status when the handler itself fails.
pub const EXIT_HANDLER_FAILURE: i32 = 1;
/// Exit status for usage errors.
pub const EXIT_USAGE: i32 = 2;
/// Exit status for internal errors and fatal scan errors (`EX_SOFTWARE`).
pub const EXIT_INTERNAL: i32 = 70;

/// A field set that cannot be merged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaConflict {
    /// A descendant redeclared an inherited field with a different type.
    #[error("field '{field}' is declared as {ancestor} by an ancestor but redeclared as {descendant}")]
    TypeChanged {
        field: String,
        ancestor: ValueType,
        descendant: ValueType,
    },

    /// The same field name appears twice at one level.
    #[error("field '{0}' is declared more than once at the same level")]
    DuplicateField(String),

    /// The field name collides with a flag the parser owns.
    #[error("field name '{0}' is reserved")]
    ReservedName(String),

    /// The declared default does not fit the declared type.
    #[error("default for field '{field}' is invalid: {reason}")]
    InvalidDefault { field: String, reason: String },

    /// A list-valued positional must be the last positional.
    #[error("positional list field '{0}' must be the last positional field")]
    VariadicPositionalNotLast(String),

    /// Field names must be non-empty identifiers.
    #[error("invalid field name '{0}'")]
    InvalidName(String),
}

/// Errors raised by the [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("command '{0}' is already registered")]
    DuplicateCommand(CommandIdentity),

    #[error("command '{0}' not found")]
    CommandNotFound(CommandIdentity),

    /// A scan is already writing to this registry.
    #[error("a scan is already in progress for this registry")]
    ScanInProgress,

    /// The registry was populated by an earlier scan in this process.
    #[error("the registry was already populated by a previous scan")]
    AlreadyScanned,

    /// Writes are rejected once the scan phase is over.
    #[error("the registry is sealed; cannot register '{0}'")]
    Sealed(CommandIdentity),
}

/// A module that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// A declared function has no handler bound to its symbol.
    #[error("no handler bound for symbol '{0}'")]
    UnresolvedSymbol(String),

    #[error("{0}")]
    Other(String),
}

/// A non-fatal problem found while scanning.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to import module: {0}")]
    ImportFailed(#[from] ImportError),

    #[error("ambiguous entry point: candidates {}", .candidates.join(", "))]
    AmbiguousEntryPoint { candidates: Vec<String> },

    #[error("duplicate command '{0}'; the first registrant wins")]
    DuplicateCommand(CommandIdentity),

    #[error("schema conflict: {0}")]
    SchemaConflict(#[from] SchemaConflict),

    #[error("directory has no package marker")]
    NotAPackage,

    /// A package or command name that is empty or not an identifier.
    #[error("invalid command name '{0}'")]
    InvalidName(String),

    /// The registry refused an entry for a reason other than a duplicate.
    #[error("cannot register command: {0}")]
    Registration(RegistryError),
}

impl DiscoveryError {
    /// True for errors that indicate a defect in how commands were declared.
    pub fn is_authoring_error(&self) -> bool {
        matches!(
            self,
            DiscoveryError::AmbiguousEntryPoint { .. }
                | DiscoveryError::DuplicateCommand(_)
                | DiscoveryError::SchemaConflict(_)
                | DiscoveryError::InvalidName(_)
        )
    }
}

impl From<RegistryError> for DiscoveryError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::DuplicateCommand(id) => DiscoveryError::DuplicateCommand(id),
            other => DiscoveryError::Registration(other),
        }
    }
}

/// Errors that stop a scan before any tree is produced.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The scan root is not a package.
    #[error("'{path}' is not a valid package: {reason}")]
    InvalidPackage { path: PathBuf, reason: String },

    /// The root package's own fields cannot be merged.
    #[error("root schema is invalid: {0}")]
    RootSchema(#[from] SchemaConflict),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The application was built without a package source.
    #[error("no package source configured for '{0}'")]
    MissingSource(String),
}

/// Errors reported to the end user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UsageError {
    /// The tokenizer rejected the command line.
    #[error("{message}")]
    Parse { message: String },

    #[error("missing required field '{field}' for command '{command}'")]
    MissingRequiredField {
        field: String,
        command: CommandIdentity,
    },

    #[error("environment variable {var} for field '{field}' is invalid: {reason}")]
    InvalidEnvironmentValue {
        var: String,
        field: String,
        reason: String,
    },
}

impl UsageError {
    /// The field this error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            UsageError::Parse { .. } => None,
            UsageError::MissingRequiredField { field, .. }
            | UsageError::InvalidEnvironmentValue { field, .. } => Some(field),
        }
    }
}

/// Inconsistencies inside the framework itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InternalError {
    /// The parser matched a command the registry does not know.
    #[error("parser matched '{0}' but the registry has no such command")]
    RegistryMismatch(CommandIdentity),

    /// The parser matched a path that is not in the command tree.
    #[error("parser matched unknown path '{0}'")]
    UnknownPath(String),

    /// The parser stopped at a group instead of a command.
    #[error("'{0}' is a group, not a command")]
    NotALeaf(CommandIdentity),

    /// A parsed value could not be read back with its declared type.
    #[error("cannot read value of field '{field}': {reason}")]
    ValueExtraction { field: String, reason: String },
}

/// Everything that can end a dispatch unsuccessfully.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("internal error: {0}")]
    Internal(#[from] InternalError),

    /// The handler's own failure, passed through untouched.
    #[error("command '{identity}' failed: {source}")]
    Handler {
        identity: CommandIdentity,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::Usage(_) => EXIT_USAGE,
            DispatchError::Handler { .. } => EXIT_HANDLER_FAILURE,
            DispatchError::Scan(_) | DispatchError::Internal(_) => EXIT_INTERNAL,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, DispatchError::Usage(_))
    }

    pub fn usage(&self) -> Option<&UsageError> {
        match self {
            DispatchError::Usage(e) => Some(e),
            _ => None,
        }
    }
}
