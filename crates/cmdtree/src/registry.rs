//! The command registry.
//!
//! The registry maps every discovered [`CommandIdentity`] to its
//! [`CommandEntry`]. A [`Registry`] is a cheap handle to a shared store:
//! cloning it shares the store, which is what the scanner and dispatcher
//! both hold. [`Registry::global`] returns the one process-wide store,
//! [`Registry::isolated`] a private one for tests and embedding.
//!
//! # Lifecycle
//!
//! A store is `Open` until a scan begins. [`Registry::begin_scan`] moves it
//! to `Scanning` and hands out a [`ScanGuard`]; [`ScanGuard::finish`] seals
//! it. Dropping a guard without finishing rolls back what the scan wrote and
//! reopens the store.
//!
//! | State | `register` | `begin_scan` |
//! |-------|------------|--------------|
//! | Open | accepted | starts the scan |
//! | Scanning | accepted | [`RegistryError::ScanInProgress`] |
//! | Sealed | [`RegistryError::Sealed`] | [`RegistryError::AlreadyScanned`] |

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::RegistryError;
use crate::handler::Handler;
use crate::identity::CommandIdentity;
use crate::schema::Schema;
use crate::tree::CommandOrigin;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::isolated);

/// Descriptive data registered alongside a handler.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub name: String,
    pub help: String,
    /// The command's effective schema.
    pub schema: Schema,
    pub origin: Option<CommandOrigin>,
}

impl CommandMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            schema: Schema::empty(),
            origin: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn origin(mut self, origin: CommandOrigin) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// A registered command.
#[derive(Debug)]
pub struct CommandEntry {
    pub identity: CommandIdentity,
    pub name: String,
    pub help: String,
    pub schema: Schema,
    pub handler: Handler,
    pub origin: Option<CommandOrigin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Scanning { baseline: usize },
    Sealed,
}

#[derive(Debug)]
struct Store {
    state: State,
    entries: Vec<Arc<CommandEntry>>,
    index: HashMap<CommandIdentity, usize>,
}

impl Store {
    fn new() -> Self {
        Self {
            state: State::Open,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn truncate(&mut self, len: usize) {
        for entry in self.entries.drain(len..) {
            self.index.remove(&entry.identity);
        }
    }
}

/// Shared handle to a command store.
#[derive(Debug, Clone)]
pub struct Registry {
    store: Arc<RwLock<Store>>,
}

impl Default for Registry {
    /// The process-wide registry.
    fn default() -> Self {
        Self::global()
    }
}

impl Registry {
    /// The process-wide registry, created on first use.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// A fresh registry that shares nothing with any other.
    pub fn isolated() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::new())),
        }
    }

    /// True if both handles point at the same store.
    pub fn same_store(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a command. The first registrant of an identity wins; later ones
    /// get [`RegistryError::DuplicateCommand`].
    pub fn register(
        &self,
        identity: CommandIdentity,
        handler: Handler,
        metadata: CommandMetadata,
    ) -> Result<Arc<CommandEntry>, RegistryError> {
        let mut store = self.write();
        if store.state == State::Sealed {
            return Err(RegistryError::Sealed(identity));
        }
        if store.index.contains_key(&identity) {
            return Err(RegistryError::DuplicateCommand(identity));
        }
        let entry = Arc::new(CommandEntry {
            identity: identity.clone(),
            name: metadata.name,
            help: metadata.help,
            schema: metadata.schema,
            handler,
            origin: metadata.origin,
        });
        let position = store.entries.len();
        store.entries.push(Arc::clone(&entry));
        store.index.insert(identity, position);
        Ok(entry)
    }

    /// Exact-match lookup.
    pub fn lookup(&self, identity: &CommandIdentity) -> Result<Arc<CommandEntry>, RegistryError> {
        let store = self.read();
        store
            .index
            .get(identity)
            .map(|i| Arc::clone(&store.entries[*i]))
            .ok_or_else(|| RegistryError::CommandNotFound(identity.clone()))
    }

    pub fn contains(&self, identity: &CommandIdentity) -> bool {
        self.read().index.contains_key(identity)
    }

    /// Every entry in registration order.
    pub fn all(&self) -> Vec<Arc<CommandEntry>> {
        self.read().entries.clone()
    }

    /// Registered identities in registration order.
    pub fn identities(&self) -> Vec<CommandIdentity> {
        self.read()
            .entries
            .iter()
            .map(|e| e.identity.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.read().state == State::Sealed
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.read().state, State::Scanning { .. })
    }

    /// Starts the scan phase.
    pub fn begin_scan(&self) -> Result<ScanGuard, RegistryError> {
        let mut store = self.write();
        match store.state {
            State::Scanning { .. } => Err(RegistryError::ScanInProgress),
            State::Sealed => Err(RegistryError::AlreadyScanned),
            State::Open => {
                store.state = State::Scanning {
                    baseline: store.entries.len(),
                };
                Ok(ScanGuard {
                    registry: self.clone(),
                    finished: false,
                })
            }
        }
    }
}

/// Exclusive right to populate a registry during one scan.
#[derive(Debug)]
#[must_use = "dropping the guard without finish() rolls the scan back"]
pub struct ScanGuard {
    registry: Registry,
    finished: bool,
}

impl ScanGuard {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Seals the registry.
    pub fn finish(mut self) {
        self.registry.write().state = State::Sealed;
        self.finished = true;
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut store = self.registry.write();
        if let State::Scanning { baseline } = store.state {
            store.truncate(baseline);
        }
        store.state = State::Open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, Output};

    fn noop() -> Handler {
        Handler::new(|_| -> HandlerResult { Ok(Output::Silent) })
    }

    fn id(s: &str) -> CommandIdentity {
        CommandIdentity::parse(s)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::isolated();
        registry
            .register(id("user.create"), noop(), CommandMetadata::new("create"))
            .unwrap();
        let entry = registry.lookup(&id("user.create")).unwrap();
        assert_eq!(entry.name, "create");
        assert!(registry.contains(&id("user.create")));
        assert_eq!(
            registry.lookup(&id("user")).unwrap_err(),
            RegistryError::CommandNotFound(id("user"))
        );
    }

    #[test]
    fn test_first_registrant_wins() {
        let registry = Registry::isolated();
        registry
            .register(id("a"), noop(), CommandMetadata::new("a").help("first"))
            .unwrap();
        let err = registry
            .register(id("a"), noop(), CommandMetadata::new("a").help("second"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCommand(id("a")));
        assert_eq!(registry.lookup(&id("a")).unwrap().help, "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_all_preserves_registration_order() {
        let registry = Registry::isolated();
        for name in ["b", "a", "c.d"] {
            registry
                .register(id(name), noop(), CommandMetadata::new(name))
                .unwrap();
        }
        assert_eq!(registry.identities(), vec![id("b"), id("a"), id("c.d")]);
    }

    #[test]
    fn test_isolated_registries_share_nothing() {
        let a = Registry::isolated();
        let b = Registry::isolated();
        a.register(id("x"), noop(), CommandMetadata::new("x")).unwrap();
        assert!(b.is_empty());
        assert!(!a.same_store(&b));
        assert!(a.same_store(&a.clone()));
    }

    #[test]
    fn test_scan_lifecycle() {
        let registry = Registry::isolated();
        let guard = registry.begin_scan().unwrap();
        assert!(registry.is_scanning());
        assert_eq!(
            registry.begin_scan().unwrap_err(),
            RegistryError::ScanInProgress
        );
        guard
            .registry()
            .register(id("x"), noop(), CommandMetadata::new("x"))
            .unwrap();
        guard.finish();

        assert!(registry.is_sealed());
        assert_eq!(
            registry.begin_scan().unwrap_err(),
            RegistryError::AlreadyScanned
        );
        assert_eq!(
            registry
                .register(id("y"), noop(), CommandMetadata::new("y"))
                .unwrap_err(),
            RegistryError::Sealed(id("y"))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dropped_guard_rolls_back() {
        let registry = Registry::isolated();
        registry
            .register(id("manual"), noop(), CommandMetadata::new("manual"))
            .unwrap();
        {
            let guard = registry.begin_scan().unwrap();
            guard
                .registry()
                .register(id("scanned"), noop(), CommandMetadata::new("scanned"))
                .unwrap();
        }
        assert!(!registry.is_scanning());
        assert!(!registry.is_sealed());
        assert_eq!(registry.identities(), vec![id("manual")]);
        assert!(registry.begin_scan().is_ok());
    }
}
