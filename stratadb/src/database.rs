use crate::collection::registry::CollectionRegistry;
use crate::collection::{Collection, Scope};
use crate::common::{DEFAULT_COLLECTION_NAME, DEFAULT_SCOPE_NAME};
use crate::errors::StrataResult;
use crate::store::memory::InMemoryEngine;
use crate::store::StorageEngine;
use std::sync::Arc;

/// An embedded document database organized into scopes and collections.
///
/// A database always opens with the default collection (`_default._default`)
/// in place. Collections are the CRUD surface; the database itself only
/// organizes them and controls their shared lifecycle: closing or deleting
/// the database invalidates every outstanding collection handle.
///
/// `Database` is a cheap cloneable handle; clones share the same registry
/// and storage engine.
///
/// # Examples
///
/// ```rust,ignore
/// let db = Database::in_memory()?;
/// let inventory = db.create_collection("widgets", "inventory")?;
///
/// let mut doc = Document::new("widget::1");
/// doc.put("name", "flange");
/// inventory.save(&mut doc)?;
///
/// db.close()?;
/// assert!(inventory.save(&mut doc).is_err());
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    registry: CollectionRegistry,
    engine: StorageEngine,
}

impl Database {
    /// Opens a database backed by the in-memory storage engine.
    pub fn in_memory() -> StrataResult<Self> {
        Self::open(StorageEngine::new(InMemoryEngine::new()))
    }

    /// Opens a database over the given storage engine and materializes the
    /// default collection.
    pub fn open(engine: StorageEngine) -> StrataResult<Self> {
        let registry = CollectionRegistry::new(engine.clone());
        registry.bootstrap_default()?;
        log::debug!("Opened database");
        Ok(Database {
            inner: Arc::new(DatabaseInner { registry, engine }),
        })
    }

    /// All scope names, the default scope first.
    pub fn scope_names(&self) -> StrataResult<Vec<String>> {
        self.inner.registry.scope_names()
    }

    /// Collection names within a scope, in creation order.
    pub fn collection_names(&self, scope_name: &str) -> StrataResult<Vec<String>> {
        self.inner.registry.collection_names(scope_name)
    }

    /// A handle to a scope, or `None` when the scope has no collections.
    /// The default scope always exists.
    pub fn scope(&self, scope_name: &str) -> StrataResult<Option<Scope>> {
        if self.inner.registry.has_scope(scope_name)? {
            Ok(Some(Scope::new(scope_name, self.inner.registry.clone())))
        } else {
            Ok(None)
        }
    }

    /// The always-present default scope.
    pub fn default_scope(&self) -> StrataResult<Scope> {
        self.inner.registry.has_scope(DEFAULT_SCOPE_NAME)?;
        Ok(Scope::new(DEFAULT_SCOPE_NAME, self.inner.registry.clone()))
    }

    /// Looks up a collection. Absence is not an error.
    pub fn collection(&self, name: &str, scope_name: &str) -> StrataResult<Option<Collection>> {
        self.inner.registry.get_collection(name, scope_name)
    }

    /// The default collection, or `None` once it has been deleted.
    pub fn default_collection(&self) -> StrataResult<Option<Collection>> {
        self.inner
            .registry
            .get_collection(DEFAULT_COLLECTION_NAME, DEFAULT_SCOPE_NAME)
    }

    /// Creates a collection (and implicitly its scope). Idempotent: an
    /// existing record is returned unchanged.
    pub fn create_collection(&self, name: &str, scope_name: &str) -> StrataResult<Collection> {
        self.inner.registry.create_collection(name, scope_name)
    }

    /// Deletes a collection and all its documents; its scope disappears
    /// with its last collection. Returns false when no such collection
    /// exists.
    pub fn delete_collection(&self, name: &str, scope_name: &str) -> StrataResult<bool> {
        self.inner.registry.delete_collection(name, scope_name)
    }

    /// Closes the database: every collection handle flips to invalid and
    /// the storage engine is shut down. Idempotent.
    pub fn close(&self) -> StrataResult<()> {
        if self.inner.registry.is_closed() {
            return Ok(());
        }
        self.inner.registry.invalidate_all();
        self.inner.engine.close()?;
        log::debug!("Closed database");
        Ok(())
    }

    /// Deletes the database: invalidates every handle and destroys all
    /// stored data.
    pub fn delete(&self) -> StrataResult<()> {
        if self.inner.registry.is_closed() {
            return Ok(());
        }
        self.inner.registry.invalidate_all();
        self.inner.engine.drop_all()?;
        self.inner.engine.close()?;
        log::debug!("Deleted database");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.registry.is_closed()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("closed", &self.is_closed())
            .finish()
    }
}
