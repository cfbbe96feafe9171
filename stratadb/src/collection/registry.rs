use crate::collection::Collection;
use crate::common::{
    atomic, validate_name, Atomic, ReadExecutor, WriteExecutor, DEFAULT_COLLECTION_NAME,
    DEFAULT_SCOPE_NAME, TREE_NAME_SEPARATOR,
};
use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::store::StorageEngine;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Owner of all collection records in a database.
///
/// The registry is the single source of truth for which collections exist,
/// in which scope, and whether each record is still valid. Scopes are
/// derived: a scope exists exactly while at least one collection lives in
/// it, except the default scope, which always exists.
#[derive(Clone)]
pub(crate) struct CollectionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    engine: StorageEngine,
    /// Keyed by `scope|collection`; the separator is not a legal name
    /// character, so the composed key is unambiguous. Insertion order is
    /// creation order.
    collections: Atomic<IndexMap<String, Collection>>,
    closed: AtomicBool,
    next_sequence: AtomicU64,
    /// Once the default collection is deleted it can never come back for
    /// this database instance.
    default_collection_deleted: AtomicBool,
}

fn tree_key(scope_name: &str, name: &str) -> String {
    format!("{}{}{}", scope_name, TREE_NAME_SEPARATOR, name)
}

fn is_default_pair(scope_name: &str, name: &str) -> bool {
    scope_name == DEFAULT_SCOPE_NAME && name == DEFAULT_COLLECTION_NAME
}

/// Checks a scope/collection name pair against the naming rules.
///
/// The reserved `_default.default` pair is exempt from the grammar (its
/// leading underscore would otherwise fail); the `_default` collection name
/// is rejected everywhere outside the default scope.
fn validate_pair(scope_name: &str, name: &str) -> StrataResult<()> {
    if is_default_pair(scope_name, name) {
        return Ok(());
    }
    if scope_name != DEFAULT_SCOPE_NAME {
        validate_name(scope_name)?;
    }
    validate_name(name)
}

fn validate_scope_name(scope_name: &str) -> StrataResult<()> {
    if scope_name == DEFAULT_SCOPE_NAME {
        return Ok(());
    }
    validate_name(scope_name)
}

impl CollectionRegistry {
    pub(crate) fn new(engine: StorageEngine) -> Self {
        CollectionRegistry {
            inner: Arc::new(RegistryInner {
                engine,
                collections: atomic(IndexMap::new()),
                closed: AtomicBool::new(false),
                next_sequence: AtomicU64::new(1),
                default_collection_deleted: AtomicBool::new(false),
            }),
        }
    }

    /// Materializes the default collection. Called once when the database
    /// opens, so it is always the first record.
    pub(crate) fn bootstrap_default(&self) -> StrataResult<()> {
        self.create_collection(DEFAULT_COLLECTION_NAME, DEFAULT_SCOPE_NAME)
            .map(|_| ())
    }

    /// Creates a collection, or returns the existing record unchanged
    /// (idempotent; every handle of the same record compares equal).
    pub(crate) fn create_collection(
        &self,
        name: &str,
        scope_name: &str,
    ) -> StrataResult<Collection> {
        self.check_open()?;
        validate_pair(scope_name, name)?;

        self.inner.collections.write_with(|collections| {
            let key = tree_key(scope_name, name);
            if let Some(existing) = collections.get(&key) {
                return Ok(existing.clone());
            }

            if is_default_pair(scope_name, name)
                && self.inner.default_collection_deleted.load(Ordering::Acquire)
            {
                log::error!("The default collection cannot be re-created once deleted");
                return Err(StrataError::new(
                    "The default collection cannot be re-created once deleted",
                    ErrorKind::InvalidParameter,
                ));
            }

            let sequence = self.inner.next_sequence.fetch_add(1, Ordering::AcqRel);
            let tree = self.inner.engine.open_tree(&key)?;
            let collection = Collection::new(name, scope_name, sequence, tree);
            collections.insert(key, collection.clone());
            log::debug!("Created collection {}.{}", scope_name, name);
            Ok(collection)
        })
    }

    /// Looks up a live collection record. Absence is not an error; an
    /// ill-formed name pair is.
    pub(crate) fn get_collection(
        &self,
        name: &str,
        scope_name: &str,
    ) -> StrataResult<Option<Collection>> {
        self.check_open()?;
        validate_pair(scope_name, name)?;
        Ok(self
            .inner
            .collections
            .read_with(|collections| collections.get(&tree_key(scope_name, name)).cloned()))
    }

    /// Deletes a collection: the record flips to invalid, its documents are
    /// removed from the engine, and its scope disappears if this was the
    /// scope's last collection. Returns false when no such collection
    /// exists.
    pub(crate) fn delete_collection(&self, name: &str, scope_name: &str) -> StrataResult<bool> {
        self.check_open()?;
        validate_pair(scope_name, name)?;

        self.inner.collections.write_with(|collections| {
            let key = tree_key(scope_name, name);
            match collections.shift_remove(&key) {
                Some(collection) => {
                    collection.invalidate();
                    if is_default_pair(scope_name, name) {
                        self.inner
                            .default_collection_deleted
                            .store(true, Ordering::Release);
                    }
                    self.inner.engine.remove_tree(&key)?;
                    log::debug!("Deleted collection {}.{}", scope_name, name);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// All scope names: the default scope first, then non-default scopes in
    /// the creation order of their first collection.
    pub(crate) fn scope_names(&self) -> StrataResult<Vec<String>> {
        self.check_open()?;
        Ok(self.inner.collections.read_with(|collections| {
            let mut names = vec![DEFAULT_SCOPE_NAME.to_string()];
            for collection in collections.values() {
                let scope_name = collection.scope_name();
                if scope_name != DEFAULT_SCOPE_NAME && !names.iter().any(|n| n == scope_name) {
                    names.push(scope_name.to_string());
                }
            }
            names
        }))
    }

    /// Collection names within a scope, in creation order. An empty list
    /// for a scope with no collections (the scope does not exist).
    pub(crate) fn collection_names(&self, scope_name: &str) -> StrataResult<Vec<String>> {
        self.check_open()?;
        validate_scope_name(scope_name)?;
        Ok(self.inner.collections.read_with(|collections| {
            collections
                .values()
                .filter(|c| c.scope_name() == scope_name)
                .map(|c| c.name().to_string())
                .collect()
        }))
    }

    /// True while at least one collection lives in the scope; always true
    /// for the default scope.
    pub(crate) fn has_scope(&self, scope_name: &str) -> StrataResult<bool> {
        self.check_open()?;
        validate_scope_name(scope_name)?;
        if scope_name == DEFAULT_SCOPE_NAME {
            return Ok(true);
        }
        Ok(self
            .inner
            .collections
            .read_with(|collections| collections.values().any(|c| c.scope_name() == scope_name)))
    }

    /// Flips every record to invalid and forgets them all. Called on
    /// database close and delete; the registry refuses further work.
    pub(crate) fn invalidate_all(&self) {
        self.inner.collections.write_with(|collections| {
            self.inner.closed.store(true, Ordering::Release);
            for collection in collections.values() {
                collection.invalidate();
            }
            collections.clear();
        });
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> StrataResult<()> {
        if self.is_closed() {
            log::error!("Database is not open");
            return Err(StrataError::new(
                "Database is not open",
                ErrorKind::NotOpen,
            ));
        }
        Ok(())
    }
}
