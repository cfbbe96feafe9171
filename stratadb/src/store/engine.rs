use crate::common::DocumentBody;
use crate::errors::StrataResult;
use crate::index::IndexDescriptor;
use std::ops::Deref;
use std::sync::Arc;

/// Opaque revision marker maintained by the storage engine.
///
/// The mutation engine only ever asks "is this newer than that"; the
/// underlying generation counter is never exposed for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision(u64);

impl Revision {
    pub(crate) fn new(generation: u64) -> Self {
        Revision(generation)
    }

    /// True if `self` supersedes `other`.
    pub fn is_newer_than(&self, other: &Revision) -> bool {
        self.0 > other.0
    }
}

/// A document revision as read back from the storage engine.
///
/// `body` is `None` for a tombstone (deleted, but revision history kept for
/// replication).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub body: Option<DocumentBody>,
    pub revision: Revision,
    /// Epoch milliseconds; 0 means the document never expires.
    pub expiration: i64,
}

/// Result of a compare-and-swap write.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplaceOutcome {
    /// The write applied; this is the new current revision.
    Applied(Revision),
    /// The stored revision did not match the expectation. Carries the
    /// current stored revision, or `None` if the document is absent.
    Conflict(Option<StoredDocument>),
}

/// Per-collection document storage handle provided by the engine.
///
/// One tree backs one collection record. Deleting a collection removes its
/// tree; re-creating the collection opens a fresh, empty tree.
///
/// Implementers must be `Send + Sync`.
pub trait DocTreeProvider: Send + Sync {
    /// Name of the tree (the composed `scope|collection` key).
    fn name(&self) -> String;

    /// Reads the current revision of a document. Live but expired documents
    /// read as absent; tombstones are returned with `body: None`.
    fn get(&self, doc_id: &str) -> StrataResult<Option<StoredDocument>>;

    /// Unconditionally writes a live revision, superseding whatever is
    /// stored. Returns the new revision.
    fn put(&self, doc_id: &str, body: DocumentBody) -> StrataResult<Revision>;

    /// Compare-and-swap write. Applies only when the stored revision
    /// matches `expected` (`None` = document must be absent). A `body` of
    /// `None` writes a tombstone.
    fn replace(
        &self,
        doc_id: &str,
        expected: Option<Revision>,
        body: Option<DocumentBody>,
    ) -> StrataResult<ReplaceOutcome>;

    /// Unconditionally writes a tombstone revision. Returns `None` when the
    /// document has no stored entry at all.
    fn put_tombstone(&self, doc_id: &str) -> StrataResult<Option<Revision>>;

    /// Removes the document and its entire revision history. Returns false
    /// when there was nothing to purge.
    fn purge(&self, doc_id: &str) -> StrataResult<bool>;

    /// Number of live, unexpired documents.
    fn count(&self) -> StrataResult<u64>;

    /// True if a live, unexpired revision of the document exists.
    fn contains(&self, doc_id: &str) -> StrataResult<bool>;

    /// Expiration timestamp of a document, 0 when none is set or the
    /// document is absent.
    fn get_expiration(&self, doc_id: &str) -> StrataResult<i64>;

    /// Sets (or, with 0, clears) the expiration timestamp. Returns false
    /// when the document is absent.
    fn set_expiration(&self, doc_id: &str, expiration: i64) -> StrataResult<bool>;

    /// Executes an index build for this tree.
    fn build_index(&self, descriptor: &IndexDescriptor) -> StrataResult<()>;

    /// Drops index data. Dropping an unknown index is a no-op.
    fn drop_index(&self, name: &str) -> StrataResult<()>;
}

/// Cheap cloneable wrapper over a `DocTreeProvider` implementation.
#[derive(Clone)]
pub struct DocTree {
    inner: Arc<dyn DocTreeProvider>,
}

impl DocTree {
    pub fn new<T: DocTreeProvider + 'static>(inner: T) -> Self {
        DocTree {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for DocTree {
    type Target = Arc<dyn DocTreeProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for DocTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocTree")
            .field("name", &self.inner.name())
            .finish()
    }
}

/// Storage engine boundary for one database.
///
/// The organizing layer consumes exactly this surface: open/remove a
/// per-collection tree, and engine lifecycle. Everything else (persistence
/// format, index execution, query) lives behind it.
pub trait StorageEngineProvider: Send + Sync {
    /// Opens the tree with the given name, creating it when absent.
    fn open_tree(&self, name: &str) -> StrataResult<DocTree>;

    /// Deletes a tree and all its documents. Removing an unknown tree is a
    /// no-op.
    fn remove_tree(&self, name: &str) -> StrataResult<()>;

    /// True if a tree with the given name exists.
    fn has_tree(&self, name: &str) -> StrataResult<bool>;

    fn is_closed(&self) -> StrataResult<bool>;

    /// Closes the engine; further tree operations fail.
    fn close(&self) -> StrataResult<()>;

    /// Destroys all engine data (database delete).
    fn drop_all(&self) -> StrataResult<()>;
}

/// Cheap cloneable wrapper over a `StorageEngineProvider` implementation.
#[derive(Clone)]
pub struct StorageEngine {
    inner: Arc<dyn StorageEngineProvider>,
}

impl StorageEngine {
    pub fn new<T: StorageEngineProvider + 'static>(inner: T) -> Self {
        StorageEngine {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for StorageEngine {
    type Target = Arc<dyn StorageEngineProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_comparison_is_strict() {
        let older = Revision::new(1);
        let newer = Revision::new(2);
        assert!(newer.is_newer_than(&older));
        assert!(!older.is_newer_than(&newer));
        assert!(!older.is_newer_than(&older));
    }

    #[test]
    fn stored_tombstone_has_no_body() {
        let tombstone = StoredDocument {
            body: None,
            revision: Revision::new(3),
            expiration: 0,
        };
        assert!(tombstone.body.is_none());
    }
}
