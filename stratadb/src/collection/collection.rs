use crate::collection::{
    CollectionChange, CollectionChangeCallback, CollectionChangeListener, Document,
    DocumentChange, DocumentChangeCallback, DocumentChangeListener, ListenerRegistry,
    ListenerToken,
};
use crate::common::{
    atomic, validate_name, Atomic, ChangeBus, ReadExecutor, WriteExecutor,
    COLLECTION_CHANGE_TOPIC, MAX_CONFLICT_RETRIES,
};
use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::index::{FullTextIndexConfig, IndexConfig, IndexDescriptor, ValueIndexConfig};
use crate::store::{DocTree, ReplaceOutcome};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Conflict-handling policy for save and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyControl {
    /// Overwrite the stored revision even if it has advanced since the
    /// document was loaded.
    LastWriteWins,
    /// Do not apply the write when the stored revision has advanced; the
    /// operation reports "not applied" without raising an error.
    FailOnConflict,
}

/// A named, scoped container of documents; the primary CRUD unit.
///
/// `Collection` is a cheap cloneable handle over a shared record owned by
/// the database. The record stays valid until the collection is deleted or
/// the owning database is closed or deleted; after that every operation on
/// any handle fails with `NotOpen` (name accessors and listener removal
/// excepted). Handles over the same live record share document storage and
/// listener registries, so a listener registered through one handle sees
/// writes made through another.
///
/// # Examples
///
/// ```rust,ignore
/// let db = Database::in_memory()?;
/// let collection = db.create_collection("users", "crm")?;
///
/// let mut doc = Document::new("user::alice");
/// doc.put("name", "Alice");
/// collection.save(&mut doc)?;
///
/// assert_eq!(collection.count()?, 1);
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

pub(crate) struct CollectionInner {
    name: String,
    scope_name: String,
    sequence: u64,
    valid: AtomicBool,
    tree: DocTree,
    indexes: Atomic<IndexMap<String, IndexConfig>>,
    collection_bus: ChangeBus<CollectionChange, CollectionChangeListener>,
    document_bus: ChangeBus<DocumentChange, DocumentChangeListener>,
}

impl Collection {
    pub(crate) fn new(name: &str, scope_name: &str, sequence: u64, tree: DocTree) -> Self {
        Collection {
            inner: Arc::new(CollectionInner {
                name: name.to_string(),
                scope_name: scope_name.to_string(),
                sequence,
                valid: AtomicBool::new(true),
                tree,
                indexes: atomic(IndexMap::new()),
                collection_bus: ChangeBus::new(),
                document_bus: ChangeBus::new(),
            }),
        }
    }

    /// The collection name. Remains readable after invalidation.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The owning scope's name. Remains readable after invalidation.
    pub fn scope_name(&self) -> &str {
        &self.inner.scope_name
    }

    /// Fully qualified `scope.collection` name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.inner.scope_name, self.inner.name)
    }

    /// Creation sequence of this record within its database; later records
    /// have larger sequences.
    pub fn sequence(&self) -> u64 {
        self.inner.sequence
    }

    /// True until the collection is deleted or the owning database is
    /// closed or deleted.
    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// Number of live documents.
    pub fn count(&self) -> StrataResult<u64> {
        self.check_open()?;
        self.inner.tree.count()
    }

    // ---- document lifecycle -------------------------------------------------

    /// Reads the current revision of a document. Absence is not an error.
    pub fn get(&self, doc_id: &str) -> StrataResult<Option<Document>> {
        self.check_open()?;
        match self.inner.tree.get(doc_id)? {
            Some(stored) => match stored.body {
                Some(body) => Ok(Some(Document::from_stored(doc_id, body, stored.revision))),
                // tombstone
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Reads a document as an editable copy, ready for in-place updates
    /// followed by a save.
    pub fn get_mutable(&self, doc_id: &str) -> StrataResult<Option<Document>> {
        self.get(doc_id)
    }

    /// Saves a document, unconditionally overwriting the stored revision.
    ///
    /// Last writer wins: if a newer revision was stored since `document`
    /// was loaded, it is silently superseded. Use
    /// [`save_with_concurrency_control`](Self::save_with_concurrency_control)
    /// or [`save_with_conflict_handler`](Self::save_with_conflict_handler)
    /// when that is not acceptable.
    pub fn save(&self, document: &mut Document) -> StrataResult<()> {
        self.check_open()?;
        let revision = self.inner.tree.put(document.id(), document.body().clone())?;
        document.set_revision(revision);
        self.publish_change(document.id());
        Ok(())
    }

    /// Saves a document under the given conflict policy.
    ///
    /// Returns whether the save applied. Under `FailOnConflict` a stored
    /// revision newer than the document's marker yields `Ok(false)` -- not
    /// an error.
    pub fn save_with_concurrency_control(
        &self,
        document: &mut Document,
        control: ConcurrencyControl,
    ) -> StrataResult<bool> {
        self.check_open()?;
        match control {
            ConcurrencyControl::LastWriteWins => {
                self.save(document)?;
                Ok(true)
            }
            ConcurrencyControl::FailOnConflict => {
                let outcome = self.inner.tree.replace(
                    document.id(),
                    document.revision(),
                    Some(document.body().clone()),
                )?;
                match outcome {
                    ReplaceOutcome::Applied(revision) => {
                        document.set_revision(revision);
                        self.publish_change(document.id());
                        Ok(true)
                    }
                    ReplaceOutcome::Conflict(_) => Ok(false),
                }
            }
        }
    }

    /// Saves a document, resolving conflicts through a caller-supplied
    /// merge handler.
    ///
    /// When the stored revision has advanced past the document's marker,
    /// `handler(proposed, current)` is invoked with the current stored
    /// document (`None` if it was deleted or purged meanwhile). The handler
    /// edits `proposed` in place and returns whether to proceed; returning
    /// false abandons the save with `Ok(false)`.
    ///
    /// The handler runs exactly once per conflicting revision observed. If
    /// the stored revision keeps advancing, the read-handler-write cycle
    /// retries up to `MAX_CONFLICT_RETRIES` times before failing with
    /// `ErrorKind::ConflictExhausted`.
    pub fn save_with_conflict_handler<H>(
        &self,
        document: &mut Document,
        mut handler: H,
    ) -> StrataResult<bool>
    where
        H: FnMut(&mut Document, Option<&Document>) -> bool,
    {
        self.check_open()?;
        for _ in 0..MAX_CONFLICT_RETRIES {
            let outcome = self.inner.tree.replace(
                document.id(),
                document.revision(),
                Some(document.body().clone()),
            )?;
            match outcome {
                ReplaceOutcome::Applied(revision) => {
                    document.set_revision(revision);
                    self.publish_change(document.id());
                    return Ok(true);
                }
                ReplaceOutcome::Conflict(current) => {
                    let current_doc = current.as_ref().and_then(|stored| {
                        stored.body.clone().map(|body| {
                            Document::from_stored(document.id(), body, stored.revision)
                        })
                    });
                    if !handler(document, current_doc.as_ref()) {
                        return Ok(false);
                    }
                    // align with the revision we just observed and retry
                    document.align_revision(current.map(|stored| stored.revision));
                }
            }
        }

        log::error!(
            "Conflict handler save of '{}' in {} exhausted {} retries",
            document.id(),
            self.full_name(),
            MAX_CONFLICT_RETRIES
        );
        Err(StrataError::new(
            &format!(
                "Save of document '{}' kept conflicting after {} retries",
                document.id(),
                MAX_CONFLICT_RETRIES
            ),
            ErrorKind::ConflictExhausted,
        ))
    }

    /// Deletes a document, writing a tombstone revision (deletions are
    /// replicated, unlike purges). Last-write-wins semantics; returns false
    /// when no live document exists.
    pub fn delete(&self, document: &Document) -> StrataResult<bool> {
        self.delete_with_concurrency_control(document, ConcurrencyControl::LastWriteWins)
    }

    /// Deletes a document under the given conflict policy. Under
    /// `FailOnConflict` an advanced stored revision yields `Ok(false)`.
    pub fn delete_with_concurrency_control(
        &self,
        document: &Document,
        control: ConcurrencyControl,
    ) -> StrataResult<bool> {
        self.check_open()?;
        if !self.inner.tree.contains(document.id())? {
            return Ok(false);
        }
        match control {
            ConcurrencyControl::LastWriteWins => {
                match self.inner.tree.put_tombstone(document.id())? {
                    Some(_) => {
                        self.publish_change(document.id());
                        Ok(true)
                    }
                    // raced with a purge
                    None => Ok(false),
                }
            }
            ConcurrencyControl::FailOnConflict => {
                let outcome = self
                    .inner
                    .tree
                    .replace(document.id(), document.revision(), None)?;
                match outcome {
                    ReplaceOutcome::Applied(_) => {
                        self.publish_change(document.id());
                        Ok(true)
                    }
                    ReplaceOutcome::Conflict(_) => Ok(false),
                }
            }
        }
    }

    /// Purges a document: removes every trace of it, including revision
    /// history. Purges are not replicated. Returns false when the document
    /// does not exist.
    pub fn purge(&self, document: &Document) -> StrataResult<bool> {
        self.purge_by_id(document.id())
    }

    /// Purges a document by ID alone.
    pub fn purge_by_id(&self, doc_id: &str) -> StrataResult<bool> {
        self.check_open()?;
        let purged = self.inner.tree.purge(doc_id)?;
        if purged {
            self.publish_change(doc_id);
        }
        Ok(purged)
    }

    /// Expiration timestamp of a document in epoch milliseconds; 0 when no
    /// expiration is set (or the document is absent).
    pub fn get_expiration(&self, doc_id: &str) -> StrataResult<i64> {
        self.check_open()?;
        self.inner.tree.get_expiration(doc_id)
    }

    /// Sets the expiration timestamp of a document; 0 clears it. Negative
    /// timestamps are rejected. Returns false when the document is absent.
    pub fn set_expiration(&self, doc_id: &str, expiration: i64) -> StrataResult<bool> {
        self.check_open()?;
        if expiration < 0 {
            log::error!(
                "Rejecting negative expiration {} for document '{}'",
                expiration,
                doc_id
            );
            return Err(StrataError::new(
                &format!("Expiration timestamp cannot be negative: {}", expiration),
                ErrorKind::InvalidParameter,
            ));
        }
        self.inner.tree.set_expiration(doc_id, expiration)
    }

    // ---- index management ---------------------------------------------------

    /// Creates a value index. An existing index with the same name and an
    /// identical configuration is left untouched; a different configuration
    /// is replaced with no observable intermediate state.
    pub fn create_value_index(&self, name: &str, config: ValueIndexConfig) -> StrataResult<()> {
        self.create_index(name, IndexConfig::Value(config))
    }

    /// Creates a full-text index, with the same replace-on-difference
    /// semantics as [`create_value_index`](Self::create_value_index).
    pub fn create_full_text_index(
        &self,
        name: &str,
        config: FullTextIndexConfig,
    ) -> StrataResult<()> {
        self.create_index(name, IndexConfig::FullText(config))
    }

    fn create_index(&self, name: &str, config: IndexConfig) -> StrataResult<()> {
        self.check_open()?;
        validate_name(name)?;

        // holding the registry lock across drop+build keeps the swap atomic
        // from the caller's perspective
        self.inner.indexes.write_with(|indexes| {
            if let Some(existing) = indexes.get(name) {
                if *existing == config {
                    return Ok(());
                }
                self.inner.tree.drop_index(name)?;
                indexes.shift_remove(name);
            }
            self.inner
                .tree
                .build_index(&IndexDescriptor::new(name, config.clone()))?;
            indexes.insert(name.to_string(), config);
            Ok(())
        })
    }

    /// Deletes an index. Removing a non-existent index is not an error.
    pub fn delete_index(&self, name: &str) -> StrataResult<()> {
        self.check_open()?;
        self.inner.indexes.write_with(|indexes| {
            if indexes.shift_remove(name).is_some() {
                self.inner.tree.drop_index(name)?;
            }
            Ok(())
        })
    }

    /// Index names in creation order.
    pub fn list_index_names(&self) -> StrataResult<Vec<String>> {
        self.check_open()?;
        Ok(self
            .inner
            .indexes
            .read_with(|indexes| indexes.keys().cloned().collect()))
    }

    // ---- change listeners ---------------------------------------------------

    /// Registers a whole-collection change listener, called with the batch
    /// of changed document IDs after each committed write.
    pub fn add_change_listener(
        &self,
        callback: impl CollectionChangeCallback + 'static,
    ) -> StrataResult<ListenerToken> {
        self.check_open()?;
        let handler_id = self
            .inner
            .collection_bus
            .register(COLLECTION_CHANGE_TOPIC, CollectionChangeListener::new(callback))?;
        Ok(ListenerToken::collection(COLLECTION_CHANGE_TOPIC, handler_id))
    }

    /// Registers a listener for one document ID; it fires only for
    /// committed writes to that document.
    pub fn add_document_change_listener(
        &self,
        doc_id: &str,
        callback: impl DocumentChangeCallback + 'static,
    ) -> StrataResult<ListenerToken> {
        self.check_open()?;
        let handler_id = self
            .inner
            .document_bus
            .register(doc_id, DocumentChangeListener::new(callback))?;
        Ok(ListenerToken::document(doc_id, handler_id))
    }

    /// Removes a listener. Consumes the token; always safe, including on an
    /// invalidated handle (dangling removal is a no-op).
    pub fn remove_listener(&self, token: ListenerToken) {
        let result = match token.registry {
            ListenerRegistry::Collection => self
                .inner
                .collection_bus
                .deregister(&token.topic, &token.handler_id),
            ListenerRegistry::Document => self
                .inner
                .document_bus
                .deregister(&token.topic, &token.handler_id),
        };
        if let Err(e) = result {
            log::warn!("Failed to remove listener from {}: {}", self.full_name(), e);
        }
    }

    // ---- lifecycle ------------------------------------------------------------

    /// Flips this record to the terminal invalid state and tears down its
    /// listener registries. Called on collection delete and on database
    /// close/delete; never reversed for the same record.
    pub(crate) fn invalidate(&self) {
        self.inner.valid.store(false, Ordering::Release);
        if let Err(e) = self.inner.collection_bus.close() {
            log::warn!("Failed to clear collection listeners: {}", e);
        }
        if let Err(e) = self.inner.document_bus.close() {
            log::warn!("Failed to clear document listeners: {}", e);
        }
    }

    fn check_open(&self) -> StrataResult<()> {
        if !self.is_valid() {
            log::error!("Collection {} is not open", self.full_name());
            return Err(StrataError::new(
                &format!("Collection {} is not open", self.full_name()),
                ErrorKind::NotOpen,
            ));
        }
        Ok(())
    }

    fn publish_change(&self, doc_id: &str) {
        let collection_change = CollectionChange {
            scope_name: self.inner.scope_name.clone(),
            collection_name: self.inner.name.clone(),
            doc_ids: vec![doc_id.to_string()],
        };
        if let Err(e) = self
            .inner
            .collection_bus
            .publish(COLLECTION_CHANGE_TOPIC, collection_change)
        {
            log::warn!("Failed to publish collection change: {}", e);
        }

        let document_change = DocumentChange {
            scope_name: self.inner.scope_name.clone(),
            collection_name: self.inner.name.clone(),
            doc_id: doc_id.to_string(),
        };
        if let Err(e) = self.inner.document_bus.publish(doc_id, document_change) {
            log::warn!("Failed to publish document change: {}", e);
        }
    }
}

impl PartialEq for Collection {
    /// Two handles are equal when they refer to the same underlying record.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("scope_name", &self.inner.scope_name)
            .field("sequence", &self.inner.sequence)
            .field("valid", &self.is_valid())
            .finish()
    }
}
