use crate::errors::StrataResult;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::{Handle, HandlerId};
use std::fmt::Debug;
use std::sync::Arc;

/// A committed write to a collection, delivered to whole-collection
/// listeners. Carries the batch of document IDs changed by the commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionChange {
    pub scope_name: String,
    pub collection_name: String,
    pub doc_ids: Vec<String>,
}

/// A committed write to one specific document, delivered to listeners
/// subscribed to that document ID.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub scope_name: String,
    pub collection_name: String,
    pub doc_id: String,
}

/// Closure signature for whole-collection change listeners.
///
/// Listeners may be invoked from an arbitrary thread and must be
/// non-throwing; a returned error is logged by the hub, never propagated to
/// the writer.
pub trait CollectionChangeCallback:
    Send + Sync + Fn(CollectionChange) -> StrataResult<()>
{
}

impl<F> CollectionChangeCallback for F where
    F: Send + Sync + Fn(CollectionChange) -> StrataResult<()>
{
}

/// Closure signature for per-document change listeners.
pub trait DocumentChangeCallback: Send + Sync + Fn(DocumentChange) -> StrataResult<()> {}

impl<F> DocumentChangeCallback for F where F: Send + Sync + Fn(DocumentChange) -> StrataResult<()> {}

/// Listener for whole-collection changes.
#[derive(Clone)]
pub struct CollectionChangeListener {
    on_change: Arc<dyn CollectionChangeCallback>,
}

impl CollectionChangeListener {
    pub fn new(on_change: impl CollectionChangeCallback + 'static) -> Self {
        CollectionChangeListener {
            on_change: Arc::new(on_change),
        }
    }
}

impl Handle<CollectionChange> for CollectionChangeListener {
    fn handle(&self, event: &Event<CollectionChange>) -> Result<(), BasuError> {
        match (self.on_change)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for CollectionChangeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionChangeListener").finish()
    }
}

/// Listener for changes to one document.
#[derive(Clone)]
pub struct DocumentChangeListener {
    on_change: Arc<dyn DocumentChangeCallback>,
}

impl DocumentChangeListener {
    pub fn new(on_change: impl DocumentChangeCallback + 'static) -> Self {
        DocumentChangeListener {
            on_change: Arc::new(on_change),
        }
    }
}

impl Handle<DocumentChange> for DocumentChangeListener {
    fn handle(&self, event: &Event<DocumentChange>) -> Result<(), BasuError> {
        match (self.on_change)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for DocumentChangeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentChangeListener").finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListenerRegistry {
    Collection,
    Document,
}

/// Token returned by listener registration; the only teardown primitive.
///
/// Removal consumes the token, so a listener can be removed exactly once.
/// Removing a token whose collection has been invalidated (or whose
/// listener is already gone) is a safe no-op.
#[derive(Debug)]
pub struct ListenerToken {
    pub(crate) registry: ListenerRegistry,
    pub(crate) topic: String,
    pub(crate) handler_id: HandlerId,
}

impl ListenerToken {
    pub(crate) fn collection(topic: &str, handler_id: HandlerId) -> Self {
        ListenerToken {
            registry: ListenerRegistry::Collection,
            topic: topic.to_string(),
            handler_id,
        }
    }

    pub(crate) fn document(doc_id: &str, handler_id: HandlerId) -> Self {
        ListenerToken {
            registry: ListenerRegistry::Document,
            topic: doc_id.to_string(),
            handler_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_listener_invokes_callback() {
        let listener = CollectionChangeListener::new(|change: CollectionChange| {
            assert_eq!(change.collection_name, "colA");
            assert_eq!(change.doc_ids, vec!["doc1".to_string()]);
            Ok(())
        });
        let change = CollectionChange {
            scope_name: "_default".to_string(),
            collection_name: "colA".to_string(),
            doc_ids: vec!["doc1".to_string()],
        };
        assert!(listener.handle(&Event::new(change)).is_ok());
    }

    #[test]
    fn document_listener_invokes_callback() {
        let listener = DocumentChangeListener::new(|change: DocumentChange| {
            assert_eq!(change.doc_id, "doc1");
            Ok(())
        });
        let change = DocumentChange {
            scope_name: "_default".to_string(),
            collection_name: "colA".to_string(),
            doc_id: "doc1".to_string(),
        };
        assert!(listener.handle(&Event::new(change)).is_ok());
    }

    #[test]
    fn failing_callback_maps_to_handler_error() {
        let listener = CollectionChangeListener::new(|_change: CollectionChange| {
            Err(crate::errors::StrataError::new(
                "listener broke",
                crate::errors::ErrorKind::EventError,
            ))
        });
        let change = CollectionChange {
            scope_name: "_default".to_string(),
            collection_name: "colA".to_string(),
            doc_ids: vec![],
        };
        assert!(listener.handle(&Event::new(change)).is_err());
    }

    #[test]
    fn token_records_its_registry_and_topic() {
        let token = ListenerToken::document("doc42", HandlerId::new());
        assert_eq!(token.registry, ListenerRegistry::Document);
        assert_eq!(token.topic, "doc42");
    }
}
