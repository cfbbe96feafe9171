use crate::common::{current_time_millis, DocumentBody};
use crate::errors::StrataResult;
use crate::index::IndexDescriptor;
use crate::store::{DocTreeProvider, ReplaceOutcome, Revision, StoredDocument};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One stored document slot: the latest revision, live or tombstoned.
#[derive(Debug, Clone)]
struct DocEntry {
    body: Option<DocumentBody>,
    generation: u64,
    expiration: i64,
}

impl DocEntry {
    fn is_live(&self) -> bool {
        self.body.is_some() && !self.is_expired()
    }

    fn is_expired(&self) -> bool {
        self.expiration != 0 && self.expiration <= current_time_millis()
    }

    fn stored(&self) -> StoredDocument {
        StoredDocument {
            body: self.body.clone(),
            revision: Revision::new(self.generation),
            expiration: self.expiration,
        }
    }
}

/// In-memory per-collection document tree.
///
/// Backed by a concurrent hash map; per-key mutations go through the map's
/// entry API, which is what makes the compare-and-swap in `replace` atomic
/// with respect to concurrent writers of the same document.
pub struct InMemoryTree {
    name: String,
    docs: DashMap<String, DocEntry>,
    next_generation: AtomicU64,
    indexes: DashMap<String, IndexDescriptor>,
}

impl InMemoryTree {
    pub fn new(name: &str) -> Self {
        InMemoryTree {
            name: name.to_string(),
            docs: DashMap::new(),
            next_generation: AtomicU64::new(1),
            indexes: DashMap::new(),
        }
    }

    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }
}

impl DocTreeProvider for InMemoryTree {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn get(&self, doc_id: &str) -> StrataResult<Option<StoredDocument>> {
        match self.docs.get(doc_id) {
            Some(entry) => {
                if entry.body.is_some() && entry.is_expired() {
                    // lazy expiry: expired documents read as absent
                    return Ok(None);
                }
                Ok(Some(entry.stored()))
            }
            None => Ok(None),
        }
    }

    fn put(&self, doc_id: &str, body: DocumentBody) -> StrataResult<Revision> {
        let generation = self.next_generation();
        match self.docs.entry(doc_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.body = Some(body);
                entry.generation = generation;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(DocEntry {
                    body: Some(body),
                    generation,
                    expiration: 0,
                });
            }
        }
        Ok(Revision::new(generation))
    }

    fn replace(
        &self,
        doc_id: &str,
        expected: Option<Revision>,
        body: Option<DocumentBody>,
    ) -> StrataResult<ReplaceOutcome> {
        match self.docs.entry(doc_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current_revision = Revision::new(occupied.get().generation);
                if expected != Some(current_revision) {
                    return Ok(ReplaceOutcome::Conflict(Some(occupied.get().stored())));
                }
                let generation = self.next_generation();
                let entry = occupied.get_mut();
                entry.body = body;
                entry.generation = generation;
                Ok(ReplaceOutcome::Applied(Revision::new(generation)))
            }
            Entry::Vacant(vacant) => {
                if expected.is_some() {
                    // the expected revision was purged out from under us
                    return Ok(ReplaceOutcome::Conflict(None));
                }
                let generation = self.next_generation();
                vacant.insert(DocEntry {
                    body,
                    generation,
                    expiration: 0,
                });
                Ok(ReplaceOutcome::Applied(Revision::new(generation)))
            }
        }
    }

    fn put_tombstone(&self, doc_id: &str) -> StrataResult<Option<Revision>> {
        match self.docs.entry(doc_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let generation = self.next_generation();
                let entry = occupied.get_mut();
                entry.body = None;
                entry.generation = generation;
                Ok(Some(Revision::new(generation)))
            }
            Entry::Vacant(_) => Ok(None),
        }
    }

    fn purge(&self, doc_id: &str) -> StrataResult<bool> {
        Ok(self.docs.remove(doc_id).is_some())
    }

    fn count(&self) -> StrataResult<u64> {
        let live = self.docs.iter().filter(|entry| entry.is_live()).count();
        Ok(live as u64)
    }

    fn contains(&self, doc_id: &str) -> StrataResult<bool> {
        Ok(self
            .docs
            .get(doc_id)
            .map(|entry| entry.is_live())
            .unwrap_or(false))
    }

    fn get_expiration(&self, doc_id: &str) -> StrataResult<i64> {
        Ok(self
            .docs
            .get(doc_id)
            .map(|entry| entry.expiration)
            .unwrap_or(0))
    }

    fn set_expiration(&self, doc_id: &str, expiration: i64) -> StrataResult<bool> {
        match self.docs.get_mut(doc_id) {
            Some(mut entry) => {
                entry.expiration = expiration;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn build_index(&self, descriptor: &IndexDescriptor) -> StrataResult<()> {
        self.indexes
            .insert(descriptor.name.clone(), descriptor.clone());
        Ok(())
    }

    fn drop_index(&self, name: &str) -> StrataResult<()> {
        self.indexes.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexConfig, QueryLanguage, ValueIndexConfig};
    use indexmap::IndexMap;

    fn body(field: &str, value: &str) -> DocumentBody {
        let mut map = IndexMap::new();
        map.insert(field.to_string(), crate::Value::from(value));
        map
    }

    #[test]
    fn put_assigns_monotonic_revisions() {
        let tree = InMemoryTree::new("s|c");
        let first = tree.put("doc1", body("k", "v1")).unwrap();
        let second = tree.put("doc1", body("k", "v2")).unwrap();
        assert!(second.is_newer_than(&first));
    }

    #[test]
    fn replace_applies_on_matching_revision() {
        let tree = InMemoryTree::new("s|c");
        let rev = tree.put("doc1", body("k", "v1")).unwrap();
        let outcome = tree
            .replace("doc1", Some(rev), Some(body("k", "v2")))
            .unwrap();
        assert!(matches!(outcome, ReplaceOutcome::Applied(_)));
    }

    #[test]
    fn replace_conflicts_on_stale_revision() {
        let tree = InMemoryTree::new("s|c");
        let stale = tree.put("doc1", body("k", "v1")).unwrap();
        tree.put("doc1", body("k", "v2")).unwrap();

        let outcome = tree
            .replace("doc1", Some(stale), Some(body("k", "v3")))
            .unwrap();
        match outcome {
            ReplaceOutcome::Conflict(Some(current)) => {
                assert_eq!(current.body.unwrap()["k"], crate::Value::from("v2"));
            }
            other => panic!("expected conflict with current doc, got {:?}", other),
        }
    }

    #[test]
    fn replace_expecting_absent_conflicts_when_present() {
        let tree = InMemoryTree::new("s|c");
        tree.put("doc1", body("k", "v1")).unwrap();
        let outcome = tree.replace("doc1", None, Some(body("k", "v2"))).unwrap();
        assert!(matches!(outcome, ReplaceOutcome::Conflict(Some(_))));
    }

    #[test]
    fn replace_of_purged_expected_revision_conflicts_with_none() {
        let tree = InMemoryTree::new("s|c");
        let rev = tree.put("doc1", body("k", "v1")).unwrap();
        assert!(tree.purge("doc1").unwrap());
        let outcome = tree
            .replace("doc1", Some(rev), Some(body("k", "v2")))
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Conflict(None));
    }

    #[test]
    fn tombstone_keeps_revision_history() {
        let tree = InMemoryTree::new("s|c");
        let live = tree.put("doc1", body("k", "v1")).unwrap();
        let tombstone = tree.put_tombstone("doc1").unwrap().unwrap();
        assert!(tombstone.is_newer_than(&live));

        let stored = tree.get("doc1").unwrap().unwrap();
        assert!(stored.body.is_none());
        assert_eq!(tree.count().unwrap(), 0);
    }

    #[test]
    fn tombstone_of_absent_doc_reports_none() {
        let tree = InMemoryTree::new("s|c");
        assert!(tree.put_tombstone("ghost").unwrap().is_none());
    }

    #[test]
    fn purge_removes_all_traces() {
        let tree = InMemoryTree::new("s|c");
        tree.put("doc1", body("k", "v1")).unwrap();
        assert!(tree.purge("doc1").unwrap());
        assert!(tree.get("doc1").unwrap().is_none());
        assert!(!tree.purge("doc1").unwrap());
    }

    #[test]
    fn expired_documents_read_as_absent() {
        let tree = InMemoryTree::new("s|c");
        tree.put("doc1", body("k", "v1")).unwrap();
        tree.set_expiration("doc1", 1).unwrap();

        assert!(tree.get("doc1").unwrap().is_none());
        assert!(!tree.contains("doc1").unwrap());
        assert_eq!(tree.count().unwrap(), 0);
    }

    #[test]
    fn expiration_defaults_to_never() {
        let tree = InMemoryTree::new("s|c");
        tree.put("doc1", body("k", "v1")).unwrap();
        assert_eq!(tree.get_expiration("doc1").unwrap(), 0);
        assert_eq!(tree.get_expiration("missing").unwrap(), 0);
        assert!(!tree.set_expiration("missing", 100).unwrap());
    }

    #[test]
    fn index_build_and_drop_are_idempotent() {
        let tree = InMemoryTree::new("s|c");
        let descriptor = IndexDescriptor::new(
            "by_name",
            IndexConfig::Value(ValueIndexConfig::new(QueryLanguage::N1ql, "name")),
        );
        tree.build_index(&descriptor).unwrap();
        tree.build_index(&descriptor).unwrap();
        tree.drop_index("by_name").unwrap();
        tree.drop_index("by_name").unwrap();
    }
}
