use crate::common::{DocumentBody, Value};
use crate::store::Revision;

/// An identified, revisioned structured value stored in a collection.
///
/// A `Document` is an owned, editable snapshot. The revision marker records
/// which stored revision this snapshot was loaded from (or produced by the
/// last successful save); the mutation engine uses it for optimistic
/// concurrency and updates it on every applied write. A freshly constructed
/// document carries no revision.
///
/// # Examples
///
/// ```rust,ignore
/// let mut doc = Document::new("user::alice");
/// doc.put("name", "Alice");
/// doc.put("age", 30i64);
/// collection.save(&mut doc)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: String,
    body: DocumentBody,
    revision: Option<Revision>,
}

impl Document {
    /// Creates a new, empty document with the given ID.
    pub fn new(id: &str) -> Self {
        Document {
            id: id.to_string(),
            body: DocumentBody::new(),
            revision: None,
        }
    }

    pub(crate) fn from_stored(id: &str, body: DocumentBody, revision: Revision) -> Self {
        Document {
            id: id.to_string(),
            body,
            revision: Some(revision),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets a field, replacing any previous value.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.body.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn body(&self) -> &DocumentBody {
        &self.body
    }

    /// Replaces the whole body, keeping the ID and revision marker.
    pub fn set_body(&mut self, body: DocumentBody) {
        self.body = body;
    }

    /// The stored revision this snapshot corresponds to, if it was loaded
    /// or saved. Revisions compare only by `is_newer_than`.
    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: Revision) {
        self.revision = Some(revision);
    }

    pub(crate) fn align_revision(&mut self, revision: Option<Revision>) {
        self.revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_is_empty_and_unrevisioned() {
        let doc = Document::new("doc1");
        assert_eq!(doc.id(), "doc1");
        assert!(doc.is_empty());
        assert!(doc.revision().is_none());
    }

    #[test]
    fn put_get_remove_fields() {
        let mut doc = Document::new("doc1");
        doc.put("name", "Alice").put("age", 30i64);

        assert_eq!(doc.get("name"), Some(&Value::from("Alice")));
        assert_eq!(doc.get("age"), Some(&Value::from(30i64)));
        assert_eq!(doc.len(), 2);

        assert_eq!(doc.remove("age"), Some(Value::from(30i64)));
        assert!(!doc.contains_key("age"));
    }

    #[test]
    fn put_replaces_existing_field() {
        let mut doc = Document::new("doc1");
        doc.put("name", "Alice");
        doc.put("name", "Bob");
        assert_eq!(doc.get("name"), Some(&Value::from("Bob")));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn body_preserves_insertion_order() {
        let mut doc = Document::new("doc1");
        doc.put("z", 1i64).put("a", 2i64).put("m", 3i64);
        let keys: Vec<&str> = doc.body().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn clone_is_an_independent_copy() {
        let mut original = Document::new("doc1");
        original.put("name", "Alice");
        let mut copy = original.clone();
        copy.put("name", "Bob");

        assert_eq!(original.get("name"), Some(&Value::from("Alice")));
        assert_eq!(copy.get("name"), Some(&Value::from("Bob")));
    }
}
