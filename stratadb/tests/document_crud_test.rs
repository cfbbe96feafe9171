use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stratadb::errors::ErrorKind;
use stratadb::index::{FullTextIndexConfig, QueryLanguage, ValueIndexConfig};
use stratadb::{
    CollectionChange, ConcurrencyControl, Database, Document, DocumentChange, StrataResult, Value,
};

#[ctor::ctor]
fn init() {
    colog::init();
}

fn run_test<T>(test: T)
where
    T: Fn(Database) -> StrataResult<()>,
{
    let db = Database::in_memory().expect("failed to open database");
    let result = test(db.clone());
    let _ = db.close();
    result.expect("test failed");
}

fn wait_until<F: Fn() -> bool>(check: F) {
    awaitility::at_most(Duration::from_millis(1000)).until(check);
}

#[test]
fn save_get_delete_roundtrip() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;

        let mut doc = Document::new("user::alice");
        doc.put("name", "Alice").put("age", 30i64);
        collection.save(&mut doc)?;
        assert!(doc.revision().is_some());
        assert_eq!(collection.count()?, 1);

        let loaded = collection.get("user::alice")?.expect("document missing");
        assert_eq!(loaded.get("name"), Some(&Value::from("Alice")));
        assert_eq!(loaded.get("age"), Some(&Value::from(30i64)));
        assert_eq!(loaded.revision(), doc.revision());

        assert!(collection.delete(&doc)?);
        assert!(collection.get("user::alice")?.is_none());
        assert_eq!(collection.count()?, 0);
        Ok(())
    })
}

#[test]
fn documents_are_isolated_per_collection() {
    run_test(|db| {
        let col_a = db.create_collection("colA", "scopeA")?;
        let col_b = db.create_collection("colB", "scopeA")?;

        let mut doc = Document::new("doc1");
        doc.put("v", "a");
        col_a.save(&mut doc)?;

        assert!(col_a.get("doc1")?.is_some());
        assert!(col_b.get("doc1")?.is_none());
        assert_eq!(col_b.count()?, 0);
        Ok(())
    })
}

#[test]
fn fail_on_conflict_save_honors_revisions() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;

        let mut doc = Document::new("doc1");
        doc.put("v", "first");
        collection.save(&mut doc)?;

        // a second client updates the same document
        let mut other = collection.get_mutable("doc1")?.expect("missing");
        other.put("v", "other");
        assert!(collection.save_with_concurrency_control(&mut other, ConcurrencyControl::FailOnConflict)?);

        // the stale handle loses under fail-on-conflict...
        doc.put("v", "stale");
        assert!(!collection.save_with_concurrency_control(&mut doc, ConcurrencyControl::FailOnConflict)?);

        // ...and wins under last-write-wins
        assert!(collection.save_with_concurrency_control(&mut doc, ConcurrencyControl::LastWriteWins)?);
        let loaded = collection.get("doc1")?.expect("missing");
        assert_eq!(loaded.get("v"), Some(&Value::from("stale")));
        Ok(())
    })
}

#[test]
fn conflict_handler_merges_concurrent_edits() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;

        let mut doc = Document::new("doc1");
        doc.put("likes", 1i64);
        collection.save(&mut doc)?;

        let mut stale = collection.get_mutable("doc1")?.expect("missing");

        // concurrent writer bumps the counter
        let mut other = collection.get_mutable("doc1")?.expect("missing");
        other.put("likes", 2i64);
        collection.save(&mut other)?;

        // merge: re-apply our increment on top of whatever is stored
        stale.put("likes", 2i64);
        let applied = collection.save_with_conflict_handler(&mut stale, |proposed, current| {
            let stored = current
                .and_then(|c| c.get("likes").and_then(|v| v.as_i64()))
                .unwrap_or(0);
            proposed.put("likes", stored + 1);
            true
        })?;

        assert!(applied);
        let loaded = collection.get("doc1")?.expect("missing");
        assert_eq!(loaded.get("likes"), Some(&Value::from(3i64)));
        Ok(())
    })
}

#[test]
fn delete_respects_concurrency_control() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;

        let mut doc = Document::new("doc1");
        doc.put("v", "first");
        collection.save(&mut doc)?;
        let stale = doc.clone();

        doc.put("v", "second");
        collection.save(&mut doc)?;

        assert!(!collection.delete_with_concurrency_control(&stale, ConcurrencyControl::FailOnConflict)?);
        assert!(collection.delete_with_concurrency_control(&doc, ConcurrencyControl::FailOnConflict)?);
        assert!(collection.get("doc1")?.is_none());
        Ok(())
    })
}

#[test]
fn purge_forgets_a_document_entirely() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;

        let mut doc = Document::new("doc1");
        doc.put("v", "x");
        collection.save(&mut doc)?;

        assert!(collection.purge_by_id("doc1")?);
        assert!(collection.get("doc1")?.is_none());
        assert!(!collection.purge_by_id("doc1")?);

        // a fresh save after purge starts a new history
        let mut again = Document::new("doc1");
        again.put("v", "y");
        collection.save(&mut again)?;
        assert!(collection.get("doc1")?.is_some());
        Ok(())
    })
}

#[test]
fn expiration_hides_documents_from_reads() {
    run_test(|db| {
        let collection = db.create_collection("sessions", "auth")?;

        let mut doc = Document::new("session::1");
        doc.put("token", "abc");
        collection.save(&mut doc)?;

        assert_eq!(collection.get_expiration("session::1")?, 0);

        // already in the past
        assert!(collection.set_expiration("session::1", 1)?);
        assert!(collection.get("session::1")?.is_none());
        assert_eq!(collection.count()?, 0);

        let err = collection.set_expiration("session::1", -1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidParameter);

        assert!(!collection.set_expiration("session::missing", 1000)?);
        Ok(())
    })
}

#[test]
fn index_lifecycle_on_a_collection() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;

        collection.create_value_index(
            "by_name",
            ValueIndexConfig::new(QueryLanguage::N1ql, "name"),
        )?;
        collection.create_full_text_index(
            "by_bio",
            FullTextIndexConfig::new(QueryLanguage::N1ql, "bio").with_language("en"),
        )?;

        assert_eq!(
            collection.list_index_names()?,
            vec!["by_name".to_string(), "by_bio".to_string()]
        );

        // same name, same config: nothing happens
        collection.create_value_index(
            "by_name",
            ValueIndexConfig::new(QueryLanguage::N1ql, "name"),
        )?;
        assert_eq!(
            collection.list_index_names()?,
            vec!["by_name".to_string(), "by_bio".to_string()]
        );

        collection.delete_index("by_name")?;
        collection.delete_index("never_existed")?;
        assert_eq!(collection.list_index_names()?, vec!["by_bio".to_string()]);
        Ok(())
    })
}

#[test]
fn collection_listener_receives_committed_writes() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let token = collection.add_change_listener(move |change: CollectionChange| {
            assert_eq!(change.scope_name, "crm");
            assert_eq!(change.collection_name, "users");
            sink.lock().unwrap().extend(change.doc_ids);
            Ok(())
        })?;

        let mut doc = Document::new("doc1");
        doc.put("v", "x");
        collection.save(&mut doc)?;
        collection.delete(&doc)?;

        wait_until(|| seen.lock().unwrap().len() == 2);
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec!["doc1".to_string(), "doc1".to_string()]
        );

        collection.remove_listener(token);
        let mut other = Document::new("doc2");
        other.put("v", "y");
        collection.save(&mut other)?;
        assert_eq!(seen.lock().unwrap().len(), 2);
        Ok(())
    })
}

#[test]
fn document_listener_is_scoped_to_one_id() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let _token =
            collection.add_document_change_listener("doc1", move |change: DocumentChange| {
                assert_eq!(change.doc_id, "doc1");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })?;

        let mut doc1 = Document::new("doc1");
        doc1.put("v", "a");
        collection.save(&mut doc1)?;

        let mut doc2 = Document::new("doc2");
        doc2.put("v", "b");
        collection.save(&mut doc2)?;

        collection.purge_by_id("doc1")?;

        wait_until(|| hits.load(Ordering::SeqCst) == 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        Ok(())
    })
}

#[test]
fn failing_listener_never_fails_the_write() {
    run_test(|db| {
        let collection = db.create_collection("users", "crm")?;
        let _token = collection.add_change_listener(|_change: CollectionChange| {
            Err(stratadb::StrataError::new(
                "listener broke",
                ErrorKind::EventError,
            ))
        })?;

        let mut doc = Document::new("doc1");
        doc.put("v", "x");
        collection.save(&mut doc)?;
        assert!(collection.get("doc1")?.is_some());
        Ok(())
    })
}

#[test]
fn writes_through_one_handle_notify_listeners_on_another() {
    run_test(|db| {
        let handle_a = db.create_collection("users", "crm")?;
        let handle_b = db.collection("users", "crm")?.expect("missing");
        assert_eq!(handle_a, handle_b);

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _token = handle_a.add_change_listener(move |_change: CollectionChange| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })?;

        let mut doc = Document::new("doc1");
        doc.put("v", "x");
        handle_b.save(&mut doc)?;

        wait_until(|| hits.load(Ordering::SeqCst) == 1);
        Ok(())
    })
}
