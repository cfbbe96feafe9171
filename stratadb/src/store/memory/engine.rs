use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::store::memory::InMemoryTree;
use crate::store::{DocTree, StorageEngineProvider};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory storage engine.
///
/// Keeps every collection tree in a concurrent map. Used as the default
/// engine for `Database::in_memory()` and throughout the test suite.
pub struct InMemoryEngine {
    trees: DashMap<String, DocTree>,
    closed: AtomicBool,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        InMemoryEngine {
            trees: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> StrataResult<()> {
        if self.closed.load(Ordering::Acquire) {
            log::error!("In-memory storage engine is closed");
            return Err(StrataError::new(
                "Storage engine is closed",
                ErrorKind::NotOpen,
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngineProvider for InMemoryEngine {
    fn open_tree(&self, name: &str) -> StrataResult<DocTree> {
        self.check_open()?;
        let tree = self
            .trees
            .entry(name.to_string())
            .or_insert_with(|| DocTree::new(InMemoryTree::new(name)))
            .clone();
        Ok(tree)
    }

    fn remove_tree(&self, name: &str) -> StrataResult<()> {
        self.check_open()?;
        self.trees.remove(name);
        Ok(())
    }

    fn has_tree(&self, name: &str) -> StrataResult<bool> {
        self.check_open()?;
        Ok(self.trees.contains_key(name))
    }

    fn is_closed(&self) -> StrataResult<bool> {
        Ok(self.closed.load(Ordering::Acquire))
    }

    fn close(&self) -> StrataResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn drop_all(&self) -> StrataResult<()> {
        self.trees.clear();
        Ok(())
    }
}
