use crate::collection::registry::CollectionRegistry;
use crate::collection::Collection;
use crate::errors::StrataResult;
use std::sync::Arc;

/// A named grouping of collections.
///
/// Scopes are derived, not stored: a scope exists exactly while at least
/// one collection lives in it, with the default scope as the permanent
/// exception. A `Scope` handle is therefore just a name bound to the
/// database's registry; it never goes stale by itself, and its listings
/// always reflect the registry's current state.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    name: String,
    registry: CollectionRegistry,
}

impl Scope {
    pub(crate) fn new(name: &str, registry: CollectionRegistry) -> Self {
        Scope {
            inner: Arc::new(ScopeInner {
                name: name.to_string(),
                registry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Names of the collections currently in this scope, in creation order.
    pub fn collection_names(&self) -> StrataResult<Vec<String>> {
        self.inner.registry.collection_names(&self.inner.name)
    }

    /// Looks up a collection in this scope. Absence is not an error.
    pub fn collection(&self, name: &str) -> StrataResult<Option<Collection>> {
        self.inner.registry.get_collection(name, &self.inner.name)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("name", &self.inner.name).finish()
    }
}
