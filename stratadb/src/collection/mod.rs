mod collection;
mod document;
mod event;
pub(crate) mod registry;
mod scope;

pub use collection::{Collection, ConcurrencyControl};
pub use document::Document;
pub use event::{
    CollectionChange, CollectionChangeCallback, CollectionChangeListener, DocumentChange,
    DocumentChangeCallback, DocumentChangeListener, ListenerToken,
};
pub(crate) use event::ListenerRegistry;
pub use scope::Scope;
