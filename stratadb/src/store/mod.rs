mod engine;
pub mod memory;

pub use engine::{
    DocTree, DocTreeProvider, ReplaceOutcome, Revision, StorageEngine, StorageEngineProvider,
    StoredDocument,
};
