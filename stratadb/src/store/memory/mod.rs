mod engine;
mod tree;

pub use engine::InMemoryEngine;
pub use tree::InMemoryTree;
