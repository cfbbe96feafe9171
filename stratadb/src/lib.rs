//! # StrataDB - Embedded Scoped Document Store
//!
//! StrataDB is a lightweight embedded document store written in Rust. It
//! organizes documents into named collections grouped under named scopes,
//! with optimistic concurrency for writes, index management, and change
//! notifications.
//!
//! ## Key Features
//!
//! - **Embedded**: No separate server process required
//! - **Scoped Collections**: Two-level `scope.collection` organization with
//!   validated names and an always-present default collection
//! - **Optimistic Concurrency**: Last-write-wins, fail-on-conflict, and
//!   merge-handler save policies over opaque revision markers
//! - **Tombstoned Deletes**: Deletion keeps revision history; purge removes
//!   every trace
//! - **Expiration**: Per-document expiration timestamps
//! - **Indexes**: Value and full-text index configurations per collection
//! - **Change Notifications**: Whole-collection and per-document listeners
//! - **Pluggable Storage**: In-memory engine included, engine trait for
//!   other backends
//! - **Clean API**: PIMPL pattern provides stable, encapsulated interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stratadb::{Database, Document};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open an in-memory database
//! let db = Database::in_memory()?;
//!
//! // Create a collection in a scope
//! let users = db.create_collection("users", "crm")?;
//!
//! // Create and save a document
//! let mut doc = Document::new("user::alice");
//! doc.put("name", "Alice");
//! doc.put("age", 30i64);
//! users.save(&mut doc)?;
//!
//! // Read it back
//! let loaded = users.get("user::alice")?;
//!
//! // Close the database; every collection handle becomes invalid
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Pattern
//!
//! StrataDB uses the **PIMPL (Pointer To IMPLementation)** design pattern:
//! `Database` and `Collection` are cheap cloneable handles over shared
//! inner state behind an `Arc`. Handles over the same live collection
//! record compare equal, share documents and listener registries, and are
//! all invalidated together when the record's lifecycle ends.
//!
//! ## Module Organization
//!
//! - [`collection`] - Collections, scopes, documents, and change listeners
//! - [`common`] - Common types, constants, and utilities
//! - [`database`] - Core database interface
//! - [`errors`] - Error types and result definitions
//! - [`index`] - Index configuration types
//! - [`store`] - Storage engine abstractions and the in-memory engine

pub mod collection;
pub mod common;
pub mod database;
pub mod errors;
pub mod index;
pub mod store;

pub use collection::{
    Collection, CollectionChange, ConcurrencyControl, Document, DocumentChange, ListenerToken,
    Scope,
};
pub use common::{Value, DEFAULT_COLLECTION_NAME, DEFAULT_SCOPE_NAME, MAX_NAME_LENGTH};
pub use database::Database;
pub use errors::{ErrorKind, StrataError, StrataResult};
