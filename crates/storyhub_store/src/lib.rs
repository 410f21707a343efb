//! # StoryHub Store
//!
//! Durable record store and sync queue for the StoryHub offline layer.
//!
//! This crate provides:
//! - Storage backend trait with in-memory and file implementations
//! - Additive-only schema migrations
//! - Serialized transactions spanning the record and queue collections
//! - Typed repository with filtering, search, and sorting
//!
//! ## Collections
//!
//! The store owns exactly two collections:
//! - `records` - domain entities, server-mirrored or offline-originated
//! - `pending_operations` - a write-ahead queue of mutations that the
//!   remote authority has not yet acknowledged
//!
//! ## Key Invariants
//!
//! - A record created offline has a matching `CreateRecord` queue entry
//!   until the remote authority acknowledges it; both are written in one
//!   transaction, and both are resolved in one transaction
//! - Schema migrations only add collections and indexes, never drop data
//! - Assigned timestamps are monotonic per store instance

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod database;
mod error;
mod record;
mod repository;
mod schema;

pub use backend::{FileBackend, InMemoryBackend, StorageBackend};
pub use config::StoreConfig;
pub use database::{Store, StoreTxn, StoreView};
pub use error::{StoreError, StoreResult};
pub use record::{
    GeoPoint, NewRecord, OperationId, OperationKind, OperationTag, PendingOperation, PhotoRef,
    Record, RecordId,
};
pub use repository::{RecordQuery, RecordRepository, SortKey, SortOrder, SortSpec};
pub use schema::{
    Migration, MigrationContext, SchemaCatalog, SchemaVersion, PENDING_OPERATIONS, RECORDS,
    SCHEMA_VERSION,
};
