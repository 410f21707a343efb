//! Schema versioning and additive-only migrations.
//!
//! Migrations bring a persisted store up to the current schema version.
//! A [`MigrationContext`] can only create collections and indexes; there
//! is deliberately no drop operation, so a version bump can never lose
//! existing data.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Version number for the store schema.
pub type SchemaVersion = u64;

/// The schema version this build of the crate expects.
pub const SCHEMA_VERSION: SchemaVersion = 3;

/// Name of the records collection.
pub const RECORDS: &str = "records";

/// Name of the sync-queue collection.
pub const PENDING_OPERATIONS: &str = "pending_operations";

/// Declared shape of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Names of the lookup indexes on this collection.
    pub indexes: Vec<String>,
}

/// The persisted schema catalog: version plus declared collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SchemaCatalog {
    /// Schema version the persisted data was last written at.
    pub version: SchemaVersion,
    /// Declared collections, in creation order.
    pub collections: Vec<CollectionSpec>,
}

impl SchemaCatalog {
    /// Looks up a collection by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Returns true if the named index exists on the named collection.
    #[must_use]
    pub fn has_index(&self, collection: &str, index: &str) -> bool {
        self.collection(collection)
            .is_some_and(|c| c.indexes.iter().any(|i| i == index))
    }
}

/// Context passed to migration functions.
///
/// Only additive operations are exposed: existing collections and
/// indexes cannot be dropped or rewritten.
#[derive(Debug)]
pub struct MigrationContext<'a> {
    catalog: &'a mut SchemaCatalog,
}

impl<'a> MigrationContext<'a> {
    fn new(catalog: &'a mut SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Creates a collection if it does not already exist.
    pub fn create_collection(&mut self, name: &str) {
        if self.catalog.collection(name).is_none() {
            self.catalog.collections.push(CollectionSpec {
                name: name.to_string(),
                indexes: Vec::new(),
            });
        }
    }

    /// Creates an index on an existing collection.
    ///
    /// # Errors
    ///
    /// Returns `MigrationFailed` if the collection does not exist.
    pub fn create_index(&mut self, collection: &str, index: &str) -> StoreResult<()> {
        let spec = self
            .catalog
            .collections
            .iter_mut()
            .find(|c| c.name == collection)
            .ok_or_else(|| {
                StoreError::migration_failed(format!(
                    "cannot index missing collection {collection}"
                ))
            })?;

        if !spec.indexes.iter().any(|i| i == index) {
            spec.indexes.push(index.to_string());
        }
        Ok(())
    }
}

/// Trait for defining migrations.
pub trait Migration: Send + Sync {
    /// Returns the version number for this migration.
    ///
    /// Versions must be unique and sequential starting from 1.
    fn version(&self) -> SchemaVersion;

    /// Returns the name of this migration.
    fn name(&self) -> &str;

    /// Applies the migration.
    fn up(&self, ctx: &mut MigrationContext<'_>) -> StoreResult<()>;
}

/// v1: the records collection with its timestamp index.
struct CreateRecords;

impl Migration for CreateRecords {
    fn version(&self) -> SchemaVersion {
        1
    }

    fn name(&self) -> &str {
        "create_records"
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> StoreResult<()> {
        ctx.create_collection(RECORDS);
        ctx.create_index(RECORDS, "timestamp")
    }
}

/// v2: the sync-queue collection with its kind and enqueue-time indexes.
struct CreateSyncQueue;

impl Migration for CreateSyncQueue {
    fn version(&self) -> SchemaVersion {
        2
    }

    fn name(&self) -> &str {
        "create_sync_queue"
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> StoreResult<()> {
        ctx.create_collection(PENDING_OPERATIONS);
        ctx.create_index(PENDING_OPERATIONS, "kind")?;
        ctx.create_index(PENDING_OPERATIONS, "enqueued_at")
    }
}

/// v3: the synced-flag index on records, for sync-status lookups.
struct AddSyncedIndex;

impl Migration for AddSyncedIndex {
    fn version(&self) -> SchemaVersion {
        3
    }

    fn name(&self) -> &str {
        "add_synced_index"
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> StoreResult<()> {
        ctx.create_index(RECORDS, "synced")
    }
}

/// All known migrations, in version order.
fn migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(CreateRecords),
        Box::new(CreateSyncQueue),
        Box::new(AddSyncedIndex),
    ]
}

/// Runs every migration newer than the catalog's current version.
///
/// Returns the number of migrations applied. Re-running at the current
/// version is a no-op.
pub(crate) fn run_pending(catalog: &mut SchemaCatalog) -> StoreResult<u64> {
    let mut applied = 0u64;

    for migration in migrations() {
        if migration.version() <= catalog.version {
            continue;
        }

        let mut ctx = MigrationContext::new(catalog);
        migration.up(&mut ctx)?;
        catalog.version = migration.version();
        applied += 1;

        info!(
            version = migration.version(),
            name = migration.name(),
            "applied schema migration"
        );
    }

    Ok(applied)
}
