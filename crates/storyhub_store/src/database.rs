//! The durable store: serialized transactions over two collections.
//!
//! All mutations go through [`Store::write`], which runs the caller's
//! closure against a working copy of the state, persists the encoded
//! snapshot through the backend, and only then publishes the result.
//! A closure error or a persist failure leaves the store untouched, so
//! multi-collection writes (record + queue entry) are atomic.

use crate::backend::StorageBackend;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::record::{
    NewRecord, OperationId, OperationKind, OperationTag, PendingOperation, Record, RecordId,
};
use crate::schema::{self, SchemaCatalog, SchemaVersion};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecordCollection {
    next_id: u64,
    rows: BTreeMap<RecordId, Record>,
    #[serde(skip)]
    by_timestamp: BTreeMap<(u64, RecordId), ()>,
    #[serde(skip)]
    by_synced: BTreeMap<(bool, RecordId), ()>,
}

impl RecordCollection {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        RecordId::new(self.next_id)
    }

    fn insert(&mut self, record: Record) {
        self.by_timestamp.insert((record.created_at, record.id), ());
        self.by_synced.insert((record.synced, record.id), ());
        self.rows.insert(record.id, record);
    }

    fn get(&self, id: RecordId) -> Option<&Record> {
        self.rows.get(&id)
    }

    fn remove(&mut self, id: RecordId) -> Option<Record> {
        let record = self.rows.remove(&id)?;
        self.by_timestamp.remove(&(record.created_at, record.id));
        self.by_synced.remove(&(record.synced, record.id));
        Some(record)
    }

    fn set_synced(&mut self, id: RecordId, synced: bool) -> bool {
        let Some(record) = self.rows.get_mut(&id) else {
            return false;
        };
        if record.synced != synced {
            self.by_synced.remove(&(record.synced, id));
            self.by_synced.insert((synced, id), ());
            record.synced = synced;
        }
        true
    }

    fn rebuild_indexes(&mut self) {
        self.by_timestamp.clear();
        self.by_synced.clear();
        for record in self.rows.values() {
            self.by_timestamp.insert((record.created_at, record.id), ());
            self.by_synced.insert((record.synced, record.id), ());
        }
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.by_timestamp.clear();
        self.by_synced.clear();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OperationCollection {
    next_id: u64,
    rows: BTreeMap<OperationId, PendingOperation>,
    #[serde(skip)]
    by_tag: BTreeMap<(OperationTag, OperationId), ()>,
    #[serde(skip)]
    by_enqueued: BTreeMap<(u64, OperationId), ()>,
}

impl OperationCollection {
    fn allocate_id(&mut self) -> OperationId {
        self.next_id += 1;
        OperationId::new(self.next_id)
    }

    fn insert(&mut self, operation: PendingOperation) {
        self.by_tag.insert((operation.kind.tag(), operation.id), ());
        self.by_enqueued
            .insert((operation.enqueued_at, operation.id), ());
        self.rows.insert(operation.id, operation);
    }

    fn remove(&mut self, id: OperationId) -> Option<PendingOperation> {
        let operation = self.rows.remove(&id)?;
        self.by_tag.remove(&(operation.kind.tag(), operation.id));
        self.by_enqueued
            .remove(&(operation.enqueued_at, operation.id));
        Some(operation)
    }

    fn rebuild_indexes(&mut self) {
        self.by_tag.clear();
        self.by_enqueued.clear();
        for operation in self.rows.values() {
            self.by_tag.insert((operation.kind.tag(), operation.id), ());
            self.by_enqueued
                .insert((operation.enqueued_at, operation.id), ());
        }
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.by_tag.clear();
        self.by_enqueued.clear();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    catalog: SchemaCatalog,
    records: RecordCollection,
    operations: OperationCollection,
    last_timestamp: u64,
}

impl StoreState {
    fn rebuild_indexes(&mut self) {
        self.records.rebuild_indexes();
        self.operations.rebuild_indexes();
    }

    /// Assigns the next store timestamp: wall-clock milliseconds, bumped
    /// past the previous assignment so timestamps are strictly monotonic
    /// per store instance.
    fn next_timestamp(&mut self) -> u64 {
        let assigned = now_ms().max(self.last_timestamp + 1);
        self.last_timestamp = assigned;
        assigned
    }
}

fn encode(state: &StoreState) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(state, &mut buf).map_err(|e| StoreError::codec(e.to_string()))?;
    Ok(buf)
}

fn decode(bytes: &[u8]) -> StoreResult<StoreState> {
    ciborium::de::from_reader(bytes).map_err(|e| StoreError::invalid_format(e.to_string()))
}

/// The durable key-value store.
///
/// Owns the `records` and `pending_operations` collections exclusively;
/// no other component persists domain data. Callers are serialized onto
/// the store's internal transaction lock, so no two transactions observe
/// interleaved partial writes.
pub struct Store {
    backend: Box<dyn StorageBackend>,
    state: Mutex<StoreState>,
}

impl Store {
    /// Opens a store, running any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` when the platform denies persistent
    /// storage, `InvalidFormat` when an existing snapshot cannot be
    /// decoded, or `MigrationFailed` when a migration errors.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let backend = config.open_backend()?;

        let mut state = match backend.load()? {
            Some(bytes) => decode(&bytes)?,
            None => StoreState::default(),
        };

        let applied = schema::run_pending(&mut state.catalog)?;
        state.rebuild_indexes();

        if applied > 0 {
            backend.persist(&encode(&state)?)?;
        }

        debug!(
            version = state.catalog.version,
            records = state.records.rows.len(),
            pending = state.operations.rows.len(),
            "store opened"
        );

        Ok(Self {
            backend,
            state: Mutex::new(state),
        })
    }

    /// Opens an ephemeral in-memory store. Mostly useful for tests.
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(StoreConfig::in_memory())
    }

    /// Runs a read-only closure against a consistent view of the store.
    pub fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&StoreView<'_>) -> T,
    {
        let guard = self.state.lock();
        f(&StoreView { state: &guard })
    }

    /// Runs a closure inside one atomic transaction.
    ///
    /// The closure mutates a working copy. When it returns `Ok`, the new
    /// state is persisted through the backend and then published; on any
    /// error the store is left exactly as it was.
    pub fn write<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StoreTxn<'_>) -> StoreResult<T>,
    {
        let mut guard = self.state.lock();
        let mut working = guard.clone();

        let out = f(&mut StoreTxn {
            state: &mut working,
        })?;

        self.backend.persist(&encode(&working)?)?;
        *guard = working;
        Ok(out)
    }

    /// Returns the schema version of the opened store.
    pub fn schema_version(&self) -> SchemaVersion {
        self.state.lock().catalog.version
    }

    /// Returns a copy of the schema catalog.
    pub fn catalog(&self) -> SchemaCatalog {
        self.state.lock().catalog.clone()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Store")
            .field("schema_version", &state.catalog.version)
            .field("records", &state.records.rows.len())
            .field("pending_operations", &state.operations.rows.len())
            .finish_non_exhaustive()
    }
}

/// A consistent read-only view of the store.
pub struct StoreView<'a> {
    state: &'a StoreState,
}

impl StoreView<'_> {
    /// Looks up a record by ID.
    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.state.records.get(id)
    }

    /// Returns all records ordered by assigned timestamp.
    ///
    /// Timestamps are monotonic per store instance, so this is also the
    /// original insertion order.
    #[must_use]
    pub fn records_by_timestamp(&self) -> Vec<Record> {
        self.state
            .records
            .by_timestamp
            .keys()
            .filter_map(|(_, id)| self.state.records.get(*id).cloned())
            .collect()
    }

    /// Returns all records with the given sync flag, in insertion order.
    #[must_use]
    pub fn records_with_synced(&self, synced: bool) -> Vec<Record> {
        self.state
            .records
            .by_synced
            .range((synced, RecordId::new(0))..=(synced, RecordId::new(u64::MAX)))
            .filter_map(|((_, id), ())| self.state.records.get(*id).cloned())
            .collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.state.records.rows.len()
    }

    /// Looks up a pending operation by ID.
    #[must_use]
    pub fn operation(&self, id: OperationId) -> Option<&PendingOperation> {
        self.state.operations.rows.get(&id)
    }

    /// Returns the full queue in enqueue order.
    #[must_use]
    pub fn operations(&self) -> Vec<PendingOperation> {
        self.state
            .operations
            .by_enqueued
            .keys()
            .filter_map(|(_, id)| self.state.operations.rows.get(id).cloned())
            .collect()
    }

    /// Returns queued operations of one category, in enqueue order.
    #[must_use]
    pub fn operations_with_tag(&self, tag: OperationTag) -> Vec<PendingOperation> {
        self.state
            .operations
            .by_tag
            .range((tag, OperationId::new(0))..=(tag, OperationId::new(u64::MAX)))
            .filter_map(|((_, id), ())| self.state.operations.rows.get(id).cloned())
            .collect()
    }

    /// Returns the number of queued operations.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.state.operations.rows.len()
    }
}

/// A write transaction over both collections.
pub struct StoreTxn<'a> {
    state: &'a mut StoreState,
}

impl StoreTxn<'_> {
    /// Inserts a record, assigning its ID and creation timestamp.
    pub fn insert_record(&mut self, draft: NewRecord, synced: bool, is_offline: bool) -> RecordId {
        let id = self.state.records.allocate_id();
        let created_at = self.state.next_timestamp();

        self.state.records.insert(Record {
            id,
            name: draft.name,
            description: draft.description,
            photo: draft.photo,
            location: draft.location,
            created_at,
            synced,
            is_offline,
        });
        id
    }

    /// Looks up a record by ID.
    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.state.records.get(id)
    }

    /// Removes a record.
    pub fn remove_record(&mut self, id: RecordId) -> Option<Record> {
        self.state.records.remove(id)
    }

    /// Updates a record's sync flag. Returns false if the record is missing.
    pub fn set_record_synced(&mut self, id: RecordId, synced: bool) -> bool {
        self.state.records.set_synced(id, synced)
    }

    /// Appends an operation to the sync queue.
    pub fn enqueue_operation(&mut self, kind: OperationKind) -> OperationId {
        let id = self.state.operations.allocate_id();
        let enqueued_at = self.state.next_timestamp();

        self.state.operations.insert(PendingOperation {
            id,
            kind,
            enqueued_at,
        });
        id
    }

    /// Removes an operation from the queue.
    pub fn remove_operation(&mut self, id: OperationId) -> Option<PendingOperation> {
        self.state.operations.remove(id)
    }

    /// Returns the full queue in enqueue order.
    #[must_use]
    pub fn operations(&self) -> Vec<PendingOperation> {
        self.state
            .operations
            .by_enqueued
            .keys()
            .filter_map(|(_, id)| self.state.operations.rows.get(id).cloned())
            .collect()
    }

    /// Empties both collections. Schema and ID counters are preserved.
    pub fn clear_all(&mut self) {
        self.state.records.clear();
        self.state.operations.clear();
    }
}
