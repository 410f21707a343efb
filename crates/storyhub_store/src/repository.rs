//! Typed record operations layered on the store.
//!
//! The repository owns filtering, sorting, and search semantics over the
//! `records` collection, and the atomic record/queue pairing for writes
//! made while offline.

use crate::database::Store;
use crate::error::{StoreError, StoreResult};
use crate::record::{NewRecord, OperationId, OperationKind, PendingOperation, Record, RecordId};
use std::sync::Arc;

/// Which field to sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Sort by the store-assigned creation timestamp.
    Timestamp,
    /// Sort by display name, case-insensitive. Records without a name
    /// sort as the empty string.
    Name,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// A sort request: key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// Which field to sort by.
    pub key: SortKey,
    /// Sort direction.
    pub order: SortOrder,
}

/// A query over the records collection.
///
/// Filters, search, and sort apply in that order. All parts are
/// optional; the default query returns everything in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    /// Keep only records with this sync flag.
    pub synced: Option<bool>,
    /// Keep only records with this origin flag.
    pub is_offline: Option<bool>,
    /// Keep only records created at or after this timestamp (ms).
    pub since: Option<u64>,
    /// Keep only records created at or before this timestamp (ms).
    pub until: Option<u64>,
    /// Case-insensitive substring match over description and name.
    pub search: Option<String>,
    /// Sort request. Without one, original retrieval order is preserved.
    pub sort: Option<SortSpec>,
}

impl RecordQuery {
    /// Creates an empty query matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters on the sync flag.
    #[must_use]
    pub fn with_synced(mut self, synced: bool) -> Self {
        self.synced = Some(synced);
        self
    }

    /// Filters on the origin flag.
    #[must_use]
    pub fn with_is_offline(mut self, is_offline: bool) -> Self {
        self.is_offline = Some(is_offline);
        self
    }

    /// Restricts to a creation-time range. Either bound may be `None`.
    #[must_use]
    pub fn with_range(mut self, since: Option<u64>, until: Option<u64>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    /// Adds a free-text search term.
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Adds a sort request.
    #[must_use]
    pub fn with_sort(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = Some(SortSpec { key, order });
        self
    }

    fn matches(&self, record: &Record) -> bool {
        if let Some(synced) = self.synced {
            if record.synced != synced {
                return false;
            }
        }
        if let Some(is_offline) = self.is_offline {
            if record.is_offline != is_offline {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at > until {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_description = record.description.to_lowercase().contains(&term);
            let in_name = record
                .name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&term));
            if !in_description && !in_name {
                return false;
            }
        }
        true
    }

    fn apply_sort(&self, records: &mut [Record]) {
        let Some(spec) = self.sort else {
            return;
        };

        // Stable sort: ties keep their original retrieval order.
        match spec.key {
            SortKey::Timestamp => records.sort_by(|a, b| match spec.order {
                SortOrder::Ascending => a.created_at.cmp(&b.created_at),
                SortOrder::Descending => b.created_at.cmp(&a.created_at),
            }),
            SortKey::Name => records.sort_by(|a, b| {
                let name_a = a.name.as_deref().unwrap_or("").to_lowercase();
                let name_b = b.name.as_deref().unwrap_or("").to_lowercase();
                match spec.order {
                    SortOrder::Ascending => name_a.cmp(&name_b),
                    SortOrder::Descending => name_b.cmp(&name_a),
                }
            }),
        }
    }
}

/// Typed operations over records and the sync queue.
///
/// Cheap to clone; clones share one store.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    store: Arc<Store>,
}

impl RecordRepository {
    /// Creates a repository over the given store.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Persists a record already acknowledged by the remote authority.
    ///
    /// The record is marked `synced = true, is_offline = false` and no
    /// queue entry is written. Returns the assigned ID.
    pub fn save_synced(&self, draft: NewRecord) -> StoreResult<RecordId> {
        self.store
            .write(|txn| Ok(txn.insert_record(draft, true, false)))
    }

    /// Persists a record created while offline.
    ///
    /// The record (`synced = false, is_offline = true`) and its
    /// `CreateRecord` queue entry are written in one transaction, so a
    /// crash cannot leave one without the other. Returns the assigned ID.
    pub fn save_offline(&self, draft: NewRecord) -> StoreResult<RecordId> {
        self.store.write(|txn| {
            let id = txn.insert_record(draft.clone(), false, true);
            txn.enqueue_operation(OperationKind::CreateRecord {
                record_id: id,
                draft,
            });
            Ok(id)
        })
    }

    /// Looks up one record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the ID does not exist.
    pub fn get(&self, id: RecordId) -> StoreResult<Record> {
        self.store
            .read(|v| v.record(id).cloned())
            .ok_or(StoreError::NotFound { id })
    }

    /// Retrieves records matching a query.
    ///
    /// Filters, search, and sort apply in that order. An empty result is
    /// a valid, non-error outcome.
    pub fn list(&self, query: &RecordQuery) -> Vec<Record> {
        // Both index paths yield insertion order, so the unsorted result
        // is stable regardless of which one serves the base scan.
        let base = match query.synced {
            Some(flag) => self.store.read(|v| v.records_with_synced(flag)),
            None => self.store.read(|v| v.records_by_timestamp()),
        };

        let mut records: Vec<Record> = base.into_iter().filter(|r| query.matches(r)).collect();
        query.apply_sort(&mut records);
        records
    }

    /// Deletes a record.
    ///
    /// An unsynced record gets a `DeleteRecord` queue entry before
    /// removal, in the same transaction. Synced records are removed
    /// without queuing; no remote delete endpoint is modeled.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the ID does not exist.
    pub fn delete(&self, id: RecordId) -> StoreResult<()> {
        self.store.write(|txn| {
            let record = txn.record(id).ok_or(StoreError::NotFound { id })?;
            if !record.synced {
                txn.enqueue_operation(OperationKind::DeleteRecord { record_id: id });
            }
            txn.remove_record(id);
            Ok(())
        })
    }

    /// Returns the full sync queue in enqueue order.
    pub fn pending_operations(&self) -> Vec<PendingOperation> {
        self.store.read(|v| v.operations())
    }

    /// Returns the number of queued operations.
    pub fn pending_count(&self) -> usize {
        self.store.read(|v| v.operation_count())
    }

    /// Returns true if any operation awaits acknowledgement.
    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Resolves a completed drain in one transaction: removes the
    /// acknowledged operations and flips `synced = true` on the records
    /// the authority accepted.
    ///
    /// Records deleted locally since their operation was enqueued are
    /// skipped silently.
    pub fn acknowledge(&self, operations: &[OperationId], records: &[RecordId]) -> StoreResult<()> {
        if operations.is_empty() && records.is_empty() {
            return Ok(());
        }
        self.store.write(|txn| {
            for op in operations {
                txn.remove_operation(*op);
            }
            for id in records {
                txn.set_record_synced(*id, true);
            }
            Ok(())
        })
    }

    /// Empties both collections.
    pub fn clear_all(&self) -> StoreResult<()> {
        self.store.write(|txn| {
            txn.clear_all();
            Ok(())
        })
    }
}
