//! The sync engine: queue replay against the remote authority.

use crate::connectivity::ConnectivitySignal;
use crate::error::SyncResult;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use storyhub_api::{HttpClient, StoryClient, StoryDraft};
use storyhub_store::{
    NewRecord, OperationId, OperationKind, PhotoRef, RecordId, RecordRepository,
};
use tracing::{debug, info, warn};

/// Replay state of one queued item within a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Not yet attempted.
    Pending,
    /// Submission in progress.
    InFlight,
    /// The authority accepted the item; it will be removed from the queue.
    Acknowledged,
    /// Submission failed; the item stays queued for the next drain.
    Failed,
}

/// Final outcome of one queued item after a drain.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// The queued operation.
    pub operation: OperationId,
    /// Where the item ended up. Always `Acknowledged` or `Failed`.
    pub state: ItemState,
    /// Failure description for `Failed` items.
    pub error: Option<String>,
}

/// Result of one drain call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    /// False only when the drain loop never ran (offline, or another
    /// drain in progress). Per-item failures do not clear this flag.
    pub success: bool,
    /// User-facing summary.
    pub message: String,
    /// Items the authority acknowledged.
    pub synced: usize,
    /// Items that failed and remain queued.
    pub failed: usize,
    /// Per-item outcomes, in queue order.
    pub outcomes: Vec<ItemOutcome>,
}

impl DrainReport {
    fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            synced: 0,
            failed: 0,
            outcomes: Vec::new(),
        }
    }
}

/// Running totals across drains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStats {
    /// Drains whose loop ran to completion.
    pub drains_completed: u64,
    /// Drains skipped while offline or already draining.
    pub drains_skipped: u64,
    /// Total acknowledged items.
    pub items_synced: u64,
    /// Total failed submissions.
    pub items_failed: u64,
    /// Message of the most recent drain.
    pub last_message: Option<String>,
}

/// Replays the durable mutation queue against the remote authority.
///
/// Replay is at-least-once: an item is removed from the queue only after
/// the authority acknowledges it, so a crash mid-drain re-submits rather
/// than loses.
pub struct SyncEngine<C: HttpClient> {
    repository: RecordRepository,
    client: Arc<StoryClient<C>>,
    connectivity: Arc<ConnectivitySignal>,
    stats: RwLock<SyncStats>,
    draining: AtomicBool,
}

impl<C: HttpClient + 'static> SyncEngine<C> {
    /// Creates an engine over the given repository, client, and signal.
    pub fn new(
        repository: RecordRepository,
        client: Arc<StoryClient<C>>,
        connectivity: Arc<ConnectivitySignal>,
    ) -> Self {
        Self {
            repository,
            client,
            connectivity,
            stats: RwLock::new(SyncStats::default()),
            draining: AtomicBool::new(false),
        }
    }

    /// Returns the connectivity signal this engine watches.
    pub fn connectivity(&self) -> &Arc<ConnectivitySignal> {
        &self.connectivity
    }

    /// Returns a copy of the running totals.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Registers this engine to drain on every offline-to-online edge.
    ///
    /// Holds only a weak reference, so dropping the last `Arc` to the
    /// engine disarms the trigger.
    pub fn attach(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.connectivity.on_online(move || {
            if let Some(engine) = weak.upgrade() {
                if let Err(err) = engine.drain() {
                    warn!(error = %err, "triggered drain failed");
                }
            }
        });
    }

    /// Drains the pending queue.
    ///
    /// Offline, or with another drain in progress, this is a no-op
    /// reporting `success: false` without touching the queue. Otherwise
    /// the queue is snapshotted and each item replayed in enqueue order;
    /// a failed item is logged and stays queued, and never aborts the
    /// batch. Acknowledged operations are removed and their records
    /// flipped to `synced = true` in one store transaction after the
    /// loop.
    ///
    /// # Errors
    ///
    /// Only a store failure while resolving acknowledgements is an
    /// error; per-item submission failures are part of the report.
    pub fn drain(&self) -> SyncResult<DrainReport> {
        if !self.connectivity.is_online() {
            debug!("drain skipped: offline");
            return Ok(self.skip("Device is offline"));
        }
        if self.draining.swap(true, Ordering::SeqCst) {
            debug!("drain skipped: already in progress");
            return Ok(self.skip("Sync already in progress"));
        }
        let report = self.drain_inner();
        self.draining.store(false, Ordering::SeqCst);
        report
    }

    fn skip(&self, message: &str) -> DrainReport {
        let report = DrainReport::skipped(message);
        let mut stats = self.stats.write();
        stats.drains_skipped += 1;
        stats.last_message = Some(report.message.clone());
        report
    }

    fn drain_inner(&self) -> SyncResult<DrainReport> {
        let queue = self.repository.pending_operations();
        debug!(pending = queue.len(), "drain started");

        let mut outcomes = Vec::with_capacity(queue.len());
        let mut acked_ops: Vec<OperationId> = Vec::new();
        let mut synced_records: Vec<RecordId> = Vec::new();

        for item in &queue {
            match &item.kind {
                OperationKind::CreateRecord { record_id, draft } => {
                    match self.client.create_story(&to_story_draft(draft)) {
                        Ok(_) => {
                            acked_ops.push(item.id);
                            synced_records.push(*record_id);
                            outcomes.push(ItemOutcome {
                                operation: item.id,
                                state: ItemState::Acknowledged,
                                error: None,
                            });
                        }
                        Err(err) => {
                            warn!(operation = %item.id, record = %record_id, error = %err,
                                "submission failed, item stays queued");
                            outcomes.push(ItemOutcome {
                                operation: item.id,
                                state: ItemState::Failed,
                                error: Some(err.to_string()),
                            });
                        }
                    }
                }
                // No remote delete endpoint is modeled; the deletion
                // already happened locally, so the item is satisfied.
                OperationKind::DeleteRecord { record_id } => {
                    debug!(operation = %item.id, record = %record_id,
                        "delete acknowledged locally");
                    acked_ops.push(item.id);
                    outcomes.push(ItemOutcome {
                        operation: item.id,
                        state: ItemState::Acknowledged,
                        error: None,
                    });
                }
            }
        }

        self.repository.acknowledge(&acked_ops, &synced_records)?;

        let synced = acked_ops.len();
        let failed = outcomes.len() - synced;
        let report = DrainReport {
            success: true,
            message: format!("Synced {synced} items"),
            synced,
            failed,
            outcomes,
        };
        info!(synced, failed, "drain finished");

        let mut stats = self.stats.write();
        stats.drains_completed += 1;
        stats.items_synced += synced as u64;
        stats.items_failed += failed as u64;
        stats.last_message = Some(report.message.clone());
        Ok(report)
    }
}

impl<C: HttpClient> std::fmt::Debug for SyncEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("online", &self.connectivity.is_online())
            .field("draining", &self.draining.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Maps a stored draft onto the authority's submission shape. Only
/// locally captured photo bytes are re-uploaded; a URL photo already
/// lives on the authority.
fn to_story_draft(draft: &NewRecord) -> StoryDraft {
    let mut story = StoryDraft::new(&draft.description);
    if let PhotoRef::Bytes {
        file_name,
        content_type,
        data,
    } = &draft.photo
    {
        story = story.with_photo(file_name.clone(), content_type.clone(), data.clone());
    }
    if let Some(location) = draft.location {
        story = story.with_location(location.lat, location.lon);
    }
    story
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyhub_api::{ApiConfig, HttpResponse, MockHttpClient};
    use storyhub_store::{RecordQuery, Store};

    fn engine(online: bool) -> (Arc<SyncEngine<Arc<MockHttpClient>>>, Arc<MockHttpClient>) {
        let repository = RecordRepository::new(Arc::new(Store::in_memory().unwrap()));
        let mock = Arc::new(MockHttpClient::new());
        let client = StoryClient::new(ApiConfig::new("https://api.test/v1"), Arc::clone(&mock));
        client.set_token("tok-1");
        let engine = Arc::new(SyncEngine::new(
            repository,
            Arc::new(client),
            Arc::new(ConnectivitySignal::new(online)),
        ));
        (engine, mock)
    }

    fn ok_status(mock: &MockHttpClient) {
        mock.push_response(HttpResponse::ok_json(r#"{"error":false,"message":"ok"}"#));
    }

    #[test]
    fn offline_drain_is_a_no_op() {
        let (engine, mock) = engine(false);
        engine
            .repository
            .save_offline(NewRecord::new("queued"))
            .unwrap();

        let report = engine.drain().unwrap();
        assert!(!report.success);
        assert_eq!(report.message, "Device is offline");
        assert_eq!(mock.request_count(), 0);
        assert_eq!(engine.repository.pending_count(), 1);
        assert_eq!(engine.stats().drains_skipped, 1);
    }

    #[test]
    fn drain_acknowledges_and_flips_synced() {
        let (engine, mock) = engine(true);
        let id = engine
            .repository
            .save_offline(NewRecord::new("Cokelat Dingin").with_location(-6.2, 106.8))
            .unwrap();
        ok_status(&mock);

        let report = engine.drain().unwrap();
        assert!(report.success);
        assert_eq!(report.message, "Synced 1 items");
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);

        assert!(!engine.repository.has_pending());
        assert!(engine.repository.get(id).unwrap().synced);

        let body = String::from_utf8_lossy(&mock.requests()[0].body).to_string();
        assert!(body.contains("Cokelat Dingin"));
        assert!(body.contains("-6.2"));
    }

    #[test]
    fn empty_drain_reports_zero() {
        let (engine, mock) = engine(true);

        let report = engine.drain().unwrap();
        assert!(report.success);
        assert_eq!(report.message, "Synced 0 items");
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn failed_item_stays_queued_and_does_not_abort_the_batch() {
        let (engine, mock) = engine(true);
        let first = engine
            .repository
            .save_offline(NewRecord::new("first"))
            .unwrap();
        let second = engine
            .repository
            .save_offline(NewRecord::new("second"))
            .unwrap();

        mock.push_failure("connection reset");
        ok_status(&mock);

        let report = engine.drain().unwrap();
        assert!(report.success);
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.message, "Synced 1 items");
        assert_eq!(report.outcomes[0].state, ItemState::Failed);
        assert!(report.outcomes[0].error.is_some());
        assert_eq!(report.outcomes[1].state, ItemState::Acknowledged);

        // The failed item waits for the next drain; its record is unsynced.
        assert_eq!(engine.repository.pending_count(), 1);
        assert!(!engine.repository.get(first).unwrap().synced);
        assert!(engine.repository.get(second).unwrap().synced);
    }

    #[test]
    fn delete_operations_are_acknowledged_without_network() {
        let (engine, mock) = engine(true);
        let id = engine
            .repository
            .save_offline(NewRecord::new("doomed"))
            .unwrap();
        engine.repository.delete(id).unwrap();
        // Queue now holds the orphaned CreateRecord and the DeleteRecord.
        ok_status(&mock);

        let report = engine.drain().unwrap();
        assert!(report.success);
        assert_eq!(report.synced, 2);
        assert!(!engine.repository.has_pending());
        // Only the CreateRecord reached the authority.
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn attach_drains_on_the_online_edge() {
        let (engine, mock) = engine(false);
        engine
            .repository
            .save_offline(NewRecord::new("queued"))
            .unwrap();
        ok_status(&mock);
        engine.attach();

        engine.connectivity().set_online(true);

        assert!(!engine.repository.has_pending());
        let offline = engine
            .repository
            .list(&RecordQuery::new().with_synced(false));
        assert!(offline.is_empty());
        assert_eq!(engine.stats().drains_completed, 1);
    }

    #[test]
    fn retry_after_failure_succeeds() {
        let (engine, mock) = engine(true);
        engine
            .repository
            .save_offline(NewRecord::new("flaky"))
            .unwrap();

        mock.push_failure("timeout");
        let first = engine.drain().unwrap();
        assert_eq!(first.synced, 0);
        assert_eq!(engine.repository.pending_count(), 1);

        ok_status(&mock);
        let second = engine.drain().unwrap();
        assert_eq!(second.message, "Synced 1 items");
        assert!(!engine.repository.has_pending());
    }
}
