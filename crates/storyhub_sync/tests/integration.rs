//! End-to-end tests wiring the store, the authority client, and the
//! sync engine together over mock transports.

use std::sync::Arc;
use storyhub_api::{ApiConfig, HttpResponse, MockHttpClient, StoryClient};
use storyhub_store::{NewRecord, OperationTag, RecordId, RecordQuery, Store, StoreConfig};
use storyhub_sync::{ConnectivitySignal, MockPlatform, PushConfig, PushManager, PushState, SyncEngine};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wire(
    store: Arc<Store>,
    online: bool,
) -> (Arc<SyncEngine<Arc<MockHttpClient>>>, Arc<MockHttpClient>) {
    let mock = Arc::new(MockHttpClient::new());
    let client = StoryClient::new(ApiConfig::new("https://api.test/v1"), Arc::clone(&mock));
    client.set_token("tok-1");
    let engine = Arc::new(SyncEngine::new(
        storyhub_store::RecordRepository::new(store),
        Arc::new(client),
        Arc::new(ConnectivitySignal::new(online)),
    ));
    (engine, mock)
}

#[test]
fn offline_save_then_reconnect_syncs_one_item() {
    init_tracing();
    let store = Arc::new(Store::in_memory().unwrap());
    let repository = storyhub_store::RecordRepository::new(Arc::clone(&store));
    let (engine, mock) = wire(store, false);
    engine.attach();

    // Offline: the save lands locally with its queue entry.
    let id = repository
        .save_offline(NewRecord::new("Cokelat Dingin").with_location(-6.2, 106.8))
        .unwrap();
    assert_eq!(id, RecordId::new(1));

    let offline = repository.list(&RecordQuery::new().with_is_offline(true));
    assert_eq!(offline.len(), 1);
    assert!(!offline[0].synced);
    let queue = repository.pending_operations();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].kind.tag(), OperationTag::Create);
    assert_eq!(queue[0].kind.record_id(), id);

    // Connectivity returns: the attached engine drains on the edge.
    mock.push_response(HttpResponse::ok_json(r#"{"error":false,"message":"ok"}"#));
    engine.connectivity().set_online(true);

    assert!(repository.get(id).unwrap().synced);
    assert!(!repository.has_pending());
    assert_eq!(
        engine.stats().last_message.as_deref(),
        Some("Synced 1 items")
    );

    let submitted = mock.requests();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].url, "https://api.test/v1/stories");
    assert_eq!(submitted[0].header("authorization"), Some("Bearer tok-1"));

    // A second drain finds nothing and stays successful.
    let report = engine.drain().unwrap();
    assert!(report.success);
    assert_eq!(report.message, "Synced 0 items");
}

#[test]
fn queue_survives_restart_and_drains_after() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.bin");

    {
        let store = Arc::new(Store::open(StoreConfig::at_path(&path)).unwrap());
        let repository = storyhub_store::RecordRepository::new(store);
        repository
            .save_offline(NewRecord::new("written before the crash"))
            .unwrap();
    }

    // Process restart: the queue is still there.
    let store = Arc::new(Store::open(StoreConfig::at_path(&path)).unwrap());
    let repository = storyhub_store::RecordRepository::new(Arc::clone(&store));
    assert_eq!(repository.pending_count(), 1);

    let (engine, mock) = wire(store, true);
    mock.push_response(HttpResponse::ok_json(r#"{"error":false,"message":"ok"}"#));

    let report = engine.drain().unwrap();
    assert_eq!(report.message, "Synced 1 items");
    assert!(!repository.has_pending());
}

#[test]
fn push_subscribe_shares_the_authority_client() {
    init_tracing();
    let mock = Arc::new(MockHttpClient::new());
    let client = Arc::new(StoryClient::new(
        ApiConfig::new("https://api.test/v1"),
        Arc::clone(&mock),
    ));
    client.set_token("tok-1");

    let manager = PushManager::new(
        MockPlatform::supported(),
        client,
        PushConfig::new("BPx0ZQ"),
    );
    assert_eq!(manager.initialize(), PushState::Unsubscribed);

    mock.push_response(HttpResponse::ok_json(r#"{"error":false,"message":"ok"}"#));
    assert!(manager.subscribe());
    assert_eq!(manager.state(), PushState::Subscribed);

    let request = &mock.requests()[0];
    assert!(request.url.ends_with("/notifications/subscribe"));
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert!(body["endpoint"].as_str().unwrap().starts_with("https://push.test/"));
    assert!(body["deviceId"].is_string());
}
