//! Sync engine behavior against mocked remote and connectivity:
//! offline no-op, partial-failure continuation, idempotent replay,
//! pull fallback, and the two end-to-end scenarios.

use std::sync::Arc;
use std::time::Duration;

use larder::engine::{run_periodic, SyncConfig, SyncEngine};
use larder::model::{InventoryItem, InventoryItemPatch, StorageLocation};
use larder::queue::OpKind;
use larder::state::AppState;
use larder::storage::MemoryStore;

use crate::support::{GatedConnectivity, MockConnectivity, MockRemote};

struct Harness {
    remote: Arc<MockRemote>,
    connectivity: Arc<MockConnectivity>,
    engine: SyncEngine,
    state: AppState,
}

fn harness(online: bool) -> Harness {
    harness_with(online, SyncConfig::default())
}

fn harness_with(online: bool, config: SyncConfig) -> Harness {
    let remote = Arc::new(MockRemote::new());
    let connectivity = Arc::new(MockConnectivity::new(online));
    let engine = SyncEngine::new(
        Arc::clone(&remote) as Arc<dyn larder::remote::RemoteStore>,
        Arc::clone(&connectivity) as Arc<dyn larder::remote::Connectivity>,
        config,
    );
    let state = AppState::load(Arc::new(MemoryStore::new()), "u1").unwrap();
    Harness {
        remote,
        connectivity,
        engine,
        state,
    }
}

fn milk(id: &str, quantity: f64) -> InventoryItem {
    let mut item = InventoryItem::new("u1", "Milk", quantity, "l", StorageLocation::Fridge).unwrap();
    item.id = id.to_string();
    item
}

#[tokio::test]
async fn offline_cycle_is_a_noop() {
    let mut h = harness(false);
    h.state.add_item(milk("a", 2.0)).unwrap();
    let queued_before = h.state.queue().drain().unwrap();

    let report = h.engine.sync_cycle(&mut h.state).await;

    assert_eq!(report.success, 0);
    assert_eq!(report.failed, 0);
    assert!(!report.pulled);
    assert_eq!(
        h.state.queue().drain().unwrap(),
        queued_before,
        "offline cycle must leave the queue unchanged"
    );
    assert!(h.remote.items.lock().is_empty());
}

#[tokio::test]
async fn end_to_end_offline_then_online() {
    // Start empty, enqueue a create, sync offline, then online.
    let mut h = harness(false);
    h.state.add_item(milk("a", 2.0)).unwrap();

    let report = h.engine.sync_cycle(&mut h.state).await;
    assert_eq!((report.success, report.failed), (0, 0));
    assert_eq!(h.state.queue().len().unwrap(), 1);

    h.connectivity.set_online(true);
    let report = h.engine.sync_cycle(&mut h.state).await;

    assert_eq!((report.success, report.failed), (1, 0));
    assert!(report.pulled);
    assert!(h.state.queue().is_empty().unwrap());
    assert_eq!(h.state.inventory().len(), 1);
    assert_eq!(h.state.inventory()[0].id, "a");
    assert_eq!(h.state.inventory()[0].quantity, 2.0);
}

#[tokio::test]
async fn end_to_end_update_then_delete_compacts_to_delete() {
    let mut h = harness(true);
    h.state.add_item(milk("a", 2.0)).unwrap();
    h.engine.sync_cycle(&mut h.state).await;
    assert!(h.remote.items.lock().contains_key("a"));

    let patch = InventoryItemPatch {
        quantity: Some(5.0),
        ..Default::default()
    };
    h.state.update_item("a", &patch).unwrap();
    h.state.remove_item("a").unwrap();

    let ops = h.state.queue().drain().unwrap();
    assert_eq!(ops.len(), 1, "update then delete compacts to the delete");
    assert_eq!(ops[0].kind, OpKind::Delete);

    let report = h.engine.sync_cycle(&mut h.state).await;
    assert_eq!((report.success, report.failed), (1, 0));
    assert!(h.remote.items.lock().is_empty());
    assert!(h.state.inventory().is_empty());
}

#[tokio::test]
async fn delete_for_never_created_entity_drains_cleanly() {
    // Create then delete before any sync: only the delete is queued, and the
    // remote must tolerate deleting an id it never saw.
    let mut h = harness(true);
    h.state.add_item(milk("ghost", 1.0)).unwrap();
    h.state.remove_item("ghost").unwrap();

    let report = h.engine.sync_cycle(&mut h.state).await;
    assert_eq!((report.success, report.failed), (1, 0));
    assert!(h.state.queue().is_empty().unwrap());
}

#[tokio::test]
async fn partial_failure_retains_only_the_failed_operation() {
    let mut h = harness(true);
    for id in ["a", "b", "c", "d"] {
        h.state.add_item(milk(id, 1.0)).unwrap();
    }
    h.remote.fail_writes_for("c");

    let report = h.engine.sync_cycle(&mut h.state).await;

    assert_eq!(report.success, 3);
    assert_eq!(report.failed, 1);
    let remaining = h.state.queue().drain().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload.entity_id(), "c");

    let failed: Vec<_> = report.outcomes.iter().filter(|o| !o.succeeded()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].entity_id, "c");

    // Next cycle retries and succeeds
    h.remote.clear_write_failures();
    let report = h.engine.sync_cycle(&mut h.state).await;
    assert_eq!((report.success, report.failed), (1, 0));
    assert!(h.state.queue().is_empty().unwrap());
}

#[tokio::test]
async fn replaying_a_create_twice_is_idempotent() {
    let h = harness(true);
    let item = milk("a", 2.0);
    // Simulate a retry after a false-negative failure: same create twice
    use larder::remote::RemoteStore;
    h.remote.create_item(&item).await.unwrap();
    h.remote.create_item(&item).await.unwrap();

    assert_eq!(h.remote.items.lock().len(), 1, "second create overwrites by id");
    assert_eq!(
        h.remote.create_item_calls.load(std::sync::atomic::Ordering::SeqCst),
        2
    );
}

#[tokio::test]
async fn pull_overwrites_local_with_server_truth() {
    let mut h = harness(true);
    // Remote already holds an item this device has never seen
    use larder::remote::RemoteStore;
    h.remote.create_item(&milk("remote-only", 3.0)).await.unwrap();

    let report = h.engine.sync_cycle(&mut h.state).await;
    assert!(report.pulled);
    assert_eq!(h.state.inventory().len(), 1);
    assert_eq!(h.state.inventory()[0].id, "remote-only");
}

#[tokio::test]
async fn pull_failure_falls_back_to_local_snapshot() {
    let mut h = harness(true);
    h.state.add_item(milk("a", 2.0)).unwrap();
    h.engine.sync_cycle(&mut h.state).await;
    assert_eq!(h.state.inventory().len(), 1);

    h.remote.set_fail_pulls(true);
    let report = h.engine.sync_cycle(&mut h.state).await;

    assert!(!report.pulled);
    assert_eq!(
        h.state.inventory().len(),
        1,
        "a failed pull must never empty local state"
    );
}

#[tokio::test]
async fn always_pull_can_drop_a_failed_local_edit() {
    // Default behavior: pull runs even after a failed drain, so the pulled
    // server truth overwrites the local edit that failed to push.
    let mut h = harness(true);
    h.state.add_item(milk("a", 2.0)).unwrap();
    h.remote.fail_writes_for("a");

    let report = h.engine.sync_cycle(&mut h.state).await;

    assert_eq!(report.failed, 1);
    assert!(report.pulled);
    assert!(
        h.state.inventory().is_empty(),
        "server truth (empty) replaced the unsynced local item"
    );
    // The operation is still queued, so the next successful drain restores it
    assert_eq!(h.state.queue().len().unwrap(), 1);
}

#[tokio::test]
async fn skip_pull_after_partial_failure_preserves_local_edit() {
    let config = SyncConfig {
        pull_after_partial_failure: false,
    };
    let mut h = harness_with(true, config);
    h.state.add_item(milk("a", 2.0)).unwrap();
    h.remote.fail_writes_for("a");

    let report = h.engine.sync_cycle(&mut h.state).await;

    assert_eq!(report.failed, 1);
    assert!(!report.pulled, "pull must be skipped after a drain failure");
    assert_eq!(h.state.inventory().len(), 1);
}

#[tokio::test]
async fn cycle_started_while_another_is_in_flight_returns_empty_report() {
    let remote = Arc::new(MockRemote::new());
    let connectivity = Arc::new(GatedConnectivity::new());
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&remote) as Arc<dyn larder::remote::RemoteStore>,
        Arc::clone(&connectivity) as Arc<dyn larder::remote::Connectivity>,
        SyncConfig::default(),
    ));

    // First cycle parks inside the connectivity probe, holding the guard
    let first_state = Arc::new(tokio::sync::Mutex::new(
        AppState::load(Arc::new(MemoryStore::new()), "u1").unwrap(),
    ));
    let first = {
        let engine = Arc::clone(&engine);
        let state = Arc::clone(&first_state);
        tokio::spawn(async move {
            let mut state = state.lock().await;
            engine.sync_cycle(&mut state).await
        })
    };
    while !connectivity.is_held() {
        tokio::task::yield_now().await;
    }

    // Second caller races in while the first is still in flight
    let mut other = AppState::load(Arc::new(MemoryStore::new()), "u1").unwrap();
    other.add_item(milk("b", 1.0)).unwrap();
    let report = engine.sync_cycle(&mut other).await;

    assert_eq!((report.success, report.failed), (0, 0));
    assert!(!report.pulled);
    assert!(report.outcomes.is_empty());
    assert_eq!(
        other.queue().len().unwrap(),
        1,
        "a skipped cycle must not drain the queue"
    );

    connectivity.release();
    let first_report = first.await.unwrap();
    assert!(first_report.pulled, "the held cycle completes normally");
}

#[tokio::test]
async fn periodic_driver_stops_when_shutdown_flips() {
    let remote = Arc::new(MockRemote::new());
    let connectivity = Arc::new(MockConnectivity::new(true));
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&remote) as Arc<dyn larder::remote::RemoteStore>,
        Arc::clone(&connectivity) as Arc<dyn larder::remote::Connectivity>,
        SyncConfig::default(),
    ));
    let state = Arc::new(tokio::sync::Mutex::new(
        AppState::load(Arc::new(MemoryStore::new()), "u1").unwrap(),
    ));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let driver = tokio::spawn(run_periodic(
        engine,
        state,
        Duration::from_secs(3600),
        shutdown_rx,
    ));
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), driver)
        .await
        .expect("driver must stop once the shutdown flag flips")
        .unwrap();
}

#[tokio::test]
async fn periodic_driver_stops_when_shutdown_sender_drops() {
    let remote = Arc::new(MockRemote::new());
    let connectivity = Arc::new(MockConnectivity::new(false));
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&remote) as Arc<dyn larder::remote::RemoteStore>,
        Arc::clone(&connectivity) as Arc<dyn larder::remote::Connectivity>,
        SyncConfig::default(),
    ));
    let state = Arc::new(tokio::sync::Mutex::new(
        AppState::load(Arc::new(MemoryStore::new()), "u1").unwrap(),
    ));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let driver = tokio::spawn(run_periodic(
        engine,
        state,
        Duration::from_secs(3600),
        shutdown_rx,
    ));
    drop(shutdown_tx);

    tokio::time::timeout(Duration::from_secs(5), driver)
        .await
        .expect("driver must stop once the shutdown sender is gone")
        .unwrap();
}

#[tokio::test]
async fn engine_runs_consecutive_cycles() {
    // The reentrancy guard must reset between cycles.
    let mut h = harness(true);
    h.state.add_item(milk("a", 1.0)).unwrap();
    let first = h.engine.sync_cycle(&mut h.state).await;
    assert_eq!(first.success, 1);

    h.state.add_item(milk("b", 1.0)).unwrap();
    let second = h.engine.sync_cycle(&mut h.state).await;
    assert_eq!(second.success, 1, "guard must not block a later cycle");
}
