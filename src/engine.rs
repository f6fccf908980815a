//! Sync Engine
//!
//! Reconciles local and remote state under unreliable connectivity, with
//! local data as the fallback of record. A cycle is: connectivity gate,
//! drain (replay every queued operation independently), then a full pull
//! that overwrites local snapshots with server truth.
//!
//! Failures never escape a cycle. Offline is a silent no-op, a failed replay
//! leaves that operation queued for next time, and a failed pull falls back
//! to the last-known local snapshot. The caller only ever sees a
//! [`SyncReport`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::queue::{EntityKind, OpKind, SyncOperation, SyncPayload};
use crate::remote::{Connectivity, RemoteStore};
use crate::state::AppState;

/// Engine knobs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Whether to run the pull phase even when some drains failed. The
    /// default (`true`) always pulls, which can overwrite a local edit whose
    /// push failed; `false` skips the pull in that case and trades staleness
    /// for never dropping an unsynced edit.
    pub pull_after_partial_failure: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pull_after_partial_failure: true,
        }
    }
}

/// Outcome of replaying one queued operation.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub op_id: String,
    pub kind: OpKind,
    pub entity: EntityKind,
    pub entity_id: String,
    /// `None` on success; the replay error message otherwise.
    pub error: Option<String>,
}

impl OperationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Tally returned from a sync cycle. Diagnostics only: no variant of this is
/// ever surfaced to the user as an error.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub success: usize,
    pub failed: usize,
    pub outcomes: Vec<OperationOutcome>,
    /// True when the pull phase ran and local state was replaced.
    pub pulled: bool,
}

pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn Connectivity>,
    config: SyncConfig,
    /// Reentrancy guard: a cycle started while another is in flight (e.g. a
    /// foreground-transition trigger racing the periodic timer) returns an
    /// empty report instead of draining twice.
    in_flight: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn Connectivity>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            connectivity,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one full sync cycle. Never returns an error; every remote and
    /// storage failure is logged, counted, and otherwise swallowed here.
    pub async fn sync_cycle(&self, state: &mut AppState) -> SyncReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync cycle already in flight, skipping");
            return SyncReport::default();
        }
        let report = self.run_cycle(state).await;
        self.in_flight.store(false, Ordering::SeqCst);
        report
    }

    async fn run_cycle(&self, state: &mut AppState) -> SyncReport {
        if !self.connectivity.is_online().await {
            debug!("offline, sync cycle is a no-op");
            return SyncReport::default();
        }

        let mut report = self.drain(state).await;

        if report.failed > 0 && !self.config.pull_after_partial_failure {
            debug!(
                failed = report.failed,
                "skipping pull after partial drain failure"
            );
            return report;
        }
        report.pulled = self.pull(state).await;
        report
    }

    /// Replay every queued operation against the remote store. Each attempt
    /// is independent: a failure leaves that operation queued and the cycle
    /// moves on (at-least-once per operation, idempotent remote writes).
    async fn drain(&self, state: &mut AppState) -> SyncReport {
        let ops = match state.queue().drain() {
            Ok(ops) => ops,
            Err(e) => {
                warn!(error = %e, "failed to read pending-operation queue");
                return SyncReport::default();
            }
        };

        let mut report = SyncReport::default();
        let mut synced_ids = Vec::new();

        for op in &ops {
            let mut outcome = OperationOutcome {
                op_id: op.id.clone(),
                kind: op.kind,
                entity: op.entity,
                entity_id: op.payload.entity_id().to_string(),
                error: None,
            };
            match self.replay(op).await {
                Ok(()) => {
                    report.success += 1;
                    synced_ids.push(op.id.clone());
                }
                Err(e) => {
                    warn!(
                        op = %op.kind,
                        entity = %op.entity,
                        id = %outcome.entity_id,
                        error = %e,
                        "operation replay failed, retained for next cycle"
                    );
                    report.failed += 1;
                    outcome.error = Some(e.to_string());
                }
            }
            report.outcomes.push(outcome);
        }

        if let Err(e) = state.queue().remove_synced(&synced_ids) {
            warn!(error = %e, "failed to remove synced operations from queue");
        }
        report
    }

    /// Dispatch one operation to the matching remote call.
    async fn replay(&self, op: &SyncOperation) -> crate::errors::Result<()> {
        use crate::errors::LarderError;

        match (&op.payload, op.kind) {
            (SyncPayload::Inventory(item), OpKind::Create) => self.remote.create_item(item).await,
            (SyncPayload::Inventory(item), OpKind::Update) => self.remote.update_item(item).await,
            (SyncPayload::ShoppingList(list), OpKind::Create) => {
                self.remote.create_list(list).await
            }
            (SyncPayload::ShoppingList(list), OpKind::Update) => {
                self.remote.update_list(list).await
            }
            (SyncPayload::SavedRecipe(recipe), OpKind::Create) => {
                self.remote.create_recipe(recipe).await
            }
            (SyncPayload::SavedRecipe(recipe), OpKind::Update) => {
                self.remote.update_recipe(recipe).await
            }
            (SyncPayload::EntityId { id }, OpKind::Delete) => match op.entity {
                EntityKind::Inventory => self.remote.delete_item(id).await,
                EntityKind::ShoppingList => self.remote.delete_list(id).await,
                EntityKind::SavedRecipe => self.remote.delete_recipe(id).await,
            },
            (payload, kind) => Err(LarderError::Internal(format!(
                "queued {} operation carries mismatched payload for id '{}'",
                kind,
                payload.entity_id()
            ))),
        }
    }

    /// Fetch all three collections in parallel and overwrite local state.
    /// Full replace, not a merge. Any fetch error falls back to the local
    /// snapshot unchanged so the UI never observes an empty state from a
    /// transient remote failure.
    async fn pull(&self, state: &mut AppState) -> bool {
        let user_id = state.user_id().to_string();
        let (items, lists, recipes) = futures::join!(
            self.remote.list_items(&user_id),
            self.remote.list_lists(&user_id),
            self.remote.list_recipes(&user_id),
        );

        match (items, lists, recipes) {
            (Ok(items), Ok(lists), Ok(recipes)) => {
                if let Err(e) = state.replace_collections(items, lists, recipes) {
                    warn!(error = %e, "failed to persist pulled snapshots");
                    return false;
                }
                debug!("pull complete, local snapshots replaced");
                true
            }
            (items, lists, recipes) => {
                let first_error = [
                    items.err().map(|e| e.to_string()),
                    lists.err().map(|e| e.to_string()),
                    recipes.err().map(|e| e.to_string()),
                ]
                .into_iter()
                .flatten()
                .next()
                .unwrap_or_default();
                warn!(error = %first_error, "pull failed, keeping local snapshot");
                false
            }
        }
    }
}

/// Drive sync cycles on a fixed interval until `shutdown` flips. The
/// interval tick and an app-foreground trigger may race; the engine's
/// reentrancy guard keeps the drains from overlapping.
pub async fn run_periodic(
    engine: Arc<SyncEngine>,
    state: Arc<tokio::sync::Mutex<AppState>>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut state = state.lock().await;
                let report = engine.sync_cycle(&mut state).await;
                debug!(
                    success = report.success,
                    failed = report.failed,
                    pulled = report.pulled,
                    "periodic sync cycle finished"
                );
            }
            changed = shutdown.changed() => {
                // A dropped sender also means shutdown
                if changed.is_err() || *shutdown.borrow() {
                    debug!("periodic sync stopping");
                    return;
                }
            }
        }
    }
}
