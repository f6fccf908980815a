//! Pending-Operation Queue
//!
//! Durably records local mutations so they survive process restarts and
//! network outages. Redundant mutations to the same entity are collapsed:
//! enqueuing removes every queued operation for the same (entity kind,
//! payload id) pair before appending, so only the latest write per entity is
//! ever replayed. Note this means a create followed by a delete before any
//! sync leaves only the delete queued; the remote never observes the
//! transient create.
//!
//! The queue is persisted as a whole: every enqueue and every removal reads
//! the full sequence, mutates it, and writes it back. Safe under the
//! single-threaded sequential execution the engine guarantees.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::model::{InventoryItem, SavedRecipe, ShoppingList};
use crate::storage::{self, keys, LocalStore};

/// Mutation kind replayed against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Create => write!(f, "create"),
            OpKind::Update => write!(f, "update"),
            OpKind::Delete => write!(f, "delete"),
        }
    }
}

/// Which collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Inventory,
    ShoppingList,
    SavedRecipe,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Inventory => write!(f, "inventory"),
            EntityKind::ShoppingList => write!(f, "shopping list"),
            EntityKind::SavedRecipe => write!(f, "saved recipe"),
        }
    }
}

/// The operation payload: the full entity for creates/updates, or just the
/// target id for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncPayload {
    Inventory(InventoryItem),
    ShoppingList(ShoppingList),
    SavedRecipe(SavedRecipe),
    EntityId { id: String },
}

impl SyncPayload {
    /// The id of the entity this payload targets, used for compaction.
    pub fn entity_id(&self) -> &str {
        match self {
            SyncPayload::Inventory(item) => &item.id,
            SyncPayload::ShoppingList(list) => &list.id,
            SyncPayload::SavedRecipe(recipe) => &recipe.id,
            SyncPayload::EntityId { id } => id,
        }
    }
}

/// A pending mutation awaiting replay against the remote store.
///
/// Lifecycle: appended on every local mutation, removed only after a
/// successful remote replay. Operations surviving a failed replay stay
/// queued for the next sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    pub id: String,
    pub kind: OpKind,
    pub entity: EntityKind,
    pub payload: SyncPayload,
    pub enqueued_at: DateTime<Utc>,
}

impl SyncOperation {
    pub fn new(kind: OpKind, entity: EntityKind, payload: SyncPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            entity,
            payload,
            enqueued_at: Utc::now(),
        }
    }
}

/// Ordered, deduplicated log of pending mutations backed by the local store.
pub struct OperationQueue {
    store: Arc<dyn LocalStore>,
}

impl OperationQueue {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    fn load(&self) -> Result<Vec<SyncOperation>> {
        Ok(storage::get_json(self.store.as_ref(), keys::PENDING_OPS)?.unwrap_or_default())
    }

    fn save(&self, ops: &[SyncOperation]) -> Result<()> {
        storage::set_json(self.store.as_ref(), keys::PENDING_OPS, &ops)
    }

    /// Append an operation, first removing every queued operation for the
    /// same (entity kind, entity id) pair — last-writer-wins compaction.
    /// Enqueue order is preserved apart from that removal.
    pub fn enqueue(&self, op: SyncOperation) -> Result<()> {
        let mut ops = self.load()?;
        let entity = op.entity;
        let id = op.payload.entity_id().to_string();
        let before = ops.len();
        ops.retain(|queued| !(queued.entity == entity && queued.payload.entity_id() == id));
        if ops.len() < before {
            tracing::debug!(
                entity = %entity,
                id = %id,
                superseded = before - ops.len(),
                "compacted queued operations"
            );
        }
        ops.push(op);
        self.save(&ops)
    }

    /// Return the full queue contents without clearing it. Clearing happens
    /// only after the sync engine reports which operations succeeded.
    pub fn drain(&self) -> Result<Vec<SyncOperation>> {
        self.load()
    }

    /// Remove the operations that the engine successfully replayed.
    pub fn remove_synced(&self, op_ids: &[String]) -> Result<()> {
        if op_ids.is_empty() {
            return Ok(());
        }
        let mut ops = self.load()?;
        ops.retain(|op| !op_ids.contains(&op.id));
        self.save(&ops)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.load()?.is_empty())
    }
}
