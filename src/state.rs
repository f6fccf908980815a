//! Application State
//!
//! The explicit state object owning the in-memory collections, the snapshot
//! store, and the pending-operation queue. Constructed once at process start
//! via [`AppState::load`] and passed by handle into the sync engine and any
//! UI layer; there are no module-level singletons.
//!
//! Every mutation is two-phase: validate, apply in memory, persist the
//! snapshot, then enqueue the sync operation. When a mutation returns, the
//! change is durable locally and queued for the remote. Validation failures
//! return synchronously and leave both memory and disk untouched.

use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, ValidationError};
use crate::model::{
    InventoryItem, InventoryItemPatch, SavedRecipe, ShoppingList, ShoppingListItem,
    ShoppingListPatch,
};
use crate::queue::{EntityKind, OpKind, OperationQueue, SyncOperation, SyncPayload};
use crate::storage::{self, keys, LocalStore};

pub struct AppState {
    store: Arc<dyn LocalStore>,
    queue: OperationQueue,
    user_id: String,
    inventory: Vec<InventoryItem>,
    shopping_lists: Vec<ShoppingList>,
    saved_recipes: Vec<SavedRecipe>,
}

impl AppState {
    /// Load state for `user_id` from durable storage. Missing snapshots mean
    /// a fresh install: empty collections.
    pub fn load(store: Arc<dyn LocalStore>, user_id: impl Into<String>) -> Result<Self> {
        let inventory = storage::get_json(store.as_ref(), keys::INVENTORY)?.unwrap_or_default();
        let shopping_lists =
            storage::get_json(store.as_ref(), keys::SHOPPING_LISTS)?.unwrap_or_default();
        let saved_recipes =
            storage::get_json(store.as_ref(), keys::SAVED_RECIPES)?.unwrap_or_default();
        Ok(Self {
            queue: OperationQueue::new(Arc::clone(&store)),
            store,
            user_id: user_id.into(),
            inventory,
            shopping_lists,
            saved_recipes,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn inventory(&self) -> &[InventoryItem] {
        &self.inventory
    }

    pub fn shopping_lists(&self) -> &[ShoppingList] {
        &self.shopping_lists
    }

    pub fn saved_recipes(&self) -> &[SavedRecipe] {
        &self.saved_recipes
    }

    // ── Inventory ───────────────────────────────────────────────────

    pub fn add_item(&mut self, item: InventoryItem) -> Result<()> {
        self.inventory.push(item.clone());
        self.persist_inventory()?;
        self.queue.enqueue(SyncOperation::new(
            OpKind::Create,
            EntityKind::Inventory,
            SyncPayload::Inventory(item),
        ))
    }

    pub fn update_item(&mut self, id: &str, patch: &InventoryItemPatch) -> Result<InventoryItem> {
        let item = self
            .inventory
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ValidationError::NotFound {
                entity: "inventory item",
                id: id.to_string(),
            })?;
        patch.apply(item)?;
        let updated = item.clone();
        self.persist_inventory()?;
        self.queue.enqueue(SyncOperation::new(
            OpKind::Update,
            EntityKind::Inventory,
            SyncPayload::Inventory(updated.clone()),
        ))?;
        Ok(updated)
    }

    pub fn remove_item(&mut self, id: &str) -> Result<()> {
        let before = self.inventory.len();
        self.inventory.retain(|i| i.id != id);
        if self.inventory.len() == before {
            return Err(ValidationError::NotFound {
                entity: "inventory item",
                id: id.to_string(),
            }
            .into());
        }
        self.persist_inventory()?;
        self.queue.enqueue(SyncOperation::new(
            OpKind::Delete,
            EntityKind::Inventory,
            SyncPayload::EntityId { id: id.to_string() },
        ))
    }

    // ── Shopping lists (whole list is the unit of sync) ────────────

    pub fn create_list(&mut self, list: ShoppingList) -> Result<()> {
        self.shopping_lists.push(list.clone());
        self.persist_lists()?;
        self.queue.enqueue(SyncOperation::new(
            OpKind::Create,
            EntityKind::ShoppingList,
            SyncPayload::ShoppingList(list),
        ))
    }

    pub fn update_list(&mut self, id: &str, patch: &ShoppingListPatch) -> Result<ShoppingList> {
        let list = self
            .shopping_lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| ValidationError::NotFound {
                entity: "shopping list",
                id: id.to_string(),
            })?;
        patch.apply(list)?;
        let updated = list.clone();
        self.persist_lists()?;
        self.enqueue_list_update(updated.clone())?;
        Ok(updated)
    }

    pub fn add_list_item(&mut self, list_id: &str, item: ShoppingListItem) -> Result<()> {
        let list = self.find_list_mut(list_id)?;
        list.items.push(item);
        list.updated_at = chrono::Utc::now();
        let updated = list.clone();
        self.persist_lists()?;
        self.enqueue_list_update(updated)
    }

    pub fn set_item_checked(&mut self, list_id: &str, item_id: &str, checked: bool) -> Result<()> {
        let list = self.find_list_mut(list_id)?;
        let item = list
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| ValidationError::NotFound {
                entity: "shopping list item",
                id: item_id.to_string(),
            })?;
        item.checked = checked;
        list.updated_at = chrono::Utc::now();
        let updated = list.clone();
        self.persist_lists()?;
        self.enqueue_list_update(updated)
    }

    pub fn remove_list(&mut self, id: &str) -> Result<()> {
        let before = self.shopping_lists.len();
        self.shopping_lists.retain(|l| l.id != id);
        if self.shopping_lists.len() == before {
            return Err(ValidationError::NotFound {
                entity: "shopping list",
                id: id.to_string(),
            }
            .into());
        }
        self.persist_lists()?;
        self.queue.enqueue(SyncOperation::new(
            OpKind::Delete,
            EntityKind::ShoppingList,
            SyncPayload::EntityId { id: id.to_string() },
        ))
    }

    // ── Saved recipes ───────────────────────────────────────────────

    /// Bookmark a recipe. At most one saved entry per (user, external
    /// recipe id): saving an already saved recipe refreshes the snapshot in
    /// place instead of adding a duplicate.
    pub fn save_recipe(&mut self, recipe: SavedRecipe) -> Result<()> {
        if let Some(existing) = self
            .saved_recipes
            .iter_mut()
            .find(|r| r.user_id == recipe.user_id && r.recipe_id == recipe.recipe_id)
        {
            let mut replacement = recipe;
            replacement.id = existing.id.clone();
            *existing = replacement.clone();
            self.persist_recipes()?;
            debug!(recipe_id = replacement.recipe_id, "saved recipe refreshed");
            return self.queue.enqueue(SyncOperation::new(
                OpKind::Update,
                EntityKind::SavedRecipe,
                SyncPayload::SavedRecipe(replacement),
            ));
        }

        self.saved_recipes.push(recipe.clone());
        self.persist_recipes()?;
        self.queue.enqueue(SyncOperation::new(
            OpKind::Create,
            EntityKind::SavedRecipe,
            SyncPayload::SavedRecipe(recipe),
        ))
    }

    pub fn unsave_recipe(&mut self, id: &str) -> Result<()> {
        let before = self.saved_recipes.len();
        self.saved_recipes.retain(|r| r.id != id);
        if self.saved_recipes.len() == before {
            return Err(ValidationError::NotFound {
                entity: "saved recipe",
                id: id.to_string(),
            }
            .into());
        }
        self.persist_recipes()?;
        self.queue.enqueue(SyncOperation::new(
            OpKind::Delete,
            EntityKind::SavedRecipe,
            SyncPayload::EntityId { id: id.to_string() },
        ))
    }

    // ── Pull integration ───────────────────────────────────────────

    /// Overwrite all three collections with server truth and persist the
    /// new snapshots. Called by the sync engine's pull phase only.
    pub fn replace_collections(
        &mut self,
        inventory: Vec<InventoryItem>,
        shopping_lists: Vec<ShoppingList>,
        saved_recipes: Vec<SavedRecipe>,
    ) -> Result<()> {
        self.inventory = inventory;
        self.shopping_lists = shopping_lists;
        self.saved_recipes = saved_recipes;
        self.persist_inventory()?;
        self.persist_lists()?;
        self.persist_recipes()?;
        Ok(())
    }

    fn find_list_mut(&mut self, id: &str) -> Result<&mut ShoppingList> {
        self.shopping_lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| {
                ValidationError::NotFound {
                    entity: "shopping list",
                    id: id.to_string(),
                }
                .into()
            })
    }

    fn enqueue_list_update(&self, list: ShoppingList) -> Result<()> {
        self.queue.enqueue(SyncOperation::new(
            OpKind::Update,
            EntityKind::ShoppingList,
            SyncPayload::ShoppingList(list),
        ))
    }

    fn persist_inventory(&self) -> Result<()> {
        storage::set_json(self.store.as_ref(), keys::INVENTORY, &self.inventory)
    }

    fn persist_lists(&self) -> Result<()> {
        storage::set_json(self.store.as_ref(), keys::SHOPPING_LISTS, &self.shopping_lists)
    }

    fn persist_recipes(&self) -> Result<()> {
        storage::set_json(self.store.as_ref(), keys::SAVED_RECIPES, &self.saved_recipes)
    }
}
