//! Shared mocks for the external collaborators: remote store, connectivity
//! oracle, and platform notification scheduler.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use larder::errors::{RemoteError, Result};
use larder::model::{InventoryItem, SavedRecipe, ShoppingList};
use larder::remote::{Connectivity, RemoteStore};
use larder::scheduler::{ExpirationAlert, NotificationScheduler};
use parking_lot::Mutex;

/// In-memory remote store keyed by entity id, with per-entity write-failure
/// injection and a pull-failure switch. Writes are idempotent: a repeated
/// create overwrites by id, and deleting an unknown id succeeds (mirroring
/// the HTTP client's 404-on-delete handling).
#[derive(Default)]
pub struct MockRemote {
    pub items: Mutex<HashMap<String, InventoryItem>>,
    pub lists: Mutex<HashMap<String, ShoppingList>>,
    pub recipes: Mutex<HashMap<String, SavedRecipe>>,
    fail_writes_for: Mutex<HashSet<String>>,
    fail_pulls: AtomicBool,
    pub create_item_calls: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write targeting `entity_id` fail with a network error.
    pub fn fail_writes_for(&self, entity_id: &str) {
        self.fail_writes_for.lock().insert(entity_id.to_string());
    }

    pub fn clear_write_failures(&self) {
        self.fail_writes_for.lock().clear();
    }

    pub fn set_fail_pulls(&self, fail: bool) {
        self.fail_pulls.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self, entity_id: &str) -> Result<()> {
        if self.fail_writes_for.lock().contains(entity_id) {
            return Err(RemoteError::Network("injected write failure".to_string()).into());
        }
        Ok(())
    }

    fn check_pull(&self) -> Result<()> {
        if self.fail_pulls.load(Ordering::SeqCst) {
            return Err(RemoteError::Timeout.into());
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn create_item(&self, item: &InventoryItem) -> Result<()> {
        self.create_item_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write(&item.id)?;
        self.items.lock().insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &InventoryItem) -> Result<()> {
        self.check_write(&item.id)?;
        self.items.lock().insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.check_write(id)?;
        // Unknown id is not an error
        self.items.lock().remove(id);
        Ok(())
    }

    async fn list_items(&self, user_id: &str) -> Result<Vec<InventoryItem>> {
        self.check_pull()?;
        let mut items: Vec<_> = self
            .items
            .lock()
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn create_list(&self, list: &ShoppingList) -> Result<()> {
        self.check_write(&list.id)?;
        self.lists.lock().insert(list.id.clone(), list.clone());
        Ok(())
    }

    async fn update_list(&self, list: &ShoppingList) -> Result<()> {
        self.check_write(&list.id)?;
        self.lists.lock().insert(list.id.clone(), list.clone());
        Ok(())
    }

    async fn delete_list(&self, id: &str) -> Result<()> {
        self.check_write(id)?;
        self.lists.lock().remove(id);
        Ok(())
    }

    async fn list_lists(&self, user_id: &str) -> Result<Vec<ShoppingList>> {
        self.check_pull()?;
        let mut lists: Vec<_> = self
            .lists
            .lock()
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        lists.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(lists)
    }

    async fn create_recipe(&self, recipe: &SavedRecipe) -> Result<()> {
        self.check_write(&recipe.id)?;
        self.recipes.lock().insert(recipe.id.clone(), recipe.clone());
        Ok(())
    }

    async fn update_recipe(&self, recipe: &SavedRecipe) -> Result<()> {
        self.check_write(&recipe.id)?;
        self.recipes.lock().insert(recipe.id.clone(), recipe.clone());
        Ok(())
    }

    async fn delete_recipe(&self, id: &str) -> Result<()> {
        self.check_write(id)?;
        self.recipes.lock().remove(id);
        Ok(())
    }

    async fn list_recipes(&self, user_id: &str) -> Result<Vec<SavedRecipe>> {
        self.check_pull()?;
        let mut recipes: Vec<_> = self
            .recipes
            .lock()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        recipes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(recipes)
    }
}

/// Settable connectivity oracle.
pub struct MockConnectivity {
    online: AtomicBool,
}

impl MockConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for MockConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Connectivity oracle whose probe parks until released, for holding a sync
/// cycle in flight at the connectivity gate.
#[derive(Default)]
pub struct GatedConnectivity {
    gate: tokio::sync::Notify,
    entered: AtomicBool,
}

impl GatedConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a probe has reached the gate.
    pub fn is_held(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Connectivity for GatedConnectivity {
    async fn is_online(&self) -> bool {
        self.entered.store(true, Ordering::SeqCst);
        self.gate.notified().await;
        true
    }
}

/// Records scheduled alerts by identifier, like the platform facility.
#[derive(Default)]
pub struct MockScheduler {
    scheduled: Mutex<HashMap<String, ExpirationAlert>>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.scheduled.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn get(&self, id: &str) -> Option<ExpirationAlert> {
        self.scheduled.lock().get(id).cloned()
    }
}

#[async_trait]
impl NotificationScheduler for MockScheduler {
    async fn schedule_at(&self, alert: &ExpirationAlert) -> Result<()> {
        self.scheduled.lock().insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.scheduled.lock().remove(id);
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<String>> {
        Ok(self.scheduled.lock().keys().cloned().collect())
    }
}
