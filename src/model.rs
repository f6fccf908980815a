//! Domain Entities
//!
//! The three locally owned collections (inventory items, shopping lists,
//! saved recipes), their ownership tags, and the field-level patch structs
//! used by [`crate::state::AppState`] mutations. Validation happens here, at
//! the entry point, so invalid data never reaches the store or the queue.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

/// Who may mutate an entity: just its owner, or any household member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Personal,
    Household,
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ownership::Personal => write!(f, "personal"),
            Ownership::Household => write!(f, "household"),
        }
    }
}

/// Physical location of a perishable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StorageLocation {
    Fridge,
    Pantry,
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageLocation::Fridge => write!(f, "fridge"),
            StorageLocation::Pantry => write!(f, "pantry"),
        }
    }
}

/// A perishable item tracked in the fridge or pantry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub user_id: String,
    pub household_id: Option<String>,
    pub ownership: Ownership,
    pub name: String,
    /// Always strictly positive; zero or negative is rejected at entry.
    pub quantity: f64,
    pub unit: String,
    pub location: StorageLocation,
    pub expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Create a validated personal item owned by `user_id`.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        location: StorageLocation,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name(&name)?;
        validate_quantity(quantity)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            household_id: None,
            ownership: Ownership::Personal,
            name,
            quantity,
            unit: unit.into(),
            location,
            expires_on: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Tag the item as shared within a household.
    pub fn with_household(mut self, household_id: impl Into<String>) -> Self {
        self.household_id = Some(household_id.into());
        self.ownership = Ownership::Household;
        self
    }

    /// Set the expiration date.
    pub fn with_expiration(mut self, date: NaiveDate) -> Self {
        self.expires_on = Some(date);
        self
    }
}

/// Field-level update for an inventory item. Each `Some` field is applied;
/// `expires_on` uses a nested Option so the date can be cleared explicitly.
#[derive(Debug, Clone, Default)]
pub struct InventoryItemPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub location: Option<StorageLocation>,
    pub expires_on: Option<Option<NaiveDate>>,
}

impl InventoryItemPatch {
    /// Apply the patch in place, validating before any field is touched.
    pub fn apply(&self, item: &mut InventoryItem) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }

        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = &self.unit {
            item.unit = unit.clone();
        }
        if let Some(location) = self.location {
            item.location = location;
        }
        if let Some(expires_on) = self.expires_on {
            item.expires_on = expires_on;
        }
        item.updated_at = Utc::now();
        Ok(())
    }
}

/// One line on a shopping list. Owned exclusively by its parent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub checked: bool,
    /// Recipe in the external catalog this line came from, if any.
    pub recipe_id: Option<u64>,
}

impl ShoppingListItem {
    pub fn new(
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name(&name)?;
        validate_quantity(quantity)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            quantity,
            unit: unit.into(),
            checked: false,
            recipe_id: None,
        })
    }

    pub fn from_recipe(mut self, recipe_id: u64) -> Self {
        self.recipe_id = Some(recipe_id);
        self
    }
}

/// A shopping list. The whole list is the unit of sync: any mutation to its
/// items enqueues an update carrying the full list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: String,
    pub user_id: String,
    pub household_id: Option<String>,
    pub ownership: Ownership,
    pub name: String,
    /// Insertion order is display order.
    pub items: Vec<ShoppingListItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingList {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name(&name)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            household_id: None,
            ownership: Ownership::Personal,
            name,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_household(mut self, household_id: impl Into<String>) -> Self {
        self.household_id = Some(household_id.into());
        self.ownership = Ownership::Household;
        self
    }
}

/// Field-level update for a shopping list.
#[derive(Debug, Clone, Default)]
pub struct ShoppingListPatch {
    pub name: Option<String>,
    /// Full replacement of the item sequence (whole-list sync unit).
    pub items: Option<Vec<ShoppingListItem>>,
}

impl ShoppingListPatch {
    /// Apply the patch in place, validating before any field is touched.
    /// Replacement items are re-validated: `ShoppingListItem` fields are
    /// public, so the lines may have been edited after construction.
    pub fn apply(&self, list: &mut ShoppingList) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(items) = &self.items {
            for item in items {
                validate_name(&item.name)?;
                validate_quantity(item.quantity)?;
            }
        }
        if let Some(name) = &self.name {
            list.name = name.clone();
        }
        if let Some(items) = &self.items {
            list.items = items.clone();
        }
        list.updated_at = Utc::now();
        Ok(())
    }
}

/// A recipe the user bookmarked from the external catalog. The snapshot
/// fields are captured at save time and never re-fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecipe {
    pub id: String,
    pub user_id: String,
    /// Key into the third-party recipe catalog; not locally owned.
    pub recipe_id: u64,
    pub title: String,
    pub image_url: Option<String>,
    pub ready_in_minutes: Option<u32>,
    pub servings: Option<u32>,
    pub saved_at: DateTime<Utc>,
}

impl SavedRecipe {
    pub fn new(
        user_id: impl Into<String>,
        recipe_id: u64,
        title: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        validate_name(&title)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            recipe_id,
            title,
            image_url: None,
            ready_in_minutes: None,
            servings: None,
            saved_at: Utc::now(),
        })
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

fn validate_quantity(quantity: f64) -> Result<(), ValidationError> {
    if !(quantity > 0.0) {
        return Err(ValidationError::NonPositiveQuantity { quantity });
    }
    Ok(())
}
