//! Startup loading of menu items from a JSON file.

use std::path::Path;

use common::MenuItemId;
use domain::{Category, MenuError, MenuItem, Money};
use serde::Deserialize;
use store::{InventoryLedger, StoreError};
use thiserror::Error;

/// Errors raised while loading a menu seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read menu seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse menu seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid menu item '{name}': {source}")]
    Invalid { name: String, source: MenuError },

    #[error("Failed to store menu item: {0}")]
    Store(#[from] StoreError),
}

/// One entry of the seed file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMenuItem {
    pub id: Option<MenuItemId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: Option<String>,
    pub image: Option<String>,
    pub is_available: Option<bool>,
}

impl SeedMenuItem {
    fn into_menu_item(self) -> Result<MenuItem, SeedError> {
        let invalid = |source: MenuError| SeedError::Invalid {
            name: self.name.clone(),
            source,
        };

        let category = match self.category.as_deref() {
            Some(raw) => raw.parse().map_err(invalid)?,
            None => Category::Lunch,
        };

        let mut item = MenuItem::new(
            self.name.clone(),
            self.description.clone(),
            Money::from_cents(self.price_cents),
            self.stock,
            category,
        )
        .map_err(invalid)?;

        if let Some(id) = self.id {
            item = item.with_id(id);
        }
        if let Some(image) = self.image.filter(|i| !i.trim().is_empty()) {
            item = item.with_image(image);
        }
        if let Some(is_available) = self.is_available {
            item = item.with_availability(is_available);
        }
        Ok(item)
    }
}

/// Parses seed entries from JSON text.
pub fn parse_menu_seed(json: &str) -> Result<Vec<MenuItem>, SeedError> {
    let entries: Vec<SeedMenuItem> = serde_json::from_str(json)?;
    entries
        .into_iter()
        .map(SeedMenuItem::into_menu_item)
        .collect()
}

/// Loads every item of the seed file at `path` into the ledger.
///
/// Items are upserted, so re-running against a database keeps ids stable
/// for entries that carry one. Returns the number of items written.
pub async fn seed_menu_from_file<L: InventoryLedger>(
    ledger: &L,
    path: &Path,
) -> Result<usize, SeedError> {
    let json = tokio::fs::read_to_string(path).await?;
    let items = parse_menu_seed(&json)?;
    let count = items.len();

    for item in items {
        tracing::debug!(menu_item_id = %item.id, name = %item.name, "seeding menu item");
        ledger.upsert_menu_item(item).await?;
    }

    tracing::info!(path = %path.display(), count, "menu seeded");
    Ok(count)
}
