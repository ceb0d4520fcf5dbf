use async_trait::async_trait;
use common::MenuItemId;
use domain::{Category, MenuItem};

use crate::{MenuQuery, Result, StoreError};

/// Core trait for inventory ledger implementations.
///
/// The ledger owns menu items and their stock counts. Every stock mutation
/// for one item goes through the same atomic section, so concurrent
/// `reserve` and `release` calls never expose a negative count.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Retrieves a menu item.
    ///
    /// Returns None if the item doesn't exist.
    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>>;

    /// Retrieves several menu items at once. Missing ids are skipped.
    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>>;

    /// Lists menu items matching a query, sorted by category then name.
    async fn list_menu_items(&self, query: MenuQuery) -> Result<Vec<MenuItem>>;

    /// Inserts a menu item, replacing any item with the same id.
    async fn upsert_menu_item(&self, item: MenuItem) -> Result<()>;

    /// Atomically takes `quantity` units of an item.
    ///
    /// Succeeds only if the item exists, is available and has at least
    /// `quantity` in stock; otherwise fails with `MenuItemNotFound`,
    /// `ItemUnavailable` or `InsufficientStock` without changing anything.
    /// Returns the item as it is after the decrement.
    async fn reserve(&self, id: MenuItemId, quantity: u32) -> Result<MenuItem>;

    /// Atomically gives `quantity` units back to an item.
    ///
    /// Works regardless of availability. Fails with `MenuItemNotFound` if the
    /// item has been removed from the ledger.
    async fn release(&self, id: MenuItemId, quantity: u32) -> Result<MenuItem>;
}

/// Extension trait providing convenience methods for ledgers.
#[async_trait]
pub trait InventoryLedgerExt: InventoryLedger {
    /// Applies a signed stock change: negative reserves, positive releases.
    async fn adjust_stock(&self, id: MenuItemId, delta: i64) -> Result<MenuItem> {
        let quantity = u32::try_from(delta.unsigned_abs()).map_err(|_| {
            StoreError::Corrupt(format!("stock adjustment {delta} is out of range"))
        })?;

        if delta < 0 {
            self.reserve(id, quantity).await
        } else if delta > 0 {
            self.release(id, quantity).await
        } else {
            self.get_menu_item(id)
                .await?
                .ok_or(StoreError::MenuItemNotFound(id))
        }
    }

    /// Returns the distinct categories present in the ledger, sorted.
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .list_menu_items(MenuQuery::new())
            .await?
            .into_iter()
            .map(|item| item.category)
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

// Blanket implementation for all InventoryLedger implementations
impl<T: InventoryLedger + ?Sized> InventoryLedgerExt for T {}
