use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{MenuItemId, OrderId};
use domain::{MenuItem, Order, OrderNumber, OrderStats, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    InventoryLedger, MenuQuery, OrderQuery, OrderStore, Result, StatusChange, StoreError,
};

/// In-memory inventory ledger.
///
/// Every stock mutation runs under the map's write lock, which makes each
/// check-and-decrement a single critical section.
#[derive(Clone, Default)]
pub struct InMemoryInventoryLedger {
    items: Arc<RwLock<HashMap<MenuItemId, MenuItem>>>,
}

impl InMemoryInventoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-loaded with `items`.
    pub fn with_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let items = items.into_iter().map(|item| (item.id, item)).collect();
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// Returns the current stock of an item, if it exists.
    pub async fn stock_of(&self, id: MenuItemId) -> Option<u32> {
        self.items.read().await.get(&id).map(|item| item.stock)
    }

    /// Removes an item from the ledger entirely.
    pub async fn remove(&self, id: MenuItemId) -> Option<MenuItem> {
        self.items.write().await.remove(&id)
    }

    /// Returns the number of items in the ledger.
    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>> {
        let items = self.items.read().await;
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn list_menu_items(&self, query: MenuQuery) -> Result<Vec<MenuItem>> {
        let items = self.items.read().await;
        let mut matching: Vec<_> = items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
        Ok(matching)
    }

    async fn upsert_menu_item(&self, item: MenuItem) -> Result<()> {
        self.items.write().await.insert(item.id, item);
        Ok(())
    }

    async fn reserve(&self, id: MenuItemId, quantity: u32) -> Result<MenuItem> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or(StoreError::MenuItemNotFound(id))?;

        item.check_reservable(quantity)
            .map_err(|e| StoreError::from_menu(id, e))?;

        item.stock -= quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn release(&self, id: MenuItemId, quantity: u32) -> Result<MenuItem> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or(StoreError::MenuItemNotFound(id))?;

        item.stock = item.stock.checked_add(quantity).ok_or_else(|| {
            StoreError::Corrupt(format!("stock overflow releasing {quantity} of {id}"))
        })?;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    by_number: HashMap<OrderNumber, OrderId>,
    fail_on_insert: bool,
}

/// In-memory order store.
///
/// Status changes run under the write lock, so the status check and the
/// write are one unit.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every insert with a database error.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().await.fail_on_insert = fail;
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_insert {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        if state.by_number.contains_key(order.order_number()) {
            return Err(StoreError::DuplicateOrderNumber(
                order.order_number().clone(),
            ));
        }

        state
            .by_number
            .insert(order.order_number().clone(), order.id());
        state.orders.insert(order.id(), order);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn get_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .by_number
            .get(number)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if !from.contains(&order.status()) {
            return Err(StoreError::StatusConflict {
                order_id: id,
                actual: order.status(),
            });
        }

        let previous = order.clone();
        order.apply_status(to, at);

        Ok(StatusChange {
            previous,
            current: order.clone(),
        })
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut expired: Vec<_> = state
            .orders
            .values()
            .filter(|order| order.is_expired_at(now))
            .cloned()
            .collect();
        expired.sort_by_key(|order| order.expires_at());
        Ok(expired)
    }

    async fn stats(&self) -> Result<OrderStats> {
        let state = self.state.read().await;
        Ok(OrderStats::from_orders(state.orders.values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::{Category, CreateOrder, Money, OrderLine, OrderLineRequest};

    fn menu_item(name: &str, stock: u32) -> MenuItem {
        MenuItem::new(name, "test item", Money::from_cents(500), stock, Category::Lunch).unwrap()
    }

    fn order_at(created: DateTime<Utc>, phone: &str, suffix: u16) -> Order {
        let item_id = MenuItemId::new();
        let cmd = CreateOrder::new(
            vec![OrderLineRequest::new(item_id, 1)],
            "Meera",
            phone,
            created + Duration::minutes(30),
        );
        Order::place(
            OrderNumber::from_parts(created.timestamp_millis(), suffix),
            vec![OrderLine::new(item_id, "Thali", Money::from_cents(900), 1)],
            &cmd,
            created,
            Duration::minutes(15),
        )
    }

    #[tokio::test]
    async fn reserve_decrements_stock() {
        let item = menu_item("Biryani", 3);
        let ledger = InMemoryInventoryLedger::with_items([item.clone()]);

        let updated = ledger.reserve(item.id, 2).await.unwrap();
        assert_eq!(updated.stock, 1);
        assert_eq!(ledger.stock_of(item.id).await, Some(1));
    }

    #[tokio::test]
    async fn reserve_fails_without_mutation() {
        let item = menu_item("Biryani", 1);
        let off = menu_item("Soup", 5).with_availability(false);
        let ledger = InMemoryInventoryLedger::with_items([item.clone(), off.clone()]);

        let result = ledger.reserve(item.id, 2).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            })
        ));
        assert_eq!(ledger.stock_of(item.id).await, Some(1));

        let result = ledger.reserve(off.id, 1).await;
        assert!(matches!(result, Err(StoreError::ItemUnavailable { .. })));
        assert_eq!(ledger.stock_of(off.id).await, Some(5));

        let result = ledger.reserve(MenuItemId::new(), 1).await;
        assert!(matches!(result, Err(StoreError::MenuItemNotFound(_))));
    }

    #[tokio::test]
    async fn release_works_on_unavailable_items() {
        let off = menu_item("Soup", 0).with_availability(false);
        let ledger = InMemoryInventoryLedger::with_items([off.clone()]);

        let updated = ledger.release(off.id, 4).await.unwrap();
        assert_eq!(updated.stock, 4);
    }

    #[tokio::test]
    async fn release_of_removed_item_fails() {
        let item = menu_item("Soup", 0);
        let ledger = InMemoryInventoryLedger::with_items([item.clone()]);
        ledger.remove(item.id).await;

        let result = ledger.release(item.id, 1).await;
        assert!(matches!(result, Err(StoreError::MenuItemNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_never_oversell() {
        let item = menu_item("Last Samosa", 5);
        let ledger = InMemoryInventoryLedger::with_items([item.clone()]);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.reserve(item.id, 1).await })
            })
            .collect();

        let results = futures_util::future::join_all(tasks).await;
        let succeeded = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();

        assert_eq!(succeeded, 5);
        assert_eq!(ledger.stock_of(item.id).await, Some(0));
    }

    #[tokio::test]
    async fn list_menu_items_sorted_by_category_then_name() {
        let ledger = InMemoryInventoryLedger::new();
        for (name, category) in [
            ("Wrap", Category::Lunch),
            ("Coffee", Category::Beverages),
            ("Omelette", Category::Breakfast),
            ("Curry", Category::Lunch),
        ] {
            let item = MenuItem::new(name, "x", Money::from_cents(100), 1, category).unwrap();
            ledger.upsert_menu_item(item).await.unwrap();
        }

        let names: Vec<_> = ledger
            .list_menu_items(MenuQuery::new())
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Omelette", "Curry", "Wrap", "Coffee"]);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_order_number() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();
        let first = order_at(now, "555-0001", 42);
        let mut second = order_at(now, "555-0002", 42);
        second.renumber(first.order_number().clone());

        store.insert_order(first).await.unwrap();
        let result = store.insert_order(second).await;
        assert!(matches!(result, Err(StoreError::DuplicateOrderNumber(_))));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn get_by_number_and_list_newest_first() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();
        let older = order_at(now - Duration::minutes(5), "555-0001", 1);
        let newer = order_at(now, "555-0001", 2);
        let other = order_at(now, "555-0009", 3);

        store.insert_order(older.clone()).await.unwrap();
        store.insert_order(newer.clone()).await.unwrap();
        store.insert_order(other).await.unwrap();

        let found = store
            .get_order_by_number(newer.order_number())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), newer.id());

        let mine = store
            .list_orders(OrderQuery::for_customer_phone("555-0001"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id(), newer.id());
        assert_eq!(mine[1].id(), older.id());
    }

    #[tokio::test]
    async fn transition_status_is_compare_and_set() {
        let store = InMemoryOrderStore::new();
        let order = order_at(Utc::now(), "555-0001", 1);
        store.insert_order(order.clone()).await.unwrap();

        let change = store
            .transition_status(
                order.id(),
                &OrderStatus::CANCELLABLE,
                OrderStatus::Cancelled,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(change.previous.status(), OrderStatus::Pending);
        assert_eq!(change.current.status(), OrderStatus::Cancelled);

        let again = store
            .transition_status(
                order.id(),
                &OrderStatus::CANCELLABLE,
                OrderStatus::Cancelled,
                Utc::now(),
            )
            .await;
        assert!(matches!(
            again,
            Err(StoreError::StatusConflict {
                actual: OrderStatus::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn find_expired_uses_strict_deadline() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();
        let stale = order_at(now - Duration::minutes(20), "555-0001", 1);
        let fresh = order_at(now, "555-0001", 2);
        store.insert_order(stale.clone()).await.unwrap();
        store.insert_order(fresh).await.unwrap();

        let expired = store.find_expired(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id(), stale.id());

        let at_deadline = store.find_expired(stale.expires_at()).await.unwrap();
        assert!(at_deadline.is_empty());
    }

    #[tokio::test]
    async fn fail_on_insert_injects_database_error() {
        let store = InMemoryOrderStore::new();
        store.set_fail_on_insert(true).await;

        let result = store.insert_order(order_at(Utc::now(), "555-0001", 1)).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.order_count().await, 0);
    }
}
