//! The order lifecycle engine.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use common::{MenuItemId, OrderId};
use domain::{
    Category, CreateOrder, MenuItem, MenuItemSummary, Order, OrderDetails, OrderError, OrderLine,
    OrderNumber, OrderStats, OrderStatus,
};
use store::{
    InventoryLedger, InventoryLedgerExt, MenuQuery, OrderQuery, OrderStore, StatusChange,
    StoreError,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::reservation::{Reservation, restock};
use crate::sweeper::ExpirySweeper;

/// Coordinates order creation, status changes, cancellation and stock.
///
/// The engine owns no state of its own. Stock consistency comes from the
/// ledger's atomic reserve/release and from the order store's status
/// compare-and-set, so any number of engine clones may run concurrently.
#[derive(Clone)]
pub struct OrderEngine<L, O> {
    ledger: L,
    orders: O,
    config: EngineConfig,
}

impl<L, O> OrderEngine<L, O>
where
    L: InventoryLedger,
    O: OrderStore,
{
    /// Creates an engine with the default configuration.
    pub fn new(ledger: L, orders: O) -> Self {
        Self::with_config(ledger, orders, EngineConfig::default())
    }

    pub fn with_config(ledger: L, orders: O, config: EngineConfig) -> Self {
        Self {
            ledger,
            orders,
            config,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Places a new order.
    ///
    /// Input is validated before anything is touched. Each line then takes
    /// its stock with one atomic reserve-or-fail; if any line fails, or the
    /// order cannot be stored, everything already taken is given back and no
    /// order exists afterwards.
    #[tracing::instrument(skip(self, command), fields(customer_phone = %command.customer_phone))]
    pub async fn create_order(&self, command: CreateOrder) -> Result<OrderDetails> {
        self.create_order_at(command, Utc::now()).await
    }

    /// Places a new order as if the current time were `now`.
    pub async fn create_order_at(
        &self,
        command: CreateOrder,
        now: DateTime<Utc>,
    ) -> Result<OrderDetails> {
        let command = command
            .validated(now)
            .map_err(|e| Self::rejected(EngineError::from(e)))?;

        let mut reservation = Reservation::new(&self.ledger);
        let mut lines = Vec::with_capacity(command.lines.len());

        for request in &command.lines {
            match reservation.take(request.menu_item_id, request.quantity).await {
                Ok(item) => lines.push(OrderLine::snapshot(&item, request.quantity)),
                Err(e) => {
                    reservation.roll_back().await;
                    return Err(Self::rejected(EngineError::from(e)));
                }
            }
        }

        let order = match self.insert_with_fresh_number(lines, &command, now).await {
            Ok(order) => order,
            Err(e) => {
                reservation.roll_back().await;
                return Err(Self::rejected(e));
            }
        };
        reservation.commit();

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_number = %order.order_number(),
            total = %order.total_amount(),
            lines = order.items().len(),
            "order created"
        );

        self.with_catalog(order).await
    }

    async fn insert_with_fresh_number(
        &self,
        lines: Vec<OrderLine>,
        command: &CreateOrder,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let attempts = self.config.order_number_attempts.max(1);
        let mut order = Order::place(
            OrderNumber::generate(now),
            lines,
            command,
            now,
            self.config.hold,
        );

        let mut attempt = 1;
        loop {
            match self.orders.insert_order(order.clone()).await {
                Ok(()) => return Ok(order),
                Err(StoreError::DuplicateOrderNumber(number)) if attempt < attempts => {
                    tracing::warn!(%number, attempt, "order number collision, retrying");
                    attempt += 1;
                    let mut fresh = OrderNumber::generate(now);
                    while fresh == number {
                        fresh = OrderNumber::generate(now);
                    }
                    order.renumber(fresh);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn rejected(err: EngineError) -> EngineError {
        metrics::counter!("order_creation_rejected_total", "reason" => err.kind()).increment(1);
        if err.is_client_error() {
            tracing::info!(reason = err.kind(), error = %err, "order rejected");
        } else {
            tracing::error!(error = %err, "order creation failed");
        }
        err
    }

    /// Gets an order joined with the current catalog.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<OrderDetails> {
        let order = self.load(id).await?;
        self.with_catalog(order).await
    }

    /// Gets an order by its human-readable number.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_number(&self, number: &OrderNumber) -> Result<OrderDetails> {
        let order = self
            .orders
            .get_order_by_number(number)
            .await?
            .ok_or_else(|| EngineError::OrderNumberNotFound(number.clone()))?;
        self.with_catalog(order).await
    }

    /// Lists orders newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<OrderDetails>> {
        let orders = self.orders.list_orders(query).await?;
        self.with_catalogs(orders).await
    }

    /// Lists one customer's orders newest first.
    pub async fn list_orders_by_customer_phone(&self, phone: &str) -> Result<Vec<OrderDetails>> {
        self.list_orders(OrderQuery::for_customer_phone(phone.trim()))
            .await
    }

    /// Moves an order to `target`.
    ///
    /// Setting `cancelled` runs the same path as [`OrderEngine::cancel_order`] so the
    /// stock is handled the same way. Setting the status an order already
    /// has returns it unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<OrderDetails> {
        if target == OrderStatus::Cancelled {
            let change = self.cancel(id).await?;
            return self.with_catalog(change.current).await;
        }

        if !target.is_client_settable() {
            return Err(OrderError::StatusNotSettable { status: target }.into());
        }

        loop {
            let order = self.load(id).await?;
            let current = order.status();
            if current == target {
                return self.with_catalog(order).await;
            }
            current.validate_advance(target)?;

            match self
                .orders
                .transition_status(id, &[current], target, Utc::now())
                .await
            {
                Ok(change) => {
                    metrics::counter!("order_status_updates_total", "status" => target.as_str())
                        .increment(1);
                    tracing::info!(
                        order_number = %change.current.order_number(),
                        from = %current,
                        to = %target,
                        "order status updated"
                    );
                    return self.with_catalog(change.current).await;
                }
                Err(StoreError::StatusConflict { actual, .. }) => {
                    tracing::debug!(%actual, "order status changed concurrently, re-checking");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Cancels an order and returns it as it was before the cancellation,
    /// for confirmation display.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<OrderDetails> {
        let change = self.cancel(id).await?;
        self.with_catalog(change.previous).await
    }

    async fn cancel(&self, id: OrderId) -> Result<StatusChange> {
        let change = match self
            .orders
            .transition_status(
                id,
                &OrderStatus::CANCELLABLE,
                OrderStatus::Cancelled,
                Utc::now(),
            )
            .await
        {
            Ok(change) => change,
            Err(StoreError::StatusConflict { actual, .. }) => {
                return Err(self.already_terminal(id, actual).await);
            }
            Err(e) => return Err(e.into()),
        };

        let previous_status = change.previous.status();
        let restocked = self.config.restock_policy.restocks(previous_status);
        let release_failures = if restocked {
            restock(&self.ledger, &change.previous).await
        } else {
            0
        };

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(
            order_number = %change.previous.order_number(),
            %previous_status,
            restocked,
            release_failures,
            "order cancelled"
        );

        Ok(change)
    }

    async fn already_terminal(&self, id: OrderId, status: OrderStatus) -> EngineError {
        match self.orders.get_order(id).await {
            Ok(Some(order)) => EngineError::AlreadyTerminal {
                order_number: order.order_number().clone(),
                status,
            },
            Ok(None) => EngineError::OrderNotFound(id),
            Err(e) => e.into(),
        }
    }

    /// Per-status counts and totals, plus revenue over ready and picked up orders.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_stats(&self) -> Result<OrderStats> {
        Ok(self.orders.stats().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_menu_item(&self, id: MenuItemId) -> Result<MenuItem> {
        self.ledger
            .get_menu_item(id)
            .await?
            .ok_or(EngineError::MenuItemNotFound(id))
    }

    pub async fn list_menu_items(&self, query: MenuQuery) -> Result<Vec<MenuItem>> {
        Ok(self.ledger.list_menu_items(query).await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.ledger.list_categories().await?)
    }

    /// Applies a signed stock change: negative takes stock, positive gives it back.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(&self, id: MenuItemId, delta: i64) -> Result<MenuItem> {
        let item = self.ledger.adjust_stock(id, delta).await?;
        tracing::info!(menu_item_id = %id, delta, stock = item.stock, "stock adjusted");
        Ok(item)
    }

    async fn load(&self, id: OrderId) -> Result<Order> {
        self.orders
            .get_order(id)
            .await?
            .ok_or(EngineError::OrderNotFound(id))
    }

    async fn with_catalog(&self, order: Order) -> Result<OrderDetails> {
        let mut details = self.with_catalogs(vec![order]).await?;
        details
            .pop()
            .ok_or_else(|| EngineError::Internal(StoreError::Corrupt("order vanished".into())))
    }

    async fn with_catalogs(&self, orders: Vec<Order>) -> Result<Vec<OrderDetails>> {
        let ids: Vec<MenuItemId> = orders
            .iter()
            .flat_map(|order| order.items().iter().map(|line| line.menu_item_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let catalog: HashMap<MenuItemId, MenuItemSummary> = self
            .ledger
            .get_menu_items(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item.summary()))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let own = order
                    .items()
                    .iter()
                    .filter_map(|line| {
                        catalog
                            .get(&line.menu_item_id)
                            .map(|summary| (line.menu_item_id, summary.clone()))
                    })
                    .collect();
                OrderDetails::new(order, own)
            })
            .collect())
    }
}

impl<L, O> OrderEngine<L, O>
where
    L: InventoryLedger + Clone,
    O: OrderStore + Clone,
{
    /// Builds an expiry sweeper over the same ledger and order store.
    pub fn sweeper(&self) -> ExpirySweeper<L, O> {
        ExpirySweeper::new(self.ledger.clone(), self.orders.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::{Money, OrderLineRequest};
    use store::{InMemoryInventoryLedger, InMemoryOrderStore};

    type TestEngine = OrderEngine<InMemoryInventoryLedger, InMemoryOrderStore>;

    fn engine_with(items: Vec<MenuItem>) -> TestEngine {
        OrderEngine::new(
            InMemoryInventoryLedger::with_items(items),
            InMemoryOrderStore::new(),
        )
    }

    fn item(name: &str, cents: i64, stock: u32) -> MenuItem {
        MenuItem::new(name, "fresh", Money::from_cents(cents), stock, Category::Lunch).unwrap()
    }

    fn command(lines: Vec<OrderLineRequest>) -> CreateOrder {
        CreateOrder::new(lines, "Kavya", "555-0142", Utc::now() + Duration::minutes(30))
    }

    #[tokio::test]
    async fn create_order_snapshots_lines_and_joins_catalog() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);

        let details = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 2)]))
            .await
            .unwrap();

        assert_eq!(details.order.status(), OrderStatus::Pending);
        assert_eq!(details.order.total_amount(), Money::from_cents(2400));
        assert_eq!(details.order.items()[0].name, "Veg Thali");
        assert_eq!(
            details.order.expires_at(),
            details.order.created_at() + Duration::minutes(15)
        );
        let (_, summary) = details.lines().next().unwrap();
        assert_eq!(summary.unwrap().name, "Veg Thali");
        assert_eq!(engine.ledger().stock_of(thali.id).await, Some(2));
    }

    #[tokio::test]
    async fn validation_failure_touches_nothing() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);

        let result = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 0)]))
            .await;

        assert!(matches!(
            result,
            Err(EngineError::Validation(OrderError::InvalidQuantity { .. }))
        ));
        assert_eq!(engine.ledger().stock_of(thali.id).await, Some(4));
        assert_eq!(engine.orders().order_count().await, 0);
    }

    #[tokio::test]
    async fn failing_line_rolls_back_earlier_lines() {
        let thali = item("Veg Thali", 1200, 4);
        let lassi = item("Lassi", 300, 1);
        let engine = engine_with(vec![thali.clone(), lassi.clone()]);

        let result = engine
            .create_order(command(vec![
                OrderLineRequest::new(thali.id, 3),
                OrderLineRequest::new(lassi.id, 2),
            ]))
            .await;

        assert!(matches!(
            result,
            Err(EngineError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            })
        ));
        assert_eq!(engine.ledger().stock_of(thali.id).await, Some(4));
        assert_eq!(engine.ledger().stock_of(lassi.id).await, Some(1));
        assert_eq!(engine.orders().order_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_and_unavailable_items_are_rejected() {
        let off = item("Soup", 300, 10).with_availability(false);
        let engine = engine_with(vec![off.clone()]);

        let result = engine
            .create_order(command(vec![OrderLineRequest::new(off.id, 1)]))
            .await;
        assert!(matches!(result, Err(EngineError::ItemUnavailable { .. })));

        let missing = MenuItemId::new();
        let result = engine
            .create_order(command(vec![OrderLineRequest::new(missing, 1)]))
            .await;
        assert!(matches!(result, Err(EngineError::MenuItemNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn store_failure_releases_reserved_stock() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);
        engine.orders().set_fail_on_insert(true).await;

        let result = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 2)]))
            .await;

        assert!(matches!(result, Err(EngineError::Internal(_))));
        assert_eq!(engine.ledger().stock_of(thali.id).await, Some(4));
    }

    #[tokio::test]
    async fn duplicate_ids_reserve_as_separate_lines() {
        let vada = item("Vada", 150, 3);
        let engine = engine_with(vec![vada.clone()]);

        let details = engine
            .create_order(command(vec![
                OrderLineRequest::new(vada.id, 2),
                OrderLineRequest::new(vada.id, 1),
            ]))
            .await
            .unwrap();
        assert_eq!(details.order.items().len(), 2);
        assert_eq!(engine.ledger().stock_of(vada.id).await, Some(0));

        let result = engine
            .create_order(command(vec![
                OrderLineRequest::new(vada.id, 1),
                OrderLineRequest::new(vada.id, 1),
            ]))
            .await;
        assert!(matches!(result, Err(EngineError::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn update_status_moves_forward_only() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);
        let id = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 1)]))
            .await
            .unwrap()
            .order
            .id();

        let details = engine
            .update_order_status(id, OrderStatus::Preparing)
            .await
            .unwrap();
        assert_eq!(details.order.status(), OrderStatus::Preparing);

        let same = engine
            .update_order_status(id, OrderStatus::Preparing)
            .await
            .unwrap();
        assert_eq!(same.order.status(), OrderStatus::Preparing);

        let back = engine.update_order_status(id, OrderStatus::Confirmed).await;
        assert!(matches!(
            back,
            Err(EngineError::InvalidTransition {
                from: OrderStatus::Preparing,
                to: OrderStatus::Confirmed
            })
        ));

        let expired = engine.update_order_status(id, OrderStatus::Expired).await;
        assert!(matches!(
            expired,
            Err(EngineError::Validation(OrderError::StatusNotSettable { .. }))
        ));

        engine
            .update_order_status(id, OrderStatus::PickedUp)
            .await
            .unwrap();
        let out = engine.update_order_status(id, OrderStatus::Ready).await;
        assert!(matches!(out, Err(EngineError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn cancel_via_status_update_restocks() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);
        let id = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 3)]))
            .await
            .unwrap()
            .order
            .id();

        let details = engine
            .update_order_status(id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(details.order.status(), OrderStatus::Cancelled);
        assert_eq!(engine.ledger().stock_of(thali.id).await, Some(4));
    }

    #[tokio::test]
    async fn cancel_returns_previous_snapshot() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);
        let id = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 1)]))
            .await
            .unwrap()
            .order
            .id();
        engine
            .update_order_status(id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let previous = engine.cancel_order(id).await.unwrap();
        assert_eq!(previous.order.status(), OrderStatus::Confirmed);
        assert_eq!(previous.order.id(), id);

        let stored = engine.get_order(id).await.unwrap();
        assert_eq!(stored.order.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_through_status_update_returns_cancelled_order() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);
        let id = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 2)]))
            .await
            .unwrap()
            .order
            .id();

        let updated = engine
            .update_order_status(id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(updated.order.status(), OrderStatus::Cancelled);
        assert_eq!(engine.ledger().stock_of(thali.id).await, Some(4));
    }

    #[tokio::test]
    async fn before_preparation_policy_skips_restock() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = OrderEngine::with_config(
            InMemoryInventoryLedger::with_items([thali.clone()]),
            InMemoryOrderStore::new(),
            EngineConfig::default().with_restock_policy(crate::RestockPolicy::BeforePreparation),
        );

        let early = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 1)]))
            .await
            .unwrap()
            .order
            .id();
        let late = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 2)]))
            .await
            .unwrap()
            .order
            .id();
        engine
            .update_order_status(late, OrderStatus::Preparing)
            .await
            .unwrap();

        engine.cancel_order(early).await.unwrap();
        engine.cancel_order(late).await.unwrap();

        assert_eq!(engine.ledger().stock_of(thali.id).await, Some(2));
    }

    #[tokio::test]
    async fn missing_orders_are_reported() {
        let engine = engine_with(vec![]);
        let id = OrderId::new();

        assert!(matches!(
            engine.get_order(id).await,
            Err(EngineError::OrderNotFound(_))
        ));
        assert!(matches!(
            engine.cancel_order(id).await,
            Err(EngineError::OrderNotFound(_))
        ));
        assert!(matches!(
            engine
                .get_order_by_number(&OrderNumber::new("ORD-00000000-000"))
                .await,
            Err(EngineError::OrderNumberNotFound(_))
        ));
    }

    #[tokio::test]
    async fn catalog_join_tolerates_removed_items() {
        let thali = item("Veg Thali", 1200, 4);
        let engine = engine_with(vec![thali.clone()]);
        let id = engine
            .create_order(command(vec![OrderLineRequest::new(thali.id, 1)]))
            .await
            .unwrap()
            .order
            .id();

        engine.ledger().remove(thali.id).await;

        let details = engine.get_order(id).await.unwrap();
        let (line, summary) = details.lines().next().unwrap();
        assert_eq!(line.name, "Veg Thali");
        assert!(summary.is_none());
    }
}
