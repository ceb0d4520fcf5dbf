use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderNumber, OrderStats, OrderStatus};

use crate::{OrderQuery, Result};

/// The outcome of a successful status compare-and-set.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// The order exactly as it was before the change.
    pub previous: Order,
    /// The order as stored after the change.
    pub current: Order,
}

/// Core trait for order store implementations.
///
/// The order store is the source of truth for order documents and their
/// status. Orders are inserted once and afterwards only their status and
/// update timestamp change; nothing is ever deleted.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order.
    ///
    /// Fails with `DuplicateOrderNumber` if another order already carries the
    /// same order number; nothing is written in that case.
    async fn insert_order(&self, order: Order) -> Result<()>;

    /// Retrieves an order by id.
    ///
    /// Returns None if the order doesn't exist.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Retrieves an order by its human-readable number.
    async fn get_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>>;

    /// Lists orders matching a query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Atomically moves an order to `to` if its current status is one of `from`.
    ///
    /// The status check and the write happen as one unit, so two concurrent
    /// callers cannot both move the same order out of the same status.
    /// Fails with `OrderNotFound` or `StatusConflict`.
    async fn transition_status(
        &self,
        id: OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange>;

    /// Returns orders in an expirable status whose deadline is strictly before `now`.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Order>>;

    /// Computes per-status counts and totals over all orders.
    async fn stats(&self) -> Result<OrderStats>;
}
