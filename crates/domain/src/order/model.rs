//! The order document.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use common::{MenuItemId, OrderId};
use serde::{Deserialize, Serialize};

use crate::menu::MenuItemSummary;
use crate::money::Money;

use super::{CreateOrder, OrderLine, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus};

/// A pickup order.
///
/// Orders are never deleted: cancellation and expiry are terminal statuses.
/// The order number, lines, total and expiry deadline are fixed at creation;
/// only the status and the update timestamp change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    items: Vec<OrderLine>,
    total_amount: Money,
    status: OrderStatus,
    customer_name: String,
    customer_phone: String,
    pickup_time: DateTime<Utc>,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Every stored field of an order, used to rehydrate one from storage.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub items: Vec<OrderLine>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_time: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new pending order from already-snapshotted lines.
    ///
    /// The total is computed here, and `expires_at` is set to `now + hold`.
    pub fn place(
        number: OrderNumber,
        lines: Vec<OrderLine>,
        command: &CreateOrder,
        now: DateTime<Utc>,
        hold: Duration,
    ) -> Self {
        let total_amount = lines.iter().map(|line| line.total_price).sum();

        Self {
            id: OrderId::new(),
            order_number: number,
            items: lines,
            total_amount,
            status: OrderStatus::Pending,
            customer_name: command.customer_name.clone(),
            customer_phone: command.customer_phone.clone(),
            pickup_time: command.pickup_time,
            payment_status: PaymentStatus::Pending,
            payment_method: command.payment_method,
            notes: command.notes.clone(),
            created_at: now,
            updated_at: now,
            expires_at: now + hold,
        }
    }

    /// Rehydrates an order exactly as it was stored.
    pub fn from_parts(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            order_number: parts.order_number,
            items: parts.items,
            total_amount: parts.total_amount,
            status: parts.status,
            customer_name: parts.customer_name,
            customer_phone: parts.customer_phone,
            pickup_time: parts.pickup_time,
            payment_status: parts.payment_status,
            payment_method: parts.payment_method,
            notes: parts.notes,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            expires_at: parts.expires_at,
        }
    }

    /// Gives a fresh number to an order that has not been stored yet.
    pub fn renumber(&mut self, number: OrderNumber) {
        self.order_number = number;
    }

    /// Writes a new status and bumps `updated_at`.
    ///
    /// This does not check the state machine; stores call it after their own
    /// atomic status check.
    pub fn apply_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    /// Returns the order lines in the order they were requested.
    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_phone(&self) -> &str {
        &self.customer_phone
    }

    pub fn pickup_time(&self) -> DateTime<Utc> {
        self.pickup_time
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if the hold deadline lies strictly before `now` and the
    /// status is still eligible for expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status.can_expire() && self.expires_at < now
    }

    /// Quantities to give back to the ledger, one entry per line.
    pub fn reserved_quantities(&self) -> impl Iterator<Item = (MenuItemId, u32)> + '_ {
        self.items
            .iter()
            .map(|line| (line.menu_item_id, line.quantity))
    }
}

/// An order joined with the current catalog entry of each line's menu item.
///
/// Lines whose menu item no longer exists simply have no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order: Order,
    pub catalog: HashMap<MenuItemId, MenuItemSummary>,
}

impl OrderDetails {
    pub fn new(order: Order, catalog: HashMap<MenuItemId, MenuItemSummary>) -> Self {
        Self { order, catalog }
    }

    /// Iterates lines paired with their catalog entry, if any.
    pub fn lines(&self) -> impl Iterator<Item = (&OrderLine, Option<&MenuItemSummary>)> {
        self.order
            .items()
            .iter()
            .map(|line| (line, self.catalog.get(&line.menu_item_id)))
    }
}
