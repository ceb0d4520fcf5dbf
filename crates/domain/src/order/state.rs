//! Order status state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Confirmed ──► Preparing ──► Ready ──► PickedUp
///    │            │             │           │
///    ├────────────┴─────────────┴───────────┴──► Cancelled
///    └────────────┴──► Expired (sweeper only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, stock held until the expiry deadline.
    #[default]
    Pending,

    /// Accepted by staff; still inside the hold window.
    Confirmed,

    /// The kitchen has started on the order.
    Preparing,

    /// Waiting at the counter.
    Ready,

    /// Collected by the customer (terminal state).
    PickedUp,

    /// Cancelled by the customer or staff (terminal state).
    Cancelled,

    /// Hold deadline passed before fulfillment (terminal state).
    Expired,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::PickedUp,
        OrderStatus::Cancelled,
        OrderStatus::Expired,
    ];

    /// Statuses the expiry sweep may move to `Expired`.
    pub const EXPIRABLE: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Confirmed];

    /// Statuses from which a cancellation is accepted.
    pub const CANCELLABLE: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ];

    /// Statuses whose totals count as revenue.
    pub const REVENUE: [OrderStatus; 2] = [OrderStatus::Ready, OrderStatus::PickedUp];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::PickedUp | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    /// Returns true if the expiry sweep applies to this status.
    pub fn can_expire(&self) -> bool {
        Self::EXPIRABLE.contains(self)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        Self::CANCELLABLE.contains(self)
    }

    /// Returns true if the kitchen may already have consumed the stock.
    pub fn is_in_fulfillment(&self) -> bool {
        matches!(self, OrderStatus::Preparing | OrderStatus::Ready)
    }

    /// Returns true if clients may request this status directly.
    pub fn is_client_settable(&self) -> bool {
        !matches!(self, OrderStatus::Expired)
    }

    pub fn counts_as_revenue(&self) -> bool {
        Self::REVENUE.contains(self)
    }

    /// Position on the forward fulfillment path, if the status is on it.
    fn forward_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Ready => Some(3),
            OrderStatus::PickedUp => Some(4),
            OrderStatus::Cancelled | OrderStatus::Expired => None,
        }
    }

    /// Returns true if `target` is strictly further along the forward path.
    ///
    /// Skipping intermediate steps is allowed; moving backwards is not.
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.forward_rank(), target.forward_rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    /// Validates a client-requested move to `target`.
    ///
    /// Cancellation is validated separately because it also decides restock.
    pub fn validate_advance(&self, target: OrderStatus) -> Result<(), OrderError> {
        if !target.is_client_settable() {
            return Err(OrderError::StatusNotSettable { status: target });
        }
        if !self.can_advance_to(target) {
            return Err(OrderError::InvalidTransition {
                from: *self,
                to: target,
            });
        }
        Ok(())
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}
