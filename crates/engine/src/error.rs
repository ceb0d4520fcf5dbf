//! Engine error types.

use common::{MenuItemId, OrderId};
use domain::{OrderError, OrderNumber, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the order lifecycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// No order carries this number.
    #[error("Order not found: {0}")]
    OrderNumberNotFound(OrderNumber),

    /// Menu item not found.
    #[error("Menu item {0} not found")]
    MenuItemNotFound(MenuItemId),

    /// Malformed input, rejected before anything was changed.
    #[error(transparent)]
    Validation(OrderError),

    /// A line asked for more than the item has in stock.
    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: u32,
        requested: u32,
    },

    /// A line references an item that is switched off.
    #[error("{name} is not available")]
    ItemUnavailable { name: String },

    /// The order already reached a status that cannot be cancelled.
    #[error("Order {order_number} is already {status}")]
    AlreadyTerminal {
        order_number: OrderNumber,
        status: OrderStatus,
    },

    /// The requested status change is not allowed by the state machine.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A storage or ledger operation failed.
    #[error("Internal error: {0}")]
    Internal(StoreError),
}

impl EngineError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::OrderNotFound(_) | EngineError::OrderNumberNotFound(_) => "order_not_found",
            EngineError::MenuItemNotFound(_) => "menu_item_not_found",
            EngineError::Validation(_) => "validation",
            EngineError::InsufficientStock { .. } => "insufficient_stock",
            EngineError::ItemUnavailable { .. } => "item_unavailable",
            EngineError::AlreadyTerminal { .. } => "already_terminal",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::Internal(_) => "internal",
        }
    }

    /// Returns true for errors the caller caused, as opposed to internal failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::Internal(_))
    }
}

impl From<OrderError> for EngineError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, to } => {
                EngineError::InvalidTransition { from, to }
            }
            other => EngineError::Validation(other),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MenuItemNotFound(id) => EngineError::MenuItemNotFound(id),
            StoreError::ItemUnavailable { name, .. } => EngineError::ItemUnavailable { name },
            StoreError::InsufficientStock {
                name,
                available,
                requested,
                ..
            } => EngineError::InsufficientStock {
                name,
                available,
                requested,
            },
            StoreError::OrderNotFound(id) => EngineError::OrderNotFound(id),
            other => EngineError::Internal(other),
        }
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
