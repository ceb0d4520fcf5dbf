use common::{MenuItemId, OrderId};
use domain::{MenuError, OrderNumber, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the ledger or the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The menu item does not exist.
    #[error("Menu item {0} not found")]
    MenuItemNotFound(MenuItemId),

    /// The menu item exists but is switched off.
    #[error("Menu item {name} is not available")]
    ItemUnavailable { id: MenuItemId, name: String },

    /// A reservation asked for more than the current stock.
    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        id: MenuItemId,
        name: String,
        available: u32,
        requested: u32,
    },

    /// The order does not exist.
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// Another order already carries this number.
    #[error("Order number {0} is already taken")]
    DuplicateOrderNumber(OrderNumber),

    /// A status compare-and-set found the order in an unexpected status.
    #[error("Order {order_id} is {actual}, which does not allow this change")]
    StatusConflict { order_id: OrderId, actual: OrderStatus },

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Maps a failed stock check on `id` to the matching ledger error.
    pub fn from_menu(id: MenuItemId, err: MenuError) -> Self {
        match err {
            MenuError::Unavailable { name } => StoreError::ItemUnavailable { id, name },
            MenuError::InsufficientStock {
                name,
                available,
                requested,
            } => StoreError::InsufficientStock {
                id,
                name,
                available,
                requested,
            },
            other => StoreError::Corrupt(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
