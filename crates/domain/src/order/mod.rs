//! Orders, order lines and the status state machine.

mod commands;
mod model;
mod state;
mod value_objects;

pub use commands::{
    CreateOrder, MAX_CUSTOMER_NAME_LEN, MAX_CUSTOMER_PHONE_LEN, MAX_NOTES_LEN, OrderLineRequest, PICKUP_TIME_GRACE_SECS,
};
pub use model::{Order, OrderDetails, OrderParts};
pub use state::OrderStatus;
pub use value_objects::{
    OrderLine, OrderNumber, PaymentMethod, PaymentStatus, parse_pickup_time,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Validation errors for order input and status changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("At least one item is required")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    #[error("Customer name is required")]
    CustomerNameRequired,

    #[error("Customer name cannot exceed {MAX_CUSTOMER_NAME_LEN} characters (got {len})")]
    CustomerNameTooLong { len: usize },

    #[error("Customer phone is required")]
    CustomerPhoneRequired,

    #[error("Customer phone cannot exceed {MAX_CUSTOMER_PHONE_LEN} characters (got {len})")]
    CustomerPhoneTooLong { len: usize },

    #[error("Notes cannot exceed {MAX_NOTES_LEN} characters (got {len})")]
    NotesTooLong { len: usize },

    /// The pickup time could not be parsed.
    #[error("Valid pickup time is required, got '{value}'")]
    InvalidPickupTime { value: String },

    #[error("Pickup time {pickup_time} is in the past")]
    PickupTimeInPast { pickup_time: DateTime<Utc> },

    /// Order is not in a state that allows the requested move.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The status is reserved for the engine.
    #[error("Status {status} cannot be set directly")]
    StatusNotSettable { status: OrderStatus },

    #[error("Invalid status: {0}")]
    UnknownStatus(String),

    #[error("Invalid payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("Invalid payment status: {0}")]
    UnknownPaymentStatus(String),
}
