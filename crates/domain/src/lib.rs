//! Domain layer for the canteen ordering system.
//!
//! This crate provides the core data model:
//! - Menu items and their stock/availability rules
//! - Orders with snapshotted order lines and the order status state machine
//! - The create-order command and its input validation
//! - Order statistics

pub mod menu;
pub mod money;
pub mod order;
pub mod stats;

pub use common::{MenuItemId, OrderId};
pub use menu::{Category, MenuError, MenuItem, MenuItemSummary};
pub use money::Money;
pub use order::{
    CreateOrder, Order, OrderDetails, OrderError, OrderLine, OrderLineRequest, OrderNumber,
    OrderParts, OrderStatus, PaymentMethod, PaymentStatus, parse_pickup_time,
};
pub use stats::{OrderStats, StatusSummary};
