//! Identifier types shared by every layer of the canteen ordering system.

pub mod types;

pub use types::{MenuItemId, OrderId};
