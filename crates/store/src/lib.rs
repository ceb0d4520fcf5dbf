//! Storage layer for the canteen ordering system.
//!
//! Two stores live here:
//! - the inventory ledger, which owns menu items and their stock counts and
//!   offers an atomic reserve-or-fail decrement
//! - the order store, which owns order documents and offers an atomic
//!   compare-and-set on order status
//!
//! Both come with an in-memory implementation and a PostgreSQL one.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod query;

pub use error::{Result, StoreError};
pub use ledger::{InventoryLedger, InventoryLedgerExt};
pub use memory::{InMemoryInventoryLedger, InMemoryOrderStore};
pub use orders::{OrderStore, StatusChange};
pub use postgres::PostgresStore;
pub use query::{MenuQuery, OrderQuery};
