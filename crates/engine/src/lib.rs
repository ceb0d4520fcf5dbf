//! Order lifecycle engine for the canteen ordering system.
//!
//! The engine turns customer requests into stock movements and order
//! status changes:
//! - creating an order reserves stock line by line, rolling back on failure
//! - cancelling or expiring an order gives its stock back exactly once
//! - status updates follow the order state machine
//!
//! A background [`ExpirySweeper`] expires orders whose hold has run out.

pub mod config;
pub mod error;
pub mod reservation;
pub mod service;
pub mod sweeper;

pub use config::{EngineConfig, RestockPolicy, UnknownRestockPolicy};
pub use error::{EngineError, Result};
pub use reservation::Reservation;
pub use service::OrderEngine;
pub use sweeper::{ExpirySweeper, SweepReport, SweeperHandle};
