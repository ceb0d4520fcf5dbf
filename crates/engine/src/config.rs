//! Engine settings and the cancellation restock policy.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use domain::OrderStatus;
use thiserror::Error;

/// Minutes an unconfirmed order holds its stock before the sweeper frees it.
pub const DEFAULT_HOLD_MINUTES: i64 = 15;

/// How many order numbers are tried before creation gives up.
pub const DEFAULT_ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Decides whether cancelling an order gives its stock back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RestockPolicy {
    /// Every cancellation of a non-terminal order restores its lines.
    #[default]
    Unconditional,
    /// Orders the kitchen has started on are cancelled without restock.
    BeforePreparation,
}

impl RestockPolicy {
    /// Returns true if cancelling an order in `status` restores its stock.
    pub fn restocks(&self, status: OrderStatus) -> bool {
        match self {
            RestockPolicy::Unconditional => true,
            RestockPolicy::BeforePreparation => !status.is_in_fulfillment(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestockPolicy::Unconditional => "unconditional",
            RestockPolicy::BeforePreparation => "before_preparation",
        }
    }
}

impl fmt::Display for RestockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown restock policy: {0}")]
pub struct UnknownRestockPolicy(pub String);

impl FromStr for RestockPolicy {
    type Err = UnknownRestockPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unconditional" => Ok(RestockPolicy::Unconditional),
            "before_preparation" => Ok(RestockPolicy::BeforePreparation),
            other => Err(UnknownRestockPolicy(other.to_string())),
        }
    }
}

/// Tunables for [`crate::OrderEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Offset from creation to the expiry deadline.
    pub hold: Duration,
    pub restock_policy: RestockPolicy,
    /// Attempts at inserting an order under a fresh number.
    pub order_number_attempts: u32,
}

impl EngineConfig {
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn with_restock_policy(mut self, policy: RestockPolicy) -> Self {
        self.restock_policy = policy;
        self
    }

    pub fn with_order_number_attempts(mut self, attempts: u32) -> Self {
        self.order_number_attempts = attempts;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold: Duration::minutes(DEFAULT_HOLD_MINUTES),
            restock_policy: RestockPolicy::default(),
            order_number_attempts: DEFAULT_ORDER_NUMBER_ATTEMPTS,
        }
    }
}
