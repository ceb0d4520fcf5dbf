//! Order commands.

use chrono::{DateTime, Duration, Utc};
use common::MenuItemId;

use super::{OrderError, PaymentMethod};

/// Maximum length of the customer name.
pub const MAX_CUSTOMER_NAME_LEN: usize = 100;

/// Maximum length of the customer phone, matching the stored column width.
pub const MAX_CUSTOMER_PHONE_LEN: usize = 32;

/// Maximum length of the free-text note.
pub const MAX_NOTES_LEN: usize = 500;

/// How far in the past a pickup time may lie and still be accepted.
///
/// Covers clock skew and the time a request spends in flight when the
/// customer picks "now".
pub const PICKUP_TIME_GRACE_SECS: i64 = 60;

/// One requested line: which menu item and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
}

impl OrderLineRequest {
    pub fn new(menu_item_id: MenuItemId, quantity: u32) -> Self {
        Self {
            menu_item_id,
            quantity,
        }
    }
}

/// Command to place a new pickup order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// Requested lines, in the order the customer added them.
    pub lines: Vec<OrderLineRequest>,

    pub customer_name: String,

    pub customer_phone: String,

    /// When the customer will collect the order.
    pub pickup_time: DateTime<Utc>,

    pub payment_method: PaymentMethod,

    pub notes: Option<String>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command paying cash with no note.
    pub fn new(
        lines: Vec<OrderLineRequest>,
        customer_name: impl Into<String>,
        customer_phone: impl Into<String>,
        pickup_time: DateTime<Utc>,
    ) -> Self {
        Self {
            lines,
            customer_name: customer_name.into(),
            customer_phone: customer_phone.into(),
            pickup_time,
            payment_method: PaymentMethod::default(),
            notes: None,
        }
    }

    pub fn with_payment_method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Trims free-text fields and validates the command against `now`.
    ///
    /// Runs before any stock is touched, so a rejected command leaves no
    /// trace in the ledger or the order store.
    ///
    /// The pickup time must not lie before `now`, widened by
    /// [`PICKUP_TIME_GRACE_SECS`] so that a customer choosing "now" is not
    /// rejected for clock skew or request latency.
    pub fn validated(mut self, now: DateTime<Utc>) -> Result<Self, OrderError> {
        self.customer_name = self.customer_name.trim().to_string();
        self.customer_phone = self.customer_phone.trim().to_string();
        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if self.lines.is_empty() {
            return Err(OrderError::NoItems);
        }

        if let Some(line) = self.lines.iter().find(|l| l.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        if self.customer_name.is_empty() {
            return Err(OrderError::CustomerNameRequired);
        }

        let name_len = self.customer_name.chars().count();
        if name_len > MAX_CUSTOMER_NAME_LEN {
            return Err(OrderError::CustomerNameTooLong { len: name_len });
        }

        if self.customer_phone.is_empty() {
            return Err(OrderError::CustomerPhoneRequired);
        }

        let phone_len = self.customer_phone.chars().count();
        if phone_len > MAX_CUSTOMER_PHONE_LEN {
            return Err(OrderError::CustomerPhoneTooLong { len: phone_len });
        }

        if let Some(notes) = &self.notes {
            let len = notes.chars().count();
            if len > MAX_NOTES_LEN {
                return Err(OrderError::NotesTooLong { len });
            }
        }

        if self.pickup_time < now - Duration::seconds(PICKUP_TIME_GRACE_SECS) {
            return Err(OrderError::PickupTimeInPast {
                pickup_time: self.pickup_time,
            });
        }

        Ok(self)
    }
}
