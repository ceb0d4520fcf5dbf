//! Value objects for the order domain.

use chrono::{DateTime, NaiveDateTime, Utc};
use common::MenuItemId;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::menu::MenuItem;
use crate::money::Money;

use super::OrderError;

/// Human-readable order number, e.g. `ORD-84411234-007`.
///
/// Built from the last 8 digits of the creation time in epoch milliseconds
/// plus a 3-digit random suffix. Uniqueness is enforced by the order store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a number for an order created at `now` with a random suffix.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = rand::thread_rng().gen_range(0..1000);
        Self::from_parts(now.timestamp_millis(), suffix)
    }

    /// Builds a number from explicit parts.
    pub fn from_parts(epoch_millis: i64, suffix: u16) -> Self {
        let trailing = epoch_millis.rem_euclid(100_000_000);
        Self(format!("ORD-{trailing:08}-{:03}", suffix % 1000))
    }

    /// Wraps an existing order number without checking its format.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How the customer intends to pay. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "online" => Ok(PaymentMethod::Online),
            other => Err(OrderError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// Payment label carried on the order. No gateway is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(OrderError::UnknownPaymentStatus(other.to_string())),
        }
    }
}

/// A line in an order.
///
/// Name and price are copied from the menu item when the order is placed
/// and never follow later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The menu item this line was ordered from.
    pub menu_item_id: MenuItemId,

    /// Item name at order time.
    pub name: String,

    /// Unit price at order time.
    pub unit_price: Money,

    /// Quantity ordered (at least 1).
    pub quantity: u32,

    /// `unit_price * quantity`.
    pub total_price: Money,
}

impl OrderLine {
    /// Creates a new order line, computing its total.
    pub fn new(
        menu_item_id: MenuItemId,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            menu_item_id,
            name: name.into(),
            unit_price,
            quantity,
            total_price: unit_price.multiply(quantity),
        }
    }

    /// Snapshots the current catalog name and price of `item`.
    pub fn snapshot(item: &MenuItem, quantity: u32) -> Self {
        Self::new(item.id, item.name.clone(), item.price, quantity)
    }
}

/// Parses a requested pickup time.
///
/// Accepts RFC 3339 timestamps and the zone-less `YYYY-MM-DDTHH:MM[:SS]`
/// form produced by browser `datetime-local` inputs, which is read as UTC.
pub fn parse_pickup_time(value: &str) -> Result<DateTime<Utc>, OrderError> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| OrderError::InvalidPickupTime {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_number_format() {
        let number = OrderNumber::from_parts(1_760_000_123_456, 7);
        assert_eq!(number.as_str(), "ORD-00123456-007");

        let number = OrderNumber::from_parts(1_760_084_411_234, 999);
        assert_eq!(number.as_str(), "ORD-84411234-999");
    }

    #[test]
    fn test_generated_order_number_shape() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let number = OrderNumber::generate(now);
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 3);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_order_line_total() {
        let line = OrderLine::new(MenuItemId::new(), "Samosa", Money::from_cents(120), 3);
        assert_eq!(line.total_price.cents(), 360);
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }

    #[test]
    fn test_parse_pickup_time_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 19, 12, 30, 0).unwrap();
        assert_eq!(parse_pickup_time("2026-10-19T12:30:00Z").unwrap(), expected);
        assert_eq!(
            parse_pickup_time("2026-10-19T14:30:00+02:00").unwrap(),
            expected
        );
        assert_eq!(parse_pickup_time("2026-10-19T12:30").unwrap(), expected);
        assert_eq!(parse_pickup_time("2026-10-19T12:30:00").unwrap(), expected);
    }

    #[test]
    fn test_parse_pickup_time_rejects_garbage() {
        assert!(matches!(
            parse_pickup_time("tomorrow at noon"),
            Err(OrderError::InvalidPickupTime { .. })
        ));
    }
}
