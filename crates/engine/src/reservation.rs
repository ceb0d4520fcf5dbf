//! Compensating stock reservations.
//!
//! Order creation takes stock line by line. Each successful decrement is
//! recorded so that a later failure can give back exactly what was taken,
//! in reverse order.

use common::MenuItemId;
use domain::{MenuItem, Order};
use store::InventoryLedger;

/// Stock taken on behalf of one order that is not yet committed.
///
/// Dropping a reservation without calling [`Reservation::commit`] or
/// [`Reservation::roll_back`] leaks the taken stock, so every error path
/// must roll back.
#[must_use = "a reservation must be committed or rolled back"]
pub struct Reservation<'a, L: InventoryLedger + ?Sized> {
    ledger: &'a L,
    taken: Vec<(MenuItemId, u32)>,
}

impl<'a, L: InventoryLedger + ?Sized> Reservation<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            taken: Vec::new(),
        }
    }

    /// Atomically takes `quantity` of an item and records it for rollback.
    pub async fn take(&mut self, id: MenuItemId, quantity: u32) -> store::Result<MenuItem> {
        let item = self.ledger.reserve(id, quantity).await?;
        self.taken.push((id, quantity));
        Ok(item)
    }

    /// Keeps the taken stock; it now belongs to a stored order.
    pub fn commit(self) {
        tracing::debug!(lines = self.taken.len(), "stock reservation committed");
    }

    /// Gives back everything taken, most recent first.
    ///
    /// Returns the number of releases that failed. Failures are logged and
    /// counted but do not stop the remaining releases.
    pub async fn roll_back(self) -> usize {
        if self.taken.is_empty() {
            return 0;
        }

        let mut failures = 0;
        for (id, quantity) in self.taken.iter().rev() {
            match self.ledger.release(*id, *quantity).await {
                Ok(_) => {
                    metrics::counter!("stock_reservations_rolled_back_total").increment(1);
                }
                Err(e) => {
                    failures += 1;
                    metrics::counter!("stock_release_failures_total").increment(1);
                    tracing::error!(
                        menu_item_id = %id,
                        quantity,
                        error = %e,
                        "failed to roll back stock reservation"
                    );
                }
            }
        }
        failures
    }
}

/// Gives every line of `order` back to the ledger.
///
/// Each line is released on its own; a failure is logged, counted in
/// `stock_release_failures_total` and the next line is still processed.
/// Returns the number of lines that could not be released.
pub async fn restock<L: InventoryLedger + ?Sized>(ledger: &L, order: &Order) -> usize {
    let mut failures = 0;
    for (id, quantity) in order.reserved_quantities() {
        if let Err(e) = ledger.release(id, quantity).await {
            failures += 1;
            metrics::counter!("stock_release_failures_total").increment(1);
            tracing::warn!(
                order_number = %order.order_number(),
                menu_item_id = %id,
                quantity,
                error = %e,
                "failed to restore stock, needs manual reconciliation"
            );
        }
    }
    failures
}
