//! Order statistics for the admin view.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::order::{Order, OrderStatus};

/// Count and summed total of the orders in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub status: OrderStatus,
    pub count: u64,
    pub total_amount: Money,
}

/// Aggregate figures over every stored order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderStats {
    /// One entry per status that has at least one order, in lifecycle order.
    pub status_breakdown: Vec<StatusSummary>,
    pub total_orders: u64,
    /// Sum of totals over `ready` and `picked_up` orders.
    pub total_revenue: Money,
}

impl OrderStats {
    /// Derives the totals from a per-status breakdown.
    pub fn from_breakdown(mut status_breakdown: Vec<StatusSummary>) -> Self {
        status_breakdown.retain(|s| s.count > 0);
        status_breakdown.sort_by_key(|s| s.status);

        let total_orders = status_breakdown.iter().map(|s| s.count).sum();
        let total_revenue = status_breakdown
            .iter()
            .filter(|s| s.status.counts_as_revenue())
            .map(|s| s.total_amount)
            .sum();

        Self {
            status_breakdown,
            total_orders,
            total_revenue,
        }
    }

    /// Computes statistics by scanning orders.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut breakdown: Vec<StatusSummary> = OrderStatus::ALL
            .into_iter()
            .map(|status| StatusSummary {
                status,
                count: 0,
                total_amount: Money::zero(),
            })
            .collect();

        for order in orders {
            if let Some(summary) = breakdown.iter_mut().find(|s| s.status == order.status()) {
                summary.count += 1;
                summary.total_amount += order.total_amount();
            }
        }

        Self::from_breakdown(breakdown)
    }
}
