//! Periodic release of stock held by orders past their deadline.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use domain::OrderStatus;
use store::{InventoryLedger, OrderStore, StoreError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::reservation::restock;

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Orders found past their deadline.
    pub examined: usize,
    /// Orders this sweep moved to `expired`.
    pub expired: usize,
    /// Orders that changed status before the sweep reached them, or failed.
    pub skipped: usize,
    /// Lines whose stock could not be restored.
    pub release_failures: usize,
}

/// Expires pending and confirmed orders whose hold deadline has passed.
///
/// Expiry is a status compare-and-set, so a sweep racing a cancellation
/// releases an order's stock at most once.
#[derive(Clone)]
pub struct ExpirySweeper<L, O> {
    ledger: L,
    orders: O,
}

impl<L, O> ExpirySweeper<L, O>
where
    L: InventoryLedger,
    O: OrderStore,
{
    pub fn new(ledger: L, orders: O) -> Self {
        Self { ledger, orders }
    }

    /// Runs one sweep against the current time.
    pub async fn sweep(&self) -> store::Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Runs one sweep as if the current time were `now`.
    ///
    /// Only the initial query can fail the sweep. A failure on one order is
    /// logged and the remaining orders are still processed.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> store::Result<SweepReport> {
        let candidates = self.orders.find_expired(now).await?;
        let mut report = SweepReport {
            examined: candidates.len(),
            ..Default::default()
        };

        for order in candidates {
            let result = self
                .orders
                .transition_status(
                    order.id(),
                    &OrderStatus::EXPIRABLE,
                    OrderStatus::Expired,
                    now,
                )
                .await;

            match result {
                Ok(change) => {
                    report.expired += 1;
                    report.release_failures += restock(&self.ledger, &change.previous).await;
                    metrics::counter!("orders_expired_total").increment(1);
                    tracing::info!(
                        order_number = %order.order_number(),
                        expires_at = %order.expires_at(),
                        "order expired"
                    );
                }
                Err(StoreError::StatusConflict { actual, .. }) => {
                    report.skipped += 1;
                    tracing::debug!(
                        order_number = %order.order_number(),
                        %actual,
                        "order left the expirable states before the sweep reached it"
                    );
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::error!(
                        order_number = %order.order_number(),
                        error = %e,
                        "failed to expire order"
                    );
                }
            }
        }

        Ok(report)
    }
}

impl<L, O> ExpirySweeper<L, O>
where
    L: InventoryLedger + Clone + 'static,
    O: OrderStore + Clone + 'static,
{
    /// Starts sweeping every `interval` on the current runtime.
    ///
    /// The first sweep runs immediately. Ticks missed while a sweep was
    /// running are skipped.
    pub fn start(self, interval: Duration) -> SweeperHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(interval, shutdown.clone()));
        SweeperHandle { shutdown, task }
    }

    async fn run(self, interval: Duration, shutdown: CancellationToken) {
        let interval = interval.max(Duration::from_millis(1));
        tracing::info!(interval_secs = interval.as_secs_f64(), "expiry sweeper started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.run_once().await,
            }
        }

        tracing::info!("expiry sweeper stopped");
    }

    /// One sweep in its own task, so that a panic ends only this run.
    async fn run_once(&self) {
        let started = Instant::now();
        let sweeper = self.clone();

        let outcome = match tokio::spawn(async move { sweeper.sweep().await }).await {
            Ok(Ok(report)) => {
                if report.examined > 0 {
                    tracing::info!(
                        examined = report.examined,
                        expired = report.expired,
                        skipped = report.skipped,
                        release_failures = report.release_failures,
                        "expiry sweep finished"
                    );
                }
                "ok"
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "expiry sweep failed");
                "error"
            }
            Err(e) => {
                tracing::error!(error = %e, "expiry sweep panicked");
                "panic"
            }
        };

        metrics::counter!("expiry_sweeps_total", "outcome" => outcome).increment(1);
        metrics::histogram!("expiry_sweep_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for the task to end.
    ///
    /// A sweep already in progress finishes before the task exits.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "expiry sweeper task ended abnormally");
        }
    }
}
