//! Background sweep over pending orders.
//!
//! Webhooks settle most orders; this worker catches the ones whose callback
//! never arrived. Each cycle pulls the oldest pending orders and polls their
//! provider. A failure in one cycle is logged and the worker keeps running.

use crate::config::ReconciliationConfig;
use crate::services::ReconciliationService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

pub struct ReconciliationSweepWorker {
    service: Arc<ReconciliationService>,
    poll_interval: Duration,
    batch_size: i64,
}

impl ReconciliationSweepWorker {
    pub fn new(service: Arc<ReconciliationService>, config: &ReconciliationConfig) -> Self {
        Self {
            service,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            batch_size: config.batch_size,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            batch_size = self.batch_size,
            "Reconciliation sweep worker started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.service.reconcile_pending(self.batch_size).await {
                        Ok(settled) if settled > 0 => {
                            info!(settled, "Reconciliation sweep settled orders")
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Reconciliation sweep cycle failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Reconciliation sweep worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}
