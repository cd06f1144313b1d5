pub mod reconciliation_sweep;

pub use reconciliation_sweep::ReconciliationSweepWorker;
