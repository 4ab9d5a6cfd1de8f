// Market data module entrypoint
pub mod venue;      // simulated venues + enable toggles
pub mod filter;     // price range / quantity threshold
pub mod history;    // bounded FIFO of past snapshot-sets
pub mod generator;  // per-tick synthesis across venues
pub mod router;     // timer-driven stream around the generator
pub mod analytics;  // pure derived views (spread, profile, imbalance)
