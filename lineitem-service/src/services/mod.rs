//! Services module for lineitem-service.

pub mod database;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod money;
pub mod store;

pub use database::Database;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use money::MoneyFormat;
pub use store::{EntityStore, LedgerAdjuster};
