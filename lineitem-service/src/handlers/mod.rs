//! HTTP handlers for lineitem-service.

pub mod health;
pub mod line_items;

pub use health::{health_check, metrics_handler, readiness_check};
