//! service-core: Shared infrastructure for the line item edit service.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
