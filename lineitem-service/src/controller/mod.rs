//! Form controllers.

mod dependents;
mod line_item_edit;

pub use dependents::{fee_level_summary, format_quantity, DependentUpdate};
pub use line_item_edit::{LineItemEditController, LineItemValues, LoadedLineItem, SubmitOutcome};

use service_core::error::AppError;

/// Parse a request id that must be a positive integer.
pub fn parse_positive_id(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid id '{}': expected a positive integer",
            raw
        ))),
    }
}
