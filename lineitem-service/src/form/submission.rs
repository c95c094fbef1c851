//! Submitted values of the line item edit form.

use service_core::error::AppError;
use std::collections::HashMap;
use validator::{Validate, ValidationError};

const LABEL_MAX_CHARS: usize = 255;

/// Raw submitted values. Amounts stay as typed until the controller cleans
/// them.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct LineItemSubmission {
    #[validate(required(message = "Financial Type is a required field."))]
    pub financial_type_id: Option<i64>,
    #[validate(
        length(min = 1, message = "Label is a required field."),
        custom(function = "label_fits")
    )]
    pub label: String,
    #[validate(length(min = 1, message = "Quantity is a required field."))]
    pub qty: String,
    #[validate(length(min = 1, message = "Unit Price is a required field."))]
    pub unit_price: String,
    #[validate(length(min = 1, message = "Total amount is a required field."))]
    pub line_total: String,
    pub tax_amount: Option<String>,
}

impl LineItemSubmission {
    /// Build from the flat name/value map a form post exports.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let text = |key: &str| params.get(key).map(|v| v.trim().to_string()).unwrap_or_default();

        let financial_type_id = match params.get("financial_type_id").map(|v| v.trim()) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                AppError::BadRequest(anyhow::anyhow!("Invalid financial_type_id '{}'", raw))
            })?),
        };

        Ok(Self {
            financial_type_id,
            label: text("label"),
            qty: text("qty"),
            unit_price: text("unit_price"),
            line_total: text("line_total"),
            tax_amount: params
                .get("tax_amount")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

fn label_fits(label: &str) -> Result<(), ValidationError> {
    if label.chars().count() <= LABEL_MAX_CHARS {
        return Ok(());
    }
    let mut err = ValidationError::new("label_length");
    err.message = Some(format!("Label cannot be longer than {} characters.", LABEL_MAX_CHARS).into());
    Err(err)
}

/// Optional leading minus followed by ASCII digits only.
pub fn is_whole_number(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
