//! Monetary input normalisation.

use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::error::AppError;
use std::str::FromStr;

/// Exclusive bound on stored amounts: NUMERIC(20, 2) keeps 18 integer digits.
const MAX_AMOUNT: i64 = 1_000_000_000_000_000_000;

/// Reject values a NUMERIC(20, 2) column cannot hold.
pub fn check_amount_range(value: Decimal, raw: &str) -> Result<Decimal, AppError> {
    if value.abs() >= Decimal::from(MAX_AMOUNT) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount '{}' is out of range",
            raw
        )));
    }
    Ok(value)
}

/// Separators used when operators type amounts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoneyFormat {
    pub thousand_separator: String,
    pub decimal_separator: String,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self {
            thousand_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
        }
    }
}

impl MoneyFormat {
    /// Parse a formatted amount such as `"$1,234.50"` into a decimal.
    ///
    /// Thousands separators, whitespace and currency symbols are dropped and
    /// the configured decimal separator becomes `.`.
    pub fn clean_money(&self, raw: &str) -> Result<Decimal, AppError> {
        let mut value = raw.trim().to_string();
        if !self.thousand_separator.is_empty() {
            value = value.replace(&self.thousand_separator, "");
        }
        if self.decimal_separator != "." {
            value = value.replace(&self.decimal_separator, ".");
        }

        let cleaned: String = value
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
            .collect();

        if cleaned.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid amount '{}'",
                raw
            )));
        }

        let value = Decimal::from_str(&cleaned)
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid amount '{}'", raw)))?;
        check_amount_range(value, raw)
    }
}
