//! Price set configuration models. Read-only for this service.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Collection of price fields offered on a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriceSet {
    pub id: i64,
    pub name: String,
    pub is_quick_config: bool,
}

/// Configurable price option within a price set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriceField {
    pub id: i64,
    pub price_set_id: i64,
    pub label: String,
    pub is_enter_qty: bool,
}

/// Selectable value of a price field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriceFieldValue {
    pub id: i64,
    pub price_field_id: i64,
    pub label: String,
    pub membership_type_id: Option<i64>,
    pub membership_num_terms: Option<i32>,
}

impl PriceFieldValue {
    /// Terms granted per unit of quantity; unset or zero means one.
    pub fn terms_per_unit(&self) -> i32 {
        match self.membership_num_terms {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }
}
