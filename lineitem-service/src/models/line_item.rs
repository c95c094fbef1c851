//! Line item model for lineitem-service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Table owning a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTable {
    #[serde(rename = "civicrm_contribution")]
    Contribution,
    #[serde(rename = "civicrm_membership")]
    Membership,
    #[serde(rename = "civicrm_participant")]
    Participant,
}

impl EntityTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityTable::Contribution => "civicrm_contribution",
            EntityTable::Membership => "civicrm_membership",
            EntityTable::Participant => "civicrm_participant",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "civicrm_contribution" => Some(EntityTable::Contribution),
            "civicrm_membership" => Some(EntityTable::Membership),
            "civicrm_participant" => Some(EntityTable::Participant),
            _ => None,
        }
    }

    /// Contact summary tab showing records of this kind, if any.
    pub fn tab_selector(&self) -> Option<&'static str> {
        match self {
            EntityTable::Contribution => None,
            EntityTable::Membership => Some("#tab_member"),
            EntityTable::Participant => Some("#tab_participant"),
        }
    }
}

impl std::fmt::Display for EntityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priced component of a contribution, membership or event registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub id: i64,
    pub contribution_id: i64,
    pub entity_table: String,
    pub entity_id: i64,
    pub price_field_id: i64,
    pub price_field_value_id: Option<i64>,
    pub financial_type_id: i64,
    pub label: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub tax_amount: Option<Decimal>,
}

impl LineItem {
    /// Get parsed owning table.
    pub fn parsed_entity_table(&self) -> Option<EntityTable> {
        EntityTable::from_string(&self.entity_table)
    }

    /// Tax amount, treating a missing value as zero.
    pub fn tax_or_zero(&self) -> Decimal {
        self.tax_amount.unwrap_or(Decimal::ZERO)
    }

    /// Line total plus tax.
    pub fn gross_total(&self) -> Decimal {
        self.line_total + self.tax_or_zero()
    }
}

/// Fields written back by a manual edit.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateLineItem {
    pub id: i64,
    pub financial_type_id: i64,
    pub label: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub tax_amount: Decimal,
}

impl UpdateLineItem {
    pub fn apply_to(&self, item: &mut LineItem) {
        item.financial_type_id = self.financial_type_id;
        item.label = self.label.clone();
        item.qty = self.qty;
        item.unit_price = self.unit_price;
        item.line_total = self.line_total;
        item.tax_amount = Some(self.tax_amount);
    }
}
