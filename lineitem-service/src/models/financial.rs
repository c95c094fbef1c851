//! Financial type and ledger record models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Income category; a tax rate makes it taxable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FinancialType {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub tax_rate: Option<Decimal>,
}

/// Ledger transaction recording a change in what a contribution is worth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FinancialTrxn {
    pub id: i64,
    pub contribution_id: i64,
    pub total_amount: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub is_test: bool,
    pub trxn_date: DateTime<Utc>,
}

/// Audit item tying an amount change to a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FinancialItem {
    pub id: i64,
    pub line_item_id: i64,
    pub contact_id: i64,
    pub financial_type_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub is_tax: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a financial item.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateFinancialItem {
    pub line_item_id: i64,
    pub contact_id: i64,
    pub financial_type_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub is_tax: bool,
}

/// Result of reconciling a contribution with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionAdjustment {
    pub contribution_id: i64,
    pub previous_total: Decimal,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub net_amount: Decimal,
    pub balance: Decimal,
    pub contribution_status: String,
    pub trxn: Option<FinancialTrxn>,
}
