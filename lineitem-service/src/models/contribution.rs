//! Contribution model for lineitem-service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Payment status of a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Completed,
    PartiallyPaid,
    PendingRefund,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Completed => "completed",
            ContributionStatus::PartiallyPaid => "partially_paid",
            ContributionStatus::PendingRefund => "pending_refund",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "completed" => ContributionStatus::Completed,
            "partially_paid" => ContributionStatus::PartiallyPaid,
            "pending_refund" => ContributionStatus::PendingRefund,
            _ => ContributionStatus::Pending,
        }
    }

    /// Status implied by what has been paid against what is owed.
    pub fn from_amounts(total: Decimal, paid: Decimal) -> Self {
        if paid > total {
            ContributionStatus::PendingRefund
        } else if paid == total && paid > Decimal::ZERO {
            ContributionStatus::Completed
        } else if paid > Decimal::ZERO {
            ContributionStatus::PartiallyPaid
        } else {
            ContributionStatus::Pending
        }
    }
}

/// Financial contribution owning one or more line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contribution {
    pub id: i64,
    pub contact_id: i64,
    pub currency: String,
    pub total_amount: Decimal,
    pub tax_amount: Option<Decimal>,
    pub net_amount: Decimal,
    pub fee_amount: Decimal,
    pub paid_amount: Decimal,
    pub contribution_status: String,
}

impl Contribution {
    pub fn parsed_status(&self) -> ContributionStatus {
        ContributionStatus::from_string(&self.contribution_status)
    }
}

/// ISO currency with its display symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Currency {
    pub name: String,
    pub symbol: String,
}
