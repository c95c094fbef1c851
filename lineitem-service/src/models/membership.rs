//! Membership model for lineitem-service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Pending,
    Current,
    Expired,
    Cancelled,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Current => "current",
            MembershipStatus::Expired => "expired",
            MembershipStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "current" => MembershipStatus::Current,
            "expired" => MembershipStatus::Expired,
            "cancelled" => MembershipStatus::Cancelled,
            _ => MembershipStatus::Pending,
        }
    }

    /// Status derived from the membership period on `today`.
    pub fn calculate(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        match (start_date, end_date) {
            (Some(start), _) if start > today => MembershipStatus::Pending,
            (Some(_), Some(end)) if end < today => MembershipStatus::Expired,
            (Some(_), _) => MembershipStatus::Current,
            (None, _) => MembershipStatus::Pending,
        }
    }
}

/// Membership held by a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: i64,
    pub contact_id: i64,
    pub membership_type_id: Option<i64>,
    pub status: String,
    pub is_override: bool,
    pub num_terms: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Membership {
    pub fn parsed_status(&self) -> MembershipStatus {
        MembershipStatus::from_string(&self.status)
    }
}

/// Input for updating a membership after its line item changed.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateMembership {
    pub id: i64,
    pub num_terms: i32,
    pub membership_type_id: Option<i64>,
    /// Explicit status; when set, no recalculation happens.
    pub status: Option<MembershipStatus>,
    pub is_override: Option<bool>,
    pub skip_status_cal: bool,
}

impl UpdateMembership {
    /// Apply the update to `current`, recalculating the status from the
    /// membership dates unless an explicit status was given, recalculation is
    /// skipped, or the membership is under an administrative override.
    pub fn resolve(&self, current: &Membership, today: NaiveDate) -> Membership {
        let mut updated = current.clone();
        updated.num_terms = self.num_terms;
        if self.membership_type_id.is_some() {
            updated.membership_type_id = self.membership_type_id;
        }
        if let Some(is_override) = self.is_override {
            updated.is_override = is_override;
        }

        match self.status {
            Some(status) => updated.status = status.as_str().to_string(),
            None if !self.skip_status_cal && !updated.is_override => {
                updated.status =
                    MembershipStatus::calculate(updated.start_date, updated.end_date, today)
                        .as_str()
                        .to_string();
            }
            None => {}
        }

        updated
    }
}
