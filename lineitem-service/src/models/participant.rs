//! Event participant model for lineitem-service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Event registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: i64,
    pub contact_id: i64,
    pub event_id: i64,
    pub fee_level: Option<String>,
    pub fee_amount: Decimal,
}

/// Recomputed fee summary for a participant.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateParticipantFee {
    pub id: i64,
    pub fee_level: String,
    pub fee_amount: Decimal,
}
