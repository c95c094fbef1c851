//! Activity log model for lineitem-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Activity type recorded when a participant's selections change.
pub const CHANGE_REGISTRATION: &str = "Change Registration";

/// Activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub activity_type: String,
    pub source_record_id: i64,
    pub target_contact_id: i64,
    pub subject: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateActivity {
    pub activity_type: String,
    pub source_record_id: i64,
    pub target_contact_id: i64,
    pub subject: String,
}
