//! Domain models for lineitem-service.

mod activity;
mod contribution;
mod financial;
mod line_item;
mod membership;
mod participant;
mod price;

pub use activity::{Activity, CreateActivity, CHANGE_REGISTRATION};
pub use contribution::{Contribution, ContributionStatus, Currency};
pub use financial::{
    ContributionAdjustment, CreateFinancialItem, FinancialItem, FinancialTrxn, FinancialType,
};
pub use line_item::{EntityTable, LineItem, UpdateLineItem};
pub use membership::{Membership, MembershipStatus, UpdateMembership};
pub use participant::{Participant, UpdateParticipantFee};
pub use price::{PriceField, PriceFieldValue, PriceSet};
