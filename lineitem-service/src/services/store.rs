//! Collaborator contracts consumed by the line item edit controller.

use crate::models::{
    Activity, Contribution, ContributionAdjustment, CreateActivity, Currency, EntityTable,
    FinancialItem, FinancialType, LineItem, Membership, Participant, PriceField, PriceFieldValue,
    PriceSet, UpdateLineItem, UpdateMembership, UpdateParticipantFee,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::BTreeMap;

/// Generic read/write access to CRM records.
///
/// Lookups return `Ok(None)` for unknown ids; updates of unknown ids fail
/// with `AppError::NotFound`. No method coordinates with any other: callers
/// that need atomicity across records must get it from the backing store.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_line_item(&self, id: i64) -> Result<Option<LineItem>, AppError>;

    async fn update_line_item(&self, input: &UpdateLineItem) -> Result<LineItem, AppError>;

    /// All line items of a contribution, ordered by id.
    async fn list_contribution_line_items(
        &self,
        contribution_id: i64,
    ) -> Result<Vec<LineItem>, AppError>;

    /// Line items attached to one membership or participant, ordered by id.
    async fn list_entity_line_items(
        &self,
        entity_table: EntityTable,
        entity_id: i64,
        positive_qty_only: bool,
    ) -> Result<Vec<LineItem>, AppError>;

    async fn get_contribution(&self, id: i64) -> Result<Option<Contribution>, AppError>;

    async fn get_currency(&self, name: &str) -> Result<Option<Currency>, AppError>;

    async fn get_price_field(&self, id: i64) -> Result<Option<PriceField>, AppError>;

    async fn get_price_set(&self, id: i64) -> Result<Option<PriceSet>, AppError>;

    async fn get_price_field_value(&self, id: i64) -> Result<Option<PriceFieldValue>, AppError>;

    async fn list_financial_types(&self, active_only: bool)
        -> Result<Vec<FinancialType>, AppError>;

    /// Tax rate (percent) keyed by financial type id, for taxable types only.
    async fn get_tax_rates(&self) -> Result<BTreeMap<i64, Decimal>, AppError>;

    async fn get_membership(&self, id: i64) -> Result<Option<Membership>, AppError>;

    async fn update_membership(&self, input: &UpdateMembership) -> Result<Membership, AppError>;

    async fn get_participant(&self, id: i64) -> Result<Option<Participant>, AppError>;

    async fn update_participant_fee(
        &self,
        input: &UpdateParticipantFee,
    ) -> Result<Participant, AppError>;

    async fn create_activity(&self, input: &CreateActivity) -> Result<Activity, AppError>;

    /// Number of memberships or registrations a contact holds.
    async fn count_component(
        &self,
        component: EntityTable,
        contact_id: i64,
    ) -> Result<i64, AppError>;
}

/// Reconciles contribution totals with their line items and writes the
/// ledger records for the difference.
#[async_trait]
pub trait LedgerAdjuster: Send + Sync {
    /// Store the resummed totals on the contribution and post a financial
    /// transaction for the change. `is_test` marks the transaction as test.
    async fn recompute_and_post(
        &self,
        contribution_id: i64,
        line_total_sum: Decimal,
        tax_sum: Decimal,
        is_test: bool,
    ) -> Result<ContributionAdjustment, AppError>;

    /// Record financial items for the difference between the line item as
    /// stored now and `prior`.
    async fn insert_financial_item_on_edit(
        &self,
        line_item_id: i64,
        prior: &LineItem,
    ) -> Result<Vec<FinancialItem>, AppError>;
}
