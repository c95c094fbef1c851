//! In-memory backend for local runs and tests.

use crate::models::{
    Activity, Contribution, ContributionAdjustment, CreateActivity, Currency, EntityTable,
    FinancialItem, FinancialTrxn, FinancialType, LineItem, Membership, Participant, PriceField,
    PriceFieldValue, PriceSet, UpdateLineItem, UpdateMembership, UpdateParticipantFee,
};
use crate::services::ledger::{financial_items_on_edit, plan_adjustment};
use crate::services::store::{EntityStore, LedgerAdjuster};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{info, instrument};

#[derive(Default)]
struct Tables {
    line_items: BTreeMap<i64, LineItem>,
    contributions: BTreeMap<i64, Contribution>,
    currencies: HashMap<String, Currency>,
    price_sets: BTreeMap<i64, PriceSet>,
    price_fields: BTreeMap<i64, PriceField>,
    price_field_values: BTreeMap<i64, PriceFieldValue>,
    financial_types: BTreeMap<i64, FinancialType>,
    memberships: BTreeMap<i64, Membership>,
    participants: BTreeMap<i64, Participant>,
    activities: Vec<Activity>,
    financial_trxns: Vec<FinancialTrxn>,
    financial_items: Vec<FinancialItem>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// `EntityStore` and `LedgerAdjuster` over process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: RwLock<HashSet<String>>,
    today: Option<NaiveDate>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the date used for membership status calculation.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Make the named write operation fail with a database error.
    pub async fn inject_failure(&self, operation: &str) {
        self.failing.write().await.insert(operation.to_string());
    }

    async fn check_failure(&self, operation: &str) -> Result<(), AppError> {
        if self.failing.read().await.contains(operation) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Failed to {}: injected failure",
                operation.replace('_', " ")
            )));
        }
        Ok(())
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    pub async fn insert_line_item(&self, item: LineItem) {
        let mut t = self.tables.write().await;
        t.next_id = t.next_id.max(item.id);
        t.line_items.insert(item.id, item);
    }

    pub async fn insert_contribution(&self, contribution: Contribution) {
        let mut t = self.tables.write().await;
        t.next_id = t.next_id.max(contribution.id);
        t.contributions.insert(contribution.id, contribution);
    }

    pub async fn insert_currency(&self, currency: Currency) {
        self.tables
            .write()
            .await
            .currencies
            .insert(currency.name.clone(), currency);
    }

    pub async fn insert_price_set(&self, price_set: PriceSet) {
        self.tables
            .write()
            .await
            .price_sets
            .insert(price_set.id, price_set);
    }

    pub async fn insert_price_field(&self, price_field: PriceField) {
        self.tables
            .write()
            .await
            .price_fields
            .insert(price_field.id, price_field);
    }

    pub async fn insert_price_field_value(&self, value: PriceFieldValue) {
        self.tables
            .write()
            .await
            .price_field_values
            .insert(value.id, value);
    }

    pub async fn insert_financial_type(&self, financial_type: FinancialType) {
        self.tables
            .write()
            .await
            .financial_types
            .insert(financial_type.id, financial_type);
    }

    pub async fn insert_membership(&self, membership: Membership) {
        self.tables
            .write()
            .await
            .memberships
            .insert(membership.id, membership);
    }

    pub async fn insert_participant(&self, participant: Participant) {
        self.tables
            .write()
            .await
            .participants
            .insert(participant.id, participant);
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub async fn activities(&self) -> Vec<Activity> {
        self.tables.read().await.activities.clone()
    }

    pub async fn financial_trxns(&self) -> Vec<FinancialTrxn> {
        self.tables.read().await.financial_trxns.clone()
    }

    pub async fn financial_items(&self) -> Vec<FinancialItem> {
        self.tables.read().await.financial_items.clone()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_line_item(&self, id: i64) -> Result<Option<LineItem>, AppError> {
        Ok(self.tables.read().await.line_items.get(&id).cloned())
    }

    #[instrument(skip(self, input), fields(line_item_id = %input.id))]
    async fn update_line_item(&self, input: &UpdateLineItem) -> Result<LineItem, AppError> {
        self.check_failure("update_line_item").await?;
        let mut t = self.tables.write().await;
        let item = t.line_items.get_mut(&input.id).ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Line item {} not found", input.id))
        })?;
        input.apply_to(item);
        info!(line_item_id = item.id, "Line item updated");
        Ok(item.clone())
    }

    async fn list_contribution_line_items(
        &self,
        contribution_id: i64,
    ) -> Result<Vec<LineItem>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .line_items
            .values()
            .filter(|i| i.contribution_id == contribution_id)
            .cloned()
            .collect())
    }

    async fn list_entity_line_items(
        &self,
        entity_table: EntityTable,
        entity_id: i64,
        positive_qty_only: bool,
    ) -> Result<Vec<LineItem>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .line_items
            .values()
            .filter(|i| i.entity_table == entity_table.as_str() && i.entity_id == entity_id)
            .filter(|i| !positive_qty_only || i.qty > Decimal::ZERO)
            .cloned()
            .collect())
    }

    async fn get_contribution(&self, id: i64) -> Result<Option<Contribution>, AppError> {
        Ok(self.tables.read().await.contributions.get(&id).cloned())
    }

    async fn get_currency(&self, name: &str) -> Result<Option<Currency>, AppError> {
        Ok(self.tables.read().await.currencies.get(name).cloned())
    }

    async fn get_price_field(&self, id: i64) -> Result<Option<PriceField>, AppError> {
        Ok(self.tables.read().await.price_fields.get(&id).cloned())
    }

    async fn get_price_set(&self, id: i64) -> Result<Option<PriceSet>, AppError> {
        Ok(self.tables.read().await.price_sets.get(&id).cloned())
    }

    async fn get_price_field_value(&self, id: i64) -> Result<Option<PriceFieldValue>, AppError> {
        Ok(self.tables.read().await.price_field_values.get(&id).cloned())
    }

    async fn list_financial_types(
        &self,
        active_only: bool,
    ) -> Result<Vec<FinancialType>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .financial_types
            .values()
            .filter(|ft| !active_only || ft.is_active)
            .cloned()
            .collect())
    }

    async fn get_tax_rates(&self) -> Result<BTreeMap<i64, Decimal>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .financial_types
            .values()
            .filter_map(|ft| ft.tax_rate.map(|rate| (ft.id, rate)))
            .collect())
    }

    async fn get_membership(&self, id: i64) -> Result<Option<Membership>, AppError> {
        Ok(self.tables.read().await.memberships.get(&id).cloned())
    }

    #[instrument(skip(self, input), fields(membership_id = %input.id))]
    async fn update_membership(&self, input: &UpdateMembership) -> Result<Membership, AppError> {
        self.check_failure("update_membership").await?;
        let today = self.today();
        let mut t = self.tables.write().await;
        let membership = t.memberships.get_mut(&input.id).ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Membership {} not found", input.id))
        })?;
        *membership = input.resolve(membership, today);
        info!(status = %membership.status, "Membership updated");
        Ok(membership.clone())
    }

    async fn get_participant(&self, id: i64) -> Result<Option<Participant>, AppError> {
        Ok(self.tables.read().await.participants.get(&id).cloned())
    }

    #[instrument(skip(self, input), fields(participant_id = %input.id))]
    async fn update_participant_fee(
        &self,
        input: &UpdateParticipantFee,
    ) -> Result<Participant, AppError> {
        self.check_failure("update_participant_fee").await?;
        let mut t = self.tables.write().await;
        let participant = t.participants.get_mut(&input.id).ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Participant {} not found", input.id))
        })?;
        participant.fee_level = Some(input.fee_level.clone());
        participant.fee_amount = input.fee_amount;
        Ok(participant.clone())
    }

    async fn create_activity(&self, input: &CreateActivity) -> Result<Activity, AppError> {
        self.check_failure("create_activity").await?;
        let mut t = self.tables.write().await;
        let activity = Activity {
            id: t.next_id(),
            activity_type: input.activity_type.clone(),
            source_record_id: input.source_record_id,
            target_contact_id: input.target_contact_id,
            subject: input.subject.clone(),
            created_utc: Utc::now(),
        };
        t.activities.push(activity.clone());
        Ok(activity)
    }

    async fn count_component(
        &self,
        component: EntityTable,
        contact_id: i64,
    ) -> Result<i64, AppError> {
        let t = self.tables.read().await;
        let count = match component {
            EntityTable::Membership => t
                .memberships
                .values()
                .filter(|m| m.contact_id == contact_id)
                .count(),
            EntityTable::Participant => t
                .participants
                .values()
                .filter(|p| p.contact_id == contact_id)
                .count(),
            EntityTable::Contribution => t
                .contributions
                .values()
                .filter(|c| c.contact_id == contact_id)
                .count(),
        };
        Ok(count as i64)
    }
}

#[async_trait]
impl LedgerAdjuster for MemoryStore {
    #[instrument(skip(self), fields(contribution_id = %contribution_id))]
    async fn recompute_and_post(
        &self,
        contribution_id: i64,
        line_total_sum: Decimal,
        tax_sum: Decimal,
        is_test: bool,
    ) -> Result<ContributionAdjustment, AppError> {
        self.check_failure("recompute_and_post").await?;
        let mut t = self.tables.write().await;
        let contribution = t.contributions.get(&contribution_id).cloned().ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "Contribution {} not found",
                contribution_id
            ))
        })?;

        let plan = plan_adjustment(&contribution, line_total_sum, tax_sum);

        let trxn = if plan.posts_trxn() {
            let trxn = FinancialTrxn {
                id: t.next_id(),
                contribution_id,
                total_amount: plan.balance,
                net_amount: plan.balance,
                currency: contribution.currency.clone(),
                is_test,
                trxn_date: Utc::now(),
            };
            t.financial_trxns.push(trxn.clone());
            Some(trxn)
        } else {
            None
        };

        if let Some(stored) = t.contributions.get_mut(&contribution_id) {
            stored.total_amount = plan.total_amount;
            stored.tax_amount = Some(plan.tax_amount);
            stored.net_amount = plan.net_amount;
            stored.contribution_status = plan.status.as_str().to_string();
        }

        Ok(ContributionAdjustment {
            contribution_id,
            previous_total: plan.previous_total,
            total_amount: plan.total_amount,
            tax_amount: plan.tax_amount,
            net_amount: plan.net_amount,
            balance: plan.balance,
            contribution_status: plan.status.as_str().to_string(),
            trxn,
        })
    }

    #[instrument(skip(self, prior), fields(line_item_id = %line_item_id))]
    async fn insert_financial_item_on_edit(
        &self,
        line_item_id: i64,
        prior: &LineItem,
    ) -> Result<Vec<FinancialItem>, AppError> {
        self.check_failure("insert_financial_item_on_edit").await?;
        let mut t = self.tables.write().await;
        let current = t.line_items.get(&line_item_id).cloned().ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Line item {} not found", line_item_id))
        })?;
        let contribution = t
            .contributions
            .get(&current.contribution_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Contribution {} not found",
                    current.contribution_id
                ))
            })?;

        let mut created = Vec::new();
        for input in financial_items_on_edit(
            &current,
            prior,
            contribution.contact_id,
            &contribution.currency,
        ) {
            let item = FinancialItem {
                id: t.next_id(),
                line_item_id: input.line_item_id,
                contact_id: input.contact_id,
                financial_type_id: input.financial_type_id,
                amount: input.amount,
                currency: input.currency,
                description: input.description,
                is_tax: input.is_tax,
                created_utc: Utc::now(),
            };
            t.financial_items.push(item.clone());
            created.push(item);
        }

        Ok(created)
    }
}
