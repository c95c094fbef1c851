//! Edit a single line item and carry the change through to the owning
//! contribution, the ledger and any linked membership or registration.

use crate::controller::dependents::DependentUpdate;
use crate::controller::parse_positive_id;
use crate::form::{
    is_whole_number, Button, ButtonKind, FieldSpec, FormController, FormLayout, LineItemField,
    LineItemSubmission, RequestContext, SelectOption,
};
use crate::models::{
    Contribution, ContributionAdjustment, EntityTable, FinancialItem, LineItem, PriceField,
    UpdateLineItem,
};
use crate::services::ledger::sum_line_items;
use crate::services::money::check_amount_range;
use crate::services::metrics::{
    LEDGER_ADJUSTMENT_AMOUNT_TOTAL, LINE_ITEM_EDITS_TOTAL, VALIDATION_FAILURES_TOTAL,
};
use crate::services::{EntityStore, LedgerAdjuster, MoneyFormat};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationError, ValidationErrors};

const WHOLE_NUMBER_MESSAGE: &str = "Please enter a whole number quantity";

/// Initial form values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItemValues {
    pub financial_type_id: i64,
    pub label: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub tax_amount: Decimal,
    pub currency: String,
}

/// Everything `load` resolved about the line item being edited.
#[derive(Debug, Clone)]
pub struct LoadedLineItem {
    /// Stored line item with a missing tax amount read as zero.
    pub line_item: LineItem,
    pub entity_table: EntityTable,
    pub contribution: Contribution,
    pub price_field: PriceField,
    pub is_quick_config: bool,
    pub currency_symbol: String,
    pub defaults: LineItemValues,
}

impl LoadedLineItem {
    /// Quick-config price sets and fixed-quantity fields only take whole
    /// quantities.
    pub fn requires_whole_qty(&self) -> bool {
        self.is_quick_config || !self.price_field.is_enter_qty
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub line_item: LineItem,
    pub balance_amount: Decimal,
    pub adjustment: ContributionAdjustment,
    pub financial_items: Vec<FinancialItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent: Option<DependentUpdate>,
    /// Record counts for contact summary tabs the UI should refresh.
    pub update_tabs: BTreeMap<String, i64>,
}

pub struct LineItemEditController {
    pub(crate) store: Arc<dyn EntityStore>,
    ledger: Arc<dyn LedgerAdjuster>,
    money: MoneyFormat,
}

impl LineItemEditController {
    pub fn new(
        store: Arc<dyn EntityStore>,
        ledger: Arc<dyn LedgerAdjuster>,
        money: MoneyFormat,
    ) -> Self {
        Self {
            store,
            ledger,
            money,
        }
    }

    /// Load and submit from a raw parameter map without a form round trip.
    /// The ledger adjustment is marked as test and no tab refresh is emitted.
    #[instrument(skip(self, ctx, params), fields(request_id = %ctx.request_id))]
    pub async fn test_submit(
        &self,
        ctx: &RequestContext,
        params: &HashMap<String, String>,
    ) -> Result<SubmitOutcome, AppError> {
        let id = params
            .get("id")
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing id")))
            .and_then(|raw| parse_positive_id(raw))?;
        let ctx = ctx.for_test();
        let loaded = self.load(&ctx, id).await?;
        let submission = LineItemSubmission::from_params(params)?;
        self.submit(&ctx, &loaded, submission).await
    }

    async fn apply_submission(
        &self,
        ctx: &RequestContext,
        loaded: &LoadedLineItem,
        submission: LineItemSubmission,
    ) -> Result<SubmitOutcome, AppError> {
        let prior = &loaded.line_item;

        let line_total = self.money.clean_money(&submission.line_total)?;
        let unit_price = self.money.clean_money(&submission.unit_price)?;
        let qty = Decimal::from_str(&submission.qty)
            .map_err(|_| {
                AppError::BadRequest(anyhow::anyhow!("Invalid quantity '{}'", submission.qty))
            })
            .and_then(|qty| check_amount_range(qty, &submission.qty))?;
        let financial_type_id = submission.financial_type_id.ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Missing financial_type_id"))
        })?;

        let balance_amount = line_total - prior.line_total;
        info!(balance_amount = %balance_amount, "Line total changed");

        let tax_rates = self.store.get_tax_rates().await?;
        let tax_amount = match submission.tax_amount.as_deref() {
            Some(raw) if tax_rates.contains_key(&financial_type_id) => {
                self.money.clean_money(raw)?
            }
            _ => Decimal::ZERO,
        };

        let line_item = self
            .store
            .update_line_item(&UpdateLineItem {
                id: prior.id,
                financial_type_id,
                label: submission.label,
                qty,
                unit_price,
                line_total,
                tax_amount,
            })
            .await?;

        let contribution_id = prior.contribution_id;
        let siblings = self.store.list_contribution_line_items(contribution_id).await?;
        let (line_total_sum, tax_sum) = sum_line_items(&siblings);
        let adjustment = self
            .ledger
            .recompute_and_post(contribution_id, line_total_sum, tax_sum, ctx.is_test)
            .await?;
        LEDGER_ADJUSTMENT_AMOUNT_TOTAL
            .with_label_values(&[&loaded.contribution.currency])
            .inc_by(adjustment.balance.abs().to_f64().unwrap_or(0.0));

        let financial_items = self
            .ledger
            .insert_financial_item_on_edit(line_item.id, prior)
            .await?;

        let mut update_tabs = BTreeMap::new();
        let dependent = match loaded.entity_table {
            EntityTable::Contribution => None,
            entity_table => {
                let update = self.update_entity_record(ctx, &line_item).await?;
                if !ctx.is_test {
                    if let Some(tab) = entity_table.tab_selector() {
                        let count = self
                            .store
                            .count_component(entity_table, loaded.contribution.contact_id)
                            .await?;
                        update_tabs.insert(tab.to_string(), count);
                    }
                }
                Some(update)
            }
        };

        Ok(SubmitOutcome {
            line_item,
            balance_amount,
            adjustment,
            financial_items,
            dependent,
            update_tabs,
        })
    }
}

#[async_trait]
impl FormController for LineItemEditController {
    type Loaded = LoadedLineItem;
    type Submission = LineItemSubmission;
    type Outcome = SubmitOutcome;

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, line_item_id = %id))]
    async fn load(&self, ctx: &RequestContext, id: i64) -> Result<LoadedLineItem, AppError> {
        let mut line_item = self
            .store
            .get_line_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Line item {} not found", id)))?;
        line_item.tax_amount = Some(line_item.tax_or_zero());

        let entity_table = line_item.parsed_entity_table().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Line item {} has unknown entity table '{}'",
                id,
                line_item.entity_table
            ))
        })?;

        let contribution = self
            .store
            .get_contribution(line_item.contribution_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Contribution {} not found",
                    line_item.contribution_id
                ))
            })?;

        let currency_symbol = match self.store.get_currency(&contribution.currency).await? {
            Some(currency) => currency.symbol,
            None => {
                warn!(currency = %contribution.currency, "Unknown currency, showing code");
                contribution.currency.clone()
            }
        };

        let price_field = self
            .store
            .get_price_field(line_item.price_field_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Price field {} not found",
                    line_item.price_field_id
                ))
            })?;

        let price_set = self
            .store
            .get_price_set(price_field.price_set_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Price set {} not found",
                    price_field.price_set_id
                ))
            })?;

        let is_quick_config = price_set.is_quick_config;
        let qty = if is_quick_config || !price_field.is_enter_qty {
            line_item.qty.trunc()
        } else {
            line_item.qty
        };

        let defaults = LineItemValues {
            financial_type_id: line_item.financial_type_id,
            label: line_item.label.clone(),
            qty,
            unit_price: line_item.unit_price,
            line_total: line_item.line_total,
            tax_amount: line_item.tax_or_zero(),
            currency: currency_symbol.clone(),
        };

        Ok(LoadedLineItem {
            line_item,
            entity_table,
            contribution,
            price_field,
            is_quick_config,
            currency_symbol,
            defaults,
        })
    }

    async fn build_fields(
        &self,
        ctx: &RequestContext,
        loaded: &LoadedLineItem,
    ) -> Result<FormLayout, AppError> {
        let financial_types = self.store.list_financial_types(true).await?;
        let tax_rates = self.store.get_tax_rates().await?;

        let mut fields = Vec::new();
        for name in LineItemField::ALL {
            if name.is_display_only() {
                continue;
            }
            let mut field = FieldSpec::new(name, ctx.ts(name.label()));
            match name {
                LineItemField::LineTotal => {
                    field.size = Some(6);
                    field.maxlength = Some(14);
                }
                LineItemField::FinancialTypeId => {
                    field.options = financial_types
                        .iter()
                        .map(|ft| SelectOption {
                            value: ft.id,
                            label: ft.name.clone(),
                        })
                        .collect();
                    // Type and tax changes are only allowed on direct contribution lines.
                    field.frozen = loaded.entity_table != EntityTable::Contribution;
                }
                _ => {}
            }
            fields.push(field);
        }

        Ok(FormLayout {
            fields,
            field_names: LineItemField::ALL.to_vec(),
            currency_symbol: loaded.currency_symbol.clone(),
            is_tax_enabled: tax_rates.contains_key(&loaded.defaults.financial_type_id),
            tax_rates,
            buttons: vec![
                Button {
                    kind: ButtonKind::Submit,
                    name: ctx.ts("Submit"),
                    is_default: true,
                },
                Button {
                    kind: ButtonKind::Cancel,
                    name: ctx.ts("Close"),
                    is_default: false,
                },
            ],
        })
    }

    fn validate(
        &self,
        ctx: &RequestContext,
        loaded: &LoadedLineItem,
        submission: &LineItemSubmission,
    ) -> Result<(), AppError> {
        let mut errors = match submission.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if !submission.qty.is_empty()
            && !is_whole_number(&submission.qty)
            && loaded.requires_whole_qty()
        {
            let mut error = ValidationError::new("whole_number");
            error.message = Some(ctx.ts(WHOLE_NUMBER_MESSAGE).into());
            errors.add("qty", error);
        }

        if errors.errors().is_empty() {
            return Ok(());
        }

        for field in errors.errors().keys() {
            VALIDATION_FAILURES_TOTAL
                .with_label_values(&[&field.to_string()])
                .inc();
        }
        LINE_ITEM_EDITS_TOTAL
            .with_label_values(&[loaded.entity_table.as_str(), "invalid"])
            .inc();

        Err(AppError::ValidationError(errors))
    }

    #[instrument(
        skip(self, ctx, loaded, submission),
        fields(
            request_id = %ctx.request_id,
            line_item_id = %loaded.line_item.id,
            entity_table = %loaded.entity_table,
            is_test = ctx.is_test
        )
    )]
    async fn submit(
        &self,
        ctx: &RequestContext,
        loaded: &LoadedLineItem,
        submission: LineItemSubmission,
    ) -> Result<SubmitOutcome, AppError> {
        let result = self.apply_submission(ctx, loaded, submission).await;

        let status = if result.is_ok() { "success" } else { "error" };
        LINE_ITEM_EDITS_TOTAL
            .with_label_values(&[loaded.entity_table.as_str(), status])
            .inc();

        match &result {
            Ok(outcome) => info!(
                total_amount = %outcome.adjustment.total_amount,
                tax_amount = %outcome.adjustment.tax_amount,
                "Line item edit applied"
            ),
            Err(e) => warn!(error = %e, "Line item edit aborted"),
        }

        result
    }
}
