//! PostgreSQL backend for lineitem-service.

use crate::models::{
    Activity, Contribution, ContributionAdjustment, CreateActivity, Currency, EntityTable,
    FinancialItem, FinancialTrxn, FinancialType, LineItem, Membership, Participant, PriceField,
    PriceFieldValue, PriceSet, UpdateLineItem, UpdateMembership, UpdateParticipantFee,
};
use crate::services::ledger::{financial_items_on_edit, plan_adjustment};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{EntityStore, LedgerAdjuster};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};

const LINE_ITEM_COLUMNS: &str = "id, contribution_id, entity_table, entity_id, price_field_id, \
     price_field_value_id, financial_type_id, label, qty, unit_price, line_total, tax_amount";

const CONTRIBUTION_COLUMNS: &str = "id, contact_id, currency, total_amount, tax_amount, \
     net_amount, fee_amount, paid_amount, contribution_status";

const MEMBERSHIP_COLUMNS: &str =
    "id, contact_id, membership_type_id, status, is_override, num_terms, start_date, end_date";

fn db_error(action: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", action, e))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "lineitem-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Line Item Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(line_item_id = %id))]
    async fn get_line_item(&self, id: i64) -> Result<Option<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_item"])
            .start_timer();

        let sql = format!("SELECT {} FROM line_items WHERE id = $1", LINE_ITEM_COLUMNS);
        let item = sqlx::query_as::<_, LineItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get line item", e))?;

        timer.observe_duration();

        Ok(item)
    }

    #[instrument(skip(self, input), fields(line_item_id = %input.id))]
    async fn update_line_item(&self, input: &UpdateLineItem) -> Result<LineItem, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_line_item"])
            .start_timer();

        let sql = format!(
            r#"
            UPDATE line_items
            SET financial_type_id = $2,
                label = $3,
                qty = $4,
                unit_price = $5,
                line_total = $6,
                tax_amount = $7
            WHERE id = $1
            RETURNING {}
            "#,
            LINE_ITEM_COLUMNS
        );
        let item = sqlx::query_as::<_, LineItem>(&sql)
            .bind(input.id)
            .bind(input.financial_type_id)
            .bind(&input.label)
            .bind(input.qty)
            .bind(input.unit_price)
            .bind(input.line_total)
            .bind(input.tax_amount)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update line item", e))?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Line item {} not found", input.id)))?;

        timer.observe_duration();

        info!(line_item_id = item.id, line_total = %item.line_total, "Line item updated");

        Ok(item)
    }

    #[instrument(skip(self), fields(contribution_id = %contribution_id))]
    async fn list_contribution_line_items(
        &self,
        contribution_id: i64,
    ) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_contribution_line_items"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM line_items WHERE contribution_id = $1 ORDER BY id",
            LINE_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, LineItem>(&sql)
            .bind(contribution_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list contribution line items", e))?;

        timer.observe_duration();

        Ok(items)
    }

    #[instrument(skip(self), fields(entity_table = %entity_table, entity_id = %entity_id))]
    async fn list_entity_line_items(
        &self,
        entity_table: EntityTable,
        entity_id: i64,
        positive_qty_only: bool,
    ) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_entity_line_items"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT {}
            FROM line_items
            WHERE entity_table = $1
              AND entity_id = $2
              AND ($3::bool = FALSE OR qty > 0)
            ORDER BY id
            "#,
            LINE_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, LineItem>(&sql)
            .bind(entity_table.as_str())
            .bind(entity_id)
            .bind(positive_qty_only)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list entity line items", e))?;

        timer.observe_duration();

        Ok(items)
    }

    // -------------------------------------------------------------------------
    // Contribution and Reference Data
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(contribution_id = %id))]
    async fn get_contribution(&self, id: i64) -> Result<Option<Contribution>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_contribution"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM contributions WHERE id = $1",
            CONTRIBUTION_COLUMNS
        );
        let contribution = sqlx::query_as::<_, Contribution>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get contribution", e))?;

        timer.observe_duration();

        Ok(contribution)
    }

    async fn get_currency(&self, name: &str) -> Result<Option<Currency>, AppError> {
        sqlx::query_as::<_, Currency>("SELECT name, symbol FROM currencies WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get currency", e))
    }

    async fn get_price_field(&self, id: i64) -> Result<Option<PriceField>, AppError> {
        sqlx::query_as::<_, PriceField>(
            "SELECT id, price_set_id, label, is_enter_qty FROM price_fields WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get price field", e))
    }

    async fn get_price_set(&self, id: i64) -> Result<Option<PriceSet>, AppError> {
        sqlx::query_as::<_, PriceSet>(
            "SELECT id, name, is_quick_config FROM price_sets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get price set", e))
    }

    async fn get_price_field_value(&self, id: i64) -> Result<Option<PriceFieldValue>, AppError> {
        sqlx::query_as::<_, PriceFieldValue>(
            r#"
            SELECT id, price_field_id, label, membership_type_id, membership_num_terms
            FROM price_field_values
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get price field value", e))
    }

    async fn list_financial_types(
        &self,
        active_only: bool,
    ) -> Result<Vec<FinancialType>, AppError> {
        sqlx::query_as::<_, FinancialType>(
            r#"
            SELECT id, name, is_active, tax_rate
            FROM financial_types
            WHERE ($1::bool = FALSE OR is_active = TRUE)
            ORDER BY name
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list financial types", e))
    }

    async fn get_tax_rates(&self) -> Result<BTreeMap<i64, Decimal>, AppError> {
        let rows: Vec<(i64, Decimal)> = sqlx::query_as(
            "SELECT id, tax_rate FROM financial_types WHERE tax_rate IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get tax rates", e))?;

        Ok(rows.into_iter().collect())
    }

    // -------------------------------------------------------------------------
    // Dependent Records
    // -------------------------------------------------------------------------

    async fn get_membership(&self, id: i64) -> Result<Option<Membership>, AppError> {
        let sql = format!("SELECT {} FROM memberships WHERE id = $1", MEMBERSHIP_COLUMNS);
        sqlx::query_as::<_, Membership>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get membership", e))
    }

    #[instrument(skip(self, input), fields(membership_id = %input.id))]
    async fn update_membership(&self, input: &UpdateMembership) -> Result<Membership, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_membership"])
            .start_timer();

        let current = self
            .get_membership(input.id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Membership {} not found", input.id)))?;
        let resolved = input.resolve(&current, Utc::now().date_naive());

        let sql = format!(
            r#"
            UPDATE memberships
            SET membership_type_id = $2,
                status = $3,
                is_override = $4,
                num_terms = $5
            WHERE id = $1
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        );
        let membership = sqlx::query_as::<_, Membership>(&sql)
            .bind(resolved.id)
            .bind(resolved.membership_type_id)
            .bind(&resolved.status)
            .bind(resolved.is_override)
            .bind(resolved.num_terms)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("update membership", e))?;

        timer.observe_duration();

        info!(status = %membership.status, num_terms = membership.num_terms, "Membership updated");

        Ok(membership)
    }

    async fn get_participant(&self, id: i64) -> Result<Option<Participant>, AppError> {
        sqlx::query_as::<_, Participant>(
            "SELECT id, contact_id, event_id, fee_level, fee_amount FROM participants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get participant", e))
    }

    #[instrument(skip(self, input), fields(participant_id = %input.id))]
    async fn update_participant_fee(
        &self,
        input: &UpdateParticipantFee,
    ) -> Result<Participant, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_participant_fee"])
            .start_timer();

        let participant = sqlx::query_as::<_, Participant>(
            r#"
            UPDATE participants
            SET fee_level = $2, fee_amount = $3
            WHERE id = $1
            RETURNING id, contact_id, event_id, fee_level, fee_amount
            "#,
        )
        .bind(input.id)
        .bind(&input.fee_level)
        .bind(input.fee_amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update participant", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Participant {} not found", input.id)))?;

        timer.observe_duration();

        Ok(participant)
    }

    #[instrument(skip(self, input), fields(source_record_id = %input.source_record_id))]
    async fn create_activity(&self, input: &CreateActivity) -> Result<Activity, AppError> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (activity_type, source_record_id, target_contact_id, subject)
            VALUES ($1, $2, $3, $4)
            RETURNING id, activity_type, source_record_id, target_contact_id, subject, created_utc
            "#,
        )
        .bind(&input.activity_type)
        .bind(input.source_record_id)
        .bind(input.target_contact_id)
        .bind(&input.subject)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create activity", e))?;

        info!(activity_id = activity.id, activity_type = %activity.activity_type, "Activity recorded");

        Ok(activity)
    }

    async fn count_component(
        &self,
        component: EntityTable,
        contact_id: i64,
    ) -> Result<i64, AppError> {
        let table = match component {
            EntityTable::Contribution => "contributions",
            EntityTable::Membership => "memberships",
            EntityTable::Participant => "participants",
        };
        let sql = format!("SELECT COUNT(*) FROM {} WHERE contact_id = $1", table);
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(contact_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count records", e))?;
        Ok(count)
    }
}

#[async_trait]
impl LedgerAdjuster for Database {
    #[instrument(skip(self), fields(contribution_id = %contribution_id))]
    async fn recompute_and_post(
        &self,
        contribution_id: i64,
        line_total_sum: Decimal,
        tax_sum: Decimal,
        is_test: bool,
    ) -> Result<ContributionAdjustment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recompute_and_post"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let sql = format!(
            "SELECT {} FROM contributions WHERE id = $1 FOR UPDATE",
            CONTRIBUTION_COLUMNS
        );
        let contribution = sqlx::query_as::<_, Contribution>(&sql)
            .bind(contribution_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("lock contribution", e))?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Contribution {} not found",
                    contribution_id
                ))
            })?;

        let plan = plan_adjustment(&contribution, line_total_sum, tax_sum);

        sqlx::query(
            r#"
            UPDATE contributions
            SET total_amount = $2,
                tax_amount = $3,
                net_amount = $4,
                contribution_status = $5
            WHERE id = $1
            "#,
        )
        .bind(contribution_id)
        .bind(plan.total_amount)
        .bind(plan.tax_amount)
        .bind(plan.net_amount)
        .bind(plan.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update contribution totals", e))?;

        let trxn = if plan.posts_trxn() {
            let trxn = sqlx::query_as::<_, FinancialTrxn>(
                r#"
                INSERT INTO financial_trxns (contribution_id, total_amount, net_amount, currency, is_test)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, contribution_id, total_amount, net_amount, currency, is_test, trxn_date
                "#,
            )
            .bind(contribution_id)
            .bind(plan.balance)
            .bind(plan.balance)
            .bind(&contribution.currency)
            .bind(is_test)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("insert financial transaction", e))?;
            Some(trxn)
        } else {
            None
        };

        tx.commit()
            .await
            .map_err(|e| db_error("commit adjustment", e))?;

        timer.observe_duration();

        info!(
            previous_total = %plan.previous_total,
            total_amount = %plan.total_amount,
            balance = %plan.balance,
            is_test = is_test,
            "Contribution totals adjusted"
        );

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
        let current = self.get_line_item(line_item_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Line item {} not found", line_item_id))
        })?;
        let contribution = self
            .get_contribution(current.contribution_id)
            .await?
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
            let item = sqlx::query_as::<_, FinancialItem>(
                r#"
                INSERT INTO financial_items (
                    line_item_id, contact_id, financial_type_id, amount, currency, description, is_tax
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, line_item_id, contact_id, financial_type_id, amount, currency,
                    description, is_tax, created_utc
                "#,
            )
            .bind(input.line_item_id)
            .bind(input.contact_id)
            .bind(input.financial_type_id)
            .bind(input.amount)
            .bind(&input.currency)
            .bind(&input.description)
            .bind(input.is_tax)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("insert financial item", e))?;
            created.push(item);
        }

        info!(items = created.len(), "Financial items recorded");

        Ok(created)
    }
}
