//! Common test utilities for lineitem-service integration tests.

#![allow(dead_code)]

use axum::Router;
use chrono::NaiveDate;
use lineitem_service::config::{DatabaseConfig, LineItemConfig, StorageBackend};
use lineitem_service::controller::LineItemEditController;
use lineitem_service::form::{MessageCatalog, RequestContext};
use lineitem_service::models::{
    Contribution, Currency, EntityTable, FinancialType, LineItem, Membership, Participant,
    PriceField, PriceFieldValue, PriceSet,
};
use lineitem_service::services::{MemoryStore, MoneyFormat};
use lineitem_service::startup::{build_router, AppState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use service_core::config::Config as CommonConfig;
use std::collections::HashMap;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

pub const CONTACT_ID: i64 = 500;
pub const ATTENDEE_CONTACT_ID: i64 = 600;

pub const DONATION: i64 = 1;
pub const SALES: i64 = 2;
pub const MEMBER_DUES: i64 = 3;
pub const EVENT_FEE: i64 = 4;
pub const RETIRED: i64 = 5;

/// Contribution 100: one taxed enter-quantity line and one quick-config line.
pub const DIRECT_CONTRIBUTION: i64 = 100;
pub const TAXED_LINE: i64 = 1;
pub const QUICK_CONFIG_LINE: i64 = 2;

/// Contribution 200: membership 9 paid by line 42.
pub const MEMBERSHIP_CONTRIBUTION: i64 = 200;
pub const MEMBERSHIP_LINE: i64 = 42;
pub const MEMBERSHIP_ID: i64 = 9;

/// Contribution 300: participant 70 registered with options A (line 7) and B (line 8).
pub const EVENT_CONTRIBUTION: i64 = 300;
pub const OPTION_A_LINE: i64 = 7;
pub const OPTION_B_LINE: i64 = 8;
pub const PARTICIPANT_ID: i64 = 70;

/// Contribution 400: lines whose referenced records are missing or unknown.
pub const ORPHAN_CONTRIBUTION: i64 = 400;
pub const LINE_WITHOUT_CONTRIBUTION: i64 = 51;
pub const LINE_WITHOUT_PRICE_FIELD: i64 = 52;
pub const LINE_WITHOUT_PRICE_SET: i64 = 53;
pub const LINE_WITH_UNKNOWN_ENTITY: i64 = 54;
pub const LINE_WITHOUT_PARTICIPANT: i64 = 55;

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,lineitem_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[allow(clippy::too_many_arguments)]
fn line(
    id: i64,
    contribution_id: i64,
    entity_table: EntityTable,
    entity_id: i64,
    price_field_id: i64,
    price_field_value_id: Option<i64>,
    financial_type_id: i64,
    label: &str,
    qty: Decimal,
    unit_price: Decimal,
    line_total: Decimal,
    tax_amount: Option<Decimal>,
) -> LineItem {
    LineItem {
        id,
        contribution_id,
        entity_table: entity_table.as_str().to_string(),
        entity_id,
        price_field_id,
        price_field_value_id,
        financial_type_id,
        label: label.to_string(),
        qty,
        unit_price,
        line_total,
        tax_amount,
    }
}

fn paid_contribution(id: i64, contact_id: i64, total: Decimal, tax: Option<Decimal>) -> Contribution {
    Contribution {
        id,
        contact_id,
        currency: "USD".to_string(),
        total_amount: total,
        tax_amount: tax,
        net_amount: total,
        fee_amount: Decimal::ZERO,
        paid_amount: total,
        contribution_status: "completed".to_string(),
    }
}

/// A store holding the three fixture contributions, pinned to 2026-06-15.
pub async fn seeded_store() -> Arc<MemoryStore> {
    init_tracing();
    let store = MemoryStore::new().with_today(date("2026-06-15"));

    store
        .insert_currency(Currency {
            name: "USD".to_string(),
            symbol: "$".to_string(),
        })
        .await;

    for (id, name, is_active, tax_rate) in [
        (DONATION, "Donation", true, None),
        (SALES, "Sales", true, Some(dec!(10))),
        (MEMBER_DUES, "Member Dues", true, None),
        (EVENT_FEE, "Event Fee", true, None),
        (RETIRED, "Retired", false, None),
    ] {
        store
            .insert_financial_type(FinancialType {
                id,
                name: name.to_string(),
                is_active,
                tax_rate,
            })
            .await;
    }

    for (id, name, is_quick_config) in [
        (1, "Contribution Amount", true),
        (2, "Event Options", false),
        (3, "Membership Levels", false),
    ] {
        store
            .insert_price_set(PriceSet {
                id,
                name: name.to_string(),
                is_quick_config,
            })
            .await;
    }

    for (id, price_set_id, label, is_enter_qty) in [
        (10, 2, "Options", true),
        (11, 1, "Amount", false),
        (12, 3, "Membership", false),
        (13, 2, "Merchandise", true),
    ] {
        store
            .insert_price_field(PriceField {
                id,
                price_set_id,
                label: label.to_string(),
                is_enter_qty,
            })
            .await;
    }

    store
        .insert_price_field_value(PriceFieldValue {
            id: 110,
            price_field_id: 12,
            label: "General".to_string(),
            membership_type_id: Some(2),
            membership_num_terms: Some(1),
        })
        .await;
    for (id, label) in [(120, "Option A"), (121, "Option B")] {
        store
            .insert_price_field_value(PriceFieldValue {
                id,
                price_field_id: 10,
                label: label.to_string(),
                membership_type_id: None,
                membership_num_terms: None,
            })
            .await;
    }

    // Direct contribution: 100 + 10 tax + 15.
    store
        .insert_contribution(paid_contribution(
            DIRECT_CONTRIBUTION,
            CONTACT_ID,
            dec!(125),
            Some(dec!(10)),
        ))
        .await;
    store
        .insert_line_item(line(
            TAXED_LINE,
            DIRECT_CONTRIBUTION,
            EntityTable::Contribution,
            DIRECT_CONTRIBUTION,
            13,
            None,
            SALES,
            "T-shirt",
            dec!(2),
            dec!(50),
            dec!(100),
            Some(dec!(10)),
        ))
        .await;
    store
        .insert_line_item(line(
            QUICK_CONFIG_LINE,
            DIRECT_CONTRIBUTION,
            EntityTable::Contribution,
            DIRECT_CONTRIBUTION,
            11,
            None,
            DONATION,
            "Contribution Amount",
            dec!(1.5),
            dec!(10),
            dec!(15),
            None,
        ))
        .await;

    // Membership.
    store
        .insert_contribution(paid_contribution(
            MEMBERSHIP_CONTRIBUTION,
            CONTACT_ID,
            dec!(120),
            None,
        ))
        .await;
    store
        .insert_line_item(line(
            MEMBERSHIP_LINE,
            MEMBERSHIP_CONTRIBUTION,
            EntityTable::Membership,
            MEMBERSHIP_ID,
            12,
            Some(110),
            MEMBER_DUES,
            "General",
            dec!(1),
            dec!(120),
            dec!(120),
            None,
        ))
        .await;
    for (id, status) in [(MEMBERSHIP_ID, "pending"), (10, "current")] {
        store
            .insert_membership(Membership {
                id,
                contact_id: CONTACT_ID,
                membership_type_id: Some(2),
                status: status.to_string(),
                is_override: false,
                num_terms: 1,
                start_date: Some(date("2026-01-01")),
                end_date: Some(date("2026-12-31")),
            })
            .await;
    }

    // Event registration.
    store
        .insert_contribution(paid_contribution(
            EVENT_CONTRIBUTION,
            ATTENDEE_CONTACT_ID,
            dec!(30),
            None,
        ))
        .await;
    store
        .insert_line_item(line(
            OPTION_A_LINE,
            EVENT_CONTRIBUTION,
            EntityTable::Participant,
            PARTICIPANT_ID,
            10,
            Some(120),
            EVENT_FEE,
            "Option A",
            dec!(1),
            dec!(10),
            dec!(10),
            None,
        ))
        .await;
    store
        .insert_line_item(line(
            OPTION_B_LINE,
            EVENT_CONTRIBUTION,
            EntityTable::Participant,
            PARTICIPANT_ID,
            10,
            Some(121),
            EVENT_FEE,
            "Option B",
            dec!(1),
            dec!(20),
            dec!(20),
            None,
        ))
        .await;
    store
        .insert_participant(Participant {
            id: PARTICIPANT_ID,
            contact_id: ATTENDEE_CONTACT_ID,
            event_id: 1,
            fee_level: Some("Option A - 1, Option B - 1".to_string()),
            fee_amount: dec!(30),
        })
        .await;

    Arc::new(store)
}

/// Add contribution 400 and line items pointing at records that do not exist.
pub async fn add_orphan_lines(store: &MemoryStore) {
    store
        .insert_contribution(paid_contribution(
            ORPHAN_CONTRIBUTION,
            CONTACT_ID,
            dec!(10),
            None,
        ))
        .await;
    store
        .insert_price_field(PriceField {
            id: 14,
            price_set_id: 99,
            label: "Retired Options".to_string(),
            is_enter_qty: true,
        })
        .await;

    let contribution = EntityTable::Contribution.as_str();
    let participant = EntityTable::Participant.as_str();
    for (id, contribution_id, entity_table, entity_id, price_field_id) in [
        (LINE_WITHOUT_CONTRIBUTION, 999, contribution, 999, 13),
        (LINE_WITHOUT_PRICE_FIELD, ORPHAN_CONTRIBUTION, contribution, ORPHAN_CONTRIBUTION, 98),
        (LINE_WITHOUT_PRICE_SET, ORPHAN_CONTRIBUTION, contribution, ORPHAN_CONTRIBUTION, 14),
        (LINE_WITH_UNKNOWN_ENTITY, ORPHAN_CONTRIBUTION, "civicrm_grant", 1, 13),
        (LINE_WITHOUT_PARTICIPANT, ORPHAN_CONTRIBUTION, participant, 71, 10),
    ] {
        let mut item = line(
            id,
            contribution_id,
            EntityTable::Contribution,
            entity_id,
            price_field_id,
            None,
            EVENT_FEE,
            "Orphan",
            dec!(1),
            dec!(10),
            dec!(10),
            None,
        );
        item.entity_table = entity_table.to_string();
        store.insert_line_item(item).await;
    }
}

pub fn controller(store: Arc<MemoryStore>) -> LineItemEditController {
    LineItemEditController::new(store.clone(), store, MoneyFormat::default())
}

pub fn ctx() -> RequestContext {
    RequestContext::new("test-request", Arc::new(MessageCatalog::new("en_US")))
}

/// Build a submission parameter map.
pub fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn test_config() -> LineItemConfig {
    LineItemConfig {
        common: CommonConfig {
            port: 0,
            environment: "test".to_string(),
        },
        service_name: "lineitem-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
        },
        money: MoneyFormat::default(),
        storage_backend: StorageBackend::Memory,
        locale: "en_US".to_string(),
    }
}

/// Router over a seeded in-memory store.
pub async fn spawn_router() -> (Router, Arc<MemoryStore>) {
    let store = seeded_store().await;
    let state = AppState::new(store.clone(), &test_config());
    (build_router(state), store)
}
