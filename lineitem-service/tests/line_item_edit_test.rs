//! Line item edit flow against the in-memory store.

mod common;

use common::*;
use lineitem_service::controller::DependentUpdate;
use lineitem_service::form::{FormController, LineItemField, LineItemSubmission};
use lineitem_service::models::MembershipStatus;
use lineitem_service::services::EntityStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use service_core::error::AppError;

fn submission(pairs: &[(&str, &str)]) -> LineItemSubmission {
    LineItemSubmission::from_params(&params(pairs)).unwrap()
}

#[tokio::test]
async fn load_reads_defaults_with_currency_symbol() {
    let store = seeded_store().await;
    let controller = controller(store);

    let loaded = controller.load(&ctx(), TAXED_LINE).await.unwrap();

    assert_eq!(loaded.defaults.financial_type_id, SALES);
    assert_eq!(loaded.defaults.qty, dec!(2));
    assert_eq!(loaded.defaults.line_total, dec!(100));
    assert_eq!(loaded.defaults.tax_amount, dec!(10));
    assert_eq!(loaded.defaults.currency, "$");
    assert!(!loaded.requires_whole_qty());
}

#[tokio::test]
async fn load_truncates_quantity_for_quick_config() {
    let store = seeded_store().await;
    let controller = controller(store);

    let loaded = controller.load(&ctx(), QUICK_CONFIG_LINE).await.unwrap();

    assert!(loaded.is_quick_config);
    assert!(loaded.requires_whole_qty());
    assert_eq!(loaded.defaults.qty, dec!(1));
    // Missing tax is read as zero.
    assert_eq!(loaded.line_item.tax_amount, Some(Decimal::ZERO));
}

#[tokio::test]
async fn load_unknown_line_item_is_not_found() {
    let store = seeded_store().await;
    let controller = controller(store);

    let err = controller.load(&ctx(), 999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn load_reports_missing_related_records_as_not_found() {
    let store = seeded_store().await;
    add_orphan_lines(&store).await;
    let controller = controller(store.clone());

    for id in [
        LINE_WITHOUT_CONTRIBUTION,
        LINE_WITHOUT_PRICE_FIELD,
        LINE_WITHOUT_PRICE_SET,
    ] {
        let err = controller.load(&ctx(), id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "line {id}: {err}");
    }

    assert!(store.financial_trxns().await.is_empty());
    assert!(store.financial_items().await.is_empty());
}

#[tokio::test]
async fn load_rejects_unknown_entity_table() {
    let store = seeded_store().await;
    add_orphan_lines(&store).await;
    let controller = controller(store.clone());

    let err = controller
        .load(&ctx(), LINE_WITH_UNKNOWN_ENTITY)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InternalError(_)));
    assert!(store.financial_trxns().await.is_empty());
}

#[tokio::test]
async fn missing_participant_is_not_found() {
    let store = seeded_store().await;
    add_orphan_lines(&store).await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, LINE_WITHOUT_PARTICIPANT).await.unwrap();
    let err = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "4"),
                ("label", "Orphan"),
                ("qty", "2"),
                ("unit_price", "10"),
                ("line_total", "20"),
            ]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(store.activities().await.is_empty());
}

#[tokio::test]
async fn financial_type_is_frozen_for_membership_lines() {
    let store = seeded_store().await;
    let controller = controller(store);
    let ctx = ctx();

    let loaded = controller.load(&ctx, MEMBERSHIP_LINE).await.unwrap();
    let layout = controller.build_fields(&ctx, &loaded).await.unwrap();

    let financial_type = layout.field(LineItemField::FinancialTypeId).unwrap();
    assert!(financial_type.frozen);
    assert!(!financial_type.is_editable());
    assert!(financial_type
        .options
        .iter()
        .all(|option| option.value != RETIRED));

    let line_total = layout.field(LineItemField::LineTotal).unwrap();
    assert!(line_total.readonly);
    assert_eq!(line_total.size, Some(6));
    assert_eq!(line_total.maxlength, Some(14));

    assert!(layout.field(LineItemField::Currency).is_none());
    assert!(layout.field_names.contains(&LineItemField::Currency));
    assert_eq!(layout.currency_symbol, "$");
    assert!(!layout.is_tax_enabled);
    assert_eq!(layout.buttons.len(), 2);
}

#[tokio::test]
async fn financial_type_is_editable_for_contribution_lines() {
    let store = seeded_store().await;
    let controller = controller(store);
    let ctx = ctx();

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let layout = controller.build_fields(&ctx, &loaded).await.unwrap();

    assert!(!layout
        .field(LineItemField::FinancialTypeId)
        .unwrap()
        .frozen);
    assert!(layout.is_tax_enabled);
    assert_eq!(layout.tax_rates.get(&SALES), Some(&dec!(10)));
}

#[tokio::test]
async fn fractional_quantity_is_rejected_without_writes() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, MEMBERSHIP_LINE).await.unwrap();
    let err = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "3"),
                ("label", "General"),
                ("qty", "1.5"),
                ("unit_price", "120"),
                ("line_total", "180"),
            ]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(
        err.field_messages().get("qty"),
        Some(&vec!["Please enter a whole number quantity".to_string()])
    );

    let stored = store.get_line_item(MEMBERSHIP_LINE).await.unwrap().unwrap();
    assert_eq!(stored.qty, dec!(1));
    assert!(store.financial_trxns().await.is_empty());
}

#[tokio::test]
async fn fractional_quantity_is_accepted_for_enter_quantity_fields() {
    let store = seeded_store().await;
    let controller = controller(store);
    let ctx = ctx();

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let result = controller.validate(
        &ctx,
        &loaded,
        &submission(&[
            ("financial_type_id", "2"),
            ("label", "T-shirt"),
            ("qty", "2.5"),
            ("unit_price", "50"),
            ("line_total", "125"),
        ]),
    );

    assert!(result.is_ok());
}

#[tokio::test]
async fn missing_required_fields_are_reported() {
    let store = seeded_store().await;
    let controller = controller(store);
    let ctx = ctx();

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let err = controller
        .validate(&ctx, &loaded, &submission(&[("qty", "1")]))
        .unwrap_err();

    let fields = err.field_messages();
    assert!(fields.contains_key("financial_type_id"));
    assert!(fields.contains_key("label"));
    assert!(fields.contains_key("line_total"));
    assert!(!fields.contains_key("qty"));
}

#[tokio::test]
async fn formatted_amounts_are_cleaned_before_saving() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let outcome = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "2"),
                ("label", "T-shirt"),
                ("qty", "1"),
                ("unit_price", "1,234.50"),
                ("line_total", "1,234.50"),
                ("tax_amount", "123.45"),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.line_item.line_total, dec!(1234.50));
    assert_eq!(outcome.line_item.unit_price, dec!(1234.50));
    assert_eq!(outcome.line_item.tax_amount, Some(dec!(123.45)));
    assert_eq!(outcome.balance_amount, dec!(1134.50));

    // 1234.50 + 123.45 tax + 15 from the other line.
    assert_eq!(outcome.adjustment.total_amount, dec!(1372.95));
    assert_eq!(outcome.adjustment.tax_amount, dec!(123.45));
    assert_eq!(outcome.adjustment.contribution_status, "partially_paid");

    let trxn = outcome.adjustment.trxn.expect("trxn posted");
    assert_eq!(trxn.total_amount, dec!(1247.95));
    assert!(!trxn.is_test);

    let items = store.financial_items().await;
    let line_delta: Decimal = items.iter().filter(|i| !i.is_tax).map(|i| i.amount).sum();
    let tax_delta: Decimal = items.iter().filter(|i| i.is_tax).map(|i| i.amount).sum();
    assert_eq!(line_delta, dec!(1134.50));
    assert_eq!(tax_delta, dec!(113.45));

    assert!(outcome.dependent.is_none());
    assert!(outcome.update_tabs.is_empty());
}

#[tokio::test]
async fn tax_is_cleared_when_financial_type_is_untaxed() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let outcome = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "1"),
                ("label", "T-shirt"),
                ("qty", "2"),
                ("unit_price", "50"),
                ("line_total", "100"),
                ("tax_amount", "10"),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.line_item.financial_type_id, DONATION);
    assert_eq!(outcome.line_item.tax_amount, Some(Decimal::ZERO));
    assert_eq!(outcome.adjustment.tax_amount, Decimal::ZERO);
    assert_eq!(outcome.adjustment.total_amount, dec!(115));

    // Old type reversed, new type booked.
    let items = store.financial_items().await;
    assert!(items
        .iter()
        .any(|i| i.financial_type_id == SALES && i.amount == dec!(-100) && !i.is_tax));
    assert!(items
        .iter()
        .any(|i| i.financial_type_id == SALES && i.amount == dec!(-10) && i.is_tax));
    assert!(items
        .iter()
        .any(|i| i.financial_type_id == DONATION && i.amount == dec!(100)));
}

#[tokio::test]
async fn resubmitting_the_same_values_changes_nothing() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();
    let values = [
        ("financial_type_id", "2"),
        ("label", "T-shirt"),
        ("qty", "3"),
        ("unit_price", "50"),
        ("line_total", "150"),
        ("tax_amount", "15"),
    ];

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let first = controller
        .process(&ctx, &loaded, submission(&values))
        .await
        .unwrap();
    assert!(first.adjustment.trxn.is_some());

    let reloaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let second = controller
        .process(&ctx, &reloaded, submission(&values))
        .await
        .unwrap();

    assert_eq!(second.adjustment.total_amount, first.adjustment.total_amount);
    assert_eq!(second.adjustment.tax_amount, first.adjustment.tax_amount);
    assert_eq!(second.adjustment.balance, Decimal::ZERO);
    assert_eq!(second.balance_amount, Decimal::ZERO);
    assert!(second.adjustment.trxn.is_none());
    assert!(second.financial_items.is_empty());
    assert_eq!(store.financial_trxns().await.len(), 1);
}

#[tokio::test]
async fn zero_quantity_cancels_membership() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, MEMBERSHIP_LINE).await.unwrap();
    let outcome = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "3"),
                ("label", "General"),
                ("qty", "0"),
                ("unit_price", "120"),
                ("line_total", "0"),
            ]),
        )
        .await
        .unwrap();

    let membership = store.get_membership(MEMBERSHIP_ID).await.unwrap().unwrap();
    assert_eq!(membership.parsed_status(), MembershipStatus::Cancelled);
    assert!(membership.is_override);
    assert_eq!(membership.num_terms, 0);

    assert!(matches!(
        outcome.dependent,
        Some(DependentUpdate::Membership { .. })
    ));
    assert_eq!(outcome.update_tabs.get("#tab_member"), Some(&2));
    assert_eq!(outcome.adjustment.total_amount, Decimal::ZERO);
}

#[tokio::test]
async fn membership_terms_follow_quantity() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, MEMBERSHIP_LINE).await.unwrap();
    controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "3"),
                ("label", "General"),
                ("qty", "2"),
                ("unit_price", "120"),
                ("line_total", "240"),
            ]),
        )
        .await
        .unwrap();

    let membership = store.get_membership(MEMBERSHIP_ID).await.unwrap().unwrap();
    assert_eq!(membership.num_terms, 2);
    assert_eq!(membership.membership_type_id, Some(2));
    assert_eq!(membership.parsed_status(), MembershipStatus::Current);
    assert!(!membership.is_override);
}

#[tokio::test]
async fn restored_quantity_reactivates_cancelled_membership() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    for (qty, line_total) in [("0", "0"), ("1", "120")] {
        let loaded = controller.load(&ctx, MEMBERSHIP_LINE).await.unwrap();
        controller
            .process(
                &ctx,
                &loaded,
                submission(&[
                    ("financial_type_id", "3"),
                    ("label", "General"),
                    ("qty", qty),
                    ("unit_price", "120"),
                    ("line_total", line_total),
                ]),
            )
            .await
            .unwrap();
    }

    let membership = store.get_membership(MEMBERSHIP_ID).await.unwrap().unwrap();
    assert_eq!(membership.parsed_status(), MembershipStatus::Current);
    assert!(!membership.is_override);
    assert_eq!(membership.num_terms, 1);
}

#[tokio::test]
async fn oversized_amount_is_rejected_without_writes() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let err = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "2"),
                ("label", "T-shirt"),
                ("qty", "2"),
                ("unit_price", "50"),
                ("line_total", "79228162514264337593543950335"),
                ("tax_amount", "10"),
            ]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    let stored = store.get_line_item(TAXED_LINE).await.unwrap().unwrap();
    assert_eq!(stored.line_total, dec!(100));
    assert!(store.financial_trxns().await.is_empty());
}

#[tokio::test]
async fn participant_fee_level_lists_selected_options() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, OPTION_A_LINE).await.unwrap();
    let outcome = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "4"),
                ("label", "Option A"),
                ("qty", "2"),
                ("unit_price", "10"),
                ("line_total", "20"),
            ]),
        )
        .await
        .unwrap();

    let participant = store.get_participant(PARTICIPANT_ID).await.unwrap().unwrap();
    assert_eq!(
        participant.fee_level.as_deref(),
        Some("Option A - 2, Option B - 1")
    );
    assert_eq!(participant.fee_amount, dec!(40));

    let activities = store.activities().await;
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].activity_type, "Change Registration");
    assert_eq!(activities[0].source_record_id, PARTICIPANT_ID);
    assert_eq!(activities[0].target_contact_id, ATTENDEE_CONTACT_ID);
    assert_eq!(
        activities[0].subject,
        "Change Registration: Option A - 2, Option B - 1"
    );

    assert_eq!(outcome.update_tabs.get("#tab_participant"), Some(&1));
}

#[tokio::test]
async fn deselected_option_drops_out_of_fee_level() {
    let store = seeded_store().await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, OPTION_B_LINE).await.unwrap();
    controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "4"),
                ("label", "Option B"),
                ("qty", "0"),
                ("unit_price", "20"),
                ("line_total", "0"),
            ]),
        )
        .await
        .unwrap();

    let participant = store.get_participant(PARTICIPANT_ID).await.unwrap().unwrap();
    assert_eq!(participant.fee_level.as_deref(), Some("Option A - 1"));
    assert_eq!(participant.fee_amount, dec!(10));
}

#[tokio::test]
async fn failed_dependent_update_keeps_earlier_writes() {
    let store = seeded_store().await;
    store.inject_failure("update_membership").await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, MEMBERSHIP_LINE).await.unwrap();
    let err = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "3"),
                ("label", "General"),
                ("qty", "0"),
                ("unit_price", "120"),
                ("line_total", "0"),
            ]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DatabaseError(_)));

    let line = store.get_line_item(MEMBERSHIP_LINE).await.unwrap().unwrap();
    assert_eq!(line.qty, Decimal::ZERO);
    let contribution = store
        .get_contribution(MEMBERSHIP_CONTRIBUTION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contribution.total_amount, Decimal::ZERO);
    assert_eq!(store.financial_trxns().await.len(), 1);

    let membership = store.get_membership(MEMBERSHIP_ID).await.unwrap().unwrap();
    assert_eq!(membership.parsed_status(), MembershipStatus::Pending);
}

#[tokio::test]
async fn failed_line_item_write_leaves_contribution_untouched() {
    let store = seeded_store().await;
    store.inject_failure("update_line_item").await;
    let controller = controller(store.clone());
    let ctx = ctx();

    let loaded = controller.load(&ctx, TAXED_LINE).await.unwrap();
    let result = controller
        .process(
            &ctx,
            &loaded,
            submission(&[
                ("financial_type_id", "2"),
                ("label", "T-shirt"),
                ("qty", "3"),
                ("unit_price", "50"),
                ("line_total", "150"),
            ]),
        )
        .await;

    assert!(result.is_err());
    let contribution = store
        .get_contribution(DIRECT_CONTRIBUTION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contribution.total_amount, dec!(125));
    assert!(store.financial_trxns().await.is_empty());
}

#[tokio::test]
async fn test_submit_posts_test_transaction_without_tab_refresh() {
    let store = seeded_store().await;
    let controller = controller(store.clone());

    let outcome = controller
        .test_submit(
            &ctx(),
            &params(&[
                ("id", "42"),
                ("financial_type_id", "3"),
                ("label", "General"),
                ("qty", "2"),
                ("unit_price", "120"),
                ("line_total", "240"),
            ]),
        )
        .await
        .unwrap();

    let trxn = outcome.adjustment.trxn.expect("trxn posted");
    assert!(trxn.is_test);
    assert_eq!(trxn.total_amount, dec!(120));
    assert!(outcome.update_tabs.is_empty());

    let membership = store.get_membership(MEMBERSHIP_ID).await.unwrap().unwrap();
    assert_eq!(membership.num_terms, 2);
}

#[tokio::test]
async fn test_submit_requires_positive_id() {
    let store = seeded_store().await;
    let controller = controller(store);

    for id in ["0", "-4", "abc"] {
        let err = controller
            .test_submit(&ctx(), &params(&[("id", id)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "id {}", id);
    }

    let err = controller
        .test_submit(&ctx(), &params(&[("label", "x")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}
