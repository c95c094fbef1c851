//! Updates to the membership or event registration a line item pays for.

use crate::controller::line_item_edit::LineItemEditController;
use crate::form::RequestContext;
use crate::models::{
    Activity, CreateActivity, EntityTable, LineItem, Membership, MembershipStatus, Participant,
    UpdateMembership, UpdateParticipantFee, CHANGE_REGISTRATION,
};
use crate::services::metrics::DEPENDENT_UPDATES_TOTAL;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use tracing::{info, instrument};

const FEE_LEVEL_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependentUpdate {
    Membership {
        membership: Membership,
    },
    Participant {
        participant: Participant,
        activity: Activity,
    },
}

/// Quantity as shown in a fee level, without trailing zeros.
pub fn format_quantity(qty: Decimal) -> String {
    qty.normalize().to_string()
}

/// Fee level text and fee amount for a registration's selected options.
///
/// Entries are keyed by price option: a later line for the same option
/// replaces the earlier entry in place. Lines without a price option are
/// listed individually.
pub fn fee_level_summary(items: &[LineItem]) -> (String, Decimal) {
    let mut entries: Vec<(Option<i64>, String)> = Vec::new();
    let mut fee_amount = Decimal::ZERO;

    for item in items {
        let entry = format!("{} - {}", item.label, format_quantity(item.qty));
        let existing = item.price_field_value_id.and_then(|value_id| {
            entries
                .iter()
                .position(|(key, _)| *key == Some(value_id))
        });
        match existing {
            Some(index) => entries[index].1 = entry,
            None => entries.push((item.price_field_value_id, entry)),
        }
        fee_amount += item.gross_total();
    }

    let fee_level = entries
        .into_iter()
        .map(|(_, entry)| entry)
        .collect::<Vec<_>>()
        .join(FEE_LEVEL_SEPARATOR);
    (fee_level, fee_amount)
}

impl LineItemEditController {
    /// Carry an edited line item through to the record it pays for.
    pub(crate) async fn update_entity_record(
        &self,
        ctx: &RequestContext,
        line_item: &LineItem,
    ) -> Result<DependentUpdate, AppError> {
        match line_item.parsed_entity_table() {
            Some(EntityTable::Membership) => self.update_membership(line_item).await,
            Some(EntityTable::Participant) => self.update_participant(ctx, line_item).await,
            _ => Err(AppError::InternalError(anyhow::anyhow!(
                "Line item {} is not attached to a membership or participant",
                line_item.id
            ))),
        }
    }

    #[instrument(skip(self, line_item), fields(membership_id = %line_item.entity_id))]
    async fn update_membership(&self, line_item: &LineItem) -> Result<DependentUpdate, AppError> {
        let value = match line_item.price_field_value_id {
            Some(id) => self.store.get_price_field_value(id).await?,
            None => None,
        };
        let terms_per_unit = value.as_ref().map(|v| v.terms_per_unit()).unwrap_or(1);
        let membership_type_id = value.and_then(|v| v.membership_type_id);

        let num_terms = (line_item.qty * Decimal::from(terms_per_unit))
            .trunc()
            .to_i32()
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Quantity {} is out of range for membership terms",
                    line_item.qty
                ))
            })?;

        let update = if line_item.qty.is_zero() {
            UpdateMembership {
                id: line_item.entity_id,
                num_terms,
                membership_type_id,
                status: Some(MembershipStatus::Cancelled),
                is_override: Some(true),
                skip_status_cal: true,
            }
        } else {
            UpdateMembership {
                id: line_item.entity_id,
                num_terms,
                membership_type_id,
                status: None,
                is_override: Some(false),
                skip_status_cal: false,
            }
        };

        let membership = self.store.update_membership(&update).await?;
        DEPENDENT_UPDATES_TOTAL.with_label_values(&["membership"]).inc();
        info!(
            num_terms,
            status = %membership.status,
            "Membership updated from line item"
        );

        Ok(DependentUpdate::Membership { membership })
    }

    #[instrument(skip(self, ctx, line_item), fields(participant_id = %line_item.entity_id))]
    async fn update_participant(
        &self,
        ctx: &RequestContext,
        line_item: &LineItem,
    ) -> Result<DependentUpdate, AppError> {
        self.store
            .get_participant(line_item.entity_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Participant {} not found",
                    line_item.entity_id
                ))
            })?;

        let selected = self
            .store
            .list_entity_line_items(EntityTable::Participant, line_item.entity_id, true)
            .await?;
        let (fee_level, fee_amount) = fee_level_summary(&selected);

        let participant = self
            .store
            .update_participant_fee(&UpdateParticipantFee {
                id: line_item.entity_id,
                fee_level: fee_level.clone(),
                fee_amount,
            })
            .await?;

        let activity = self
            .store
            .create_activity(&CreateActivity {
                activity_type: CHANGE_REGISTRATION.to_string(),
                source_record_id: participant.id,
                target_contact_id: participant.contact_id,
                subject: format!("{}: {}", ctx.ts(CHANGE_REGISTRATION), fee_level),
            })
            .await?;

        DEPENDENT_UPDATES_TOTAL.with_label_values(&["participant"]).inc();
        info!(fee_level = %fee_level, fee_amount = %fee_amount, "Registration fee updated");

        Ok(DependentUpdate::Participant {
            participant,
            activity,
        })
    }
}
