//! Contribution reconciliation arithmetic shared by the ledger backends.

use crate::models::{Contribution, ContributionStatus, CreateFinancialItem, LineItem};
use rust_decimal::Decimal;

/// Totals a contribution should carry after its line items changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentPlan {
    pub previous_total: Decimal,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub net_amount: Decimal,
    pub balance: Decimal,
    pub status: ContributionStatus,
}

impl AdjustmentPlan {
    /// A transaction is only posted when the contribution's worth changed.
    pub fn posts_trxn(&self) -> bool {
        !self.balance.is_zero()
    }
}

/// Sum line totals and tax across line items.
pub fn sum_line_items(items: &[LineItem]) -> (Decimal, Decimal) {
    items.iter().fold((Decimal::ZERO, Decimal::ZERO), |(total, tax), item| {
        (total + item.line_total, tax + item.tax_or_zero())
    })
}

pub fn plan_adjustment(
    contribution: &Contribution,
    line_total_sum: Decimal,
    tax_sum: Decimal,
) -> AdjustmentPlan {
    let total_amount = line_total_sum + tax_sum;
    AdjustmentPlan {
        previous_total: contribution.total_amount,
        total_amount,
        tax_amount: tax_sum,
        net_amount: total_amount - contribution.fee_amount,
        balance: total_amount - contribution.total_amount,
        status: ContributionStatus::from_amounts(total_amount, contribution.paid_amount),
    }
}

/// Financial items describing how `current` differs from `prior`.
///
/// A changed financial type reverses the prior amounts under the old type and
/// books the new amounts under the new one. Zero amounts are not recorded.
pub fn financial_items_on_edit(
    current: &LineItem,
    prior: &LineItem,
    contact_id: i64,
    currency: &str,
) -> Vec<CreateFinancialItem> {
    let item = |financial_type_id: i64, amount: Decimal, is_tax: bool| CreateFinancialItem {
        line_item_id: current.id,
        contact_id,
        financial_type_id,
        amount,
        currency: currency.to_string(),
        description: current.label.clone(),
        is_tax,
    };

    let candidates = if current.financial_type_id == prior.financial_type_id {
        vec![
            item(
                current.financial_type_id,
                current.line_total - prior.line_total,
                false,
            ),
            item(
                current.financial_type_id,
                current.tax_or_zero() - prior.tax_or_zero(),
                true,
            ),
        ]
    } else {
        vec![
            item(prior.financial_type_id, -prior.line_total, false),
            item(prior.financial_type_id, -prior.tax_or_zero(), true),
            item(current.financial_type_id, current.line_total, false),
            item(current.financial_type_id, current.tax_or_zero(), true),
        ]
    };

    candidates
        .into_iter()
        .filter(|i| !i.amount.is_zero())
        .collect()
}
