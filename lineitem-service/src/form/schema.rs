//! Field schema for the line item edit form.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Editable attributes of a line item, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemField {
    FinancialTypeId,
    Label,
    Qty,
    UnitPrice,
    LineTotal,
    TaxAmount,
    Currency,
}

impl LineItemField {
    pub const ALL: [LineItemField; 7] = [
        LineItemField::FinancialTypeId,
        LineItemField::Label,
        LineItemField::Qty,
        LineItemField::UnitPrice,
        LineItemField::LineTotal,
        LineItemField::TaxAmount,
        LineItemField::Currency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemField::FinancialTypeId => "financial_type_id",
            LineItemField::Label => "label",
            LineItemField::Qty => "qty",
            LineItemField::UnitPrice => "unit_price",
            LineItemField::LineTotal => "line_total",
            LineItemField::TaxAmount => "tax_amount",
            LineItemField::Currency => "currency",
        }
    }

    /// Untranslated field label.
    pub fn label(&self) -> &'static str {
        match self {
            LineItemField::FinancialTypeId => "Financial Type",
            LineItemField::Label => "Label",
            LineItemField::Qty => "Quantity",
            LineItemField::UnitPrice => "Unit Price",
            LineItemField::LineTotal => "Total amount",
            LineItemField::TaxAmount => "Tax Amount",
            LineItemField::Currency => "Currency",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            LineItemField::FinancialTypeId => FieldKind::Select,
            LineItemField::Label => FieldKind::Text,
            LineItemField::Qty => FieldKind::Number,
            LineItemField::UnitPrice | LineItemField::TaxAmount => FieldKind::Money,
            LineItemField::LineTotal => FieldKind::Text,
            LineItemField::Currency => FieldKind::Display,
        }
    }

    /// Derived values the operator sees but never types.
    pub fn is_readonly(&self) -> bool {
        matches!(self, LineItemField::LineTotal | LineItemField::TaxAmount)
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, LineItemField::TaxAmount | LineItemField::Currency)
    }

    /// Rendered as text beside the amounts rather than as an input.
    pub fn is_display_only(&self) -> bool {
        matches!(self, LineItemField::Currency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Money,
    Select,
    Display,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: i64,
    pub label: String,
}

/// One rendered input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: LineItemField,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub readonly: bool,
    /// Shown with its value but not editable.
    pub frozen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxlength: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl FieldSpec {
    pub fn new(name: LineItemField, label: String) -> Self {
        Self {
            name,
            label,
            kind: name.kind(),
            required: name.is_required(),
            readonly: name.is_readonly(),
            frozen: false,
            size: None,
            maxlength: None,
            options: Vec::new(),
        }
    }

    /// Whether the operator can change this field.
    pub fn is_editable(&self) -> bool {
        !self.readonly && !self.frozen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub kind: ButtonKind,
    pub name: String,
    pub is_default: bool,
}

/// Everything the rendering layer needs to draw the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormLayout {
    pub fields: Vec<FieldSpec>,
    pub field_names: Vec<LineItemField>,
    pub currency_symbol: String,
    /// Tax rate by financial type id, for client-side recalculation.
    pub tax_rates: BTreeMap<i64, Decimal>,
    pub is_tax_enabled: bool,
    pub buttons: Vec<Button>,
}

impl FormLayout {
    pub fn field(&self, name: LineItemField) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}
