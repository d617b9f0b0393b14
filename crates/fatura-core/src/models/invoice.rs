//! Extraction result model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Structured, best-effort data recovered from one invoice image.
///
/// Absent fields serialize as `null`, dates as ISO-8601 strings. A result with
/// every optional field empty and all amounts zero is valid: it means nothing
/// recognizable was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Invoice number or e-invoice identifier.
    pub invoice_number: Option<String>,

    /// Date the invoice was issued.
    pub issue_date: Option<NaiveDate>,

    /// Payment due date.
    pub due_date: Option<NaiveDate>,

    /// Monetary totals.
    pub amounts: Amounts,

    /// Issuing party, taken from the text before the anchor keyword.
    pub supplier: Supplier,

    /// Receiving party, taken from the text from the anchor keyword onward.
    pub customer: Customer,

    /// Line items. Always empty until table detection exists.
    pub items: Vec<LineItem>,

    /// Recognized text the fields were extracted from.
    pub raw_text: String,

    /// Average recognition confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Identifier of the recognition backend that produced `raw_text`.
    pub backend_id: String,

    /// Whitespace-delimited token count of `raw_text`.
    pub word_count: usize,
}

impl ExtractionResult {
    /// True when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.invoice_number.is_none()
            && self.issue_date.is_none()
            && self.due_date.is_none()
            && self.amounts == Amounts::default()
            && self.supplier == Supplier::default()
            && self.customer == Customer::default()
            && self.items.is_empty()
    }
}

/// Invoice totals. Missing values are 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Amounts {
    /// Amount before tax.
    pub subtotal: f64,
    /// Tax amount.
    pub tax: f64,
    /// Amount payable.
    pub total: f64,
}

/// Supplier identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub name: Option<String>,
    /// Tax identifier (VKN, 10 digits, or TCKN, 11 digits).
    pub tax_id: Option<String>,
    pub address: Option<String>,
    /// Phone number with spacing and punctuation removed.
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Customer identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: Option<String>,
    /// Tax identifier (VKN or TCKN).
    pub tax_id: Option<String>,
    pub address: Option<String>,
}

/// A single line item on the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product/service description.
    pub description: String,

    /// Quantity.
    pub quantity: f64,

    /// Unit price before tax.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    /// Tax rate in percent.
    pub tax_rate: f64,

    /// Tax amount for this line.
    pub tax_amount: f64,

    /// Line total.
    pub total: f64,
}
