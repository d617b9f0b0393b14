//! Rule-based invoice parser combining all field extractors.

use std::time::Instant;

use tracing::{debug, info};

use crate::models::invoice::{ExtractionResult, LineItem};

use super::rules::{
    AmountExtractor, DateExtractor, FieldExtractor, InvoiceNumberExtractor, PartyExtractor,
};

/// Trait for invoice parsing.
pub trait InvoiceParser: Send + Sync {
    /// Parse recognized text into a result.
    ///
    /// Never fails; fields that cannot be found are left empty.
    fn parse(&self, text: &str) -> ExtractionResult;
}

/// Parser running the Turkish rule cascades.
pub struct RuleBasedParser {
    invoice_number: InvoiceNumberExtractor,
    issue_date: DateExtractor,
    due_date: DateExtractor,
    amounts: AmountExtractor,
    parties: PartyExtractor,
}

impl RuleBasedParser {
    pub fn new() -> Self {
        Self {
            invoice_number: InvoiceNumberExtractor::new(),
            issue_date: DateExtractor::issue(),
            due_date: DateExtractor::due(),
            amounts: AmountExtractor::new(),
            parties: PartyExtractor::new(),
        }
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceParser for RuleBasedParser {
    fn parse(&self, text: &str) -> ExtractionResult {
        let start = Instant::now();
        let (supplier, customer) = self.parties.extract(text);

        let result = ExtractionResult {
            invoice_number: self.invoice_number.extract(text),
            issue_date: self.issue_date.extract(text),
            due_date: self.due_date.extract(text),
            amounts: self.amounts.extract(text),
            supplier,
            customer,
            items: extract_line_items(text),
            raw_text: text.to_string(),
            word_count: text.split_whitespace().count(),
            ..Default::default()
        };

        if result.is_empty() {
            debug!("No invoice fields recognized");
        }

        info!(
            "Extracted fields in {}ms (invoice number: {}, total: {:.2})",
            start.elapsed().as_millis(),
            result.invoice_number.as_deref().unwrap_or("-"),
            result.amounts.total
        );

        result
    }
}

/// Line items need table detection, which is not available.
fn extract_line_items(_text: &str) -> Vec<LineItem> {
    Vec::new()
}
