//! Rule-based field extractors for Turkish invoices.
//!
//! Extraction is expressed as ordered [`Cascade`]s of [`Rule`]s. The order of
//! rules is the priority order; the first accepted candidate wins.

pub mod amounts;
pub mod dates;
pub mod invoice_number;
pub mod number;
pub mod parties;
pub mod patterns;

pub use amounts::{extract_amounts, AmountExtractor};
pub use dates::{extract_date, parse_date, DateExtractor, DateKind};
pub use invoice_number::{extract_invoice_number, InvoiceNumberExtractor};
pub use number::parse_locale_number;
pub use parties::{extract_parties, split_regions, PartyExtractor};

use regex::Regex;
use tracing::debug;

/// Trait for field extractors.
///
/// Extractors never fail: a miss is represented inside `Output`
/// (`None`, `0.0`, or an empty record).
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Self::Output;
}

/// A single pattern in a cascade.
///
/// The pattern must define a `value` capture group. It may also define a
/// `veto` group; an occurrence where `veto` participates is skipped and the
/// search continues with the next occurrence of the same pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Short name used in logs and tests.
    pub label: &'static str,
    /// Compiled pattern.
    pub pattern: Regex,
}

impl Rule {
    /// Compile a rule.
    pub fn new(label: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label,
            pattern: Regex::new(pattern)?,
        })
    }

    /// First non-vetoed `value` capture in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern
            .captures_iter(text)
            .filter(|caps| caps.name("veto").is_none())
            .find_map(|caps| caps.name("value"))
            .map(|m| m.as_str())
    }
}

/// An ordered list of rules for one field.
#[derive(Debug, Clone)]
pub struct Cascade {
    field: &'static str,
    rules: Vec<Rule>,
}

impl Cascade {
    pub fn new(field: &'static str, rules: Vec<Rule>) -> Self {
        Self { field, rules }
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run the cascade.
    ///
    /// Each rule contributes at most its first candidate. When `accept`
    /// rejects it, the next rule is tried.
    pub fn first<T, F>(&self, text: &str, accept: F) -> Option<T>
    where
        F: Fn(&str) -> Option<T>,
    {
        self.first_labeled(text, accept).map(|(value, _)| value)
    }

    /// Like [`Cascade::first`], also returning the label of the winning rule.
    pub fn first_labeled<T, F>(&self, text: &str, accept: F) -> Option<(T, &'static str)>
    where
        F: Fn(&str) -> Option<T>,
    {
        for rule in &self.rules {
            let Some(candidate) = rule.find(text) else {
                continue;
            };

            match accept(candidate) {
                Some(value) => {
                    debug!("{}: matched by '{}'", self.field, rule.label);
                    return Some((value, rule.label));
                }
                None => debug!(
                    "{}: '{}' candidate {:?} rejected",
                    self.field, rule.label, candidate
                ),
            }
        }

        debug!("{}: no match", self.field);
        None
    }
}
