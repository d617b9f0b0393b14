//! Supplier and customer extraction.
//!
//! The salutation anchor splits the document: the supplier block is printed
//! above it, the customer block starts with it. Each party is only ever
//! searched for in its own region, so an identifier found in one region can
//! never be attributed to the other party.

use tracing::debug;

use crate::models::invoice::{Customer, Supplier};

use super::patterns::{
    ADDRESS_RULES, ANCHOR, CITY_TRAILER, CUSTOMER_NAME_RULES, CUSTOMER_NAME_TRAILER,
    DOCUMENT_HEADING, EMAIL_RULES, LOWERCASE_PREFIX, PHONE_RULES, SUPPLIER_NAME_RULES,
    SUPPLIER_NAME_TRAILER, TAX_ID_RULES, WHITESPACE,
};
use super::FieldExtractor;

const SUPPLIER_NOISE: &[&str] = &["E-FATURA", "FATURA", "SAYIN", "TEL", "FAX"];
const CUSTOMER_NOISE: &[&str] = &["E-FATURA", "FATURA", "SAYIN"];

/// Names this short are discarded.
const MAX_REJECTED_NAME_LENGTH: usize = 3;
const MIN_PHONE_DIGITS: usize = 10;
const MIN_ADDRESS_LENGTH: usize = 5;

/// Split text into the supplier region and the customer region.
///
/// Without an anchor the text is cut at its midpoint (on a character
/// boundary).
pub fn split_regions(text: &str) -> (&str, &str) {
    let at = match ANCHOR.find(text) {
        Some(m) => m.start(),
        None => {
            debug!("No salutation anchor, splitting at midpoint");
            let mut mid = text.len() / 2;
            while !text.is_char_boundary(mid) {
                mid -= 1;
            }
            mid
        }
    };

    text.split_at(at)
}

/// Supplier and customer extractor.
pub struct PartyExtractor;

impl PartyExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the supplier from its region.
    pub fn supplier(&self, region: &str) -> Supplier {
        Supplier {
            name: SUPPLIER_NAME_RULES.first(region, clean_supplier_name),
            tax_id: TAX_ID_RULES.first(region, accept_tax_id),
            address: ADDRESS_RULES.first(region, clean_address),
            phone: PHONE_RULES.first(region, normalize_phone),
            email: EMAIL_RULES.first(region, |v| Some(v.to_string())),
        }
    }

    /// Extract the customer from its region.
    pub fn customer(&self, region: &str) -> Customer {
        Customer {
            name: CUSTOMER_NAME_RULES.first(region, clean_customer_name),
            tax_id: TAX_ID_RULES.first(region, accept_tax_id),
            address: ADDRESS_RULES.first(region, clean_address),
        }
    }
}

impl Default for PartyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for PartyExtractor {
    type Output = (Supplier, Customer);

    fn extract(&self, text: &str) -> Self::Output {
        let (supplier_region, customer_region) = split_regions(text);
        (self.supplier(supplier_region), self.customer(customer_region))
    }
}

/// Extract supplier and customer from invoice text.
pub fn extract_parties(text: &str) -> (Supplier, Customer) {
    PartyExtractor::new().extract(text)
}

fn accept_tax_id(candidate: &str) -> Option<String> {
    Some(candidate.to_string())
}

fn normalize_phone(candidate: &str) -> Option<String> {
    let phone: String = candidate
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    (digits >= MIN_PHONE_DIGITS).then_some(phone)
}

fn clean_address(candidate: &str) -> Option<String> {
    let address = WHITESPACE.replace_all(candidate.trim(), " ");
    let address = address.trim_end_matches([',', ';', ' ']);

    (address.chars().count() >= MIN_ADDRESS_LENGTH).then(|| address.to_string())
}

fn clean_supplier_name(candidate: &str) -> Option<String> {
    let name = WHITESPACE.replace_all(candidate.trim(), " ");
    let name = SUPPLIER_NAME_TRAILER.replace(&name, "");
    let name = CITY_TRAILER.replace(&name, "");
    let name = DOCUMENT_HEADING.replace(&name, "");
    let name = LOWERCASE_PREFIX.replace(&name, "");

    accept_name(name.trim(), SUPPLIER_NOISE)
}

fn clean_customer_name(candidate: &str) -> Option<String> {
    let name = WHITESPACE.replace_all(candidate.trim(), " ");
    let name = CUSTOMER_NAME_TRAILER.replace(&name, "");
    let name = CITY_TRAILER.replace(&name, "");

    accept_name(name.trim(), CUSTOMER_NOISE)
}

fn accept_name(name: &str, noise: &[&str]) -> Option<String> {
    if name.chars().count() <= MAX_REJECTED_NAME_LENGTH
        || noise.contains(&name.to_uppercase().as_str())
    {
        return None;
    }
    Some(name.to_string())
}
