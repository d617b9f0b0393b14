//! Pattern cascades for Turkish (and English) invoice fields.
//!
//! Rules capture the field in a `value` group; a `veto` group marks an
//! occurrence to skip. Turkish dotted/dotless i variants are spelled out in
//! character classes because case-insensitive matching does not fold them.

use lazy_static::lazy_static;
use regex::Regex;

use super::{Cascade, Rule};

/// Tax rate printed after the label: `(%20)`, `(20%)` or `%20`. Without
/// parentheses the percent sign is required so the rate cannot eat the amount.
const RATE_REQUIRED: &str = r"(?:\s*\(\s*%?\s*\d+\s*%?\s*\)|\s*%\s*\d+)";

/// Optional form of [`RATE_REQUIRED`].
const RATE: &str = r"(?:\s*\(\s*%?\s*\d+\s*%?\s*\)|\s*%\s*\d+)?";

/// Day/month/year shaped date, or year-first.
const DATE: &str = r"(?P<value>\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4})";

lazy_static! {
    // Invoice number: labeled forms first, bare series shapes after.
    pub static ref INVOICE_NUMBER_RULES: Cascade = Cascade::new("invoice_number", vec![
        Rule::new("ettn", r"(?i)\bETTN[:\s]*(?P<value>[a-f0-9\-]{36})").unwrap(),
        Rule::new(
            "fatura no",
            r"(?i)\bFatura\s*(?:No\b|Numaras[ıi]\b)[.:\s]*(?P<value>[A-Z0-9]{3,}-?[A-Z0-9]+)",
        ).unwrap(),
        Rule::new(
            "invoice no",
            r"(?i)\bInvoice\s*(?:No\b|Number\b|#)[.:\s]*(?P<value>[A-Z0-9]{3,}-?[A-Z0-9]+)",
        ).unwrap(),
        // e-Archive series such as ABC2025000000035
        Rule::new("series", r"\b(?P<value>[A-Z]{2,4}\d{10,})").unwrap(),
        // 48Q2025000000267
        Rule::new("numbered series", r"\b(?P<value>\d{2}[A-Z]\d{10,})").unwrap(),
        Rule::new(
            "generic number",
            r"(?i)\b(?:No|Number|Numara|Numaras[ıi])\b[.:\s]*(?P<value>[A-Z0-9\-]{8,})",
        ).unwrap(),
    ]);

    // Issue date. The bare "Date"/"Tarih" rules veto due-date phrasing.
    pub static ref ISSUE_DATE_RULES: Cascade = Cascade::new("issue_date", vec![
        Rule::new("fatura tarihi", &format!(r"(?i)\bFatura\s*Tar[İIıi]h[İIıi][:\s\[(]*{DATE}")).unwrap(),
        Rule::new("invoice date", &format!(r"(?i)\bInvoice\s*Date[:\s\[(]*{DATE}")).unwrap(),
        Rule::new("düzenleme tarihi", &format!(r"(?i)\bD[ÜU]zenleme\s*Tar[İIıi]h[İIıi][:\s\[(]*{DATE}")).unwrap(),
        Rule::new("date", &format!(r"(?i)(?P<veto>\b(?:Due|Payment)\s*)?\bDate[:\s]*{DATE}")).unwrap(),
        Rule::new("tarih", &format!(r"(?i)(?P<veto>[ÖO]deme\s*|\bVade\s*)?\bTar[İIıi]h[:\s]*{DATE}")).unwrap(),
    ]);

    pub static ref DUE_DATE_RULES: Cascade = Cascade::new("due_date", vec![
        Rule::new("son ödeme tarihi", &format!(r"(?i)\bSon\s*[ÖO]deme\s*Tar[İIıi]h[İIıi]?[:\s\[(]*{DATE}")).unwrap(),
        Rule::new("due date", &format!(r"(?i)\bDue\s*Date[:\s\[(]*{DATE}")).unwrap(),
        Rule::new("vade", &format!(r"(?i)\bVade(?:\s*Tar[İIıi]h[İIıi])?[:\s]*{DATE}")).unwrap(),
        Rule::new("payment due", &format!(r"(?i)\bPayment\s*Due(?:\s*Date)?[:\s]*{DATE}")).unwrap(),
    ]);

    // Amount payable. Keyword-before-amount forms, bare TOPLAM included,
    // outrank the amount-before form, and the bare TOPLAM rule vetoes
    // subtotal/tax labels.
    pub static ref TOTAL_RULES: Cascade = Cascade::new("total", vec![
        Rule::new(
            "ödenecek tutar",
            r"(?i)ÖDENECEK\s*TUTAR[Iıİ]?[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "vergiler dahil toplam",
            r"(?i)VERG[İIıi]LER\s*DAH[İIıi]L\s*TOPLAM\s*TUTAR[Iıİ]?[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "genel toplam",
            r"(?i)\bGENEL\s*TOPLAM[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "net toplam",
            r"(?i)\bNET\s*TOPLAM[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "grand total",
            r"(?i)\bGrand\s*Total[:\s|]*(?:TL|TRY|₺|\$|€)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "total amount",
            r"(?i)\bTotal\s+Amount[:\s|]*(?:TL|TRY|₺|\$|€)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "toplam",
            r"(?i)(?P<veto>\bARA\s*|H[İIıi]ZMET\s*|KDV\s*|MATRAH\s*)?\bTOPLAM\b[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "total",
            r"(?i)\bTotal\b[:\s|]*(?:TL|TRY|₺|\$|€)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "amount before toplam",
            r"(?i)(?P<value>\d[\d.,]*)\s*(?:TL|TY|₺)?\s*(?:TOPLAM|ÖDENECEK)",
        ).unwrap(),
    ]);

    // Amount before tax.
    pub static ref SUBTOTAL_RULES: Cascade = Cascade::new("subtotal", vec![
        Rule::new(
            "amount before matrah",
            r"(?i)(?P<value>\d[\d.,]*)\s*(?:TL|TY|₺)\s*(?:MAL\s*H[İIıi]ZMET|KDV\s*MATRAH)",
        ).unwrap(),
        Rule::new(
            "mal hizmet toplam",
            r"(?i)MAL\s*H[İIıi]ZMET\s*TOPLAM\s*TUTAR[Iıİ]?[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "kdv matrahı",
            r"(?i)KDV\s*MATRAH[Iıİ]?[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "matrah",
            r"(?i)\bMATRAH[Iıİ]?[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "ara toplam",
            r"(?i)\bARA\s*TOPLAM[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "subtotal",
            r"(?i)\bSub\s*total[:\s|]*(?:TL|TRY|₺|\$|€)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
    ]);

    pub static ref TAX_RULES: Cascade = Cascade::new("tax", vec![
        Rule::new(
            "kdv tutarı",
            r"(?i)\bKDV\s*TUTAR[Iıİ]?[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "kdv with rate",
            &format!(r"(?i)\bKDV\s*{RATE_REQUIRED}[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)"),
        ).unwrap(),
        Rule::new(
            "hesaplanan kdv",
            &format!(r"(?i)HESAPLANAN\s*KDV{RATE}[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)"),
        ).unwrap(),
        Rule::new(
            "vergi",
            r"(?i)\bVERG[İIıi]\b[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
        Rule::new(
            "tax",
            &format!(r"(?i)\bTax\b{RATE}[:\s|]*(?:TL|TRY|₺|\$|€)?\s*(?P<value>\d[\d.,]*)"),
        ).unwrap(),
        Rule::new(
            "vat",
            &format!(r"(?i)\bVAT\b{RATE}[:\s|]*(?:TL|TRY|₺|\$|€)?\s*(?P<value>\d[\d.,]*)"),
        ).unwrap(),
        // Bare KDV followed directly by the amount.
        Rule::new(
            "kdv",
            r"(?i)\bKDV\b[:\s|]*(?:TL|TRY|₺)?\s*(?P<value>\d[\d.,]*)",
        ).unwrap(),
    ]);

    /// Currency-suffixed amounts anywhere in the text.
    pub static ref CURRENCY_AMOUNT: Regex = Regex::new(
        r"(?i)(?P<value>\d[\d.,]*)\s*(?:TL|TY|₺)"
    ).unwrap();

    /// Salutation introducing the customer block.
    pub static ref ANCHOR: Regex = Regex::new(r"(?i)\bSAY[Iıİ]N\b").unwrap();

    // VKN (10 digits) or TCKN (11 digits).
    pub static ref TAX_ID_RULES: Cascade = Cascade::new("tax_id", vec![
        Rule::new("vkn/tckn", r"(?i)\b(?:VKN|TCKN)[.:\s]*(?P<value>\d{10,11})\b").unwrap(),
        Rule::new(
            "vergi kimlik no",
            r"(?i)\bVerg[İIıi]\s*(?:K[İIıi]ml[İIıi]k\s*)?(?:No|Numaras[ıi])[.:\s]*(?P<value>\d{10,11})\b",
        ).unwrap(),
        Rule::new("tax id", r"(?i)\bTax\s*(?:ID|No|Number)[.:\s]*(?P<value>\d{10,11})\b").unwrap(),
    ]);

    pub static ref PHONE_RULES: Cascade = Cascade::new("phone", vec![
        Rule::new("tel", r"(?i)\bTel(?:efon)?\b[.:\s]*(?P<value>\+?[\d \t\-()]{10,})").unwrap(),
        Rule::new("phone", r"(?i)\bPhone\b[.:\s]*(?P<value>\+?[\d \t\-()]{10,})").unwrap(),
    ]);

    pub static ref EMAIL_RULES: Cascade = Cascade::new("email", vec![
        Rule::new("email", r"(?P<value>[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})").unwrap(),
    ]);

    // Supplier name: legal-entity suffix, known brands, then whatever leads
    // the region up to a street marker.
    pub static ref SUPPLIER_NAME_RULES: Cascade = Cascade::new("supplier_name", vec![
        Rule::new(
            "legal entity",
            r"(?i)(?P<value>[A-ZÇĞIİÖŞÜ][A-ZÇĞIİÖŞÜa-zçğıiöşü \t]+(?:ANON[İI]M\s*[ŞS][İI]RKET[İI]|A\.\s?[ŞS]\.?|LTD\.?\s*[ŞS]T[İI]\.?|L[İI]M[İI]TED(?:\s*[ŞS][İI]RKET[İI])?|T[İI]CARET))",
        ).unwrap(),
        Rule::new(
            "brand",
            r"(?i)\b(?P<value>TTNET|TURKCELL|VODAFONE|T[ÜU]RK\s*TELEKOM)\b",
        ).unwrap(),
        Rule::new(
            "before address",
            r"(?i)^\s*(?P<value>[A-ZÇĞIİÖŞÜ][A-ZÇĞIİÖŞÜa-zçğıiöşü \t]{5,50})\s+(?:MAH(?:ALLES[İI])?|CAD(?:DES[İI])?|SOK(?:A[ĞK]I?)?|ADRES)\b",
        ).unwrap(),
    ]);

    // Customer name follows the anchor.
    pub static ref CUSTOMER_NAME_RULES: Cascade = Cascade::new("customer_name", vec![
        Rule::new(
            "sayın legal entity",
            r"(?i)\bSAY[Iıİ]N\s+(?P<value>[A-ZÇĞIİÖŞÜ][A-ZÇĞIİÖŞÜa-zçğıiöşü \t]+(?:ANON[İI]M\s*[ŞS][İI]RKET[İI]|A\.\s?[ŞS]\.?|LTD\.?\s*[ŞS]T[İI]\.?|L[İI]M[İI]TED(?:\s*[ŞS][İI]RKET[İI])?|T[İI]CARET))",
        ).unwrap(),
        Rule::new(
            "sayın before section",
            r"(?i)\bSAY[Iıİ]N\s+(?P<value>[A-ZÇĞIİÖŞÜ][A-ZÇĞIİÖŞÜa-zçğıiöşü \t]{5,60})\s+(?:VKN|TCKN|Verg[İIıi]|MAH|CAD|SOK|ADRES|Web|Tel|E-?Posta)\b",
        ).unwrap(),
        Rule::new(
            "sayın before delimiter",
            r"(?i)\bSAY[Iıİ]N\s+(?P<value>[A-ZÇĞIİÖŞÜa-zçğıiöşü \t]{5,80}?)\s+(?:No:|VKN\b|TCKN\b|Verg[İIıi]|Adres|Tel\b|Fax\b|Web\b|\d{5,})",
        ).unwrap(),
        Rule::new(
            "bill to",
            r"(?i)\b(?:Bill\s*To|Customer)[:\s]+(?P<value>[A-Za-z \t]{5,60}?)(?:\s+(?:Address|Phone|Email)\b|\s*$)",
        ).unwrap(),
    ]);

    // Address: explicit label, then a street-marker phrase.
    pub static ref ADDRESS_RULES: Cascade = Cascade::new("address", vec![
        Rule::new(
            "adres",
            r"(?i)\bAdres[İIıi]?\s*[:\s]\s*(?P<value>[^\n]{5,120}?)(?:\s+(?:Tel|Telefon|Fax|Faks|VKN|TCKN|Verg[İIıi]|E-?Posta|Web|Mersis|SAY[Iıİ]N)\b|\s*\n|\s*$)",
        ).unwrap(),
        Rule::new(
            "street",
            r"(?i)(?:^|\s)(?P<value>(?:[\p{L}\d]+\s+)?(?:MAH(?:ALLES[İI])?|CAD(?:DES[İI])?|SOK(?:A[ĞK]I?)?|BULVAR[Iıİ])\b[^\n]*?)(?:\s+(?:Tel|Telefon|Fax|Faks|VKN|TCKN|Verg[İIıi]|E-?Posta|Web|Mersis|SAY[Iıİ]N)\b|\s*\n|\s*$)",
        ).unwrap(),
    ]);

    // Name cleanup: everything from the first address or locality token on.
    pub static ref SUPPLIER_NAME_TRAILER: Regex = Regex::new(
        r"(?is)\s+(?:(?:MAH|MAHALLE|MAHALLES[İI]|CAD|CADDE|CADDES[İI]|SOK|SOKAK|SOKA[ĞG]I|ADRES|CUMHUR[İI]YET|ATAT[ÜU]RK|[İI]ST[İI]KLAL|BA[ĞG]DAT)\b|NO:).*$"
    ).unwrap();

    pub static ref CUSTOMER_NAME_TRAILER: Regex = Regex::new(
        r"(?is)\s+(?:(?:MAH|MAHALLE|MAHALLES[İI]|CAD|CADDE|CADDES[İI]|SOK|SOKAK|ADRES|VE|VKN|TCKN|VERG[İIıi])\b|NO:).*$"
    ).unwrap();

    pub static ref CITY_TRAILER: Regex = Regex::new(
        r"(?is)\s+(?:MEC[İI]D[İI]YEK[ÖO]Y|[ŞS][İI][ŞS]L[İI]|KAD[Iıİ]K[ÖO]Y|[ÜU]SK[ÜU]DAR|BEYO[ĞG]LU|BE[ŞS][İI]KTA[ŞS]|FAT[İI]H|[İI]STANBUL|ANKARA|[İI]ZM[İI]R|BURSA|ANTALYA)\b.*$"
    ).unwrap();

    /// Document-type heading printed ahead of the name: `e-Arşiv Fatura`,
    /// `E-FATURA`, `Fatura`.
    pub static ref DOCUMENT_HEADING: Regex = Regex::new(
        r"(?i)^[\s\-]*(?:(?:E\s*-?\s*)?(?:AR[ŞS][İIıi]V|FATURA)\b[\s\-]*)+"
    ).unwrap();

    /// OCR noise before a capitalised name.
    pub static ref LOWERCASE_PREFIX: Regex = Regex::new(r"^[a-z\s]+").unwrap();

    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(cascade: &Cascade) -> Vec<&'static str> {
        cascade.rules().iter().map(|r| r.label).collect()
    }

    fn rule_named<'c>(cascade: &'c Cascade, label: &str) -> &'c Rule {
        cascade.rules().iter().find(|r| r.label == label).unwrap()
    }

    #[test]
    fn test_total_prefers_keyword_before_amount() {
        let labels = labels(&TOTAL_RULES);
        let keyword = labels.iter().position(|l| *l == "ödenecek tutar").unwrap();
        let before = labels.iter().position(|l| *l == "amount before toplam").unwrap();
        assert!(keyword < before);
        assert_eq!(labels.last(), Some(&"amount before toplam"));
    }

    #[test]
    fn test_tax_rate_forms() {
        let rule = rule_named(&TAX_RULES, "kdv with rate");
        assert_eq!(rule.find("KDV (%20) 20,00 TL"), Some("20,00"));
        assert_eq!(rule.find("KDV %18: 180,00"), Some("180,00"));
        assert_eq!(rule.find("KDV 20,00 TL"), None);

        let rule = rule_named(&TAX_RULES, "hesaplanan kdv");
        assert_eq!(rule.find("Hesaplanan KDV %20 200,00 TL"), Some("200,00"));
        assert_eq!(rule.find("Hesaplanan KDV (20%): 200,00"), Some("200,00"));
        assert_eq!(rule.find("Hesaplanan KDV 200,00"), Some("200,00"));
    }

    #[test]
    fn test_bare_toplam_vetoes_subtotal_labels() {
        let rule = rule_named(&TOTAL_RULES, "toplam");

        assert_eq!(rule.find("Ara Toplam: 100,00"), None);
        assert_eq!(rule.find("Ara Toplam: 100,00 Toplam: 118,00"), Some("118,00"));
    }

    #[test]
    fn test_anchor_is_whole_word() {
        assert!(ANCHOR.is_match("SAYIN ABC"));
        assert!(ANCHOR.is_match("Sayın"));
        assert!(!ANCHOR.is_match("SAYINLAR"));
    }

    #[test]
    fn test_name_trailers() {
        assert_eq!(
            SUPPLIER_NAME_TRAILER.replace("ABC LTD ŞTİ Cumhuriyet Mah. No:5", ""),
            "ABC LTD ŞTİ"
        );
        assert_eq!(CITY_TRAILER.replace("XYZ A.Ş. Kadıköy İstanbul", ""), "XYZ A.Ş.");
        assert_eq!(CUSTOMER_NAME_TRAILER.replace("Ali Veli VKN 123", ""), "Ali Veli");
    }

    #[test]
    fn test_document_heading() {
        assert_eq!(DOCUMENT_HEADING.replace("e-Arşiv Fatura TURKCELL", ""), "TURKCELL");
        assert_eq!(DOCUMENT_HEADING.replace("Arşiv Fatura ABC A.Ş.", ""), "ABC A.Ş.");
        assert_eq!(DOCUMENT_HEADING.replace("E-FATURA XYZ LTD", ""), "XYZ LTD");
        assert_eq!(DOCUMENT_HEADING.replace("FATURALI HAT A.Ş.", ""), "FATURALI HAT A.Ş.");
    }
}
