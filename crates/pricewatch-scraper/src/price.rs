//! Free-text price parsing.
//!
//! Storefront HTML hands us strings like `"$1,299.99"`, `"€1.234,56"` or
//! `"₦ 15,000"`. This module turns them into a decimal amount plus a
//! 3-letter currency code. Manual char scanning keeps it dependency-light;
//! see [`crate::extract`] for how it composes into selector cascades.

use rust_decimal::Decimal;

/// Currency symbols stripped during cleaning.
const CURRENCY_SYMBOLS: [char; 6] = ['£', '€', '$', '₦', '¥', '₹'];

/// Extracts a price and currency code from arbitrary short text.
///
/// Currency detection precedence (first match wins): NGN symbol/word, GBP
/// symbol, EUR symbol, CAD marker, then USD as the default. The order is a
/// deliberate target-market choice and must stay stable.
///
/// Number-format disambiguation: when both `,` and `.` are present the
/// rightmost separator is the decimal point and the other is a thousands
/// separator. A lone `,` is a decimal point only when exactly two digits
/// follow it.
///
/// Never fails: unparseable input yields `(None, detected_currency)`. A zero
/// or negative amount is returned as-is; callers apply the strictly-positive
/// sanity check before accepting a price.
#[must_use]
pub fn parse_price(text: &str) -> (Option<Decimal>, String) {
    let text = text.trim();
    if text.is_empty() {
        return (None, "USD".to_string());
    }

    let currency = detect_currency(text);
    let cleaned = clean_numeric(text);
    let normalized = normalize_separators(&cleaned);

    (normalized.parse::<Decimal>().ok(), currency)
}

/// Detects the currency code, first match wins.
fn detect_currency(text: &str) -> String {
    let upper = text.to_uppercase();
    let code = if text.contains('₦') || upper.contains("NGN") {
        "NGN"
    } else if text.contains('£') {
        "GBP"
    } else if text.contains('€') {
        "EUR"
    } else if text.contains("CAD") || text.contains("C$") {
        "CAD"
    } else {
        "USD"
    };
    code.to_string()
}

/// Strips currency symbols, whitespace, and alphabetic characters, keeping
/// digits, separators, and a leading sign for the format pass.
fn clean_numeric(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !c.is_whitespace() && !c.is_alphabetic() && !CURRENCY_SYMBOLS.contains(c)
        })
        .collect()
}

/// Resolves `,`/`.` into a single canonical decimal point.
fn normalize_separators(cleaned: &str) -> String {
    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');

    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                // European: dots are thousands separators, comma is decimal.
                cleaned.replace('.', "").replace(',', ".")
            } else {
                // US: commas are thousands separators.
                cleaned.replace(',', "")
            }
        }
        (Some(comma), None) => {
            let digits_after = cleaned[comma + 1..].chars().count();
            if digits_after == 2 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_us_format_with_thousands_separator() {
        let (price, currency) = parse_price("$1,299.99");
        assert_eq!(price, Some(dec("1299.99")));
        assert_eq!(currency, "USD");
    }

    #[test]
    fn parses_european_format() {
        let (price, currency) = parse_price("€1.234,56");
        assert_eq!(price, Some(dec("1234.56")));
        assert_eq!(currency, "EUR");
    }

    #[test]
    fn empty_input_never_fails() {
        let (price, currency) = parse_price("");
        assert!(price.is_none());
        assert_eq!(currency, "USD");
    }

    #[test]
    fn whitespace_only_input_never_fails() {
        let (price, currency) = parse_price("   ");
        assert!(price.is_none());
        assert_eq!(currency, "USD");
    }

    #[test]
    fn ngn_symbol_takes_precedence() {
        let (price, currency) = parse_price("₦15,000");
        assert_eq!(price, Some(dec("15000")));
        assert_eq!(currency, "NGN");
    }

    #[test]
    fn ngn_word_is_case_insensitive() {
        let (price, currency) = parse_price("ngn 2,500");
        assert_eq!(price, Some(dec("2500")));
        assert_eq!(currency, "NGN");
    }

    #[test]
    fn detects_gbp_symbol() {
        let (price, currency) = parse_price("£10.50");
        assert_eq!(price, Some(dec("10.50")));
        assert_eq!(currency, "GBP");
    }

    #[test]
    fn detects_cad_marker() {
        let (price, currency) = parse_price("C$ 24.99");
        assert_eq!(price, Some(dec("24.99")));
        assert_eq!(currency, "CAD");
    }

    #[test]
    fn lone_comma_with_two_digits_is_decimal() {
        let (price, _) = parse_price("1,23");
        assert_eq!(price, Some(dec("1.23")));
    }

    #[test]
    fn lone_comma_with_three_digits_is_thousands() {
        let (price, _) = parse_price("1,234");
        assert_eq!(price, Some(dec("1234")));
    }

    #[test]
    fn trailing_currency_word_is_stripped() {
        let (price, currency) = parse_price("19.99 USD");
        assert_eq!(price, Some(dec("19.99")));
        assert_eq!(currency, "USD");
    }

    #[test]
    fn non_numeric_input_returns_none_with_currency() {
        let (price, currency) = parse_price("£call for price");
        assert!(price.is_none());
        assert_eq!(currency, "GBP");
    }

    #[test]
    fn zero_is_not_filtered_here() {
        let (price, _) = parse_price("$0.00");
        assert_eq!(price, Some(dec("0.00")));
    }

    #[test]
    fn unrecognized_symbol_fails_cleanly() {
        let (price, currency) = parse_price("₩5000");
        assert!(price.is_none());
        assert_eq!(currency, "USD");
    }
}
