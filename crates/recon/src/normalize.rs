//! Field normalization: trimming, lenient amount parsing for sums, and the
//! strict forms used for matching (exact cents, invoice-number core).

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Trimmed string form of an optional value; absent becomes `""`.
pub fn normalize(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Parse an amount for summation.
///
/// Strips thousands-separator commas and parses a fixed-point number.
/// Empty, unparsable or non-finite input yields `0.0`.
pub fn parse_amount(value: &str) -> f64 {
    let cleaned = strip_separators(value);
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Exact-cents rendering of an amount, used only for key equality.
///
/// `"1,000.00"`, `"1000"` and `"1000.0000"` all become `"100000"`.
/// Sub-cent digits round half-to-even. Returns `""` when the value is not
/// a decimal number at all.
pub fn amount_key(value: &str) -> String {
    let cleaned = strip_separators(value);
    if cleaned.is_empty() {
        return String::new();
    }

    let parsed = Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned));
    let Ok(amount) = parsed else {
        return String::new();
    };

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|c| c.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven))
        .and_then(|c| c.to_i128())
        .map(|cents| cents.to_string())
        .unwrap_or_default()
}

fn invoice_core_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]*[\s_/#.-]*(\d+)$").expect("static pattern"))
}

/// Canonical core of an invoice-number-like string.
///
/// The trailing digit run wins (`"SB-2016-00123"` → `"00123"`,
/// `"ACCREC-1234"` → `"1234"`). Without trailing digits, every
/// non-alphanumeric character is dropped (`"plain text"` → `"plaintext"`).
pub fn invoice_core(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(caps) = invoice_core_re().captures(trimmed) {
        if let Some(digits) = caps.get(1) {
            return digits.as_str().to_string();
        }
    }
    trimmed.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Replace `\r\n` and lone `\r` with `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Decode fetched bytes as UTF-8, substituting U+FFFD for invalid sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Interpret a loosely-typed flag column.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "true" | "1" | "x"
    )
}

fn strip_separators(value: &str) -> String {
    value.trim().replace(',', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_handles_absent_and_padding() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("  Acme Pty  ")), "Acme Pty");
        assert_eq!(normalize(Some("")), "");
    }

    #[test]
    fn parse_amount_separators_and_garbage() {
        assert_eq!(parse_amount("1,000.50"), 1000.5);
        assert_eq!(parse_amount("-42"), -42.0);
        assert_eq!(parse_amount("  12.25 "), 12.25);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("n/a"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
    }

    #[test]
    fn amount_key_is_exact_cents() {
        assert_eq!(amount_key("123.45"), amount_key("123.4500"));
        assert_eq!(amount_key("123.45"), "12345");
        assert_eq!(amount_key("1,000.00"), "100000");
        assert_eq!(amount_key("1000"), "100000");
        assert_eq!(amount_key("-5.5"), "-550");
        assert_eq!(amount_key("abc"), "");
        assert_eq!(amount_key(""), "");
    }

    #[test]
    fn amount_key_rounds_half_even() {
        assert_eq!(amount_key("0.125"), "12");
        assert_eq!(amount_key("0.135"), "14");
        assert_eq!(amount_key("0.1251"), "13");
    }

    #[test]
    fn invoice_core_examples() {
        assert_eq!(invoice_core("SB-2016-00123"), "00123");
        assert_eq!(invoice_core("ACCREC-1234"), "1234");
        assert_eq!(invoice_core("1234"), "1234");
        assert_eq!(invoice_core("INV 0042 "), "0042");
        assert_eq!(invoice_core("plain text"), "plaintext");
        assert_eq!(invoice_core(""), "");
    }

    #[test]
    fn newlines_are_unified() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn lossy_decode_never_fails() {
        let bytes = b"Date,Contact\n2016-01-01,Caf\xe9\n";
        let text = decode_text(bytes);
        assert!(text.contains('\u{FFFD}'));
        assert!(text.starts_with("Date,Contact"));
    }

    #[test]
    fn truthy_flags() {
        assert!(is_truthy("Y"));
        assert!(is_truthy(" yes "));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("N"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("false"));
    }
}
