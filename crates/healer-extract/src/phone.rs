//! Phone number discovery and normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Maximum phones kept per source.
pub const MAX_PHONES: usize = 3;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Tag regex is hardcoded and valid"));

static PHONE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        // (555) 123-4567, +1 (555) 123 4567
        Regex::new(r"(?:\+?1[-.\s]?)?\(\d{3}\)[-.\s]?\d{3}[-.\s]?\d{4}\b")
            .expect("US phone regex is hardcoded and valid"),
        // 555-123-4567, 555.123.4567, 5551234567
        Regex::new(r"\b(?:\+?1[-.\s]?)?\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b")
            .expect("US plain phone regex is hardcoded and valid"),
        // +44 20 7946 0958 style
        Regex::new(r"\+\d{1,3}[-.\s]?\d{2,4}[-.\s]?\d{3,4}[-.\s]?\d{3,4}\b")
            .expect("International phone regex is hardcoded and valid"),
    ]
});

/// Replace markup with spaces so numbers split across tags stay separate.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, " ").into_owned()
}

/// Normalize a raw match to `+1XXXXXXXXXX` or `+<digits>`.
///
/// Returns `None` for fewer than 10 digits, or for digit runs that are
/// neither US-shaped nor written with a leading `+`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if digits.len() < 10 {
        return None;
    }
    if digits.len() == 10 {
        return Some(format!("+1{digits}"));
    }
    if digits.len() == 11 && digits.starts_with('1') {
        return Some(format!("+{digits}"));
    }
    if trimmed.starts_with('+') {
        return Some(format!("+{digits}"));
    }
    None
}

/// Normalized phone numbers in `text` (HTML allowed), in order of first
/// appearance, at most [`MAX_PHONES`].
pub fn extract_phones(text: &str) -> Vec<String> {
    let plain = strip_tags(text);

    let mut found: Vec<(usize, String)> = PHONE_PATTERNS
        .iter()
        .flat_map(|pattern| {
            pattern
                .find_iter(&plain)
                .filter_map(|m| normalize_phone(m.as_str()).map(|p| (m.start(), p)))
                .collect::<Vec<_>>()
        })
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|(_, phone)| phone)
        .filter(|phone| seen.insert(phone.clone()))
        .take(MAX_PHONES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_formats_normalize_to_e164() {
        assert_eq!(extract_phones("Call (555) 123-4567"), vec!["+15551234567"]);
        assert_eq!(extract_phones("Call 555.123.4567"), vec!["+15551234567"]);
        assert_eq!(extract_phones("Call 1-555-123-4567"), vec!["+15551234567"]);
        assert_eq!(extract_phones("Call +1 555 123 4567"), vec!["+15551234567"]);
    }

    #[test]
    fn test_international_keeps_plus() {
        assert_eq!(extract_phones("Tel: +44 20 7946 0958"), vec!["+442079460958"]);
    }

    #[test]
    fn test_short_numbers_dropped() {
        assert!(extract_phones("Room 123-4567, zip 90210").is_empty());
        assert_eq!(normalize_phone("123-456"), None);
    }

    #[test]
    fn test_markup_is_ignored_and_duplicates_collapse() {
        let html = "<p>Call <b>(555) 123-4567</b></p><footer>555-123-4567</footer>";
        assert_eq!(extract_phones(html), vec!["+15551234567"]);
    }

    #[test]
    fn test_capped_at_three() {
        let text = "555-111-2222 555-333-4444 555-555-6666 555-777-8888";
        assert_eq!(
            extract_phones(text),
            vec!["+15551112222", "+15553334444", "+15555556666"]
        );
    }
}
