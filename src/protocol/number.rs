//! Phone number helpers for phonebook entries.

/// Type-of-address for numbers in international format (leading `+`)
pub const TOA_INTERNATIONAL: u8 = 145;

/// Type-of-address for everything else
pub const TOA_UNKNOWN: u8 = 129;

/// Returns the type-of-address indicator for a dial string.
///
/// Must be computed on the raw number, before separators are stripped.
pub fn toa_from_string(number: &str) -> u8 {
    if number.starts_with('+') {
        TOA_INTERNATIONAL
    } else {
        TOA_UNKNOWN
    }
}

/// Zero of every run of ten Unicode decimal digits (category Nd), sorted.
const DECIMAL_ZEROS: [u32; 66] = [
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0,
    0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6, 0x1E140,
    0x1E2F0, 0x1E950, 0x1FBF0,
];

/// Value of `c` as a decimal digit in any script.
///
/// # Example
/// ```
/// use hfp_phonebook::protocol::number::decimal_digit;
/// assert_eq!(decimal_digit('7'), Some(7));
/// assert_eq!(decimal_digit('\u{0665}'), Some(5));
/// assert_eq!(decimal_digit('½'), None);
/// ```
pub fn decimal_digit(c: char) -> Option<u32> {
    let code = u32::from(c);
    let run = match DECIMAL_ZEROS.binary_search(&code) {
        Ok(i) => i,
        Err(0) => return None,
        Err(i) => i - 1,
    };
    let value = code - DECIMAL_ZEROS[run];
    (value < 10).then_some(value)
}

/// True for characters that carry meaning in a dial string.
///
/// `N` is the wild character, `;` waits and `,` pauses.
fn is_non_separator(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '*' | '#' | '+' | 'N' | ';' | ',')
}

/// Removes formatting characters (spaces, dashes, parentheses, dots...) from
/// a phone number, keeping digits and dialing control characters. Digits of
/// any script are written out as ASCII.
///
/// # Example
/// ```
/// use hfp_phonebook::protocol::number::strip_separators;
/// assert_eq!(strip_separators("+1 (650) 555-0100"), "+16505550100");
/// assert_eq!(strip_separators("٠٥٥٥ ١٢٣"), "0555123");
/// ```
pub fn strip_separators(number: &str) -> String {
    number
        .chars()
        .filter_map(|c| match decimal_digit(c) {
            Some(d) => char::from_digit(d, 10),
            None if is_non_separator(c) => Some(c),
            None => None,
        })
        .collect()
}

/// Truncates a string to at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toa() {
        assert_eq!(toa_from_string("+441234567"), 145);
        assert_eq!(toa_from_string("0441234567"), 129);
        assert_eq!(toa_from_string(""), 129);
        // leading whitespace hides the plus sign
        assert_eq!(toa_from_string(" +44"), 129);
    }

    #[test]
    fn test_strip_separators() {
        assert_eq!(strip_separators("650.555.0100"), "6505550100");
        assert_eq!(strip_separators("*31#555 0100"), "*31#5550100");
        assert_eq!(strip_separators("555-0100,123;4"), "5550100,123;4");
        assert_eq!(strip_separators("abc"), "");
    }

    #[test]
    fn test_strip_separators_converts_non_ascii_digits() {
        // Arabic-Indic, extended Arabic-Indic, Devanagari, fullwidth
        assert_eq!(strip_separators("٠٥٥٥ ١٢٣"), "0555123");
        assert_eq!(strip_separators("۰۹۱۲-۳۴۵"), "0912345");
        assert_eq!(strip_separators("९८७ ६५"), "98765");
        assert_eq!(strip_separators("５５５０１００"), "5550100");
        assert_eq!(strip_separators("+４４ (２０)"), "+4420");
        // numeric but not decimal digits
        assert_eq!(strip_separators("½²Ⅻ"), "");
    }

    #[test]
    fn test_decimal_digit() {
        assert_eq!(decimal_digit('0'), Some(0));
        assert_eq!(decimal_digit('9'), Some(9));
        assert_eq!(decimal_digit('\u{0669}'), Some(9));
        assert_eq!(decimal_digit('\u{FF10}'), Some(0));
        assert_eq!(decimal_digit('\u{1D7CE}'), Some(0));
        assert_eq!(decimal_digit('\u{1D7FF}'), Some(9));
        assert_eq!(decimal_digit('/'), None);
        assert_eq!(decimal_digit(':'), None);
        assert_eq!(decimal_digit('\u{066A}'), None);
        assert_eq!(decimal_digit('a'), None);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 3), "hi");
        assert_eq!(truncate_chars("ÄÖÜäöü", 4), "ÄÖÜä");
    }
}
