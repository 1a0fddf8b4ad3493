//! GSM 7-bit Default Alphabet
//!
//! Character mapping between Unicode and the GSM 03.38 default alphabet with
//! its extension table, used when the Hands-Free unit selects the `GSM`
//! character set with `AT+CSCS`.
//!
//! Output is one septet per octet (unpacked). Characters that only exist in
//! the extension table take two septets: the escape code followed by the
//! extension index. Characters found in neither table are sent as a space,
//! one per UTF-16 code unit, so a character outside the Basic Multilingual
//! Plane becomes two spaces.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Escape to the extension table.
pub const GSM_EXTENDED_ESCAPE: u8 = 0x1B;

/// GSM 03.38 default alphabet, indexed by septet value.
const DEFAULT_ALPHABET: &str = concat!(
    "@£$¥èéùìòÇ\nØø\rÅå",
    "Δ_ΦΓΛΩΠΨΣΘΞ\u{ffff}ÆæßÉ",
    " !\"#¤%&'()*+,-./0123456789:;<=>?",
    "¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§",
    "¿abcdefghijklmnopqrstuvwxyzäöñüà",
);

/// Extension table entries as (character, septet after escape).
const EXTENSION_TABLE: [(char, u8); 10] = [
    ('\u{000c}', 0x0A),
    ('^', 0x14),
    ('{', 0x28),
    ('}', 0x29),
    ('\\', 0x2F),
    ('[', 0x3C),
    ('~', 0x3D),
    (']', 0x3E),
    ('|', 0x40),
    ('€', 0x65),
];

fn default_table() -> &'static HashMap<char, u8> {
    static TABLE: OnceLock<HashMap<char, u8>> = OnceLock::new();
    TABLE.get_or_init(|| {
        DEFAULT_ALPHABET
            .chars()
            .enumerate()
            .map(|(septet, c)| (c, septet as u8))
            .collect()
    })
}

fn extension_table() -> &'static HashMap<char, u8> {
    static TABLE: OnceLock<HashMap<char, u8>> = OnceLock::new();
    TABLE.get_or_init(|| EXTENSION_TABLE.iter().copied().collect())
}

/// UTF-16 code units of `s`. Surrogate halves have no character.
fn code_units(s: &str) -> impl Iterator<Item = Option<char>> + '_ {
    s.encode_utf16().map(|unit| char::from_u32(u32::from(unit)))
}

/// Counts the septets needed to encode `s`.
///
/// Unencodable code units count as one septet (they become a space). A raw
/// escape character in the input is not counted.
pub fn count_gsm_septets(s: &str) -> usize {
    let default = default_table();
    let extension = extension_table();
    code_units(s)
        .filter(|&unit| unit != Some('\u{1b}'))
        .map(|unit| match unit {
            Some(c) if !default.contains_key(&c) && extension.contains_key(&c) => 2,
            _ => 1,
        })
        .sum()
}

/// Encodes a string into unpacked GSM septets, one per byte.
///
/// The output is sized by [`count_gsm_septets`]; encoding stops when it is full.
///
/// # Example
/// ```
/// use hfp_phonebook::protocol::gsm::string_to_gsm8bit_packed;
/// assert_eq!(string_to_gsm8bit_packed("A@"), vec![0x41, 0x00]);
/// assert_eq!(string_to_gsm8bit_packed("€"), vec![0x1B, 0x65]);
/// ```
pub fn string_to_gsm8bit_packed(s: &str) -> Vec<u8> {
    let capacity = count_gsm_septets(s);
    let default = default_table();
    let extension = extension_table();
    let space = default.get(&' ').copied().unwrap_or(b' ');

    let mut out = Vec::with_capacity(capacity);
    for unit in code_units(s) {
        if out.len() >= capacity {
            break;
        }
        let Some(c) = unit else {
            out.push(space);
            continue;
        };
        let septet = match default.get(&c) {
            Some(&v) => v,
            None => match extension.get(&c) {
                Some(&v) => {
                    // escape plus index must both fit
                    if out.len() + 1 >= capacity {
                        break;
                    }
                    out.push(GSM_EXTENDED_ESCAPE);
                    v
                }
                None => space,
            },
        };
        out.push(septet);
    }
    out
}

/// Encodes `s` and reinterprets every septet as a character, which is how
/// names are placed into `+CPBR` lines in the GSM character set.
///
/// Returns `None` when the encoding produced nothing.
pub fn encode_for_response(s: &str) -> Option<String> {
    let septets = string_to_gsm8bit_packed(s);
    if septets.is_empty() {
        return None;
    }
    Some(septets.into_iter().map(char::from).collect())
}
