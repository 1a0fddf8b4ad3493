//! CPBR Range Processing
//!
//! Parses the `index1[,index2]` window of a phonebook read, applies the range
//! policy against the selected phonebook and renders one `+CPBR` line per row.
//!
//! ## Range Policy
//!
//! Some Hands-Free units drop the connection when a phonebook read fails, so
//! every request the phone cannot satisfy is answered with `OK` and no
//! entries:
//!
//! | Condition                           | Result                   |
//! |-------------------------------------|--------------------------|
//! | store unavailable                   | `OK`, no entries         |
//! | empty phonebook                     | `OK`, no entries         |
//! | `index1 <= 0`                       | `OK`, no entries         |
//! | `index2 < index1`                   | `OK`, no entries         |
//! | `index1 > count`                    | `OK`, no entries         |
//! | `index2 > count`                    | `index2` clamped         |
//!
//! ## Entry Format
//!
//! ```text
//! +CPBR: <index>,"<number>",<toa>,"<name>"\r\n\r\n
//! ```
//!
//! Names are trimmed and cut to 28 characters before the `/<type>` suffix;
//! numbers lose their separators and are cut to 30 characters.

use crate::access::PeerAddress;
use crate::commands::charset::CharacterSet;
use crate::commands::error::CommandError;
use crate::protocol::gsm::encode_for_response;
use crate::protocol::number::{strip_separators, toa_from_string, truncate_chars};
use crate::protocol::AtResponse;
use crate::storage::{
    CachedResult, ColumnRoles, PhoneType, PhonebookId, PhonebookRegistry, PhonebookStore,
    Presentation, RowCursor,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Longest name sent in a `+CPBR` line, before the type suffix
pub const MAX_NAME_LENGTH: usize = 28;

/// Longest number sent in a `+CPBR` line
pub const MAX_NUMBER_LENGTH: usize = 30;

/// The index window of a phonebook read, 1-based and inclusive, exactly as the
/// peer sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub index1: i32,
    pub index2: i32,
}

impl IndexRange {
    pub fn new(index1: i32, index2: i32) -> Self {
        Self { index1, index2 }
    }

    /// Parses `index1[,index2]`. A missing `index2` defaults to `index1`.
    ///
    /// `;` command separators are ignored, indices past the second are
    /// ignored, and trailing empty fields are dropped.
    ///
    /// # Example
    /// ```
    /// use hfp_phonebook::commands::IndexRange;
    /// assert_eq!(IndexRange::parse("1,10"), Ok(IndexRange::new(1, 10)));
    /// assert_eq!(IndexRange::parse("5;"), Ok(IndexRange::new(5, 5)));
    /// assert!(IndexRange::parse("a,2").is_err());
    /// ```
    pub fn parse(argument: &str) -> Result<Self, CommandError> {
        let mut fields: Vec<&str> = argument.split(',').collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }

        let parse_index = |field: &str| -> Result<i32, CommandError> {
            field
                .replace(';', " ")
                .trim()
                .parse::<i32>()
                .map_err(|e| CommandError::InvalidArgument(format!("index '{}': {}", field, e)))
        };

        let first = fields
            .first()
            .ok_or_else(|| CommandError::InvalidArgument(format!("no index in '{}'", argument)))?;
        let index1 = parse_index(first)?;
        let index2 = match fields.get(1) {
            Some(field) => parse_index(field)?,
            None => index1,
        };
        Ok(Self { index1, index2 })
    }

    /// The rows to emit out of `count`, as a 1-based inclusive pair.
    ///
    /// Returns `None` when the request is answered with no entries. `index2`
    /// is clamped to `count`.
    pub fn window(self, count: usize) -> Option<(usize, usize)> {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let (index1, index2) = (i64::from(self.index1), i64::from(self.index2));
        if count == 0 || index1 <= 0 || index2 < index1 || index1 > count {
            return None;
        }
        // both bounds lie in 1..=count here
        Some((index1 as usize, index2.min(count) as usize))
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.index1, self.index2)
    }
}

/// Progress of the single in-flight phonebook read.
///
/// At most one read exists per handler. While the state is not `Idle`, any
/// further read is rejected as busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpbrState {
    #[default]
    Idle,
    /// Waiting for the user to decide on `peer`'s phonebook access
    AwaitingAccess { peer: PeerAddress, range: IndexRange },
    /// Rows are being read and formatted
    Emitting { range: IndexRange },
}

impl CpbrState {
    /// The range being served, if any.
    pub fn pending_range(&self) -> Option<IndexRange> {
        match *self {
            CpbrState::Idle => None,
            CpbrState::AwaitingAccess { range, .. } | CpbrState::Emitting { range } => Some(range),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, CpbrState::Idle)
    }

    pub fn is_awaiting_access(&self) -> bool {
        matches!(self, CpbrState::AwaitingAccess { .. })
    }
}

/// Rendering options for `+CPBR` lines.
#[derive(Debug, Clone, Copy)]
pub struct RowFormat<'a> {
    pub charset: CharacterSet,
    /// Shown instead of the name when the number may not be presented
    pub unknown_number: &'a str,
}

/// A formatted phonebook entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonebookEntry {
    pub index: usize,
    pub number: String,
    pub toa: u8,
    pub name: String,
}

impl PhonebookEntry {
    /// The `+CPBR` response line, including its trailing blank line.
    pub fn to_line(&self) -> String {
        format!(
            "+CPBR: {},\"{}\",{},\"{}\"\r\n\r\n",
            self.index, self.number, self.toa, self.name
        )
    }
}

/// Formats the row under the cursor.
pub fn format_row(
    cursor: &dyn RowCursor,
    roles: ColumnRoles,
    index: usize,
    store: &dyn PhonebookStore,
    format: &RowFormat<'_>,
) -> PhonebookEntry {
    let raw_number = roles.number.and_then(|col| cursor.get_string(col));

    let name = match roles.name {
        Some(col) => cursor.get_string(col),
        None => match raw_number.as_deref() {
            Some(number) if !number.is_empty() => caller_id_name(store, number),
            _ => None,
        },
    }
    .unwrap_or_default();
    let mut name = truncate_chars(name.trim(), MAX_NAME_LENGTH).to_string();

    if let Some(col) = roles.phone_type {
        let phone_type = PhoneType::from_raw(cursor.get_int(col).unwrap_or(0));
        name.push('/');
        name.push(phone_type.letter());
    }

    let raw_number = raw_number.unwrap_or_default();
    let toa = toa_from_string(&raw_number);
    let mut number =
        truncate_chars(&strip_separators(raw_number.trim()), MAX_NUMBER_LENGTH).to_string();

    let presentation = roles.number_presentation.map_or(Presentation::Allowed, |col| {
        Presentation::from_raw(cursor.get_int(col).unwrap_or(0))
    });
    if presentation != Presentation::Allowed {
        number.clear();
        name = format.unknown_number.to_string();
    }

    if !name.is_empty() && format.charset == CharacterSet::Gsm {
        name = encode_for_response(&name).unwrap_or_else(|| {
            warn!(index, "Name has no GSM encoding, using placeholder");
            format.unknown_number.to_string()
        });
    }

    PhonebookEntry {
        index,
        number,
        toa,
        name,
    }
}

fn caller_id_name(store: &dyn PhonebookStore, number: &str) -> Option<String> {
    match store.lookup_caller_id(number) {
        Ok(Some(caller)) => Some(caller.name),
        Ok(None) => {
            debug!(number, "Caller ID lookup failed");
            None
        }
        Err(e) => {
            warn!(number, error = %e, "Caller ID lookup unavailable");
            None
        }
    }
}

/// Reads `range` from the selected phonebook and returns one info response
/// per entry.
///
/// The phonebook is always re-queried and its result set is released before
/// returning, whatever the outcome.
pub fn read_entries(
    registry: &mut PhonebookRegistry,
    range: IndexRange,
    format: &RowFormat<'_>,
) -> Result<Vec<AtResponse>, CommandError> {
    let id = registry.selected();
    if id == PhonebookId::Sm {
        debug!("SIM phonebook is always empty");
        return Ok(Vec::new());
    }

    let store = Arc::clone(registry.store());
    let entry = match registry.resolve(id, true) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(phonebook = %id, error = %e, "Phonebook unavailable, answering with no entries");
            return Ok(Vec::new());
        }
    };

    let result = emit_window(entry, range, store.as_ref(), format);
    registry.invalidate(id);
    result
}

fn emit_window(
    entry: &mut CachedResult,
    range: IndexRange,
    store: &dyn PhonebookStore,
    format: &RowFormat<'_>,
) -> Result<Vec<AtResponse>, CommandError> {
    let count = entry.count();
    let Some((first, last)) = range.window(count) else {
        warn!(
            index1 = range.index1,
            index2 = range.index2,
            count,
            "Invalid range or no results, answering with no entries"
        );
        return Ok(Vec::new());
    };
    if i64::from(range.index2) > last as i64 {
        warn!(index2 = range.index2, count, "Requested range exceeds phonebook, clamping");
    }

    let roles = entry.roles();
    let cursor = entry.cursor_mut().ok_or(CommandError::ResultSetLost)?;
    if !cursor.move_to_position(first - 1) {
        return Err(CommandError::ResultSetLost);
    }
    debug!(index1 = first, index2 = last, "Emitting phonebook entries");

    let mut lines = Vec::with_capacity(last - first + 1);
    for index in first..=last {
        let row = format_row(&*cursor, roles, index, store, format);
        trace!(index, number = %row.number, "Phonebook entry");
        lines.push(AtResponse::info(row.to_line()));
        if !cursor.move_to_next() {
            break;
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CallRecord, CallType, Column, ContactRecord, MemoryStore, StoreQuery};

    const FORMAT: RowFormat<'static> = RowFormat {
        charset: CharacterSet::Utf8,
        unknown_number: "Unknown",
    };

    fn registry_with(store: &Arc<MemoryStore>, phonebook: &str) -> PhonebookRegistry {
        let mut registry = PhonebookRegistry::new(store.clone(), 16384);
        registry.select(phonebook).unwrap();
        registry
    }

    fn lines(responses: &[AtResponse]) -> Vec<String> {
        responses.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(IndexRange::parse("1,10"), Ok(IndexRange::new(1, 10)));
        assert_eq!(IndexRange::parse("7"), Ok(IndexRange::new(7, 7)));
        assert_eq!(IndexRange::parse("7,"), Ok(IndexRange::new(7, 7)));
        assert_eq!(IndexRange::parse(" 2 , 4;"), Ok(IndexRange::new(2, 4)));
        assert_eq!(IndexRange::parse("1,2,3"), Ok(IndexRange::new(1, 2)));
        assert_eq!(IndexRange::parse("-1,3"), Ok(IndexRange::new(-1, 3)));
    }

    #[test]
    fn test_parse_range_invalid() {
        assert!(matches!(IndexRange::parse("x"), Err(CommandError::InvalidArgument(_))));
        assert!(matches!(IndexRange::parse(","), Err(CommandError::InvalidArgument(_))));
        assert!(matches!(IndexRange::parse(",5"), Err(CommandError::InvalidArgument(_))));
        assert!(matches!(IndexRange::parse("1,b"), Err(CommandError::InvalidArgument(_))));
        assert!(matches!(IndexRange::parse("99999999999"), Err(CommandError::InvalidArgument(_))));
    }

    #[test]
    fn test_window_policy() {
        assert_eq!(IndexRange::new(1, 5).window(0), None);
        assert_eq!(IndexRange::new(0, 5).window(10), None);
        assert_eq!(IndexRange::new(-3, 5).window(10), None);
        assert_eq!(IndexRange::new(5, 4).window(10), None);
        assert_eq!(IndexRange::new(11, 12).window(10), None);

        assert_eq!(IndexRange::new(1, 5).window(10), Some((1, 5)));
        assert_eq!(IndexRange::new(10, 10).window(10), Some((10, 10)));
        assert_eq!(IndexRange::new(8, 50).window(10), Some((8, 10)));
    }

    #[test]
    fn test_state_pending_range() {
        let range = IndexRange::new(1, 2);
        assert_eq!(CpbrState::Idle.pending_range(), None);
        let waiting = CpbrState::AwaitingAccess { peer: PeerAddress::EMPTY, range };
        assert_eq!(waiting.pending_range(), Some(range));
        assert!(waiting.is_awaiting_access());
        assert_eq!(CpbrState::Emitting { range }.pending_range(), Some(range));
        assert!(!CpbrState::Emitting { range }.is_awaiting_access());
    }

    #[test]
    fn test_directory_entry_format() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("  Alice  ", "+1 650-555-0100", PhoneType::Mobile);
        store.add_contact("Bob", "555 0101", PhoneType::FaxHome);
        let mut registry = registry_with(&store, "ME");

        let out = read_entries(&mut registry, IndexRange::new(1, 2), &FORMAT).unwrap();
        assert_eq!(
            lines(&out),
            vec![
                "+CPBR: 1,\"+16505550100\",145,\"Alice/M\"",
                "+CPBR: 2,\"5550101\",129,\"Bob/F\"",
            ]
        );
        assert_eq!(
            out[0],
            AtResponse::info("+CPBR: 1,\"+16505550100\",145,\"Alice/M\"\r\n\r\n")
        );
        assert_eq!(store.open_cursors(), 0);
    }

    #[test]
    fn test_long_name_truncated_before_suffix() {
        let store = Arc::new(MemoryStore::new());
        let long_name = "A".repeat(40);
        store.add_contact(&long_name, "5550100", PhoneType::Work);
        let mut registry = registry_with(&store, "ME");

        let out = read_entries(&mut registry, IndexRange::new(1, 1), &FORMAT).unwrap();
        let expected = format!("+CPBR: 1,\"5550100\",129,\"{}/W\"", "A".repeat(28));
        assert_eq!(lines(&out), vec![expected]);
    }

    #[test]
    fn test_long_number_truncated() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Long", &"9".repeat(40), PhoneType::Home);
        let mut registry = registry_with(&store, "ME");

        let out = read_entries(&mut registry, IndexRange::new(1, 1), &FORMAT).unwrap();
        let expected = format!("+CPBR: 1,\"{}\",129,\"Long/H\"", "9".repeat(30));
        assert_eq!(lines(&out), vec![expected]);
    }

    #[test]
    fn test_non_ascii_digits_are_sent_as_ascii() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Ali", "٠٥٥٥ ١٢٣٤", PhoneType::Mobile);
        store.add_call("05551234", CallType::Missed, Presentation::Allowed, 1);
        store.add_call("５５５０１００", CallType::Missed, Presentation::Allowed, 0);

        let mut registry = registry_with(&store, "ME");
        let out = read_entries(&mut registry, IndexRange::new(1, 1), &FORMAT).unwrap();
        assert_eq!(lines(&out), vec!["+CPBR: 1,\"05551234\",129,\"Ali/M\""]);

        // caller ID matches across scripts
        registry.select("MC").unwrap();
        let out = read_entries(&mut registry, IndexRange::new(1, 2), &FORMAT).unwrap();
        assert_eq!(
            lines(&out),
            vec![
                "+CPBR: 1,\"05551234\",129,\"Ali\"",
                "+CPBR: 2,\"5550100\",129,\"\"",
            ]
        );
    }

    #[test]
    fn test_missing_directory_fields() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact_record(ContactRecord {
            name: None,
            number: None,
            phone_type: PhoneType::Custom,
        });
        let mut registry = registry_with(&store, "ME");

        let out = read_entries(&mut registry, IndexRange::new(1, 1), &FORMAT).unwrap();
        assert_eq!(lines(&out), vec!["+CPBR: 1,\"\",129,\"/O\""]);
    }

    #[test]
    fn test_restricted_presentation_is_masked() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Alice", "5550100", PhoneType::Mobile);
        store.add_call("5550100", CallType::Incoming, Presentation::Restricted, 3);
        store.add_call("+15550199", CallType::Incoming, Presentation::Payphone, 2);
        store.add_call("5550100", CallType::Incoming, Presentation::Unknown, 1);
        let mut registry = registry_with(&store, "RC");

        let out = read_entries(&mut registry, IndexRange::new(1, 3), &FORMAT).unwrap();
        assert_eq!(
            lines(&out),
            vec![
                "+CPBR: 1,\"\",129,\"Unknown\"",
                "+CPBR: 2,\"\",145,\"Unknown\"",
                "+CPBR: 3,\"\",129,\"Unknown\"",
            ]
        );
    }

    #[test]
    fn test_call_log_uses_caller_id() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Alice", "+1 650 555 0100", PhoneType::Mobile);
        store.add_call("+16505550100", CallType::Missed, Presentation::Allowed, 2);
        store.add_call("5550199", CallType::Missed, Presentation::Allowed, 1);
        let mut registry = registry_with(&store, "MC");

        let out = read_entries(&mut registry, IndexRange::new(1, 2), &FORMAT).unwrap();
        // call logs carry no type suffix
        assert_eq!(
            lines(&out),
            vec![
                "+CPBR: 1,\"+16505550100\",145,\"Alice\"",
                "+CPBR: 2,\"5550199\",129,\"\"",
            ]
        );
    }

    #[test]
    fn test_call_without_number_skips_lookup() {
        let store = Arc::new(MemoryStore::new());
        store.add_call_record(CallRecord {
            number: None,
            call_type: CallType::Outgoing,
            presentation: Presentation::Allowed,
            date: 1,
        });
        let mut registry = registry_with(&store, "DC");
        let queries = store.query_count();

        let out = read_entries(&mut registry, IndexRange::new(1, 1), &FORMAT).unwrap();
        assert_eq!(lines(&out), vec!["+CPBR: 1,\"\",129,\"\""]);
        // only the phonebook query itself
        assert_eq!(store.query_count(), queries + 1);
    }

    #[test]
    fn test_gsm_names() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Renée [home]", "5550100", PhoneType::Home);
        let gsm = RowFormat {
            charset: CharacterSet::Gsm,
            unknown_number: "Unknown",
        };

        let mut registry = registry_with(&store, "ME");
        let out = read_entries(&mut registry, IndexRange::new(1, 1), &gsm).unwrap();
        assert_eq!(
            lines(&out),
            vec!["+CPBR: 1,\"5550100\",129,\"Ren\u{5}e \u{1b}<home\u{1b}>/H\""]
        );
    }

    #[test]
    fn test_gsm_keeps_empty_name() {
        let store = Arc::new(MemoryStore::new());
        store.add_call("5550199", CallType::Incoming, Presentation::Allowed, 1);
        let gsm = RowFormat {
            charset: CharacterSet::Gsm,
            unknown_number: "Unknown",
        };

        let mut registry = registry_with(&store, "RC");
        let out = read_entries(&mut registry, IndexRange::new(1, 1), &gsm).unwrap();
        assert_eq!(lines(&out), vec!["+CPBR: 1,\"5550199\",129,\"\""]);
    }

    #[test]
    fn test_gsm_unencodable_name_falls_back() {
        let store = MemoryStore::new();
        store.add_contact("\u{1b}", "5550100", PhoneType::Home);
        let gsm = RowFormat {
            charset: CharacterSet::Gsm,
            unknown_number: "Unknown",
        };

        let mut cursor = store.query(&StoreQuery::Contacts { limit: 1 }).unwrap();
        assert!(cursor.move_to_next());
        // without a type role the name encodes to nothing
        let roles = ColumnRoles {
            name: cursor.column_index(Column::DisplayName),
            number: cursor.column_index(Column::Number),
            ..ColumnRoles::default()
        };
        let row = format_row(cursor.as_ref(), roles, 1, &store, &gsm);
        assert_eq!(row.name, "Unknown");
        assert_eq!(row.number, "5550100");
    }

    #[test]
    fn test_clamped_range() {
        let store = Arc::new(MemoryStore::new());
        for (i, number) in ["5550001", "5550002", "5550003"].iter().enumerate() {
            store.add_call(number, CallType::Outgoing, Presentation::Allowed, i as u64);
        }
        let mut registry = registry_with(&store, "DC");

        let out = read_entries(&mut registry, IndexRange::new(2, 100), &FORMAT).unwrap();
        assert_eq!(
            lines(&out),
            vec!["+CPBR: 2,\"5550002\",129,\"\"", "+CPBR: 3,\"5550001\",129,\"\""]
        );
        assert_eq!(store.open_cursors(), 0);
    }

    #[test]
    fn test_out_of_range_answers_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Alice", "5550100", PhoneType::Mobile);
        let mut registry = registry_with(&store, "ME");

        for range in [
            IndexRange::new(2, 3),
            IndexRange::new(0, 1),
            IndexRange::new(1, 0),
        ] {
            let out = read_entries(&mut registry, range, &FORMAT).unwrap();
            assert!(out.is_empty());
            assert_eq!(store.open_cursors(), 0);
        }
    }

    #[test]
    fn test_unavailable_store_answers_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Alice", "5550100", PhoneType::Mobile);
        store.set_available(false);
        let mut registry = registry_with(&store, "ME");

        let out = read_entries(&mut registry, IndexRange::new(1, 1), &FORMAT).unwrap();
        assert!(out.is_empty());
        assert_eq!(store.open_cursors(), 0);
    }

    #[test]
    fn test_sim_answers_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.add_contact("Alice", "5550100", PhoneType::Mobile);
        let mut registry = registry_with(&store, "SM");
        let queries = store.query_count();

        let out = read_entries(&mut registry, IndexRange::new(1, 1), &FORMAT).unwrap();
        assert!(out.is_empty());
        assert_eq!(store.query_count(), queries);
    }
}
