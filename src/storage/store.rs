//! Contact and Call-Log Store Boundary
//!
//! The phonebook handler never owns contact data. It issues projection-based
//! queries against a [`PhonebookStore`] and walks the returned [`RowCursor`].
//! This module defines that boundary plus [`MemoryStore`], an in-memory
//! implementation used by the demo driver, the tests and the benchmarks.
//!
//! ## Projections
//!
//! ```text
//! Contacts  : [Id, DisplayName, Number, PhoneType]
//! Call log  : [Id, Number, NumberPresentation]      (newest first)
//! ```
//!
//! Cursors hold an underlying store resource and must be closed. `MemoryStore`
//! counts open cursors so leaks are observable.

use crate::protocol::number::strip_separators;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors reported by a phonebook store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not produce a result set right now
    #[error("phonebook store unavailable")]
    Unavailable,

    /// The query named a column the store does not provide
    #[error("column {0:?} missing from result set")]
    MissingColumn(Column),
}

/// Columns that can appear in a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Number,
    NumberPresentation,
    DisplayName,
    PhoneType,
}

/// Call-log entry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    Incoming = 1,
    Outgoing = 2,
    Missed = 3,
}

/// Caller-ID presentation of a call-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presentation {
    Allowed = 1,
    Restricted = 2,
    Unknown = 3,
    Payphone = 4,
}

impl Presentation {
    /// Maps a stored presentation value; anything unrecognized is `Unknown`.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Presentation::Allowed,
            2 => Presentation::Restricted,
            4 => Presentation::Payphone,
            _ => Presentation::Unknown,
        }
    }
}

/// Phone number types of directory entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhoneType {
    Custom = 0,
    Home = 1,
    Mobile = 2,
    Work = 3,
    FaxWork = 4,
    FaxHome = 5,
    Pager = 6,
    Other = 7,
}

impl PhoneType {
    /// Maps a stored type value; unrecognized values are `Other`.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => PhoneType::Custom,
            1 => PhoneType::Home,
            2 => PhoneType::Mobile,
            3 => PhoneType::Work,
            4 => PhoneType::FaxWork,
            5 => PhoneType::FaxHome,
            6 => PhoneType::Pager,
            _ => PhoneType::Other,
        }
    }

    /// The suffix letter appended to directory names in `+CPBR` lines.
    pub fn letter(self) -> char {
        match self {
            PhoneType::Home => 'H',
            PhoneType::Mobile => 'M',
            PhoneType::Work => 'W',
            PhoneType::FaxHome | PhoneType::FaxWork => 'F',
            _ => 'O',
        }
    }
}

/// A query issued against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreQuery {
    /// All directory phone numbers
    Contacts { limit: usize },
    /// Call-log entries of one type, in the store's default (newest first) order
    CallLog { call_type: CallType, limit: usize },
}

impl StoreQuery {
    /// The columns returned for this query, in order.
    pub fn projection(&self) -> &'static [Column] {
        match self {
            StoreQuery::Contacts { .. } => &[
                Column::Id,
                Column::DisplayName,
                Column::Number,
                Column::PhoneType,
            ],
            StoreQuery::CallLog { .. } => &[Column::Id, Column::Number, Column::NumberPresentation],
        }
    }
}

/// Result of a reverse caller-ID lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId {
    pub name: String,
    pub phone_type: PhoneType,
}

/// A forward-only view over a query result.
///
/// Positions are zero-based. A fresh cursor sits before the first row.
pub trait RowCursor: Send {
    /// Number of rows in the result set.
    fn count(&self) -> usize;

    /// Index of `column` in the projection, if present.
    fn column_index(&self, column: Column) -> Option<usize>;

    /// Moves to an absolute row. Returns false if out of range.
    fn move_to_position(&mut self, position: usize) -> bool;

    /// Advances one row. Returns false when the rows are exhausted.
    fn move_to_next(&mut self) -> bool;

    /// Text value of a column in the current row.
    fn get_string(&self, column: usize) -> Option<String>;

    /// Integer value of a column in the current row.
    fn get_int(&self, column: usize) -> Option<i64>;

    /// Releases the underlying resource. Idempotent.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// The contact and call-log data source.
pub trait PhonebookStore: Send + Sync {
    /// Runs a query and returns a cursor over the result.
    fn query(&self, query: &StoreQuery) -> Result<Box<dyn RowCursor>, StoreError>;

    /// Looks up the directory entry owning `number`.
    fn lookup_caller_id(&self, number: &str) -> Result<Option<CallerId>, StoreError>;
}

/// A stored cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Text(String),
}

/// A directory entry held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub name: Option<String>,
    pub number: Option<String>,
    pub phone_type: PhoneType,
}

/// A call-log entry held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub number: Option<String>,
    pub call_type: CallType,
    pub presentation: Presentation,
    /// Call time in milliseconds; higher is newer
    pub date: u64,
}

/// In-memory phonebook store.
///
/// # Example
///
/// ```
/// use hfp_phonebook::storage::{MemoryStore, PhonebookStore, PhoneType, RowCursor, StoreQuery};
///
/// let store = MemoryStore::new();
/// store.add_contact("Alice", "+1 650 555 0100", PhoneType::Mobile);
///
/// let mut cursor = store.query(&StoreQuery::Contacts { limit: 10 }).unwrap();
/// assert_eq!(cursor.count(), 1);
/// cursor.close();
/// assert_eq!(store.open_cursors(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    contacts: RwLock<Vec<ContactRecord>>,
    calls: RwLock<Vec<CallRecord>>,
    unavailable: AtomicBool,
    open_cursors: Arc<AtomicUsize>,
    queries: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory entry.
    pub fn add_contact(&self, name: &str, number: &str, phone_type: PhoneType) {
        self.add_contact_record(ContactRecord {
            name: Some(name.to_string()),
            number: Some(number.to_string()),
            phone_type,
        });
    }

    pub fn add_contact_record(&self, record: ContactRecord) {
        self.contacts.write().unwrap().push(record);
    }

    /// Adds a call-log entry.
    pub fn add_call(&self, number: &str, call_type: CallType, presentation: Presentation, date: u64) {
        self.add_call_record(CallRecord {
            number: Some(number.to_string()),
            call_type,
            presentation,
            date,
        });
    }

    pub fn add_call_record(&self, record: CallRecord) {
        self.calls.write().unwrap().push(record);
    }

    /// Removes every contact and call-log entry.
    pub fn clear(&self) {
        self.contacts.write().unwrap().clear();
        self.calls.write().unwrap().clear();
    }

    /// Simulates the store going away (queries fail) or coming back.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of cursors handed out and not yet closed.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of queries served, including caller-ID lookups.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    fn contact_rows(&self, limit: usize) -> Vec<Vec<CellValue>> {
        let contacts = self.contacts.read().unwrap();
        contacts
            .iter()
            .take(limit)
            .enumerate()
            .map(|(id, c)| {
                vec![
                    CellValue::Integer(id as i64 + 1),
                    text_cell(&c.name),
                    text_cell(&c.number),
                    CellValue::Integer(c.phone_type as i64),
                ]
            })
            .collect()
    }

    fn call_rows(&self, call_type: CallType, limit: usize) -> Vec<Vec<CellValue>> {
        let calls = self.calls.read().unwrap();
        let mut matching: Vec<(usize, &CallRecord)> = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.call_type == call_type)
            .collect();
        // newest first
        matching.sort_by(|a, b| b.1.date.cmp(&a.1.date));
        matching
            .into_iter()
            .take(limit)
            .map(|(id, c)| {
                vec![
                    CellValue::Integer(id as i64 + 1),
                    text_cell(&c.number),
                    CellValue::Integer(c.presentation as i64),
                ]
            })
            .collect()
    }
}

fn text_cell(value: &Option<String>) -> CellValue {
    match value {
        Some(s) => CellValue::Text(s.clone()),
        None => CellValue::Null,
    }
}

impl PhonebookStore for MemoryStore {
    fn query(&self, query: &StoreQuery) -> Result<Box<dyn RowCursor>, StoreError> {
        self.check_available()?;

        let rows = match *query {
            StoreQuery::Contacts { limit } => self.contact_rows(limit),
            StoreQuery::CallLog { call_type, limit } => self.call_rows(call_type, limit),
        };

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            columns: query.projection(),
            rows,
            position: None,
            closed: false,
            open_cursors: Arc::clone(&self.open_cursors),
        }))
    }

    fn lookup_caller_id(&self, number: &str) -> Result<Option<CallerId>, StoreError> {
        self.check_available()?;

        let wanted = strip_separators(number);
        if wanted.is_empty() {
            return Ok(None);
        }
        let contacts = self.contacts.read().unwrap();
        Ok(contacts
            .iter()
            .find(|c| c.number.as_deref().map(strip_separators).as_deref() == Some(wanted.as_str()))
            .map(|c| CallerId {
                name: c.name.clone().unwrap_or_default(),
                phone_type: c.phone_type,
            }))
    }
}

/// Cursor over a materialized [`MemoryStore`] result.
struct MemoryCursor {
    columns: &'static [Column],
    rows: Vec<Vec<CellValue>>,
    position: Option<usize>,
    closed: bool,
    open_cursors: Arc<AtomicUsize>,
}

impl MemoryCursor {
    fn cell(&self, column: usize) -> Option<&CellValue> {
        if self.closed {
            return None;
        }
        self.position
            .and_then(|pos| self.rows.get(pos))
            .and_then(|row| row.get(column))
    }
}

impl RowCursor for MemoryCursor {
    fn count(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, column: Column) -> Option<usize> {
        self.columns.iter().position(|&c| c == column)
    }

    fn move_to_position(&mut self, position: usize) -> bool {
        if self.closed || position >= self.rows.len() {
            return false;
        }
        self.position = Some(position);
        true
    }

    fn move_to_next(&mut self) -> bool {
        let next = self.position.map_or(0, |pos| pos + 1);
        self.move_to_position(next)
    }

    fn get_string(&self, column: usize) -> Option<String> {
        match self.cell(column)? {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Integer(n) => Some(n.to_string()),
            CellValue::Null => None,
        }
    }

    fn get_int(&self, column: usize) -> Option<i64> {
        match self.cell(column)? {
            CellValue::Integer(n) => Some(*n),
            CellValue::Text(s) => s.parse().ok(),
            CellValue::Null => None,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_contact("Alice", "+1 650-555-0100", PhoneType::Mobile);
        store.add_contact("Bob", "555 0101", PhoneType::Home);
        store.add_call("5550101", CallType::Outgoing, Presentation::Allowed, 10);
        store.add_call("5550199", CallType::Outgoing, Presentation::Allowed, 30);
        store.add_call("5550142", CallType::Missed, Presentation::Restricted, 20);
        store
    }

    #[test]
    fn test_contacts_projection() {
        let store = seeded_store();
        let mut cursor = store.query(&StoreQuery::Contacts { limit: 100 }).unwrap();

        assert_eq!(cursor.count(), 2);
        assert_eq!(cursor.column_index(Column::DisplayName), Some(1));
        assert_eq!(cursor.column_index(Column::NumberPresentation), None);

        assert!(cursor.move_to_next());
        assert_eq!(cursor.get_string(1), Some("Alice".to_string()));
        assert_eq!(cursor.get_int(3), Some(PhoneType::Mobile as i64));
        assert!(cursor.move_to_next());
        assert!(!cursor.move_to_next());
    }

    #[test]
    fn test_call_log_newest_first() {
        let store = seeded_store();
        let query = StoreQuery::CallLog { call_type: CallType::Outgoing, limit: 100 };
        let mut cursor = store.query(&query).unwrap();

        assert_eq!(cursor.count(), 2);
        let number = cursor.column_index(Column::Number).unwrap();
        assert!(cursor.move_to_position(0));
        assert_eq!(cursor.get_string(number), Some("5550199".to_string()));
        assert!(cursor.move_to_position(1));
        assert_eq!(cursor.get_string(number), Some("5550101".to_string()));
        assert!(!cursor.move_to_position(2));
    }

    #[test]
    fn test_query_limit() {
        let store = seeded_store();
        let query = StoreQuery::CallLog { call_type: CallType::Outgoing, limit: 1 };
        let cursor = store.query(&query).unwrap();
        assert_eq!(cursor.count(), 1);
    }

    #[test]
    fn test_cursor_accounting() {
        let store = seeded_store();
        let mut first = store.query(&StoreQuery::Contacts { limit: 10 }).unwrap();
        let second = store.query(&StoreQuery::Contacts { limit: 10 }).unwrap();
        assert_eq!(store.open_cursors(), 2);

        first.close();
        first.close();
        assert_eq!(store.open_cursors(), 1);
        assert!(first.is_closed());
        assert_eq!(first.get_string(0), None);

        drop(second);
        assert_eq!(store.open_cursors(), 0);
    }

    #[test]
    fn test_unavailable() {
        let store = seeded_store();
        store.set_available(false);
        assert_eq!(
            store.query(&StoreQuery::Contacts { limit: 10 }).err(),
            Some(StoreError::Unavailable)
        );
        assert_eq!(store.lookup_caller_id("5550101"), Err(StoreError::Unavailable));

        store.set_available(true);
        assert!(store.query(&StoreQuery::Contacts { limit: 10 }).is_ok());
    }

    #[test]
    fn test_caller_id_lookup_ignores_formatting() {
        let store = seeded_store();
        let found = store.lookup_caller_id("+1 (650) 555-0100").unwrap();
        assert_eq!(
            found,
            Some(CallerId { name: "Alice".to_string(), phone_type: PhoneType::Mobile })
        );
        assert_eq!(store.lookup_caller_id("123").unwrap(), None);
    }

    #[test]
    fn test_caller_id_lookup_across_digit_scripts() {
        let store = MemoryStore::new();
        store.add_contact("Ali", "٠٥٥٥ ١٢٣٤", PhoneType::Mobile);

        let found = store.lookup_caller_id("0555-1234").unwrap();
        assert_eq!(found.map(|c| c.name), Some("Ali".to_string()));
        assert_eq!(store.lookup_caller_id("٠٥٥٥١٢٣٤").unwrap().map(|c| c.name), Some("Ali".to_string()));
        // a number of only non-digits has no key
        assert_eq!(store.lookup_caller_id("ext.").unwrap(), None);
    }

    #[test]
    fn test_phone_type_letters() {
        assert_eq!(PhoneType::Home.letter(), 'H');
        assert_eq!(PhoneType::Mobile.letter(), 'M');
        assert_eq!(PhoneType::Work.letter(), 'W');
        assert_eq!(PhoneType::FaxHome.letter(), 'F');
        assert_eq!(PhoneType::FaxWork.letter(), 'F');
        assert_eq!(PhoneType::Custom.letter(), 'O');
        assert_eq!(PhoneType::Pager.letter(), 'O');
        assert_eq!(PhoneType::from_raw(99).letter(), 'O');
    }
}
