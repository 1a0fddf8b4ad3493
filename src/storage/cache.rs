//! Per-Phonebook Result Cache
//!
//! Each queryable phonebook keeps the cursor of its most recent query together
//! with the column roles resolved for it. Roles are resolved once per refresh
//! from the phonebook's schema, so formatting code never looks columns up by
//! name and never touches a role that is absent for the phonebook.
//!
//! ## Schemas
//!
//! ```text
//!            number   presentation   type   name
//! ME         yes      -              yes    yes
//! DC/RC/MC   yes      yes            -      -
//! ```
//!
//! ## Lifecycle
//!
//! Entries start empty, are filled on demand (forced or on a miss), and are
//! invalidated after every read: the cursor is closed and the row count frozen.

use crate::storage::registry::PhonebookId;
use crate::storage::store::{Column, PhonebookStore, RowCursor, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a schema role must be present in the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Required,
    Optional,
    Absent,
}

/// Schema of one phonebook: how each role is filled.
#[derive(Debug, Clone, Copy)]
struct Schema {
    number: Requirement,
    number_presentation: Requirement,
    phone_type: Requirement,
    name: Requirement,
}

const DIRECTORY_SCHEMA: Schema = Schema {
    number: Requirement::Optional,
    number_presentation: Requirement::Absent,
    phone_type: Requirement::Optional,
    name: Requirement::Optional,
};

const CALL_LOG_SCHEMA: Schema = Schema {
    number: Requirement::Required,
    number_presentation: Requirement::Required,
    phone_type: Requirement::Absent,
    name: Requirement::Absent,
};

fn schema_for(id: PhonebookId) -> Schema {
    if id.is_call_log() {
        CALL_LOG_SCHEMA
    } else {
        DIRECTORY_SCHEMA
    }
}

/// Column indices for each role of a cached result. `None` marks an absent role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub number: Option<usize>,
    pub number_presentation: Option<usize>,
    pub phone_type: Option<usize>,
    pub name: Option<usize>,
}

impl ColumnRoles {
    /// Resolves the roles of `id` against a fresh cursor.
    pub fn resolve(id: PhonebookId, cursor: &dyn RowCursor) -> Result<Self, StoreError> {
        let schema = schema_for(id);
        let role = |requirement: Requirement, column: Column| -> Result<Option<usize>, StoreError> {
            match requirement {
                Requirement::Absent => Ok(None),
                Requirement::Optional => Ok(cursor.column_index(column)),
                Requirement::Required => cursor
                    .column_index(column)
                    .map(Some)
                    .ok_or(StoreError::MissingColumn(column)),
            }
        };

        Ok(Self {
            number: role(schema.number, Column::Number)?,
            number_presentation: role(schema.number_presentation, Column::NumberPresentation)?,
            phone_type: role(schema.phone_type, Column::PhoneType)?,
            name: role(schema.name, Column::DisplayName)?,
        })
    }
}

/// The cached query result of one phonebook.
#[derive(Default)]
pub struct CachedResult {
    cursor: Option<Box<dyn RowCursor>>,
    count: usize,
    roles: ColumnRoles,
}

impl CachedResult {
    /// Row count of the last refresh. Frozen once the cursor is closed.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn roles(&self) -> ColumnRoles {
        self.roles
    }

    /// Returns true while the result set is open.
    pub fn is_open(&self) -> bool {
        self.cursor.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// The open cursor, if any.
    pub fn cursor_mut(&mut self) -> Option<&mut (dyn RowCursor + 'static)> {
        self.cursor.as_deref_mut()
    }

    /// Closes and drops the cursor, keeping the row count.
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }
}

impl std::fmt::Debug for CachedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedResult")
            .field("open", &self.is_open())
            .field("count", &self.count)
            .field("roles", &self.roles)
            .finish()
    }
}

/// Cached results for every queryable phonebook.
pub struct ResultCache {
    store: Arc<dyn PhonebookStore>,
    entries: HashMap<PhonebookId, CachedResult>,
    max_size: usize,
}

impl ResultCache {
    /// Creates a cache with one empty entry per queryable phonebook.
    pub fn new(store: Arc<dyn PhonebookStore>, max_size: usize) -> Self {
        let entries = PhonebookId::ALL
            .iter()
            .filter(|id| id.is_queryable())
            .map(|&id| (id, CachedResult::default()))
            .collect();
        Self {
            store,
            entries,
            max_size,
        }
    }

    /// The store backing this cache.
    pub fn store(&self) -> &Arc<dyn PhonebookStore> {
        &self.store
    }

    /// Re-queries `id`, closing any previous result set first.
    pub fn refresh(&mut self, id: PhonebookId) -> Result<&mut CachedResult, StoreError> {
        let query = id.query(self.max_size).ok_or(StoreError::Unavailable)?;
        let entry = self.entries.entry(id).or_default();
        entry.close();

        let cursor = self.store.query(&query)?;
        let roles = match ColumnRoles::resolve(id, cursor.as_ref()) {
            Ok(roles) => roles,
            Err(e) => {
                warn!(phonebook = %id, error = %e, "Result set does not match phonebook schema");
                // dropping the cursor closes it
                return Err(e);
            }
        };

        entry.count = cursor.count();
        entry.roles = roles;
        entry.cursor = Some(cursor);
        info!(phonebook = %id, results = entry.count, "Refreshed phonebook");
        Ok(entry)
    }

    /// Returns the entry for `id`, refreshing it when forced or when no
    /// result set is open.
    pub fn get(&mut self, id: PhonebookId, force: bool) -> Result<&mut CachedResult, StoreError> {
        let stale = !self.entries.get(&id).is_some_and(CachedResult::is_open);
        if force || stale {
            return self.refresh(id);
        }
        debug!(phonebook = %id, "Using cached phonebook result");
        self.entries.get_mut(&id).ok_or(StoreError::Unavailable)
    }

    /// Closes the result set of `id`.
    pub fn invalidate(&mut self, id: PhonebookId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.close();
        }
    }

    /// Closes every result set and forgets all entries.
    pub fn clear(&mut self) {
        for entry in self.entries.values_mut() {
            entry.close();
        }
        self.entries.clear();
    }

    /// Number of entries with an open result set.
    pub fn open_entries(&self) -> usize {
        self.entries.values().filter(|e| e.is_open()).count()
    }
}

impl Drop for ResultCache {
    fn drop(&mut self) {
        self.clear();
    }
}
