//! Phonebook Namespaces
//!
//! The fixed set of phonebooks a Hands-Free unit can select with `AT+CPBS`,
//! their query bindings, and the registry that tracks the current selection.
//!
//! | Tag | Contents            | Query                               |
//! |-----|---------------------|-------------------------------------|
//! | ME  | phone directory     | all directory numbers               |
//! | SM  | SIM directory       | none, always reported empty         |
//! | DC  | dialled calls       | call log, type = outgoing           |
//! | RC  | received calls      | call log, type = incoming           |
//! | MC  | missed calls        | call log, type = missed             |

use crate::storage::cache::{CachedResult, ResultCache};
use crate::storage::store::{CallType, PhonebookStore, StoreError, StoreQuery};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A phonebook tag that is not one of the supported namespaces.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown phonebook '{0}'")]
pub struct UnknownPhonebook(pub String);

/// A phonebook namespace. Tags are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhonebookId {
    /// Mobile equipment directory
    Me,
    /// SIM directory (stub)
    Sm,
    /// Dialled calls
    Dc,
    /// Received calls
    Rc,
    /// Missed calls
    Mc,
}

impl PhonebookId {
    /// Every namespace in `AT+CPBS=?` order.
    pub const ALL: [PhonebookId; 5] = [
        PhonebookId::Me,
        PhonebookId::Sm,
        PhonebookId::Dc,
        PhonebookId::Rc,
        PhonebookId::Mc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PhonebookId::Me => "ME",
            PhonebookId::Sm => "SM",
            PhonebookId::Dc => "DC",
            PhonebookId::Rc => "RC",
            PhonebookId::Mc => "MC",
        }
    }

    /// True for the call-log namespaces.
    pub fn is_call_log(self) -> bool {
        matches!(self, PhonebookId::Dc | PhonebookId::Rc | PhonebookId::Mc)
    }

    /// False only for the SIM stub.
    pub fn is_queryable(self) -> bool {
        self != PhonebookId::Sm
    }

    /// The store query bound to this namespace, capped at `limit` rows.
    pub fn query(self, limit: usize) -> Option<StoreQuery> {
        let call_type = match self {
            PhonebookId::Me => return Some(StoreQuery::Contacts { limit }),
            PhonebookId::Sm => return None,
            PhonebookId::Dc => CallType::Outgoing,
            PhonebookId::Rc => CallType::Incoming,
            PhonebookId::Mc => CallType::Missed,
        };
        Some(StoreQuery::CallLog { call_type, limit })
    }
}

impl fmt::Display for PhonebookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhonebookId {
    type Err = UnknownPhonebook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhonebookId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownPhonebook(s.to_string()))
    }
}

/// Tracks the selected phonebook and owns the result cache.
///
/// # Example
///
/// ```
/// use hfp_phonebook::storage::{MemoryStore, PhonebookId, PhonebookRegistry};
/// use std::sync::Arc;
///
/// let mut registry = PhonebookRegistry::new(Arc::new(MemoryStore::new()), 16384);
/// assert_eq!(registry.selected(), PhonebookId::Me);
///
/// registry.select("MC").unwrap();
/// assert_eq!(registry.selected(), PhonebookId::Mc);
/// assert!(registry.select("mc").is_err());
/// ```
pub struct PhonebookRegistry {
    selected: PhonebookId,
    cache: ResultCache,
}

impl PhonebookRegistry {
    pub fn new(store: Arc<dyn PhonebookStore>, max_size: usize) -> Self {
        Self {
            selected: PhonebookId::Me,
            cache: ResultCache::new(store, max_size),
        }
    }

    /// The phonebook used by `AT+CPBS?` and `AT+CPBR`.
    pub fn selected(&self) -> PhonebookId {
        self.selected
    }

    /// Selects a phonebook by tag. The selection is unchanged on error.
    pub fn select(&mut self, name: &str) -> Result<PhonebookId, UnknownPhonebook> {
        let id: PhonebookId = name.parse()?;
        debug!(phonebook = %id, "Selected phonebook");
        self.selected = id;
        Ok(id)
    }

    /// Returns the cached result of `id`, refreshing it when `force` is set
    /// or nothing is cached. `SM` has no cache entry; callers handle it first.
    pub fn resolve(&mut self, id: PhonebookId, force: bool) -> Result<&mut CachedResult, StoreError> {
        self.cache.get(id, force)
    }

    /// Releases the result set of `id` after a read.
    pub fn invalidate(&mut self, id: PhonebookId) {
        self.cache.invalidate(id);
    }

    /// Drops every cached result.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn store(&self) -> &Arc<dyn PhonebookStore> {
        self.cache.store()
    }

    /// Number of phonebooks currently holding an open result set.
    pub fn open_results(&self) -> usize {
        self.cache.open_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;

    #[test]
    fn test_parse_tags() {
        assert_eq!("ME".parse::<PhonebookId>(), Ok(PhonebookId::Me));
        assert_eq!("SM".parse::<PhonebookId>(), Ok(PhonebookId::Sm));
        assert_eq!("DC".parse::<PhonebookId>(), Ok(PhonebookId::Dc));
        assert_eq!("RC".parse::<PhonebookId>(), Ok(PhonebookId::Rc));
        assert_eq!("MC".parse::<PhonebookId>(), Ok(PhonebookId::Mc));
        assert_eq!(
            "me".parse::<PhonebookId>(),
            Err(UnknownPhonebook("me".to_string()))
        );
        assert!("FD".parse::<PhonebookId>().is_err());
    }

    #[test]
    fn test_query_binding() {
        assert_eq!(PhonebookId::Me.query(10), Some(StoreQuery::Contacts { limit: 10 }));
        assert_eq!(PhonebookId::Sm.query(10), None);
        assert_eq!(
            PhonebookId::Dc.query(10),
            Some(StoreQuery::CallLog { call_type: CallType::Outgoing, limit: 10 })
        );
        assert_eq!(
            PhonebookId::Rc.query(10),
            Some(StoreQuery::CallLog { call_type: CallType::Incoming, limit: 10 })
        );
        assert_eq!(
            PhonebookId::Mc.query(10),
            Some(StoreQuery::CallLog { call_type: CallType::Missed, limit: 10 })
        );
    }

    #[test]
    fn test_select_keeps_previous_on_error() {
        let mut registry = PhonebookRegistry::new(Arc::new(MemoryStore::new()), 16384);
        registry.select("DC").unwrap();
        assert!(registry.select("XX").is_err());
        assert_eq!(registry.selected(), PhonebookId::Dc);

        registry.select("SM").unwrap();
        assert_eq!(registry.selected(), PhonebookId::Sm);
    }

    #[test]
    fn test_resolve_empty_store() {
        let mut registry = PhonebookRegistry::new(Arc::new(MemoryStore::new()), 16384);
        let entry = registry.resolve(PhonebookId::Me, true).unwrap();
        assert_eq!(entry.count(), 0);
        assert_eq!(registry.open_results(), 1);

        registry.invalidate(PhonebookId::Me);
        assert_eq!(registry.open_results(), 0);
    }
}
