//! Phonebook Storage Module
//!
//! This module provides everything between the AT commands and the contact
//! data: the store boundary, the phonebook namespaces, and the per-phonebook
//! result cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PhonebookRegistry                         │
//! │        selected: ME | SM | DC | RC | MC                     │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                   ResultCache                        │   │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐         │   │
//! │  │  │   ME   │ │   DC   │ │   RC   │ │   MC   │         │   │
//! │  │  │ cursor │ │ cursor │ │ cursor │ │ cursor │         │   │
//! │  │  │ roles  │ │ roles  │ │ roles  │ │ roles  │         │   │
//! │  │  └────────┘ └────────┘ └────────┘ └────────┘         │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │ query / caller-ID lookup
//!                                ▼
//!                     ┌─────────────────────┐
//!                     │   PhonebookStore    │
//!                     └─────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use hfp_phonebook::storage::{CallType, MemoryStore, PhonebookId, PhonebookRegistry, Presentation};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.add_call("5550100", CallType::Missed, Presentation::Allowed, 1);
//!
//! let mut registry = PhonebookRegistry::new(store.clone(), 16384);
//! let missed = registry.resolve(PhonebookId::Mc, true).unwrap();
//! assert_eq!(missed.count(), 1);
//!
//! registry.invalidate(PhonebookId::Mc);
//! assert_eq!(store.open_cursors(), 0);
//! ```

pub mod cache;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use cache::{CachedResult, ColumnRoles, ResultCache};
pub use registry::{PhonebookId, PhonebookRegistry, UnknownPhonebook};
pub use store::{
    CallRecord, CallType, CallerId, CellValue, Column, ContactRecord, MemoryStore, PhoneType,
    PhonebookStore, Presentation, RowCursor, StoreError, StoreQuery,
};
