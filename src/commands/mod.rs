//! Phonebook Commands Module
//!
//! This module implements the phonebook AT commands of the Hands-Free Profile.
//!
//! ## Components
//!
//! - `handler`: `AtPhonebook`, the command dispatcher and access-reply resume
//! - `range`: CPBR index windows, the single-flight read state and entry formatting
//! - `charset`: character sets selectable with `AT+CSCS`
//! - `error`: command failures and their terminal AT status
//!
//! ## Example
//!
//! ```
//! use hfp_phonebook::access::{AccessGate, AccessPermission, ConsentRequest, PeerAddress, PermissionTable};
//! use hfp_phonebook::commands::AtPhonebook;
//! use hfp_phonebook::config::PhonebookConfig;
//! use hfp_phonebook::protocol::{AtCommand, AtCommandType};
//! use hfp_phonebook::storage::{MemoryStore, PhoneType};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! let peer = PeerAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
//! let store = Arc::new(MemoryStore::new());
//! store.add_contact("Alice", "+1 650 555 0100", PhoneType::Mobile);
//!
//! let (consent_tx, _consent_rx) = mpsc::unbounded_channel::<ConsentRequest>();
//! let permissions = PermissionTable::with(peer, AccessPermission::Allowed);
//! let gate = AccessGate::new(Arc::new(permissions), Arc::new(consent_tx), "pairing");
//! let mut phonebook = AtPhonebook::new(store, gate, PhonebookConfig::default());
//!
//! let read = AtCommand::new("CPBR", AtCommandType::Set, "AT+CPBR=1,1");
//! let responses = phonebook.execute(&peer, &read);
//! assert_eq!(responses[0].to_string(), "+CPBR: 1,\"+16505550100\",145,\"Alice/M\"");
//! assert_eq!(responses[1].to_string(), "OK");
//! ```

pub mod charset;
pub mod error;
pub mod handler;
pub mod range;

// Re-export the main types
pub use charset::CharacterSet;
pub use error::CommandError;
pub use handler::{max_phonebook_size, AtPhonebook};
pub use range::{CpbrState, IndexRange, PhonebookEntry, RowFormat};
