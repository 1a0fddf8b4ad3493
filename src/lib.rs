//! # hfp-phonebook - Phonebook Access for the Hands-Free Profile
//!
//! The Audio Gateway side of the Bluetooth Hands-Free phonebook commands. A
//! car kit or headset selects a character set and a phonebook and reads
//! entries by index; the phone answers with formatted `+CPBR` lines after
//! making sure the user allowed the device to see the phonebook.
//!
//! ## Features
//!
//! - **AT Commands**: `AT+CSCS`, `AT+CPBS` and `AT+CPBR` in all their forms
//! - **Five Phonebooks**: contacts (`ME`), SIM (`SM`, always empty) and the
//!   dialled, received and missed call logs (`DC`, `RC`, `MC`)
//! - **Access Gating**: reads from devices with an unknown permission are
//!   suspended until the user answers a consent request
//! - **GSM Alphabet**: names are packed into GSM 03.38 when `GSM` is selected
//! - **Async Sessions**: each session is a Tokio task processing one event at a time
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            hfp-phonebook                                │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ Transport   │───>│  Session    │───>│ AtPhonebook │                  │
//! │  │ (AtCommand) │    │  (actor)    │    │  (handler)  │                  │
//! │  └─────────────┘    └──────▲──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                 AccessReply│                  ▼                         │
//! │  ┌─────────────┐    ┌──────┴──────┐    ┌──────────────────────────────┐ │
//! │  │ Consent UI  │<───│ AccessGate  │    │      PhonebookRegistry       │ │
//! │  │             │    │             │    │  ┌────┐ ┌────┐ ┌────┐ ┌────┐ │ │
//! │  └─────────────┘    └─────────────┘    │  │ ME │ │ DC │ │ RC │ │ MC │ │ │
//! │                                        │  └────┘ └────┘ └────┘ └────┘ │ │
//! │                                        └──────────────┬───────────────┘ │
//! │                                                       ▼                 │
//! │                                              ┌─────────────────┐        │
//! │                                              │ PhonebookStore  │        │
//! │                                              └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use hfp_phonebook::access::{AccessGate, PermissionTable};
//! use hfp_phonebook::commands::AtPhonebook;
//! use hfp_phonebook::config::PhonebookConfig;
//! use hfp_phonebook::session::{spawn_session, SessionStats};
//! use hfp_phonebook::storage::MemoryStore;
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     let (consent_tx, mut consent_rx) = mpsc::unbounded_channel();
//!     let gate = AccessGate::new(Arc::new(PermissionTable::new()), Arc::new(consent_tx), "settings");
//!     let phonebook = AtPhonebook::new(store, gate, PhonebookConfig::default());
//!
//!     let (responses_tx, mut responses) = mpsc::channel(64);
//!     let (session, _task) = spawn_session(phonebook, responses_tx, Arc::new(SessionStats::new()));
//!
//!     // feed tokenized commands with session.command(peer, command),
//!     // answer consent requests with session.access_reply(peer, reply),
//!     // and write responses.recv() to the RFCOMM channel.
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: AT command and response values, dial strings, GSM alphabet
//! - [`storage`]: the store boundary, phonebook namespaces and result cache
//! - [`access`]: device addresses and the phonebook permission protocol
//! - [`commands`]: the phonebook command handler
//! - [`session`]: per-session actor serializing commands and access replies
//! - [`config`]: handler configuration
//!
//! ## Design Highlights
//!
//! ### Result Caching
//!
//! Each phonebook has one cache slot holding its last result set and the
//! column roles resolved for it. `AT+CPBS?`, `AT+CPBR=?` and reads all
//! requery the selected phonebook and release the result set before
//! answering, so sizes and entries never come from a stale snapshot and no
//! cursor stays open between commands.
//!
//! ### Single-Flight Reads
//!
//! At most one `AT+CPBR` is in flight. A second read while the first waits
//! for the user's decision is refused with `+CME ERROR: 3`.

pub mod access;
pub mod commands;
pub mod config;
pub mod protocol;
pub mod session;
pub mod storage;

// Re-export commonly used types for convenience
pub use access::{AccessGate, AccessPermission, AccessReply, ConsentRequest, PeerAddress};
pub use commands::{AtPhonebook, CharacterSet, CommandError};
pub use config::PhonebookConfig;
pub use protocol::{AtCommand, AtCommandType, AtResponse, CmeError, ResultCode};
pub use session::{spawn_session, SessionHandle, SessionStats};
pub use storage::{MemoryStore, PhonebookId, PhonebookStore};

/// Version of hfp-phonebook
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
