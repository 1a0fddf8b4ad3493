//! Session Module
//!
//! Runs an [`AtPhonebook`](crate::commands::AtPhonebook) on its own task so
//! commands and access replies from the transport and the consent UI are
//! processed strictly one after another.
//!
//! ## Example
//!
//! ```
//! use hfp_phonebook::access::{AccessGate, AccessPermission, ConsentRequest, PeerAddress, PermissionTable};
//! use hfp_phonebook::commands::AtPhonebook;
//! use hfp_phonebook::config::PhonebookConfig;
//! use hfp_phonebook::protocol::{AtCommand, AtCommandType};
//! use hfp_phonebook::session::{spawn_session, SessionStats};
//! use hfp_phonebook::storage::MemoryStore;
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! # tokio_test::block_on(async {
//! let peer = PeerAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
//! let (consent_tx, _consent_rx) = mpsc::unbounded_channel::<ConsentRequest>();
//! let permissions = PermissionTable::with(peer, AccessPermission::Allowed);
//! let gate = AccessGate::new(Arc::new(permissions), Arc::new(consent_tx), "pairing");
//! let phonebook = AtPhonebook::new(Arc::new(MemoryStore::new()), gate, PhonebookConfig::default());
//!
//! let (tx, mut rx) = mpsc::channel(8);
//! let (handle, task) = spawn_session(phonebook, tx, Arc::new(SessionStats::new()));
//!
//! handle.command(peer, AtCommand::new("CSCS", AtCommandType::Test, "AT+CSCS=?")).await.unwrap();
//! assert_eq!(rx.recv().await.unwrap().response.to_string(), "+CSCS: (\"UTF-8\",\"IRA\",\"GSM\")");
//! assert_eq!(rx.recv().await.unwrap().response.to_string(), "OK");
//!
//! drop(handle);
//! task.await.unwrap().unwrap();
//! # });
//! ```

pub mod actor;

pub use actor::{
    spawn_session, Session, SessionError, SessionEvent, SessionHandle, SessionResponse,
    SessionStats, EVENT_QUEUE_DEPTH,
};
