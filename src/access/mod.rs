//! Phonebook Access Module
//!
//! Remote device identity and the permission protocol guarding phonebook
//! reads.
//!
//! ## Example
//!
//! ```
//! use hfp_phonebook::access::{AccessGate, AccessPermission, ConsentRequest, PeerAddress, PermissionTable};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! let (consent_tx, mut consent_rx) = mpsc::unbounded_channel::<ConsentRequest>();
//! let gate = AccessGate::new(Arc::new(PermissionTable::new()), Arc::new(consent_tx), "pairing");
//!
//! let peer: PeerAddress = "00:11:22:33:44:55".parse().unwrap();
//! assert_eq!(gate.check_access(&peer), AccessPermission::Unknown);
//! assert_eq!(consent_rx.try_recv().unwrap().peer, peer);
//! ```

pub mod gate;
pub mod peer;

pub use gate::{
    AccessGate, AccessPermission, AccessReply, AccessRequestKind, ConsentRequest, ConsentSink,
    PermissionOracle, PermissionTable,
};
pub use peer::{InvalidAddress, PeerAddress};
