//! Phonebook Access Permission Gate
//!
//! Before any phonebook entry leaves the phone, the remote device must hold
//! phonebook access permission. The decision itself belongs to a
//! [`PermissionOracle`]. When the oracle has no answer yet, the gate asks the
//! pairing authority for user consent through a [`ConsentSink`] and returns
//! immediately; the answer comes back later as an [`AccessReply`].
//!
//! ```text
//!  check_access(peer)
//!        │
//!        ▼
//!  ┌───────────┐  Allowed / Rejected
//!  │  Oracle   │─────────────────────────────▶ caller continues
//!  └─────┬─────┘
//!        │ Unknown
//!        ▼
//!  ┌───────────┐  ConsentRequest         ┌────────────────┐
//!  │ ConsentSink│───────────────────────▶ │ pairing UI     │
//!  └───────────┘                          └───────┬────────┘
//!                                                 │ AccessReply (later)
//!                                                 ▼
//!                                          apply_reply(peer, reply)
//! ```

use crate::access::peer::PeerAddress;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Phonebook access permission of a remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessPermission {
    /// Nobody has decided yet
    #[default]
    Unknown,
    Allowed,
    Rejected,
}

/// Source of truth for per-device phonebook permission.
pub trait PermissionOracle: Send + Sync {
    fn phonebook_access(&self, peer: &PeerAddress) -> AccessPermission;

    /// Persists a decision made by the user.
    fn set_phonebook_access(&self, peer: &PeerAddress, permission: AccessPermission);
}

/// What a consent request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRequestKind {
    Phonebook,
}

/// A one-shot request for the user to decide on a device's access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    pub peer: PeerAddress,
    /// Component that must handle the request
    pub authority: String,
    pub kind: AccessRequestKind,
}

/// Delivers consent requests to the pairing authority.
pub trait ConsentSink: Send + Sync {
    fn request_consent(&self, request: ConsentRequest);
}

impl ConsentSink for UnboundedSender<ConsentRequest> {
    fn request_consent(&self, request: ConsentRequest) {
        if let Err(e) = self.send(request) {
            warn!(peer = %e.0.peer, "Consent request dropped, no pairing authority listening");
        }
    }
}

/// The user's answer to a consent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessReply {
    pub granted: bool,
    /// Remember the decision for future requests
    pub always: bool,
}

impl AccessReply {
    pub fn allow() -> Self {
        Self { granted: true, always: false }
    }

    pub fn reject() -> Self {
        Self { granted: false, always: false }
    }

    /// Same decision, persisted.
    pub fn remembered(self) -> Self {
        Self { always: true, ..self }
    }
}

/// In-memory permission table. Devices not in the table are `Unknown`.
#[derive(Debug, Default)]
pub struct PermissionTable {
    permissions: RwLock<HashMap<PeerAddress, AccessPermission>>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with one device already decided.
    pub fn with(peer: PeerAddress, permission: AccessPermission) -> Self {
        let table = Self::new();
        table.set_phonebook_access(&peer, permission);
        table
    }
}

impl PermissionOracle for PermissionTable {
    fn phonebook_access(&self, peer: &PeerAddress) -> AccessPermission {
        self.permissions
            .read()
            .unwrap()
            .get(peer)
            .copied()
            .unwrap_or_default()
    }

    fn set_phonebook_access(&self, peer: &PeerAddress, permission: AccessPermission) {
        self.permissions.write().unwrap().insert(*peer, permission);
    }
}

/// Checks phonebook permission and asks for consent when undecided.
pub struct AccessGate {
    oracle: Arc<dyn PermissionOracle>,
    consent: Arc<dyn ConsentSink>,
    authority: String,
}

impl AccessGate {
    pub fn new(
        oracle: Arc<dyn PermissionOracle>,
        consent: Arc<dyn ConsentSink>,
        authority: impl Into<String>,
    ) -> Self {
        Self {
            oracle,
            consent,
            authority: authority.into(),
        }
    }

    /// Returns the peer's permission. On `Unknown` a consent request has been
    /// sent and the answer will arrive through [`AccessGate::apply_reply`].
    pub fn check_access(&self, peer: &PeerAddress) -> AccessPermission {
        let permission = self.oracle.phonebook_access(peer);
        debug!(peer = %peer, ?permission, "Checked phonebook access");

        if permission == AccessPermission::Unknown {
            info!(peer = %peer, authority = %self.authority, "Requesting phonebook access consent");
            self.consent.request_consent(ConsentRequest {
                peer: *peer,
                authority: self.authority.clone(),
                kind: AccessRequestKind::Phonebook,
            });
        }
        permission
    }

    /// Records a consent reply. Returns whether access was granted.
    pub fn apply_reply(&self, peer: &PeerAddress, reply: AccessReply) -> bool {
        if reply.always {
            let permission = if reply.granted {
                AccessPermission::Allowed
            } else {
                AccessPermission::Rejected
            };
            info!(peer = %peer, ?permission, "Remembering phonebook access decision");
            self.oracle.set_phonebook_access(peer, permission);
        }
        reply.granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const PEER: PeerAddress = PeerAddress([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    fn gate_with(
        table: PermissionTable,
    ) -> (AccessGate, Arc<PermissionTable>, mpsc::UnboundedReceiver<ConsentRequest>) {
        let (tx, rx) = mpsc::unbounded_channel::<ConsentRequest>();
        let table = Arc::new(table);
        let gate = AccessGate::new(table.clone(), Arc::new(tx), "com.example.pairing");
        (gate, table, rx)
    }

    #[test]
    fn test_allowed_sends_no_request() {
        let (gate, _, mut rx) = gate_with(PermissionTable::with(PEER, AccessPermission::Allowed));
        assert_eq!(gate.check_access(&PEER), AccessPermission::Allowed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rejected_sends_no_request() {
        let (gate, _, mut rx) = gate_with(PermissionTable::with(PEER, AccessPermission::Rejected));
        assert_eq!(gate.check_access(&PEER), AccessPermission::Rejected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unknown_requests_consent() {
        let (gate, _, mut rx) = gate_with(PermissionTable::new());
        assert_eq!(gate.check_access(&PEER), AccessPermission::Unknown);

        let request = rx.try_recv().unwrap();
        assert_eq!(
            request,
            ConsentRequest {
                peer: PEER,
                authority: "com.example.pairing".to_string(),
                kind: AccessRequestKind::Phonebook,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reply_persisted_only_when_remembered() {
        let (gate, table, _rx) = gate_with(PermissionTable::new());

        assert!(gate.apply_reply(&PEER, AccessReply::allow()));
        assert_eq!(table.phonebook_access(&PEER), AccessPermission::Unknown);

        assert!(!gate.apply_reply(&PEER, AccessReply::reject().remembered()));
        assert_eq!(table.phonebook_access(&PEER), AccessPermission::Rejected);

        assert!(gate.apply_reply(&PEER, AccessReply::allow().remembered()));
        assert_eq!(table.phonebook_access(&PEER), AccessPermission::Allowed);
    }

    #[test]
    fn test_closed_consent_channel_is_tolerated() {
        let (gate, _, rx) = gate_with(PermissionTable::new());
        drop(rx);
        assert_eq!(gate.check_access(&PEER), AccessPermission::Unknown);
    }
}
