//! Phonebook Command Handler
//!
//! This module implements the AT phonebook commands of the Hands-Free
//! Profile. Commands arrive already tokenized as `(command, type, raw)`; each
//! one is answered with zero or more information lines followed by exactly one
//! final result code.
//!
//! ## Supported Commands
//!
//! ### Character Set
//! - `AT+CSCS=?` - List supported character sets
//! - `AT+CSCS?` - Report the current character set
//! - `AT+CSCS="<set>"` - Select `UTF-8`, `IRA` or `GSM`
//!
//! ### Phonebook Storage
//! - `AT+CPBS=?` - List phonebooks
//! - `AT+CPBS?` - Report the selected phonebook, its size and a capacity hint
//! - `AT+CPBS="<pb>"` - Select `ME`, `SM`, `DC`, `RC` or `MC`
//!
//! ### Phonebook Read
//! - `AT+CPBR=?` - Report the valid index range
//! - `AT+CPBR=<index1>[,<index2>]` - Read entries (permission gated)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AtPhonebook                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  execute()  │───>│ AccessGate  │───>│ read_entries│      │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘      │
//! │         │                  │ Unknown          ▲             │
//! │         │                  ▼                  │             │
//! │         │      handle_access_reply() ─────────┘             │
//! │         ▼                                                   │
//! │  PhonebookRegistry / ResultCache                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::access::{AccessGate, AccessPermission, AccessReply, PeerAddress};
use crate::commands::charset::CharacterSet;
use crate::commands::error::CommandError;
use crate::commands::range::{read_entries, CpbrState, IndexRange, RowFormat};
use crate::config::PhonebookConfig;
use crate::protocol::{AtCommand, AtCommandType, AtResponse, CmeError};
use crate::storage::{
    CallType, Column, PhonebookId, PhonebookRegistry, PhonebookStore, StoreQuery,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a command was answered.
enum Outcome {
    /// Information lines to send before `OK`
    Complete(Vec<AtResponse>),
    /// The read waits for an access reply; nothing is sent yet
    Deferred,
}

/// Capacity hint reported by `AT+CPBS?`.
///
/// Some car kits ignore the current size and always request the maximum, so
/// the hint is 1.5 times the current size (at least 100) rounded up to the
/// next power of two.
///
/// # Example
/// ```
/// use hfp_phonebook::commands::max_phonebook_size;
/// assert_eq!(max_phonebook_size(0), 256);
/// assert_eq!(max_phonebook_size(1000), 2048);
/// ```
pub fn max_phonebook_size(current: usize) -> usize {
    let size = current.max(100);
    round_up_to_power_of_two(size.saturating_add(size / 2))
}

/// Smallest power of two strictly greater than `x`, saturating at the
/// largest power of two a `usize` holds.
fn round_up_to_power_of_two(x: usize) -> usize {
    x.checked_add(1)
        .and_then(usize::checked_next_power_of_two)
        .unwrap_or(1 << (usize::BITS - 1))
}

/// Handles the phonebook AT commands of one Hands-Free session.
pub struct AtPhonebook {
    registry: PhonebookRegistry,
    gate: AccessGate,
    config: PhonebookConfig,
    character_set: CharacterSet,
    cpbr: CpbrState,
}

impl AtPhonebook {
    /// Creates a handler with `ME` selected and the UTF-8 character set.
    pub fn new(
        store: Arc<dyn PhonebookStore>,
        gate: AccessGate,
        config: PhonebookConfig,
    ) -> Self {
        Self {
            registry: PhonebookRegistry::new(store, config.max_phonebook_size),
            gate,
            config,
            character_set: CharacterSet::default(),
            cpbr: CpbrState::Idle,
        }
    }

    pub fn character_set(&self) -> CharacterSet {
        self.character_set
    }

    /// The selected phonebook.
    pub fn selected(&self) -> PhonebookId {
        self.registry.selected()
    }

    /// Range of the in-flight `AT+CPBR`, if any.
    pub fn pending_range(&self) -> Option<IndexRange> {
        self.cpbr.pending_range()
    }

    /// True while a read waits for the user's access decision.
    pub fn is_checking_permission(&self) -> bool {
        self.cpbr.is_awaiting_access()
    }

    pub fn cpbr_state(&self) -> CpbrState {
        self.cpbr
    }

    /// Executes a phonebook command from `peer` and returns the responses to
    /// send, final result code last.
    ///
    /// The result is empty when an `AT+CPBR` read is waiting for the user to
    /// decide on phonebook access; the answer then comes from
    /// [`AtPhonebook::handle_access_reply`].
    pub fn execute(&mut self, peer: &PeerAddress, command: &AtCommand) -> Vec<AtResponse> {
        debug!(peer = %peer, command = %command.command, at_type = ?command.at_type, raw = %command.raw, "Phonebook command");

        let result = match command.command.as_str() {
            "CSCS" => self.cscs(command).map(Outcome::Complete),
            "CPBS" => self.cpbs(command).map(Outcome::Complete),
            "CPBR" => self.cpbr(peer, command),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        };
        finish(result)
    }

    /// Resumes the read waiting on `peer`'s access decision.
    ///
    /// Replies arriving while no read is waiting, or from a peer other than
    /// the one being asked about, are dropped and produce no response.
    pub fn handle_access_reply(&mut self, peer: &PeerAddress, reply: AccessReply) -> Vec<AtResponse> {
        let range = match self.cpbr {
            CpbrState::AwaitingAccess { peer: waiting, range } if waiting == *peer => range,
            CpbrState::AwaitingAccess { peer: waiting, .. } => {
                warn!(peer = %peer, waiting = %waiting, "Access reply for a different device, ignoring");
                return Vec::new();
            }
            _ => {
                warn!(peer = %peer, "Access reply while not checking permission, ignoring");
                return Vec::new();
            }
        };

        info!(peer = %peer, granted = reply.granted, always = reply.always, "Phonebook access reply");
        let result = if self.gate.apply_reply(peer, reply) {
            self.process_cpbr(range).map(Outcome::Complete)
        } else {
            self.cpbr = CpbrState::Idle;
            Err(CommandError::AccessDenied)
        };
        finish(result)
    }

    /// Restores the state of a fresh service level connection.
    pub fn reset_at_state(&mut self) {
        debug!("Resetting phonebook AT state");
        self.character_set = CharacterSet::default();
        self.cpbr = CpbrState::Idle;
    }

    /// Releases every cached result set.
    pub fn cleanup(&mut self) {
        self.registry.clear();
    }

    /// Number of the most recent outgoing call, used for redial.
    pub fn last_dialled_number(&self) -> Option<String> {
        let query = StoreQuery::CallLog {
            call_type: CallType::Outgoing,
            limit: 1,
        };
        let mut cursor = match self.registry.store().query(&query) {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!(error = %e, "Last dialled number unavailable");
                return None;
            }
        };
        if cursor.count() < 1 {
            warn!("No dialled calls");
            cursor.close();
            return None;
        }

        let number = match cursor.column_index(Column::Number) {
            Some(col) if cursor.move_to_next() => cursor.get_string(col),
            _ => None,
        };
        cursor.close();
        number
    }

    // ========================================================================
    // AT+CSCS
    // ========================================================================

    fn cscs(&mut self, command: &AtCommand) -> Result<Vec<AtResponse>, CommandError> {
        match command.at_type {
            AtCommandType::Read => Ok(vec![AtResponse::info(format!(
                "+CSCS: \"{}\"",
                self.character_set
            ))]),
            AtCommandType::Test => Ok(vec![AtResponse::info(format!(
                "+CSCS: {}",
                CharacterSet::SUPPORTED
            ))]),
            AtCommandType::Set => {
                let argument = command.argument().ok_or(CommandError::MissingArgument(None))?;
                let charset: CharacterSet = argument.replace('"', "").parse()?;
                debug!(charset = %charset, "Selected character set");
                self.character_set = charset;
                Ok(Vec::new())
            }
            AtCommandType::Unknown => Err(invalid_subtype(command)),
        }
    }

    // ========================================================================
    // AT+CPBS
    // ========================================================================

    fn cpbs(&mut self, command: &AtCommand) -> Result<Vec<AtResponse>, CommandError> {
        match command.at_type {
            AtCommandType::Read => {
                let id = self.registry.selected();
                if id == PhonebookId::Sm {
                    return Ok(vec![AtResponse::info(format!(
                        "+CPBS: \"SM\",0,{}",
                        max_phonebook_size(0)
                    ))]);
                }
                let size = self.selected_size(CmeError::OperationNotSupported)?;
                Ok(vec![AtResponse::info(format!(
                    "+CPBS: \"{}\",{},{}",
                    id,
                    size,
                    max_phonebook_size(size)
                ))])
            }
            AtCommandType::Test => {
                let tags: Vec<String> = PhonebookId::ALL
                    .iter()
                    .map(|id| format!("\"{}\"", id))
                    .collect();
                Ok(vec![AtResponse::info(format!("+CPBS: ({})", tags.join(",")))])
            }
            AtCommandType::Set => {
                let argument = command
                    .argument()
                    .ok_or(CommandError::MissingArgument(Some(CmeError::OperationNotSupported)))?;
                let name = argument.trim().trim_matches('"');
                self.registry.select(name).map_err(|e| {
                    debug!(error = %e, "Unknown phonebook");
                    CommandError::UnsupportedNamespace(e.0)
                })?;
                Ok(Vec::new())
            }
            AtCommandType::Unknown => Err(invalid_subtype(command)),
        }
    }

    // ========================================================================
    // AT+CPBR
    // ========================================================================

    fn cpbr(&mut self, peer: &PeerAddress, command: &AtCommand) -> Result<Outcome, CommandError> {
        match command.at_type {
            AtCommandType::Test => {
                let size = if self.registry.selected() == PhonebookId::Sm {
                    0
                } else {
                    self.selected_size(CmeError::OperationNotAllowed)?
                };
                // "(1-0)" confuses some car kits
                let size = size.max(1);
                Ok(Outcome::Complete(vec![AtResponse::info(format!(
                    "+CPBR: (1-{}),30,30",
                    size
                ))]))
            }
            AtCommandType::Read | AtCommandType::Set => {
                let argument = command
                    .argument()
                    .ok_or_else(|| CommandError::InvalidArgument("missing index".to_string()))?;
                let range = IndexRange::parse(argument)?;

                if !self.cpbr.is_idle() {
                    warn!(peer = %peer, pending = ?self.cpbr.pending_range(), "Phonebook read already in progress");
                    return Err(CommandError::Busy);
                }
                self.cpbr = CpbrState::AwaitingAccess { peer: *peer, range };

                match self.gate.check_access(peer) {
                    AccessPermission::Allowed => self.process_cpbr(range).map(Outcome::Complete),
                    AccessPermission::Rejected => {
                        self.cpbr = CpbrState::Idle;
                        Err(CommandError::AccessDenied)
                    }
                    AccessPermission::Unknown => {
                        info!(peer = %peer, range = %range, "Phonebook read waiting for access decision");
                        Ok(Outcome::Deferred)
                    }
                }
            }
            AtCommandType::Unknown => Err(invalid_subtype(command)),
        }
    }

    /// Reads `range` and releases the single-flight lock on every path.
    fn process_cpbr(&mut self, range: IndexRange) -> Result<Vec<AtResponse>, CommandError> {
        self.cpbr = CpbrState::Emitting { range };
        let format = RowFormat {
            charset: self.character_set,
            unknown_number: &self.config.unknown_number,
        };
        let result = read_entries(&mut self.registry, range, &format);
        self.cpbr = CpbrState::Idle;
        result
    }

    /// Row count of the selected phonebook from a fresh query. The result set
    /// is released before returning.
    fn selected_size(&mut self, unavailable: CmeError) -> Result<usize, CommandError> {
        let id = self.registry.selected();
        let size = match self.registry.resolve(id, true) {
            Ok(entry) => entry.count(),
            Err(e) => {
                warn!(phonebook = %id, error = %e, "Phonebook unavailable");
                return Err(CommandError::StoreUnavailable(unavailable));
            }
        };
        self.registry.invalidate(id);
        debug!(phonebook = %id, size, "Phonebook size");
        Ok(size)
    }
}

fn invalid_subtype(command: &AtCommand) -> CommandError {
    debug!(command = %command.command, "Invalid command subtype");
    CommandError::InvalidArgument(format!("unsupported subtype of {}", command.command))
}

/// Appends the final result code.
fn finish(result: Result<Outcome, CommandError>) -> Vec<AtResponse> {
    match result {
        Ok(Outcome::Complete(mut responses)) => {
            responses.push(AtResponse::ok());
            responses
        }
        Ok(Outcome::Deferred) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "Phonebook command failed");
            vec![e.to_response()]
        }
    }
}
