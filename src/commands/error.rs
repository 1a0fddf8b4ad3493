//! Command failures and their terminal AT status.

use crate::protocol::{AtResponse, CmeError, ResultCode};
use thiserror::Error;

/// Why a phonebook command did not complete with `OK`.
///
/// Every variant maps to exactly one terminal status through
/// [`CommandError::result_code`]. Variants whose status depends on the
/// command carry the cause chosen by the command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Malformed argument or unrecognized subtype. `+CME ERROR: 25`
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A set command without an argument
    #[error("missing argument")]
    MissingArgument(Option<CmeError>),

    /// Phonebook tag outside the supported set. `+CME ERROR: 3`
    #[error("unsupported phonebook '{0}'")]
    UnsupportedNamespace(String),

    /// Character set outside the supported set. `+CME ERROR: 4`
    #[error("unsupported character set '{0}'")]
    UnsupportedCharset(String),

    /// A phonebook read is already in flight. `+CME ERROR: 3`
    #[error("phonebook read already in progress")]
    Busy,

    /// The store returned no result set
    #[error("phonebook store unavailable")]
    StoreUnavailable(CmeError),

    /// The peer was refused phonebook access. `+CME ERROR: 0`
    #[error("phonebook access denied")]
    AccessDenied,

    /// The cached result set could not be positioned. `ERROR`
    #[error("phonebook result set lost")]
    ResultSetLost,

    /// Not a phonebook command. `ERROR`
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

impl CommandError {
    /// The terminal status sent for this failure.
    pub fn result_code(&self) -> ResultCode {
        match self {
            CommandError::InvalidArgument(_) => ResultCode::cme(CmeError::TextHasInvalidChars),
            CommandError::MissingArgument(cause) => ResultCode::Error(*cause),
            CommandError::UnsupportedNamespace(_) => ResultCode::cme(CmeError::OperationNotAllowed),
            CommandError::UnsupportedCharset(_) => ResultCode::cme(CmeError::OperationNotSupported),
            CommandError::Busy => ResultCode::cme(CmeError::OperationNotAllowed),
            CommandError::StoreUnavailable(cause) => ResultCode::cme(*cause),
            CommandError::AccessDenied => ResultCode::cme(CmeError::AgFailure),
            CommandError::ResultSetLost | CommandError::UnknownCommand(_) => ResultCode::error(),
        }
    }

    pub fn to_response(&self) -> AtResponse {
        AtResponse::Code(self.result_code())
    }
}
