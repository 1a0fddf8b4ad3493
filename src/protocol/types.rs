//! AT Command and Response Types
//!
//! This module defines the values exchanged with the Hands-Free unit over the
//! AT command channel. Commands arrive already tokenized by the lower layers;
//! responses are built here and framed for the wire.
//!
//! ## Response Format
//!
//! Every reply to a command is zero or more information lines followed by
//! exactly one final result code:
//!
//! - Information text: `\r\n<text>\r\n`
//! - Success: `\r\nOK\r\n`
//! - Plain failure: `\r\nERROR\r\n`
//! - Extended failure: `\r\n+CME ERROR: <n>\r\n`
//!
//! ## Examples
//!
//! Character set query: `\r\n+CSCS: "UTF-8"\r\n\r\nOK\r\n`
//! Busy phonebook read: `\r\n+CME ERROR: 3\r\n`

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// The CRLF terminator used around every AT response
pub const CRLF: &[u8] = b"\r\n";

/// The subtype of an AT command, as reported by the command tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtCommandType {
    /// `AT+CMD=?`
    Test,
    /// `AT+CMD?`
    Read,
    /// `AT+CMD=<args>`
    Set,
    /// Anything the tokenizer could not classify
    Unknown,
}

impl AtCommandType {
    /// Maps the numeric type used by the native layer.
    ///
    /// `0` is read, `1` is set, `2` is test; everything else is unknown.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => AtCommandType::Read,
            1 => AtCommandType::Set,
            2 => AtCommandType::Test,
            _ => AtCommandType::Unknown,
        }
    }
}

/// A single tokenized AT command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCommand {
    /// Command name without the `AT+` prefix, e.g. `CPBR`
    pub command: String,
    /// Subtype of the command
    pub at_type: AtCommandType,
    /// The raw command string, e.g. `+CPBR=1,10`
    pub raw: String,
}

impl AtCommand {
    /// Creates a new command.
    ///
    /// # Example
    /// ```
    /// use hfp_phonebook::protocol::{AtCommand, AtCommandType};
    /// let cmd = AtCommand::new("CPBR", AtCommandType::Set, "+CPBR=1,10");
    /// assert_eq!(cmd.argument(), Some("1,10"));
    /// ```
    pub fn new(command: impl Into<String>, at_type: AtCommandType, raw: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            at_type,
            raw: raw.into(),
        }
    }

    /// Returns the text between the first and second `=` of the raw command.
    ///
    /// Empty arguments are reported as missing.
    pub fn argument(&self) -> Option<&str> {
        self.raw.split('=').nth(1).filter(|arg| !arg.is_empty())
    }
}

/// Extended error causes reported through `+CME ERROR: <n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CmeError {
    AgFailure = 0,
    NoConnectionToPhone = 1,
    OperationNotAllowed = 3,
    OperationNotSupported = 4,
    PinRequired = 5,
    SimMissing = 10,
    SimPinRequired = 11,
    SimPukRequired = 12,
    SimFailure = 13,
    SimBusy = 14,
    WrongPassword = 16,
    SimPin2Required = 17,
    SimPuk2Required = 18,
    MemoryFull = 20,
    InvalidIndex = 21,
    MemoryFailure = 23,
    TextTooLong = 24,
    TextHasInvalidChars = 25,
    DialStringTooLong = 26,
    DialStringHasInvalidChars = 27,
    NoService = 30,
    Only911Allowed = 32,
}

impl CmeError {
    /// The numeric cause sent on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// The final result code terminating every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    /// `ERROR`, or `+CME ERROR: <n>` when a cause is attached
    Error(Option<CmeError>),
}

impl ResultCode {
    /// An error carrying an extended cause.
    pub fn cme(cause: CmeError) -> Self {
        ResultCode::Error(Some(cause))
    }

    /// A plain `ERROR` without a cause.
    pub fn error() -> Self {
        ResultCode::Error(None)
    }

    /// Returns true for `OK`.
    pub fn is_ok(&self) -> bool {
        matches!(self, ResultCode::Ok)
    }
}

/// A response sent back to the Hands-Free unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtResponse {
    /// An information text line such as `+CPBS: "ME",12,256`
    Info(String),
    /// The terminating result code
    Code(ResultCode),
}

impl AtResponse {
    /// Creates an information response.
    ///
    /// # Example
    /// ```
    /// use hfp_phonebook::protocol::AtResponse;
    /// let info = AtResponse::info("+CSCS: \"GSM\"");
    /// assert_eq!(&info.serialize()[..], b"\r\n+CSCS: \"GSM\"\r\n");
    /// ```
    pub fn info(text: impl Into<String>) -> Self {
        AtResponse::Info(text.into())
    }

    /// Common response for successful commands
    pub fn ok() -> Self {
        AtResponse::Code(ResultCode::Ok)
    }

    /// Creates a `+CME ERROR` response.
    pub fn cme_error(cause: CmeError) -> Self {
        AtResponse::Code(ResultCode::cme(cause))
    }

    /// Creates a plain `ERROR` response.
    pub fn error() -> Self {
        AtResponse::Code(ResultCode::error())
    }

    /// Returns true if this response terminates the command.
    pub fn is_final(&self) -> bool {
        matches!(self, AtResponse::Code(_))
    }

    /// Serializes the response to wire bytes.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.serialize_into(&mut buf);
        buf.freeze()
    }

    /// Serializes the response into an existing buffer.
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        buf.put_slice(CRLF);
        match self {
            AtResponse::Info(text) => buf.put_slice(text.as_bytes()),
            AtResponse::Code(ResultCode::Ok) => buf.put_slice(b"OK"),
            AtResponse::Code(ResultCode::Error(None)) => buf.put_slice(b"ERROR"),
            AtResponse::Code(ResultCode::Error(Some(cause))) => {
                buf.put_slice(b"+CME ERROR: ");
                buf.put_slice(cause.code().to_string().as_bytes());
            }
        }
        buf.put_slice(CRLF);
    }
}

impl fmt::Display for AtResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtResponse::Info(text) => write!(f, "{}", text.trim_end()),
            AtResponse::Code(ResultCode::Ok) => write!(f, "OK"),
            AtResponse::Code(ResultCode::Error(None)) => write!(f, "ERROR"),
            AtResponse::Code(ResultCode::Error(Some(cause))) => {
                write!(f, "+CME ERROR: {}", cause.code())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_serialize() {
        assert_eq!(&AtResponse::ok().serialize()[..], b"\r\nOK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        assert_eq!(&AtResponse::error().serialize()[..], b"\r\nERROR\r\n");
    }

    #[test]
    fn test_cme_error_serialize() {
        let response = AtResponse::cme_error(CmeError::TextHasInvalidChars);
        assert_eq!(&response.serialize()[..], b"\r\n+CME ERROR: 25\r\n");

        let response = AtResponse::cme_error(CmeError::AgFailure);
        assert_eq!(&response.serialize()[..], b"\r\n+CME ERROR: 0\r\n");
    }

    #[test]
    fn test_info_serialize() {
        let response = AtResponse::info("+CPBR: (1-5),30,30");
        assert_eq!(&response.serialize()[..], b"\r\n+CPBR: (1-5),30,30\r\n");
    }

    #[test]
    fn test_argument_extraction() {
        let cmd = AtCommand::new("CPBS", AtCommandType::Set, "AT+CPBS=\"DC\"");
        assert_eq!(cmd.argument(), Some("\"DC\""));

        let cmd = AtCommand::new("CPBR", AtCommandType::Set, "AT+CPBR=");
        assert_eq!(cmd.argument(), None);

        let cmd = AtCommand::new("CPBR", AtCommandType::Read, "AT+CPBR");
        assert_eq!(cmd.argument(), None);
    }

    #[test]
    fn test_command_type_from_raw() {
        assert_eq!(AtCommandType::from_raw(0), AtCommandType::Read);
        assert_eq!(AtCommandType::from_raw(1), AtCommandType::Set);
        assert_eq!(AtCommandType::from_raw(2), AtCommandType::Test);
        assert_eq!(AtCommandType::from_raw(-1), AtCommandType::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(AtResponse::cme_error(CmeError::OperationNotAllowed).to_string(), "+CME ERROR: 3");
        assert_eq!(AtResponse::info("+CPBR: 1,\"1\",129,\"A\"\r\n\r\n").to_string(), "+CPBR: 1,\"1\",129,\"A\"");
    }
}
