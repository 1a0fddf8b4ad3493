//! AT Protocol Types and Encodings
//!
//! This module provides the building blocks shared by the phonebook commands:
//! command and response values, phone number formatting, and the GSM default
//! alphabet.
//!
//! ## Modules
//!
//! - `types`: `AtCommand`, `AtResponse`, result codes and CME causes
//! - `number`: type-of-address and separator stripping for dial strings
//! - `gsm`: GSM 03.38 default alphabet encoding
//!
//! ## Example
//!
//! ```
//! use hfp_phonebook::protocol::{AtResponse, CmeError};
//!
//! let busy = AtResponse::cme_error(CmeError::OperationNotAllowed);
//! assert_eq!(&busy.serialize()[..], b"\r\n+CME ERROR: 3\r\n");
//! ```

pub mod gsm;
pub mod number;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{AtCommand, AtCommandType, AtResponse, CmeError, ResultCode};
