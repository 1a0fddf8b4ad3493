//! Remote device addresses.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A malformed `XX:XX:XX:XX:XX:XX` address string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid device address '{0}'")]
pub struct InvalidAddress(pub String);

/// Bluetooth device address of the remote Hands-Free unit.
///
/// Bytes are stored in display order (most significant first).
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PeerAddress(pub [u8; 6]);

impl PeerAddress {
    /// An empty/invalid address
    pub const EMPTY: Self = Self([0; 6]);
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d, e, g)
    }
}

impl FromStr for PeerAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(InvalidAddress(s.to_string()));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| InvalidAddress(s.to_string()))?;
        }
        Ok(PeerAddress(bytes))
    }
}
