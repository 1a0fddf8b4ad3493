//! Character sets selectable with `AT+CSCS`.

use crate::commands::error::CommandError;
use std::fmt;
use std::str::FromStr;

/// TE character set used for names in `+CPBR` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharacterSet {
    #[default]
    Utf8,
    /// International reference alphabet (7-bit ASCII)
    Ira,
    /// GSM 03.38 default alphabet
    Gsm,
}

impl CharacterSet {
    /// Reply to `AT+CSCS=?`.
    pub const SUPPORTED: &'static str = "(\"UTF-8\",\"IRA\",\"GSM\")";

    pub fn as_str(self) -> &'static str {
        match self {
            CharacterSet::Utf8 => "UTF-8",
            CharacterSet::Ira => "IRA",
            CharacterSet::Gsm => "GSM",
        }
    }
}

impl fmt::Display for CharacterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacterSet {
    type Err = CommandError;

    /// Case-sensitive. `UTF8` is accepted for `UTF-8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UTF-8" | "UTF8" => Ok(CharacterSet::Utf8),
            "IRA" => Ok(CharacterSet::Ira),
            "GSM" => Ok(CharacterSet::Gsm),
            other => Err(CommandError::UnsupportedCharset(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("GSM".parse(), Ok(CharacterSet::Gsm));
        assert_eq!("IRA".parse(), Ok(CharacterSet::Ira));
        assert_eq!("UTF-8".parse(), Ok(CharacterSet::Utf8));
        assert_eq!("UTF8".parse(), Ok(CharacterSet::Utf8));
        assert!("gsm".parse::<CharacterSet>().is_err());
        assert!("UCS2".parse::<CharacterSet>().is_err());
    }

    #[test]
    fn test_default_is_utf8() {
        assert_eq!(CharacterSet::default().to_string(), "UTF-8");
    }
}
