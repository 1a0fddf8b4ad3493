//! Phonebook handler configuration.

/// Most entries we will ever report for one phonebook. The phone can hold far
/// more, but Hands-Free units cannot.
pub const MAX_PHONEBOOK_SIZE: usize = 16384;

/// Default component that receives phonebook consent requests.
pub const DEFAULT_PAIRING_AUTHORITY: &str = "com.android.settings";

/// Default name shown for calls without a presentable number.
pub const DEFAULT_UNKNOWN_NUMBER: &str = "Unknown";

/// Configuration for the phonebook command handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonebookConfig {
    /// Who gets asked when a peer's phonebook permission is unknown
    pub pairing_authority: String,

    /// Localized placeholder for restricted or unknown numbers
    pub unknown_number: String,

    /// Row ceiling applied to every phonebook query
    pub max_phonebook_size: usize,
}

impl Default for PhonebookConfig {
    fn default() -> Self {
        Self {
            pairing_authority: DEFAULT_PAIRING_AUTHORITY.to_string(),
            unknown_number: DEFAULT_UNKNOWN_NUMBER.to_string(),
            max_phonebook_size: MAX_PHONEBOOK_SIZE,
        }
    }
}
