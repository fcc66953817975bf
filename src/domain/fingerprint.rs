use std::fmt;

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A stable content hash.
///
/// The fingerprint is a SHA256 hash of the Borsh-serialized content, rendered
/// as lowercase hex. It is used to detect unchanged content across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Calculate the fingerprint of a value.
    ///
    /// # Panics
    ///
    /// Panics if borsh serialization fails (which should never happen when
    /// writing to an in-memory buffer).
    #[must_use]
    pub fn of<T: BorshSerialize>(value: &T) -> Self {
        // encode using [borsh](https://borsh.io/)
        let encoded = borsh::to_vec(value).expect("this should never fail");

        let hash = Sha256::digest(encoded);

        Self(format!("{hash:x}"))
    }

    /// Wrap a fingerprint that was read back from an external record.
    ///
    /// Returns `None` unless the string is 64 hex digits.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        (s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| Self(s.to_ascii_lowercase()))
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(Fingerprint::of(&"some text"), Fingerprint::of(&"some text"));
    }

    #[test]
    fn content_affects_fingerprint() {
        assert_ne!(Fingerprint::of(&"some text"), Fingerprint::of(&"other text"));
    }

    #[test]
    fn parse_accepts_own_output() {
        let fingerprint = Fingerprint::of(&"some text");
        assert_eq!(Fingerprint::parse(fingerprint.as_str()), Some(fingerprint));
    }

    #[test]
    fn parse_normalizes_case() {
        let fingerprint = Fingerprint::of(&"some text");
        let upper = fingerprint.as_str().to_ascii_uppercase();
        assert_eq!(Fingerprint::parse(&upper), Some(fingerprint));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Fingerprint::parse("abc"), None);
        assert_eq!(Fingerprint::parse(&"z".repeat(64)), None);
    }
}
