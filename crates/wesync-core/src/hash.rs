//! Content hashes for commits.
//!
//! A [`CommitHash`] is a 160-bit fingerprint rendered as 40 lowercase hex
//! characters. It identifies a commit by its logical content only, so two
//! replicas that independently build the same commit agree on its identity.
//!
//! ## Digest
//!
//! ```text
//! payload ──serde──▶ serde_json::Value ──to_vec──▶ bytes ──SHA-256──▶ [..20] ──hex──▶ CommitHash
//! ```
//!
//! Going through [`serde_json::Value`] first sorts object keys, so payloads
//! holding hash maps still produce the same bytes on every run. The hash is
//! a deduplication key, not a tamper seal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of hex characters in a rendered [`CommitHash`].
pub const HASH_HEX_LEN: usize = 40;

const HASH_BYTES: usize = HASH_HEX_LEN / 2;

// ---------------------------------------------------------------------------
// CommitHash
// ---------------------------------------------------------------------------

/// A validated 40-character lowercase hex commit fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    /// Parse a `CommitHash` from a string, validating its format.
    ///
    /// # Errors
    /// Returns an error if the string is not exactly 40 lowercase hex characters.
    pub fn new(s: &str) -> Result<Self, InvalidHash> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    fn validate(s: &str) -> Result<(), InvalidHash> {
        if s.len() != HASH_HEX_LEN {
            return Err(InvalidHash {
                value: s.to_owned(),
                reason: format!("expected {HASH_HEX_LEN} hex characters, got {}", s.len()),
            });
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(InvalidHash {
                value: s.to_owned(),
                reason: "must contain only lowercase hex characters (0-9, a-f)".to_owned(),
            });
        }
        Ok(())
    }

    /// Fingerprint any serializable content.
    ///
    /// # Errors
    /// Returns the serializer's error if `content` cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn of<T: Serialize + ?Sized>(content: &T) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_value(content)?;
        let bytes = serde_json::to_vec(&canonical)?;
        let digest = Sha256::digest(&bytes);

        let mut hex = String::with_capacity(HASH_HEX_LEN);
        for byte in &digest[..HASH_BYTES] {
            use fmt::Write as _;
            // Writing into a String cannot fail.
            let _ = write!(hex, "{byte:02x}");
        }
        Ok(Self(hex))
    }

    /// Return the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first eight hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommitHash {
    type Err = InvalidHash;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CommitHash {
    type Error = InvalidHash;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<CommitHash> for String {
    fn from(hash: CommitHash) -> Self {
        hash.0
    }
}

/// A string that is not a well-formed [`CommitHash`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid commit hash `{value}`: {reason}")]
pub struct InvalidHash {
    /// The raw value that failed validation.
    pub value: String,
    /// Why validation failed.
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
