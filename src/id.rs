//! Opaque photo identifiers.
//!
//! Every id handed out by this crate, for photos and for generated
//! thumbnail files alike, is exactly 40 lowercase hex characters. The HTTP
//! layer rejects anything else before touching the index.
//!
//! Ids come from an [`IdGenerator`]: SHA-256 over a random per-process seed
//! and a monotonically increasing counter, truncated to 20 bytes. The
//! counter makes ids unique within a process; the seed keeps them
//! unguessable and different across restarts.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Length of an id in hex characters.
pub const ID_LEN: usize = 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed photo id {0:?}: expected 40 lowercase hex characters")]
pub struct MalformedId(pub String);

/// Whether `s` is a syntactically valid id.
pub fn is_well_formed(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// A validated 40-char lowercase hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PhotoId {
    type Err = MalformedId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_well_formed(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(MalformedId(s.to_string()))
        }
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PhotoId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Thread-safe source of fresh [`PhotoId`]s.
pub struct IdGenerator {
    seed: [u8; 32],
    counter: AtomicU64,
}

impl IdGenerator {
    /// A generator seeded from the thread-local RNG.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// A deterministic generator; the same seed yields the same id sequence.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            seed,
            counter: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> PhotoId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(n.to_le_bytes());
        let digest = hasher.finalize();
        let hex: String = digest[..ID_LEN / 2]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        PhotoId(hex)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
