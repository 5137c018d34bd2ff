//! Chain Hashing
//!
//! Pure functions behind the hash chain:
//! - Genesis hash derived from the session identifier
//! - Chain hash linking a predecessor hash to the next event
//! - Sequential fold used by both the chain and the verifier
//!
//! Inputs are canonicalized by serializing a fixed structure with
//! `serde_json` (field order is declaration order) and hashing the bytes with
//! SHA-256. Changing any field name, order or encoding here changes every
//! chain hash ever produced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::event::GameEvent;

/// Marker placed in the genesis structure.
pub const GENESIS_MARKER: &str = "CHAIN_INIT";

/// Length of a hash in hex characters.
pub const HASH_HEX_LEN: usize = 64;

/// 256-bit chain hash.
///
/// Displays, parses and serializes as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChainHash(pub [u8; 32]);

impl ChainHash {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from exactly 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        if s.len() != HASH_HEX_LEN {
            return Err(HashParseError::Length(s.len()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| HashParseError::Hex)?;
        Ok(Self(bytes))
    }

    /// First 16 hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainHash({})", self.to_hex())
    }
}

impl FromStr for ChainHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ChainHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a hex hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashParseError {
    /// Wrong number of characters.
    #[error("expected {HASH_HEX_LEN} hex characters, got {0}")]
    Length(usize),
    /// Non-hex characters.
    #[error("invalid hex digit")]
    Hex,
}

/// Canonical structure hashed to seed a session.
#[derive(Serialize)]
struct GenesisSeed<'a> {
    #[serde(rename = "sessionId")]
    session_id: &'a str,
    #[serde(rename = "type")]
    marker: &'static str,
}

/// Canonical structure hashed for every chain link.
#[derive(Serialize)]
struct ChainLink<'a> {
    #[serde(rename = "previousHash")]
    previous_hash: &'a ChainHash,
    data: &'a GameEvent,
}

/// SHA-256 of the canonical JSON encoding of `value`.
fn hash_canonical<T: Serialize>(value: &T) -> ChainHash {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, value)
        .expect("canonical chain structures always serialize");
    ChainHash(hasher.finalize().into())
}

/// Compute a plain SHA-256 of arbitrary data.
pub fn hash_bytes(data: &[u8]) -> ChainHash {
    ChainHash(Sha256::digest(data).into())
}

/// Deterministic root hash for a session.
pub fn genesis_hash(session_id: &str) -> ChainHash {
    hash_canonical(&GenesisSeed {
        session_id,
        marker: GENESIS_MARKER,
    })
}

/// Link `event` onto `previous`.
pub fn chain_hash(previous: &ChainHash, event: &GameEvent) -> ChainHash {
    hash_canonical(&ChainLink {
        previous_hash: previous,
        data: event,
    })
}

/// Apply [`chain_hash`] to each event in order, starting from `start`.
pub fn fold_events<'a, I>(start: ChainHash, events: I) -> ChainHash
where
    I: IntoIterator<Item = &'a GameEvent>,
{
    events
        .into_iter()
        .fold(start, |hash, event| chain_hash(&hash, event))
}

// =============================================================================
// TESTS
// =============================================================================
