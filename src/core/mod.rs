//! Core primitives.
//!
//! Everything the chain, signer and verifier share: the event model, the
//! pure chain-hash functions, configuration and time sources.

pub mod clock;
pub mod config;
pub mod event;
pub mod hash;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, IntegrityConfig};
pub use event::{EventData, EventKind, GameEvent, Position};
pub use hash::{chain_hash, fold_events, genesis_hash, ChainHash, HashParseError};
