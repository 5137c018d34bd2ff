//! Sealed Checkpoints
//!
//! A checkpoint is one link of the append-only chain: the events folded since
//! the previous checkpoint, the chain hash after the last of them, and the
//! hash it was folded from.

use serde::{Deserialize, Serialize};

use crate::core::event::GameEvent;
use crate::core::hash::{fold_events, ChainHash};

/// Immutable batch of consecutive events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Zero-based position in the chain.
    pub index: u64,

    /// Events in chain order.
    pub events: Vec<GameEvent>,

    /// Chain hash after the last event.
    pub hash: ChainHash,

    /// Hash of the prior checkpoint, or the genesis hash for index 0.
    pub previous_hash: ChainHash,

    /// Seal time (Unix ms).
    pub timestamp: u64,

    /// Session the checkpoint belongs to.
    pub session_id: String,
}

impl Checkpoint {
    /// Number of events in the checkpoint.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Hash obtained by replaying the events from `previous_hash`.
    pub fn replay_hash(&self) -> ChainHash {
        fold_events(self.previous_hash, &self.events)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("checkpoint serialization should not fail")
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
