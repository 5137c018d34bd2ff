//! Hash Chain
//!
//! Per-session accumulation of gameplay events into linked checkpoints.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       HASH CHAIN                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  hash_chain.rs  - Session state machine, checkpoint policy  │
//! │  checkpoint.rs  - Immutable sealed batches                  │
//! │  shared.rs      - Single-writer handle for many producers   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod checkpoint;
pub mod hash_chain;
pub mod shared;

pub use checkpoint::Checkpoint;
pub use hash_chain::{ChainError, ChainState, ChainStats, HashChain};
pub use shared::SharedHashChain;
