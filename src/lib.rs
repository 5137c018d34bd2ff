//! # Game Integrity
//!
//! Tamper-evident recording of gameplay sessions, designed so that a match
//! can be audited after the fact.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GAME INTEGRITY                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                 │
//! │  ├── event.rs    - Gameplay event model                     │
//! │  ├── hash.rs     - Canonical SHA-256 chain hashing          │
//! │  ├── clock.rs    - Injectable time source                   │
//! │  └── config.rs   - Checkpoint and rule configuration        │
//! │                                                             │
//! │  chain/          - Recording                                │
//! │  ├── hash_chain.rs - Session chain and checkpoint policy    │
//! │  ├── checkpoint.rs - Sealed checkpoint record               │
//! │  └── shared.rs   - Single-writer handle for many producers  │
//! │                                                             │
//! │  signing/        - Identity binding                         │
//! │  ├── keys.rs     - Ed25519 keys, encrypted custody          │
//! │  ├── store.rs    - Key record storage                       │
//! │  └── signer.rs   - Signed checkpoints                       │
//! │                                                             │
//! │  proof/          - Verification                             │
//! │  ├── verify.rs   - Chain replay and linkage checks          │
//! │  └── rules.rs    - Gameplay plausibility                    │
//! │                                                             │
//! │  audit.rs        - Integrity events and sinks               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! Hashing is a pure function of its inputs:
//! - Canonical JSON with a fixed field order
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - Time only enters through an injected [`Clock`]
//!
//! Given the same session id and event sequence, every platform produces
//! **identical hashes**, so any verifier can replay a recorded session.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod chain;
pub mod core;
pub mod proof;
pub mod signing;

// Re-export commonly used types
pub use audit::{IntegrityEvent, IntegrityEventSink, NullSink, RecordingSink, TracingSink};
pub use chain::{Checkpoint, ChainError, HashChain, SharedHashChain};
pub use crate::core::{ChainHash, Clock, GameEvent, IntegrityConfig, ManualClock, Position, SystemClock};
pub use proof::{VerificationError, VerificationResult, Verifier};
pub use signing::{KeyCustodian, KeyError, Keypair, SignedCheckpoint, Signer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
