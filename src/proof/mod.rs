//! Session Verification
//!
//! Decides whether a recorded session is authentic and plausible:
//! - Replay of every checkpoint's events from its `previous_hash`
//! - Linkage from the session's genesis hash through every checkpoint
//! - Gameplay plausibility (chronology, movement speed)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    VERIFICATION                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  verify.rs  - Verifier, VerificationResult, failure kinds   │
//! │  rules.rs   - Timestamp ordering and speed-hack detection   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod rules;
pub mod verify;

// Re-export key types
pub use rules::GameRules;
pub use verify::{VerificationError, VerificationResult, Verifier};
