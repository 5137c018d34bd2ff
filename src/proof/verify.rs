//! Verification API
//!
//! Verify recorded sessions by replaying the hash chain.
//!
//! Every check reports through a [`VerificationResult`] value; tampering is
//! an expected outcome, not an error. The first failing index is always
//! reported so a caller can say exactly where the record was altered.

use serde::Serialize;
use thiserror::Error;

use crate::audit::{default_sink, IntegrityEvent, SharedSink};
use crate::chain::checkpoint::Checkpoint;
use crate::core::config::IntegrityConfig;
use crate::core::event::GameEvent;
use crate::core::hash::{genesis_hash, ChainHash};
use crate::proof::rules::GameRules;

/// Why a verification failed.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VerificationError {
    /// Nothing to verify.
    #[error("No checkpoints to verify.")]
    EmptyChain,

    /// First checkpoint does not start from the session's genesis hash.
    #[error("Genesis hash does not match session ID.")]
    GenesisMismatch,

    /// Checkpoint indices are not dense and zero-based.
    #[error("Checkpoint index mismatch at position {position}. Expected {position}, got {found}.")]
    IndexMismatch {
        /// Position in the sequence.
        position: usize,
        /// Index stored in the checkpoint.
        found: u64,
    },

    /// Replaying the events does not reproduce the stored hash.
    #[error("Hash mismatch in checkpoint #{index}.")]
    HashMismatch {
        /// Checkpoint index.
        index: u64,
    },

    /// An event carries NaN or an infinity and cannot be hashed faithfully.
    #[error("Checkpoint #{index} event {event} carries a non-finite value.")]
    NonFiniteEvent {
        /// Checkpoint index.
        index: u64,
        /// Event position within the checkpoint.
        event: usize,
    },

    /// `previous_hash` does not point at the prior checkpoint.
    #[error("Checkpoint #{index} previousHash does not match checkpoint #{previous} hash.")]
    BrokenLink {
        /// Checkpoint index.
        index: usize,
        /// Index of the checkpoint it should link to.
        previous: usize,
    },

    /// An event is timestamped before one already seen.
    #[error("Events are not in chronological order (event {event}: {found} < {previous}).")]
    TimestampRegression {
        /// Event position.
        event: usize,
        /// Latest timestamp seen before it.
        previous: u64,
        /// Its timestamp.
        found: u64,
    },

    /// A player moved faster than allowed.
    #[error("Impossible movement speed at event {event} ({speed:.2} units/ms, max {max}). Possible speed hack.")]
    SpeedViolation {
        /// Event position.
        event: usize,
        /// Observed speed (units/ms).
        speed: f64,
        /// Configured maximum.
        max: f64,
    },
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Did verification pass?
    pub valid: bool,

    /// Human-readable summary.
    pub message: String,

    /// Hash the record claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<ChainHash>,

    /// Hash obtained by replay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hash: Option<ChainHash>,

    /// Earliest failing checkpoint (chain checks) or event (rule checks).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at_event: Option<usize>,

    /// Structured failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<VerificationError>,

    /// Checkpoints covered by a passing result.
    pub checkpoints_verified: usize,

    /// Events covered by a passing result.
    pub events_verified: usize,
}

impl VerificationResult {
    /// Passing result.
    pub fn passed(message: impl Into<String>, checkpoints: usize, events: usize) -> Self {
        Self {
            valid: true,
            message: message.into(),
            expected_hash: None,
            actual_hash: None,
            failed_at_event: None,
            error: None,
            checkpoints_verified: checkpoints,
            events_verified: events,
        }
    }

    /// Failing result described by `error`.
    pub fn failed(error: VerificationError) -> Self {
        Self {
            valid: false,
            message: error.to_string(),
            expected_hash: None,
            actual_hash: None,
            failed_at_event: None,
            error: Some(error),
            checkpoints_verified: 0,
            events_verified: 0,
        }
    }

    /// Attach expected and replayed hashes.
    pub fn with_hashes(mut self, expected: ChainHash, actual: ChainHash) -> Self {
        self.expected_hash = Some(expected);
        self.actual_hash = Some(actual);
        self
    }

    /// Mark the failing index.
    pub fn at(mut self, index: usize) -> Self {
        self.failed_at_event = Some(index);
        self
    }
}

/// Replays checkpoints and applies plausibility rules.
pub struct Verifier {
    rules: GameRules,
    sink: SharedSink,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(&IntegrityConfig::default())
    }
}

impl Verifier {
    /// Verifier using the speed limit from `config`.
    pub fn new(config: &IntegrityConfig) -> Self {
        Self {
            rules: GameRules::new(config.max_player_speed),
            sink: default_sink(),
        }
    }

    /// Replace the audit sink.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Rules in force.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Replay one checkpoint from its `previous_hash`.
    pub fn verify_checkpoint(&self, checkpoint: &Checkpoint) -> VerificationResult {
        if let Some(event) = checkpoint.events.iter().position(|e| !e.is_finite()) {
            self.sink.emit(IntegrityEvent::CheckpointVerified {
                index: checkpoint.index,
                valid: false,
            });
            return VerificationResult::failed(VerificationError::NonFiniteEvent {
                index: checkpoint.index,
                event,
            });
        }

        let actual = checkpoint.replay_hash();
        let valid = actual == checkpoint.hash;

        self.sink.emit(IntegrityEvent::CheckpointVerified {
            index: checkpoint.index,
            valid,
        });

        let result = if valid {
            VerificationResult::passed(
                format!("Checkpoint #{} verified successfully.", checkpoint.index),
                1,
                checkpoint.events.len(),
            )
        } else {
            VerificationResult::failed(VerificationError::HashMismatch {
                index: checkpoint.index,
            })
        };

        result.with_hashes(checkpoint.hash, actual)
    }

    /// Verify a whole chain for `session_id`, failing fast.
    pub fn verify_chain(&self, checkpoints: &[Checkpoint], session_id: &str) -> VerificationResult {
        let result = self.check_chain(checkpoints, session_id);
        self.report(&result);
        result
    }

    fn check_chain(&self, checkpoints: &[Checkpoint], session_id: &str) -> VerificationResult {
        let Some(first) = checkpoints.first() else {
            return VerificationResult::failed(VerificationError::EmptyChain);
        };

        let genesis = genesis_hash(session_id);
        if first.previous_hash != genesis {
            return VerificationResult::failed(VerificationError::GenesisMismatch)
                .with_hashes(genesis, first.previous_hash)
                .at(0);
        }

        for (i, checkpoint) in checkpoints.iter().enumerate() {
            if checkpoint.index != i as u64 {
                return VerificationResult::failed(VerificationError::IndexMismatch {
                    position: i,
                    found: checkpoint.index,
                })
                .at(i);
            }

            let replay = self.verify_checkpoint(checkpoint);
            if !replay.valid {
                return replay.at(i);
            }

            if i > 0 {
                let previous = &checkpoints[i - 1];
                if checkpoint.previous_hash != previous.hash {
                    return VerificationResult::failed(VerificationError::BrokenLink {
                        index: i,
                        previous: i - 1,
                    })
                    .with_hashes(previous.hash, checkpoint.previous_hash)
                    .at(i);
                }
            }
        }

        let events = checkpoints.iter().map(Checkpoint::event_count).sum();
        VerificationResult::passed(
            format!("All {} checkpoints verified successfully.", checkpoints.len()),
            checkpoints.len(),
            events,
        )
    }

    /// Apply plausibility rules to `events` in order.
    pub fn validate_game_rules(&self, events: &[GameEvent]) -> VerificationResult {
        let result = self.rules.validate(events);
        self.report(&result);
        result
    }

    /// Chain verification followed by rule validation over all events.
    pub fn full_verification(&self, checkpoints: &[Checkpoint], session_id: &str) -> VerificationResult {
        let chain = self.check_chain(checkpoints, session_id);
        if !chain.valid {
            self.report(&chain);
            return chain;
        }

        let events: Vec<GameEvent> = checkpoints
            .iter()
            .flat_map(|cp| cp.events.iter().cloned())
            .collect();

        let rules = self.rules.validate(&events);
        if !rules.valid {
            self.report(&rules);
            return rules;
        }

        let result = VerificationResult::passed(
            format!(
                "Full verification passed: {} checkpoints and {} events, hash chain and game rules valid.",
                checkpoints.len(),
                events.len()
            ),
            checkpoints.len(),
            events.len(),
        );
        self.report(&result);
        result
    }

    fn report(&self, result: &VerificationResult) {
        let event = if result.valid {
            IntegrityEvent::VerificationPassed {
                checkpoints: result.checkpoints_verified,
                events: result.events_verified,
            }
        } else {
            IntegrityEvent::VerificationFailed {
                reason: result.message.clone(),
                failed_at: result.failed_at_event,
            }
        };
        self.sink.emit(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
