//! Audit Events
//!
//! Components never log inline. They describe what happened as an
//! [`IntegrityEvent`] and hand it to an injected [`IntegrityEventSink`].
//! [`TracingSink`] forwards to `tracing`, [`NullSink`] drops everything and
//! [`RecordingSink`] keeps events in memory for assertions.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::hash::ChainHash;

/// Something observable happened inside the integrity core.
#[derive(Clone, Debug, PartialEq)]
pub enum IntegrityEvent {
    /// A session chain was started.
    ChainStarted {
        /// Session identifier.
        session_id: String,
        /// Genesis hash of the session.
        genesis: ChainHash,
    },

    /// An event was folded into the chain.
    EventAppended {
        /// Total events in the session so far.
        event_count: u64,
        /// Chain hash after the event.
        hash: ChainHash,
    },

    /// The pending buffer grew past the advisory cap.
    CheckpointCapExceeded {
        /// Pending events.
        pending: usize,
        /// Configured cap.
        cap: usize,
    },

    /// A checkpoint was sealed.
    CheckpointSealed {
        /// Checkpoint index.
        index: u64,
        /// Events in the checkpoint.
        events: usize,
        /// Chain hash at seal time.
        hash: ChainHash,
    },

    /// Chain state was cleared.
    ChainReset {
        /// Session that was active, if any.
        session_id: Option<String>,
    },

    /// A checkpoint replay finished.
    CheckpointVerified {
        /// Checkpoint index.
        index: u64,
        /// Whether the replayed hash matched.
        valid: bool,
    },

    /// A verification run passed.
    VerificationPassed {
        /// Checkpoints covered.
        checkpoints: usize,
        /// Events covered.
        events: usize,
    },

    /// A verification run failed.
    VerificationFailed {
        /// Human-readable reason.
        reason: String,
        /// Earliest failing index, if any.
        failed_at: Option<usize>,
    },

    /// A checkpoint hash was signed.
    CheckpointSigned {
        /// Chain length bound into the record.
        chain_length: u64,
        /// Short hex prefix of the signer's public key.
        signer: String,
    },

    /// A signed checkpoint failed verification.
    SignatureRejected {
        /// Why the record was rejected.
        reason: &'static str,
    },

    /// An encrypted key record was written.
    KeyPersisted {
        /// Store locator.
        locator: String,
    },

    /// A key record was removed.
    KeyDeleted {
        /// Store locator.
        locator: String,
    },

    /// Decrypting a key record failed.
    KeyDecryptionFailed,
}

/// A consumer of integrity events.
pub trait IntegrityEventSink: Send + Sync {
    /// Handle one event. Must not block the caller.
    fn emit(&self, event: IntegrityEvent);
}

/// Shared sink handle stored by every component.
pub type SharedSink = Arc<dyn IntegrityEventSink>;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl IntegrityEventSink for NullSink {
    #[inline(always)]
    fn emit(&self, _: IntegrityEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl IntegrityEventSink for TracingSink {
    fn emit(&self, event: IntegrityEvent) {
        match event {
            IntegrityEvent::ChainStarted { session_id, genesis } => {
                info!("Hash chain started for session {} (genesis {}...)", session_id, genesis.short());
            }
            IntegrityEvent::EventAppended { event_count, hash } => {
                debug!("Event #{} appended, chain hash {}...", event_count, hash.short());
            }
            IntegrityEvent::CheckpointCapExceeded { pending, cap } => {
                warn!("{} pending events exceed advisory cap of {}", pending, cap);
            }
            IntegrityEvent::CheckpointSealed { index, events, hash } => {
                info!("Checkpoint #{} sealed with {} events, hash {}...", index, events, hash.short());
            }
            IntegrityEvent::ChainReset { session_id } => {
                info!("Hash chain reset (session {:?})", session_id);
            }
            IntegrityEvent::CheckpointVerified { index, valid } => {
                debug!("Checkpoint #{} replay valid={}", index, valid);
            }
            IntegrityEvent::VerificationPassed { checkpoints, events } => {
                info!("Verification passed: {} checkpoints, {} events", checkpoints, events);
            }
            IntegrityEvent::VerificationFailed { reason, failed_at } => {
                warn!("Verification failed at {:?}: {}", failed_at, reason);
            }
            IntegrityEvent::CheckpointSigned { chain_length, signer } => {
                debug!("Signed checkpoint at chain length {} with key {}...", chain_length, signer);
            }
            IntegrityEvent::SignatureRejected { reason } => {
                warn!("Signed checkpoint rejected: {}", reason);
            }
            IntegrityEvent::KeyPersisted { locator } => {
                info!("Encrypted keypair saved to '{}'", locator);
            }
            IntegrityEvent::KeyDeleted { locator } => {
                info!("Keypair '{}' deleted", locator);
            }
            IntegrityEvent::KeyDecryptionFailed => {
                warn!("Keypair decryption failed");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<IntegrityEvent>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<IntegrityEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&IntegrityEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl IntegrityEventSink for RecordingSink {
    fn emit(&self, event: IntegrityEvent) {
        self.events.lock().push(event);
    }
}

/// Default sink used when none is injected.
pub fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}
