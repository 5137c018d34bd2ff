//! Session Hash Chain
//!
//! Accepts events in arrival order, folds each into the running chain hash,
//! and seals the pending buffer into a [`Checkpoint`] whenever the checkpoint
//! interval has elapsed.
//!
//! ## States
//!
//! ```text
//!   Uninitialized ──start_chain──▶ Active ──reset──▶ Uninitialized
//!                                   │  ▲
//!                                   └──┘ add_event / finalize_checkpoint
//! ```
//!
//! Sealing is sampled on `add_event`: a burst of events inside one interval
//! lands in one checkpoint, and an idle interval never produces an empty one.

use std::sync::Arc;

use thiserror::Error;

use crate::audit::{default_sink, IntegrityEvent, SharedSink};
use crate::chain::checkpoint::Checkpoint;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::IntegrityConfig;
use crate::core::event::GameEvent;
use crate::core::hash::{chain_hash, genesis_hash, ChainHash};

/// Misuse of the chain state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// No session is active.
    #[error("chain not started; call start_chain first")]
    NotStarted,
    /// A session is already active on this chain.
    #[error("chain already active for session '{0}'; reset before starting another")]
    AlreadyActive(String),
    /// Nothing to seal.
    #[error("no pending events to checkpoint")]
    EmptyBuffer,
    /// Event carries NaN or an infinity, which has no canonical encoding.
    #[error("event at {timestamp} ms carries a non-finite value")]
    NonFiniteEvent {
        /// Timestamp of the rejected event.
        timestamp: u64,
    },
}

/// Live state of one session.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainState {
    /// Session identifier.
    pub session_id: String,
    /// Hash after the latest event.
    pub current_hash: ChainHash,
    /// Events folded so far.
    pub event_count: u64,
    /// Index the next checkpoint will get.
    pub checkpoint_index: u64,
    /// Session start (Unix ms).
    pub start_time: u64,
    /// Events not yet sealed, in arrival order.
    pub pending_events: Vec<GameEvent>,
}

/// Point-in-time summary of a chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainStats {
    /// Session identifier.
    pub session_id: String,
    /// Events folded so far.
    pub total_events: u64,
    /// Checkpoints sealed.
    pub checkpoints_created: usize,
    /// Events waiting in the buffer.
    pub pending_events: usize,
    /// Hash after the latest event.
    pub current_hash: ChainHash,
    /// Milliseconds since the session started.
    pub uptime_ms: u64,
}

/// Hash chain for a single session.
pub struct HashChain {
    config: IntegrityConfig,
    clock: Arc<dyn Clock>,
    sink: SharedSink,
    state: Option<ChainState>,
    checkpoints: Vec<Checkpoint>,
    last_checkpoint_time: u64,
}

impl HashChain {
    /// Create a chain on the system clock, logging through `tracing`.
    pub fn new(config: IntegrityConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a chain reading time from `clock`.
    pub fn with_clock(config: IntegrityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            sink: default_sink(),
            state: None,
            checkpoints: Vec::new(),
            last_checkpoint_time: 0,
        }
    }

    /// Replace the audit sink.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    /// Whether a session is active.
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Active session id.
    pub fn session_id(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.session_id.as_str())
    }

    /// Live state, if a session is active.
    pub fn state(&self) -> Option<&ChainState> {
        self.state.as_ref()
    }

    /// Start a session and return its genesis hash.
    pub fn start_chain(&mut self, session_id: &str) -> Result<ChainHash, ChainError> {
        if let Some(state) = &self.state {
            return Err(ChainError::AlreadyActive(state.session_id.clone()));
        }

        let genesis = genesis_hash(session_id);
        let now = self.clock.now_millis();

        self.state = Some(ChainState {
            session_id: session_id.to_string(),
            current_hash: genesis,
            event_count: 0,
            checkpoint_index: 0,
            start_time: now,
            pending_events: Vec::new(),
        });
        self.checkpoints.clear();
        self.last_checkpoint_time = now;

        self.sink.emit(IntegrityEvent::ChainStarted {
            session_id: session_id.to_string(),
            genesis,
        });

        Ok(genesis)
    }

    /// Fold `event` into the chain and return the new hash.
    ///
    /// Seals a checkpoint as a side effect when the interval has elapsed.
    pub fn add_event(&mut self, event: GameEvent) -> Result<ChainHash, ChainError> {
        let state = self.state.as_mut().ok_or(ChainError::NotStarted)?;

        if !event.is_finite() {
            return Err(ChainError::NonFiniteEvent {
                timestamp: event.timestamp(),
            });
        }

        let new_hash = chain_hash(&state.current_hash, &event);
        state.current_hash = new_hash;
        state.event_count += 1;
        state.pending_events.push(event);

        let event_count = state.event_count;
        let pending = state.pending_events.len();

        self.sink.emit(IntegrityEvent::EventAppended {
            event_count,
            hash: new_hash,
        });

        let cap = self.config.max_events_per_checkpoint;
        if cap.checked_add(1) == Some(pending) {
            self.sink.emit(IntegrityEvent::CheckpointCapExceeded { pending, cap });
        }

        if self.checkpoint_due() {
            self.finalize_checkpoint()?;
        }

        Ok(new_hash)
    }

    /// Interval elapsed and something to seal.
    fn checkpoint_due(&self) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let elapsed = self.clock.now_millis().saturating_sub(self.last_checkpoint_time);
        elapsed >= self.config.checkpoint_interval_ms && !state.pending_events.is_empty()
    }

    /// Hash after the latest event.
    pub fn current_hash(&self) -> Result<ChainHash, ChainError> {
        self.state
            .as_ref()
            .map(|s| s.current_hash)
            .ok_or(ChainError::NotStarted)
    }

    /// Seal the pending buffer into a checkpoint.
    pub fn finalize_checkpoint(&mut self) -> Result<Checkpoint, ChainError> {
        let state = self.state.as_mut().ok_or(ChainError::NotStarted)?;

        if state.pending_events.is_empty() {
            return Err(ChainError::EmptyBuffer);
        }

        let previous_hash = match self.checkpoints.last() {
            Some(last) => last.hash,
            None => genesis_hash(&state.session_id),
        };

        let now = self.clock.now_millis();
        let checkpoint = Checkpoint {
            index: state.checkpoint_index,
            events: std::mem::take(&mut state.pending_events),
            hash: state.current_hash,
            previous_hash,
            timestamp: now,
            session_id: state.session_id.clone(),
        };

        state.checkpoint_index += 1;
        self.last_checkpoint_time = now;
        self.checkpoints.push(checkpoint.clone());

        self.sink.emit(IntegrityEvent::CheckpointSealed {
            index: checkpoint.index,
            events: checkpoint.events.len(),
            hash: checkpoint.hash,
        });

        Ok(checkpoint)
    }

    /// Seal if anything is pending; never fails.
    pub fn force_checkpoint(&mut self) -> Option<Checkpoint> {
        match &self.state {
            Some(state) if !state.pending_events.is_empty() => self.finalize_checkpoint().ok(),
            _ => None,
        }
    }

    /// Snapshot of sealed checkpoints.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints.clone()
    }

    /// Number of sealed checkpoints.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Every event in chain order: sealed first, then pending.
    pub fn all_events(&self) -> Vec<GameEvent> {
        let mut events: Vec<GameEvent> = self
            .checkpoints
            .iter()
            .flat_map(|cp| cp.events.iter().cloned())
            .collect();

        if let Some(state) = &self.state {
            events.extend(state.pending_events.iter().cloned());
        }

        events
    }

    /// Summary of the active session.
    pub fn stats(&self) -> Option<ChainStats> {
        let state = self.state.as_ref()?;
        Some(ChainStats {
            session_id: state.session_id.clone(),
            total_events: state.event_count,
            checkpoints_created: self.checkpoints.len(),
            pending_events: state.pending_events.len(),
            current_hash: state.current_hash,
            uptime_ms: self.clock.now_millis().saturating_sub(state.start_time),
        })
    }

    /// Drop all state and return to uninitialized.
    pub fn reset(&mut self) {
        let session_id = self.state.take().map(|s| s.session_id);
        self.checkpoints.clear();
        self.last_checkpoint_time = 0;

        self.sink.emit(IntegrityEvent::ChainReset { session_id });
    }
}

impl std::fmt::Debug for HashChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashChain")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("checkpoints", &self.checkpoints.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
