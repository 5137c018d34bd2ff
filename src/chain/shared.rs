//! Shared Chain Handle
//!
//! Several producers can feed one session through a [`SharedHashChain`].
//! Every mutation takes the same lock, so events are folded in exactly the
//! order the lock was acquired and that order is what the checkpoint records.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::chain::checkpoint::Checkpoint;
use crate::chain::hash_chain::{ChainError, ChainStats, HashChain};
use crate::core::event::GameEvent;
use crate::core::hash::ChainHash;

/// Cloneable single-writer handle around a [`HashChain`].
#[derive(Clone)]
pub struct SharedHashChain {
    inner: Arc<Mutex<HashChain>>,
}

impl SharedHashChain {
    /// Wrap a chain.
    pub fn new(chain: HashChain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    /// See [`HashChain::start_chain`].
    pub fn start_chain(&self, session_id: &str) -> Result<ChainHash, ChainError> {
        self.inner.lock().start_chain(session_id)
    }

    /// See [`HashChain::add_event`].
    pub fn add_event(&self, event: GameEvent) -> Result<ChainHash, ChainError> {
        self.inner.lock().add_event(event)
    }

    /// See [`HashChain::finalize_checkpoint`].
    pub fn finalize_checkpoint(&self) -> Result<Checkpoint, ChainError> {
        self.inner.lock().finalize_checkpoint()
    }

    /// See [`HashChain::force_checkpoint`].
    pub fn force_checkpoint(&self) -> Option<Checkpoint> {
        self.inner.lock().force_checkpoint()
    }

    /// See [`HashChain::current_hash`].
    pub fn current_hash(&self) -> Result<ChainHash, ChainError> {
        self.inner.lock().current_hash()
    }

    /// See [`HashChain::checkpoints`].
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.inner.lock().checkpoints()
    }

    /// See [`HashChain::all_events`].
    pub fn all_events(&self) -> Vec<GameEvent> {
        self.inner.lock().all_events()
    }

    /// See [`HashChain::stats`].
    pub fn stats(&self) -> Option<ChainStats> {
        self.inner.lock().stats()
    }

    /// See [`HashChain::reset`].
    pub fn reset(&self) {
        self.inner.lock().reset()
    }

    /// Run `f` with exclusive access to the chain.
    pub fn with_chain<R>(&self, f: impl FnOnce(&mut HashChain) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullSink;
    use crate::core::clock::ManualClock;
    use crate::core::config::IntegrityConfig;
    use crate::core::hash::{fold_events, genesis_hash};
    use std::thread;

    #[test]
    fn test_concurrent_producers_keep_a_total_order() {
        let clock = Arc::new(ManualClock::new(0));
        let chain = HashChain::with_clock(IntegrityConfig::default(), clock)
            .with_sink(Arc::new(NullSink));
        let shared = SharedHashChain::new(chain);
        shared.start_chain("shared").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|p| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25u64 {
                        shared
                            .add_event(GameEvent::key_press(i, format!("player_{}", p), "W"))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let events = shared.all_events();
        assert_eq!(events.len(), 100);

        // The chain hash is the fold of exactly the recorded order.
        assert_eq!(
            shared.current_hash().unwrap(),
            fold_events(genesis_hash("shared"), &events)
        );

        let checkpoint = shared.finalize_checkpoint().unwrap();
        assert_eq!(checkpoint.events, events);
        assert!(shared.force_checkpoint().is_none());
    }

    #[test]
    fn test_with_chain_gives_exclusive_access() {
        let shared = SharedHashChain::new(
            HashChain::with_clock(IntegrityConfig::default(), Arc::new(ManualClock::new(0)))
                .with_sink(Arc::new(NullSink)),
        );
        shared.start_chain("s").unwrap();

        let active = shared.with_chain(|chain| chain.is_active());
        assert!(active);

        shared.reset();
        assert!(shared.stats().is_none());
    }
}
