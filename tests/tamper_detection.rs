//! # Tamper Detection Tests
//!
//! End-to-end checks across recording, signing and verification:
//!
//! 1. **Determinism**: identical sessions hash identically
//! 2. **Tamper sensitivity**: any single-field change is caught at its checkpoint
//! 3. **Signing**: signatures survive storage and reject forgery
//!
//! Run with: cargo test --test tamper_detection

use std::sync::Arc;

use game_integrity::{
    chain::HashChain,
    core::{event::EventData, fold_events, genesis_hash},
    signing::{KeyCustodian, MemoryKeyStore},
    Checkpoint, GameEvent, IntegrityConfig, KeyError, ManualClock, NullSink, Position, SignedCheckpoint,
    Signer, VerificationError, Verifier,
};
use proptest::prelude::*;

const PLAYERS: [&str; 3] = ["alice", "bob", "carol"];

fn verifier() -> Verifier {
    Verifier::default().with_sink(Arc::new(NullSink))
}

/// Record `events`, sealing a checkpoint every `per_checkpoint` events.
fn record(session_id: &str, events: &[GameEvent], per_checkpoint: usize) -> Vec<Checkpoint> {
    let clock = Arc::new(ManualClock::new(0));
    let mut chain = HashChain::with_clock(IntegrityConfig::default(), clock).with_sink(Arc::new(NullSink));
    chain.start_chain(session_id).unwrap();

    for (i, event) in events.iter().enumerate() {
        chain.add_event(event.clone()).unwrap();
        if (i + 1) % per_checkpoint == 0 {
            chain.finalize_checkpoint().unwrap();
        }
    }
    chain.force_checkpoint();
    chain.checkpoints()
}

/// Locate the checkpoint holding the `n`th event overall.
fn checkpoint_of(checkpoints: &[Checkpoint], mut n: usize) -> (usize, usize) {
    for (i, cp) in checkpoints.iter().enumerate() {
        if n < cp.events.len() {
            return (i, n);
        }
        n -= cp.events.len();
    }
    panic!("event index out of range");
}

/// Chronologically ordered gameplay from three players.
///
/// Everyone walks along x at a quarter unit per millisecond, half the
/// default speed limit.
fn session_strategy() -> impl Strategy<Value = Vec<GameEvent>> {
    prop::collection::vec((1u64..1_000, -50i32..50, 0usize..PLAYERS.len(), any::<bool>()), 1..40).prop_map(
        |steps| {
            let mut now = 10_000u64;
            steps
                .into_iter()
                .map(|(delta, aim, player, shoot)| {
                    now += delta;
                    if shoot {
                        GameEvent::shoot(now, PLAYERS[player], aim as f64, 0.0)
                    } else {
                        GameEvent::movement(now, PLAYERS[player], Position::new(now as f64 * 0.25, 0.0, 0.0))
                    }
                })
                .collect()
        },
    )
}

#[derive(Clone, Copy, Debug)]
enum Tamper {
    Timestamp,
    Player,
    Payload,
}

fn tamper(event: &GameEvent, how: Tamper) -> GameEvent {
    match how {
        Tamper::Timestamp => event.with_timestamp(event.timestamp() + 1),
        Tamper::Player => event.with_player_id(format!("{}_", event.player_id())),
        Tamper::Payload => match event.data() {
            EventData::Move { position } => event.with_data(EventData::Move {
                position: Position::new(position.x + 1.0, position.y, position.z),
            }),
            _ => event.with_data(EventData::Reload),
        },
    }
}

// ============================================================================
// DETERMINISM
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn identical_sessions_hash_identically(events in session_strategy(), per in 1usize..8) {
        let a = record("determinism", &events, per);
        let b = record("determinism", &events, per);
        prop_assert_eq!(&a, &b);

        let last = a.last().unwrap().hash;
        prop_assert_eq!(last, fold_events(genesis_hash("determinism"), events.iter()));
    }

    #[test]
    fn checkpoint_boundaries_do_not_change_final_hash(events in session_strategy(), p in 1usize..8, q in 1usize..8) {
        let a = record("boundaries", &events, p);
        let b = record("boundaries", &events, q);
        prop_assert_eq!(a.last().unwrap().hash, b.last().unwrap().hash);
    }

    #[test]
    fn honest_sessions_pass_full_verification(events in session_strategy(), per in 1usize..8) {
        let checkpoints = record("honest", &events, per);
        let result = verifier().full_verification(&checkpoints, "honest");
        prop_assert!(result.valid, "{}", result.message);
        prop_assert_eq!(result.events_verified, events.len());
    }
}

// ============================================================================
// TAMPER SENSITIVITY
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn single_field_tamper_is_caught_at_its_checkpoint(
        events in session_strategy(),
        per in 1usize..8,
        target in any::<prop::sample::Index>(),
        how in prop_oneof![Just(Tamper::Timestamp), Just(Tamper::Player), Just(Tamper::Payload)],
    ) {
        let mut checkpoints = record("tamper", &events, per);
        let (cp, ev) = checkpoint_of(&checkpoints, target.index(events.len()));

        let altered = tamper(&checkpoints[cp].events[ev], how);
        prop_assume!(altered != checkpoints[cp].events[ev]);
        checkpoints[cp].events[ev] = altered;

        let result = verifier().verify_chain(&checkpoints, "tamper");
        prop_assert!(!result.valid);
        prop_assert_eq!(result.failed_at_event, Some(cp));
        prop_assert_eq!(result.error, Some(VerificationError::HashMismatch { index: cp as u64 }));
    }

    #[test]
    fn dropped_event_is_caught(events in session_strategy(), per in 1usize..8, target in any::<prop::sample::Index>()) {
        let mut checkpoints = record("drop", &events, per);
        let (cp, ev) = checkpoint_of(&checkpoints, target.index(events.len()));
        checkpoints[cp].events.remove(ev);

        let result = verifier().verify_chain(&checkpoints, "drop");
        prop_assert!(!result.valid);
        prop_assert_eq!(result.failed_at_event, Some(cp));
    }
}

#[test]
fn recorded_session_survives_json_storage() {
    let events: Vec<GameEvent> = (0..12)
        .map(|i| GameEvent::movement(i * 100, "alice", Position::new(i as f64, 1.0, -2.0)))
        .collect();
    let checkpoints = record("stored", &events, 5);

    let stored: Vec<String> = checkpoints.iter().map(Checkpoint::to_json).collect();
    let loaded: Vec<Checkpoint> = stored.iter().map(|json| Checkpoint::from_json(json).unwrap()).collect();

    assert_eq!(loaded, checkpoints);
    assert!(verifier().full_verification(&loaded, "stored").valid);
}

#[test]
fn session_replayed_under_another_id_fails() {
    let events = vec![GameEvent::reload(1, "alice"), GameEvent::reload(2, "alice")];
    let checkpoints = record("s1", &events, 1);

    let result = verifier().verify_chain(&checkpoints, "s2");
    assert_eq!(result.error, Some(VerificationError::GenesisMismatch));
}

// ============================================================================
// SIGNING
// ============================================================================

fn signed_session(password: &str) -> (Vec<Checkpoint>, Vec<SignedCheckpoint>, String) {
    let custodian = KeyCustodian::new(MemoryKeyStore::new()).with_sink(Arc::new(NullSink));
    let keypair = custodian.generate_keypair();
    custodian.save(&keypair, password, "player_key").unwrap();
    let keypair = custodian.load(password, "player_key").unwrap();

    let events: Vec<GameEvent> = (0..9)
        .map(|i| GameEvent::key_press(i * 10, "alice", "W"))
        .collect();
    let checkpoints = record("signed", &events, 3);

    let signer = Signer::with_clock(Arc::new(ManualClock::new(42))).with_sink(Arc::new(NullSink));
    let mut length = 0u64;
    let signed = checkpoints
        .iter()
        .map(|cp| {
            length += cp.event_count() as u64;
            signer.sign_checkpoint(cp, &keypair, length).unwrap()
        })
        .collect();

    (checkpoints, signed, keypair.public_key_hex())
}

#[test]
fn stored_key_signs_verifiable_checkpoints() {
    let (checkpoints, signed, public_key) = signed_session("correct horse battery");
    let signer = Signer::new().with_sink(Arc::new(NullSink));

    let batch = signer.verify_batch(&signed);
    assert!(batch.all_valid);
    assert_eq!(batch.results.len(), checkpoints.len());

    for (cp, record) in checkpoints.iter().zip(&signed) {
        assert_eq!(record.checkpoint_hash, cp.hash.to_hex());
        assert!(signer.verify_against_known_key(record, &public_key.to_uppercase()));
    }
    assert_eq!(signed.last().unwrap().chain_length, 9);
}

#[test]
fn forged_records_are_isolated_in_batch() {
    let (_, mut signed, _) = signed_session("correct horse battery");
    let signer = Signer::new().with_sink(Arc::new(NullSink));

    // Point record 1 at record 2's hash while keeping its signature.
    signed[1].checkpoint_hash = signed[2].checkpoint_hash.clone();

    let batch = signer.verify_batch(&signed);
    assert!(!batch.all_valid);
    assert_eq!(batch.failed_indices(), vec![1]);
}

#[test]
fn wrong_password_cannot_open_key() {
    let custodian = KeyCustodian::new(MemoryKeyStore::new()).with_sink(Arc::new(NullSink));
    let keypair = custodian.generate_keypair();
    custodian.save(&keypair, "correct horse battery", "k").unwrap();

    assert!(matches!(
        custodian.load("incorrect horse battery", "k"),
        Err(KeyError::DecryptionFailed)
    ));
    assert_eq!(custodian.load("correct horse battery", "k").unwrap(), keypair);
}
