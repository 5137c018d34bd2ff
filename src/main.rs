//! Game Integrity Demo
//!
//! Records a short session, seals and signs its checkpoints, then verifies
//! it and shows that tampering and speed hacks are rejected.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use game_integrity::{
    chain::HashChain,
    core::{event::EventData, ManualClock},
    signing::{FileKeyStore, KeyCustodian, Signer, DEFAULT_LOCATOR},
    GameEvent, IntegrityConfig, Position, Verifier, VERSION,
};

/// Password used when `INTEGRITY_KEY_PASSWORD` is not set.
const DEMO_PASSWORD: &str = "demo-password-change-me";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Game Integrity v{}", VERSION);

    let config = IntegrityConfig::from_env();
    config.validate().context("invalid integrity configuration")?;
    info!(
        "Checkpoint interval: {} ms, max speed: {} units/ms",
        config.checkpoint_interval_ms, config.max_player_speed
    );

    demo_session(config)
}

/// Demo function to exercise recording, signing and verification.
fn demo_session(config: IntegrityConfig) -> Result<()> {
    info!("=== Starting Demo Session ===");

    let session_id = uuid::Uuid::new_v4().to_string();
    let clock = Arc::new(ManualClock::new(1_000));
    let mut chain = HashChain::with_clock(config.clone(), clock.clone());

    let genesis = chain.start_chain(&session_id)?;
    info!("Session: {}", session_id);
    info!("Genesis: {}", genesis.short());

    // Record player movement; the clock drives checkpoint sealing.
    for step in 0..20u64 {
        clock.advance(50);
        let now = 1_000 + (step + 1) * 50;
        let position = Position::new(step as f64 * 10.0, 0.0, step as f64 * 2.0);
        chain.add_event(GameEvent::movement(now, "player_alice", position))?;

        if step % 5 == 4 {
            chain.add_event(GameEvent::shoot(now, "player_alice", 0.25, -0.5))?;
            chain.add_event(GameEvent::reload(now, "player_alice"))?;
        }
        if step % 7 == 3 {
            chain.add_event(GameEvent::key_press(now, "player_alice", "W"))?;
        }
    }
    chain.force_checkpoint();

    let checkpoints = chain.checkpoints();
    info!(
        "Recorded {} events in {} checkpoints",
        chain.all_events().len(),
        checkpoints.len()
    );

    // Key custody
    let password = std::env::var("INTEGRITY_KEY_PASSWORD").unwrap_or_else(|_| DEMO_PASSWORD.to_string());
    let key_dir = std::env::temp_dir().join("game-integrity-demo");
    let custodian = KeyCustodian::new(FileKeyStore::new(&key_dir)?);

    let keypair = custodian.generate_keypair();
    custodian.save(&keypair, &password, DEFAULT_LOCATOR)?;
    let keypair = custodian.load(&password, DEFAULT_LOCATOR)?;
    info!("Signing key: {}...", &keypair.public_key_hex()[..16]);

    // Sign every checkpoint
    let signer = Signer::new();
    let mut chain_length = 0u64;
    let mut signed = Vec::with_capacity(checkpoints.len());
    for checkpoint in &checkpoints {
        chain_length += checkpoint.event_count() as u64;
        signed.push(signer.sign_checkpoint(checkpoint, &keypair, chain_length)?);
    }

    let batch = signer.verify_batch(&signed);
    info!("Signatures valid: {}", batch.all_valid);

    // Verify the recorded session
    let verifier = Verifier::new(&config);
    let result = verifier.full_verification(&checkpoints, &session_id);
    info!("Verification: {}", result.message);
    if !result.valid {
        bail!("honest session failed verification: {}", result.message);
    }

    // Tamper with a recorded event
    let mut tampered = checkpoints.clone();
    if let Some(event) = tampered.first_mut().and_then(|cp| cp.events.first_mut()) {
        *event = event.with_data(EventData::Move {
            position: Position::new(9_999.0, 0.0, 0.0),
        });
    }
    let result = verifier.verify_chain(&tampered, &session_id);
    warn!(
        "Tampered session: valid={} at checkpoint {:?}: {}",
        result.valid, result.failed_at_event, result.message
    );

    // A hash-valid session that moves too fast
    let mut cheat = HashChain::with_clock(config, clock.clone());
    cheat.start_chain("speed-hack")?;
    cheat.add_event(GameEvent::movement(0, "player_mallory", Position::ZERO))?;
    cheat.add_event(GameEvent::movement(1, "player_mallory", Position::new(100.0, 0.0, 0.0)))?;
    cheat.force_checkpoint();

    let result = verifier.full_verification(&cheat.checkpoints(), "speed-hack");
    warn!(
        "Speed hack session: valid={} at event {:?}: {}",
        result.valid, result.failed_at_event, result.message
    );

    custodian.delete(DEFAULT_LOCATOR)?;
    info!("=== Demo Complete ===");

    Ok(())
}
