//! Checkpoint Signatures
//!
//! Binds a checkpoint hash to an Ed25519 identity. The signed message is the
//! 32 raw hash bytes, not their hex text. A [`SignedCheckpoint`] is
//! self-contained: hash, signature and public key travel together.

use std::sync::Arc;

use ed25519_dalek::{Signature, Signer as _, VerifyingKey, PUBLIC_KEY_LENGTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::{default_sink, IntegrityEvent, SharedSink};
use crate::chain::checkpoint::Checkpoint;
use crate::core::clock::{Clock, SystemClock};
use crate::core::hash::{ChainHash, HASH_HEX_LEN};
use crate::signing::keys::Keypair;

/// Portable signed checkpoint record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCheckpoint {
    /// hex(checkpoint hash), 64 characters.
    pub checkpoint_hash: String,
    /// hex(Ed25519 signature), 128 characters.
    pub signature: String,
    /// hex(Ed25519 public key), 64 characters.
    pub public_key: String,
    /// Signing time (Unix ms).
    pub timestamp: u64,
    /// Chain length at signing time.
    pub chain_length: u64,
}

impl SignedCheckpoint {
    /// Serialize to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("signed checkpoint serialization should not fail")
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Decoded public key bytes, if well formed.
    pub fn public_key_bytes(&self) -> Option<[u8; PUBLIC_KEY_LENGTH]> {
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        hex::decode_to_slice(&self.public_key, &mut bytes).ok()?;
        Some(bytes)
    }
}

/// Signing misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    /// Hash is not 64 hex characters.
    #[error("invalid checkpoint hash - must be {HASH_HEX_LEN} hex characters")]
    InvalidHash,
    /// Keypair is missing a key or its halves do not match.
    #[error("invalid keypair")]
    InvalidKeypair,
}

/// Outcome for one item of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchItemResult {
    /// Position in the input.
    pub index: usize,
    /// Whether the signature verified.
    pub valid: bool,
}

/// Outcome of [`Signer::verify_batch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchVerification {
    /// True when every item verified (vacuously true for an empty batch).
    pub all_valid: bool,
    /// Per-item outcomes in input order.
    pub results: Vec<BatchItemResult>,
}

impl BatchVerification {
    /// Indices that failed.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.results
            .iter()
            .filter(|r| !r.valid)
            .map(|r| r.index)
            .collect()
    }
}

/// Creates and checks signed checkpoints.
pub struct Signer {
    clock: Arc<dyn Clock>,
    sink: SharedSink,
}

impl Default for Signer {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer {
    /// Signer timestamping with the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Signer timestamping with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sink: default_sink(),
        }
    }

    /// Replace the audit sink.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Sign a hex checkpoint hash.
    pub fn sign(
        &self,
        checkpoint_hash: &str,
        keypair: &Keypair,
        chain_length: u64,
    ) -> Result<SignedCheckpoint, SignError> {
        let hash = ChainHash::from_hex(checkpoint_hash).map_err(|_| SignError::InvalidHash)?;

        if keypair.private_key.is_empty() || keypair.public_key.is_empty() {
            return Err(SignError::InvalidKeypair);
        }
        let signing_key = keypair.signing_key().ok_or(SignError::InvalidKeypair)?;

        let signature = signing_key.sign(hash.as_bytes());
        let public_key = keypair.public_key_hex();

        self.sink.emit(IntegrityEvent::CheckpointSigned {
            chain_length,
            signer: public_key[..16].to_string(),
        });

        Ok(SignedCheckpoint {
            checkpoint_hash: hash.to_hex(),
            signature: hex::encode(signature.to_bytes()),
            public_key,
            timestamp: self.clock.now_millis(),
            chain_length,
        })
    }

    /// Sign a sealed checkpoint's hash.
    pub fn sign_checkpoint(
        &self,
        checkpoint: &Checkpoint,
        keypair: &Keypair,
        chain_length: u64,
    ) -> Result<SignedCheckpoint, SignError> {
        self.sign(&checkpoint.hash.to_hex(), keypair, chain_length)
    }

    /// Check a signed checkpoint. Never fails; any defect yields `false`.
    pub fn verify(&self, signed: &SignedCheckpoint) -> bool {
        match check_signature(signed) {
            Ok(()) => true,
            Err(reason) => {
                self.sink.emit(IntegrityEvent::SignatureRejected { reason });
                false
            }
        }
    }

    /// Check every record independently, preserving order.
    pub fn verify_batch(&self, signed: &[SignedCheckpoint]) -> BatchVerification {
        let results: Vec<BatchItemResult> = signed
            .iter()
            .enumerate()
            .map(|(index, record)| BatchItemResult {
                index,
                valid: self.verify(record),
            })
            .collect();

        BatchVerification {
            all_valid: results.iter().all(|r| r.valid),
            results,
        }
    }

    /// Verify and require the record to carry `expected_public_key_hex`.
    pub fn verify_against_known_key(&self, signed: &SignedCheckpoint, expected_public_key_hex: &str) -> bool {
        if !signed.public_key.eq_ignore_ascii_case(expected_public_key_hex) {
            self.sink.emit(IntegrityEvent::SignatureRejected {
                reason: "unexpected signer",
            });
            return false;
        }
        self.verify(signed)
    }
}

/// Decode and verify, naming the first defect.
fn check_signature(signed: &SignedCheckpoint) -> Result<(), &'static str> {
    let hash = ChainHash::from_hex(&signed.checkpoint_hash).map_err(|_| "malformed checkpoint hash")?;
    let public = signed.public_key_bytes().ok_or("malformed public key")?;
    let verifying_key = VerifyingKey::from_bytes(&public).map_err(|_| "invalid public key")?;

    let signature_bytes = hex::decode(&signed.signature).map_err(|_| "malformed signature")?;
    let signature = Signature::from_slice(&signature_bytes).map_err(|_| "malformed signature")?;

    verifying_key
        .verify_strict(hash.as_bytes(), &signature)
        .map_err(|_| "signature mismatch")
}

// =============================================================================
// TESTS
// =============================================================================
