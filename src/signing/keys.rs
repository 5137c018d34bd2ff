//! Key Custody
//!
//! Ed25519 keypair lifecycle: generation, password-protected persistence and
//! retrieval.
//!
//! ## Record Format
//!
//! ```text
//! key      = PBKDF2-HMAC-SHA256(password, salt[32], iterations) -> 32 bytes
//! sealed   = AES-256-GCM(key, iv[12], private_seed)             -> ciphertext || tag[16]
//! record   = { encryptedPrivateKey, publicKey, salt, iv, kdf, iterations }  (hex fields)
//! ```
//!
//! Any failure while opening a record is reported as
//! [`KeyError::DecryptionFailed`]; a wrong password and a corrupted record are
//! indistinguishable to the caller.

use std::fmt;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::audit::{default_sink, IntegrityEvent, SharedSink};
use crate::signing::store::{KeyStore, StoreError};

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// PBKDF2 iteration count for new records, and the minimum accepted on load.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Highest PBKDF2 iteration count accepted on load.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// KDF identifier written into records.
pub const KDF_NAME: &str = "pbkdf2-sha256";

/// Salt length (bytes).
pub const SALT_LEN: usize = 32;

/// AES-GCM nonce length (bytes).
pub const NONCE_LEN: usize = 12;

/// Derived key length (bytes).
pub const KEY_LEN: usize = 32;

/// Default locator used by the demo and by callers that keep one identity.
pub const DEFAULT_LOCATOR: &str = "game_keypair";

/// Raw Ed25519 key material.
///
/// `private_key` is the 32-byte seed. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    /// 32-byte public key.
    pub public_key: Vec<u8>,
    /// 32-byte private seed.
    pub private_key: Vec<u8>,
}

impl Keypair {
    /// Build from a dalek signing key.
    pub fn from_signing_key(signing_key: &SigningKey) -> Self {
        Self {
            public_key: signing_key.verifying_key().to_bytes().to_vec(),
            private_key: signing_key.to_bytes().to_vec(),
        }
    }

    /// Dalek signing key, if the material is well formed and consistent.
    pub fn signing_key(&self) -> Option<SigningKey> {
        let seed: [u8; SECRET_KEY_LENGTH] = self.private_key.as_slice().try_into().ok()?;
        let public: [u8; PUBLIC_KEY_LENGTH] = self.public_key.as_slice().try_into().ok()?;

        let signing_key = SigningKey::from_bytes(&seed);
        (signing_key.verifying_key().to_bytes() == public).then_some(signing_key)
    }

    /// Dalek verifying key, if the public half is well formed.
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        let public: [u8; PUBLIC_KEY_LENGTH] = self.public_key.as_slice().try_into().ok()?;
        VerifyingKey::from_bytes(&public).ok()
    }

    /// Hex-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn default_kdf() -> String {
    KDF_NAME.to_string()
}

fn default_iterations() -> u32 {
    PBKDF2_ITERATIONS
}

/// Persisted, password-encrypted keypair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKeyRecord {
    /// hex(ciphertext || auth tag).
    pub encrypted_private_key: String,
    /// hex(public key).
    pub public_key: String,
    /// hex(KDF salt).
    pub salt: String,
    /// hex(AES-GCM nonce).
    pub iv: String,
    /// KDF identifier.
    #[serde(default = "default_kdf")]
    pub kdf: String,
    /// KDF iteration count.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl EncryptedKeyRecord {
    /// Serialize to pretty JSON bytes.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).expect("key record serialization should not fail")
    }

    /// Parse from JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        serde_json::from_slice(bytes).map_err(|e| KeyError::MalformedRecord(e.to_string()))
    }
}

/// Key custody errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Password shorter than [`MIN_PASSWORD_LEN`].
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Required length.
        min: usize,
    },
    /// Wrong password or corrupted record.
    #[error("decryption failed - incorrect password or corrupted key record")]
    DecryptionFailed,
    /// Stored bytes are not a key record.
    #[error("malformed key record: {0}")]
    MalformedRecord(String),
    /// Keypair material is not a valid Ed25519 keypair.
    #[error("invalid keypair")]
    InvalidKeypair,
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Derive the symmetric key from a password.
fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Keypair generation and custody over a [`KeyStore`].
pub struct KeyCustodian<S: KeyStore> {
    store: S,
    sink: SharedSink,
}

impl<S: KeyStore> KeyCustodian<S> {
    /// Create a custodian over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            sink: default_sink(),
        }
    }

    /// Replace the audit sink.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fresh keypair from the OS CSPRNG.
    pub fn generate_keypair(&self) -> Keypair {
        Keypair::from_signing_key(&SigningKey::generate(&mut OsRng))
    }

    /// Encrypt `keypair` under `password`.
    pub fn persist(&self, keypair: &Keypair, password: &str) -> Result<EncryptedKeyRecord, KeyError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(KeyError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        if keypair.signing_key().is_none() {
            return Err(KeyError::InvalidKeypair);
        }

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let key = derive_key(password, &salt, PBKDF2_ITERATIONS);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

        // Output is ciphertext || tag
        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), keypair.private_key.as_slice())
            .map_err(|_| KeyError::InvalidKeypair)?;

        Ok(EncryptedKeyRecord {
            encrypted_private_key: hex::encode(sealed),
            public_key: keypair.public_key_hex(),
            salt: hex::encode(salt),
            iv: hex::encode(iv),
            kdf: KDF_NAME.to_string(),
            iterations: PBKDF2_ITERATIONS,
        })
    }

    /// Decrypt `record` with `password`.
    pub fn retrieve(&self, password: &str, record: &EncryptedKeyRecord) -> Result<Keypair, KeyError> {
        let keypair = open_record(password, record);
        if keypair.is_none() {
            self.sink.emit(IntegrityEvent::KeyDecryptionFailed);
        }
        keypair.ok_or(KeyError::DecryptionFailed)
    }

    /// Encrypt `keypair` and write it under `locator`.
    pub fn save(&self, keypair: &Keypair, password: &str, locator: &str) -> Result<EncryptedKeyRecord, KeyError> {
        let record = self.persist(keypair, password)?;
        self.store.save(locator, &record.to_json_bytes())?;

        self.sink.emit(IntegrityEvent::KeyPersisted {
            locator: locator.to_string(),
        });

        Ok(record)
    }

    /// Read the record under `locator` and decrypt it.
    pub fn load(&self, password: &str, locator: &str) -> Result<Keypair, KeyError> {
        let bytes = self.store.load(locator)?;
        let record = EncryptedKeyRecord::from_json_bytes(&bytes)?;
        self.retrieve(password, &record)
    }

    /// Whether a record exists under `locator`.
    pub fn exists(&self, locator: &str) -> Result<bool, KeyError> {
        Ok(self.store.exists(locator)?)
    }

    /// Remove the record under `locator`.
    pub fn delete(&self, locator: &str) -> Result<(), KeyError> {
        self.store.delete(locator)?;
        self.sink.emit(IntegrityEvent::KeyDeleted {
            locator: locator.to_string(),
        });
        Ok(())
    }
}

impl<S: KeyStore> KeyCustodian<Arc<S>> {
    /// Custodian over a shared store handle.
    pub fn shared(store: Arc<S>) -> Self {
        Self::new(store)
    }
}

/// Every way a record can fail to open collapses into `None`.
fn open_record(password: &str, record: &EncryptedKeyRecord) -> Option<Keypair> {
    if record.kdf != KDF_NAME || !(PBKDF2_ITERATIONS..=MAX_PBKDF2_ITERATIONS).contains(&record.iterations) {
        return None;
    }

    let salt = hex::decode(&record.salt).ok()?;
    let iv = hex::decode(&record.iv).ok()?;
    let sealed = hex::decode(&record.encrypted_private_key).ok()?;
    let public_key = hex::decode(&record.public_key).ok()?;

    if salt.is_empty() || iv.len() != NONCE_LEN {
        return None;
    }

    let key = derive_key(password, &salt, record.iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let private_key = cipher.decrypt(Nonce::from_slice(&iv), sealed.as_slice()).ok()?;

    let keypair = Keypair {
        public_key,
        private_key,
    };

    // Seed must reproduce the stored public key.
    keypair.signing_key().map(|_| keypair)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{NullSink, RecordingSink};
    use crate::signing::store::{FileKeyStore, MemoryKeyStore};
    use tempfile::TempDir;

    const PASSWORD: &str = "correct horse battery";

    fn custodian() -> KeyCustodian<MemoryKeyStore> {
        KeyCustodian::new(MemoryKeyStore::new()).with_sink(Arc::new(NullSink))
    }

    #[test]
    fn test_generate_keypair_sizes() {
        let kp = custodian().generate_keypair();
        assert_eq!(kp.public_key.len(), 32);
        assert_eq!(kp.private_key.len(), 32);
        assert!(kp.signing_key().is_some());
    }

    #[test]
    fn test_generated_keypairs_differ() {
        let c = custodian();
        assert_ne!(c.generate_keypair(), c.generate_keypair());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let kp = custodian().generate_keypair();
        let debug = format!("{:?}", kp);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&hex::encode(&kp.private_key)));
    }

    #[test]
    fn test_short_password_rejected() {
        let c = custodian();
        let kp = c.generate_keypair();
        assert!(matches!(
            c.persist(&kp, "short"),
            Err(KeyError::PasswordTooShort { min: 8 })
        ));
    }

    #[test]
    fn test_password_roundtrip() {
        let c = custodian();
        let kp = c.generate_keypair();

        let record = c.persist(&kp, PASSWORD).unwrap();
        let restored = c.retrieve(PASSWORD, &record).unwrap();

        assert_eq!(restored.private_key, kp.private_key);
        assert_eq!(restored.public_key, kp.public_key);
    }

    #[test]
    fn test_record_never_contains_plain_private_key() {
        let c = custodian();
        let kp = c.generate_keypair();
        let record = c.persist(&kp, PASSWORD).unwrap();

        let json = String::from_utf8(record.to_json_bytes()).unwrap();
        assert!(!json.contains(&hex::encode(&kp.private_key)));
        assert_eq!(record.public_key, kp.public_key_hex());
        assert_eq!(record.iterations, PBKDF2_ITERATIONS);
        // 32-byte seed + 16-byte tag
        assert_eq!(record.encrypted_private_key.len(), (32 + 16) * 2);
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_record() {
        let c = custodian();
        let kp = c.generate_keypair();
        let a = c.persist(&kp, PASSWORD).unwrap();
        let b = c.persist(&kp, PASSWORD).unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.encrypted_private_key, b.encrypted_private_key);
    }

    #[test]
    fn test_wrong_password_fails() {
        let sink = Arc::new(RecordingSink::new());
        let c = KeyCustodian::new(MemoryKeyStore::new()).with_sink(sink.clone());
        let kp = c.generate_keypair();
        let record = c.persist(&kp, PASSWORD).unwrap();

        assert!(matches!(
            c.retrieve("incorrect horse battery", &record),
            Err(KeyError::DecryptionFailed)
        ));
        assert_eq!(sink.count(|e| matches!(e, IntegrityEvent::KeyDecryptionFailed)), 1);
    }

    #[test]
    fn test_corruption_is_indistinguishable_from_wrong_password() {
        let c = custodian();
        let kp = c.generate_keypair();
        let record = c.persist(&kp, PASSWORD).unwrap();

        let mut flipped = record.clone();
        let last = flipped.encrypted_private_key.pop().unwrap();
        flipped.encrypted_private_key.push(if last == '0' { '1' } else { '0' });

        let mut bad_hex = record.clone();
        bad_hex.salt = "not hex".into();

        let mut short_iv = record.clone();
        short_iv.iv = "00ff".into();

        let mut weak = record.clone();
        weak.iterations = 1_000;

        let mut expensive = record.clone();
        expensive.iterations = u32::MAX;

        let mut swapped_public = record.clone();
        swapped_public.public_key = c.generate_keypair().public_key_hex();

        for corrupted in [flipped, bad_hex, short_iv, weak, expensive, swapped_public] {
            assert!(matches!(
                c.retrieve(PASSWORD, &corrupted),
                Err(KeyError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn test_save_load_exists_delete() {
        let c = custodian();
        let kp = c.generate_keypair();

        assert!(!c.exists(DEFAULT_LOCATOR).unwrap());
        c.save(&kp, PASSWORD, DEFAULT_LOCATOR).unwrap();
        assert!(c.exists(DEFAULT_LOCATOR).unwrap());

        let loaded = c.load(PASSWORD, DEFAULT_LOCATOR).unwrap();
        assert_eq!(loaded, kp);

        c.delete(DEFAULT_LOCATOR).unwrap();
        assert!(!c.exists(DEFAULT_LOCATOR).unwrap());
        assert!(matches!(
            c.load(PASSWORD, DEFAULT_LOCATOR),
            Err(KeyError::Store(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn test_file_backed_custody() {
        let dir = TempDir::new().unwrap();
        let c = KeyCustodian::new(FileKeyStore::new(dir.path()).unwrap())
            .with_sink(Arc::new(NullSink));
        let kp = c.generate_keypair();
        c.save(&kp, PASSWORD, "player_alice").unwrap();

        let raw = std::fs::read_to_string(dir.path().join("player_alice.json")).unwrap();
        assert!(raw.contains("\"encryptedPrivateKey\""));

        // A second custodian over the same directory can open the record.
        let reopened = KeyCustodian::new(FileKeyStore::new(dir.path()).unwrap())
            .with_sink(Arc::new(NullSink));
        assert_eq!(reopened.load(PASSWORD, "player_alice").unwrap(), kp);
    }

    #[test]
    fn test_garbage_record_is_malformed() {
        let c = custodian();
        c.store().save("junk", b"not json").unwrap();
        assert!(matches!(c.load(PASSWORD, "junk"), Err(KeyError::MalformedRecord(_))));
    }

    #[test]
    fn test_legacy_record_without_kdf_fields() {
        let c = custodian();
        let kp = c.generate_keypair();
        let record = c.persist(&kp, PASSWORD).unwrap();

        let legacy = serde_json::json!({
            "encryptedPrivateKey": record.encrypted_private_key,
            "publicKey": record.public_key,
            "salt": record.salt,
            "iv": record.iv,
        });
        let parsed = EncryptedKeyRecord::from_json_bytes(legacy.to_string().as_bytes()).unwrap();

        assert_eq!(parsed.kdf, KDF_NAME);
        assert_eq!(c.retrieve(PASSWORD, &parsed).unwrap(), kp);
    }

    #[test]
    fn test_shared_store_handle() {
        let store = Arc::new(MemoryKeyStore::new());
        let c = KeyCustodian::shared(store.clone()).with_sink(Arc::new(NullSink));
        let kp = c.generate_keypair();
        c.save(&kp, PASSWORD, "k").unwrap();

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_inconsistent_keypair_rejected() {
        let c = custodian();
        let mut kp = c.generate_keypair();
        kp.public_key = c.generate_keypair().public_key;
        assert!(matches!(c.persist(&kp, PASSWORD), Err(KeyError::InvalidKeypair)));
    }
}
