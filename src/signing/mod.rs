//! Signature Subsystem
//!
//! Binds checkpoint hashes to an identity key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SIGNING                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  keys.rs    - Ed25519 keypairs, PBKDF2 + AES-256-GCM custody│
//! │  store.rs   - KeyStore trait, file and memory stores        │
//! │  signer.rs  - SignedCheckpoint creation and verification    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod keys;
pub mod signer;
pub mod store;

pub use keys::{EncryptedKeyRecord, KeyCustodian, KeyError, Keypair, DEFAULT_LOCATOR};
pub use signer::{BatchItemResult, BatchVerification, SignError, SignedCheckpoint, Signer};
pub use store::{FileKeyStore, KeyStore, MemoryKeyStore, StoreError};
