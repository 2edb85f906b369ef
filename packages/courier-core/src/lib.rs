//! # Courier Core
//!
//! End-to-end encryption core for a chat client: key agreement, per-message
//! key wrapping, password-protected key backups and length padding.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        COURIER CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐ │
//! │  │  Protocol   │   │   Backup    │   │   Session   │   │ Obfuscation │ │
//! │  │             │   │             │   │             │   │             │ │
//! │  │ - Envelope  │   │ - Bundle    │   │ - Records   │   │ - Buckets   │ │
//! │  │ - Key wrap  │   │ - PBKDF2    │   │ - PBKDF2    │   │ - Legacy    │ │
//! │  └──────┬──────┘   └──────┬──────┘   └──────┬──────┘   └──────┬──────┘ │
//! │         │                 │                 │                 │        │
//! │         └─────────────────┴────────┬────────┴─────────────────┘        │
//! │                                    │                                    │
//! │  ┌─────────────────────────────────┴───────────────────────────────┐   │
//! │  │                            Crypto                                │   │
//! │  │                                                                  │   │
//! │  │   kdf: PBKDF2, HKDF    symmetric: AES-256-GCM   asymmetric: X25519 │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Primitives (key derivation, AES-GCM, X25519)
//! - [`protocol`] - Message envelope encryption and decryption
//! - [`backup`] - Private-key bundles and password-encrypted blobs
//! - [`session`] - Password-encrypted session records
//! - [`obfuscation`] - Size-bucket padding
//! - [`context`] - [`CryptoSession`], the application-owned identity handle
//!
//! ## Security Model
//!
//! | Asset | Protection |
//! |-------|------------|
//! | Message body | AES-256-GCM under a fresh per-message key |
//! | Per-message key | AES-256-GCM under an X25519 + HKDF wrapping key |
//! | Private key at rest | AES-256-GCM under PBKDF2-SHA256 (210,000 iterations) |
//! | Message length | Padded to one of seven size buckets |
//!
//! There is no forward secrecy: the long-term X25519 keys protect every
//! message between two peers.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod backup;
pub mod context;
pub mod crypto;
pub mod error;
pub mod obfuscation;
pub mod protocol;
pub mod session;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use backup::{EncryptedBackupBlob, PrivateKeyBundle};
pub use context::CryptoSession;
pub use crypto::{KeyPair, PublicKey, SharedSecret};
pub use error::{DecryptionError, Error, Result};
pub use protocol::{decrypt_message, encrypt_message, EncryptedMessage};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Settings for a [`CryptoSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// PBKDF2 iterations for new backups and session records
    pub backup_iterations: u32,
    /// Pad envelopes into size buckets before they leave the session
    pub padding_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            backup_iterations: crypto::BACKUP_ITERATIONS,
            padding_enabled: true,
        }
    }
}

impl CoreConfig {
    /// Check the configuration before use.
    ///
    /// Iteration counts outside [`crypto::MIN_BACKUP_ITERATIONS`] to
    /// [`crypto::MAX_BACKUP_ITERATIONS`] are rejected; blobs written above
    /// the ceiling could not be read back.
    pub fn validate(&self) -> Result<()> {
        if !(crypto::MIN_BACKUP_ITERATIONS..=crypto::MAX_BACKUP_ITERATIONS)
            .contains(&self.backup_iterations)
        {
            return Err(Error::KeyDerivationFailed(format!(
                "backup_iterations must be between {} and {}, got {}",
                crypto::MIN_BACKUP_ITERATIONS,
                crypto::MAX_BACKUP_ITERATIONS,
                self.backup_iterations
            )));
        }
        Ok(())
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Courier Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
