//! # Crypto Session
//!
//! [`CryptoSession`] holds the local identity's key pair and the active
//! [`CoreConfig`]. The application layer creates and owns it; there is no
//! global instance.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CRYPTO SESSION LIFECYCLE                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  generate(config) ─────────┐                                           │
//! │  new(key_pair, config) ────┼──► CryptoSession                          │
//! │  restore_from_backup(..) ──┘        │                                  │
//! │                                     ├──► encrypt_for / decrypt_from    │
//! │                                     ├──► seal_for_transport            │
//! │                                     │    open_from_transport           │
//! │                                     ├──► export_backup                 │
//! │                                     │                                  │
//! │                                     ▼                                  │
//! │                                   drop ──► private key zeroized        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transport Encoding
//!
//! `seal_for_transport` serializes the envelope to JSON and, when
//! `padding_enabled` is set, pads it into a size bucket. The receiving
//! side always strips padding if present, so padded and unpadded peers
//! interoperate.

use crate::backup::{
    decode_blob, decrypt_backup_with_password, encode_blob, encrypt_backup_with_iterations,
    PrivateKeyBundle,
};
use crate::crypto::{KeyPair, PublicKey};
use crate::error::Result;
use crate::obfuscation::{add_padding, remove_padding};
use crate::protocol::{decrypt_message, encrypt_message, EncryptedMessage};
use crate::session::{decrypt_session_record, encrypt_session_record_with_iterations};
use crate::CoreConfig;

/// The local identity plus the settings that govern its crypto operations
pub struct CryptoSession {
    key_pair: KeyPair,
    config: CoreConfig,
}

impl CryptoSession {
    /// Wrap an existing key pair
    pub fn new(key_pair: KeyPair, config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let session = Self { key_pair, config };
        tracing::info!(fingerprint = %session.fingerprint(), "Crypto session opened");
        Ok(session)
    }

    /// Create a session with a freshly generated key pair
    pub fn generate(config: CoreConfig) -> Result<Self> {
        Self::new(KeyPair::generate()?, config)
    }

    /// Restore a session from an encoded backup produced by
    /// [`CryptoSession::export_backup`]
    pub fn restore_from_backup(password: &str, encoded: &str, config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let blob = decode_blob(encoded)?;
        let bundle = decrypt_backup_with_password(password, &blob)?;
        Self::new(bundle.to_key_pair()?, config)
    }

    /// Our public key, to hand to peers
    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key()
    }

    /// Short hex fingerprint of our public key
    pub fn fingerprint(&self) -> String {
        self.public_key().fingerprint()
    }

    /// Active configuration
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Encrypt a message for `their_public`
    pub fn encrypt_for(&self, their_public: &PublicKey, plaintext: &str) -> Result<EncryptedMessage> {
        let private = self.key_pair.private_bytes();
        encrypt_message(&private[..], their_public.as_bytes(), plaintext)
    }

    /// Decrypt a message sent by `their_public`
    pub fn decrypt_from(&self, their_public: &PublicKey, message: &EncryptedMessage) -> Result<String> {
        let private = self.key_pair.private_bytes();
        decrypt_message(&private[..], their_public.as_bytes(), message)
    }

    /// Encrypt and encode a message for the wire
    pub fn seal_for_transport(&self, their_public: &PublicKey, plaintext: &str) -> Result<String> {
        let json = self.encrypt_for(their_public, plaintext)?.to_json()?;
        if self.config.padding_enabled {
            add_padding(&json)
        } else {
            Ok(json)
        }
    }

    /// Decode and decrypt a message produced by
    /// [`CryptoSession::seal_for_transport`], padded or not
    pub fn open_from_transport(&self, their_public: &PublicKey, wire: &str) -> Result<String> {
        let json = remove_padding(wire);
        let message = EncryptedMessage::from_json(&json)?;
        self.decrypt_from(their_public, &message)
    }

    /// Export our private key as an encoded, password-protected backup
    pub fn export_backup(&self, password: &str) -> Result<String> {
        let bundle = PrivateKeyBundle::from_key_pair(&self.key_pair);
        let blob = encrypt_backup_with_iterations(password, &bundle, self.config.backup_iterations)?;
        Ok(encode_blob(&blob))
    }

    /// Encrypt a session record under a password, encoded for storage
    pub fn seal_session_record(&self, password: &str, record: &[u8]) -> Result<String> {
        let blob =
            encrypt_session_record_with_iterations(password, record, self.config.backup_iterations)?;
        Ok(encode_blob(&blob))
    }

    /// Decrypt a record produced by [`CryptoSession::seal_session_record`]
    pub fn open_session_record(&self, password: &str, encoded: &str) -> Result<Vec<u8>> {
        let blob = decode_blob(encoded)?;
        Ok(decrypt_session_record(password, &blob)?.to_vec())
    }
}

impl std::fmt::Debug for CryptoSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoSession")
            .field("fingerprint", &self.fingerprint())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_BACKUP_ITERATIONS;
    use crate::error::{DecryptionError, Error};

    fn fast_config() -> CoreConfig {
        CoreConfig {
            backup_iterations: MIN_BACKUP_ITERATIONS,
            ..CoreConfig::default()
        }
    }

    #[test]
    fn test_sessions_exchange_messages() {
        let alice = CryptoSession::generate(CoreConfig::default()).unwrap();
        let bob = CryptoSession::generate(CoreConfig::default()).unwrap();

        let message = alice.encrypt_for(&bob.public_key(), "hi bob").unwrap();
        let plaintext = bob.decrypt_from(&alice.public_key(), &message).unwrap();

        assert_eq!(plaintext, "hi bob");
    }

    #[test]
    fn test_transport_round_trip_padded() {
        let alice = CryptoSession::generate(CoreConfig::default()).unwrap();
        let bob = CryptoSession::generate(CoreConfig::default()).unwrap();

        let wire = alice.seal_for_transport(&bob.public_key(), "padded").unwrap();

        assert!(!wire.starts_with('{'));
        assert_eq!(bob.open_from_transport(&alice.public_key(), &wire).unwrap(), "padded");
    }

    #[test]
    fn test_transport_accepts_unpadded_peer() {
        let unpadded = CoreConfig {
            padding_enabled: false,
            ..CoreConfig::default()
        };
        let alice = CryptoSession::generate(unpadded).unwrap();
        let bob = CryptoSession::generate(CoreConfig::default()).unwrap();

        let wire = alice.seal_for_transport(&bob.public_key(), "plain json").unwrap();

        assert!(wire.starts_with('{'));
        assert_eq!(
            bob.open_from_transport(&alice.public_key(), &wire).unwrap(),
            "plain json"
        );
    }

    #[test]
    fn test_transport_rejects_garbage() {
        let bob = CryptoSession::generate(CoreConfig::default()).unwrap();
        let alice = CryptoSession::generate(CoreConfig::default()).unwrap();

        let result = bob.open_from_transport(&alice.public_key(), "garbage");

        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }

    #[test]
    fn test_wrong_sender_key_fails_unwrap() {
        let alice = CryptoSession::generate(CoreConfig::default()).unwrap();
        let bob = CryptoSession::generate(CoreConfig::default()).unwrap();
        let mallory = CryptoSession::generate(CoreConfig::default()).unwrap();

        let message = alice.encrypt_for(&bob.public_key(), "secret").unwrap();
        let result = bob.decrypt_from(&mallory.public_key(), &message);

        assert!(matches!(
            result,
            Err(Error::Decryption(DecryptionError::UnwrapFailed))
        ));
    }

    #[test]
    fn test_backup_restores_same_identity() {
        let original = CryptoSession::generate(fast_config()).unwrap();
        let peer = CryptoSession::generate(fast_config()).unwrap();
        let message = peer.encrypt_for(&original.public_key(), "after restore").unwrap();

        let backup = original.export_backup("hunter2").unwrap();
        let restored = CryptoSession::restore_from_backup("hunter2", &backup, fast_config()).unwrap();

        assert_eq!(restored.public_key(), original.public_key());
        assert_eq!(
            restored.decrypt_from(&peer.public_key(), &message).unwrap(),
            "after restore"
        );
    }

    #[test]
    fn test_restore_with_wrong_password() {
        let original = CryptoSession::generate(fast_config()).unwrap();
        let backup = original.export_backup("hunter2").unwrap();

        let result = CryptoSession::restore_from_backup("hunter3", &backup, fast_config());

        assert!(matches!(result, Err(Error::WrongPasswordOrCorruptData)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let weak = CoreConfig {
            backup_iterations: 1_000,
            ..CoreConfig::default()
        };

        assert!(matches!(
            CryptoSession::generate(weak),
            Err(Error::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn test_session_record_round_trip() {
        let session = CryptoSession::generate(fast_config()).unwrap();

        let sealed = session.seal_session_record("pw", b"ratchet-state").unwrap();

        assert_eq!(session.open_session_record("pw", &sealed).unwrap(), b"ratchet-state");
        assert!(CryptoSession::restore_from_backup("pw", &sealed, fast_config()).is_err());
    }

    #[test]
    fn test_debug_shows_fingerprint_only() {
        let session = CryptoSession::generate(CoreConfig::default()).unwrap();
        let rendered = format!("{:?}", session);
        let private_hex = hex::encode(*session.key_pair.private_bytes());

        assert!(rendered.contains(&session.fingerprint()));
        assert!(!rendered.contains(&private_hex));
    }
}
