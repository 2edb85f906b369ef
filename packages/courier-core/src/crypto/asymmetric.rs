//! # Asymmetric Keys
//!
//! X25519 key pairs, ECDH, and wrapping-key derivation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      WRAPPING KEY AGREEMENT                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   Alice                                          Bob                    │
//! │     │                                              │                    │
//! │     │  X25519(alice_private, bob_public)           │                    │
//! │     │            ==                                │                    │
//! │     │  X25519(bob_private, alice_public)           │                    │
//! │     │                                              │                    │
//! │     └──────────────► shared secret ◄───────────────┘                    │
//! │                           │                                             │
//! │              HKDF(salt from envelope, fixed info)                       │
//! │                           ▼                                             │
//! │                     wrapping key                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The shared secret is static per pair of identities; only the salt
//! varies. There is no forward secrecy on this path.

use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::kdf::{compute_key_fingerprint, fill_random, hkdf_extract_and_expand};
use super::symmetric::{import_aes_gcm_key, AesGcmKey, KEY_SIZE};
use crate::error::{Error, Result};

/// Size of an X25519 public key
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an X25519 private key
pub const PRIVATE_KEY_SIZE: usize = 32;

/// X25519 key pair for one identity
///
/// The private half never leaves the trust boundary unencrypted: the only
/// export path is [`KeyPair::private_bytes`], used to build a backup bundle.
#[derive(ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)] // x25519_dalek zeroizes StaticSecret itself
    secret: StaticSecret,
    #[zeroize(skip)]
    public: X25519PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        fill_random(&mut seed[..])?;
        Ok(Self::from_private_bytes(*seed))
    }

    /// Rebuild a key pair from its 32-byte private key.
    ///
    /// Deterministic: the same bytes always yield the same public key.
    pub fn from_private_bytes(bytes: [u8; PRIVATE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a key pair from a private key slice of unknown length
    pub fn from_private_slice(bytes: &[u8]) -> Result<Self> {
        let mut array: [u8; PRIVATE_KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::KeyImport(format!(
                "X25519 private key must be {} bytes, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            ))
        })?;
        let pair = Self::from_private_bytes(array);
        array.zeroize();
        Ok(pair)
    }

    /// Get the private key bytes
    ///
    /// ## Security Warning
    ///
    /// Only use this to build a backup bundle. Never log or transmit these bytes.
    pub fn private_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Get the shareable public half
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.public.to_bytes())
    }

    /// Compute the X25519 shared secret with a peer
    pub fn diffie_hellman(&self, their_public: &[u8]) -> Result<SharedSecret> {
        agree(&self.secret, &PublicKey::from_slice(their_public)?)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .finish_non_exhaustive()
    }
}

/// A public key that can be shared with anyone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Create from a slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        bytes.try_into().map(Self).map_err(|_| {
            Error::InvalidKey(format!(
                "X25519 public key must be {} bytes, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            ))
        })
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Encode as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes =
            hex::decode(hex_str).map_err(|e| Error::InvalidKey(format!("Invalid hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Short fingerprint for out-of-band comparison
    pub fn fingerprint(&self) -> String {
        compute_key_fingerprint(&self.0)
    }
}

/// A shared secret produced by X25519
///
/// Zeroized when dropped.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; 32],
}

impl SharedSecret {
    /// Get the raw bytes (for key derivation)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SharedSecret {}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Generate a fresh X25519 key pair
pub fn generate_x25519_key_pair() -> Result<KeyPair> {
    KeyPair::generate()
}

/// Compute the X25519 shared secret.
///
/// Fails with [`Error::InvalidKey`] if either key is not 32 bytes, if
/// either key is all zeros, or if the peer's public key is a low-order
/// point (the result would not depend on our private key).
pub fn ecdh_shared_secret(my_private_key: &[u8], their_public_key: &[u8]) -> Result<SharedSecret> {
    let public = PublicKey::from_slice(their_public_key)?;
    let mut private: [u8; PRIVATE_KEY_SIZE] = my_private_key.try_into().map_err(|_| {
        Error::InvalidKey(format!(
            "X25519 private key must be {} bytes, got {}",
            PRIVATE_KEY_SIZE,
            my_private_key.len()
        ))
    })?;

    if private.iter().all(|b| *b == 0) {
        return Err(Error::InvalidKey("X25519 private key is all zeros".into()));
    }

    let secret = StaticSecret::from(private);
    private.zeroize();

    agree(&secret, &public)
}

fn agree(secret: &StaticSecret, public: &PublicKey) -> Result<SharedSecret> {
    if public.0.iter().all(|b| *b == 0) {
        return Err(Error::InvalidKey("X25519 public key is the identity point".into()));
    }

    let shared = secret.diffie_hellman(&X25519PublicKey::from(public.0));
    if !shared.was_contributory() {
        tracing::warn!(
            peer = %public.fingerprint(),
            "Rejected low-order X25519 public key"
        );
        return Err(Error::InvalidKey(
            "X25519 public key is a low-order point".into(),
        ));
    }

    Ok(SharedSecret {
        bytes: shared.to_bytes(),
    })
}

/// Derive the AES key that wraps a per-message key.
///
/// HKDF-SHA256 over the shared secret. `info` must match on both sides;
/// a mismatch is not detected here but surfaces as an authentication
/// failure when unwrapping.
pub fn derive_wrapping_key(shared_secret: &SharedSecret, salt: &[u8], info: &[u8]) -> Result<AesGcmKey> {
    let okm = Zeroizing::new(hkdf_extract_and_expand(
        shared_secret.as_bytes(),
        salt,
        info,
        KEY_SIZE,
    )?);
    import_aes_gcm_key(&okm)
}

// ============================================================================
// TESTS
// ============================================================================
