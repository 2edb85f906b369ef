//! # Key Derivation Functions
//!
//! Randomness, HKDF and PBKDF2. Everything here is a pure function of its
//! inputs (apart from the RNG) and holds no state between calls.
//!
//! ## Derivation Paths
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY DERIVATION PATHS                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ECDH SHARED SECRET → WRAPPING KEY               │   │
//! │  │                                                                 │   │
//! │  │  HKDF-SHA256(                                                  │   │
//! │  │    ikm  = X25519(my_private, their_public),                    │   │
//! │  │    salt = 16 random bytes (sent in the envelope),              │   │
//! │  │    info = "courier-wrap-mk-v1"                                 │   │
//! │  │  )                                                             │   │
//! │  │                                                                 │   │
//! │  │  → 32-byte AES-256-GCM key that wraps the per-message key     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 PASSWORD → KEY ENCRYPTION KEY                   │   │
//! │  │                                                                 │   │
//! │  │  PBKDF2-HMAC-SHA256(                                           │   │
//! │  │    password   = UTF-8 bytes (no normalization),                │   │
//! │  │    salt       = 16 random bytes (stored in the blob),          │   │
//! │  │    iterations = 210,000,                                       │   │
//! │  │    length     = 32                                             │   │
//! │  │  )                                                             │   │
//! │  │                                                                 │   │
//! │  │  → 32-byte AES-256-GCM key for backups and session records    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! | Aspect | Design Choice |
//! |--------|---------------|
//! | KDF Algorithm | HKDF-SHA256 / PBKDF2-HMAC-SHA256 |
//! | Key Separation | Different `info` strings per purpose |
//! | Password Iterations | 210,000 (interoperability constant) |
//! | Version String | "-v1" suffix |

use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::symmetric::{AesGcmKey, KEY_SIZE};
use crate::error::{Error, Result};

/// Domain separation strings for HKDF
///
/// Sender and receiver must use the same string or the derived keys
/// differ silently and decryption fails at the tag check.
pub mod domain {
    /// Wrapping key for the per-message key `mk`
    pub const WRAP_MESSAGE_KEY: &[u8] = b"courier-wrap-mk-v1";

    /// Per-file key derived from a shared secret
    pub const FILE_KEY: &[u8] = b"courier-file-key-v1";
}

/// PBKDF2 iteration count for backups and session records
pub const BACKUP_ITERATIONS: u32 = 210_000;

/// Lowest iteration count accepted by [`CoreConfig`](crate::CoreConfig)
pub const MIN_BACKUP_ITERATIONS: u32 = 100_000;

/// Highest iteration count accepted from a stored blob
pub const MAX_BACKUP_ITERATIONS: u32 = 10 * BACKUP_ITERATIONS;

/// Salt length for PBKDF2 and wrapping-key derivation
pub const SALT_SIZE: usize = 16;

/// Largest output HKDF-SHA256 can produce (255 × hash length)
const HKDF_MAX_OUTPUT: usize = 255 * 32;

/// Fill `buf` from the operating system CSPRNG.
///
/// There is no fallback: if the OS RNG fails the operation fails.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    rand::rngs::OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::RngUnavailable(e.to_string()))
}

/// Return `n` cryptographically secure random bytes
pub fn random_bytes(n: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; n];
    fill_random(&mut bytes)?;
    Ok(bytes)
}

/// Raw password material ready to feed into PBKDF2.
///
/// Zeroized when dropped.
pub struct PasswordKey(Zeroizing<Vec<u8>>);

impl PasswordKey {
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PasswordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordKey(..)")
    }
}

/// Wrap a password as PBKDF2 input.
///
/// Only UTF-8 encoding is applied. No Unicode normalization is done, so
/// the same visible password typed with different combining sequences
/// derives a different key.
pub fn import_password(password: &str) -> PasswordKey {
    PasswordKey(Zeroizing::new(password.as_bytes().to_vec()))
}

/// Derive a 256-bit AES-GCM key from a password with PBKDF2-HMAC-SHA256.
///
/// `iterations` is not range-checked beyond being non-zero; callers pass
/// [`BACKUP_ITERATIONS`] to stay interoperable. With `extractable = false`
/// the returned key refuses [`AesGcmKey::export`].
pub fn derive_kek(
    password_key: &PasswordKey,
    salt: &[u8],
    iterations: u32,
    extractable: bool,
) -> Result<AesGcmKey> {
    if iterations == 0 {
        return Err(Error::KeyDerivationFailed(
            "PBKDF2 iteration count must be non-zero".into(),
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password_key.as_bytes(), salt, iterations, &mut key[..]);

    Ok(AesGcmKey::from_derived(*key, extractable))
}

/// HKDF-SHA256 extract-then-expand producing `length` bytes.
///
/// Deterministic: identical inputs always produce identical output.
pub fn hkdf_extract_and_expand(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Vec<u8>> {
    if length > HKDF_MAX_OUTPUT {
        return Err(Error::KeyDerivationFailed(format!(
            "HKDF output length {} exceeds maximum {}",
            length, HKDF_MAX_OUTPUT
        )));
    }

    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; length];
    hkdf.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;

    Ok(okm)
}

/// Derive a per-file encryption key from an ECDH shared secret.
///
/// The file id is the salt, so every file gets an independent key even
/// between the same pair of identities.
pub fn derive_file_key(shared_secret: &[u8; 32], file_id: &str) -> Result<AesGcmKey> {
    let hkdf = Hkdf::<Sha256>::new(Some(file_id.as_bytes()), shared_secret);

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    hkdf.expand(domain::FILE_KEY, &mut key[..])
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive file key".into()))?;

    Ok(AesGcmKey::from_derived(*key, false))
}

/// Fingerprint of a public key for out-of-band verification.
///
/// First 16 bytes of SHA-256, hex encoded.
pub fn compute_key_fingerprint(public_key: &[u8; 32]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..16])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::symmetric::{aes_gcm_decrypt, aes_gcm_encrypt};

    #[test]
    fn test_random_bytes_length_and_uniqueness() {
        let a = random_bytes(32).unwrap();
        let b = random_bytes(32).unwrap();

        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(random_bytes(0).unwrap().is_empty());
    }

    #[test]
    fn test_derive_kek_deterministic() {
        let password = import_password("correct-password");
        let salt = [7u8; SALT_SIZE];

        let k1 = derive_kek(&password, &salt, BACKUP_ITERATIONS, true).unwrap();
        let k2 = derive_kek(&password, &salt, BACKUP_ITERATIONS, true).unwrap();
        let k3 = derive_kek(&password, &salt, BACKUP_ITERATIONS + 1, true).unwrap();

        assert_eq!(*k1.export().unwrap(), *k2.export().unwrap());
        assert_ne!(*k1.export().unwrap(), *k3.export().unwrap());
    }

    #[test]
    fn test_derive_kek_salt_and_password_matter() {
        let salt_a = [1u8; SALT_SIZE];
        let salt_b = [2u8; SALT_SIZE];
        let pw = import_password("pw");

        let a = derive_kek(&pw, &salt_a, 1_000, true).unwrap();
        let b = derive_kek(&pw, &salt_b, 1_000, true).unwrap();
        let c = derive_kek(&import_password("pw2"), &salt_a, 1_000, true).unwrap();

        assert_ne!(*a.export().unwrap(), *b.export().unwrap());
        assert_ne!(*a.export().unwrap(), *c.export().unwrap());
    }

    #[test]
    fn test_derive_kek_non_extractable() {
        let key = derive_kek(&import_password("pw"), &[0u8; SALT_SIZE], 1_000, false).unwrap();
        assert!(matches!(key.export(), Err(Error::KeyNotExtractable)));
    }

    #[test]
    fn test_derive_kek_zero_iterations_rejected() {
        let result = derive_kek(&import_password("pw"), &[0u8; SALT_SIZE], 0, true);
        assert!(matches!(result, Err(Error::KeyDerivationFailed(_))));
    }

    #[test]
    fn test_password_not_normalized() {
        // "é" precomposed vs "e" + combining acute accent
        let salt = [3u8; SALT_SIZE];
        let nfc = derive_kek(&import_password("caf\u{e9}"), &salt, 1_000, true).unwrap();
        let nfd = derive_kek(&import_password("cafe\u{301}"), &salt, 1_000, true).unwrap();

        assert_ne!(*nfc.export().unwrap(), *nfd.export().unwrap());
    }

    #[test]
    fn test_hkdf_deterministic_and_sized() {
        let okm1 = hkdf_extract_and_expand(b"ikm", b"salt", b"info", 42).unwrap();
        let okm2 = hkdf_extract_and_expand(b"ikm", b"salt", b"info", 42).unwrap();
        let other = hkdf_extract_and_expand(b"ikm", b"salt", b"other", 42).unwrap();

        assert_eq!(okm1.len(), 42);
        assert_eq!(okm1, okm2);
        assert_ne!(okm1, other);
    }

    #[test]
    fn test_hkdf_rfc5869_case_1() {
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let okm = hkdf_extract_and_expand(&ikm, &salt, &info, 42).unwrap();

        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_hkdf_length_limit() {
        assert!(hkdf_extract_and_expand(b"ikm", b"", b"", HKDF_MAX_OUTPUT).is_ok());
        assert!(hkdf_extract_and_expand(b"ikm", b"", b"", HKDF_MAX_OUTPUT + 1).is_err());
    }

    #[test]
    fn test_file_keys_differ_per_file() {
        let shared = [42u8; 32];
        let a = derive_file_key(&shared, "file-a").unwrap();
        let b = derive_file_key(&shared, "file-b").unwrap();

        let sealed = aes_gcm_encrypt(&a, b"chunk", None).unwrap();
        assert!(aes_gcm_decrypt(&b, &sealed.iv, &sealed.ciphertext).is_err());
        assert!(aes_gcm_decrypt(&a, &sealed.iv, &sealed.ciphertext).is_ok());
    }

    #[test]
    fn test_key_fingerprint_format() {
        let fp = compute_key_fingerprint(&[9u8; 32]);

        assert_eq!(fp.len(), 32);
        assert_eq!(fp, compute_key_fingerprint(&[9u8; 32]));
        assert_ne!(fp, compute_key_fingerprint(&[8u8; 32]));
    }
}
