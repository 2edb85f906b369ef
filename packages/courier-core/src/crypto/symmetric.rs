//! # Symmetric Encryption
//!
//! AES-256-GCM over byte buffers with explicit IV handling.
//!
//! ## Output Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  aes_gcm_encrypt(key, plaintext, iv?)                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  iv          12 bytes   random unless supplied by the caller           │
//! │  ciphertext  len(plaintext) + 16 bytes                                 │
//! │              └── encrypted bytes ∥ 128-bit authentication tag         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Random 96-bit IVs are safe for up to 2^32 messages per key. Message
//! keys are single-use, so the bound only matters for long-lived keys
//! such as a file key across many chunks.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use super::kdf::fill_random;
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (IV) for AES-GCM encryption
///
/// **Never reuse a nonce with the same key.** Reuse leaks the GCM
/// authentication key and the XOR of the plaintexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 12 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// An AES-256-GCM key
///
/// Usable for both encryption and decryption. Zeroized when dropped.
#[derive(ZeroizeOnDrop)]
pub struct AesGcmKey {
    bytes: [u8; KEY_SIZE],
    #[zeroize(skip)]
    extractable: bool,
}

impl AesGcmKey {
    /// Create from raw bytes (extractable)
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            bytes,
            extractable: true,
        }
    }

    pub(crate) fn from_derived(bytes: [u8; KEY_SIZE], extractable: bool) -> Self {
        Self { bytes, extractable }
    }

    /// Export the raw key bytes.
    ///
    /// Fails with [`Error::KeyNotExtractable`] for keys derived with
    /// `extractable = false`.
    pub fn export(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        if !self.extractable {
            return Err(Error::KeyNotExtractable);
        }
        Ok(Zeroizing::new(self.bytes))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for AesGcmKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmKey")
            .field("extractable", &self.extractable)
            .finish_non_exhaustive()
    }
}

/// Import a raw buffer as an AES-256-GCM key.
///
/// Fails with [`Error::KeyImport`] unless the buffer is exactly 32 bytes.
pub fn import_aes_gcm_key(raw: &[u8]) -> Result<AesGcmKey> {
    let bytes: [u8; KEY_SIZE] = raw.try_into().map_err(|_| {
        Error::KeyImport(format!(
            "AES-256-GCM key must be {} bytes, got {}",
            KEY_SIZE,
            raw.len()
        ))
    })?;
    Ok(AesGcmKey::from_bytes(bytes))
}

/// Output of [`aes_gcm_encrypt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Nonce used for this encryption
    pub iv: Nonce,
    /// Ciphertext with the 16-byte tag appended
    pub ciphertext: Vec<u8>,
}

/// Encrypt with AES-256-GCM.
///
/// A fresh random IV is generated when `iv` is `None`.
pub fn aes_gcm_encrypt(
    key: &AesGcmKey,
    plaintext: &[u8],
    iv: Option<Nonce>,
) -> Result<EncryptedPayload> {
    seal(key, plaintext, b"", iv)
}

/// Decrypt with AES-256-GCM.
///
/// Returns [`Error::Authentication`] when the tag check fails; never
/// returns unauthenticated bytes.
pub fn aes_gcm_decrypt(key: &AesGcmKey, iv: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
    open(key, iv, ciphertext, b"")
}

fn seal(key: &AesGcmKey, msg: &[u8], aad: &[u8], iv: Option<Nonce>) -> Result<EncryptedPayload> {
    let iv = match iv {
        Some(iv) => iv,
        None => Nonce::random()?,
    };

    let ciphertext = key
        .cipher()
        .encrypt(AesNonce::from_slice(&iv.0), Payload { msg, aad })
        .map_err(|e| Error::EncryptionFailed(format!("AES-GCM encryption failed: {}", e)))?;

    Ok(EncryptedPayload { iv, ciphertext })
}

fn open(key: &AesGcmKey, iv: &Nonce, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    key.cipher()
        .decrypt(
            AesNonce::from_slice(&iv.0),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::Authentication)
}

// ============================================================================
// FILE CHUNK ENCRYPTION
// ============================================================================

fn chunk_aad(file_id: &str, chunk_index: u32) -> Vec<u8> {
    let mut aad = Vec::with_capacity(file_id.len() + 4);
    aad.extend_from_slice(file_id.as_bytes());
    aad.extend_from_slice(&chunk_index.to_le_bytes());
    aad
}

/// Encrypt a single file chunk with AES-256-GCM.
///
/// `file_id || chunk_index` (little-endian) is bound as associated data so
/// chunks cannot be reordered or moved into another file.
pub fn encrypt_chunk(
    key: &AesGcmKey,
    chunk_data: &[u8],
    file_id: &str,
    chunk_index: u32,
) -> Result<EncryptedPayload> {
    seal(key, chunk_data, &chunk_aad(file_id, chunk_index), None)
}

/// Decrypt a single file chunk.
///
/// Fails with [`Error::Authentication`] if the chunk was tampered with,
/// belongs to another file, or sits at another index.
pub fn decrypt_chunk(
    key: &AesGcmKey,
    iv: &Nonce,
    encrypted_data: &[u8],
    file_id: &str,
    chunk_index: u32,
) -> Result<Vec<u8>> {
    open(key, iv, encrypted_data, &chunk_aad(file_id, chunk_index))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_basic() {
        let key = AesGcmKey::from_bytes([42u8; 32]);
        let plaintext = b"Hello, World!";

        let sealed = aes_gcm_encrypt(&key, plaintext, None).unwrap();
        let decrypted = aes_gcm_decrypt(&key, &sealed.iv, &sealed.ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
        assert_eq!(sealed.ciphertext.len(), plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = AesGcmKey::from_bytes([42u8; 32]);

        let sealed = aes_gcm_encrypt(&key, b"", None).unwrap();
        let decrypted = aes_gcm_decrypt(&key, &sealed.iv, &sealed.ciphertext).unwrap();

        assert!(decrypted.is_empty());
        assert_eq!(sealed.ciphertext.len(), TAG_SIZE);
    }

    #[test]
    fn test_explicit_iv_is_used() {
        let key = AesGcmKey::from_bytes([1u8; 32]);
        let iv = Nonce::from_bytes([5u8; NONCE_SIZE]);

        let a = aes_gcm_encrypt(&key, b"same", Some(iv)).unwrap();
        let b = aes_gcm_encrypt(&key, b"same", Some(iv)).unwrap();

        assert_eq!(a.iv, iv);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nist_gcm_test_case_13() {
        // AES-256, zero key, zero IV, empty plaintext
        let key = AesGcmKey::from_bytes([0u8; 32]);
        let iv = Nonce::from_bytes([0u8; NONCE_SIZE]);

        let sealed = aes_gcm_encrypt(&key, b"", Some(iv)).unwrap();

        assert_eq!(hex::encode(sealed.ciphertext), "530f8afbc74536b9a963b4f1c4cb738b");
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = AesGcmKey::from_bytes([42u8; 32]);
        let mut sealed = aes_gcm_encrypt(&key, b"Hello, World!", None).unwrap();

        sealed.ciphertext[0] ^= 0x01;

        let result = aes_gcm_decrypt(&key, &sealed.iv, &sealed.ciphertext);
        assert!(matches!(result, Err(Error::Authentication)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = AesGcmKey::from_bytes([42u8; 32]);
        let key2 = AesGcmKey::from_bytes([43u8; 32]);

        let sealed = aes_gcm_encrypt(&key1, b"secret", None).unwrap();
        let result = aes_gcm_decrypt(&key2, &sealed.iv, &sealed.ciphertext);

        assert!(matches!(result, Err(Error::Authentication)));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = AesGcmKey::from_bytes([42u8; 32]);
        let sealed = aes_gcm_encrypt(&key, b"secret", None).unwrap();

        let result = aes_gcm_decrypt(&key, &sealed.iv, &sealed.ciphertext[..TAG_SIZE - 1]);
        assert!(matches!(result, Err(Error::Authentication)));
    }

    #[test]
    fn test_different_nonces_produce_different_ciphertext() {
        let key = AesGcmKey::from_bytes([42u8; 32]);

        let a = aes_gcm_encrypt(&key, b"Hello, World!", None).unwrap();
        let b = aes_gcm_encrypt(&key, b"Hello, World!", None).unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_import_key_length() {
        assert!(import_aes_gcm_key(&[0u8; 32]).is_ok());
        assert!(matches!(import_aes_gcm_key(&[0u8; 31]), Err(Error::KeyImport(_))));
        assert!(matches!(import_aes_gcm_key(&[0u8; 33]), Err(Error::KeyImport(_))));
        assert!(matches!(import_aes_gcm_key(&[]), Err(Error::KeyImport(_))));
    }

    #[test]
    fn test_imported_key_exports_same_bytes() {
        let key = import_aes_gcm_key(&[7u8; 32]).unwrap();
        assert_eq!(*key.export().unwrap(), [7u8; 32]);
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = AesGcmKey::from_bytes([0xAB; 32]);
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("171"));
        assert!(!rendered.contains("bytes"));
    }

    #[test]
    fn test_nonce_from_slice() {
        assert!(Nonce::from_slice(&[0u8; 12]).is_some());
        assert!(Nonce::from_slice(&[0u8; 11]).is_none());
        assert!(Nonce::from_slice(&[0u8; 16]).is_none());
    }

    #[test]
    fn test_chunk_encrypt_decrypt_round_trip() {
        let key = AesGcmKey::from_bytes([42u8; 32]);
        let chunk = b"Hello, this is chunk data!";

        let sealed = encrypt_chunk(&key, chunk, "file-abc-123", 0).unwrap();
        let decrypted = decrypt_chunk(&key, &sealed.iv, &sealed.ciphertext, "file-abc-123", 0).unwrap();

        assert_eq!(decrypted, chunk);
    }

    #[test]
    fn test_chunk_wrong_file_id_fails() {
        let key = AesGcmKey::from_bytes([42u8; 32]);

        let sealed = encrypt_chunk(&key, b"secret chunk", "file-abc", 0).unwrap();
        let result = decrypt_chunk(&key, &sealed.iv, &sealed.ciphertext, "file-wrong", 0);

        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_wrong_index_fails() {
        let key = AesGcmKey::from_bytes([42u8; 32]);

        let sealed = encrypt_chunk(&key, b"secret chunk", "file-abc", 0).unwrap();
        let result = decrypt_chunk(&key, &sealed.iv, &sealed.ciphertext, "file-abc", 1);

        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_not_decryptable_as_plain_payload() {
        let key = AesGcmKey::from_bytes([42u8; 32]);

        let sealed = encrypt_chunk(&key, b"secret chunk", "file-abc", 0).unwrap();

        assert!(aes_gcm_decrypt(&key, &sealed.iv, &sealed.ciphertext).is_err());
    }
}
