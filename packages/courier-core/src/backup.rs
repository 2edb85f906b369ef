//! # Encrypted Backups
//!
//! Protects a private-key bundle under a password so it can be stored
//! server-side, and restores it again.
//!
//! ## Backup Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          BACKUP FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  PrivateKeyBundle { version: 1, private_key }                          │
//! │        │ serialize_bundle (bincode)                                    │
//! │        ▼                                                                │
//! │  bundle bytes ──► AES-256-GCM ◄── KEK = PBKDF2(password, salt, 210k)   │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  EncryptedBackupBlob { purpose, iterations, salt, iv, ciphertext }     │
//! │        │ encode_blob                                                   │
//! │        ▼                                                                │
//! │  opaque base64 string  ──►  stored by the caller                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Blob Layout
//!
//! ```text
//! ┌────────┬─────────┬────────────────┬──────────┬────────┬────────────────┐
//! │ format │ purpose │ iterations     │ salt     │ iv     │ ciphertext     │
//! │ u8 = 1 │ u8      │ u32 big-endian │ 16 bytes │ 12 b   │ >= 16 bytes    │
//! └────────┴─────────┴────────────────┴──────────┴────────┴────────────────┘
//! ```
//!
//! A failed unlock is always [`Error::WrongPasswordOrCorruptData`]:
//! AES-GCM cannot tell the two apart.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{
    aes_gcm_decrypt, aes_gcm_encrypt, derive_kek, fill_random, import_password, KeyPair, Nonce,
    BACKUP_ITERATIONS, MAX_BACKUP_ITERATIONS, NONCE_SIZE, SALT_SIZE, TAG_SIZE,
};
use crate::error::{Error, Result};

/// Current private-key bundle version
pub const PRIVATE_KEY_BUNDLE_VERSION: u32 = 1;

/// Current blob format byte
pub const BLOB_FORMAT_VERSION: u8 = 1;

const BLOB_HEADER_SIZE: usize = 1 + 1 + 4 + SALT_SIZE + NONCE_SIZE;

/// Private key material for one identity, as stored inside a backup
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyBundle {
    /// Layout version
    pub version: u32,
    /// Raw X25519 private key
    pub private_key: Vec<u8>,
}

impl PrivateKeyBundle {
    /// Bundle a private key at the current version
    pub fn new(private_key: Vec<u8>) -> Self {
        Self {
            version: PRIVATE_KEY_BUNDLE_VERSION,
            private_key,
        }
    }

    /// Bundle the private half of a key pair
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        Self::new(key_pair.private_bytes().to_vec())
    }

    /// Rebuild the key pair held in this bundle
    pub fn to_key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_private_slice(&self.private_key)
    }
}

impl std::fmt::Debug for PrivateKeyBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKeyBundle")
            .field("version", &self.version)
            .field("private_key_len", &self.private_key.len())
            .finish()
    }
}

#[derive(Deserialize)]
struct BundleHeader {
    version: u32,
}

/// Serialize a bundle to bytes.
///
/// Only the current version can be written.
pub fn serialize_bundle(bundle: &PrivateKeyBundle) -> Result<Vec<u8>> {
    if bundle.version != PRIVATE_KEY_BUNDLE_VERSION {
        return Err(Error::UnsupportedVersion(bundle.version));
    }
    Ok(bincode::serialize(bundle)?)
}

/// Deserialize a bundle.
///
/// The version tag is read first; unknown versions are rejected before
/// the rest of the layout is interpreted.
pub fn deserialize_bundle(bytes: &[u8]) -> Result<PrivateKeyBundle> {
    let header: BundleHeader = bincode::deserialize(bytes)
        .map_err(|e| Error::DeserializationError(format!("Invalid bundle header: {}", e)))?;

    match header.version {
        PRIVATE_KEY_BUNDLE_VERSION => bincode::deserialize(bytes)
            .map_err(|e| Error::DeserializationError(format!("Invalid bundle: {}", e))),
        other => Err(Error::UnsupportedVersion(other)),
    }
}

/// What an encrypted blob protects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobPurpose {
    /// A [`PrivateKeyBundle`]
    KeyBackup,
    /// An opaque session record (see [`crate::session`])
    SessionRecord,
}

impl BlobPurpose {
    /// Get the numeric tag
    pub fn code(&self) -> u8 {
        match self {
            Self::KeyBackup => 1,
            Self::SessionRecord => 2,
        }
    }

    /// Parse from numeric tag
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::KeyBackup),
            2 => Some(Self::SessionRecord),
            _ => None,
        }
    }
}

/// Password-encrypted data plus everything needed to re-derive the key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBackupBlob {
    /// What the ciphertext holds
    pub purpose: BlobPurpose,
    /// PBKDF2 iteration count used for the KEK
    pub iterations: u32,
    /// PBKDF2 salt
    pub salt: [u8; SALT_SIZE],
    /// AES-GCM nonce
    pub iv: Nonce,
    /// AES-GCM ciphertext with tag
    pub ciphertext: Vec<u8>,
}

/// Encode a blob as an opaque, transport-safe string
pub fn encode_blob(blob: &EncryptedBackupBlob) -> String {
    let mut out = Vec::with_capacity(BLOB_HEADER_SIZE + blob.ciphertext.len());
    out.put_u8(BLOB_FORMAT_VERSION);
    out.put_u8(blob.purpose.code());
    out.put_u32(blob.iterations);
    out.put_slice(&blob.salt);
    out.put_slice(blob.iv.as_bytes());
    out.put_slice(&blob.ciphertext);
    BASE64.encode(out)
}

/// Decode a string produced by [`encode_blob`]
pub fn decode_blob(encoded: &str) -> Result<EncryptedBackupBlob> {
    let raw = BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::MalformedBlob(format!("Invalid base64: {}", e)))?;

    if raw.is_empty() {
        return Err(Error::MalformedBlob("Empty blob".into()));
    }

    let mut buf = raw.as_slice();
    let format = buf.get_u8();
    if format != BLOB_FORMAT_VERSION {
        return Err(Error::UnsupportedVersion(u32::from(format)));
    }

    if raw.len() < BLOB_HEADER_SIZE + TAG_SIZE {
        return Err(Error::MalformedBlob(format!(
            "Blob is {} bytes, need at least {}",
            raw.len(),
            BLOB_HEADER_SIZE + TAG_SIZE
        )));
    }

    let purpose_code = buf.get_u8();
    let purpose = BlobPurpose::from_code(purpose_code)
        .ok_or_else(|| Error::MalformedBlob(format!("Unknown blob purpose {}", purpose_code)))?;

    let iterations = buf.get_u32();
    check_iterations(iterations)?;

    let mut salt = [0u8; SALT_SIZE];
    buf.copy_to_slice(&mut salt);
    let mut iv = [0u8; NONCE_SIZE];
    buf.copy_to_slice(&mut iv);

    Ok(EncryptedBackupBlob {
        purpose,
        iterations,
        salt,
        iv: Nonce::from_bytes(iv),
        ciphertext: buf.to_vec(),
    })
}

fn check_iterations(iterations: u32) -> Result<()> {
    if iterations == 0 || iterations > MAX_BACKUP_ITERATIONS {
        return Err(Error::MalformedBlob(format!(
            "Iteration count {} outside 1..={}",
            iterations, MAX_BACKUP_ITERATIONS
        )));
    }
    Ok(())
}

/// Encrypt `plaintext` under a password-derived key
pub(crate) fn seal_with_password(
    password: &str,
    plaintext: &[u8],
    purpose: BlobPurpose,
    iterations: u32,
) -> Result<EncryptedBackupBlob> {
    if iterations > MAX_BACKUP_ITERATIONS {
        return Err(Error::KeyDerivationFailed(format!(
            "Iteration count {} exceeds {}",
            iterations, MAX_BACKUP_ITERATIONS
        )));
    }
    let mut salt = [0u8; SALT_SIZE];
    fill_random(&mut salt)?;

    let kek = derive_kek(&import_password(password), &salt, iterations, false)?;
    let sealed = aes_gcm_encrypt(&kek, plaintext, None)?;

    Ok(EncryptedBackupBlob {
        purpose,
        iterations,
        salt,
        iv: sealed.iv,
        ciphertext: sealed.ciphertext,
    })
}

/// Decrypt a blob sealed by [`seal_with_password`]
pub(crate) fn open_with_password(
    password: &str,
    blob: &EncryptedBackupBlob,
    expected: BlobPurpose,
) -> Result<Zeroizing<Vec<u8>>> {
    if blob.purpose != expected {
        return Err(Error::MalformedBlob(format!(
            "Expected a {:?} blob, found {:?}",
            expected, blob.purpose
        )));
    }
    check_iterations(blob.iterations)?;

    let kek = derive_kek(&import_password(password), &blob.salt, blob.iterations, false)?;
    let plaintext = aes_gcm_decrypt(&kek, &blob.iv, &blob.ciphertext).map_err(|e| match e {
        Error::Authentication => {
            tracing::warn!(purpose = ?blob.purpose, "Failed to unlock password-protected blob");
            Error::WrongPasswordOrCorruptData
        }
        other => other,
    })?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt a bundle with the standard 210,000 PBKDF2 iterations
pub fn encrypt_backup_with_password(
    password: &str,
    bundle: &PrivateKeyBundle,
) -> Result<EncryptedBackupBlob> {
    encrypt_backup_with_iterations(password, bundle, BACKUP_ITERATIONS)
}

/// Encrypt a bundle with an explicit PBKDF2 iteration count
pub fn encrypt_backup_with_iterations(
    password: &str,
    bundle: &PrivateKeyBundle,
    iterations: u32,
) -> Result<EncryptedBackupBlob> {
    let serialized = Zeroizing::new(serialize_bundle(bundle)?);
    let blob = seal_with_password(password, &serialized, BlobPurpose::KeyBackup, iterations)?;

    tracing::info!(
        bundle_version = bundle.version,
        iterations,
        "Created encrypted key backup"
    );
    Ok(blob)
}

/// Decrypt a backup blob.
///
/// Uses the salt and iteration count stored in the blob. Fails with
/// [`Error::WrongPasswordOrCorruptData`] when authentication fails.
pub fn decrypt_backup_with_password(
    password: &str,
    blob: &EncryptedBackupBlob,
) -> Result<PrivateKeyBundle> {
    let plaintext = open_with_password(password, blob, BlobPurpose::KeyBackup)?;
    deserialize_bundle(&plaintext)
}

// ============================================================================
// TESTS
// ============================================================================
