//! Password-encrypted session records.
//!
//! Uses the same blob format and key derivation as [`crate::backup`],
//! tagged [`BlobPurpose::SessionRecord`] so a session blob is never
//! accepted where a key backup is expected, and the other way round.

use zeroize::Zeroizing;

use crate::backup::{open_with_password, seal_with_password, BlobPurpose, EncryptedBackupBlob};
use crate::crypto::BACKUP_ITERATIONS;
use crate::error::Result;

/// Encrypt an opaque session record under a password
pub fn encrypt_session_record(password: &str, record: &[u8]) -> Result<EncryptedBackupBlob> {
    encrypt_session_record_with_iterations(password, record, BACKUP_ITERATIONS)
}

/// Encrypt a session record with an explicit PBKDF2 iteration count
pub fn encrypt_session_record_with_iterations(
    password: &str,
    record: &[u8],
    iterations: u32,
) -> Result<EncryptedBackupBlob> {
    let blob = seal_with_password(password, record, BlobPurpose::SessionRecord, iterations)?;
    tracing::debug!(record_len = record.len(), "Encrypted session record");
    Ok(blob)
}

/// Decrypt a session record.
///
/// Fails with [`crate::Error::WrongPasswordOrCorruptData`] on a bad
/// password or tampered blob.
pub fn decrypt_session_record(
    password: &str,
    blob: &EncryptedBackupBlob,
) -> Result<Zeroizing<Vec<u8>>> {
    open_with_password(password, blob, BlobPurpose::SessionRecord)
}
