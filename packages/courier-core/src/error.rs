//! # Error Handling
//!
//! Error types for Courier Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors                                                        │
//! │  │   ├── KeyImport             - Malformed key material                │
//! │  │   ├── InvalidKey            - Cryptographically invalid point       │
//! │  │   ├── KeyNotExtractable     - Raw export of a sealed key            │
//! │  │   └── KeyDerivationFailed   - HKDF / PBKDF2 failure                 │
//! │  │                                                                      │
//! │  ├── Cipher Errors                                                     │
//! │  │   ├── EncryptionFailed      - AES-GCM encryption failed             │
//! │  │   ├── Authentication        - GCM tag mismatch                      │
//! │  │   ├── Decryption            - Message decryption taxonomy           │
//! │  │   ├── WrongPasswordOrCorruptData - Backup/session unlock failed    │
//! │  │   └── RngUnavailable        - Secure RNG could not be used          │
//! │  │                                                                      │
//! │  └── Format Errors                                                     │
//! │      ├── UnsupportedVersion    - Unknown bundle/blob version           │
//! │      ├── MalformedBlob         - Blob does not match the layout        │
//! │      ├── SerializationError                                            │
//! │      └── DeserializationError                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Structural vs Cryptographic Failure
//!
//! A message that fails base64 or length validation never reached the
//! cipher: that is historical data corruption. A message that fails the
//! GCM tag check was well-formed but the key or bytes are wrong. UIs use
//! [`Error::is_structural`] to pick between the two hints; both still
//! render as "cannot decrypt".

use thiserror::Error;

/// Result type alias for Courier Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Courier Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors (100-199)
    // ========================================================================

    /// Malformed key material (wrong length or format)
    #[error("Key import failed: {0}")]
    KeyImport(String),

    /// Cryptographically invalid key (e.g. low-order X25519 point)
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Raw export requested for a key derived as non-extractable
    #[error("Key is not extractable")]
    KeyNotExtractable,

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Cipher Errors (200-299)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// AES-GCM authentication tag mismatch (tampered data or wrong key)
    #[error("Authentication failed: ciphertext was tampered with or the key is wrong")]
    Authentication,

    /// Message envelope could not be decrypted
    #[error("Decryption failed: {0}")]
    Decryption(#[from] DecryptionError),

    /// Backup or session blob could not be unlocked.
    ///
    /// AES-GCM cannot tell a wrong password from corrupted ciphertext, so
    /// this is deliberately not split further.
    #[error("Wrong password or corrupt data")]
    WrongPasswordOrCorruptData,

    /// The operating system RNG could not be used
    #[error("Secure random number generator unavailable: {0}")]
    RngUnavailable(String),

    // ========================================================================
    // Format Errors (300-399)
    // ========================================================================

    /// Unknown version tag in a bundle or blob
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Encrypted blob does not match the expected layout
    #[error("Malformed blob: {0}")]
    MalformedBlob(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// Ways an [`EncryptedMessage`](crate::protocol::EncryptedMessage) can
/// fail to decrypt.
///
/// The first two variants are structural (the envelope is damaged); the
/// rest are cryptographic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    /// A field is not valid base64
    #[error("field `{field}` is not valid base64")]
    InvalidBase64 {
        /// Envelope field name
        field: &'static str,
    },

    /// A field decoded to the wrong number of bytes
    #[error("field `{field}` has {actual} bytes, expected {expected}")]
    InvalidLength {
        /// Envelope field name
        field: &'static str,
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// The wrapped message key failed authentication
    #[error("could not unwrap message key (wrong key pair or tampered envelope)")]
    UnwrapFailed,

    /// The message body failed authentication
    #[error("message body failed authentication")]
    BodyAuthenticationFailed,

    /// The decrypted body is not UTF-8
    #[error("decrypted message is not valid UTF-8")]
    InvalidUtf8,
}

impl DecryptionError {
    /// True when the envelope was damaged before reaching the cipher
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::InvalidBase64 { .. } | Self::InvalidLength { .. })
    }
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Keys
    /// - 200-299: Ciphers
    /// - 300-399: Formats
    pub fn code(&self) -> i32 {
        match self {
            // Keys (100-199)
            Error::KeyImport(_) => 100,
            Error::InvalidKey(_) => 101,
            Error::KeyNotExtractable => 102,
            Error::KeyDerivationFailed(_) => 103,

            // Ciphers (200-299)
            Error::EncryptionFailed(_) => 200,
            Error::Authentication => 201,
            Error::Decryption(e) => match e {
                DecryptionError::InvalidBase64 { .. } => 210,
                DecryptionError::InvalidLength { .. } => 211,
                DecryptionError::UnwrapFailed => 212,
                DecryptionError::BodyAuthenticationFailed => 213,
                DecryptionError::InvalidUtf8 => 214,
            },
            Error::WrongPasswordOrCorruptData => 220,
            Error::RngUnavailable(_) => 230,

            // Formats (300-399)
            Error::UnsupportedVersion(_) => 300,
            Error::MalformedBlob(_) => 301,
            Error::SerializationError(_) => 302,
            Error::DeserializationError(_) => 303,
        }
    }

    /// Check if the input was structurally invalid rather than
    /// cryptographically rejected
    pub fn is_structural(&self) -> bool {
        match self {
            Error::Decryption(e) => e.is_structural(),
            Error::MalformedBlob(_) | Error::DeserializationError(_) => true,
            _ => false,
        }
    }

    /// Check if retrying the same call could succeed.
    ///
    /// Cryptographic and format failures are deterministic; only a
    /// transient RNG failure is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RngUnavailable(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Error::DeserializationError(err.to_string())
        } else {
            Error::SerializationError(err.to_string())
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
