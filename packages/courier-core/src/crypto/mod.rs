//! # Cryptography Module
//!
//! The primitives the message protocol and the backup codec are built on.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC PRIMITIVES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────┐  ┌───────────────────┐  ┌───────────────────┐   │
//! │  │   asymmetric      │  │    symmetric      │  │       kdf         │   │
//! │  │                   │  │                   │  │                   │   │
//! │  │ • X25519 keypairs │  │ • AES-256-GCM     │  │ • OS CSPRNG       │   │
//! │  │ • ECDH            │  │ • key import      │  │ • HKDF-SHA256     │   │
//! │  │ • wrapping key    │  │ • file chunks     │  │ • PBKDF2-SHA256   │   │
//! │  └─────────┬─────────┘  └─────────▲─────────┘  └─────────▲─────────┘   │
//! │            │                      │                      │             │
//! │            └──────────────────────┴──────────────────────┘             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | X25519 | Wrapping-key agreement |
//! | AES-256-GCM | Message bodies, wrapped keys, backups, file chunks |
//! | HKDF-SHA256 | Shared secret → wrapping key, file keys |
//! | PBKDF2-HMAC-SHA256 | Password → backup / session key |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: secret keys and shared secrets are zeroized on drop
//! 2. **Constant-Time Operations**: dalek and RustCrypto implementations
//! 3. **Secure Random**: `rand::rngs::OsRng`, with no fallback source
//! 4. **Low-Order Points**: rejected before any key is derived from them

mod asymmetric;
mod kdf;
mod symmetric;

pub use asymmetric::{
    derive_wrapping_key, ecdh_shared_secret, generate_x25519_key_pair, KeyPair, PublicKey,
    SharedSecret, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE,
};
pub use kdf::{
    compute_key_fingerprint, derive_file_key, derive_kek, domain, fill_random,
    hkdf_extract_and_expand, import_password, random_bytes, PasswordKey, BACKUP_ITERATIONS,
    MAX_BACKUP_ITERATIONS, MIN_BACKUP_ITERATIONS, SALT_SIZE,
};
pub use symmetric::{
    aes_gcm_decrypt, aes_gcm_encrypt, decrypt_chunk, encrypt_chunk, import_aes_gcm_key,
    AesGcmKey, EncryptedPayload, Nonce, KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
