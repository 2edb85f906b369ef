//! # Message Protocol
//!
//! Encrypts one plaintext message for one recipient and back again. No
//! state is kept between calls: every call takes the keys it needs.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENCRYPTION FLOW                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. mk   = random 32 bytes          (per-message key, used once)       │
//! │     salt = random 16 bytes                                             │
//! │                                                                         │
//! │  2. shared = X25519(my_private, their_public)                          │
//! │                                                                         │
//! │  3. wrap_key = HKDF-SHA256(shared, salt, "courier-wrap-mk-v1")         │
//! │                                                                         │
//! │  4. (iv,  ciphertext) = AES-GCM(mk,       utf8(plaintext))             │
//! │                                                                         │
//! │  5. (iv2, wrappedMk)  = AES-GCM(wrap_key, mk)                          │
//! │                                                                         │
//! │  Output: { iv, ciphertext, salt, iv2, wrappedMk }   (all base64)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decryption runs the same derivation with the recipient's private key
//! and the sender's public key, unwraps `mk`, then opens the body. That
//! order is the only valid decryption path.
//!
//! ## Wire Format
//!
//! ```text
//! {
//!   "iv":         "base64...",   // 12 bytes
//!   "ciphertext": "base64...",   // body ∥ 16-byte tag
//!   "salt":       "base64...",   // 16 bytes
//!   "iv2":        "base64...",   // 12 bytes
//!   "wrappedMk":  "base64..."    // 32-byte mk ∥ 16-byte tag
//! }
//! ```
//!
//! Unknown extra fields are ignored on parse; a missing field is an error.
//!
//! ## Security Properties
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Confidentiality | Only the two key holders can unwrap `mk` |
//! | Integrity | Any modified field fails a GCM tag check |
//! | Forward Secrecy | **None**: a leaked private key opens captured envelopes |

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{
    aes_gcm_decrypt, aes_gcm_encrypt, derive_wrapping_key, domain, ecdh_shared_secret, fill_random,
    import_aes_gcm_key, Nonce, KEY_SIZE, NONCE_SIZE, SALT_SIZE,
};
use crate::error::{DecryptionError, Error, Result};

/// Encrypted message envelope for wire transmission
///
/// Constructed once per plaintext by the sender and consumed once by the
/// recipient. Every field is standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    /// Nonce for the message body (12 bytes)
    pub iv: String,
    /// Message body under `mk`, tag appended
    pub ciphertext: String,
    /// HKDF salt for the wrapping key (16 bytes)
    pub salt: String,
    /// Nonce for wrapping `mk` (12 bytes)
    pub iv2: String,
    /// `mk` under the wrapping key, tag appended
    pub wrapped_mk: String,
}

impl EncryptedMessage {
    /// Serialize to the JSON wire format
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from the JSON wire format
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::DeserializationError(format!("Invalid message envelope: {}", e)))
    }
}

/// Encrypt `plaintext` from the holder of `my_private_key` to the holder
/// of `their_public_key`.
///
/// Consumes randomness for `mk`, the salt and both IVs; has no other side
/// effects.
pub fn encrypt_message(
    my_private_key: &[u8],
    their_public_key: &[u8],
    plaintext: &str,
) -> Result<EncryptedMessage> {
    let mut mk = Zeroizing::new([0u8; KEY_SIZE]);
    fill_random(&mut mk[..])?;
    let mut salt = [0u8; SALT_SIZE];
    fill_random(&mut salt)?;

    let shared = ecdh_shared_secret(my_private_key, their_public_key)?;
    let wrapping_key = derive_wrapping_key(&shared, &salt, domain::WRAP_MESSAGE_KEY)?;

    let body = aes_gcm_encrypt(&import_aes_gcm_key(&mk[..])?, plaintext.as_bytes(), None)?;
    let wrapped = aes_gcm_encrypt(&wrapping_key, &mk[..], None)?;

    tracing::debug!(
        plaintext_len = plaintext.len(),
        ciphertext_len = body.ciphertext.len(),
        "Encrypted message"
    );

    Ok(EncryptedMessage {
        iv: BASE64.encode(body.iv.as_bytes()),
        ciphertext: BASE64.encode(&body.ciphertext),
        salt: BASE64.encode(salt),
        iv2: BASE64.encode(wrapped.iv.as_bytes()),
        wrapped_mk: BASE64.encode(&wrapped.ciphertext),
    })
}

/// Decrypt an envelope sent by the holder of `their_public_key` to the
/// holder of `my_private_key`.
///
/// ## Errors
///
/// - [`DecryptionError::InvalidBase64`] / [`DecryptionError::InvalidLength`]
///   when the envelope is structurally damaged
/// - [`Error::InvalidKey`] when either key is unusable
/// - [`DecryptionError::UnwrapFailed`] when `mk` fails authentication
///   (wrong key pair, or `salt`/`iv2`/`wrappedMk` tampered)
/// - [`DecryptionError::BodyAuthenticationFailed`] when the body fails
///   authentication (`iv`/`ciphertext` tampered)
pub fn decrypt_message(
    my_private_key: &[u8],
    their_public_key: &[u8],
    message: &EncryptedMessage,
) -> Result<String> {
    let iv = decode_nonce("iv", &message.iv)?;
    let ciphertext = decode_field("ciphertext", &message.ciphertext)?;
    let salt = decode_field("salt", &message.salt)?;
    let iv2 = decode_nonce("iv2", &message.iv2)?;
    let wrapped_mk = decode_field("wrappedMk", &message.wrapped_mk)?;

    let shared = ecdh_shared_secret(my_private_key, their_public_key)?;
    let wrapping_key = derive_wrapping_key(&shared, &salt, domain::WRAP_MESSAGE_KEY)?;

    let mk = Zeroizing::new(
        aes_gcm_decrypt(&wrapping_key, &iv2, &wrapped_mk).map_err(|e| match e {
            Error::Authentication => {
                tracing::warn!("Failed to unwrap message key");
                Error::Decryption(DecryptionError::UnwrapFailed)
            }
            other => other,
        })?,
    );
    let message_key = import_aes_gcm_key(&mk)?;

    let plaintext = aes_gcm_decrypt(&message_key, &iv, &ciphertext).map_err(|e| match e {
        Error::Authentication => {
            tracing::warn!("Message body failed authentication");
            Error::Decryption(DecryptionError::BodyAuthenticationFailed)
        }
        other => other,
    })?;

    String::from_utf8(plaintext).map_err(|_| Error::Decryption(DecryptionError::InvalidUtf8))
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|_| Error::Decryption(DecryptionError::InvalidBase64 { field }))
}

fn decode_nonce(field: &'static str, value: &str) -> Result<Nonce> {
    let bytes = decode_field(field, value)?;
    Nonce::from_slice(&bytes).ok_or_else(|| {
        Error::Decryption(DecryptionError::InvalidLength {
            field,
            expected: NONCE_SIZE,
            actual: bytes.len(),
        })
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn alice() -> KeyPair {
        KeyPair::from_private_bytes([1u8; 32])
    }

    fn bob() -> KeyPair {
        KeyPair::from_private_bytes([2u8; 32])
    }

    fn flip_bit(b64: &str, bit: usize) -> String {
        let mut bytes = BASE64.decode(b64).unwrap();
        bytes[bit / 8] ^= 1 << (bit % 8);
        BASE64.encode(bytes)
    }

    #[test]
    fn test_hello_round_trip_with_fixed_keys() {
        let (a, b) = (alice(), bob());

        let msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();
        let plain = decrypt_message(&b.private_bytes()[..], &a.public_bytes(), &msg).unwrap();

        assert_eq!(plain, "hello");
    }

    #[test]
    fn test_round_trip_random_keys_and_payloads() {
        let long = "long ".repeat(2000);
        for plaintext in ["", "x", "unicode ✓ 日本語", long.as_str()] {
            let a = KeyPair::generate().unwrap();
            let b = KeyPair::generate().unwrap();

            let msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), plaintext).unwrap();
            let plain = decrypt_message(&b.private_bytes()[..], &a.public_bytes(), &msg).unwrap();

            assert_eq!(plain, plaintext);
        }
    }

    #[test]
    fn test_field_sizes() {
        let (a, b) = (alice(), bob());
        let msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();

        assert_eq!(BASE64.decode(&msg.iv).unwrap().len(), 12);
        assert_eq!(BASE64.decode(&msg.iv2).unwrap().len(), 12);
        assert_eq!(BASE64.decode(&msg.salt).unwrap().len(), 16);
        assert_eq!(BASE64.decode(&msg.wrapped_mk).unwrap().len(), 32 + 16);
        assert_eq!(BASE64.decode(&msg.ciphertext).unwrap().len(), 5 + 16);
    }

    #[test]
    fn test_fresh_mk_and_salt_per_message() {
        let (a, b) = (alice(), bob());

        let m1 = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "same").unwrap();
        let m2 = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "same").unwrap();

        assert_ne!(m1.salt, m2.salt);
        assert_ne!(m1.wrapped_mk, m2.wrapped_mk);
        assert_ne!(m1.ciphertext, m2.ciphertext);
    }

    #[test]
    fn test_wrong_recipient_cannot_unwrap() {
        let (a, b) = (alice(), bob());
        let eve = KeyPair::from_private_bytes([3u8; 32]);

        let msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();
        let result = decrypt_message(&eve.private_bytes()[..], &a.public_bytes(), &msg);

        assert!(matches!(
            result,
            Err(Error::Decryption(DecryptionError::UnwrapFailed))
        ));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let (a, b) = (alice(), bob());
        let msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();
        let b_private = b.private_bytes();
        let a_public = a.public_bytes();

        let fields: [(&str, fn(&mut EncryptedMessage) -> &mut String, DecryptionError); 4] = [
            ("ciphertext", |m| &mut m.ciphertext, DecryptionError::BodyAuthenticationFailed),
            ("iv", |m| &mut m.iv, DecryptionError::BodyAuthenticationFailed),
            ("wrappedMk", |m| &mut m.wrapped_mk, DecryptionError::UnwrapFailed),
            ("iv2", |m| &mut m.iv2, DecryptionError::UnwrapFailed),
        ];

        for (name, field, expected) in fields {
            let mut probe = msg.clone();
            let bits = BASE64.decode(field(&mut probe)).unwrap().len() * 8;

            for bit in 0..bits {
                let mut tampered = msg.clone();
                let slot = field(&mut tampered);
                *slot = flip_bit(slot, bit);

                match decrypt_message(&b_private[..], &a_public, &tampered) {
                    Err(Error::Decryption(kind)) => assert_eq!(kind, expected, "{} bit {}", name, bit),
                    other => panic!("{} bit {} was not rejected: {:?}", name, bit, other),
                }
            }
        }
    }

    #[test]
    fn test_tampered_salt_fails_unwrap() {
        let (a, b) = (alice(), bob());
        let mut msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();
        msg.salt = flip_bit(&msg.salt, 0);

        let result = decrypt_message(&b.private_bytes()[..], &a.public_bytes(), &msg);

        assert!(matches!(
            result,
            Err(Error::Decryption(DecryptionError::UnwrapFailed))
        ));
    }

    #[test]
    fn test_malformed_base64_is_structural() {
        let (a, b) = (alice(), bob());
        let mut msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();
        msg.ciphertext = "not base64!!".into();

        let err = decrypt_message(&b.private_bytes()[..], &a.public_bytes(), &msg).unwrap_err();

        assert!(matches!(
            err,
            Error::Decryption(DecryptionError::InvalidBase64 { field: "ciphertext" })
        ));
        assert!(err.is_structural());
    }

    #[test]
    fn test_wrong_length_iv_is_structural() {
        let (a, b) = (alice(), bob());
        let mut msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();
        msg.iv2 = BASE64.encode([0u8; 16]);

        let err = decrypt_message(&b.private_bytes()[..], &a.public_bytes(), &msg).unwrap_err();

        assert!(matches!(
            err,
            Error::Decryption(DecryptionError::InvalidLength {
                field: "iv2",
                expected: 12,
                actual: 16
            })
        ));
        assert!(err.is_structural());
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let a = alice();

        assert!(matches!(
            encrypt_message(&a.private_bytes()[..], &[0u8; 32], "hello"),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(
            encrypt_message(&a.private_bytes()[..], &[1u8; 12], "hello"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_json_wire_format() {
        let (a, b) = (alice(), bob());
        let msg = encrypt_message(&a.private_bytes()[..], &b.public_bytes(), "hello").unwrap();

        let json = msg.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 5);
        for key in ["iv", "ciphertext", "salt", "iv2", "wrappedMk"] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert_eq!(EncryptedMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_json_ignores_unknown_and_requires_all_fields() {
        let with_extra = r#"{"iv":"a","ciphertext":"b","salt":"c","iv2":"d","wrappedMk":"e","v":2}"#;
        let missing = r#"{"iv":"a","ciphertext":"b","salt":"c","iv2":"d"}"#;

        let parsed = EncryptedMessage::from_json(with_extra).unwrap();

        assert_eq!(parsed.wrapped_mk, "e");
        assert!(matches!(
            EncryptedMessage::from_json(missing),
            Err(Error::DeserializationError(_))
        ));
    }
}
