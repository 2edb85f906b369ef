//! # Message Demo
//!
//! Walks through a message exchange between two parties, then a backup
//! and restore of one identity.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example message_demo
//! ```

use courier_core::crypto::KeyPair;
use courier_core::obfuscation::{add_padding, remove_padding};
use courier_core::{decrypt_message, encrypt_message, CoreConfig, CryptoSession, EncryptedMessage};

fn main() {
    println!("=== Courier Core: Message Encryption Demo ===\n");

    // Step 1: Create two parties (Alice and Bob)
    println!("Step 1: Creating key pairs for Alice and Bob...");

    let alice = KeyPair::from_private_bytes([1u8; 32]); // In production, use KeyPair::generate()
    let bob = KeyPair::from_private_bytes([2u8; 32]);

    println!("  Alice's public key: {}...", &alice.public_key().to_hex()[..16]);
    println!("  Bob's public key:   {}...", &bob.public_key().to_hex()[..16]);
    println!();

    // Step 2: Alice encrypts for Bob
    println!("Step 2: Alice encrypts a message for Bob...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                   MESSAGE WRAPPING FLOW                     │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │   random mk ──► AES-GCM(plaintext) ──► iv, ciphertext       │");
    println!("  │       │                                                     │");
    println!("  │       ▼                                                     │");
    println!("  │   X25519(alice, bob) ──► HKDF(salt) ──► wrapping key        │");
    println!("  │       │                                                     │");
    println!("  │       ▼                                                     │");
    println!("  │   AES-GCM(mk) under wrapping key ──► iv2, wrappedMk         │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let plaintext = "Hello Bob! This message is end-to-end encrypted.";
    let message = encrypt_message(
        &alice.private_bytes()[..],
        bob.public_key().as_bytes(),
        plaintext,
    )
    .expect("Encryption failed");

    let json = message.to_json().expect("Serialization failed");
    println!("  Envelope JSON ({} bytes):", json.len());
    println!("  {}", json);
    println!();

    // Step 3: Pad for transport
    println!("Step 3: Padding the envelope to hide its length...");
    let padded = add_padding(&json).expect("Padding failed");
    println!("  Padded wire string: {} base64 chars", padded.len());
    println!();

    // Step 4: Bob decrypts
    println!("Step 4: Bob strips padding and decrypts...");
    let received = EncryptedMessage::from_json(&remove_padding(&padded)).expect("Parse failed");
    let decrypted = decrypt_message(
        &bob.private_bytes()[..],
        alice.public_key().as_bytes(),
        &received,
    )
    .expect("Decryption failed");
    println!("  Decrypted: \"{}\"", decrypted);
    assert_eq!(decrypted, plaintext);
    println!();

    // Step 5: Tampering is detected
    println!("Step 5: Tampering with the ciphertext...");
    let mut tampered = received.clone();
    tampered.ciphertext = received.wrapped_mk.clone();
    match decrypt_message(
        &bob.private_bytes()[..],
        alice.public_key().as_bytes(),
        &tampered,
    ) {
        Ok(_) => println!("  Unexpected success"),
        Err(e) => println!("  Rejected: {} (code {})", e, e.code()),
    }
    println!();

    // Step 6: Backup and restore
    println!("Step 6: Backing up Alice's key with a password...");
    let session = CryptoSession::new(alice, CoreConfig::default()).expect("Invalid config");
    let backup = session.export_backup("correct horse battery staple").expect("Backup failed");
    println!("  Backup blob: {}...", &backup[..32]);

    let restored = CryptoSession::restore_from_backup(
        "correct horse battery staple",
        &backup,
        CoreConfig::default(),
    )
    .expect("Restore failed");
    println!("  Restored fingerprint: {}", restored.fingerprint());
    println!("  Original fingerprint: {}", session.fingerprint());
    assert_eq!(restored.public_key(), session.public_key());
    println!();

    println!("=== Demo complete ===");
}
