//! Command implementations.
//!
//! Each command returns the text to print on stdout so it can be tested
//! without spawning the binary. Identity files are always stored as
//! password-encrypted backup blobs; the private key never touches disk in
//! the clear.

use std::fs;
use std::io::Read;
use std::path::Path;

use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use courier_core::backup::{decode_blob, BlobPurpose};
use courier_core::obfuscation::{add_padding, remove_padding};
use courier_core::{CoreConfig, CryptoSession, PublicKey};

/// Options shared by every command
#[derive(Clone)]
pub struct Settings {
    /// Password protecting the identity file
    pub password: Option<String>,
    /// Library configuration
    pub config: CoreConfig,
}

impl Settings {
    fn password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .ok_or_else(|| eyre!("a password is required (--password or COURIER_PASSWORD)"))
    }
}

/// Read `value`, or stdin when it is `-`
pub fn read_input(value: &str) -> Result<String> {
    if value != "-" {
        return Ok(value.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .wrap_err("failed to read stdin")?;
    Ok(buf.trim_end_matches(&['\r', '\n'][..]).to_string())
}

fn write_blob(path: &Path, blob: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, format!("{}\n", blob))
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn read_blob(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    Ok(text.trim().to_string())
}

fn describe(session: &CryptoSession) -> String {
    serde_json::json!({
        "publicKey": session.public_key().to_hex(),
        "fingerprint": session.fingerprint(),
    })
    .to_string()
}

/// Unlock the identity stored at `path`
pub fn load_identity(settings: &Settings, path: &Path) -> Result<CryptoSession> {
    let blob = read_blob(path)?;
    CryptoSession::restore_from_backup(settings.password()?, &blob, settings.config.clone())
        .wrap_err_with(|| format!("failed to unlock identity {}", path.display()))
}

/// Generate a key pair and store it encrypted at `path`
pub fn keygen(settings: &Settings, path: &Path, force: bool) -> Result<String> {
    let session = CryptoSession::generate(settings.config.clone())?;
    let blob = session.export_backup(settings.password()?)?;
    write_blob(path, &blob, force)?;

    tracing::info!(path = %path.display(), fingerprint = %session.fingerprint(), "Identity created");
    Ok(describe(&session))
}

/// Show the public half of an identity
pub fn show_public_key(settings: &Settings, path: &Path) -> Result<String> {
    Ok(describe(&load_identity(settings, path)?))
}

/// Encrypt `plaintext` for the holder of `recipient` (hex public key)
pub fn encrypt(settings: &Settings, identity: &Path, recipient: &str, plaintext: &str) -> Result<String> {
    let session = load_identity(settings, identity)?;
    let their_public = PublicKey::from_hex(recipient).wrap_err("invalid recipient key")?;
    Ok(session.seal_for_transport(&their_public, plaintext)?)
}

/// Decrypt a wire message from the holder of `sender` (hex public key)
pub fn decrypt(settings: &Settings, identity: &Path, sender: &str, wire: &str) -> Result<String> {
    let session = load_identity(settings, identity)?;
    let their_public = PublicKey::from_hex(sender).wrap_err("invalid sender key")?;

    session.open_from_transport(&their_public, wire).map_err(|e| {
        if e.is_structural() {
            eyre!("message is corrupted and cannot be decrypted: {}", e)
        } else {
            eyre!("message cannot be decrypted: {}", e)
        }
    })
}

/// Re-encrypt the identity at `identity` under `backup_password` into `out`
pub fn backup_create(
    settings: &Settings,
    identity: &Path,
    out: &Path,
    backup_password: &str,
    force: bool,
) -> Result<String> {
    let session = load_identity(settings, identity)?;
    write_blob(out, &session.export_backup(backup_password)?, force)?;

    tracing::info!(out = %out.display(), "Backup written");
    Ok(describe(&session))
}

/// Unlock a backup with `backup_password` and store it as an identity
/// protected by the identity password
pub fn backup_restore(
    settings: &Settings,
    backup: &Path,
    backup_password: &str,
    identity: &Path,
    force: bool,
) -> Result<String> {
    let blob = read_blob(backup)?;
    let session = CryptoSession::restore_from_backup(backup_password, &blob, settings.config.clone())
        .wrap_err("failed to unlock backup")?;
    write_blob(identity, &session.export_backup(settings.password()?)?, force)?;

    tracing::info!(identity = %identity.display(), "Backup restored");
    Ok(describe(&session))
}

/// Describe a blob's header without decrypting it
pub fn backup_inspect(path: &Path) -> Result<String> {
    let blob = decode_blob(&read_blob(path)?)?;
    let purpose = match blob.purpose {
        BlobPurpose::KeyBackup => "key-backup",
        BlobPurpose::SessionRecord => "session-record",
    };
    Ok(serde_json::json!({
        "purpose": purpose,
        "iterations": blob.iterations,
        "ciphertextLength": blob.ciphertext.len(),
    })
    .to_string())
}

/// Pad a string for transport
pub fn pad(data: &str) -> Result<String> {
    Ok(add_padding(data)?)
}

/// Strip padding, passing unpadded input through
pub fn unpad(data: &str) -> String {
    remove_padding(data)
}
