//! Courier CLI
//!
//! A thin command-line front end over `courier-core`:
//!
//! 1. **Identities**: generate an X25519 key pair and keep it on disk as a
//!    password-encrypted blob.
//!
//! 2. **Messages**: encrypt for a peer's public key, or decrypt a peer's
//!    wire message, with size-bucket padding applied on the way out.
//!
//! 3. **Backups**: re-encrypt an identity under a separate backup
//!    password, restore it on another device, or inspect a blob header.
//!
//! Logs go to stderr; stdout carries only command output.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use courier_core::crypto::BACKUP_ITERATIONS;
use courier_core::CoreConfig;

use commands::Settings;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "courier", version, about = "End-to-end encryption toolkit for Courier chat")]
struct Args {
    /// Password protecting the identity file
    #[arg(long, env = "COURIER_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// PBKDF2 iterations for newly written identity and backup blobs
    #[arg(long, default_value_t = BACKUP_ITERATIONS, env = "COURIER_BACKUP_ITERATIONS", global = true)]
    backup_iterations: u32,

    /// Send envelopes without size-bucket padding
    #[arg(long, global = true)]
    no_padding: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new identity
    Keygen {
        /// Where to store the encrypted identity
        #[arg(short, long, default_value = "courier.key")]
        identity: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the public key and fingerprint of an identity
    Pubkey {
        #[arg(short, long, default_value = "courier.key")]
        identity: PathBuf,
    },

    /// Encrypt a message for a peer
    Encrypt {
        #[arg(short, long, default_value = "courier.key")]
        identity: PathBuf,

        /// Recipient public key (hex)
        #[arg(long)]
        to: String,

        /// Message text, or `-` to read stdin
        message: String,
    },

    /// Decrypt a message from a peer
    Decrypt {
        #[arg(short, long, default_value = "courier.key")]
        identity: PathBuf,

        /// Sender public key (hex)
        #[arg(long)]
        from: String,

        /// Wire message, or `-` to read stdin
        message: String,
    },

    /// Manage password-protected backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Pad a string into a size bucket (base64 output)
    Pad {
        /// Text, or `-` to read stdin
        data: String,
    },

    /// Strip padding; unpadded input is echoed unchanged
    Unpad {
        /// Padded text, or `-` to read stdin
        data: String,
    },
}

#[derive(Subcommand, Debug)]
enum BackupAction {
    /// Write a backup of an identity under a separate password
    Create {
        #[arg(short, long, default_value = "courier.key")]
        identity: PathBuf,

        /// Backup file to write
        #[arg(short, long)]
        out: PathBuf,

        /// Password for the backup
        #[arg(long, env = "COURIER_BACKUP_PASSWORD", hide_env_values = true)]
        backup_password: String,

        #[arg(long)]
        force: bool,
    },

    /// Restore an identity from a backup
    Restore {
        /// Backup file to read
        #[arg(long)]
        from: PathBuf,

        #[arg(long, env = "COURIER_BACKUP_PASSWORD", hide_env_values = true)]
        backup_password: String,

        /// Where to store the restored identity
        #[arg(short, long, default_value = "courier.key")]
        identity: PathBuf,

        #[arg(long)]
        force: bool,
    },

    /// Show a blob's header without decrypting it
    Inspect {
        /// Blob file
        path: PathBuf,
    },
}

// ── Entry Point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=info,courier_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = Settings {
        password: args.password,
        config: CoreConfig {
            backup_iterations: args.backup_iterations,
            padding_enabled: !args.no_padding,
        },
    };
    settings.config.validate()?;

    tracing::debug!(
        version = courier_core::version(),
        iterations = settings.config.backup_iterations,
        padding = settings.config.padding_enabled,
        "Starting"
    );

    let output = match args.command {
        Command::Keygen { identity, force } => commands::keygen(&settings, &identity, force)?,
        Command::Pubkey { identity } => commands::show_public_key(&settings, &identity)?,
        Command::Encrypt {
            identity,
            to,
            message,
        } => commands::encrypt(&settings, &identity, &to, &commands::read_input(&message)?)?,
        Command::Decrypt {
            identity,
            from,
            message,
        } => commands::decrypt(&settings, &identity, &from, &commands::read_input(&message)?)?,
        Command::Backup { action } => match action {
            BackupAction::Create {
                identity,
                out,
                backup_password,
                force,
            } => commands::backup_create(&settings, &identity, &out, &backup_password, force)?,
            BackupAction::Restore {
                from,
                backup_password,
                identity,
                force,
            } => commands::backup_restore(&settings, &from, &backup_password, &identity, force)?,
            BackupAction::Inspect { path } => commands::backup_inspect(&path)?,
        },
        Command::Pad { data } => commands::pad(&commands::read_input(&data)?)?,
        Command::Unpad { data } => commands::unpad(&commands::read_input(&data)?),
    };

    println!("{}", output);
    Ok(())
}
