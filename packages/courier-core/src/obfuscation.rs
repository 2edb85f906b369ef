//! # Padding
//!
//! Pads payloads to a fixed set of sizes so an observer cannot tell
//! messages apart by length.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────┬──────────────────────────┐
//! │ length (u32) │ payload                  │ random filler            │
//! │ little-endian│ `length` bytes           │ up to the bucket size    │
//! └──────────────┴──────────────────────────┴──────────────────────────┘
//!   total = smallest bucket in {64, 128, 256, 512, 1024, 2048, 4096}
//!           that is >= 4 + len(payload), or exactly 4 + len(payload)
//!           when that exceeds 4096
//! ```
//!
//! Bucket choice is deterministic; only the filler is random. The padded
//! bytes are base64 encoded for transport.
//!
//! [`remove_padding`] also accepts messages from clients that never
//! padded: anything that does not parse as a padded payload is returned
//! unchanged, and the caller validates it downstream.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::{Buf, BufMut};

use crate::crypto::fill_random;
use crate::error::{Error, Result};

/// Allowed padded sizes, smallest first
pub const PADDING_BUCKETS: [usize; 7] = [64, 128, 256, 512, 1024, 2048, 4096];

/// Size of the little-endian length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Total padded size for a payload of `payload_len` bytes
pub fn padded_len(payload_len: usize) -> usize {
    let needed = LENGTH_PREFIX_SIZE + payload_len;
    PADDING_BUCKETS
        .iter()
        .copied()
        .find(|bucket| *bucket >= needed)
        .unwrap_or(needed)
}

/// Pad raw bytes to their bucket size.
///
/// Fails only if the RNG is unavailable or the payload does not fit a
/// 32-bit length prefix.
pub fn pad_bytes(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        Error::SerializationError(format!("payload of {} bytes is too large to pad", payload.len()))
    })?;
    let total = padded_len(payload.len());

    let mut out = Vec::with_capacity(total);
    out.put_u32_le(len);
    out.put_slice(payload);

    let filled = out.len();
    out.resize(total, 0);
    fill_random(&mut out[filled..])?;

    tracing::debug!(payload_len = payload.len(), bucket = total, "Padded payload");
    Ok(out)
}

/// Recover the payload from bytes produced by [`pad_bytes`].
///
/// Returns `None` unless the length prefix fits and the total size is
/// exactly the size [`pad_bytes`] would have produced for that payload.
pub fn unpad_bytes(padded: &[u8]) -> Option<&[u8]> {
    if padded.len() < LENGTH_PREFIX_SIZE {
        return None;
    }

    let mut prefix = &padded[..LENGTH_PREFIX_SIZE];
    let len = usize::try_from(prefix.get_u32_le()).ok()?;
    let end = LENGTH_PREFIX_SIZE.checked_add(len)?;

    if end > padded.len() || padded_len(len) != padded.len() {
        return None;
    }

    Some(&padded[LENGTH_PREFIX_SIZE..end])
}

/// Pad a UTF-8 string and base64 encode the result
pub fn add_padding(data: &str) -> Result<String> {
    Ok(BASE64.encode(pad_bytes(data.as_bytes())?))
}

/// Reverse [`add_padding`].
///
/// Input that is not valid base64, not a padded payload, or not UTF-8 is
/// returned unchanged. This includes a well-formed length prefix whose
/// total size is not the bucket size [`pad_bytes`] would have chosen.
/// The return value is therefore either the original
/// string or a pass-through of unpadded input; callers must validate it
/// (for example by parsing it as JSON).
pub fn remove_padding(padded_base64: &str) -> String {
    match try_remove_padding(padded_base64) {
        Some(data) => data,
        None => {
            tracing::warn!(
                input_len = padded_base64.len(),
                "Input is not a padded payload, passing through"
            );
            padded_base64.to_string()
        }
    }
}

fn try_remove_padding(padded_base64: &str) -> Option<String> {
    let decoded = BASE64.decode(padded_base64).ok()?;
    let payload = unpad_bytes(&decoded)?;
    String::from_utf8(payload.to_vec()).ok()
}

// ============================================================================
// TESTS
// ============================================================================
