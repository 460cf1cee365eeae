//! Identifier sanitization
//!
//! Maps user-supplied names (user ids, database/table names, record ids)
//! onto filesystem-safe tokens. Escaping is injective: two distinct accepted
//! identifiers can never produce the same token, so no two logical entities
//! can collide on disk.

use crate::error::{Error, Result};

/// Maximum accepted identifier length in bytes
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Windows device names that cannot be used as file names
const RESERVED: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Sanitize a raw identifier into a path segment
///
/// ASCII alphanumerics and `-` pass through unchanged; every other byte is
/// escaped as `_` plus two lowercase hex digits. Since `_` itself is always
/// escaped, the mapping is injective. Inputs that are empty, longer than
/// [`MAX_IDENTIFIER_LEN`], contain a path separator or NUL, or start with a
/// dot are rejected with [`Error::InvalidIdentifier`].
pub fn sanitize(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(Error::InvalidIdentifier("empty identifier".to_string()));
    }
    if raw.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "identifier exceeds {} bytes",
            MAX_IDENTIFIER_LEN
        )));
    }
    if raw.contains('/') || raw.contains('\\') || raw.contains('\0') {
        return Err(Error::InvalidIdentifier(format!(
            "path separator or NUL in {:?}",
            raw
        )));
    }
    if raw.starts_with('.') {
        return Err(Error::InvalidIdentifier(format!("leading dot in {:?}", raw)));
    }

    // Device names would still resolve after pass-through, so force their
    // first byte into escaped form.
    let defuse_first = RESERVED.contains(&raw.to_ascii_lowercase().as_str());

    let mut out = String::with_capacity(raw.len());
    for (i, b) in raw.bytes().enumerate() {
        let plain = b.is_ascii_alphanumeric() || b == b'-';
        if plain && !(defuse_first && i == 0) {
            out.push(b as char);
        } else {
            out.push('_');
            out.push_str(&format!("{:02x}", b));
        }
    }
    Ok(out)
}

/// Recover the original identifier from a sanitized token
///
/// Inverse of [`sanitize`] over its outputs. Bytes that do not form a valid
/// `_xx` escape are kept literally, so foreign directory names survive a
/// round trip unchanged.
pub fn restore(token: &str) -> String {
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
