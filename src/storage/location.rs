use sha2::{Digest, Sha256};

const HASH_MODULUS: u64 = 100_000_000;

/// Derive the integer location key from a portal location code.
///
/// `"V1-D-1003990"` yields `1003990`. Codes whose trailing segment is not a
/// non-negative `i64` fall back to a stable hash below 10^8; an empty code
/// maps to 0.
pub fn location_id(code: &str) -> i64 {
    let code = code.trim();
    if code.is_empty() {
        return 0;
    }

    let last = code.rsplit('-').next().unwrap_or(code);
    if let Some(id) = last.trim().parse::<i64>().ok().filter(|id| *id >= 0) {
        return id;
    }

    let digest = Sha256::digest(code.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % HASH_MODULUS) as i64
}
