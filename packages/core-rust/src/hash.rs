//! Stable string-to-integer hashing for name-addressed entities.
//!
//! Channel ids are a pure function of the channel name, so two
//! `CreateChannel` requests for the same name always land on the same id,
//! across connections and across restarts.

use md5::{Digest, Md5};

/// Hashes `s` to a `u64`: the first eight bytes of its MD5 digest,
/// read big-endian.
///
/// # Examples
///
/// ```
/// use zedex_core::hash::string_to_u64_hash;
///
/// assert_eq!(string_to_u64_hash("general"), string_to_u64_hash("general"));
/// assert_ne!(string_to_u64_hash("general"), string_to_u64_hash("random"));
/// ```
#[must_use]
pub fn string_to_u64_hash(s: &str) -> u64 {
    let digest = Md5::digest(s.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}
