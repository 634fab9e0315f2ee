//! FNV-1a 64-bit hash
//!
//! Derives the numeric remote-body identifier from an operator-entered body
//! name. Both sides of a pairing hash the same name, so the constants must
//! match the firmware exactly.

const FNV_OFFSET_BASIS_64: u64 = 14695981039346656037;
const FNV_PRIME_64: u64 = 1099511628211;

/// Standard FNV-1a over `bytes`: each byte is XORed into the hash, then the
/// hash is multiplied by the FNV prime, all modulo 2^64.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS_64;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME_64);
    }
    hash
}
