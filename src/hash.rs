//! Sprite name fingerprints.

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// 64-bit FNV-1a hash of `name`.
///
/// Used as the lookup key for sprites in projects and bundles. Collisions are
/// possible; [`crate::Project::add_sprite`] refuses a second sprite with the
/// same fingerprint.
pub fn fingerprint(name: &[u8]) -> u64 {
    name.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// [`fingerprint`] of a name's UTF-8 bytes.
#[inline]
pub fn fingerprint_str(name: &str) -> u64 {
    fingerprint(name.as_bytes())
}
