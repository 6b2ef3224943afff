//! Protocol constants for SHROUD.
//!
//! Curve sizes are those of secp256k1 (SEC 2). The encryption sizes follow
//! from AES-256-GCM applied to a single 32-byte scalar.

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a private scalar in bytes (big-endian).
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of a field element / point coordinate in bytes.
pub const COORDINATE_SIZE: usize = 32;

/// Size of a SEC1 compressed public key (prefix + x).
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 1 + COORDINATE_SIZE;

/// Size of a SEC1 uncompressed public key (0x04 + x + y).
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 1 + 2 * COORDINATE_SIZE;

/// SEC1 prefix for a compressed point with even y.
pub const COMPRESSED_PREFIX_EVEN: u8 = 0x02;

/// SEC1 prefix for a compressed point with odd y.
pub const COMPRESSED_PREFIX_ODD: u8 = 0x03;

/// SEC1 prefix for an uncompressed point.
pub const UNCOMPRESSED_PREFIX: u8 = 0x04;

/// Size of a random number (scalar) in bytes.
pub const RANDOM_NUMBER_SIZE: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// ECIES SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// AES-256 key size.
pub const ECIES_KEY_SIZE: usize = 32;

/// AES-GCM nonce size.
pub const ECIES_NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size.
pub const ECIES_TAG_SIZE: usize = 16;

/// Size of an encrypted random number: padded scalar plus tag.
pub const ECIES_CIPHERTEXT_SIZE: usize = RANDOM_NUMBER_SIZE + ECIES_TAG_SIZE;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain separator for the ECIES key derivation function.
pub const DOMAIN_ECIES_KDF: &[u8] = b"SHROUD_ECIES_KDF_V1";

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of Ethereum address in bytes (20 bytes = 160 bits).
pub const ETH_ADDRESS_SIZE: usize = 20;

/// Size of a transaction hash in bytes.
pub const TX_HASH_SIZE: usize = 32;

/// Size of keccak256 hash output.
pub const KECCAK256_SIZE: usize = 32;

/// Size of an `r || s || v` signature.
pub const SIGNATURE_SIZE: usize = 65;

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix of an ERC-5564 style stealth meta-address on Ethereum.
pub const META_ADDRESS_PREFIX: &str = "st:eth:0x";

/// Size of the binary meta-address body (two compressed keys).
pub const META_ADDRESS_BODY_SIZE: usize = 2 * COMPRESSED_PUBLIC_KEY_SIZE;

// ═══════════════════════════════════════════════════════════════════════════════
// PERFORMANCE TUNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default batch size for scanning announcements.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 1000;

/// Maximum announcements to request in a single page.
pub const MAX_SCAN_BATCH_SIZE: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sec1_sizes() {
        assert_eq!(COMPRESSED_PUBLIC_KEY_SIZE, 33);
        assert_eq!(UNCOMPRESSED_PUBLIC_KEY_SIZE, 65);
    }

    #[test]
    fn test_ciphertext_size() {
        // 32-byte scalar + 16-byte GCM tag
        assert_eq!(ECIES_CIPHERTEXT_SIZE, 48);
        assert_eq!(ECIES_KEY_SIZE + ECIES_NONCE_SIZE, 44);
    }

    #[test]
    fn test_meta_address_body_size() {
        assert_eq!(META_ADDRESS_BODY_SIZE, 66);
    }
}
