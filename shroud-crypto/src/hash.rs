//! Hashing utilities with domain separation.
//!
//! - SHAKE256 with a length-prefixed domain separator, used as the ECIES KDF
//! - Keccak-256, used for Ethereum addresses and signature-derived keys
//!
//! ```text
//! output = SHAKE256(len(domain) || domain || input, output_length)
//! ```

use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

use shroud_core::constants::KECCAK256_SIZE;

// ═══════════════════════════════════════════════════════════════════════════════
// SHAKE256
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes SHAKE256 with domain separation.
///
/// # Example
///
/// ```rust
/// use shroud_crypto::shake256;
/// use shroud_core::constants::DOMAIN_ECIES_KDF;
///
/// let okm = shake256(DOMAIN_ECIES_KDF, &[0u8; 32], 44);
/// assert_eq!(okm.len(), 44);
/// ```
pub fn shake256(domain: &[u8], input: &[u8], output_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();

    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);
    hasher.update(input);

    let mut reader = hasher.finalize_xof();
    let mut output = vec![0u8; output_len];
    reader.read(&mut output);

    output
}

/// Computes SHAKE256 straight into a fixed-size buffer.
pub fn shake256_into(domain: &[u8], input: &[u8], output: &mut [u8]) {
    let mut hasher = Shake256::default();

    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);
    hasher.update(input);

    hasher.finalize_xof().read(output);
}

// ═══════════════════════════════════════════════════════════════════════════════
// KECCAK256 (for Ethereum addresses)
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes Keccak256 hash (used for Ethereum addresses).
///
/// Note: Keccak256 is NOT SHA3-256. They use different padding.
pub fn keccak256(input: &[u8]) -> [u8; KECCAK256_SIZE] {
    use sha3::{Digest, Keccak256};

    let mut hasher = Keccak256::new();
    Digest::update(&mut hasher, input);
    hasher.finalize().into()
}
