//! Stealth address derivation.
//!
//! ## Derivation Flow
//!
//! ```text
//! sender:    stealth_pk = spending_pk · r
//! recipient: stealth_sk = spending_sk · r mod n
//!
//! address = keccak256(x || y of stealth_pk)[12..32]
//! ```
//!
//! Both sides reach the same address because `spending_pk = spending_sk · G`.

use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey};

use shroud_core::constants::{ETH_ADDRESS_SIZE, KECCAK256_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE};
use shroud_core::error::{Result, ShroudError};
use shroud_core::types::EthAddress;

use crate::hash::keccak256;
use crate::keypair::KeyPair;
use crate::random::RandomNumber;

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM ADDRESS DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the Ethereum address of a public key.
pub fn address_from_public_key(public: &PublicKey) -> EthAddress {
    let encoded = public.to_encoded_point(false);
    address_from_xy(&encoded.as_bytes()[1..])
}

/// Derives an Ethereum address from a 65-byte uncompressed public key.
///
/// The point is not validated; use [`KeyPair::from_public_key`] for that.
pub fn derive_eth_address(uncompressed: &[u8]) -> Result<EthAddress> {
    if uncompressed.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
        return Err(ShroudError::InvalidKeyFormat(format!(
            "uncompressed public key must be {} bytes, got {}",
            UNCOMPRESSED_PUBLIC_KEY_SIZE,
            uncompressed.len()
        )));
    }

    Ok(address_from_xy(&uncompressed[1..]))
}

fn address_from_xy(xy: &[u8]) -> EthAddress {
    let hash = keccak256(xy);

    let mut address_bytes = [0u8; ETH_ADDRESS_SIZE];
    address_bytes.copy_from_slice(&hash[KECCAK256_SIZE - ETH_ADDRESS_SIZE..]);
    EthAddress::from_array(address_bytes)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth key pair for `random_number`.
///
/// Public-only input yields a public-only stealth key; a full spending key
/// pair yields the spendable stealth key.
pub fn derive_stealth_key_pair(spending: &KeyPair, random_number: &RandomNumber) -> Result<KeyPair> {
    spending.mul_public_key(random_number)
}

/// Derives only the address (for senders who don't need the private key).
pub fn derive_stealth_address(spending: &KeyPair, random_number: &RandomNumber) -> Result<EthAddress> {
    Ok(derive_stealth_key_pair(spending, random_number)?.address())
}
