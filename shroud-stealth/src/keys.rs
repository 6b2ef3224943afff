//! Recipient key sets.
//!
//! A recipient holds two secp256k1 key pairs:
//! - Spending keys: multiply into stealth private keys that move funds
//! - Viewing keys: decrypt announcements (can be shared with auditors)

use std::fmt;

use rand::{rngs::OsRng, CryptoRng, RngCore};
use zeroize::Zeroizing;

use shroud_core::constants::{COORDINATE_SIZE, SIGNATURE_SIZE};
use shroud_core::error::{Result, ShroudError};
use shroud_core::types::{KeyBytes, StealthMetaAddress};
use shroud_crypto::{keccak256, KeyPair};

/// The complete key set of a stealth payment recipient.
#[derive(Clone, PartialEq, Eq)]
pub struct StealthKeys {
    spending: KeyPair,
    viewing: KeyPair,
}

impl StealthKeys {
    /// Generates a new key set from the OS CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generates a new key set from the given CSPRNG.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            spending: KeyPair::generate_with_rng(rng),
            viewing: KeyPair::generate_with_rng(rng),
        }
    }

    /// Creates a key set from two 32-byte private scalars.
    pub fn from_private_keys(spending: &[u8], viewing: &[u8]) -> Result<Self> {
        Ok(Self {
            spending: KeyPair::from_private_key(spending)?,
            viewing: KeyPair::from_private_key(viewing)?,
        })
    }

    /// Derives a key set from a 65-byte `r || s || v` wallet signature.
    ///
    /// The spending key is `keccak256(r)` and the viewing key is
    /// `keccak256(s)`, so signing the same message with the same wallet
    /// always restores the same keys.
    pub fn from_signature(signature: &[u8]) -> Result<Self> {
        if signature.len() != SIGNATURE_SIZE {
            return Err(ShroudError::ValidationError(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                signature.len()
            )));
        }

        let spending = Zeroizing::new(keccak256(&signature[..COORDINATE_SIZE]));
        let viewing = Zeroizing::new(keccak256(&signature[COORDINATE_SIZE..2 * COORDINATE_SIZE]));
        Self::from_private_keys(&spending[..], &viewing[..])
    }

    /// Returns the spending key pair.
    pub fn spending(&self) -> &KeyPair {
        &self.spending
    }

    /// Returns the viewing key pair.
    pub fn viewing(&self) -> &KeyPair {
        &self.viewing
    }

    /// Returns the meta-address to publish.
    pub fn meta_address(&self) -> Result<StealthMetaAddress> {
        let spending = KeyBytes::from_slice(&self.spending.public_key_bytes(true))?;
        let viewing = KeyBytes::from_slice(&self.viewing.public_key_bytes(true))?;
        StealthMetaAddress::new(spending, viewing)
    }
}

impl fmt::Debug for StealthKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StealthKeys")
            .field("spending", &self.spending)
            .field("viewing", &self.viewing)
            .finish()
    }
}
