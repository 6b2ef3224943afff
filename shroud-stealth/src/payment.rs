//! Stealth payment creation (sender side).

use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::debug;

use shroud_core::error::{Result, ShroudError};
use shroud_core::types::{AnnouncementBuilder, EthAddress, StealthMetaAddress};
use shroud_core::constants::COORDINATE_SIZE;
use shroud_crypto::{EncryptedPayload, KeyPair, RandomNumber};

/// Everything a sender needs to pay a recipient privately.
#[derive(Clone, Debug)]
pub struct SendPreparation {
    /// Public-only stealth key pair; its address receives the funds
    pub stealth_key_pair: KeyPair,
    /// x-coordinate of the ephemeral public key, to publish
    pub pub_key_x_coordinate: [u8; COORDINATE_SIZE],
    /// The random number encrypted to the recipient's viewing key
    pub encrypted: EncryptedPayload,
}

impl SendPreparation {
    /// Returns the one-time address to send funds to.
    pub fn stealth_address(&self) -> EthAddress {
        self.stealth_key_pair.address()
    }

    /// Returns an announcement builder pre-filled with receiver, `pkx` and
    /// ciphertext. The caller adds token, amount, sender and transaction.
    pub fn announcement(&self) -> AnnouncementBuilder {
        AnnouncementBuilder::new()
            .receiver(self.stealth_address())
            .pkx(self.pub_key_x_coordinate)
            .ciphertext(self.encrypted.ciphertext.clone())
    }
}

/// Prepares a stealth payment to a recipient's spending and viewing keys.
///
/// Both keys may be compressed or uncompressed SEC1 encodings.
///
/// # Errors
/// `UnsupportedRecipient` if either key is malformed or not on the curve.
/// No random number is drawn in that case.
pub fn prepare_send(spending_public_key: &[u8], viewing_public_key: &[u8]) -> Result<SendPreparation> {
    let (spending, viewing) = recipient_keys(spending_public_key, viewing_public_key)?;
    let random_number = RandomNumber::generate();
    build_preparation(&spending, &viewing, &random_number, &mut OsRng)
}

/// Prepares a stealth payment with a caller-chosen random number and RNG.
///
/// The RNG only supplies the ephemeral encryption key. Fixing both makes the
/// result fully reproducible.
pub fn prepare_send_with<R: RngCore + CryptoRng>(
    spending_public_key: &[u8],
    viewing_public_key: &[u8],
    random_number: &RandomNumber,
    rng: &mut R,
) -> Result<SendPreparation> {
    let (spending, viewing) = recipient_keys(spending_public_key, viewing_public_key)?;
    build_preparation(&spending, &viewing, random_number, rng)
}

/// Prepares a stealth payment to a published meta-address.
pub fn prepare_send_to_meta_address(meta_address: &StealthMetaAddress) -> Result<SendPreparation> {
    prepare_send(
        meta_address.spending_public_key().as_bytes(),
        meta_address.viewing_public_key().as_bytes(),
    )
}

fn recipient_keys(spending: &[u8], viewing: &[u8]) -> Result<(KeyPair, KeyPair)> {
    let spending = KeyPair::from_public_key(spending)
        .map_err(|e| ShroudError::UnsupportedRecipient(format!("spending key: {}", e)))?;
    let viewing = KeyPair::from_public_key(viewing)
        .map_err(|e| ShroudError::UnsupportedRecipient(format!("viewing key: {}", e)))?;
    Ok((spending, viewing))
}

fn build_preparation<R: RngCore + CryptoRng>(
    spending: &KeyPair,
    viewing: &KeyPair,
    random_number: &RandomNumber,
    rng: &mut R,
) -> Result<SendPreparation> {
    let encrypted = viewing.encrypt_with_rng(random_number, rng)?;
    let pub_key_x_coordinate = encrypted.ephemeral_public_key.compressed().pub_key_x_coordinate;
    let stealth_key_pair = spending.mul_public_key(random_number)?;

    debug!(stealth_address = %stealth_key_pair.address(), "prepared stealth payment");

    Ok(SendPreparation {
        stealth_key_pair,
        pub_key_x_coordinate,
        encrypted,
    })
}
