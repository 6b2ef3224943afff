//! Ephemeral-key encryption of random numbers (ECIES).
//!
//! ## Construction
//!
//! ```text
//! e            ← random scalar,  E = e · G
//! shared       = e · P                          (P = recipient viewing key)
//! key || nonce = SHAKE256("SHROUD_ECIES_KDF_V1", x(shared), 44)
//! ciphertext   = AES-256-GCM(key, nonce, r, aad = compress(E))   48 bytes
//! ```
//!
//! Only `x(E)` is published. Both `E` and `-E` yield the same shared
//! x-coordinate, so the AAD is what pins the parity: exactly one of the two
//! reconstructions authenticates.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use k256::ecdh::diffie_hellman;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::trace;
use zeroize::Zeroizing;

use shroud_core::constants::{
    DOMAIN_ECIES_KDF, ECIES_CIPHERTEXT_SIZE, ECIES_KEY_SIZE, ECIES_NONCE_SIZE,
};
use shroud_core::error::{Result, ShroudError};

use crate::hash::shake256_into;
use crate::keypair::KeyPair;
use crate::random::RandomNumber;

/// An encrypted random number together with the ephemeral public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Ephemeral public key (public half only)
    pub ephemeral_public_key: KeyPair,
    /// AES-256-GCM ciphertext with appended tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Rebuilds a payload from a candidate ephemeral key and a ciphertext.
    pub fn new(ephemeral_public_key: KeyPair, ciphertext: Vec<u8>) -> Self {
        Self {
            ephemeral_public_key: ephemeral_public_key.to_public(),
            ciphertext,
        }
    }
}

struct SymmetricKey {
    okm: Zeroizing<[u8; ECIES_KEY_SIZE + ECIES_NONCE_SIZE]>,
}

impl SymmetricKey {
    fn derive(shared_x: &[u8]) -> Self {
        let mut okm = Zeroizing::new([0u8; ECIES_KEY_SIZE + ECIES_NONCE_SIZE]);
        shake256_into(DOMAIN_ECIES_KDF, shared_x, &mut okm[..]);
        Self { okm }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.okm[..ECIES_KEY_SIZE])
            .map_err(|e| ShroudError::InternalError(format!("AES key setup: {}", e)))
    }

    fn nonce(&self) -> &Nonce<aes_gcm::aead::consts::U12> {
        Nonce::from_slice(&self.okm[ECIES_KEY_SIZE..])
    }
}

impl KeyPair {
    /// Encrypts a random number to this public key.
    pub fn encrypt(&self, random_number: &RandomNumber) -> Result<EncryptedPayload> {
        self.encrypt_with_rng(random_number, &mut OsRng)
    }

    /// Encrypts a random number using `rng` for the ephemeral key.
    pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        random_number: &RandomNumber,
        rng: &mut R,
    ) -> Result<EncryptedPayload> {
        let ephemeral = KeyPair::generate_with_rng(rng);
        let ephemeral_secret = ephemeral
            .secret_key()
            .ok_or_else(|| ShroudError::InternalError("ephemeral key has no scalar".into()))?;

        let shared = diffie_hellman(ephemeral_secret.to_nonzero_scalar(), self.public_key().as_affine());
        let key = SymmetricKey::derive(shared.raw_secret_bytes());

        let aad = ephemeral.compressed().compressed;
        let plaintext = Zeroizing::new(random_number.to_bytes());
        let ciphertext = key
            .cipher()?
            .encrypt(
                key.nonce(),
                Payload {
                    msg: &plaintext[..],
                    aad: &aad,
                },
            )
            .map_err(|_| ShroudError::InternalError("AES-GCM encryption failed".into()))?;

        Ok(EncryptedPayload {
            ephemeral_public_key: ephemeral.to_public(),
            ciphertext,
        })
    }

    /// Decrypts a payload with this key pair's private key.
    ///
    /// # Errors
    /// - `MissingPrivateKey` if this is a public-only key pair
    /// - `InvalidCiphertextSize` if the ciphertext is not 48 bytes
    /// - `DecryptionFailed` if authentication fails or the plaintext is not a
    ///   valid scalar
    pub fn decrypt(&self, payload: &EncryptedPayload) -> Result<RandomNumber> {
        let secret = self.secret_key().ok_or(ShroudError::MissingPrivateKey)?;

        if payload.ciphertext.len() != ECIES_CIPHERTEXT_SIZE {
            return Err(ShroudError::InvalidCiphertextSize {
                expected: ECIES_CIPHERTEXT_SIZE,
                actual: payload.ciphertext.len(),
            });
        }

        let ephemeral = payload.ephemeral_public_key.public_key();
        let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
        let key = SymmetricKey::derive(shared.raw_secret_bytes());

        let aad = payload.ephemeral_public_key.compressed().compressed;
        let plaintext = key
            .cipher()?
            .decrypt(
                key.nonce(),
                Payload {
                    msg: &payload.ciphertext,
                    aad: &aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| {
                trace!("ciphertext failed authentication");
                ShroudError::DecryptionFailed
            })?;

        RandomNumber::from_bytes(&plaintext).map_err(|_| ShroudError::DecryptionFailed)
    }
}
