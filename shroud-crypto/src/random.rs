//! Random scalar generation.
//!
//! A [`RandomNumber`] is the per-payment secret `r` in `[1, n-1]`. The sender
//! encrypts it to the recipient's viewing key and multiplies the spending key
//! by it to obtain the stealth address.

use std::fmt;

use k256::{elliptic_curve::PrimeField, FieldBytes, NonZeroScalar, Scalar};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use shroud_core::constants::RANDOM_NUMBER_SIZE;
use shroud_core::error::{Result, ShroudError};

/// Draws 32 bytes until they form a scalar in `[1, n-1]`.
///
/// The probability of a rejection is about 2^-128, so the loop is
/// effectively a single draw.
pub(crate) fn random_nonzero_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> NonZeroScalar {
    let mut bytes = Zeroizing::new([0u8; RANDOM_NUMBER_SIZE]);
    loop {
        rng.fill_bytes(&mut bytes[..]);
        let candidate: Option<NonZeroScalar> =
            NonZeroScalar::from_repr(FieldBytes::clone_from_slice(&bytes[..])).into();
        if let Some(scalar) = candidate {
            return scalar;
        }
    }
}

/// A uniformly random secp256k1 scalar in `[1, n-1]`.
#[derive(Clone)]
pub struct RandomNumber {
    scalar: NonZeroScalar,
}

impl RandomNumber {
    /// Generates a fresh random number from the OS CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generates a random number from the given CSPRNG.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            scalar: random_nonzero_scalar(rng),
        }
    }

    /// Creates from 32 big-endian bytes.
    ///
    /// # Errors
    /// - `InvalidKeyFormat` if `bytes` is not 32 bytes long
    /// - `ScalarOutOfRange` if the value is 0 or ≥ n
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RANDOM_NUMBER_SIZE {
            return Err(ShroudError::InvalidKeyFormat(format!(
                "random number must be {} bytes, got {}",
                RANDOM_NUMBER_SIZE,
                bytes.len()
            )));
        }

        let scalar: Option<NonZeroScalar> =
            NonZeroScalar::from_repr(FieldBytes::clone_from_slice(bytes)).into();
        scalar
            .map(|scalar| Self { scalar })
            .ok_or(ShroudError::ScalarOutOfRange)
    }

    /// Creates from a small integer. Fails for zero.
    pub fn from_u64(value: u64) -> Result<Self> {
        let scalar: Option<NonZeroScalar> = NonZeroScalar::new(Scalar::from(value)).into();
        scalar
            .map(|scalar| Self { scalar })
            .ok_or(ShroudError::ScalarOutOfRange)
    }

    /// Parses `0x`-prefixed (or bare) hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = Zeroizing::new(hex::decode(s)?);
        Self::from_bytes(&bytes)
    }

    /// Returns the 32-byte big-endian encoding.
    pub fn to_bytes(&self) -> [u8; RANDOM_NUMBER_SIZE] {
        let mut out = [0u8; RANDOM_NUMBER_SIZE];
        out.copy_from_slice(&self.scalar.to_repr());
        out
    }

    /// Returns `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    pub(crate) fn scalar(&self) -> &NonZeroScalar {
        &self.scalar
    }
}

impl PartialEq for RandomNumber {
    fn eq(&self, other: &Self) -> bool {
        self.scalar.ct_eq(&other.scalar).into()
    }
}

impl Eq for RandomNumber {}

impl Drop for RandomNumber {
    fn drop(&mut self) {
        self.scalar.zeroize();
    }
}

impl fmt::Debug for RandomNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomNumber([REDACTED])")
    }
}

impl fmt::Display for RandomNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
