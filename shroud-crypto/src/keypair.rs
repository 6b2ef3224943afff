//! secp256k1 key pairs.
//!
//! A [`KeyPair`] always carries a public point and optionally the private
//! scalar behind it. Senders only ever hold the public half of a recipient's
//! keys; recipients hold both.
//!
//! ## Encodings
//!
//! ```text
//! compressed   = (0x02 | parity(y)) || x          33 bytes
//! uncompressed = 0x04 || x || y                   65 bytes
//! address      = keccak256(x || y)[12..32]        20 bytes
//! ```

use std::fmt;

use k256::{
    ecdsa::SigningKey,
    elliptic_curve::sec1::ToEncodedPoint,
    AffinePoint, FieldBytes, NonZeroScalar, PublicKey, Scalar, SecretKey,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use zeroize::Zeroizing;

use shroud_core::constants::{
    COMPRESSED_PREFIX_EVEN, COMPRESSED_PREFIX_ODD, COMPRESSED_PUBLIC_KEY_SIZE, COORDINATE_SIZE,
    PRIVATE_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE,
};
use shroud_core::error::{Result, ShroudError};
use shroud_core::types::{EthAddress, KeyBytes};

use crate::derive::address_from_public_key;
use crate::random::{random_nonzero_scalar, RandomNumber};

// ═══════════════════════════════════════════════════════════════════════════════
// COMPRESSED PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A compressed public key split into the parts an announcement needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressedPublicKey {
    /// Full 33-byte SEC1 encoding
    pub compressed: [u8; COMPRESSED_PUBLIC_KEY_SIZE],
    /// The x-coordinate (what gets published)
    pub pub_key_x_coordinate: [u8; COORDINATE_SIZE],
    /// `0x02` for even y, `0x03` for odd y
    pub prefix: u8,
}

impl CompressedPublicKey {
    fn from_public_key(public: &PublicKey) -> Self {
        let encoded = public.to_encoded_point(true);
        let mut compressed = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
        compressed.copy_from_slice(encoded.as_bytes());

        let mut pub_key_x_coordinate = [0u8; COORDINATE_SIZE];
        pub_key_x_coordinate.copy_from_slice(&compressed[1..]);

        Self {
            compressed,
            pub_key_x_coordinate,
            prefix: compressed[0],
        }
    }

    /// Returns true if y is odd.
    pub fn is_odd(&self) -> bool {
        self.prefix == COMPRESSED_PREFIX_ODD
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 public key with an optional private key.
///
/// If the private key is present, `public == private · G`. The private key is
/// zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    public: PublicKey,
    private: Option<SecretKey>,
}

impl KeyPair {
    /// Generates a fresh key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generates a key pair from the given CSPRNG.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_nonzero_scalar(random_nonzero_scalar(rng))
    }

    /// Creates a public-only key pair from a SEC1 encoding.
    ///
    /// # Errors
    /// - `InvalidKeyFormat` unless the input is a 33-byte `0x02`/`0x03` or
    ///   65-byte `0x04` encoding
    /// - `PointNotOnCurve` if the point fails validation
    pub fn from_public_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMPRESSED_PUBLIC_KEY_SIZE && bytes.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
            return Err(ShroudError::InvalidKeyFormat(format!(
                "public key must be {} or {} bytes, got {}",
                COMPRESSED_PUBLIC_KEY_SIZE,
                UNCOMPRESSED_PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }

        // Prefix checks live in KeyBytes.
        let key = KeyBytes::from_slice(bytes)?;
        Self::from_key_bytes(&key)
    }

    /// Creates a full key pair from a 32-byte big-endian private scalar.
    ///
    /// # Errors
    /// - `InvalidKeyFormat` if `bytes` is not 32 bytes long
    /// - `ScalarOutOfRange` if the scalar is 0 or ≥ n
    pub fn from_private_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(ShroudError::InvalidKeyFormat(format!(
                "private key must be {} bytes, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            )));
        }

        let secret = SecretKey::from_bytes(FieldBytes::from_slice(bytes))
            .map_err(|_| ShroudError::ScalarOutOfRange)?;
        Ok(Self::from_secret_key(secret))
    }

    /// Creates a key pair from already-classified key bytes.
    pub fn from_key_bytes(key: &KeyBytes) -> Result<Self> {
        match key {
            KeyBytes::Scalar(bytes) => Self::from_private_key(bytes),
            KeyBytes::Compressed(_) | KeyBytes::Uncompressed(_) => {
                let public = PublicKey::from_sec1_bytes(key.as_bytes())
                    .map_err(|_| ShroudError::PointNotOnCurve)?;
                Ok(Self {
                    public,
                    private: None,
                })
            }
        }
    }

    /// Parses hex (with or without `0x`) as either a public or private key.
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_key_bytes(&KeyBytes::from_hex(s)?)
    }

    /// Recovers a public key from its x-coordinate and SEC1 prefix.
    ///
    /// # Errors
    /// - `InvalidKeyFormat` if `prefix` is not `0x02` or `0x03`
    /// - `PointNotOnCurve` if `x` has no point on the curve
    pub fn from_x_coordinate(x: &[u8; COORDINATE_SIZE], prefix: u8) -> Result<Self> {
        if prefix != COMPRESSED_PREFIX_EVEN && prefix != COMPRESSED_PREFIX_ODD {
            return Err(ShroudError::InvalidKeyFormat(format!(
                "compressed key prefix must be 0x02 or 0x03, got 0x{:02x}",
                prefix
            )));
        }

        let mut compressed = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
        compressed[0] = prefix;
        compressed[1..].copy_from_slice(x);
        Self::from_key_bytes(&KeyBytes::Compressed(compressed))
    }

    pub(crate) fn from_secret_key(secret: SecretKey) -> Self {
        Self {
            public: secret.public_key(),
            private: Some(secret),
        }
    }

    pub(crate) fn from_nonzero_scalar(scalar: NonZeroScalar) -> Self {
        Self::from_secret_key(SecretKey::from(scalar))
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────────────────

    /// Returns the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns true if the private key is present.
    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Returns a public-only copy of this key pair.
    pub fn to_public(&self) -> Self {
        Self {
            public: self.public.clone(),
            private: None,
        }
    }

    /// Returns the SEC1 encoding of the public key.
    pub fn public_key_bytes(&self, compressed: bool) -> Vec<u8> {
        self.public.to_encoded_point(compressed).as_bytes().to_vec()
    }

    /// Returns the 65-byte uncompressed public key.
    pub fn uncompressed(&self) -> [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] {
        let mut out = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
        out.copy_from_slice(self.public.to_encoded_point(false).as_bytes());
        out
    }

    /// Returns the compressed public key and its parts.
    pub fn compressed(&self) -> CompressedPublicKey {
        CompressedPublicKey::from_public_key(&self.public)
    }

    /// Returns the Ethereum address of the public key.
    pub fn address(&self) -> EthAddress {
        address_from_public_key(&self.public)
    }

    /// Returns the 32-byte private scalar, if present.
    pub fn private_key_bytes(&self) -> Option<Zeroizing<[u8; PRIVATE_KEY_SIZE]>> {
        self.private.as_ref().map(|secret| {
            let mut out = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
            out.copy_from_slice(&secret.to_bytes());
            out
        })
    }

    /// Returns the private scalar as `0x`-prefixed hex, if present.
    pub fn private_key_hex(&self) -> Option<Zeroizing<String>> {
        self.private_key_bytes()
            .map(|bytes| Zeroizing::new(format!("0x{}", hex::encode(&bytes[..]))))
    }

    /// Returns an ECDSA signing key for the private scalar, if present.
    pub fn signing_key(&self) -> Option<SigningKey> {
        self.private.as_ref().map(SigningKey::from)
    }

    pub(crate) fn secret_key(&self) -> Option<&SecretKey> {
        self.private.as_ref()
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Stealth derivation
    // ───────────────────────────────────────────────────────────────────────────

    /// Multiplies the key pair by a random number.
    ///
    /// The public key becomes `P · r`; the private key, when present, becomes
    /// `d · r mod n`. Both halves agree, so a sender holding only `P` and a
    /// recipient holding `d` arrive at the same stealth address.
    pub fn mul_public_key(&self, random_number: &RandomNumber) -> Result<Self> {
        let r: Scalar = *random_number.scalar().as_ref();

        match &self.private {
            Some(secret) => {
                let d: Scalar = *secret.to_nonzero_scalar().as_ref();
                let product: Option<NonZeroScalar> = NonZeroScalar::new(d * r).into();
                // n is prime, so a product of two non-zero scalars is non-zero.
                let product = product.ok_or_else(|| {
                    ShroudError::InternalError("scalar product is zero".into())
                })?;
                Ok(Self::from_nonzero_scalar(product))
            }
            None => {
                let point = self.public.to_projective() * r;
                let public = PublicKey::from_affine(AffinePoint::from(point))
                    .map_err(|_| ShroudError::InternalError("point product is identity".into()))?;
                Ok(Self {
                    public,
                    private: None,
                })
            }
        }
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        // The public key determines the private key, so presence suffices.
        self.public == other.public && self.private.is_some() == other.private.is_some()
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.compressed().compressed))
            .field("private", &self.private.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FREE FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compresses a public key given in either SEC1 encoding.
pub fn compress_public_key(public_key: &[u8]) -> Result<CompressedPublicKey> {
    Ok(KeyPair::from_public_key(public_key)?.compressed())
}

/// Recovers public keys from an x-coordinate.
///
/// With a prefix, returns exactly that point (or an error). Without one,
/// returns every point with this x: the even-y point first, then the odd-y
/// point. The list is empty only when `x` is not on the curve.
pub fn get_uncompressed_from_x(
    x: &[u8; COORDINATE_SIZE],
    prefix: Option<u8>,
) -> Result<Vec<KeyPair>> {
    match prefix {
        Some(prefix) => Ok(vec![KeyPair::from_x_coordinate(x, prefix)?]),
        None => Ok(candidates_from_x(x)),
    }
}

/// Returns the even-y and odd-y points for `x`, in that order.
pub fn candidates_from_x(x: &[u8; COORDINATE_SIZE]) -> Vec<KeyPair> {
    [COMPRESSED_PREFIX_EVEN, COMPRESSED_PREFIX_ODD]
        .into_iter()
        .filter_map(|prefix| KeyPair::from_x_coordinate(x, prefix).ok())
        .collect()
}
