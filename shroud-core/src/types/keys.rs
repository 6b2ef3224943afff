//! Key material types for SHROUD.
//!
//! - [`KeyBytes`]: Tagged key bytes, classified and format-checked at construction
//! - [`StealthMetaAddress`]: Spending + viewing public keys in the `st:eth:0x...` form
//!
//! Curve membership of points is checked when a key pair is built from these
//! bytes; this module only enforces lengths, prefixes and the scalar range.

use std::fmt;
use std::str::FromStr;

use crypto_bigint::{Encoding, U256};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::constants::{
    COMPRESSED_PREFIX_EVEN, COMPRESSED_PREFIX_ODD, COMPRESSED_PUBLIC_KEY_SIZE, META_ADDRESS_BODY_SIZE,
    META_ADDRESS_PREFIX, PRIVATE_KEY_SIZE, UNCOMPRESSED_PREFIX, UNCOMPRESSED_PUBLIC_KEY_SIZE,
};
use crate::error::{Result, ShroudError};

/// Order of the secp256k1 group.
pub const CURVE_ORDER: U256 =
    U256::from_be_hex("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");

/// Returns true if `bytes` is a big-endian scalar in `[1, n-1]`.
pub fn is_valid_scalar(bytes: &[u8; PRIVATE_KEY_SIZE]) -> bool {
    let value = U256::from_be_bytes(*bytes);
    value != U256::ZERO && value < CURVE_ORDER
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY BYTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Key material as it crosses component boundaries.
///
/// Raw byte buffers are classified once, here, so downstream code never has to
/// guess what a slice holds.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyBytes {
    /// SEC1 compressed public key: `0x02`/`0x03` prefix + 32-byte x.
    Compressed([u8; COMPRESSED_PUBLIC_KEY_SIZE]),
    /// SEC1 uncompressed public key: `0x04` prefix + 32-byte x + 32-byte y.
    Uncompressed([u8; UNCOMPRESSED_PUBLIC_KEY_SIZE]),
    /// 32-byte big-endian private scalar in `[1, n-1]`.
    Scalar([u8; PRIVATE_KEY_SIZE]),
}

impl KeyBytes {
    /// Classifies and validates raw key bytes.
    ///
    /// # Errors
    /// - `InvalidKeyFormat` for unknown lengths or SEC1 prefixes
    /// - `ScalarOutOfRange` for a 32-byte value that is 0 or ≥ n
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        match bytes.len() {
            COMPRESSED_PUBLIC_KEY_SIZE => {
                if bytes[0] != COMPRESSED_PREFIX_EVEN && bytes[0] != COMPRESSED_PREFIX_ODD {
                    return Err(ShroudError::InvalidKeyFormat(format!(
                        "compressed key prefix must be 0x02 or 0x03, got 0x{:02x}",
                        bytes[0]
                    )));
                }
                let mut arr = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
                arr.copy_from_slice(bytes);
                Ok(Self::Compressed(arr))
            }
            UNCOMPRESSED_PUBLIC_KEY_SIZE => {
                if bytes[0] != UNCOMPRESSED_PREFIX {
                    return Err(ShroudError::InvalidKeyFormat(format!(
                        "uncompressed key prefix must be 0x04, got 0x{:02x}",
                        bytes[0]
                    )));
                }
                let mut arr = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
                arr.copy_from_slice(bytes);
                Ok(Self::Uncompressed(arr))
            }
            PRIVATE_KEY_SIZE => {
                let mut arr = [0u8; PRIVATE_KEY_SIZE];
                arr.copy_from_slice(bytes);
                if !is_valid_scalar(&arr) {
                    arr.zeroize();
                    return Err(ShroudError::ScalarOutOfRange);
                }
                Ok(Self::Scalar(arr))
            }
            other => Err(ShroudError::InvalidKeyFormat(format!(
                "expected 32, 33 or 65 bytes, got {}",
                other
            ))),
        }
    }

    /// Parses hex (with or without `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(s)?;
        let result = Self::from_slice(&bytes);
        bytes.zeroize();
        result
    }

    /// Returns the raw bytes.
    ///
    /// # Security
    /// For the `Scalar` variant these are private key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Compressed(b) => b,
            Self::Uncompressed(b) => b,
            Self::Scalar(b) => b,
        }
    }

    /// Returns `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.as_bytes()))
    }

    /// Returns true for either public key encoding.
    pub fn is_public(&self) -> bool {
        !self.is_scalar()
    }

    /// Returns true for a private scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Returns the compressed encoding of a public key.
    ///
    /// Compression only needs the parity of y, so no curve arithmetic is
    /// involved. Returns `None` for scalars.
    pub fn to_compressed(&self) -> Option<[u8; COMPRESSED_PUBLIC_KEY_SIZE]> {
        match self {
            Self::Compressed(b) => Some(*b),
            Self::Uncompressed(b) => {
                let mut out = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
                out[0] = COMPRESSED_PREFIX_EVEN + (b[UNCOMPRESSED_PUBLIC_KEY_SIZE - 1] & 1);
                out[1..].copy_from_slice(&b[1..COMPRESSED_PUBLIC_KEY_SIZE]);
                Some(out)
            }
            Self::Scalar(_) => None,
        }
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        if let Self::Scalar(bytes) = self {
            bytes.zeroize();
        }
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compressed(b) => write!(f, "KeyBytes::Compressed(0x{})", hex::encode(b)),
            Self::Uncompressed(b) => write!(f, "KeyBytes::Uncompressed(0x{})", hex::encode(b)),
            Self::Scalar(_) => write!(f, "KeyBytes::Scalar([REDACTED])"),
        }
    }
}

impl FromStr for KeyBytes {
    type Err = ShroudError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A recipient's published key pair: where to send, and who can find it.
///
/// This is what an identifier resolver (ENS text record, registry contract)
/// hands to a sender.
///
/// # Format
/// ```text
/// st:eth:0x<33-byte compressed spending key><33-byte compressed viewing key>
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StealthMetaAddress {
    spending: KeyBytes,
    viewing: KeyBytes,
}

impl StealthMetaAddress {
    /// Creates a meta-address from two public keys.
    pub fn new(spending: KeyBytes, viewing: KeyBytes) -> Result<Self> {
        if !spending.is_public() {
            return Err(ShroudError::InvalidMetaAddress(
                "spending key must be a public key".into(),
            ));
        }
        if !viewing.is_public() {
            return Err(ShroudError::InvalidMetaAddress(
                "viewing key must be a public key".into(),
            ));
        }
        Ok(Self { spending, viewing })
    }

    /// Returns the spending public key.
    pub fn spending_public_key(&self) -> &KeyBytes {
        &self.spending
    }

    /// Returns the viewing public key.
    pub fn viewing_public_key(&self) -> &KeyBytes {
        &self.viewing
    }

    /// Serializes to the 66-byte body (two compressed keys).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(META_ADDRESS_BODY_SIZE);
        // Both keys are public by construction.
        if let Some(spending) = self.spending.to_compressed() {
            bytes.extend_from_slice(&spending);
        }
        if let Some(viewing) = self.viewing.to_compressed() {
            bytes.extend_from_slice(&viewing);
        }
        bytes
    }

    /// Deserializes from the 66-byte body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_ADDRESS_BODY_SIZE {
            return Err(ShroudError::InvalidMetaAddress(format!(
                "expected {} bytes, got {}",
                META_ADDRESS_BODY_SIZE,
                bytes.len()
            )));
        }

        let spending = KeyBytes::from_slice(&bytes[..COMPRESSED_PUBLIC_KEY_SIZE])
            .map_err(|e| ShroudError::InvalidMetaAddress(format!("spending key: {}", e)))?;
        let viewing = KeyBytes::from_slice(&bytes[COMPRESSED_PUBLIC_KEY_SIZE..])
            .map_err(|e| ShroudError::InvalidMetaAddress(format!("viewing key: {}", e)))?;

        Self::new(spending, viewing)
    }
}

impl fmt::Display for StealthMetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", META_ADDRESS_PREFIX, hex::encode(self.to_bytes()))
    }
}

impl FromStr for StealthMetaAddress {
    type Err = ShroudError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s.trim().strip_prefix(META_ADDRESS_PREFIX).ok_or_else(|| {
            ShroudError::InvalidMetaAddress(format!("must start with '{}'", META_ADDRESS_PREFIX))
        })?;
        let bytes = hex::decode(body)?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for StealthMetaAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StealthMetaAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
