//! Announcement types for SHROUD.
//!
//! Announcements are published by senders alongside a payment and carry the
//! x-coordinate of the ephemeral public key plus the encrypted random number.
//! Recipients page through them and trial-decrypt each one.

use std::collections::HashMap;

use crypto_bigint::U256;
use serde::{Deserialize, Serialize};

use super::{EthAddress, TxHash};
use crate::constants::{COORDINATE_SIZE, ECIES_CIPHERTEXT_SIZE};
use crate::error::{Result, ShroudError};

/// A stealth payment announcement as emitted by the ledger.
///
/// # JSON Form
/// ```text
/// {
///   "receiver": "0x<EIP-55>", "pkx": "0x<32 bytes>", "ciphertext": "0x<48 bytes>",
///   "token": "0x<EIP-55>", "amount": "0x<uint256>", "from": "0x<EIP-55>",
///   "tx_hash": "0x<32 bytes>", "timestamp": 1700000000
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Stealth address that received the funds
    pub receiver: EthAddress,
    /// x-coordinate of the ephemeral public key (parity is not transmitted)
    #[serde(with = "prefixed_hex")]
    pub pkx: [u8; COORDINATE_SIZE],
    /// Encrypted random number
    #[serde(with = "prefixed_hex")]
    pub ciphertext: Vec<u8>,
    /// Token contract (zero address for the native asset)
    pub token: EthAddress,
    /// Amount sent, in the token's base units
    #[serde(with = "amount")]
    pub amount: U256,
    /// Sender address
    pub from: EthAddress,
    /// Transaction that emitted the announcement
    pub tx_hash: TxHash,
    /// Unix timestamp of the containing block
    pub timestamp: u64,
}

impl Announcement {
    /// Validates the announcement structure.
    ///
    /// Whether `pkx` is a valid curve x-coordinate is a scanning concern
    /// and is not checked here.
    pub fn validate(&self) -> Result<()> {
        if self.ciphertext.len() != ECIES_CIPHERTEXT_SIZE {
            return Err(ShroudError::InvalidAnnouncement(format!(
                "ciphertext size mismatch: expected {}, got {}",
                ECIES_CIPHERTEXT_SIZE,
                self.ciphertext.len()
            )));
        }

        if self.receiver.is_zero() {
            return Err(ShroudError::InvalidAnnouncement(
                "receiver is the zero address".into(),
            ));
        }

        Ok(())
    }

    /// Returns true if the announcement is for the native asset.
    pub fn is_native_token(&self) -> bool {
        self.token.is_zero()
    }
}

/// Builder for creating announcements with optional fields.
#[derive(Default)]
pub struct AnnouncementBuilder {
    receiver: Option<EthAddress>,
    pkx: Option<[u8; COORDINATE_SIZE]>,
    ciphertext: Option<Vec<u8>>,
    token: Option<EthAddress>,
    amount: Option<U256>,
    from: Option<EthAddress>,
    tx_hash: Option<TxHash>,
    timestamp: Option<u64>,
}

impl AnnouncementBuilder {
    /// Creates a new announcement builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stealth receiver (required).
    pub fn receiver(mut self, receiver: EthAddress) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Sets the ephemeral x-coordinate (required).
    pub fn pkx(mut self, pkx: [u8; COORDINATE_SIZE]) -> Self {
        self.pkx = Some(pkx);
        self
    }

    /// Sets the ciphertext (required).
    pub fn ciphertext(mut self, ciphertext: Vec<u8>) -> Self {
        self.ciphertext = Some(ciphertext);
        self
    }

    /// Sets the token (optional, defaults to the native asset).
    pub fn token(mut self, token: EthAddress) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets the amount (optional, defaults to zero).
    pub fn amount(mut self, amount: U256) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the sender (optional).
    pub fn from(mut self, from: EthAddress) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the transaction hash (optional).
    pub fn tx_hash(mut self, tx_hash: TxHash) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }

    /// Sets a custom timestamp (optional, defaults to now).
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Builds the announcement.
    pub fn build(self) -> Result<Announcement> {
        let receiver = self
            .receiver
            .ok_or_else(|| ShroudError::ValidationError("receiver is required".into()))?;

        let pkx = self
            .pkx
            .ok_or_else(|| ShroudError::ValidationError("pkx is required".into()))?;

        let ciphertext = self
            .ciphertext
            .ok_or_else(|| ShroudError::ValidationError("ciphertext is required".into()))?;

        let timestamp = self
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64);

        let announcement = Announcement {
            receiver,
            pkx,
            ciphertext,
            token: self.token.unwrap_or_default(),
            amount: self.amount.unwrap_or(U256::ZERO),
            from: self.from.unwrap_or_default(),
            tx_hash: self.tx_hash.unwrap_or_default(),
            timestamp,
        };

        announcement.validate()?;
        Ok(announcement)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAGINATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque position in an announcement source.
///
/// Sources choose the encoding (an offset, a block number, an indexer token);
/// scanners only store and hand it back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wraps a source-specific token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of announcements.
#[derive(Clone, Debug, Default)]
pub struct AnnouncementPage {
    /// Announcements in source order
    pub announcements: Vec<Announcement>,
    /// Cursor for the following page, `None` once the source is exhausted
    pub next: Option<PageCursor>,
}

impl AnnouncementPage {
    /// Creates a page followed by more data.
    pub fn new(announcements: Vec<Announcement>, next: Option<PageCursor>) -> Self {
        Self { announcements, next }
    }

    /// Creates the final page.
    pub fn last(announcements: Vec<Announcement>) -> Self {
        Self {
            announcements,
            next: None,
        }
    }

    /// Returns true if no further pages follow.
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Statistics about announcements held by a source.
#[derive(Clone, Debug, Default)]
pub struct AnnouncementStats {
    /// Total number of announcements
    pub total_count: u64,
    /// Announcements per token contract
    pub token_distribution: HashMap<EthAddress, u64>,
    /// Earliest announcement timestamp
    pub earliest_timestamp: Option<u64>,
    /// Latest announcement timestamp
    pub latest_timestamp: Option<u64>,
}

impl AnnouncementStats {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates stats with a new announcement.
    pub fn add(&mut self, announcement: &Announcement) {
        self.total_count += 1;
        *self.token_distribution.entry(announcement.token).or_insert(0) += 1;

        let ts = announcement.timestamp;
        self.earliest_timestamp = Some(self.earliest_timestamp.map_or(ts, |t| t.min(ts)));
        self.latest_timestamp = Some(self.latest_timestamp.map_or(ts, |t| t.max(ts)));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERDE HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

mod prefixed_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value.as_ref())))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)?;
        let len = bytes.len();
        T::try_from(bytes).map_err(|_| de::Error::custom(format!("unexpected byte length {}", len)))
    }
}

/// uint256 as `0x` hex on output; `0x` hex or decimal on input.
mod amount {
    use crypto_bigint::{CheckedAdd, CheckedMul, Encoding, U256};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value.to_be_bytes())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }

    pub(super) fn parse(s: &str) -> Result<U256, String> {
        let s = s.trim();
        if let Some(digits) = s.strip_prefix("0x") {
            if digits.is_empty() || digits.len() > 64 {
                return Err(format!("hex amount must have 1..=64 digits, got {}", digits.len()));
            }
            let padded = format!("{:0>64}", digits);
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(padded, &mut bytes).map_err(|e| e.to_string())?;
            return Ok(U256::from_be_bytes(bytes));
        }

        if s.is_empty() {
            return Err("empty amount".into());
        }
        let ten = U256::from_u8(10);
        let mut acc = U256::ZERO;
        for c in s.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| format!("invalid decimal digit '{}'", c))?;
            let shifted: Option<U256> = acc.checked_mul(&ten).into();
            let next: Option<U256> = shifted
                .and_then(|v| Option::from(v.checked_add(&U256::from_u32(digit))));
            acc = next.ok_or_else(|| "amount exceeds uint256".to_string())?;
        }
        Ok(acc)
    }
}
