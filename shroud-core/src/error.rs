//! Error types for SHROUD.
//!
//! One error enum covers key handling, encryption, scanning and the
//! collaborator boundary. `DecryptionFailed` is the expected outcome for
//! almost every scanned announcement and is never treated as a hard failure
//! by the scanner.

use thiserror::Error;

/// Result type alias using `ShroudError`.
pub type Result<T> = std::result::Result<T, ShroudError>;

/// Main error type for all SHROUD operations.
#[derive(Debug, Error)]
pub enum ShroudError {
    // ═══════════════════════════════════════════════════════════════════════════
    // KEY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Key bytes have the wrong length or prefix.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// The encoded point is not on secp256k1 (or is the identity).
    #[error("Point is not on the curve")]
    PointNotOnCurve,

    /// A private scalar is zero or not below the curve order.
    #[error("Scalar out of range: must be in [1, n-1]")]
    ScalarOutOfRange,

    /// An operation required a private key the key pair does not hold.
    #[error("Key pair has no private key")]
    MissingPrivateKey,

    // ═══════════════════════════════════════════════════════════════════════════
    // ENCRYPTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Authentication tag did not verify (wrong key or corrupted payload).
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Ciphertext length does not match the encryption scheme.
    #[error("Invalid ciphertext: expected {expected} bytes, got {actual}")]
    InvalidCiphertextSize { expected: usize, actual: usize },

    // ═══════════════════════════════════════════════════════════════════════════
    // STEALTH PROTOCOL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Recipient key material failed validation before sending.
    #[error("Unsupported recipient: {0}")]
    UnsupportedRecipient(String),

    /// Malformed announcement data encountered while scanning one item.
    #[error("Malformed announcement: {0}")]
    ScanItem(String),

    /// Invalid announcement structure.
    #[error("Invalid announcement: {0}")]
    InvalidAnnouncement(String),

    /// Invalid ledger address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid stealth meta-address.
    #[error("Invalid meta-address: {0}")]
    InvalidMetaAddress(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLABORATOR ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The announcement source failed to deliver a page.
    #[error("Announcement source error: {0}")]
    SourceError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ShroudError {
    /// Returns true if this error is recoverable (can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ShroudError::SourceError(_))
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            ShroudError::InvalidKeyFormat(_)
                | ShroudError::PointNotOnCurve
                | ShroudError::ScalarOutOfRange
                | ShroudError::MissingPrivateKey
                | ShroudError::DecryptionFailed
                | ShroudError::InvalidCiphertextSize { .. }
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ShroudError::ValidationError(_)
                | ShroudError::UnsupportedRecipient(_)
                | ShroudError::InvalidAnnouncement(_)
                | ShroudError::InvalidAddress(_)
                | ShroudError::InvalidMetaAddress(_)
        )
    }

    /// Returns true if a scanner should skip the offending announcement and
    /// carry on with the rest of the batch.
    pub fn is_skippable_scan_item(&self) -> bool {
        matches!(
            self,
            ShroudError::ScanItem(_) | ShroudError::InvalidCiphertextSize { .. }
        )
    }
}
