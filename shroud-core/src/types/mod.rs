//! Domain types for SHROUD.
//!
//! This module provides the core data structures used throughout the protocol:
//!
//! - [`KeyBytes`]: Validated key material (compressed, uncompressed or scalar)
//! - [`StealthMetaAddress`]: A recipient's published spending + viewing keys
//! - [`EthAddress`] / [`TxHash`]: Ledger identifiers
//! - [`Announcement`]: A published stealth payment record
//! - [`AnnouncementPage`] / [`PageCursor`]: Paginated retrieval

mod keys;
mod address;
mod announcement;

pub use keys::*;
pub use address::*;
pub use announcement::*;
