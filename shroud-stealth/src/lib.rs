//! # SHROUD Stealth Address Protocol
//!
//! High-level API for creating and discovering stealth payments.
//!
//! This crate provides:
//!
//! - **Key Sets**: Recipient spending + viewing keys and their meta-address
//! - **Sending**: One-time stealth addresses and the announcement to publish
//! - **Discovery**: Trial decryption of announcements to find incoming payments
//!
//! ## Quick Start
//!
//! ```rust
//! use shroud_stealth::{is_announcement_for_user, prepare_send_to_meta_address, StealthKeys};
//!
//! // Recipient: generate keys and publish the meta-address
//! let keys = StealthKeys::generate();
//! let meta_address = keys.meta_address()?;
//!
//! // Sender: derive a stealth address and build the announcement
//! let prep = prepare_send_to_meta_address(&meta_address)?;
//! let announcement = prep.announcement().build()?;
//!
//! // Recipient: recognise the payment
//! let result = is_announcement_for_user(keys.spending(), keys.viewing(), &announcement)?;
//! assert!(result.is_for_user());
//! # Ok::<(), shroud_core::ShroudError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod discovery;
pub mod keys;
pub mod payment;

pub use discovery::{
    is_announcement_for_user, scan_announcements, ScanResult, UserAnnouncement, ViewingKeys,
};
pub use keys::StealthKeys;
pub use payment::{prepare_send, prepare_send_to_meta_address, prepare_send_with, SendPreparation};
