//! # SHROUD Core
//!
//! Core types, errors, and traits for the SHROUD stealth payment protocol.
//!
//! This crate provides the foundational building blocks used by all other SHROUD crates:
//!
//! - **Types**: Key material, addresses, announcements and pagination
//! - **Errors**: The protocol error taxonomy
//! - **Constants**: Curve, encryption and wire sizes
//! - **Traits**: The announcement source collaborator interface
//!
//! ## Example
//!
//! ```rust
//! use shroud_core::{EthAddress, KeyBytes};
//!
//! let address = EthAddress::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
//! assert_eq!(address.to_checksum_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
//!
//! let key = KeyBytes::from_hex("0x0000000000000000000000000000000000000000000000000000000000000007").unwrap();
//! assert!(key.is_scalar());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, ShroudError};
pub use traits::*;
pub use types::*;

pub use crypto_bigint::{self, U256};
