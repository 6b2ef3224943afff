//! # SHROUD Cryptography
//!
//! secp256k1 primitives for the SHROUD stealth payment protocol.
//!
//! This crate provides:
//!
//! - **Random numbers**: Rejection-sampled scalars in `[1, n-1]`
//! - **Key pairs**: Parsing, compression, x-coordinate recovery, scalar multiplication
//! - **ECIES**: Encryption of a random number to a viewing key
//! - **Hash**: Keccak-256 and domain-separated SHAKE256
//! - **Derivation**: Stealth addresses and Ethereum address computation
//!
//! ## Security Properties
//!
//! - Scalar multiplication uses k256's constant-time arithmetic
//! - Private keys and random numbers are zeroized on drop
//! - Decryption failures carry no detail beyond the failure itself
//!
//! ## Example
//!
//! ```rust
//! use shroud_crypto::{KeyPair, RandomNumber};
//!
//! let viewing = KeyPair::generate();
//! let spending = KeyPair::generate();
//!
//! // Sender side: only public keys
//! let r = RandomNumber::generate();
//! let payload = viewing.to_public().encrypt(&r)?;
//! let stealth = spending.to_public().mul_public_key(&r)?;
//!
//! // Recipient side: recover r and the spendable key
//! let recovered = viewing.decrypt(&payload)?;
//! let spendable = spending.mul_public_key(&recovered)?;
//! assert_eq!(spendable.address(), stealth.address());
//! # Ok::<(), shroud_core::ShroudError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod derive;
pub mod ecies;
pub mod hash;
pub mod keypair;
pub mod random;

// Re-export main items at crate root
pub use derive::{derive_eth_address, derive_stealth_address, derive_stealth_key_pair};
pub use ecies::EncryptedPayload;
pub use hash::{keccak256, shake256};
pub use keypair::{candidates_from_x, compress_public_key, get_uncompressed_from_x, CompressedPublicKey, KeyPair};
pub use random::RandomNumber;
