//! # SHROUD Registry
//!
//! Announcement storage and paginated retrieval for the SHROUD protocol.
//!
//! [`MemoryRegistry`] is a thread-safe in-memory [`AnnouncementSource`] for
//! development, testing and single-process deployments. Production sources
//! (indexers, node log queries) implement the same trait.
//!
//! ## Example
//!
//! ```rust
//! use shroud_core::{AnnouncementBuilder, AnnouncementSource, EthAddress};
//! use shroud_registry::MemoryRegistry;
//!
//! let registry = MemoryRegistry::new();
//! let announcement = AnnouncementBuilder::new()
//!     .receiver(EthAddress::from_array([1; 20]))
//!     .pkx([2; 32])
//!     .ciphertext(vec![3; 48])
//!     .build()?;
//! let id = registry.publish(announcement)?;
//! assert_eq!(id, 1);
//!
//! let page = tokio_test::block_on(registry.fetch_page(None, 100))?;
//! assert_eq!(page.announcements.len(), 1);
//! assert!(page.is_last());
//! # Ok::<(), shroud_core::ShroudError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;

pub use memory::MemoryRegistry;

// Re-export the trait from core
pub use shroud_core::traits::AnnouncementSource;
