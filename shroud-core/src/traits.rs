//! Common traits for SHROUD.
//!
//! These traits define the interfaces that external collaborators satisfy,
//! enabling modularity and testing.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AnnouncementPage, PageCursor};

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENT SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Paginated provider of published announcements.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - An indexing service over contract events
/// - Direct log queries against a node
///
/// Delivery is at-least-once: an announcement may appear in more than one
/// page. Trial decryption is deterministic, so downstream matching handles
/// duplicates idempotently.
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    /// Fetches the page starting at `cursor` (`None` = the first page).
    ///
    /// `limit` is a hint for the maximum page size. A returned page with
    /// `next == None` is the last one.
    async fn fetch_page(&self, cursor: Option<&PageCursor>, limit: usize) -> Result<AnnouncementPage>;
}

#[async_trait]
impl<T: AnnouncementSource + ?Sized> AnnouncementSource for std::sync::Arc<T> {
    async fn fetch_page(&self, cursor: Option<&PageCursor>, limit: usize) -> Result<AnnouncementPage> {
        (**self).fetch_page(cursor, limit).await
    }
}
