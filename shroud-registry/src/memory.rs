//! In-memory announcement registry.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use shroud_core::error::{Result, ShroudError};
use shroud_core::traits::AnnouncementSource;
use shroud_core::types::{Announcement, AnnouncementPage, AnnouncementStats, PageCursor, TxHash};

/// In-memory announcement registry.
///
/// Announcements get sequential IDs starting at 1. Pages are ID ranges, and
/// the page cursor is the first ID of the next page in decimal.
///
/// # Indexing
///
/// - ID: For direct lookup and pagination
/// - Tx hash: For duplicate rejection on publish (the zero hash means unset)
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug)]
pub struct MemoryRegistry {
    /// Primary storage: ID → Announcement
    announcements: DashMap<u64, Announcement>,
    /// Tx hash index: tx_hash → announcement ID
    tx_hash_index: DashMap<TxHash, u64>,
    /// Next announcement ID
    next_id: AtomicU64,
    /// Registry statistics
    stats: RwLock<AnnouncementStats>,
}

impl MemoryRegistry {
    /// Creates a new empty in-memory registry.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a registry with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            announcements: DashMap::with_capacity(capacity),
            tx_hash_index: DashMap::with_capacity(capacity),
            next_id: AtomicU64::new(1),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Publishes a new announcement.
    ///
    /// The announcement is validated, checked against known transaction
    /// hashes, assigned an ID and stored.
    #[instrument(skip(self, announcement), fields(tx_hash = %announcement.tx_hash))]
    pub fn publish(&self, announcement: Announcement) -> Result<u64> {
        announcement.validate()?;

        if !announcement.tx_hash.is_zero() && self.tx_hash_index.contains_key(&announcement.tx_hash) {
            return Err(ShroudError::InvalidAnnouncement(
                "announcement with this transaction hash already exists".into(),
            ));
        }

        let id = self.insert(announcement);
        debug!(id, "Published announcement");
        Ok(id)
    }

    /// Imports announcements without duplicate rejection.
    ///
    /// Mirrors a source that re-delivers events (indexer replays, re-orgs):
    /// every announcement gets a fresh ID even if its transaction hash is
    /// already stored.
    pub fn import(&self, announcements: Vec<Announcement>) -> Result<usize> {
        let mut imported = 0;

        for announcement in announcements {
            announcement.validate()?;
            self.insert(announcement);
            imported += 1;
        }

        debug!(imported, "Imported announcements");
        Ok(imported)
    }

    fn insert(&self, announcement: Announcement) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        if !announcement.tx_hash.is_zero() {
            self.tx_hash_index.entry(announcement.tx_hash).or_insert(id);
        }
        self.stats.write().add(&announcement);
        self.announcements.insert(id, announcement);

        id
    }

    /// Retrieves a specific announcement by ID.
    pub fn get_by_id(&self, id: u64) -> Option<Announcement> {
        self.announcements.get(&id).map(|entry| entry.clone())
    }

    /// Retrieves the first announcement stored for a transaction hash.
    pub fn get_by_tx_hash(&self, tx_hash: &TxHash) -> Option<Announcement> {
        let id = *self.tx_hash_index.get(tx_hash)?;
        self.get_by_id(id)
    }

    /// Retrieves announcements within a time range (inclusive), oldest first.
    pub fn get_by_time_range(&self, start: u64, end: u64) -> Vec<Announcement> {
        let mut matching: Vec<(u64, Announcement)> = self
            .announcements
            .iter()
            .filter(|entry| (start..=end).contains(&entry.value().timestamp))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        matching.sort_by_key(|(id, ann)| (ann.timestamp, *id));
        matching.into_iter().map(|(_, ann)| ann).collect()
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.stats.read().clone()
    }

    /// Clears all announcements and resets IDs.
    pub fn clear(&self) {
        self.announcements.clear();
        self.tx_hash_index.clear();
        self.next_id.store(1, Ordering::SeqCst);
        *self.stats.write() = AnnouncementStats::new();
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.announcements.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.announcements.is_empty()
    }

    /// Returns all announcements in ID order (for export/backup).
    pub fn all_announcements(&self) -> Vec<Announcement> {
        let mut all: Vec<(u64, Announcement)> = self
            .announcements
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all.into_iter().map(|(_, ann)| ann).collect()
    }

    fn parse_cursor(cursor: Option<&PageCursor>) -> Result<u64> {
        match cursor {
            None => Ok(1),
            Some(cursor) => cursor.as_str().parse::<u64>().map_err(|_| {
                ShroudError::ValidationError(format!("invalid page cursor '{}'", cursor.as_str()))
            }),
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnnouncementSource for MemoryRegistry {
    #[instrument(skip(self))]
    async fn fetch_page(&self, cursor: Option<&PageCursor>, limit: usize) -> Result<AnnouncementPage> {
        if limit == 0 {
            return Err(ShroudError::ValidationError("page limit must be positive".into()));
        }

        let start = Self::parse_cursor(cursor)?;
        let end = self.next_id.load(Ordering::SeqCst);
        let page_end = start.saturating_add(limit as u64).min(end);

        let announcements: Vec<Announcement> = (start..page_end)
            .filter_map(|id| self.get_by_id(id))
            .collect();

        let next = (page_end < end).then(|| PageCursor::new(page_end.to_string()));

        debug!(start, count = announcements.len(), has_next = next.is_some(), "Served page");
        Ok(AnnouncementPage::new(announcements, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_core::constants::ECIES_CIPHERTEXT_SIZE;
    use shroud_core::types::{AnnouncementBuilder, EthAddress};

    fn make_test_announcement(seed: u8) -> Announcement {
        AnnouncementBuilder::new()
            .receiver(EthAddress::from_array([seed.wrapping_add(1); 20]))
            .pkx([seed; 32])
            .ciphertext(vec![0x42; ECIES_CIPHERTEXT_SIZE])
            .tx_hash(TxHash::from_array([seed.wrapping_add(1); 32]))
            .timestamp(1_000 + seed as u64)
            .build()
            .unwrap()
    }

    #[test]
    fn test_publish_and_get_by_id() {
        let registry = MemoryRegistry::new();
        let ann = make_test_announcement(0x42);

        let id = registry.publish(ann.clone()).unwrap();
        assert_eq!(id, 1);
        assert_eq!(registry.get_by_id(id).unwrap(), ann);
        assert_eq!(registry.get_by_tx_hash(&ann.tx_hash).unwrap(), ann);
        assert!(registry.get_by_id(999).is_none());
    }

    #[test]
    fn test_ids_are_sequential() {
        let registry = MemoryRegistry::new();

        let id1 = registry.publish(make_test_announcement(1)).unwrap();
        let id2 = registry.publish(make_test_announcement(2)).unwrap();
        let id3 = registry.publish(make_test_announcement(3)).unwrap();

        assert_eq!((id1, id2, id3), (1, 2, 3));
    }

    #[test]
    fn test_duplicate_tx_hash_rejected() {
        let registry = MemoryRegistry::new();
        registry.publish(make_test_announcement(1)).unwrap();

        let result = registry.publish(make_test_announcement(1));
        assert!(matches!(result, Err(ShroudError::InvalidAnnouncement(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unset_tx_hash_not_deduplicated() {
        let registry = MemoryRegistry::new();
        let mut ann = make_test_announcement(1);
        ann.tx_hash = TxHash::default();

        registry.publish(ann.clone()).unwrap();
        registry.publish(ann).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_announcement_rejected() {
        let registry = MemoryRegistry::new();
        let mut invalid = make_test_announcement(1);
        invalid.ciphertext.truncate(8);

        assert!(registry.publish(invalid).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_import_keeps_redeliveries() {
        let registry = MemoryRegistry::new();
        let ann = make_test_announcement(7);

        let imported = registry.import(vec![ann.clone(), ann.clone()]).unwrap();
        assert_eq!(imported, 2);
        assert_eq!(registry.all_announcements(), vec![ann.clone(), ann]);
    }

    #[test]
    fn test_get_by_time_range() {
        let registry = MemoryRegistry::new();
        for seed in [30u8, 10, 20] {
            registry.publish(make_test_announcement(seed)).unwrap();
        }

        let results = registry.get_by_time_range(1_015, 1_025);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].timestamp, 1_020);

        let all = registry.get_by_time_range(0, u64::MAX);
        let timestamps: Vec<u64> = all.iter().map(|a| a.timestamp).collect();
        assert_eq!(timestamps, vec![1_010, 1_020, 1_030]);
    }

    #[test]
    fn test_stats_and_clear() {
        let registry = MemoryRegistry::new();
        registry.publish(make_test_announcement(1)).unwrap();
        registry.publish(make_test_announcement(2)).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.earliest_timestamp, Some(1_001));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.stats().total_count, 0);
        assert_eq!(registry.publish(make_test_announcement(1)).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pagination_walks_everything_once() {
        let registry = MemoryRegistry::new();
        for seed in 0..7u8 {
            registry.publish(make_test_announcement(seed)).unwrap();
        }

        let mut cursor: Option<PageCursor> = None;
        let mut seen = Vec::new();
        let mut pages = 0;
        loop {
            let page = registry.fetch_page(cursor.as_ref(), 3).await.unwrap();
            pages += 1;
            seen.extend(page.announcements.iter().map(|a| a.pkx[0]));
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, (0..7u8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_registry_single_last_page() {
        let registry = MemoryRegistry::new();
        let page = registry.fetch_page(None, 10).await.unwrap();
        assert!(page.is_last());
        assert!(page.announcements.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_errors() {
        let registry = MemoryRegistry::new();
        assert!(registry.fetch_page(None, 0).await.is_err());

        let bad = PageCursor::new("not-a-number");
        assert!(matches!(
            registry.fetch_page(Some(&bad), 10).await,
            Err(ShroudError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_publish() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let registry = Arc::new(MemoryRegistry::new());
        let mut tasks = JoinSet::new();

        for i in 0..100u8 {
            let reg = registry.clone();
            tasks.spawn(async move { reg.publish(make_test_announcement(i)).unwrap() });
        }

        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert_eq!(registry.len(), 100);
    }
}
