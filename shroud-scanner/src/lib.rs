//! # SHROUD Scanner
//!
//! Paginated scanning of announcements to discover payments.
//!
//! ## Features
//!
//! - **Pull-based Cursor**: One page per `next_batch` call, nothing runs in between
//! - **Lazy Streams**: `futures::Stream` of matches, fetched as it is polled
//! - **Resumable Scans**: Persist the cursor position and pick up later
//! - **Parallel Trial Decryption**: Optional blocking workers per batch
//! - **Progress Reporting**: Callbacks after every batch
//!
//! ## Example
//!
//! ```rust
//! use shroud_registry::MemoryRegistry;
//! use shroud_scanner::Scanner;
//! use shroud_stealth::{prepare_send_to_meta_address, StealthKeys};
//!
//! # tokio_test::block_on(async {
//! let keys = StealthKeys::generate();
//! let registry = MemoryRegistry::new();
//!
//! let prep = prepare_send_to_meta_address(&keys.meta_address()?)?;
//! registry.publish(prep.announcement().build()?)?;
//!
//! let scanner = Scanner::from_keys(&keys);
//! let found = scanner.scan_all(&registry).await?;
//! assert_eq!(found.len(), 1);
//! # Ok::<(), shroud_core::ShroudError>(())
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod cursor;
pub mod stats;

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{info, instrument};

use shroud_core::error::Result;
use shroud_core::traits::AnnouncementSource;
use shroud_core::types::{Announcement, PageCursor};
use shroud_stealth::{StealthKeys, UserAnnouncement, ViewingKeys};

pub use config::ScannerConfig;
pub use cursor::ScanCursor;
pub use stats::{ProgressCallback, ScanProgress, ScanStats};

/// Main scanner for discovering payments.
///
/// Holds only viewing material, so a scanner can find payments but never
/// spend them.
pub struct Scanner {
    keys: Arc<ViewingKeys>,
    config: ScannerConfig,
    stats: Arc<RwLock<ScanStats>>,
}

impl Scanner {
    /// Creates a scanner with the default configuration.
    pub fn new(keys: ViewingKeys) -> Self {
        Self {
            keys: Arc::new(keys),
            config: ScannerConfig::default(),
            stats: Arc::new(RwLock::new(ScanStats::new())),
        }
    }

    /// Creates a scanner with a custom configuration.
    ///
    /// # Errors
    /// `ConfigError` if the configuration does not validate.
    pub fn with_config(keys: ViewingKeys, config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(keys)
        })
    }

    /// Creates a scanner from a recipient's full key set.
    pub fn from_keys(keys: &StealthKeys) -> Self {
        Self::new(ViewingKeys::from(keys))
    }

    /// Returns the viewing keys.
    pub fn keys(&self) -> &ViewingKeys {
        &self.keys
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns the statistics accumulated over every cursor of this scanner.
    pub fn stats(&self) -> ScanStats {
        self.stats.read().clone()
    }

    /// Resets the statistics.
    pub fn reset_stats(&self) {
        *self.stats.write() = ScanStats::new();
    }

    /// Opens a cursor at the first page of `source`.
    pub fn cursor<'a, S>(&self, source: &'a S) -> ScanCursor<'a, S>
    where
        S: AnnouncementSource + ?Sized,
    {
        self.open(source, None)
    }

    /// Opens a cursor at a previously saved position.
    pub fn cursor_from<'a, S>(&self, source: &'a S, position: PageCursor) -> ScanCursor<'a, S>
    where
        S: AnnouncementSource + ?Sized,
    {
        self.open(source, Some(position))
    }

    fn open<'a, S>(&self, source: &'a S, position: Option<PageCursor>) -> ScanCursor<'a, S>
    where
        S: AnnouncementSource + ?Sized,
    {
        ScanCursor::new(
            source,
            Arc::clone(&self.keys),
            self.config.clone(),
            Arc::clone(&self.stats),
            position,
        )
    }

    /// Scans the whole source and collects every match.
    #[instrument(skip(self, source))]
    pub async fn scan_all<S>(&self, source: &S) -> Result<Vec<UserAnnouncement>>
    where
        S: AnnouncementSource + ?Sized,
    {
        let start = Instant::now();
        let mut cursor = self.cursor(source);
        let mut discoveries = Vec::new();

        info!(batch_size = self.config.batch_size, "Starting scan");

        while let Some(batch) = cursor.next_batch().await? {
            discoveries.extend(batch);
        }

        let stats = cursor.stats();
        info!(
            discoveries = discoveries.len(),
            scanned = stats.total_scanned,
            batches = stats.batches,
            duration_ms = start.elapsed().as_millis() as u64,
            rate = format!("{:.2}/s", stats.rate()),
            "Scan complete"
        );

        Ok(discoveries)
    }

    /// Scans the whole source, reporting progress after every batch.
    ///
    /// The last report has `done` set.
    #[instrument(skip(self, source, progress_callback))]
    pub async fn scan_with_progress<S>(
        &self,
        source: &S,
        progress_callback: ProgressCallback,
    ) -> Result<Vec<UserAnnouncement>>
    where
        S: AnnouncementSource + ?Sized,
    {
        let start = Instant::now();
        let mut cursor = self.cursor(source);
        let mut discoveries = Vec::new();
        let mut progress = ScanProgress::new();

        while let Some(batch) = cursor.next_batch().await? {
            discoveries.extend(batch);

            let stats = cursor.stats();
            progress.update(
                stats.batches,
                stats.total_scanned,
                discoveries.len() as u64,
                start.elapsed().as_millis() as u64,
            );
            progress_callback(progress.clone());
        }

        let stats = cursor.stats();
        progress.update(
            stats.batches,
            stats.total_scanned,
            discoveries.len() as u64,
            start.elapsed().as_millis() as u64,
        );
        progress.done = true;
        progress_callback(progress);

        Ok(discoveries)
    }

    /// Scans a single announcement.
    ///
    /// Unlike the cursor, malformed announcements are reported as errors.
    pub fn scan_one(&self, announcement: &Announcement) -> Result<Option<UserAnnouncement>> {
        let start = Instant::now();
        let result = self.keys.scan(announcement);

        let mut stats = self.stats.write();
        stats.received += 1;
        stats.total_scanned += 1;
        match &result {
            Ok(Some(_)) => stats.discoveries += 1,
            Ok(None) => {}
            Err(e) if e.is_skippable_scan_item() => stats.malformed += 1,
            Err(_) => {}
        }
        stats.duration_ms += start.elapsed().as_millis() as u64;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use shroud_core::error::ShroudError;
    use shroud_core::types::{AnnouncementBuilder, AnnouncementPage, EthAddress, TxHash};
    use shroud_core::ECIES_CIPHERTEXT_SIZE;
    use shroud_registry::MemoryRegistry;
    use shroud_stealth::prepare_send;
    use test_case::test_case;

    fn setup_scanner_and_registry() -> (Scanner, MemoryRegistry, StealthKeys) {
        let keys = StealthKeys::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(7));
        (Scanner::from_keys(&keys), MemoryRegistry::new(), keys)
    }

    fn tx_hash(n: u32) -> TxHash {
        let mut bytes = [0u8; 32];
        bytes[28..].copy_from_slice(&n.to_be_bytes());
        TxHash::from_array(bytes)
    }

    fn create_announcement_for_keys(keys: &StealthKeys, n: u32) -> Announcement {
        prepare_send(
            &keys.spending().public_key_bytes(true),
            &keys.viewing().public_key_bytes(true),
        )
        .unwrap()
        .announcement()
        .tx_hash(tx_hash(n))
        .timestamp(1_000 + n as u64)
        .build()
        .unwrap()
    }

    fn create_other_announcement(n: u32) -> Announcement {
        let other = StealthKeys::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(1_000 + n as u64));
        create_announcement_for_keys(&other, n)
    }

    fn create_malformed_announcement(n: u32) -> Announcement {
        // x = 5 has no point on secp256k1
        let mut pkx = [0u8; 32];
        pkx[31] = 5;
        AnnouncementBuilder::new()
            .receiver(EthAddress::from_array([0x11; 20]))
            .pkx(pkx)
            .ciphertext(vec![0x42; ECIES_CIPHERTEXT_SIZE])
            .tx_hash(tx_hash(n))
            .timestamp(1_000 + n as u64)
            .build()
            .unwrap()
    }

    /// Serves the registry's first page, then fails.
    struct FlakySource {
        inner: MemoryRegistry,
    }

    #[async_trait]
    impl AnnouncementSource for FlakySource {
        async fn fetch_page(&self, cursor: Option<&PageCursor>, limit: usize) -> Result<AnnouncementPage> {
            match cursor {
                None => self.inner.fetch_page(None, limit).await,
                Some(_) => Err(ShroudError::SourceError("connection reset".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_scan_empty_registry() {
        let (scanner, registry, _) = setup_scanner_and_registry();

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert!(discoveries.is_empty());
        assert_eq!(scanner.stats().batches, 1);
    }

    #[tokio::test]
    async fn test_scan_finds_payment() {
        let (scanner, registry, keys) = setup_scanner_and_registry();

        let ann = create_announcement_for_keys(&keys, 1);
        registry.publish(ann.clone()).unwrap();

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].announcement, ann);
        assert!(!discoveries[0].is_withdrawn);

        let stealth = discoveries[0].stealth_key_pair(keys.spending()).unwrap();
        assert_eq!(stealth.address(), ann.receiver);
    }

    #[tokio::test]
    async fn test_scan_ignores_other_payments() {
        let (scanner, registry, keys) = setup_scanner_and_registry();

        registry.publish(create_announcement_for_keys(&keys, 0)).unwrap();
        for i in 1..=10 {
            registry.publish(create_other_announcement(i)).unwrap();
        }

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].announcement.tx_hash, tx_hash(0));
    }

    #[tokio::test]
    async fn test_scan_multiple_payments_across_pages() {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().batch_size(2),
        )
        .unwrap();

        for i in 0..5 {
            registry.publish(create_announcement_for_keys(&keys, i)).unwrap();
        }

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert_eq!(discoveries.len(), 5);

        let order: Vec<TxHash> = discoveries.iter().map(|d| d.announcement.tx_hash).collect();
        assert_eq!(order, (0..5).map(tx_hash).collect::<Vec<_>>());
        assert_eq!(scanner.stats().batches, 3);
    }

    #[tokio::test]
    async fn test_scan_stop_on_first() {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner =
            Scanner::with_config(ViewingKeys::from(&keys), ScannerConfig::new().stop_on_first())
                .unwrap();

        for i in 0..5 {
            registry.publish(create_announcement_for_keys(&keys, i)).unwrap();
        }

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].announcement.tx_hash, tx_hash(0));
    }

    #[tokio::test]
    async fn test_scan_time_filter() {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().time_range(1_150, 1_250),
        )
        .unwrap();

        for (i, ts) in [(1, 1_100u64), (2, 1_200), (3, 1_300)] {
            let mut ann = create_announcement_for_keys(&keys, i);
            ann.timestamp = ts;
            registry.publish(ann).unwrap();
        }

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].announcement.timestamp, 1_200);
        assert_eq!(scanner.stats().filtered, 2);
    }

    #[tokio::test]
    async fn test_scan_skips_malformed() {
        let (scanner, registry, keys) = setup_scanner_and_registry();

        registry.publish(create_malformed_announcement(1)).unwrap();
        registry.publish(create_announcement_for_keys(&keys, 2)).unwrap();

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert_eq!(discoveries.len(), 1);

        let stats = scanner.stats();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.total_scanned, 2);
    }

    #[test_case(true, 1 ; "dedupe on")]
    #[test_case(false, 3 ; "dedupe off")]
    #[tokio::test]
    async fn test_scan_redelivered_announcements(dedupe: bool, expected: usize) {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().dedupe_tx_hashes(dedupe),
        )
        .unwrap();

        let ann = create_announcement_for_keys(&keys, 9);
        registry
            .import(vec![ann.clone(), ann.clone(), ann.clone()])
            .unwrap();

        let discoveries = scanner.scan_all(&registry).await.unwrap();
        assert_eq!(discoveries.len(), expected);
        assert!(discoveries.iter().all(|d| d == &discoveries[0]));
        assert_eq!(scanner.stats().duplicates_skipped as usize, 3 - expected);
    }

    #[tokio::test]
    async fn test_max_batches_then_resume() {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().batch_size(2).max_batches(1),
        )
        .unwrap();

        for i in 0..3 {
            registry.publish(create_announcement_for_keys(&keys, i)).unwrap();
        }

        let mut cursor = scanner.cursor(&registry);
        let first = cursor.next_batch().await.unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert!(cursor.next_batch().await.unwrap().is_none());

        let checkpoint = cursor.position().cloned().unwrap();
        drop(cursor);

        let mut resumed = scanner.cursor_from(&registry, checkpoint);
        let rest = resumed.next_batch().await.unwrap().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].announcement.tx_hash, tx_hash(2));
        assert!(resumed.is_exhausted());
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().batch_size(1),
        )
        .unwrap();

        registry.publish(create_announcement_for_keys(&keys, 1)).unwrap();
        registry.publish(create_announcement_for_keys(&keys, 2)).unwrap();
        let source = FlakySource { inner: registry };

        let mut cursor = scanner.cursor(&source);
        let first = cursor.next_batch().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        let err = cursor.next_batch().await.unwrap_err();
        assert!(matches!(err, ShroudError::SourceError(ref msg) if msg == "connection reset"));
        assert!(err.is_recoverable());

        assert!(matches!(
            scanner.scan_all(&source).await,
            Err(ShroudError::SourceError(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_scan_keeps_arrival_order() {
        let (_, registry, keys) = setup_scanner_and_registry();
        for i in 0..12 {
            let ann = if i % 3 == 1 {
                create_announcement_for_keys(&keys, i)
            } else {
                create_other_announcement(i)
            };
            registry.publish(ann).unwrap();
        }

        let sequential = Scanner::from_keys(&keys).scan_all(&registry).await.unwrap();
        let parallel = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().parallelism(4),
        )
        .unwrap()
        .scan_all(&registry)
        .await
        .unwrap();

        assert_eq!(sequential.len(), 4);
        assert_eq!(parallel, sequential);
    }

    #[tokio::test]
    async fn test_stream_yields_matches() {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().batch_size(1),
        )
        .unwrap();

        registry.publish(create_announcement_for_keys(&keys, 1)).unwrap();
        registry.publish(create_other_announcement(2)).unwrap();
        registry.publish(create_announcement_for_keys(&keys, 3)).unwrap();

        let found: Vec<UserAnnouncement> = scanner
            .cursor(&registry)
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        let hashes: Vec<TxHash> = found.iter().map(|d| d.announcement.tx_hash).collect();
        assert_eq!(hashes, vec![tx_hash(1), tx_hash(3)]);
    }

    #[tokio::test]
    async fn test_scan_progress_callback() {
        let (_, registry, keys) = setup_scanner_and_registry();
        let scanner = Scanner::with_config(
            ViewingKeys::from(&keys),
            ScannerConfig::new().batch_size(2),
        )
        .unwrap();

        for i in 0..5 {
            registry.publish(create_announcement_for_keys(&keys, i)).unwrap();
        }

        let progress_updates = Arc::new(RwLock::new(Vec::new()));
        let updates_clone = progress_updates.clone();

        let callback: ProgressCallback = Box::new(move |progress| {
            updates_clone.write().push(progress);
        });

        scanner.scan_with_progress(&registry, callback).await.unwrap();

        let updates = progress_updates.read();
        // One report per batch plus the final one
        assert_eq!(updates.len(), 4);
        assert!(updates[..3].iter().all(|p| !p.done));

        let last = updates.last().unwrap();
        assert!(last.done);
        assert_eq!(last.batches, 3);
        assert_eq!(last.scanned, 5);
        assert_eq!(last.discoveries, 5);
    }

    #[tokio::test]
    async fn test_stats_and_reset() {
        let (scanner, registry, keys) = setup_scanner_and_registry();

        registry.publish(create_announcement_for_keys(&keys, 0)).unwrap();
        for i in 1..=3 {
            registry.publish(create_other_announcement(i)).unwrap();
        }

        scanner.scan_all(&registry).await.unwrap();

        let stats = scanner.stats();
        assert_eq!(stats.discoveries, 1);
        assert_eq!(stats.total_scanned, 4);
        assert_eq!(stats.received, 4);

        scanner.reset_stats();
        assert_eq!(scanner.stats(), ScanStats::new());
    }

    #[test]
    fn test_scan_one() {
        let (scanner, _, keys) = setup_scanner_and_registry();

        let mine = create_announcement_for_keys(&keys, 1);
        assert!(scanner.scan_one(&mine).unwrap().is_some());
        assert!(scanner.scan_one(&create_other_announcement(2)).unwrap().is_none());
        assert!(matches!(
            scanner.scan_one(&create_malformed_announcement(3)),
            Err(ShroudError::ScanItem(_))
        ));

        let stats = scanner.stats();
        assert_eq!(stats.total_scanned, 3);
        assert_eq!(stats.discoveries, 1);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let keys = StealthKeys::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(3));
        let result = Scanner::with_config(ViewingKeys::from(&keys), ScannerConfig::new().parallelism(0));
        assert!(matches!(result, Err(ShroudError::ConfigError(_))));
    }
}
