//! Pull-based scan cursor over a paginated announcement source.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, Stream, TryStreamExt};
use parking_lot::RwLock;
use tracing::{debug, info};

use shroud_core::error::{Result, ShroudError};
use shroud_core::traits::AnnouncementSource;
use shroud_core::types::{Announcement, PageCursor, TxHash};
use shroud_stealth::{UserAnnouncement, ViewingKeys};

use crate::config::ScannerConfig;
use crate::stats::ScanStats;

type Outcome = Result<Option<UserAnnouncement>>;

/// Walks an [`AnnouncementSource`] one page at a time.
///
/// Each call to [`next_batch`](Self::next_batch) fetches one page, filters
/// it, trial-decrypts what remains and returns the matches in arrival
/// order. Nothing happens between calls, so dropping the cursor cancels
/// the scan.
pub struct ScanCursor<'a, S: AnnouncementSource + ?Sized> {
    source: &'a S,
    keys: Arc<ViewingKeys>,
    config: ScannerConfig,
    shared_stats: Arc<RwLock<ScanStats>>,
    stats: ScanStats,
    position: Option<PageCursor>,
    seen: HashSet<TxHash>,
    batches: usize,
    exhausted: bool,
}

impl<'a, S: AnnouncementSource + ?Sized> ScanCursor<'a, S> {
    pub(crate) fn new(
        source: &'a S,
        keys: Arc<ViewingKeys>,
        config: ScannerConfig,
        shared_stats: Arc<RwLock<ScanStats>>,
        position: Option<PageCursor>,
    ) -> Self {
        Self {
            source,
            keys,
            config,
            shared_stats,
            stats: ScanStats::new(),
            position,
            seen: HashSet::new(),
            batches: 0,
            exhausted: false,
        }
    }

    /// Cursor of the next page to fetch (`None` = the first page).
    ///
    /// Persist it to resume later with [`Scanner::cursor_from`](crate::Scanner::cursor_from).
    /// Once the source is exhausted it keeps pointing at the start of the
    /// last page, so a resumed scan picks up announcements appended there.
    pub fn position(&self) -> Option<&PageCursor> {
        self.position.as_ref()
    }

    /// Returns true once no further batches will be produced.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted || self.budget_spent()
    }

    /// Counters for this cursor only.
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    fn budget_spent(&self) -> bool {
        self.config
            .max_batches
            .map_or(false, |max| self.batches >= max)
    }

    /// Fetches and scans the next page.
    ///
    /// Returns `Ok(None)` when the source is exhausted or the batch budget
    /// is spent. A page may legitimately yield an empty batch. Source
    /// errors are returned unchanged and leave the position on the failed
    /// page.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<UserAnnouncement>>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.budget_spent() {
            debug!(batches = self.batches, "Batch budget spent");
            return Ok(None);
        }

        let start = Instant::now();
        let page = self
            .source
            .fetch_page(self.position.as_ref(), self.config.batch_size)
            .await?;

        self.batches += 1;
        match page.next {
            Some(next) => self.position = Some(next),
            None => self.exhausted = true,
        }

        let mut batch = ScanStats {
            batches: 1,
            received: page.announcements.len() as u64,
            ..ScanStats::default()
        };

        let admitted = self.admit(page.announcements, &mut batch);
        batch.total_scanned = admitted.len() as u64;

        let outcomes = self.trial_decrypt(admitted).await?;

        let mut found = Vec::new();
        let mut failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(Some(user_announcement)) => found.push(user_announcement),
                Ok(None) => {}
                Err(e) if e.is_skippable_scan_item() => {
                    batch.malformed += 1;
                    debug!(error = %e, "Skipping malformed announcement");
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if self.config.stop_on_first && !found.is_empty() {
            found.truncate(1);
            self.exhausted = true;
            info!("Stopping on first discovery");
        }

        batch.discoveries = found.len() as u64;
        batch.duration_ms = start.elapsed().as_millis() as u64;
        self.record(&batch);

        if let Some(e) = failure {
            return Err(e);
        }

        debug!(
            batch = self.batches,
            received = batch.received,
            scanned = batch.total_scanned,
            discoveries = batch.discoveries,
            "Scanned batch"
        );

        Ok(Some(found))
    }

    /// Turns the cursor into a lazy stream of matches.
    ///
    /// Pages are fetched only as the stream is polled. The first error ends
    /// the stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<UserAnnouncement>> + Send + 'a
    where
        S: 'a,
    {
        stream::try_unfold(self, |mut cursor| async move {
            let batch = cursor.next_batch().await?;
            Ok::<_, ShroudError>(batch.map(|found| {
                let items = stream::iter(found.into_iter().map(Ok::<_, ShroudError>));
                (items, cursor)
            }))
        })
        .try_flatten()
    }

    /// Applies the timestamp filter and tx-hash deduplication.
    fn admit(&mut self, announcements: Vec<Announcement>, batch: &mut ScanStats) -> Vec<Announcement> {
        let config = &self.config;
        let seen = &mut self.seen;

        announcements
            .into_iter()
            .filter(|announcement| {
                if !config.in_time_range(announcement.timestamp) {
                    batch.filtered += 1;
                    return false;
                }
                // A zero hash means the origin transaction is unknown.
                if config.dedupe_tx_hashes
                    && !announcement.tx_hash.is_zero()
                    && !seen.insert(announcement.tx_hash)
                {
                    batch.duplicates_skipped += 1;
                    return false;
                }
                true
            })
            .collect()
    }

    /// Trial-decrypts a batch, preserving arrival order.
    async fn trial_decrypt(&self, announcements: Vec<Announcement>) -> Result<Vec<Outcome>> {
        let workers = self.config.parallelism.min(announcements.len());
        if workers <= 1 {
            return Ok(announcements.iter().map(|a| self.keys.scan(a)).collect());
        }

        let total = announcements.len();
        let chunk_size = (total + workers - 1) / workers;
        let mut remaining = announcements.into_iter();
        let mut handles = Vec::with_capacity(workers);

        loop {
            let chunk: Vec<Announcement> = remaining.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let keys = Arc::clone(&self.keys);
            handles.push(tokio::task::spawn_blocking(move || {
                chunk.iter().map(|a| keys.scan(a)).collect::<Vec<Outcome>>()
            }));
        }

        // Handles are joined in chunk order, which is arrival order.
        let mut outcomes = Vec::with_capacity(total);
        for joined in futures::future::join_all(handles).await {
            let chunk = joined
                .map_err(|e| ShroudError::InternalError(format!("scan worker failed: {}", e)))?;
            outcomes.extend(chunk);
        }

        Ok(outcomes)
    }

    fn record(&mut self, batch: &ScanStats) {
        self.stats.merge(batch);
        self.shared_stats.write().merge(batch);
    }
}
