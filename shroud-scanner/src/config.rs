//! Scanner configuration.

use shroud_core::constants::{DEFAULT_SCAN_BATCH_SIZE, MAX_SCAN_BATCH_SIZE};
use shroud_core::error::{Result, ShroudError};

/// Environment variable for [`ScannerConfig::batch_size`].
pub const ENV_BATCH_SIZE: &str = "SHROUD_SCAN_BATCH_SIZE";
/// Environment variable for [`ScannerConfig::max_batches`].
pub const ENV_MAX_BATCHES: &str = "SHROUD_SCAN_MAX_BATCHES";
/// Environment variable for [`ScannerConfig::parallelism`].
pub const ENV_PARALLELISM: &str = "SHROUD_SCAN_PARALLELISM";
/// Environment variable for [`ScannerConfig::dedupe_tx_hashes`].
pub const ENV_DEDUPE: &str = "SHROUD_SCAN_DEDUPE";

/// Scanner configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Page size requested from the source
    pub batch_size: usize,
    /// Stop after this many pages (None = until the source is exhausted)
    pub max_batches: Option<usize>,
    /// Number of blocking workers for trial decryption of one batch
    pub parallelism: usize,
    /// Skip announcements whose tx hash was already seen by this cursor
    pub dedupe_tx_hashes: bool,
    /// Minimum timestamp to scan from (inclusive)
    pub from_timestamp: Option<u64>,
    /// Maximum timestamp to scan to (inclusive)
    pub to_timestamp: Option<u64>,
    /// Whether to stop on first discovery
    pub stop_on_first: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
            max_batches: None,
            parallelism: 1,
            dedupe_tx_hashes: true,
            from_timestamp: None,
            to_timestamp: None,
            stop_on_first: false,
        }
    }
}

impl ScannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `SHROUD_SCAN_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_BATCH_SIZE) {
            config = config.batch_size(parse_number(ENV_BATCH_SIZE, &value)?);
        }
        if let Some(value) = lookup(ENV_MAX_BATCHES) {
            config.max_batches = Some(parse_number(ENV_MAX_BATCHES, &value)?);
        }
        if let Some(value) = lookup(ENV_PARALLELISM) {
            config.parallelism = parse_number(ENV_PARALLELISM, &value)?;
        }
        if let Some(value) = lookup(ENV_DEDUPE) {
            config.dedupe_tx_hashes = value.trim() != "false" && value.trim() != "0";
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the batch size, capped at the maximum page size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.min(MAX_SCAN_BATCH_SIZE);
        self
    }

    /// Stops after `batches` pages.
    pub fn max_batches(mut self, batches: usize) -> Self {
        self.max_batches = Some(batches);
        self
    }

    /// Sets the number of trial-decryption workers.
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self
    }

    /// Enables or disables tx-hash deduplication.
    pub fn dedupe_tx_hashes(mut self, enabled: bool) -> Self {
        self.dedupe_tx_hashes = enabled;
        self
    }

    /// Enables stopping on first discovery.
    pub fn stop_on_first(mut self) -> Self {
        self.stop_on_first = true;
        self
    }

    /// Sets the time range filter.
    pub fn time_range(mut self, from: u64, to: u64) -> Self {
        self.from_timestamp = Some(from);
        self.to_timestamp = Some(to);
        self
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ShroudError::ConfigError("batch_size must be positive".into()));
        }
        if self.batch_size > MAX_SCAN_BATCH_SIZE {
            return Err(ShroudError::ConfigError(format!(
                "batch_size {} exceeds maximum {}",
                self.batch_size, MAX_SCAN_BATCH_SIZE
            )));
        }
        if self.parallelism == 0 {
            return Err(ShroudError::ConfigError("parallelism must be positive".into()));
        }
        if self.max_batches == Some(0) {
            return Err(ShroudError::ConfigError("max_batches must be positive".into()));
        }
        if let (Some(from), Some(to)) = (self.from_timestamp, self.to_timestamp) {
            if from > to {
                return Err(ShroudError::ConfigError(format!(
                    "time range is empty: {} > {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// Returns true if `timestamp` falls inside the configured range.
    pub fn in_time_range(&self, timestamp: u64) -> bool {
        self.from_timestamp.map_or(true, |from| timestamp >= from)
            && self.to_timestamp.map_or(true, |to| timestamp <= to)
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ShroudError::ConfigError(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.parallelism, 1);
        assert!(config.dedupe_tx_hashes);
        assert!(config.max_batches.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_capped() {
        let config = ScannerConfig::new().batch_size(50_000);
        assert_eq!(config.batch_size, MAX_SCAN_BATCH_SIZE);
    }

    #[test]
    fn test_from_lookup() {
        let config = ScannerConfig::from_lookup(lookup(&[
            (ENV_BATCH_SIZE, "250"),
            (ENV_MAX_BATCHES, "4"),
            (ENV_PARALLELISM, " 8 "),
            (ENV_DEDUPE, "false"),
        ]))
        .unwrap();

        assert_eq!(config.batch_size, 250);
        assert_eq!(config.max_batches, Some(4));
        assert_eq!(config.parallelism, 8);
        assert!(!config.dedupe_tx_hashes);
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = ScannerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ScannerConfig::default());
    }

    #[test_case(ENV_BATCH_SIZE, "lots" ; "unparsable batch size")]
    #[test_case(ENV_BATCH_SIZE, "0" ; "zero batch size")]
    #[test_case(ENV_PARALLELISM, "0" ; "zero parallelism")]
    #[test_case(ENV_MAX_BATCHES, "-1" ; "negative max batches")]
    fn test_from_lookup_rejects(key: &str, value: &str) {
        assert!(matches!(
            ScannerConfig::from_lookup(lookup(&[(key, value)])),
            Err(ShroudError::ConfigError(_))
        ));
    }

    #[test]
    fn test_time_range() {
        let config = ScannerConfig::new().time_range(100, 200);
        assert!(!config.in_time_range(99));
        assert!(config.in_time_range(100));
        assert!(config.in_time_range(200));
        assert!(!config.in_time_range(201));

        assert!(ScannerConfig::new().time_range(5, 1).validate().is_err());
    }
}
