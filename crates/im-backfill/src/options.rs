//! Options controlling one backfill run

use crate::error::{JobError, JobResult};
use im_core::config::{DEFAULT_BATCH_SIZE, DEFAULT_SAMPLE_SIZE};
use im_core::Config;

/// Options for [`BackfillJob::run`](crate::BackfillJob::run) and the
/// dependent pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillOptions {
    /// Rows per batch transaction
    pub batch_size: usize,

    /// Compute identifiers without writing anything
    pub dry_run: bool,

    /// Number of would-be assignments collected by a dry run
    pub sample_size: usize,

    /// Stop after this many committed batches
    pub max_batches: Option<usize>,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_batches: None,
        }
    }
}

impl BackfillOptions {
    /// Options seeded from the file configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            sample_size: config.sample_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> JobResult<()> {
        if self.batch_size == 0 {
            return Err(JobError::InvalidOptions(
                "batch_size must be a positive integer".to_string(),
            ));
        }
        if self.max_batches == Some(0) {
            return Err(JobError::InvalidOptions(
                "max_batches must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `committed` batches exhaust the batch allowance
    pub(crate) fn batch_limit_reached(&self, committed: usize) -> bool {
        self.max_batches.is_some_and(|max| committed >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = BackfillOptions::default();
        assert_eq!(opts.batch_size, 1000);
        assert_eq!(opts.sample_size, 10);
        assert!(!opts.dry_run);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let opts = BackfillOptions {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(JobError::InvalidOptions(_))));
    }

    #[test]
    fn test_rejects_zero_max_batches() {
        let opts = BackfillOptions {
            max_batches: Some(0),
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(JobError::InvalidOptions(_))));
    }

    #[test]
    fn test_batch_limit() {
        let opts = BackfillOptions {
            max_batches: Some(2),
            ..Default::default()
        };
        assert!(!opts.batch_limit_reached(1));
        assert!(opts.batch_limit_reached(2));
        assert!(!BackfillOptions::default().batch_limit_reached(usize::MAX));
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_yaml("batch_size: 50\nsample_size: 3\n").unwrap();
        let opts = BackfillOptions::from_config(&config);
        assert_eq!(opts.batch_size, 50);
        assert_eq!(opts.sample_size, 3);
    }
}
