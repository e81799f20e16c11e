use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::ReservationRecord;
use crate::store::{truncate, RecordStore, MAX_ERROR_BODY};

pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Error samples kept per run; later failures are only counted.
pub const MAX_ERROR_SAMPLES: usize = 5;
/// Upper bound on `RetryPolicy::max_attempts`.
pub const MAX_ATTEMPTS: u32 = 3;
const PROGRESS_EVERY: usize = 200;

/// Per-batch retry. The default is a single attempt, i.e. no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): backoff, 2x backoff, 4x ...
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Insert `records` in contiguous batches, in order, one request per batch.
/// A failed batch (server reply or transport error) counts every row in it as
/// failed and the upload moves on to the next batch.
pub fn upload<S: RecordStore + ?Sized>(
    store: &S,
    records: &[ReservationRecord],
    options: &UploadOptions,
) -> UploadReport {
    let mut report = UploadReport::default();
    let batch_size = options.batch_size.max(1);
    let total = records.len();

    for (n, batch) in records.chunks(batch_size).enumerate() {
        match insert_with_retry(store, batch, &options.retry) {
            Ok(()) => {
                let before = report.succeeded;
                report.succeeded += batch.len();
                debug!(batch = n + 1, rows = batch.len(), "batch accepted");
                if before / PROGRESS_EVERY != report.succeeded / PROGRESS_EVERY || report.succeeded == total {
                    info!(done = report.succeeded, total, "upload progress");
                }
            }
            Err(e) => {
                report.failed += batch.len();
                warn!(batch = n + 1, rows = batch.len(), error = %e, "batch rejected");
                if report.errors.len() < MAX_ERROR_SAMPLES {
                    report.errors.push(describe_failure(n, &e));
                }
            }
        }
    }
    report
}

fn insert_with_retry<S: RecordStore + ?Sized>(
    store: &S,
    batch: &[ReservationRecord],
    retry: &RetryPolicy,
) -> crate::error::Result<()> {
    let attempts = retry.max_attempts.clamp(1, MAX_ATTEMPTS);
    let mut attempt = 1;
    loop {
        match store.insert_batch(batch) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                let delay = retry.delay(attempt);
                debug!(attempt, ?delay, error = %e, "retrying batch");
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn describe_failure(batch_index: usize, err: &SyncError) -> String {
    let detail = match err {
        SyncError::Server { status, body } => format!("{status}: {body}"),
        other => format!("Exception: {other}"),
    };
    format!("(batch {}) {}", batch_index + 1, truncate(&detail, MAX_ERROR_BODY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn records(n: usize) -> Vec<ReservationRecord> {
        let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        (0..n)
            .map(|i| ReservationRecord {
                id: Uuid::new_v4(),
                date: base + chrono::Duration::days((i % 273) as i64),
                customer_name: format!("Guest {i}"),
                category: "一般".into(),
                unit_price: 6000,
                number_of_people: 2,
                tennis_court: 0,
                banquet_hall: 0,
                other: 0,
                total_amount: 12000,
                rooms: vec![],
            })
            .collect()
    }

    fn opts(batch_size: usize) -> UploadOptions {
        UploadOptions {
            batch_size,
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_216_rows_in_five_batches() {
        let store = MemoryStore::default();
        let report = upload(&store, &records(216), &opts(50));
        assert_eq!(*store.batch_sizes.borrow(), vec![50, 50, 50, 50, 16]);
        assert_eq!(report.succeeded, 216);
        assert_eq!(report.failed, 0);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_batch_partition_property() {
        for (n, size) in [(0usize, 50usize), (1, 50), (50, 50), (51, 50), (99, 7), (10, 1)] {
            let store = MemoryStore::failing(&[1, 3]);
            let report = upload(&store, &records(n), &opts(size));
            assert_eq!(store.insert_calls(), n.div_ceil(size), "n={n} size={size}");
            assert_eq!(report.succeeded + report.failed, n);
        }
    }

    #[test]
    fn test_failed_batch_counts_whole_batch_and_continues() {
        let store = MemoryStore::failing(&[1]);
        let report = upload(&store, &records(120), &opts(50));
        assert_eq!(report.succeeded, 70);
        assert_eq!(report.failed, 50);
        assert_eq!(store.insert_calls(), 3);
        assert_eq!(store.rows.borrow().len(), 70);
        assert_eq!(report.errors, vec!["(batch 2) 409: duplicate key in call 1".to_string()]);
    }

    #[test]
    fn test_transport_error_is_counted_not_raised() {
        let mut store = MemoryStore::default();
        store.drop_calls.insert(0);
        let report = upload(&store, &records(60), &opts(50));
        assert_eq!(report.failed, 50);
        assert_eq!(report.succeeded, 10);
        assert!(report.errors[0].contains("Exception: connection reset by peer"));
    }

    #[test]
    fn test_error_samples_are_bounded() {
        let store = MemoryStore::failing(&(0..20).collect::<Vec<_>>());
        let report = upload(&store, &records(20), &opts(1));
        assert_eq!(report.failed, 20);
        assert_eq!(report.errors.len(), MAX_ERROR_SAMPLES);
        assert!(report.errors[4].starts_with("(batch 5)"));
    }

    #[test]
    fn test_batches_preserve_source_order() {
        let recs = records(7);
        let store = MemoryStore::default();
        upload(&store, &recs, &opts(3));
        let ids: Vec<_> = store.rows.borrow().iter().map(|r| r.id).collect();
        let expected: Vec<_> = recs.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_default_policy_does_not_retry() {
        let store = MemoryStore::failing(&[0]);
        let report = upload(&store, &records(10), &UploadOptions::default());
        assert_eq!(store.insert_calls(), 1);
        assert_eq!(report.failed, 10);
    }

    #[test]
    fn test_retry_recovers_transient_failure() {
        let store = MemoryStore::failing(&[0]);
        let options = UploadOptions {
            batch_size: 50,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff_ms: 1,
            },
        };
        let report = upload(&store, &records(10), &options);
        assert_eq!(store.insert_calls(), 2);
        assert_eq!(report.succeeded, 10);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_attempts_capped() {
        let store = MemoryStore::failing(&(0..10).collect::<Vec<_>>());
        let options = UploadOptions {
            batch_size: 50,
            retry: RetryPolicy {
                max_attempts: 1000,
                backoff_ms: 0,
            },
        };
        let report = upload(&store, &records(10), &options);
        assert_eq!(store.insert_calls(), MAX_ATTEMPTS as usize);
        assert_eq!(report.failed, 10);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let retry = RetryPolicy {
            max_attempts: 3,
            backoff_ms: 100,
        };
        assert_eq!(retry.delay(1), Duration::from_millis(100));
        assert_eq!(retry.delay(2), Duration::from_millis(200));
        assert_eq!(retry.delay(3), Duration::from_millis(400));
    }
}
