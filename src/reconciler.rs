use tracing::{info, warn};

use crate::dates::DateRange;
use crate::models::ReservationRecord;
use crate::store::{truncate, RecordStore, MAX_ERROR_BODY};
use crate::uploader::{self, UploadOptions, MAX_ERROR_SAMPLES};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// True only when every range delete succeeded.
    pub deleted: bool,
    pub inserted: usize,
    pub failed: usize,
    pub sample_errors: Vec<String>,
}

/// Replace the remote records in `range` with `records`.
#[allow(dead_code)]
pub fn reconcile<S: RecordStore + ?Sized>(
    store: &S,
    range: &DateRange,
    records: &[ReservationRecord],
    options: &UploadOptions,
) -> ReconcileReport {
    reconcile_ranges(store, std::slice::from_ref(range), records, options)
}

/// Delete each range, then insert `records` in batches.
///
/// The two steps are not atomic. A failed delete is logged and the insert still
/// runs, which can leave duplicates behind; a crash between the steps leaves the
/// ranges empty. Callers that need all-or-nothing must wrap this externally.
pub fn reconcile_ranges<S: RecordStore + ?Sized>(
    store: &S,
    ranges: &[DateRange],
    records: &[ReservationRecord],
    options: &UploadOptions,
) -> ReconcileReport {
    let outside = records
        .iter()
        .filter(|r| !ranges.iter().any(|range| range.contains(r.date)))
        .count();
    if outside > 0 {
        warn!(outside, "records fall outside every delete range and will not be replaced on rerun");
    }

    let mut deleted = true;
    let mut delete_errors = Vec::new();
    for range in ranges {
        match store.delete_range(range) {
            Ok(()) => info!(range = %range, "deleted existing records"),
            Err(e) => {
                deleted = false;
                warn!(range = %range, error = %e, "delete failed, inserting anyway");
                delete_errors.push(truncate(&format!("(delete {range}) {e}"), MAX_ERROR_BODY));
            }
        }
    }

    let upload = uploader::upload(store, records, options);
    info!(inserted = upload.succeeded, failed = upload.failed, "upload finished");

    let mut sample_errors = delete_errors;
    sample_errors.extend(upload.errors);
    sample_errors.truncate(MAX_ERROR_SAMPLES);

    ReconcileReport {
        deleted,
        inserted: upload.succeeded,
        failed: upload.failed,
        sample_errors,
    }
}
