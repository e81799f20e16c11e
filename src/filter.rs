use crate::dates::DateRange;
use crate::models::ReservationRecord;

/// Column titles that leak into data rows when a header is repeated mid-sheet.
pub const HEADER_SENTINELS: &[&str] = &["区分"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    EmptyCustomer,
    HeaderArtifact,
    OutOfRange,
}

/// Why `record` is not admissible for `range`, or `None` when it is.
pub fn rejection(record: &ReservationRecord, range: &DateRange, sentinels: &[String]) -> Option<FilterReason> {
    if record.customer_name.trim().is_empty() {
        return Some(FilterReason::EmptyCustomer);
    }
    if is_header_artifact(&record.category, sentinels) {
        return Some(FilterReason::HeaderArtifact);
    }
    if !range.contains(record.date) {
        return Some(FilterReason::OutOfRange);
    }
    None
}

#[allow(dead_code)]
pub fn admit(record: &ReservationRecord, range: &DateRange, sentinels: &[String]) -> bool {
    rejection(record, range, sentinels).is_none()
}

pub fn is_header_artifact(category: &str, sentinels: &[String]) -> bool {
    let category = category.trim();
    HEADER_SENTINELS.contains(&category) || sentinels.iter().any(|s| s == category)
}
