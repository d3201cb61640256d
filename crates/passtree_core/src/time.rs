//! Timestamp helpers.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Point in time used by every timestamp in the tree.
pub type Timestamp = DateTime<Utc>;

/// Smallest timestamp; sorts before every real time.
pub const MIN_TIME: Timestamp = DateTime::<Utc>::MIN_UTC;

/// Returns the current time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Compares two timestamps, optionally truncated to whole seconds.
#[must_use]
pub fn compare(a: Timestamp, b: Timestamp, floor_to_seconds: bool) -> Ordering {
    if floor_to_seconds {
        a.timestamp().cmp(&b.timestamp())
    } else {
        a.cmp(&b)
    }
}

/// Returns `true` if both timestamps fall into the same second.
///
/// Persisted formats keep second precision, so equality checks on
/// round-tripped objects must ignore sub-second parts.
#[must_use]
pub fn equals_floor(a: Timestamp, b: Timestamp) -> bool {
    a.timestamp() == b.timestamp()
}
