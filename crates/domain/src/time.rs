//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for notification times, `last_executed`, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
