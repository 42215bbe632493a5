//! value/date.rs
//! Date-like field types that travel as UTC millisecond timestamps.

use std::time::{SystemTime, UNIX_EPOCH};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// A date/time representation that maps onto the wire's UTC millis.
///
/// Implemented for the four date-like types a field may declare:
/// `DateTime<Utc>`, `NaiveDateTime` (taken as UTC), `NaiveDate` (midnight UTC)
/// and `SystemTime`.
pub trait UtcMillis {
    fn utc_millis(&self) -> i64;
}

impl UtcMillis for DateTime<Utc> {
    fn utc_millis(&self) -> i64 {
        self.timestamp_millis()
    }
}

impl UtcMillis for NaiveDateTime {
    fn utc_millis(&self) -> i64 {
        self.and_utc().timestamp_millis()
    }
}

impl UtcMillis for NaiveDate {
    fn utc_millis(&self) -> i64 {
        self.and_hms_opt(0, 0, 0)
            .map_or(0, |midnight| midnight.and_utc().timestamp_millis())
    }
}

impl UtcMillis for SystemTime {
    fn utc_millis(&self) -> i64 {
        match self.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        }
    }
}

impl<D: UtcMillis + ?Sized> UtcMillis for &D {
    fn utc_millis(&self) -> i64 {
        (**self).utc_millis()
    }
}

/// Millis back to a chrono timestamp; `None` outside chrono's range.
pub fn datetime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
