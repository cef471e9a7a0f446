//! Split a requested date range into per-day query windows.
//!
//! The search API caps a page at 1000 items; a single day rarely exceeds
//! that, and when it does the fetcher pages within the day.

use chrono::NaiveDate;

use crate::error::HarvestError;
use crate::model::DatePartition;

/// One single-day partition per calendar day in `start..=end`.
pub fn partition_days(start: NaiveDate, end: NaiveDate) -> Result<Vec<DatePartition>, HarvestError> {
    if end < start {
        return Err(HarvestError::InvalidDateRange { start, end });
    }

    Ok(start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| DatePartition::new(day, day))
        .collect())
}
