//! Process-wide local time offset for date predicates
//!
//! The engine stores timestamps in UTC while users pick dates on the local
//! calendar. The offset is computed once and reused; a process that lives
//! across a daylight saving transition keeps the old value until
//! [`TimeOffsetCache::invalidate`] is called.

use std::sync::{PoisonError, RwLock};

use chrono::{Days, Local, NaiveDate};

use crate::error::{SearchError, SearchResult};

static TIME_OFFSET: RwLock<Option<i32>> = RwLock::new(None);

/// Memoized negated UTC offset of the local time zone, in seconds
pub struct TimeOffsetCache;

impl TimeOffsetCache {
    /// Offset to add to a local wall-clock time to get UTC
    ///
    /// `-32400` in Asia/Tokyo, `18000` in America/New_York (standard time).
    pub fn get() -> i32 {
        cached_or_compute(&TIME_OFFSET, compute_time_offset)
    }

    /// Drop the memoized value; the next [`Self::get`] recomputes it
    pub fn invalidate() {
        clear(&TIME_OFFSET);
    }
}

fn cached_or_compute(slot: &RwLock<Option<i32>>, compute: impl FnOnce() -> i32) -> i32 {
    if let Some(offset) = *slot.read().unwrap_or_else(PoisonError::into_inner) {
        return offset;
    }

    let mut slot = slot.write().unwrap_or_else(PoisonError::into_inner);
    *slot.get_or_insert_with(compute)
}

fn clear(slot: &RwLock<Option<i32>>) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = None;
}

fn compute_time_offset() -> i32 {
    Local::now().offset().local_minus_utc().saturating_neg()
}

/// Filter selecting `column` values between local midnights
///
/// Covers whole local days from `start` through `end` inclusive, as epoch
/// seconds compared against the UTC timestamps stored in the index.
///
/// # Errors
///
/// Returns `SearchError::InvalidCommand` when `column` is not a plain column
/// name or `end` precedes `start`
pub fn local_date_range(column: &str, start: NaiveDate, end: NaiveDate) -> SearchResult<String> {
    if column.is_empty()
        || !column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(SearchError::InvalidCommand(format!(
            "invalid column name: {column}"
        )));
    }
    if end < start {
        return Err(SearchError::InvalidCommand(format!(
            "date range ends before it starts: {start}..{end}"
        )));
    }

    let offset = i64::from(TimeOffsetCache::get());
    let lower = local_midnight_utc(start, offset)?;
    let upper = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| SearchError::InvalidCommand(format!("date out of range: {end}")))
        .and_then(|day| local_midnight_utc(day, offset))?;

    Ok(format!("{column} >= {lower} && {column} < {upper}"))
}

fn local_midnight_utc(day: NaiveDate, offset: i64) -> SearchResult<i64> {
    day.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp().saturating_add(offset))
        .ok_or_else(|| SearchError::InvalidCommand(format!("invalid date: {day}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_offset_is_negated_local_offset() {
        let expected = Local::now().offset().local_minus_utc().saturating_neg();
        assert_eq!(TimeOffsetCache::get(), expected);
    }

    #[test]
    fn test_cached_value_is_reused() {
        let slot = RwLock::new(None);
        assert_eq!(cached_or_compute(&slot, || -32_400), -32_400);
        assert_eq!(cached_or_compute(&slot, || 18_000), -32_400);
    }

    #[test]
    fn test_clear_forces_recompute() {
        let slot = RwLock::new(None);
        cached_or_compute(&slot, || -32_400);

        clear(&slot);
        assert_eq!(*slot.read().unwrap(), None);
        assert_eq!(cached_or_compute(&slot, || 18_000), 18_000);
    }

    #[test]
    fn test_invalidate_empties_process_slot() {
        TimeOffsetCache::get();
        TimeOffsetCache::invalidate();
        assert_eq!(
            TimeOffsetCache::get(),
            Local::now().offset().local_minus_utc().saturating_neg()
        );
    }

    #[test]
    fn test_range_covers_whole_local_days() {
        let offset = i64::from(TimeOffsetCache::get());
        let filter = local_date_range("created_on", date(2024, 1, 1), date(2024, 1, 2)).unwrap();

        let lower = 1_704_067_200 + offset;
        let upper = 1_704_067_200 + 2 * 86_400 + offset;
        assert_eq!(
            filter,
            format!("created_on >= {lower} && created_on < {upper}")
        );
    }

    #[test]
    fn test_rejects_injected_column() {
        assert!(local_date_range("x) || (true", date(2024, 1, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_rejects_reversed_range() {
        assert!(local_date_range("created_on", date(2024, 1, 2), date(2024, 1, 1)).is_err());
    }
}
