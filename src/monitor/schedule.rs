//! Wall-clock tick alignment and daily quota reset boundaries.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::{Error, Result};

const SECONDS_PER_DAY: u32 = 86_400;

/// Seconds until the next tick on the wall-clock grid.
///
/// Ticks align to multiples of `interval_secs` since local midnight, so a
/// 300s interval fires at :00, :05, :10 … regardless of when the process
/// started. A poll exactly on a boundary waits a full interval.
pub fn seconds_until_next_tick<Z: TimeZone>(now: &DateTime<Z>, interval_secs: u32) -> u64 {
    debug_assert!(interval_secs > 0);
    let elapsed = now.num_seconds_from_midnight();
    let next = (elapsed / interval_secs + 1) * interval_secs;
    u64::from(next.min(SECONDS_PER_DAY) - elapsed)
}

/// Daily quota reset boundary in a fixed timezone.
///
/// The YouTube Data API quota resets once a day; when the source reports
/// quota exhaustion, polling is suspended until the next boundary.
#[derive(Debug, Clone, Copy)]
pub struct QuotaResetPolicy {
    tz: Tz,
    hour: u32,
}

impl QuotaResetPolicy {
    pub fn new(tz: Tz, hour: u32) -> Result<Self> {
        if hour >= 24 {
            return Err(Error::config(format!("quota reset hour out of range: {hour}")));
        }
        Ok(Self { tz, hour })
    }

    /// The next reset instant strictly after `now`.
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.tz);
        let midnight = local.date_naive().and_time(chrono::NaiveTime::MIN);
        let mut reset = midnight + Duration::hours(i64::from(self.hour));
        if local.naive_local() >= reset {
            reset += Duration::days(1);
        }

        match self.tz.from_local_datetime(&reset).earliest() {
            Some(instant) => instant.with_timezone(&Utc),
            // The reset falls in a DST gap; a flat day is close enough.
            None => now + Duration::days(1),
        }
    }
}
