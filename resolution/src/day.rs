//! Reward-day boundaries for the daily vote-reward cap.

use chrono::{Local, Offset, TimeZone};
use tsl_types::Timestamp;

const SECS_PER_DAY: i64 = 86_400;

/// The most recent local midnight at or before `now`.
///
/// `utc_offset_secs` fixes the timezone; `None` uses the host's local zone as
/// it stood at `now`.
pub fn start_of_day(now: Timestamp, utc_offset_secs: Option<i32>) -> Timestamp {
    let secs = i64::try_from(now.as_secs()).unwrap_or(i64::MAX);
    let offset = match utc_offset_secs {
        Some(offset) => i64::from(offset),
        None => Local
            .timestamp_opt(secs, 0)
            .single()
            .map(|dt| i64::from(dt.offset().fix().local_minus_utc()))
            .unwrap_or(0),
    };
    let local = secs.saturating_add(offset);
    let midnight = local - local.rem_euclid(SECS_PER_DAY) - offset;
    Timestamp::new(u64::try_from(midnight).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_midnight() {
        // 2024-03-10T15:30:00Z
        let now = Timestamp::new(1_710_084_600);
        assert_eq!(start_of_day(now, Some(0)), Timestamp::new(1_710_028_800));
    }

    #[test]
    fn positive_offset_moves_midnight_back() {
        // 2024-03-10T23:30:00Z is 2024-03-11T01:30 at UTC+2, so the local day
        // started at 2024-03-10T22:00:00Z.
        let now = Timestamp::new(1_710_113_400);
        assert_eq!(start_of_day(now, Some(7_200)), Timestamp::new(1_710_108_000));
    }

    #[test]
    fn midnight_is_its_own_start() {
        let midnight = Timestamp::new(1_710_028_800);
        assert_eq!(start_of_day(midnight, Some(0)), midnight);
    }

    #[test]
    fn host_zone_never_exceeds_now() {
        let now = Timestamp::new(1_710_084_600);
        let start = start_of_day(now, None);
        assert!(start <= now);
        assert!(now.as_secs() - start.as_secs() < SECS_PER_DAY as u64);
    }
}
