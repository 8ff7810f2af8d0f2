//! Wall-clock reinterpretation used for every calendar timestamp.
//!
//! The view layer and the REST API agree on "UTC milliseconds" that are really
//! the local wall-clock fields read as if they were UTC. That is not a time
//! zone conversion and must stay exactly this way.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// UTC timestamp of the given wall-clock fields, truncated to the minute.
pub fn to_utc_millis(local: &NaiveDateTime) -> i64 {
    let secs = local.and_utc().timestamp();
    (secs - secs.rem_euclid(60)) * 1000
}

/// Reinterpret the wall clock of `dt` in its own zone.
pub fn local_to_utc_millis<Tz: TimeZone>(dt: &DateTime<Tz>) -> i64 {
    to_utc_millis(&dt.naive_local())
}

/// Parse an ISO-8601 string into an instant in `tz`.
///
/// Offset-bearing strings are absolute, date-time strings without an offset are
/// local to `tz`, and date-only strings are UTC midnight.
pub fn parse_iso_instant<Tz: TimeZone>(iso: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let s = iso.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(tz));
    }
    // Minute precision with an offset, e.g. `2023-07-06T00:00Z`.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%#z") {
        return Some(dt.with_timezone(tz));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).with_timezone(tz));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()?;
    // A wall-clock time skipped by a DST jump resolves one hour later.
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Parse then reinterpret; `None` for anything that is not a valid ISO date.
pub fn iso_to_utc_millis<Tz: TimeZone>(iso: &str, tz: &Tz) -> Option<i64> {
    parse_iso_instant(iso, tz).map(|dt| local_to_utc_millis(&dt))
}

/// `Math.round(sum / 2)` on integer milliseconds: halves round up.
pub fn midpoint_millis(a: i64, b: i64) -> i64 {
    (a + b + 1).div_euclid(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn utc_ms(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .map(|ndt| ndt.and_utc().timestamp_millis())
            .expect("valid date")
    }

    #[test]
    fn to_utc_millis_drops_seconds() {
        let ndt = NaiveDate::from_ymd_opt(2023, 8, 1)
            .and_then(|d| d.and_hms_milli_opt(10, 15, 42, 999))
            .unwrap();
        assert_eq!(to_utc_millis(&ndt), utc_ms(2023, 8, 1, 10, 15));
    }

    #[test]
    fn offsetless_iso_is_zone_independent() {
        for tz in [
            chrono_tz::UTC,
            chrono_tz::Europe::Berlin,
            chrono_tz::America::New_York,
            chrono_tz::Asia::Tokyo,
        ] {
            assert_eq!(
                iso_to_utc_millis("2023-08-01T00:00:00", &tz),
                Some(1_690_848_000_000),
                "zone {tz}"
            );
        }
    }

    #[test]
    fn offset_iso_is_read_in_local_wall_clock() {
        // 22:00Z on July 31st is midnight August 1st in Berlin (CEST).
        let tz: Tz = chrono_tz::Europe::Berlin;
        assert_eq!(
            iso_to_utc_millis("2023-07-31T22:00:00.000Z", &tz),
            Some(utc_ms(2023, 8, 1, 0, 0))
        );
        assert_eq!(
            iso_to_utc_millis("2023-07-31T22:00:00.000Z", &chrono_tz::UTC),
            Some(utc_ms(2023, 7, 31, 22, 0))
        );
    }

    #[test]
    fn minute_precision_with_offset_is_absolute() {
        let tz: Tz = chrono_tz::Europe::Berlin;
        assert_eq!(
            iso_to_utc_millis("2023-07-06T00:00Z", &tz),
            Some(utc_ms(2023, 7, 6, 2, 0))
        );
        assert_eq!(
            iso_to_utc_millis("2023-07-06T00:00+02:00", &tz),
            Some(utc_ms(2023, 7, 6, 0, 0))
        );
    }

    #[test]
    fn date_only_iso_is_utc_midnight() {
        let tz: Tz = chrono_tz::America::New_York;
        // Midnight UTC is 20:00 the previous evening in New York (EDT).
        assert_eq!(
            iso_to_utc_millis("2023-08-01", &tz),
            Some(utc_ms(2023, 7, 31, 20, 0))
        );
    }

    #[test]
    fn raw_instant_differs_from_reinterpreted_value() {
        let tz: Tz = chrono_tz::Europe::Berlin;
        let instant = parse_iso_instant("2023-08-01T00:00:00", &tz).unwrap();
        assert_eq!(instant.timestamp_millis(), utc_ms(2023, 7, 31, 22, 0));
        assert_eq!(local_to_utc_millis(&instant), utc_ms(2023, 8, 1, 0, 0));
    }

    #[test]
    fn skipped_wall_clock_moves_forward() {
        let tz: Tz = chrono_tz::Europe::Berlin;
        let dt = parse_iso_instant("2023-03-26T02:30:00", &tz).unwrap();
        assert_eq!(local_to_utc_millis(&dt), utc_ms(2023, 3, 26, 3, 30));
    }

    #[test]
    fn invalid_iso_yields_none() {
        assert_eq!(iso_to_utc_millis("not-a-date", &chrono_tz::UTC), None);
        assert_eq!(iso_to_utc_millis("2023-02-30T00:00:00", &chrono_tz::UTC), None);
    }

    #[test]
    fn midpoint_rounds_half_up() {
        assert_eq!(midpoint_millis(0, 3), 2);
        assert_eq!(midpoint_millis(2, 4), 3);
        assert_eq!(midpoint_millis(-3, 0), -1);
    }
}
