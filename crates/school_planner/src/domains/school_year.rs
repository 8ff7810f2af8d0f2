//! School-year window derived from consecutive summer holidays.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use school_api_client::SchoolApiClient;
use serde::{Deserialize, Serialize};

use crate::domains::datetime::{DAY_MS, midpoint_millis};
use crate::domains::holidays::{Holiday, fetch_holidays, first_summer_holiday};
use crate::error::{PlannerError, PlannerResult};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYear {
    pub utc_start_date: i64,
    pub utc_end_date: i64,
}

impl SchoolYear {
    /// From the day after `previous_summer` ends to the day before `next_summer` starts.
    pub fn between(previous_summer: &Holiday, next_summer: &Holiday) -> Self {
        Self {
            utc_start_date: previous_summer.utc_end_date + DAY_MS,
            utc_end_date: next_summer.utc_start_date - DAY_MS,
        }
    }

    /// Display name used by the `/years` collection, e.g. `2023/24`.
    pub fn display_name(&self) -> PlannerResult<String> {
        let first = utc_year(self.utc_start_date)?;
        let second = utc_year(self.utc_end_date)?;
        Ok(format!("{}/{:02}", first, second.rem_euclid(100)))
    }

    /// Calendar years (in `tz`) of the start and end timestamps.
    pub fn calendar_years(&self, tz: &Tz) -> PlannerResult<(i32, i32)> {
        Ok((
            local_year(self.utc_start_date, tz)?,
            local_year(self.utc_end_date, tz)?,
        ))
    }
}

fn utc_year(ms: i64) -> PlannerResult<i32> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.year())
        .ok_or_else(|| PlannerError::InvalidDate(format!("timestamp out of range: {ms}")))
}

fn local_year(ms: i64, tz: &Tz) -> PlannerResult<i32> {
    tz.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.year())
        .ok_or_else(|| PlannerError::InvalidDate(format!("timestamp out of range: {ms}")))
}

/// Midpoint of a summer holiday over the parsed instants, not the reinterpreted values.
pub fn summer_midpoint(summer: &Holiday) -> i64 {
    midpoint_millis(summer.starts_at, summer.ends_at)
}

/// Which neighbouring calendar year closes the current school year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjacentYear {
    /// Before the summer midpoint: the school year began after last year's summer.
    Previous,
    /// From the midpoint on: the school year ends before next year's summer.
    Next,
}

pub fn adjacent_year(today_ms: i64, midpoint: i64) -> AdjacentYear {
    if today_ms < midpoint {
        AdjacentYear::Previous
    } else {
        AdjacentYear::Next
    }
}

pub async fn resolve_current_school_year(
    client: &dyn SchoolApiClient,
    tz: &Tz,
    today: &DateTime<Tz>,
    state_code: &str,
) -> PlannerResult<SchoolYear> {
    let year = today.year();
    let this_year = fetch_holidays(client, tz, year, state_code).await?;
    let this_summer = first_summer_holiday(&this_year, year, state_code)?;
    let midpoint = summer_midpoint(this_summer);

    let school_year = match adjacent_year(today.timestamp_millis(), midpoint) {
        AdjacentYear::Previous => {
            let previous = fetch_holidays(client, tz, year - 1, state_code).await?;
            let previous_summer = first_summer_holiday(&previous, year - 1, state_code)?;
            SchoolYear::between(previous_summer, this_summer)
        }
        AdjacentYear::Next => {
            let next = fetch_holidays(client, tz, year + 1, state_code).await?;
            let next_summer = first_summer_holiday(&next, year + 1, state_code)?;
            SchoolYear::between(this_summer, next_summer)
        }
    };
    tracing::debug!(
        %state_code,
        start = school_year.utc_start_date,
        end = school_year.utc_end_date,
        "school year resolved"
    );
    Ok(school_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::holidays::HOLIDAY_COLOR;

    fn summer(start: i64, end: i64) -> Holiday {
        Holiday {
            name: "Sommerferien".into(),
            color: HOLIDAY_COLOR.into(),
            utc_start_date: start,
            utc_end_date: end,
            year: None,
            state_code: "BE".into(),
            starts_at: start,
            ends_at: end,
        }
    }

    #[test]
    fn between_keeps_one_day_buffer() {
        let sy = SchoolYear::between(&summer(0, 10 * DAY_MS), &summer(300 * DAY_MS, 340 * DAY_MS));
        assert_eq!(sy.utc_start_date, 11 * DAY_MS);
        assert_eq!(sy.utc_end_date, 299 * DAY_MS);
        assert!(sy.utc_start_date < sy.utc_end_date);
    }

    #[test]
    fn display_name_uses_two_digit_second_year() {
        let sy = SchoolYear {
            utc_start_date: 1_693_008_000_000, // 2023-08-26
            utc_end_date: 1_720_656_000_000,   // 2024-07-11
        };
        assert_eq!(sy.display_name().unwrap(), "2023/24");

        let turn_of_century = SchoolYear {
            utc_start_date: 946_684_800_000 - 200 * DAY_MS, // mid 1999
            utc_end_date: 946_684_800_000 + 150 * DAY_MS,   // mid 2000
        };
        assert_eq!(turn_of_century.display_name().unwrap(), "1999/00");
    }

    #[test]
    fn adjacent_year_switches_at_midpoint() {
        assert_eq!(adjacent_year(99, 100), AdjacentYear::Previous);
        assert_eq!(adjacent_year(100, 100), AdjacentYear::Next);
        assert_eq!(adjacent_year(101, 100), AdjacentYear::Next);
    }

    #[test]
    fn midpoint_uses_parsed_instants() {
        let mut h = summer(1000, 2000);
        h.starts_at = 0;
        h.ends_at = 5;
        assert_eq!(summer_midpoint(&h), 3);
    }
}
