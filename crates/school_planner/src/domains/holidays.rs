use chrono_tz::Tz;
use school_api_client::{RawHoliday, SchoolApiClient};
use serde::Serialize;

use crate::domains::datetime::{local_to_utc_millis, parse_iso_instant};
use crate::error::{PlannerError, PlannerResult};

pub const HOLIDAY_COLOR: &str = "#FBFFCF";
pub const SUMMER_HOLIDAY_NAME: &str = "sommerferien";

/// A holiday as handed to the calendar view.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub name: String,
    pub color: String,
    pub utc_start_date: i64,
    pub utc_end_date: i64,
    pub year: Option<i32>,
    pub state_code: String,
    /// Epoch millis of the parsed start instant, before reinterpretation.
    #[serde(skip)]
    pub starts_at: i64,
    #[serde(skip)]
    pub ends_at: i64,
}

impl Holiday {
    pub fn from_raw(raw: RawHoliday, tz: &Tz) -> PlannerResult<Self> {
        let start = parse_iso_instant(&raw.start, tz).ok_or_else(|| {
            PlannerError::InvalidDate(format!("holiday {:?} start {:?}", raw.name, raw.start))
        })?;
        let end = parse_iso_instant(&raw.end, tz).ok_or_else(|| {
            PlannerError::InvalidDate(format!("holiday {:?} end {:?}", raw.name, raw.end))
        })?;
        Ok(Self {
            name: capitalize_first_letter(&raw.name),
            color: HOLIDAY_COLOR.to_string(),
            utc_start_date: local_to_utc_millis(&start),
            utc_end_date: local_to_utc_millis(&end),
            year: raw.year,
            state_code: raw.state_code,
            starts_at: start.timestamp_millis(),
            ends_at: end.timestamp_millis(),
        })
    }

    /// Strict open-interval overlap with `[start, end]`; touching a boundary is not overlap.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.utc_end_date > start && self.utc_start_date < end
    }
}

pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn is_summer_holiday(holiday: &Holiday) -> bool {
    holiday.name.to_lowercase() == SUMMER_HOLIDAY_NAME
}

/// First summer holiday in list order.
pub fn first_summer_holiday<'a>(
    holidays: &'a [Holiday],
    year: i32,
    state_code: &str,
) -> PlannerResult<&'a Holiday> {
    holidays
        .iter()
        .find(|h| is_summer_holiday(h))
        .ok_or_else(|| PlannerError::HolidayDataMissing {
            year,
            state_code: state_code.to_string(),
        })
}

pub async fn fetch_holidays(
    client: &dyn SchoolApiClient,
    tz: &Tz,
    year: i32,
    state_code: &str,
) -> PlannerResult<Vec<Holiday>> {
    let raw = client.get_holidays(year, state_code).await?;
    tracing::debug!(year, %state_code, count = raw.len(), "holidays fetched");
    raw.into_iter().map(|h| Holiday::from_raw(h, tz)).collect()
}
