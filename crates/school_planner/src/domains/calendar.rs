//! Calendar page assembly.

use chrono::DateTime;
use chrono_tz::Tz;
use school_api_client::{SchoolApiClient, SchoolApiError};
use serde::Serialize;

use crate::domains::courses::{ClassTopicsRow, group_by_class, normalize_courses, populate_topics};
use crate::domains::datetime::local_to_utc_millis;
use crate::domains::holidays::{Holiday, fetch_holidays};
use crate::domains::school_year::{SchoolYear, resolve_current_school_year};
use crate::error::{PlannerError, PlannerResult};

pub const CALENDAR_TITLE: &str = "Kalender";

/// Non-holiday calendar entries.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OtherEvent {
    pub name: String,
    pub color: String,
    pub utc_start_date: i64,
    pub utc_end_date: i64,
}

/// Fixed list until school events are served by the API.
pub fn other_events() -> Vec<OtherEvent> {
    vec![OtherEvent {
        name: "Projektwoche".into(),
        color: "#e9e8e8".into(),
        utc_start_date: 1_548_633_600_000,
        utc_end_date: 1_548_979_200_000,
    }]
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPayload {
    pub title: String,
    pub utc_today: i64,
    pub school_year: SchoolYear,
    pub class_topics_data: Vec<ClassTopicsRow>,
    pub holidays_data: Vec<Holiday>,
    pub other_events_data: Vec<OtherEvent>,
}

/// Federal state abbreviation of a school.
pub async fn federal_state(client: &dyn SchoolApiClient, school_id: &str) -> PlannerResult<String> {
    let school = client.get_school(school_id).await.map_err(|e| match e {
        SchoolApiError::NotFound(_) => PlannerError::SchoolNotFound(school_id.to_string()),
        other => PlannerError::UpstreamUnavailable(other),
    })?;
    school
        .federal_state
        .map(|state| state.abbreviation)
        .filter(|abbreviation| !abbreviation.is_empty())
        .ok_or_else(|| PlannerError::StateUnresolved(school_id.to_string()))
}

/// Holidays of both calendar years touched by the school year, kept when they overlap it.
pub async fn holidays_for_school_year(
    client: &dyn SchoolApiClient,
    tz: &Tz,
    school_year: &SchoolYear,
    state_code: &str,
) -> PlannerResult<Vec<Holiday>> {
    let (first_year, second_year) = school_year.calendar_years(tz)?;
    let mut holidays = fetch_holidays(client, tz, first_year, state_code).await?;
    if second_year != first_year {
        holidays.extend(fetch_holidays(client, tz, second_year, state_code).await?);
    }
    holidays.retain(|h| h.overlaps(school_year.utc_start_date, school_year.utc_end_date));
    Ok(holidays)
}

/// Id of the `/years` record matching the school year's display name.
pub async fn school_year_id(
    client: &dyn SchoolApiClient,
    school_year: &SchoolYear,
) -> PlannerResult<String> {
    let name = school_year.display_name()?;
    let years = client.find_school_years(&name).await?;
    years
        .into_iter()
        .next()
        .map(|year| year.id)
        .ok_or(PlannerError::SchoolYearNotFound(name))
}

pub async fn class_topics_data(
    client: &dyn SchoolApiClient,
    school_year: &SchoolYear,
) -> PlannerResult<Vec<ClassTopicsRow>> {
    let year_id = school_year_id(client, school_year).await?;
    let courses = client.get_courses(&year_id).await?;
    // Courses without a class in this school year come back with empty classIds.
    let rows = normalize_courses(&courses);
    tracing::debug!(%year_id, courses = courses.len(), rows = rows.len(), "courses normalized");
    let with_topics = populate_topics(rows).await;
    Ok(group_by_class(with_topics))
}

pub async fn build_calendar_payload(
    client: &dyn SchoolApiClient,
    tz: &Tz,
    today: &DateTime<Tz>,
    school_id: &str,
) -> PlannerResult<CalendarPayload> {
    let state_code = federal_state(client, school_id).await?;
    let school_year = resolve_current_school_year(client, tz, today, &state_code).await?;
    let holidays_data = holidays_for_school_year(client, tz, &school_year, &state_code).await?;
    let class_topics_data = class_topics_data(client, &school_year).await?;

    metrics::counter!("planner_calendar_builds_total").increment(1);
    tracing::info!(
        %school_id,
        %state_code,
        holidays = holidays_data.len(),
        classes = class_topics_data.len(),
        "calendar assembled"
    );

    Ok(CalendarPayload {
        title: CALENDAR_TITLE.to_string(),
        utc_today: local_to_utc_millis(today),
        school_year,
        class_topics_data,
        holidays_data,
        other_events_data: other_events(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_events_stub_is_single_project_week() {
        let events = other_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Projektwoche");
        let json = serde_json::to_value(&events[0]).expect("json");
        assert_eq!(json["utcStartDate"], 1_548_633_600_000_i64);
        assert_eq!(json["utcEndDate"], 1_548_979_200_000_i64);
    }
}
