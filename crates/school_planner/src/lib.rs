use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use school_api_client::{FileModel, SchoolApiClient};

pub mod config;
pub mod domains;
pub mod error;
pub mod routes;

pub use config::PlannerConfig;
pub use error::{PlannerError, PlannerResult};

use domains::calendar::{CalendarPayload, build_calendar_payload};
use domains::helpers::RelativeTimeFormatter;
use domains::school_year::{SchoolYear, resolve_current_school_year};
use domains::upload::SubmissionUpload;
use domains::videoconference::{RenderAction, StartOptions};

/// Planner operations over one upstream client and a fixed school time zone.
#[derive(Clone)]
pub struct PlannerService {
    client: Arc<dyn SchoolApiClient>,
    timezone: Tz,
    formatter: RelativeTimeFormatter,
}

impl PlannerService {
    pub fn new(client: Arc<dyn SchoolApiClient>, timezone: Tz, formatter: RelativeTimeFormatter) -> Self {
        Self {
            client,
            timezone,
            formatter,
        }
    }

    pub fn from_config(client: Arc<dyn SchoolApiClient>, config: &PlannerConfig) -> Self {
        Self::new(
            client,
            config.timezone,
            RelativeTimeFormatter::new(config.locale),
        )
    }

    /// Current wall clock in the school time zone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    pub async fn calendar(&self, school_id: &str) -> PlannerResult<CalendarPayload> {
        self.calendar_at(&self.now(), school_id).await
    }

    pub async fn calendar_at(
        &self,
        today: &DateTime<Tz>,
        school_id: &str,
    ) -> PlannerResult<CalendarPayload> {
        build_calendar_payload(self.client.as_ref(), &self.timezone, today, school_id).await
    }

    pub async fn current_school_year(
        &self,
        today: &DateTime<Tz>,
        state_code: &str,
    ) -> PlannerResult<SchoolYear> {
        resolve_current_school_year(self.client.as_ref(), &self.timezone, today, state_code).await
    }

    pub async fn videoconference_ui(&self, event_id: &str) -> PlannerResult<Option<RenderAction>> {
        domains::videoconference::event_ui(self.client.as_ref(), event_id).await
    }

    pub async fn start_conference(
        &self,
        event_id: &str,
        options: StartOptions,
    ) -> PlannerResult<String> {
        domains::videoconference::start_conference(self.client.as_ref(), event_id, options).await
    }

    pub async fn join_conference(&self, event_id: &str) -> PlannerResult<String> {
        domains::videoconference::join_conference(self.client.as_ref(), event_id).await
    }

    pub async fn upload_submission_file(&self, upload: SubmissionUpload) -> PlannerResult<FileModel> {
        domains::upload::upload_submission_file(self.client.as_ref(), upload).await
    }

    /// "vor 3 Tagen" style text for `date`, relative to now.
    pub fn time_from_now(&self, date: DateTime<Utc>) -> String {
        self.formatter.from_now(date, Utc::now())
    }
}
