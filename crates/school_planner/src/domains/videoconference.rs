//! Videoconference UI state for calendar events.
//!
//! The polled `(permission, state)` pair resolves to one [`UiState`], and
//! [`render`] is the single place that decides what the event card shows.

use school_api_client::{
    ConferencePermission, ConferenceState, SchoolApiClient, VideoconferenceOptions,
    VideoconferenceRequest,
};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

pub mod messages {
    pub const NOT_STARTED_OR_FINISHED: &str =
        "Die Videokonferenz hat entweder noch nicht begonnen oder wurde bereits wieder beendet.";
    pub const NO_PERMISSION: &str =
        "Dir fehlt die nötige Berechtigung um an der Videokonferenz teilzunehmen.";
    pub const GENERAL_ERROR: &str =
        "Es gab ein Problem mit der Videokonferenz. Bitte versuche es erneut.";
}

const SCOPE_EVENT: &str = "event";

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiState {
    /// Attendee waiting for a moderator.
    GuestInactive,
    /// Moderator may open the room.
    ModeratorInactive,
    Running,
    Forbidden,
}

/// What the user can do from the current state.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UiAction {
    Reload,
    Start,
    Join,
    None,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RenderAction {
    pub state: UiState,
    /// CSS section of the event card to show; all others are hidden.
    pub section: &'static str,
    pub action: UiAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Resolve the UI state; `None` leaves the card untouched.
pub fn resolve_ui_state(
    permission: Option<ConferencePermission>,
    state: ConferenceState,
) -> Option<UiState> {
    let inactive = matches!(state, ConferenceState::NotStarted | ConferenceState::Finished);
    match (permission, state) {
        (None, _) => Some(UiState::Forbidden),
        (Some(_), ConferenceState::Running) => Some(UiState::Running),
        (Some(ConferencePermission::JoinMeeting), _) if inactive => Some(UiState::GuestInactive),
        (Some(ConferencePermission::StartMeeting), _) if inactive => {
            Some(UiState::ModeratorInactive)
        }
        _ => None,
    }
}

pub fn render(state: UiState) -> RenderAction {
    let (section, action, message) = match state {
        UiState::GuestInactive => (
            "not-started",
            UiAction::Reload,
            Some(messages::NOT_STARTED_OR_FINISHED),
        ),
        UiState::ModeratorInactive => ("start-conference", UiAction::Start, None),
        UiState::Running => ("join-conference", UiAction::Join, None),
        UiState::Forbidden => ("no-permission", UiAction::None, Some(messages::NO_PERMISSION)),
    };
    RenderAction {
        state,
        section,
        action,
        message,
    }
}

/// Poll the conference of an event; a 403 renders as forbidden.
pub async fn event_ui(
    client: &dyn SchoolApiClient,
    event_id: &str,
) -> PlannerResult<Option<RenderAction>> {
    match client.get_videoconference_status(event_id).await {
        Ok(status) => Ok(resolve_ui_state(status.permission, status.state).map(render)),
        Err(e) if e.is_forbidden() => Ok(Some(render(UiState::Forbidden))),
        Err(e) => {
            tracing::error!(%event_id, error = %e, "videoconference status failed");
            Err(PlannerError::UpstreamUnavailable(e))
        }
    }
}

/// Room options chosen by the moderator in the create dialog.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StartOptions {
    pub start_muted: bool,
    pub request_moderator: bool,
    pub everyone_is_moderator: bool,
}

impl From<StartOptions> for VideoconferenceOptions {
    fn from(o: StartOptions) -> Self {
        VideoconferenceOptions {
            every_attende_joins_muted: Some(o.start_muted),
            moderator_must_approve_join_requests: Some(o.request_moderator),
            everybody_joins_as_moderator: Some(o.everyone_is_moderator),
        }
    }
}

fn validate_event_id(event_id: &str) -> PlannerResult<()> {
    if event_id.trim().is_empty() {
        return Err(PlannerError::Validation("event id must not be empty".into()));
    }
    Ok(())
}

/// Create the room for an event and return the moderator's join URL.
pub async fn start_conference(
    client: &dyn SchoolApiClient,
    event_id: &str,
    options: StartOptions,
) -> PlannerResult<String> {
    validate_event_id(event_id)?;
    let request = VideoconferenceRequest {
        scope_id: event_id.to_string(),
        scope_name: SCOPE_EVENT.to_string(),
        options: options.into(),
    };
    let link = client.create_videoconference(&request).await?;
    tracing::info!(%event_id, "videoconference started");
    Ok(link.url)
}

pub async fn join_conference(client: &dyn SchoolApiClient, event_id: &str) -> PlannerResult<String> {
    validate_event_id(event_id)?;
    let request = VideoconferenceRequest {
        scope_id: event_id.to_string(),
        scope_name: SCOPE_EVENT.to_string(),
        options: VideoconferenceOptions::default(),
    };
    Ok(client.create_videoconference(&request).await?.url)
}
