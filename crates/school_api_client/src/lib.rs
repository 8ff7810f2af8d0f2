//! Typed `SchoolApiClient` trait over the school REST API and its reqwest implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod config;
pub mod http_client;

#[derive(Debug, Error)]
pub enum SchoolApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not authorized: {0}")]
    Auth(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decoding response: {0}")]
    Decode(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl SchoolApiError {
    pub fn from_status(status: u16, body: String) -> Self {
        SchoolApiError::Status { status, body }
    }

    /// True when the API refused the call for the current credentials.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, SchoolApiError::Auth(_))
    }
}

/// Envelope used by the paginated list endpoints (`/years`, `/courses`).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Paginated<T> {
    #[serde(default)]
    pub total: Option<u64>,
    pub data: Vec<T>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FederalState {
    pub abbreviation: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct School {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        rename = "federalState",
        default,
        deserialize_with = "deserialize_populated"
    )]
    pub federal_state: Option<FederalState>,
}

/// Holiday record as delivered by `/holidays`; dates are ISO-8601 strings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RawHoliday {
    pub name: String,
    pub start: String,
    pub end: String,
    #[serde(default, deserialize_with = "deserialize_opt_i32")]
    pub year: Option<i32>,
    #[serde(rename = "stateCode", default)]
    pub state_code: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SchoolYearRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Subject {
    #[serde(rename = "_id")]
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct GradeLevel {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RawClass {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(
        rename = "gradeLevel",
        default,
        deserialize_with = "deserialize_populated"
    )]
    pub grade_level: Option<GradeLevel>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RawCourse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(
        rename = "subjectId",
        default,
        deserialize_with = "deserialize_populated"
    )]
    pub subject: Option<Subject>,
    /// Only the classes that survived the population match; unpopulated ids are dropped.
    #[serde(
        rename = "classIds",
        default,
        deserialize_with = "deserialize_populated_list"
    )]
    pub classes: Vec<RawClass>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConferencePermission {
    JoinMeeting,
    StartMeeting,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConferenceState {
    NotStarted,
    Running,
    Finished,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct VideoconferenceStatus {
    #[serde(default)]
    pub permission: Option<ConferencePermission>,
    pub state: ConferenceState,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoconferenceOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub every_attende_joins_muted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_must_approve_join_requests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub everybody_joins_as_moderator: Option<bool>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoconferenceRequest {
    pub scope_id: String,
    pub scope_name: String,
    pub options: VideoconferenceOptions,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VideoconferenceLink {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct UploadUrlRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub filename: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    #[serde(default)]
    pub header: HashMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UploadUrlResponse {
    #[serde(rename = "signedUrl")]
    pub signed_url: SignedUrl,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileModelParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    pub storage_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileModel {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "storageFileName", default)]
    pub storage_file_name: Option<String>,
}

/// Which submission slot a file is attached to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AssociationType {
    #[default]
    Files,
    GradeFiles,
}

impl AssociationType {
    pub fn as_path(self) -> &'static str {
        match self {
            AssociationType::Files => "files",
            AssociationType::GradeFiles => "grade-files",
        }
    }
}

/// Accept a populated sub-document; ids, `null` or missing values become `None`.
fn deserialize_populated<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        Some(v @ serde_json::Value::Object(_)) => {
            serde_json::from_value(v).map(Some).map_err(D::Error::custom)
        }
        _ => Ok(None),
    }
}

fn deserialize_populated_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error;
    let values: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    values
        .unwrap_or_default()
        .into_iter()
        .filter(|v| v.is_object())
        .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
        .collect()
}

fn deserialize_opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("year out of range: {n}"))),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected numeric year, got {s:?}"))),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[async_trait]
pub trait SchoolApiClient: Send + Sync + 'static {
    /// Fetch a school with its federal state populated.
    async fn get_school(&self, school_id: &str) -> Result<School, SchoolApiError>;

    /// Holidays of one calendar year for a federal state.
    async fn get_holidays(
        &self,
        year: i32,
        state_code: &str,
    ) -> Result<Vec<RawHoliday>, SchoolApiError>;

    /// Look up school years by display name, e.g. `2023/24`.
    async fn find_school_years(&self, name: &str)
    -> Result<Vec<SchoolYearRecord>, SchoolApiError>;

    /// Courses with classes populated for the given school year and subject populated.
    async fn get_courses(&self, school_year_id: &str) -> Result<Vec<RawCourse>, SchoolApiError>;

    // === Videoconference ===

    async fn get_videoconference_status(
        &self,
        event_id: &str,
    ) -> Result<VideoconferenceStatus, SchoolApiError>;

    async fn create_videoconference(
        &self,
        request: &VideoconferenceRequest,
    ) -> Result<VideoconferenceLink, SchoolApiError>;

    // === Files ===

    /// Request a presigned storage URL for a new file.
    async fn request_upload_url(
        &self,
        request: &UploadUrlRequest,
    ) -> Result<SignedUrl, SchoolApiError>;

    /// PUT the file body to a presigned URL using the headers it came with.
    async fn upload_to_signed_url(
        &self,
        signed_url: &SignedUrl,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), SchoolApiError>;

    async fn create_file_model(&self, params: &FileModelParams)
    -> Result<FileModel, SchoolApiError>;

    // === Homework submissions ===

    async fn associate_submission_file(
        &self,
        submission_id: &str,
        association: AssociationType,
        file_id: &str,
        team_members: &[String],
    ) -> Result<(), SchoolApiError>;

    async fn grant_submission_file_permissions(
        &self,
        submission_id: &str,
        file_id: &str,
        team_members: &[String],
    ) -> Result<(), SchoolApiError>;
}
