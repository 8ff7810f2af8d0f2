//! HTTP client implementation for the school REST API.
//!
//! This module provides a reqwest-based implementation of the [`SchoolApiClient`](crate::SchoolApiClient) trait.

use crate::config::Config;
use crate::{
    AssociationType, FileModel, FileModelParams, Paginated, RawCourse, RawHoliday, School,
    SchoolApiClient, SchoolApiError, SchoolYearRecord, SignedUrl, UploadUrlRequest,
    UploadUrlResponse, VideoconferenceLink, VideoconferenceRequest, VideoconferenceStatus,
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Client for the school REST API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestSchoolApiClient {
    base_url: String,
    api_token: SecretString,
    client: reqwest::Client,
}

impl ReqwestSchoolApiClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the REST API (e.g., "http://localhost:3030")
    /// * `api_token` - JWT sent as bearer token on every API call
    pub fn new(base_url: &str, api_token: SecretString) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_url, config.api_token.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build an authenticated GET request.
    fn get_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(self.api_token.expose_secret())
    }

    /// Build an authenticated POST request.
    fn post_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .bearer_auth(self.api_token.expose_secret())
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SchoolApiError> {
        metrics::counter!("school_api_requests_total", "endpoint" => endpoint).increment(1);
        let result = match request.send().await {
            Ok(resp) => self.handle_response(resp).await,
            Err(e) => Err(SchoolApiError::Http(e)),
        };
        record_failure(endpoint, &result);
        result
    }

    /// Execute a request with no expected response body.
    async fn execute_empty(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<(), SchoolApiError> {
        metrics::counter!("school_api_requests_total", "endpoint" => endpoint).increment(1);
        let result = match request.send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(self.error_from_response(resp).await),
            Err(e) => Err(SchoolApiError::Http(e)),
        };
        record_failure(endpoint, &result);
        result
    }

    /// Handle a response, converting status codes to appropriate errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, SchoolApiError> {
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        // Read body as text first so decode failures can quote what came back.
        let text = resp.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| {
            let body_snippet: String = text.chars().take(512).collect();
            SchoolApiError::Decode(format!("{} - body: {}", e, body_snippet))
        })
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> SchoolApiError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();

        match status {
            404 => SchoolApiError::NotFound(body_snippet),
            401 | 403 => SchoolApiError::Auth(body_snippet),
            400 | 422 => SchoolApiError::InvalidInput(body_snippet),
            _ => SchoolApiError::from_status(status, body_snippet),
        }
    }

    /// Headers handed out with a presigned URL, validated for transport.
    fn signed_headers(signed_url: &SignedUrl) -> Result<HeaderMap, SchoolApiError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &signed_url.header {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                SchoolApiError::InvalidInput(format!("signed header name {name:?}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                SchoolApiError::InvalidInput(format!("signed header value for {name}: {e}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

fn record_failure<T>(endpoint: &'static str, result: &Result<T, SchoolApiError>) {
    if let Err(e) = result {
        metrics::counter!("school_api_failures_total", "endpoint" => endpoint).increment(1);
        tracing::warn!(endpoint, error = %e, "school api request failed");
    }
}

#[async_trait]
impl SchoolApiClient for ReqwestSchoolApiClient {
    async fn get_school(&self, school_id: &str) -> Result<School, SchoolApiError> {
        let url = self.url(&format!("/schools/{}", school_id));
        tracing::debug!(%school_id, "fetching school");
        self.execute_json(
            "schools",
            self.get_request(&url)
                .query(&[("$populate[0]", "federalState")]),
        )
        .await
    }

    async fn get_holidays(
        &self,
        year: i32,
        state_code: &str,
    ) -> Result<Vec<RawHoliday>, SchoolApiError> {
        let url = self.url("/holidays");
        tracing::debug!(year, %state_code, "fetching holidays");
        let year = year.to_string();
        self.execute_json(
            "holidays",
            self.get_request(&url)
                .query(&[("year", year.as_str()), ("stateCode", state_code)]),
        )
        .await
    }

    async fn find_school_years(
        &self,
        name: &str,
    ) -> Result<Vec<SchoolYearRecord>, SchoolApiError> {
        let url = self.url("/years");
        let page: Paginated<SchoolYearRecord> = self
            .execute_json("years", self.get_request(&url).query(&[("name", name)]))
            .await?;
        Ok(page.data)
    }

    async fn get_courses(&self, school_year_id: &str) -> Result<Vec<RawCourse>, SchoolApiError> {
        let url = self.url("/courses");
        let qp: [(&str, &str); 4] = [
            ("$populate[0][path]", "classIds"),
            ("$populate[0][match][year]", school_year_id),
            ("$populate[0][populate][0]", "gradeLevel"),
            ("$populate[1]", "subjectId"),
        ];
        let page: Paginated<RawCourse> = self
            .execute_json("courses", self.get_request(&url).query(&qp))
            .await?;
        Ok(page.data)
    }

    async fn get_videoconference_status(
        &self,
        event_id: &str,
    ) -> Result<VideoconferenceStatus, SchoolApiError> {
        let url = self.url(&format!("/videoconference/event/{}", event_id));
        self.execute_json("videoconference_status", self.get_request(&url))
            .await
    }

    async fn create_videoconference(
        &self,
        request: &VideoconferenceRequest,
    ) -> Result<VideoconferenceLink, SchoolApiError> {
        let url = self.url("/videoconference/");
        self.execute_json("videoconference_create", self.post_request(&url).json(request))
            .await
    }

    async fn request_upload_url(
        &self,
        request: &UploadUrlRequest,
    ) -> Result<SignedUrl, SchoolApiError> {
        let url = self.url("/files/file");
        let resp: UploadUrlResponse = self
            .execute_json("files_presign", self.post_request(&url).json(request))
            .await?;
        Ok(resp.signed_url)
    }

    async fn upload_to_signed_url(
        &self,
        signed_url: &SignedUrl,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), SchoolApiError> {
        let mut headers = Self::signed_headers(signed_url)?;
        // A signed content type is part of the signature and wins.
        if !headers.contains_key(CONTENT_TYPE) {
            let value = HeaderValue::from_str(content_type).map_err(|e| {
                SchoolApiError::InvalidInput(format!("content type {content_type:?}: {e}"))
            })?;
            headers.insert(CONTENT_TYPE, value);
        }
        // The presigned URL authorizes the PUT on its own; no bearer token here.
        let request = self
            .client
            .put(&signed_url.url)
            .headers(headers)
            .body(body);
        self.execute_empty("files_upload", request).await
    }

    async fn create_file_model(
        &self,
        params: &FileModelParams,
    ) -> Result<FileModel, SchoolApiError> {
        let url = self.url("/files/fileModel");
        self.execute_json("files_model", self.post_request(&url).json(params))
            .await
    }

    async fn associate_submission_file(
        &self,
        submission_id: &str,
        association: AssociationType,
        file_id: &str,
        team_members: &[String],
    ) -> Result<(), SchoolApiError> {
        let url = self.url(&format!(
            "/homework/submit/{}/{}",
            submission_id,
            association.as_path()
        ));
        let body = serde_json::json!({ "fileId": file_id, "teamMembers": team_members });
        self.execute_empty("submission_associate", self.post_request(&url).json(&body))
            .await
    }

    async fn grant_submission_file_permissions(
        &self,
        submission_id: &str,
        file_id: &str,
        team_members: &[String],
    ) -> Result<(), SchoolApiError> {
        let url = self.url(&format!(
            "/homework/submit/{}/files/{}/permissions",
            submission_id, file_id
        ));
        let body = serde_json::json!({ "teamMembers": team_members });
        self.execute_empty("submission_permissions", self.post_request(&url).json(&body))
            .await
    }
}
