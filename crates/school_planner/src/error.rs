//! Error types for the planner service.

use school_api_client::SchoolApiError;
use thiserror::Error;

/// Planner errors. Any of these aborts the whole operation; there are no partial results.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] SchoolApiError),

    #[error("no summer holiday found for {state_code} in {year}")]
    HolidayDataMissing { year: i32, state_code: String },

    #[error("school not found: {0}")]
    SchoolNotFound(String),

    #[error("federal state unresolved for school {0}")]
    StateUnresolved(String),

    #[error("school year not found: {0}")]
    SchoolYearNotFound(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;
