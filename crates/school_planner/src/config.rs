use std::net::SocketAddr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::domains::helpers::Locale;
use crate::error::{PlannerError, PlannerResult};

pub const DEFAULT_MAX_BODY_SIZE: usize = 50 * 1024 * 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Zone whose wall clock is reinterpreted as UTC for calendar timestamps.
    pub timezone: Tz,
    pub locale: Locale,
    pub address: SocketAddr,
    pub max_body_size: usize,
    pub request_timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Berlin,
            locale: Locale::De,
            address: SocketAddr::from(([127, 0, 0, 1], 3100)),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> PlannerResult<Self> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Same as [`PlannerConfig::from_env`] but reads values through `get`.
    /// Unset values fall back to defaults; malformed ones are errors.
    pub fn from_env_with<F>(mut get: F) -> PlannerResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timezone = match get("PLANNER_TIMEZONE").filter(|s| !s.trim().is_empty()) {
            Some(raw) => raw.trim().parse::<Tz>().map_err(|_| {
                PlannerError::Config(format!("PLANNER_TIMEZONE: unknown time zone {raw:?}"))
            })?,
            None => defaults.timezone,
        };

        let locale = match get("PLANNER_LOCALE").filter(|s| !s.trim().is_empty()) {
            Some(raw) => raw
                .parse::<Locale>()
                .map_err(|e| PlannerError::Config(format!("PLANNER_LOCALE: {e}")))?,
            None => defaults.locale,
        };

        let address = match get("ADDRESS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| PlannerError::Config(format!("ADDRESS: invalid socket address {raw:?}")))?,
            None => defaults.address,
        };

        let max_body_size = get("MAX_HTTP_BODY_SIZE")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_body_size);

        let request_timeout = get("HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Ok(Self {
            timezone,
            locale,
            address,
            max_body_size,
            request_timeout,
        })
    }
}
