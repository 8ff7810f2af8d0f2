use crate::SchoolApiError;
use secrecy::SecretString;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3030";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_token: SecretString,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, SchoolApiError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, SchoolApiError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let token = get("SCHOOL_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| SchoolApiError::Config("SCHOOL_API_TOKEN missing".into()))?;
        let base_url = get("SCHOOL_API_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Ok(Self {
            api_token: SecretString::new(token.into()),
            base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn from_env_missing_token() {
        let get = |k: &str| match k {
            "SCHOOL_API_URL" => Some("http://api.local".into()),
            _ => None,
        };
        assert!(Config::from_env_with(get).is_err());
    }

    #[test]
    fn from_env_blank_token_is_missing() {
        let get = |k: &str| match k {
            "SCHOOL_API_TOKEN" => Some("   ".into()),
            _ => None,
        };
        assert!(Config::from_env_with(get).is_err());
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "SCHOOL_API_TOKEN" => Some("jwt".into()),
            "SCHOOL_API_URL" => Some("http://api.local".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.base_url, "http://api.local");
        assert_eq!(cfg.api_token.expose_secret(), "jwt");
    }

    #[test]
    fn from_env_defaults_base_url() {
        let get = |k: &str| match k {
            "SCHOOL_API_TOKEN" => Some("jwt".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }
}
