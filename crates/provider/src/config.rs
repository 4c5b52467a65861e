//! Provider configuration loaded from environment variables.

use reqwest::Url;

use crate::ProviderError;

/// School slug used when `UNTIS_SCHOOL` is unset.
pub const DEFAULT_SCHOOL: &str = "friedrich-dessauer-schule-limburg";

/// Only hosts below this domain are accepted as base URL.
const ALLOWED_HOST_SUFFIX: &str = ".webuntis.com";

/// Where and for which school substitution data is fetched.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub school: String,
    /// Base URL without trailing slash, e.g. `https://school.webuntis.com`.
    pub base_url: String,
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env var          | Default                         |
    /// |------------------|---------------------------------|
    /// | `UNTIS_SCHOOL`   | `friedrich-dessauer-schule-limburg` |
    /// | `UNTIS_BASE_URL` | `https://{school}.webuntis.com` |
    pub fn from_env() -> Result<Self, ProviderError> {
        let school = std::env::var("UNTIS_SCHOOL").ok();
        let base_url = std::env::var("UNTIS_BASE_URL").ok();
        Self::new(school.as_deref(), base_url.as_deref())
    }

    /// Build and validate a configuration from optional raw values.
    pub fn new(school: Option<&str>, base_url: Option<&str>) -> Result<Self, ProviderError> {
        let school = school
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SCHOOL)
            .to_string();

        let base_url = match base_url.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => validate_base_url(raw)?,
            None => format!("https://{school}.webuntis.com"),
        };

        Ok(Self { school, base_url })
    }

    /// Full substitution monitor endpoint, without query string.
    pub fn endpoint(&self) -> String {
        format!("{}/WebUntis/monitor/substitution/data", self.base_url)
    }
}

/// Accept only `https://*.webuntis.com`, stripping one trailing slash.
fn validate_base_url(raw: &str) -> Result<String, ProviderError> {
    let parsed = Url::parse(raw)
        .map_err(|e| ProviderError::Config(format!("UNTIS_BASE_URL is not a URL: {e}")))?;

    if parsed.scheme() != "https" {
        return Err(ProviderError::Config("UNTIS_BASE_URL must use HTTPS".into()));
    }

    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if !host.ends_with(ALLOWED_HOST_SUFFIX) {
        return Err(ProviderError::Config(
            "UNTIS_BASE_URL must target https://*.webuntis.com".into(),
        ));
    }

    Ok(raw.strip_suffix('/').unwrap_or(raw).to_string())
}
