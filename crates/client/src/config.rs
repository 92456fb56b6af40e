use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL (default: `http://localhost:3001`).
    pub api_url: String,
    /// Path prefix of every endpoint (default: `/api/v1`).
    pub api_version: String,
    /// Directory holding the persisted token, user and scope.
    pub state_dir: PathBuf,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Quiet period before column-filter edits are sent (default: `500`).
    pub filter_debounce_ms: u64,
    /// Page size of paginated lists (default: `20`).
    pub default_page_size: u32,
}

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_API_VERSION: &str = "/api/v1";
pub const DEFAULT_STATE_DIR: &str = ".eduadmin";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FILTER_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            filter_debounce_ms: DEFAULT_FILTER_DEBOUNCE_MS,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `API_URL`              | `http://localhost:3001` |
    /// | `API_VERSION`          | `/api/v1`               |
    /// | `EDUADMIN_STATE_DIR`   | `.eduadmin`             |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `FILTER_DEBOUNCE_MS`   | `500`                   |
    /// | `DEFAULT_PAGE_SIZE`    | `20`                    |
    ///
    /// Unparseable numbers fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("API_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into());

        let api_version = lookup("API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.into());

        let state_dir = lookup("EDUADMIN_STATE_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        Self {
            api_url,
            api_version,
            state_dir,
            request_timeout_secs: number_or_default(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            filter_debounce_ms: number_or_default(
                &lookup,
                "FILTER_DEBOUNCE_MS",
                DEFAULT_FILTER_DEBOUNCE_MS,
            ),
            default_page_size: number_or_default(&lookup, "DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
        }
    }

    /// `api_url` joined with `api_version`, without a trailing slash.
    pub fn base_url(&self) -> String {
        let version = self.api_version.trim_matches('/');
        let url = self.api_url.trim_end_matches('/');
        if version.is_empty() {
            url.to_string()
        } else {
            format!("{url}/{version}")
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }
}

fn number_or_default<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, default = %default, "Invalid number, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url(), "http://localhost:3001/api/v1");
        assert_eq!(config.filter_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_overrides_and_invalid_numbers() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("API_URL", "https://admin.example.com/"),
            ("API_VERSION", "/api/v2/"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("DEFAULT_PAGE_SIZE", "lots"),
        ]));
        assert_eq!(config.base_url(), "https://admin.example.com/api/v2");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_empty_version_prefix() {
        let config = ClientConfig {
            api_version: String::new(),
            ..ClientConfig::default()
        };
        assert_eq!(config.base_url(), "http://localhost:3001");
    }
}
