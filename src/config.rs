//! Configuration types.
//!
//! Values come from the process environment first, then from a `.env` file
//! in the working directory. Empty values count as unset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PAGE_TIMEOUT_MS: u64 = 10_000;

/// Custom Search credentials. Both halves are required for the fallback.
#[derive(Debug, Clone)]
pub struct CustomSearchConfig {
    pub api_key: SecretString,
    pub engine_id: String,
    pub base_url: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key. Lookups fail with a user-facing error when unset.
    pub gemini_api_key: Option<SecretString>,
    pub model: String,
    pub gemini_base_url: String,
    /// `None` unless both the key and the engine id are set.
    pub custom_search: Option<CustomSearchConfig>,
    /// Quiet period before an input value is searched.
    pub debounce: Duration,
    /// Fetch result pages and scrape flashcards in the Custom Search fallback.
    pub fetch_pages: bool,
    /// Per-request timeout for scraped result pages.
    pub page_timeout: Duration,
    pub port: u16,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            custom_search: None,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            fetch_pages: false,
            page_timeout: Duration::from_millis(DEFAULT_PAGE_TIMEOUT_MS),
            port: DEFAULT_PORT,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from the process environment and `./.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(Path::new(".env"), |key| std::env::var(key).ok())
    }

    /// Load from `env`, falling back to the `.env` file at `dotenv_path`.
    pub fn from_env_with<E>(dotenv_path: &Path, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let dotenv = load_dotenv(dotenv_path)?;
        Ok(Self::from_lookup(|key| {
            env(key).or_else(|| dotenv.get(key).cloned())
        }))
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let custom_search = match (get("GOOGLE_SEARCH_API_KEY"), get("GOOGLE_SEARCH_ENGINE_ID")) {
            (Some(api_key), Some(engine_id)) => Some(CustomSearchConfig {
                api_key: SecretString::from(api_key),
                engine_id,
                base_url: get("QUIZBASE_SEARCH_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            }),
            _ => None,
        };

        let debounce_ms = parse_or(get("QUIZBASE_DEBOUNCE_MS"), "QUIZBASE_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS);
        let page_timeout_ms = parse_or(
            get("QUIZBASE_PAGE_TIMEOUT_MS"),
            "QUIZBASE_PAGE_TIMEOUT_MS",
            DEFAULT_PAGE_TIMEOUT_MS,
        );

        Self {
            gemini_api_key: get("GEMINI_API_KEY").map(SecretString::from),
            model: get("QUIZBASE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("QUIZBASE_GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            custom_search,
            debounce: Duration::from_millis(debounce_ms),
            fetch_pages: get("QUIZBASE_FETCH_PAGES")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            page_timeout: Duration::from_millis(page_timeout_ms),
            port: parse_or(get("QUIZBASE_PORT"), "QUIZBASE_PORT", DEFAULT_PORT),
            log_dir: get("QUIZBASE_LOG_DIR").map(PathBuf::from),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "Invalid value, using default {default}");
            default
        }),
        None => default,
    }
}

/// Read a `.env` file without touching the process environment. A missing
/// file yields an empty map.
pub fn load_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };
    iter.map(|item| item.map_err(ConfigError::from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None);
        assert!(config.gemini_api_key.is_none());
        assert!(config.custom_search.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.debounce, Duration::from_millis(400));
        assert_eq!(config.port, 8080);
        assert!(!config.fetch_pages);
        assert_eq!(config.page_timeout, Duration::from_secs(10));
    }

    #[test]
    fn custom_search_requires_both_values() {
        let config = Config::from_lookup(lookup_from(&[("GOOGLE_SEARCH_API_KEY", "k")]));
        assert!(config.custom_search.is_none());

        let config = Config::from_lookup(lookup_from(&[
            ("GOOGLE_SEARCH_API_KEY", "k"),
            ("GOOGLE_SEARCH_ENGINE_ID", "cx"),
        ]));
        let search = config.custom_search.unwrap();
        assert_eq!(search.api_key.expose_secret(), "k");
        assert_eq!(search.engine_id, "cx");
        assert_eq!(search.base_url, DEFAULT_SEARCH_BASE_URL);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "   ")]));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("QUIZBASE_DEBOUNCE_MS", "soon"),
            ("QUIZBASE_PORT", "9090"),
            ("QUIZBASE_FETCH_PAGES", "true"),
            ("QUIZBASE_PAGE_TIMEOUT_MS", "250"),
        ]));
        assert_eq!(config.debounce, Duration::from_millis(400));
        assert_eq!(config.port, 9090);
        assert!(config.fetch_pages);
        assert_eq!(config.page_timeout, Duration::from_millis(250));
    }

    #[test]
    fn dotenv_values_are_unquoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# keys\nGEMINI_API_KEY=\"abc=def\"\n\nGOOGLE_SEARCH_ENGINE_ID='cx'\nQUIZBASE_PORT=9090\n",
        )
        .unwrap();

        let map = load_dotenv(&path).unwrap();
        assert_eq!(map.get("GEMINI_API_KEY").map(String::as_str), Some("abc=def"));
        assert_eq!(map.get("GOOGLE_SEARCH_ENGINE_ID").map(String::as_str), Some("cx"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn dotenv_syntax_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "GEMINI_API_KEY=\"unterminated\n").unwrap();

        let err = load_dotenv(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Dotenv(_)));
    }

    #[test]
    fn process_env_wins_over_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "QUIZBASE_MODEL=from-dotenv\nGEMINI_API_KEY=dotenv-key\n",
        )
        .unwrap();

        let config = Config::from_env_with(
            &path,
            lookup_from(&[("QUIZBASE_MODEL", "from-env")]),
        )
        .unwrap();
        assert_eq!(config.model, "from-env");
        // Keys only in .env still apply
        assert_eq!(
            config.gemini_api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("dotenv-key".to_string())
        );
    }

    #[test]
    fn missing_dotenv_uses_env_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_env_with(
            &dir.path().join(".env"),
            lookup_from(&[("QUIZBASE_PORT", "9191")]),
        )
        .unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn dotenv_file_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = load_dotenv(&dir.path().join(".env")).unwrap();
        assert!(map.is_empty());

        let path = dir.path().join(".env");
        std::fs::write(&path, "QUIZBASE_MODEL=gemini-test\n").unwrap();
        let map = load_dotenv(&path).unwrap();
        assert_eq!(map.get("QUIZBASE_MODEL").map(String::as_str), Some("gemini-test"));
    }
}
