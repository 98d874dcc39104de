//! Process configuration
//!
//! Loaded once at startup and handed to whatever needs it; nothing reads
//! the API key from ambient state afterwards.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TouristError};

/// Default Flickr REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.flickr.com/services/rest";

/// Default timeout for API requests and photo downloads
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Directory name used under the platform config/data dirs
const APP_DIR: &str = "virtual-tourist";

/// Contents of `keys.json`
#[derive(Debug, Deserialize)]
struct KeysFile {
    #[serde(rename = "flickrAPIKey")]
    flickr_api_key: String,
}

/// Configuration shared by the store and the Flickr client
#[derive(Debug, Clone)]
pub struct TouristConfig {
    /// Flickr API key; only needed by commands that reach the network
    pub api_key: Option<String>,
    /// Flickr REST endpoint
    pub api_url: String,
    /// Location of the SQLite catalog
    pub database_path: PathBuf,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl TouristConfig {
    /// Build a configuration around an explicit API key, with default
    /// endpoint, timeout and database location.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::without_api_key()
        }
    }

    /// Defaults with no API key, enough for catalog-only work
    pub fn without_api_key() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            database_path: default_database_path(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Load configuration from environment variables and the keys file.
    ///
    /// A missing key is not an error here; [`TouristConfig::api_key`] reports
    /// it once something actually needs to talk to Flickr.
    ///
    /// - `FLICKR_API_KEY` or `flickrAPIKey` in `<config dir>/virtual-tourist/keys.json`
    /// - `FLICKR_API_URL` (default: the public Flickr endpoint)
    /// - `FLICKR_TIMEOUT_SECS` (default: 15)
    /// - `VIRTUAL_TOURIST_DB` (default: `<data dir>/virtual-tourist/virtual_tourist.db`)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::without_api_key();
        config.api_key = match std::env::var("FLICKR_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(key),
            _ => find_api_key(default_keys_path().as_deref())?,
        };

        if let Ok(url) = std::env::var("FLICKR_API_URL") {
            config.api_url = url;
        }

        if let Some(secs) = std::env::var("FLICKR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(path) = std::env::var("VIRTUAL_TOURIST_DB") {
            config.database_path = PathBuf::from(path);
        }

        debug!(
            api_url = %config.api_url,
            database = %config.database_path.display(),
            timeout_secs = config.request_timeout.as_secs(),
            has_api_key = config.api_key.is_some(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// The Flickr API key, or a configuration error naming where to put one
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            TouristError::Config(
                "no Flickr API key: set FLICKR_API_KEY or add flickrAPIKey to keys.json".into(),
            )
        })
    }
}

/// Look for the API key in the keys file at `path`.
/// An absent file means no key; an unreadable or malformed one is an error.
pub fn find_api_key(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) if path.exists() => read_keys_file(path).map(Some),
        _ => Ok(None),
    }
}

/// Read the Flickr API key from a `keys.json` file
pub fn read_keys_file(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        TouristError::Config(format!(
            "no FLICKR_API_KEY set and {} is unreadable: {e}",
            path.display()
        ))
    })?;

    let keys: KeysFile = serde_json::from_str(&contents)
        .map_err(|e| TouristError::Config(format!("invalid {}: {e}", path.display())))?;

    if keys.flickr_api_key.trim().is_empty() {
        return Err(TouristError::Config(format!(
            "flickrAPIKey in {} is empty",
            path.display()
        )));
    }
    Ok(keys.flickr_api_key)
}

/// Get the path where the keys file is expected
/// - Linux: ~/.config/virtual-tourist/keys.json
/// - macOS: ~/Library/Application Support/virtual-tourist/keys.json
pub fn default_keys_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("keys.json"))
}

/// Get the path where the database should be stored
/// - Linux: ~/.local/share/virtual-tourist/virtual_tourist.db
/// - macOS: ~/Library/Application Support/virtual-tourist/virtual_tourist.db
/// - Windows: %APPDATA%\virtual-tourist\virtual_tourist.db
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("virtual_tourist.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_api_key_defaults() {
        let config = TouristConfig::with_api_key("abc123");
        assert_eq!(config.api_key().unwrap(), "abc123");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
        assert!(config.database_path.ends_with("virtual-tourist/virtual_tourist.db"));
    }

    #[test]
    fn test_missing_key_only_fails_when_asked_for() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("keys.json");
        assert_eq!(find_api_key(Some(&absent)).unwrap(), None);
        assert_eq!(find_api_key(None).unwrap(), None);

        let config = TouristConfig::without_api_key();
        assert!(config.database_path.ends_with("virtual-tourist/virtual_tourist.db"));
        assert!(matches!(config.api_key(), Err(TouristError::Config(_))));

        std::fs::write(&absent, r#"{"flickrAPIKey": "from-file"}"#).unwrap();
        assert_eq!(find_api_key(Some(&absent)).unwrap().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_read_keys_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, r#"{"flickrAPIKey": "secret-key"}"#).unwrap();

        assert_eq!(read_keys_file(&path).unwrap(), "secret-key");
    }

    #[test]
    fn test_read_keys_file_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(read_keys_file(&missing), Err(TouristError::Config(_))));

        let malformed = dir.path().join("bad.json");
        std::fs::write(&malformed, "{not json").unwrap();
        assert!(matches!(read_keys_file(&malformed), Err(TouristError::Config(_))));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, r#"{"flickrAPIKey": "  "}"#).unwrap();
        assert!(matches!(read_keys_file(&empty), Err(TouristError::Config(_))));
    }
}
