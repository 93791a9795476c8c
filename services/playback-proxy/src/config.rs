//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The config file is optional — the service runs from environment variables
//! alone. Credentials (SPOTIFY_ACCESS_TOKEN, SPOTIFY_REFRESH_TOKEN,
//! SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET) are only ever read from the
//! environment, never from the TOML file, to avoid leaking secrets.

use serde::Deserialize;
use spotify_auth::SecretString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Request body limit applied to inbound JSON/form bodies (50 KB)
pub const BODY_LIMIT_BYTES: usize = 50 * 1024;

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Upstream Spotify settings. The URL fields exist so tests and local
/// development can point at mock servers; production uses the defaults.
#[derive(Debug, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// May start empty; the guard's first probe then 401s and refreshes
    #[serde(skip)]
    pub access_token: String,
    #[serde(skip)]
    pub refresh_token: SecretString,
    #[serde(skip)]
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: SecretString,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_url: default_token_url(),
            timeout_secs: default_timeout(),
            access_token: String::new(),
            refresh_token: SecretString::default(),
            client_id: String::new(),
            client_secret: SecretString::default(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_max_connections() -> usize {
    1000
}

fn default_api_url() -> String {
    spotify_auth::API_BASE_URL.to_string()
}

fn default_token_url() -> String {
    spotify_auth::TOKEN_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from an optional TOML file, then overlay
    /// environment variables and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: Config = match path {
            Some(p) => {
                let contents = std::fs::read_to_string(p)?;
                toml::from_str(&contents)?
            }
            None => Config::default(),
        };

        // Env overrides for non-secret settings
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a number, got: {port}")))?;
        }
        if let Ok(url) = std::env::var("SPOTIFY_API_URL") {
            config.spotify.api_url = url;
        }
        if let Ok(url) = std::env::var("SPOTIFY_TOKEN_URL") {
            config.spotify.token_url = url;
        }

        // Credentials: environment only, read once at startup
        if let Ok(token) = std::env::var("SPOTIFY_ACCESS_TOKEN") {
            config.spotify.access_token = token;
        }
        if let Ok(token) = std::env::var("SPOTIFY_REFRESH_TOKEN") {
            config.spotify.refresh_token = SecretString::new(token);
        }
        if let Ok(id) = std::env::var("SPOTIFY_CLIENT_ID") {
            config.spotify.client_id = id;
        }
        if let Ok(secret) = std::env::var("SPOTIFY_CLIENT_SECRET") {
            config.spotify.client_secret = SecretString::new(secret);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("api_url", &self.spotify.api_url),
            ("token_url", &self.spotify.token_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.spotify.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".into()));
        }

        if self.server.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.spotify.refresh_token.is_empty() {
            return Err(Error::Config("SPOTIFY_REFRESH_TOKEN is required".into()));
        }
        if self.spotify.client_id.is_empty() {
            return Err(Error::Config("SPOTIFY_CLIENT_ID is required".into()));
        }
        if self.spotify.client_secret.is_empty() {
            return Err(Error::Config("SPOTIFY_CLIENT_SECRET is required".into()));
        }

        Ok(())
    }

    /// Resolve the config file path from CLI arg or CONFIG_PATH env var.
    ///
    /// An explicitly named file must exist (callers get an error from `load`
    /// if it doesn't). The default filename is only used when present, so an
    /// env-only deployment needs no file at all.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from("playback-proxy.toml");
        default.exists().then_some(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    const ALL_VARS: &[&str] = &[
        "PORT",
        "CONFIG_PATH",
        "SPOTIFY_API_URL",
        "SPOTIFY_TOKEN_URL",
        "SPOTIFY_ACCESS_TOKEN",
        "SPOTIFY_REFRESH_TOKEN",
        "SPOTIFY_CLIENT_ID",
        "SPOTIFY_CLIENT_SECRET",
    ];

    /// Clear all service env vars, then set the minimum required credentials.
    unsafe fn reset_env() {
        for var in ALL_VARS {
            unsafe { remove_env(var) };
        }
        unsafe {
            set_env("SPOTIFY_REFRESH_TOKEN", "rt_test");
            set_env("SPOTIFY_CLIENT_ID", "cid_test");
            set_env("SPOTIFY_CLIENT_SECRET", "sec_test");
        }
    }

    #[test]
    fn env_only_load_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };

        let config = Config::load(None).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.spotify.api_url, "https://api.spotify.com/v1");
        assert_eq!(
            config.spotify.token_url,
            "https://accounts.spotify.com/api/token"
        );
        assert_eq!(config.spotify.timeout_secs, 30);
        assert_eq!(config.spotify.refresh_token.expose(), "rt_test");
        assert_eq!(config.spotify.client_id, "cid_test");
        assert!(config.spotify.access_token.is_empty());
    }

    #[test]
    fn env_overrides_port_and_urls() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe {
            set_env("PORT", "9001");
            set_env("SPOTIFY_API_URL", "http://127.0.0.1:4000");
            set_env("SPOTIFY_TOKEN_URL", "http://127.0.0.1:4001/token");
            set_env("SPOTIFY_ACCESS_TOKEN", "at_from_env");
        }

        let config = Config::load(None).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.spotify.api_url, "http://127.0.0.1:4000");
        assert_eq!(config.spotify.token_url, "http://127.0.0.1:4001/token");
        assert_eq!(config.spotify.access_token, "at_from_env");
    }

    #[test]
    fn file_values_overridden_by_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe { set_env("PORT", "7777") };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 3000
max_connections = 250

[spotify]
timeout_secs = 10
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 7777, "env PORT must beat the file");
        assert_eq!(config.server.max_connections, 250);
        assert_eq!(config.spotify.timeout_secs, 10);
    }

    #[test]
    fn missing_file_errors() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        let result = Config::load(Some(Path::new("/nonexistent/path/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_toml_errors() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{{{ toml").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn non_numeric_port_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe { set_env("PORT", "eight-thousand") };

        let result = Config::load(None);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("PORT must be a number"), "got: {err}");
    }

    #[test]
    fn missing_refresh_token_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe { remove_env("SPOTIFY_REFRESH_TOKEN") };

        let result = Config::load(None);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("SPOTIFY_REFRESH_TOKEN"), "got: {err}");
    }

    #[test]
    fn missing_client_credentials_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe { remove_env("SPOTIFY_CLIENT_SECRET") };

        let result = Config::load(None);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("SPOTIFY_CLIENT_SECRET")
        );
    }

    #[test]
    fn url_without_scheme_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe { set_env("SPOTIFY_API_URL", "api.spotify.com/v1") };

        let result = Config::load(None);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("must start with http"), "got: {err}");
    }

    #[test]
    fn zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[spotify]\ntimeout_secs = 0\n").unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn zero_max_connections_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nmax_connections = 0\n").unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn resolve_path_cli_arg() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, Some(PathBuf::from("/custom/path.toml")));
    }

    #[test]
    fn resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, Some(PathBuf::from("/env/path.toml")));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            Some(PathBuf::from("/cli/wins.toml")),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn resolve_path_none_when_no_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { reset_env() };
        // No CLI arg, no CONFIG_PATH, and ./playback-proxy.toml does not
        // exist in the test working directory
        assert_eq!(Config::resolve_path(None), None);
    }
}
