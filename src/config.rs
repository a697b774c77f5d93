use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use directories_next::ProjectDirs;
use serde::Deserialize;
use tokio::fs;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public base URL used for share links. Derived from the request when unset.
    pub base_url: Option<String>,
    pub address: IpAddr,
    pub port: u16,
    /// Honor the `x-test-now-ms` header. Never enable in production.
    pub test_mode: bool,
    /// Origins allowed to call the API from a browser. Empty allows any origin.
    pub cors_origins: Vec<String>,
    pub database: Database,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    /// Upper bound on a consuming read, including waiting for the row lock.
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_upload_size: usize,
}

/// Command-line and environment overrides applied on top of the config file.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Port to listen on.
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,
    /// Database connection URL.
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,
    /// Public base URL used for share links.
    #[arg(long, env = "BASE_URL", global = true)]
    pub base_url: Option<String>,
    /// Accept the `x-test-now-ms` header as the current time.
    #[arg(
        long,
        env = "TEST_MODE",
        global = true,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub test_mode: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: None,
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4000,
            test_mode: false,
            cors_origins: Vec::new(),
            database: Database::default(),
            limits: Limits::default(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database {
            url: "sqlite://ephembin.db?mode=rwc".to_owned(),
            max_connections: 10,
            acquire_timeout_ms: 5_000,
            lock_timeout_ms: 5_000,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_upload_size: 1024 * 1024,
        }
    }
}

impl Database {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Config {
    /// Load the config from `path`, or from the user config directory when no
    /// path is given. A missing default file yields the default config.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_owned(), true),
            None => match default_path() {
                Some(path) => (path, false),
                None => return Ok(Config::default()),
            },
        };

        if !required && !path.exists() {
            return Ok(Config::default());
        }

        let source = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&source)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn parse(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(base_url) = overrides.base_url {
            self.base_url = Some(base_url);
        }
        if let Some(test_mode) = overrides.test_mode {
            self.test_mode = test_mode;
        }
    }
}

fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ephembin").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.port, 4000);
        assert!(!config.test_mode);
        assert!(config.base_url.is_none());
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.database.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::parse(
            r#"
            base_url = "https://paste.example.com"
            port = 8080
            cors_origins = ["https://app.example.com"]

            [database]
            url = "postgres://localhost/pastes"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://paste.example.com"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, ["https://app.example.com"]);
        assert_eq!(config.database.url, "postgres://localhost/pastes");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.limits.max_upload_size, 1024 * 1024);
    }

    #[test]
    fn example_config_parses() {
        let config = Config::parse(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.limits.max_upload_size, 1_048_576);
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = Config::parse("port = 8080\ntest_mode = false").unwrap();
        config.apply(Overrides {
            port: Some(9000),
            test_mode: Some(true),
            ..Overrides::default()
        });

        assert_eq!(config.port, 9000);
        assert!(config.test_mode);
        assert_eq!(config.database.url, Database::default().url);
    }

    #[tokio::test]
    async fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let result = Config::load(Some(path.as_path())).await;
        assert!(result.is_err());
    }
}
