use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides, e.g. `PADDOCK__API__TOKEN`.
const ENV_PREFIX: &str = "PADDOCK";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub drafts: DraftConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the listings API, without a trailing slash.
    pub base_url: String,
    /// Bearer token attached to every request.
    #[serde(default)]
    pub token: String,
    /// Endpoint that exchanges the current token for a fresh one. When unset,
    /// a rejected token is not refreshed.
    #[serde(default)]
    pub refresh_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DraftConfig {
    /// sqlx connection URL of the draft database. Defaults to a SQLite file
    /// in the user's data directory.
    #[serde(default)]
    pub url: Option<String>,
}

impl DraftConfig {
    /// The configured URL, or `sqlite://<data dir>/paddock/drafts.db`.
    pub fn url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}?mode=rwc", default_draft_path().display()),
        }
    }
}

/// `<data dir>/paddock/drafts.db`, falling back to the working directory
/// when the platform has no data directory.
pub fn default_draft_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paddock")
        .join("drafts.db")
}

impl ApiConfig {
    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl AppConfig {
    /// Load a TOML file, then apply `PADDOCK__SECTION__KEY` environment
    /// overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| "Failed to parse config TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let file = write_config(
            r#"
            [api]
            base_url = "https://api.example.com/"
            token = "t0"
            "#,
        );

        let cfg = AppConfig::load(file.path()).unwrap();

        assert_eq!(cfg.api.timeout_secs, 30);
        assert!(cfg.api.refresh_url.is_none());
        assert!(cfg.drafts.url.is_none());
        assert_eq!(
            cfg.api.endpoint("/agistments/a1"),
            "https://api.example.com/agistments/a1"
        );
    }

    #[test]
    fn explicit_draft_url_wins() {
        let file = write_config(
            r#"
            [api]
            base_url = "http://localhost:3000"

            [drafts]
            url = "sqlite::memory:"
            "#,
        );

        let cfg = AppConfig::load(file.path()).unwrap();
        assert_eq!(cfg.drafts.url(), "sqlite::memory:");
    }

    #[test]
    fn default_draft_url_points_at_data_dir() {
        let url = DraftConfig::default().url();
        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("drafts.db"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
