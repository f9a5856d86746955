//! Dashboard configuration, stored as RON.
//!
//! Every field has a default so a partial file (or no file at all) is valid;
//! only the organization must be supplied before anything talks to the API.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use voicebench_core::{EntityKind, PollPolicy, AUDIO_PREVIEW_TIMEOUT, DEFAULT_POLL_INTERVAL};
use voicebench_engine::ApiSettings;
use voicebench_logging::{default_log_path, LogDestination};

pub(crate) const DEFAULT_CONFIG_PATH: &str = "voicebench.ron";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("organization_id is required")]
    MissingOrganization,
    #[error("poll_interval_ms must be greater than zero")]
    ZeroInterval,
    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) enum LogOutput {
    File,
    #[default]
    Terminal,
    Both,
}

impl From<LogOutput> for LogDestination {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::File => LogDestination::File,
            LogOutput::Terminal => LogDestination::Terminal,
            LogOutput::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LogConfig {
    pub destination: LogOutput,
    pub level: String,
    pub path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogOutput::default(),
            level: "info".to_string(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DashboardConfig {
    pub base_url: String,
    pub organization_id: String,
    /// Overridden by `--token` / `VOICEBENCH_TOKEN`.
    pub access_token: Option<String>,
    pub poll_interval_ms: u64,
    pub audio_preview_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log: LogConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            organization_id: String::new(),
            access_token: None,
            poll_interval_ms: millis(DEFAULT_POLL_INTERVAL),
            audio_preview_timeout_ms: millis(AUDIO_PREVIEW_TIMEOUT),
            request_timeout_ms: 30_000,
            log: LogConfig::default(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl DashboardConfig {
    /// Reads `path`; `None` when the file does not exist.
    pub(crate) fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map(Some)
    }

    pub(crate) fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(content)?;
        if config.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(config)
    }

    pub(crate) fn api_settings(&self) -> Result<ApiSettings, ConfigError> {
        if self.organization_id.trim().is_empty() {
            return Err(ConfigError::MissingOrganization);
        }
        let mut settings = ApiSettings::new(Url::parse(&self.base_url)?, &self.organization_id);
        settings.request_timeout = Duration::from_millis(self.request_timeout_ms);
        Ok(settings)
    }

    /// The configured interval for every kind; a timeout only for kinds that
    /// have one by default.
    pub(crate) fn poll_policy(&self, kind: EntityKind) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: kind
                .poll_policy()
                .timeout
                .map(|_| Duration::from_millis(self.audio_preview_timeout_ms)),
        }
    }

    pub(crate) fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log.level)
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.log.path.clone().unwrap_or_else(default_log_path)
    }
}

pub(crate) fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(level).map_err(|_| ConfigError::InvalidLogLevel(level.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(organization_id: "org-1", log: (destination: Both, level: "debug"))"#
        )
        .unwrap();

        let config = DashboardConfig::load(file.path()).unwrap().unwrap();
        assert_eq!(config.organization_id, "org-1");
        assert_eq!(config.poll_interval_ms, 2_000);
        assert_eq!(config.log.destination, LogOutput::Both);
        assert_eq!(config.log_level().unwrap(), LevelFilter::Debug);
        assert_eq!(config.access_token, None);
    }

    #[test]
    fn missing_file_is_reported_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = DashboardConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn settings_require_an_organization() {
        let config = DashboardConfig::default();
        assert!(matches!(
            config.api_settings(),
            Err(ConfigError::MissingOrganization)
        ));
    }

    #[test]
    fn settings_carry_url_and_timeout() {
        let ron = r#"(
            base_url: "https://api.example.com/v1/",
            organization_id: "acme",
            request_timeout_ms: 5000,
        )"#;
        let config = DashboardConfig::parse(ron).unwrap();
        let settings = config.api_settings().unwrap();
        assert_eq!(settings.organization_id, "acme");
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(
            settings.endpoint(&["agents"]).unwrap().as_str(),
            "https://api.example.com/v1/organizations/acme/agents"
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            DashboardConfig::parse("(poll_interval_ms: 0)"),
            Err(ConfigError::ZeroInterval)
        ));
        assert!(matches!(
            DashboardConfig::parse("(base_url: 42)"),
            Err(ConfigError::Parse(_))
        ));
        let config = DashboardConfig::parse(r#"(log: (level: "loud"))"#).unwrap();
        assert!(matches!(
            config.log_level(),
            Err(ConfigError::InvalidLogLevel(level)) if level == "loud"
        ));
    }

    #[test]
    fn only_personas_time_out() {
        let ron = "(poll_interval_ms: 500, audio_preview_timeout_ms: 9000)";
        let config = DashboardConfig::parse(ron).unwrap();
        let persona = config.poll_policy(EntityKind::Persona);
        assert_eq!(persona.interval, Duration::from_millis(500));
        assert_eq!(persona.timeout, Some(Duration::from_secs(9)));
        assert_eq!(config.poll_policy(EntityKind::Agent).timeout, None);
    }
}
