//! Consistency engine configuration.
//!
//! # Responsibility
//! - Parse the TOML settings consumed by the consistency service.
//! - Provide defaults for every field so an empty file is valid.
//!
//! # Invariants
//! - `page_size` is always positive after a successful load.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_REPORT_URL: &str = "http://www.minderbot.com/consistency/";
const DEFAULT_REPORT_PATH: &str = "/consistency/";
const DEFAULT_LOGIN_URL: &str = "/accounts/login/?next=/consistency/";
const DEFAULT_PAGE_SIZE: u32 = 500;

/// What a repair does with an owner/author id that no longer resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingOwnerPolicy {
    /// Unset dangling authors and leave dangling owners for manual review.
    Clear,
    /// Reassign reminders to the administrator running the repair.
    #[default]
    Claim,
}

impl DanglingOwnerPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Claim => "claim",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsistencyConfig {
    #[serde(default)]
    pub dangling_owner_policy: DanglingOwnerPolicy,
    /// Footer link appended to every plain-text report.
    #[serde(default = "default_report_url")]
    pub report_url: String,
    /// Location interactive callers are sent back to after a repair.
    #[serde(default = "default_report_path")]
    pub report_path: String,
    /// Redirect target for callers that are not staff.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Rows fetched per store round-trip while loading a snapshot.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            dangling_owner_policy: DanglingOwnerPolicy::default(),
            report_url: default_report_url(),
            report_path: default_report_path(),
            login_url: default_login_url(),
            page_size: default_page_size(),
        }
    }
}

impl ConsistencyConfig {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.report_url.trim().is_empty() {
            return Err(ConfigError::Invalid("report_url cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config: {message}"),
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(_) | Self::Invalid(_) => None,
        }
    }
}

fn default_report_url() -> String {
    DEFAULT_REPORT_URL.to_string()
}

fn default_report_path() -> String {
    DEFAULT_REPORT_PATH.to_string()
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConsistencyConfig, DanglingOwnerPolicy};

    #[test]
    fn empty_document_yields_defaults() {
        let config = ConsistencyConfig::from_toml_str("").expect("empty config should parse");
        assert_eq!(config, ConsistencyConfig::default());
        assert_eq!(config.dangling_owner_policy, DanglingOwnerPolicy::Claim);
        assert_eq!(config.page_size, 500);
    }

    #[test]
    fn clear_policy_parses() {
        let config = ConsistencyConfig::from_toml_str(
            "dangling_owner_policy = \"clear\"\npage_size = 2\n",
        )
        .expect("config should parse");
        assert_eq!(config.dangling_owner_policy, DanglingOwnerPolicy::Clear);
        assert_eq!(config.page_size, 2);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = ConsistencyConfig::from_toml_str("dangling_owner_policy = \"delete\"")
            .expect_err("unknown policy must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = ConsistencyConfig::from_toml_str("page_size = 0")
            .expect_err("zero page size must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("consistency.toml");
        std::fs::write(&path, "report_url = \"https://example.com/check/\"\n")
            .expect("write config");

        let config = ConsistencyConfig::load(&path).expect("config should load");
        assert_eq!(config.report_url, "https://example.com/check/");
        assert_eq!(config.login_url, "/accounts/login/?next=/consistency/");
    }
}
