//! Layered configuration for the planner CLI.
//!
//! Settings are read from `.mjop/mjop.toml`, then overridden by environment
//! variables (a `.env` file in the working directory is loaded first), then
//! by CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [sync]
//! base_url = "https://plans.example.org/api"
//! record_id = "complex-42"
//! timeout_secs = 30
//! data_dir = ".mjop/data"
//!
//! [schedule]
//! default_periodicity_months = 12
//! default_total_years = 10
//! default_indexation_rate = 2.5
//! block_on_conflicts = false
//! ```
//!
//! # Environment
//!
//! | Variable         | Overrides          |
//! |------------------|--------------------|
//! | `MJOP_SYNC_URL`  | `sync.base_url`    |
//! | `MJOP_RECORD_ID` | `sync.record_id`   |
//! | `MJOP_DATA_DIR`  | `sync.data_dir`    |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::{FileBackend, HttpBackend};

pub const CONFIG_DIR: &str = ".mjop";
pub const CONFIG_FILE: &str = "mjop.toml";

pub const ENV_SYNC_URL: &str = "MJOP_SYNC_URL";
pub const ENV_RECORD_ID: &str = "MJOP_RECORD_ID";
pub const ENV_DATA_DIR: &str = "MJOP_DATA_DIR";

/// Where snapshots are fetched from and saved to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    /// Remote persistence endpoint. Without one, only the local data
    /// directory is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Record holding this plan's snapshot.
    #[serde(default = "default_record_id")]
    pub record_id: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Local snapshot directory, relative to the project directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_record_id() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            base_url: None,
            record_id: default_record_id(),
            timeout_secs: default_timeout_secs(),
            data_dir: None,
        }
    }
}

/// Defaults for the `schedule` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_periodicity_months")]
    pub default_periodicity_months: u32,
    #[serde(default = "default_total_years")]
    pub default_total_years: u32,
    /// Yearly indexation in percent applied when `--index` is given without
    /// a rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_indexation_rate: Option<f64>,
    /// Refuse to commit a schedule that overlaps existing work unless
    /// `--allow-conflicts` is passed.
    #[serde(default)]
    pub block_on_conflicts: bool,
}

fn default_periodicity_months() -> u32 {
    12
}

fn default_total_years() -> u32 {
    10
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            default_periodicity_months: default_periodicity_months(),
            default_total_years: default_total_years(),
            default_indexation_rate: None,
            block_on_conflicts: false,
        }
    }
}

/// The complete mjop.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MjopToml {
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

impl MjopToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse mjop.toml")
    }

    /// Load `{mjop_dir}/mjop.toml`, or defaults when it does not exist.
    pub fn load_or_default(mjop_dir: &Path) -> Result<Self> {
        let config_path = mjop_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize mjop.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Problems that do not stop loading but are worth reporting.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.sync.timeout_secs == 0 {
            warnings.push("sync.timeout_secs is 0; requests will time out immediately".to_string());
        }
        if let Some(url) = &self.sync.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!("sync.base_url '{}' is not an http(s) URL", url));
        }
        if self.schedule.default_periodicity_months == 0 {
            warnings.push("schedule.default_periodicity_months must be positive".to_string());
        }
        if self.schedule.default_total_years == 0 {
            warnings.push("schedule.default_total_years must be positive".to_string());
        }
        if self
            .schedule
            .default_indexation_rate
            .is_some_and(|r| r < 0.0 || !r.is_finite())
        {
            warnings.push("schedule.default_indexation_rate must be non-negative".to_string());
        }
        warnings
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolved configuration: mjop.toml merged with environment and CLI
/// overrides.
#[derive(Debug, Clone)]
pub struct MjopConfig {
    pub project_dir: PathBuf,
    pub mjop_dir: PathBuf,
    pub toml: MjopToml,
    /// CLI override for the record id
    pub cli_record_id: Option<String>,
    /// CLI override for the remote endpoint
    pub cli_base_url: Option<String>,
}

impl MjopConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let mjop_dir = project_dir.join(CONFIG_DIR);
        let toml = MjopToml::load_or_default(&mjop_dir)?;

        Ok(Self {
            project_dir,
            mjop_dir,
            toml,
            cli_record_id: None,
            cli_base_url: None,
        })
    }

    pub fn with_cli_args(
        project_dir: PathBuf,
        record_id: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.cli_record_id = record_id;
        config.cli_base_url = base_url;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.mjop_dir.join(CONFIG_FILE)
    }

    /// Record id (CLI → env → file).
    pub fn record_id(&self) -> String {
        self.cli_record_id
            .clone()
            .or_else(|| env_value(ENV_RECORD_ID))
            .unwrap_or_else(|| self.toml.sync.record_id.clone())
    }

    /// Remote endpoint (CLI → env → file), if any.
    pub fn base_url(&self) -> Option<String> {
        self.cli_base_url
            .clone()
            .or_else(|| env_value(ENV_SYNC_URL))
            .or_else(|| self.toml.sync.base_url.clone())
    }

    /// Local snapshot directory (env → file → `.mjop/data`). Relative paths
    /// resolve against the project directory.
    pub fn data_dir(&self) -> PathBuf {
        let configured = env_value(ENV_DATA_DIR)
            .map(PathBuf::from)
            .or_else(|| self.toml.sync.data_dir.clone());
        match configured {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => self.project_dir.join(dir),
            None => self.mjop_dir.join("data"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.toml.sync.timeout_secs)
    }

    pub fn local_backend(&self) -> FileBackend {
        FileBackend::new(self.data_dir())
    }

    /// HTTP backend when a remote endpoint is configured.
    pub fn remote_backend(&self) -> Result<Option<HttpBackend>> {
        self.base_url()
            .map(|url| {
                HttpBackend::new(&url, self.timeout())
                    .with_context(|| format!("Failed to create HTTP client for {}", url))
            })
            .transpose()
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_mjop_toml_parse_empty() {
        let toml = MjopToml::parse("").unwrap();
        assert_eq!(toml.sync.record_id, "default");
        assert_eq!(toml.sync.timeout_secs, 30);
        assert_eq!(toml.schedule.default_periodicity_months, 12);
        assert!(!toml.schedule.block_on_conflicts);
    }

    #[test]
    fn test_mjop_toml_parse_sections() {
        let content = r#"
[sync]
base_url = "https://plans.example.org/api"
record_id = "complex-42"

[schedule]
default_total_years = 30
default_indexation_rate = 2.5
block_on_conflicts = true
"#;
        let toml = MjopToml::parse(content).unwrap();
        assert_eq!(
            toml.sync.base_url.as_deref(),
            Some("https://plans.example.org/api")
        );
        assert_eq!(toml.sync.record_id, "complex-42");
        assert_eq!(toml.schedule.default_total_years, 30);
        assert_eq!(toml.schedule.default_indexation_rate, Some(2.5));
        assert!(toml.schedule.block_on_conflicts);
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_mjop_toml_parse_invalid() {
        let result = MjopToml::parse("[sync\nrecord_id = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_reports_bad_values() {
        let content = r#"
[sync]
base_url = "ftp://nope"
timeout_secs = 0

[schedule]
default_periodicity_months = 0
"#;
        let warnings = MjopToml::parse(content).unwrap().validate();
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = MjopToml::default();
        toml.sync.record_id = "r-7".into();
        toml.save(&path)?;
        assert_eq!(MjopToml::load(&path)?.sync.record_id, "r-7");
        Ok(())
    }

    #[test]
    fn test_layering_cli_over_env_over_file() -> Result<()> {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = std::env::var(ENV_RECORD_ID).ok();

        let dir = tempdir()?;
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR))?;
        std::fs::write(
            dir.path().join(CONFIG_DIR).join(CONFIG_FILE),
            "[sync]\nrecord_id = \"from-file\"\n",
        )?;

        unsafe { std::env::remove_var(ENV_RECORD_ID) };
        let config = MjopConfig::new(dir.path().to_path_buf())?;
        assert_eq!(config.record_id(), "from-file");

        unsafe { std::env::set_var(ENV_RECORD_ID, "from-env") };
        assert_eq!(config.record_id(), "from-env");

        let config =
            MjopConfig::with_cli_args(dir.path().to_path_buf(), Some("from-cli".into()), None)?;
        assert_eq!(config.record_id(), "from-cli");

        match saved {
            Some(val) => unsafe { std::env::set_var(ENV_RECORD_ID, val) },
            None => unsafe { std::env::remove_var(ENV_RECORD_ID) },
        }
        Ok(())
    }

    #[test]
    fn test_data_dir_resolves_relative_to_project() -> Result<()> {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = std::env::var(ENV_DATA_DIR).ok();
        unsafe { std::env::remove_var(ENV_DATA_DIR) };

        let dir = tempdir()?;
        let mut config = MjopConfig::new(dir.path().to_path_buf())?;
        assert_eq!(config.data_dir(), config.mjop_dir.join("data"));

        config.toml.sync.data_dir = Some(PathBuf::from("snapshots"));
        assert_eq!(config.data_dir(), config.project_dir.join("snapshots"));

        if let Some(val) = saved {
            unsafe { std::env::set_var(ENV_DATA_DIR, val) };
        }
        Ok(())
    }
}
