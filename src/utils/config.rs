use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "fiori-pilot.yaml";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Start URL of the list report
    pub url: Option<String>,

    pub headless: bool,

    /// Persistent browser profile, keeps the login across runs
    pub profile_dir: PathBuf,

    /// Reconciled metadata file
    pub metadata_path: PathBuf,

    /// Explicit browser binary; discovered when absent
    pub browser_executable: Option<PathBuf>,

    pub viewport_width: u32,
    pub viewport_height: u32,

    pub timeouts: Timeouts,
}

/// Wait bounds, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
    /// Framework start, long enough for an interactive login
    pub framework_ready_ms: u64,
    pub element_ms: u64,
    pub rows_ms: u64,
    /// How long an action may take to show a dialog or messages
    pub action_settle_ms: u64,
    pub navigation_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            framework_ready_ms: 600_000,
            element_ms: 30_000,
            rows_ms: 60_000,
            action_settle_ms: 5_000,
            navigation_ms: 60_000,
            poll_interval_ms: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            headless: false,
            profile_dir: default_profile_dir(),
            metadata_path: PathBuf::from("fiori-metadata.json"),
            browser_executable: None,
            viewport_width: 1440,
            viewport_height: 900,
            timeouts: Timeouts::default(),
        }
    }
}

/// `~/.fiori-pilot/profile`, or a relative directory without a home
pub fn default_profile_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".fiori-pilot").join("profile"))
        .unwrap_or_else(|| PathBuf::from(".fiori-pilot/profile"))
}

impl Config {
    /// Defaults, then the YAML file, then `FIORI_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(file) => {
                let content = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read config: {}", file.display()))?;
                Self::from_yaml(&content)
                    .with_context(|| format!("Failed to parse config: {}", file.display()))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override fields from environment lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FIORI_URL").filter(|v| !v.is_empty()) {
            self.url = Some(url);
        }
        if let Some(headless) = lookup("FIORI_HEADLESS") {
            self.headless = headless == "true" || headless == "1";
        }
        if let Some(dir) = lookup("FIORI_PROFILE_DIR").filter(|v| !v.is_empty()) {
            self.profile_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("FIORI_METADATA").filter(|v| !v.is_empty()) {
            self.metadata_path = PathBuf::from(path);
        }
        if let Some(browser) = lookup("FIORI_BROWSER").filter(|v| !v.is_empty()) {
            self.browser_executable = Some(PathBuf::from(browser));
        }
    }
}
