use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::page_id::PageId;

pub const DEFAULT_BASE_URL: &str = "https://www.notion.so";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    pub renderer: RendererConfig,
    pub diff: DiffConfig,
    pub known_bad: KnownBadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub export_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub export_poll_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            export_timeout: Duration::from_secs(300),
            export_poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub command: String,
    pub args: Vec<String>,
    pub notion_compat: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: "notion-tohtml".to_string(),
            args: Vec::new(),
            notion_compat: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub dir_tool: Option<PathBuf>,
    pub disable_dir_diff: bool,
    pub viewer: String,
    pub viewer_args: Vec<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            dir_tool: None,
            disable_dir_diff: false,
            viewer: "code".to_string(),
            viewer_args: vec!["--new-window".to_string(), "--diff".to_string()],
        }
    }
}

/// Page ids whose mismatches are accepted. `global` applies to every run,
/// `roots` only when the traversal starts at the keyed page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KnownBadConfig {
    pub global: Vec<String>,
    pub roots: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api: ApiConfig::default(),
            renderer: RendererConfig::default(),
            diff: DiffConfig::default(),
            known_bad: KnownBadConfig::default(),
        }
    }
}

impl Config {
    /// Load config from an explicit path, the central config file, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::central_config_path().filter(|p| p.exists()),
        };
        let Some(candidate) = candidate else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(&candidate).map_err(|e| e.to_string())?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    /// `~/.config/epc/config.toml` on Linux, the platform equivalent elsewhere.
    pub fn central_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "epc").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.renderer.command.trim().is_empty() {
            return Err("renderer.command must not be empty".to_string());
        }
        if self.api.request_timeout.is_zero() {
            return Err("api.request_timeout must be greater than zero".to_string());
        }
        if self.api.export_timeout.is_zero() {
            return Err("api.export_timeout must be greater than zero".to_string());
        }
        if self.api.export_poll_interval.is_zero() {
            return Err("api.export_poll_interval must be greater than zero".to_string());
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must not be empty".to_string());
        }
        let listed = self
            .known_bad
            .global
            .iter()
            .chain(self.known_bad.roots.keys())
            .chain(self.known_bad.roots.values().flatten());
        for id in listed {
            if PageId::parse(id).is_err() {
                return Err(format!("known_bad entry '{id}' is not a valid page id"));
            }
        }
        Ok(())
    }
}
