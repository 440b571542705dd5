use std::path::{Path, PathBuf};

use epc_lib::{Config, EpcError};

/// Flags of `epc check` that can override config values.
#[derive(Debug, Default, Clone)]
pub struct CheckOverrides {
    pub data_dir: Option<PathBuf>,
    pub dir_diff_tool: Option<PathBuf>,
    pub no_dir_diff: bool,
    pub no_notion_compat: bool,
}

/// Merge CLI flags into the loaded config, preferring flags that were given.
pub fn resolve_check_settings(mut config: Config, overrides: &CheckOverrides) -> Config {
    if let Some(dir) = &overrides.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(tool) = &overrides.dir_diff_tool {
        config.diff.dir_tool = Some(tool.clone());
        config.diff.disable_dir_diff = false;
    }
    if overrides.no_dir_diff {
        config.diff.disable_dir_diff = true;
    }
    if overrides.no_notion_compat {
        config.renderer.notion_compat = false;
    }
    config
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/epc/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, EpcError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        EpcError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        EpcError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let dir_tool = if config.diff.disable_dir_diff {
        "disabled".to_string()
    } else {
        config
            .diff
            .dir_tool
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "auto".to_string())
    };
    format!(
        "Effective config [{source}]: data_dir={}, api={} (request {}s, export {}s, poll {}s), renderer={} notion_compat={}, dir_diff={}, viewer={}, known_bad: global={}, roots={}",
        config.data_dir.display(),
        config.api.base_url,
        config.api.request_timeout.as_secs(),
        config.api.export_timeout.as_secs(),
        config.api.export_poll_interval.as_secs(),
        config.renderer.command,
        config.renderer.notion_compat,
        dir_tool,
        config.diff.viewer,
        config.known_bad.global.len(),
        config.known_bad.roots.len(),
    )
}
