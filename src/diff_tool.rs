//! External diff tools: discovery and invocation.
//!
//! Platform differences stay behind [`DiffToolProbe`]: callers only learn
//! whether a directory-diff tool exists, and where.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DiffConfig;
use crate::error::{EpcError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirDiffKind {
    WinMerge,
    OpenDiff,
    Meld,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirDiffTool {
    pub path: PathBuf,
    pub kind: DirDiffKind,
}

impl DirDiffTool {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let kind = match stem.as_str() {
            "winmergeu" | "winmerge" => DirDiffKind::WinMerge,
            "opendiff" => DirDiffKind::OpenDiff,
            "meld" => DirDiffKind::Meld,
            _ => DirDiffKind::Custom,
        };
        Self { path, kind }
    }

    pub fn args(&self, left: &Path, right: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(3);
        if self.kind == DirDiffKind::WinMerge {
            // recurse into sub-directories
            args.push(OsString::from("/r"));
        }
        args.push(left.as_os_str().to_owned());
        args.push(right.as_os_str().to_owned());
        args
    }
}

/// Capability query: is a directory-diff tool available on this host?
pub trait DiffToolProbe {
    fn dir_diff_tool(&self) -> Option<DirDiffTool>;
}

/// Looks on `PATH` and in well-known install locations.
#[derive(Debug, Clone, Default)]
pub struct HostDiffToolProbe {
    override_path: Option<PathBuf>,
    disabled: bool,
    search_path: Option<OsString>,
    home: Option<PathBuf>,
}

impl HostDiffToolProbe {
    pub fn new() -> Self {
        Self {
            override_path: None,
            disabled: false,
            search_path: std::env::var_os("PATH"),
            home: directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf()),
        }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self {
            override_path: config.dir_tool.clone(),
            disabled: config.disable_dir_diff,
            ..Self::new()
        }
    }

    pub fn with_search_path(mut self, search_path: Option<OsString>, home: Option<PathBuf>) -> Self {
        self.search_path = search_path;
        self.home = home;
        self
    }

    fn well_known_locations(&self) -> Vec<PathBuf> {
        let mut locations = Vec::new();
        if let Some(home) = &self.home {
            locations.push(
                home.join("AppData")
                    .join("Local")
                    .join("Programs")
                    .join("WinMerge")
                    .join("WinMergeU.exe"),
            );
        }
        locations
    }
}

impl DiffToolProbe for HostDiffToolProbe {
    fn dir_diff_tool(&self) -> Option<DirDiffTool> {
        if self.disabled {
            debug!("directory diff disabled by configuration");
            return None;
        }

        if let Some(path) = &self.override_path {
            if is_executable(path) {
                return Some(DirDiffTool::from_path(path.clone()));
            }
            if let Some(found) = find_executable(path.as_os_str(), self.search_path.as_deref()) {
                return Some(DirDiffTool::from_path(found));
            }
            warn!(tool = %path.display(), "configured diff tool not found; falling back to discovery");
        }

        if let Some(found) = find_executable(OsStr::new("WinMergeU"), self.search_path.as_deref()) {
            return Some(DirDiffTool::from_path(found));
        }
        if let Some(found) = self.well_known_locations().into_iter().find(|p| is_executable(p)) {
            return Some(DirDiffTool::from_path(found));
        }
        ["opendiff", "meld"]
            .iter()
            .find_map(|name| find_executable(OsStr::new(name), self.search_path.as_deref()))
            .map(DirDiffTool::from_path)
    }
}

/// Resolve a bare executable name against a `PATH`-style list.
pub fn find_executable(name: &OsStr, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let name_path = Path::new(name);
    if name_path.components().count() > 1 {
        return is_executable(name_path).then(|| name_path.to_path_buf());
    }
    let search_path = search_path?;
    for dir in std::env::split_paths(search_path) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let with_exe = candidate.with_extension("exe");
            if is_executable(&with_exe) {
                return Some(with_exe);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Opens diff views. Launched tools are not waited on.
pub trait DiffLauncher {
    fn launch_dir_diff(&self, tool: &DirDiffTool, expected: &Path, got: &Path) -> Result<()>;

    fn open_file_diff(&self, expected: &Path, got: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ProcessDiffLauncher {
    viewer: String,
    viewer_args: Vec<String>,
}

impl ProcessDiffLauncher {
    pub fn new(viewer: impl Into<String>, viewer_args: Vec<String>) -> Self {
        Self {
            viewer: viewer.into(),
            viewer_args,
        }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self::new(config.viewer.clone(), config.viewer_args.clone())
    }
}

impl DiffLauncher for ProcessDiffLauncher {
    fn launch_dir_diff(&self, tool: &DirDiffTool, expected: &Path, got: &Path) -> Result<()> {
        debug!(tool = %tool.path.display(), "launching directory diff");
        spawn_detached(tool.path.as_os_str(), tool.args(expected, got))
    }

    fn open_file_diff(&self, expected: &Path, got: &Path) -> Result<()> {
        let mut args: Vec<OsString> = self.viewer_args.iter().map(OsString::from).collect();
        args.push(expected.as_os_str().to_owned());
        args.push(got.as_os_str().to_owned());
        debug!(viewer = %self.viewer, "opening file diff");
        spawn_detached(OsStr::new(&self.viewer), args)
    }
}

fn spawn_detached(program: &OsStr, args: Vec<OsString>) -> Result<()> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                EpcError::Config(format!(
                    "diff tool '{}' was not found on PATH",
                    program.to_string_lossy()
                ))
            } else {
                EpcError::Io(err)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn kind_is_detected_from_file_name() {
        assert_eq!(
            DirDiffTool::from_path("C:/Tools/WinMergeU.exe").kind,
            DirDiffKind::WinMerge
        );
        assert_eq!(
            DirDiffTool::from_path("/usr/bin/opendiff").kind,
            DirDiffKind::OpenDiff
        );
        assert_eq!(DirDiffTool::from_path("/usr/bin/meld").kind, DirDiffKind::Meld);
        assert_eq!(DirDiffTool::from_path("/opt/bc4").kind, DirDiffKind::Custom);
    }

    #[test]
    fn winmerge_gets_recursive_flag() {
        let tool = DirDiffTool::from_path("WinMergeU.exe");
        let args = tool.args(Path::new("exp"), Path::new("got"));
        assert_eq!(args, vec![OsString::from("/r"), "exp".into(), "got".into()]);

        let meld = DirDiffTool::from_path("meld");
        assert_eq!(meld.args(Path::new("a"), Path::new("b")).len(), 2);
    }

    #[test]
    fn probe_finds_tool_on_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        touch(&bin.join("meld"));
        let probe = HostDiffToolProbe::default()
            .with_search_path(Some(bin.clone().into_os_string()), None);
        let tool = probe.dir_diff_tool().expect("meld on path");
        assert_eq!(tool.kind, DirDiffKind::Meld);
        assert_eq!(tool.path, bin.join("meld"));
    }

    #[test]
    fn probe_checks_winmerge_install_directory() {
        let home = tempfile::tempdir().unwrap();
        let exe = home
            .path()
            .join("AppData/Local/Programs/WinMerge/WinMergeU.exe");
        touch(&exe);
        let probe =
            HostDiffToolProbe::default().with_search_path(None, Some(home.path().to_path_buf()));
        let tool = probe.dir_diff_tool().expect("winmerge in home");
        assert_eq!(tool.kind, DirDiffKind::WinMerge);
    }

    #[test]
    fn probe_reports_none_when_nothing_is_installed() {
        let empty = tempfile::tempdir().unwrap();
        let probe = HostDiffToolProbe::default()
            .with_search_path(Some(empty.path().as_os_str().to_owned()), None);
        assert!(probe.dir_diff_tool().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn probe_skips_files_without_execute_permission() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let meld = dir.path().join("meld");
        std::fs::write(&meld, b"").unwrap();
        std::fs::set_permissions(&meld, std::fs::Permissions::from_mode(0o644)).unwrap();
        let config = DiffConfig {
            dir_tool: Some(meld.clone()),
            ..DiffConfig::default()
        };

        let probe = HostDiffToolProbe::from_config(&config)
            .with_search_path(Some(dir.path().as_os_str().to_owned()), None);
        assert!(probe.dir_diff_tool().is_none());
        assert!(find_executable(OsStr::new("meld"), Some(dir.path().as_os_str())).is_none());
    }

    #[test]
    fn disabled_probe_ignores_installed_tools() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("opendiff"));
        let config = DiffConfig {
            disable_dir_diff: true,
            ..DiffConfig::default()
        };
        let probe = HostDiffToolProbe::from_config(&config)
            .with_search_path(Some(dir.path().as_os_str().to_owned()), None);
        assert!(probe.dir_diff_tool().is_none());
    }

    #[test]
    fn configured_tool_wins_over_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("bcompare");
        touch(&custom);
        touch(&dir.path().join("meld"));
        let config = DiffConfig {
            dir_tool: Some(custom.clone()),
            ..DiffConfig::default()
        };
        let probe = HostDiffToolProbe::from_config(&config)
            .with_search_path(Some(dir.path().as_os_str().to_owned()), None);
        let tool = probe.dir_diff_tool().unwrap();
        assert_eq!(tool.path, custom);
        assert_eq!(tool.kind, DirDiffKind::Custom);
    }
}
