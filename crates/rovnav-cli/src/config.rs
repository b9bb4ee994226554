//! Configuration Vault – reads/writes `~/.rovnav/config.toml`.

use rovnav_runtime::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted configuration stored in `~/.rovnav/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Target duration of one controller cycle.
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,

    /// Directory holding `<name>.ffc` coefficient files.  When unset the
    /// built-in coefficient sets are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters_dir: Option<PathBuf>,

    #[serde(default)]
    pub controller: ControllerConfig,
}

fn default_cycle_period_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle_period_ms: default_cycle_period_ms(),
            filters_dir: None,
            controller: ControllerConfig::default(),
        }
    }
}

/// Return the path to `~/.rovnav/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rovnav").join("config.toml")
}

/// Load the config, writing the defaults to disk first if none exists.
/// Environment overrides are applied either way but never persisted.
pub fn load_or_create() -> Result<Config, String> {
    load_or_create_at(&config_path())
}

pub(crate) fn load_or_create_at(path: &Path) -> Result<Config, String> {
    if let Some(cfg) = load_from(path)? {
        return Ok(cfg);
    }
    let mut cfg = Config::default();
    save_to(&cfg, path)?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROVNAV_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVNAV_ROOM` | `controller.room` |
/// | `ROVNAV_FAIL_LIMIT` | `controller.fail_limit` |
/// | `ROVNAV_FILTERS_DIR` | `filters_dir` |
/// | `ROVNAV_CYCLE_PERIOD_MS` | `cycle_period_ms` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVNAV_ROOM")
        && let Ok(room) = v.parse::<usize>()
    {
        cfg.controller.room = room;
    }
    if let Ok(v) = std::env::var("ROVNAV_FAIL_LIMIT")
        && let Ok(limit) = v.parse::<u32>()
    {
        cfg.controller.fail_limit = limit;
    }
    if let Ok(v) = std::env::var("ROVNAV_FILTERS_DIR")
        && !v.is_empty()
    {
        cfg.filters_dir = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("ROVNAV_CYCLE_PERIOD_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.cycle_period_ms = ms;
    }
}

/// Save the config to disk, creating the parent directory if necessary.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rovnav_perception::{CalibrationTable, Uncertainty};

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        assert_eq!(dir_meta.permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn roundtrip_preserves_numeric_setup() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = Config::default();
        cfg.controller.uncertainty.absolute = [0.2, 0.3, 0.4];
        cfg.controller.robot.diameter_cm = 31.5;
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.controller.calibration, CalibrationTable::default());
        assert_eq!(loaded.controller.uncertainty.absolute, [0.2, 0.3, 0.4]);
        assert_eq!(loaded.controller.uncertainty.process, Uncertainty::default().process);
        assert_eq!(loaded.controller.robot.diameter_cm, 31.5);
        assert_eq!(loaded.controller.filters.wheels, "we");
    }

    #[test]
    fn partial_file_gets_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[controller.robot]\nticks_per_cm = 7.5\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.controller.robot.ticks_per_cm, 7.5);
        assert_eq!(loaded.controller.robot.diameter_cm, 29.0);
        assert_eq!(loaded.controller.calibration, CalibrationTable::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cycle_period_ms = \"soon\"\n").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn load_or_create_writes_defaults_once() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());

        let created = load_or_create_at(&path).expect("create");
        assert!(path.exists());
        assert_eq!(created.controller.calibration, CalibrationTable::default());

        let again = load_or_create_at(&path).expect("load");
        assert_eq!(again.controller.calibration, created.controller.calibration);
    }

    #[test]
    fn config_path_points_to_rovnav_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".rovnav"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn apply_env_overrides_changes_room() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVNAV_ROOM", "2") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.controller.room, 2);
        unsafe { std::env::remove_var("ROVNAV_ROOM") };
    }

    #[test]
    fn apply_env_overrides_changes_fail_limit() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVNAV_FAIL_LIMIT", "9") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.controller.fail_limit, 9);
        unsafe { std::env::remove_var("ROVNAV_FAIL_LIMIT") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_cycle_period() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVNAV_CYCLE_PERIOD_MS", "fast") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.cycle_period_ms, 100);
        unsafe { std::env::remove_var("ROVNAV_CYCLE_PERIOD_MS") };
    }

    #[test]
    fn apply_env_overrides_sets_filters_dir() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVNAV_FILTERS_DIR", "/opt/rovnav/filters") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.filters_dir, Some(PathBuf::from("/opt/rovnav/filters")));
        unsafe { std::env::remove_var("ROVNAV_FILTERS_DIR") };
    }
}
