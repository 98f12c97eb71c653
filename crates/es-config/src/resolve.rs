//! Config file resolution.
//!
//! Order: explicit `--config` path (must exist) → `<config dir>/enviro-station/station.toml`
//! when present → built-in defaults. The result is always validated.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::station::StationConfig;
use crate::validate::{validate, ValidationError, ValidationResult};
use crate::CONFIG_FILE_NAME;

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    UserDir(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::UserDir(p) => write!(f, "{}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// A loaded, validated configuration and its origin.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: StationConfig,
    pub source: ConfigSource,
}

/// Default per-user config location.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("enviro-station").join(CONFIG_FILE_NAME))
}

/// Resolve, load, and validate the station configuration.
pub fn resolve_config(explicit: Option<&Path>) -> ValidationResult<ResolvedConfig> {
    resolve_with_user_path(explicit, user_config_path().as_deref())
}

fn resolve_with_user_path(
    explicit: Option<&Path>,
    user_path: Option<&Path>,
) -> ValidationResult<ResolvedConfig> {
    let (config, source) = match (explicit, user_path) {
        (Some(path), _) => {
            if !path.exists() {
                return Err(ValidationError::NotFound(path.to_path_buf()));
            }
            (
                StationConfig::from_file(path)?,
                ConfigSource::Explicit(path.to_path_buf()),
            )
        }
        (None, Some(path)) if path.is_file() => (
            StationConfig::from_file(path)?,
            ConfigSource::UserDir(path.to_path_buf()),
        ),
        _ => {
            debug!("no config file found, using defaults");
            (StationConfig::default(), ConfigSource::Defaults)
        }
    };

    validate(&config)?;
    info!(source = %source, station = %config.station_id, "configuration loaded");
    Ok(ResolvedConfig { config, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn explicit_path_wins() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let user = dir.path().join("user.toml");
        fs::write(&explicit, "station_id = \"07\"").unwrap();
        fs::write(&user, "station_id = \"08\"").unwrap();

        let resolved = resolve_with_user_path(Some(&explicit), Some(&user)).unwrap();
        assert_eq!(resolved.config.station_id, "07");
        assert_eq!(resolved.source, ConfigSource::Explicit(explicit));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = resolve_with_user_path(Some(&missing), None).unwrap_err();
        assert!(matches!(err, ValidationError::NotFound(p) if p == missing));
    }

    #[test]
    fn user_dir_used_when_present() {
        let dir = tempdir().unwrap();
        let user = dir.path().join("station.toml");
        fs::write(&user, "station_id = \"08\"").unwrap();
        let resolved = resolve_with_user_path(None, Some(&user)).unwrap();
        assert_eq!(resolved.config.station_id, "08");
        assert!(matches!(resolved.source, ConfigSource::UserDir(_)));
    }

    #[test]
    fn falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let absent = dir.path().join("station.toml");
        let resolved = resolve_with_user_path(None, Some(&absent)).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, StationConfig::default());
    }

    #[test]
    fn loaded_config_is_validated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[sampling]\nalignment_secs = 0\n").unwrap();
        let err = resolve_with_user_path(Some(&path), None).unwrap_err();
        assert!(matches!(err, ValidationError::Invalid(_)));
    }
}
