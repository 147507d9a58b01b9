use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::UtcOffset;
use time::macros::format_description;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "REMIND_CONFIG_PATH";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Zone every timestamp is stored and compared in, e.g. `"-05:00"`.
    #[serde(default)]
    pub utc_offset: Option<String>,
    #[serde(default)]
    pub desktop_notifications: bool,
}

impl Config {
    pub fn offset(&self) -> Result<Option<UtcOffset>, AppError> {
        self.utc_offset.as_deref().map(parse_utc_offset).transpose()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub store_path: Option<PathBuf>,
    pub utc_offset: Option<String>,
    pub desktop_notifications: Option<bool>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("remindbot")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("remindbot")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.offset()?;
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(path) = overrides.store_path.as_ref() {
        merged.store_path = Some(path.clone());
    }
    if let Some(offset) = overrides.utc_offset.as_ref() {
        merged.utc_offset = Some(offset.clone());
    }
    if let Some(enabled) = overrides.desktop_notifications {
        merged.desktop_notifications = enabled;
    }
    merged
}

pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, AppError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }

    UtcOffset::parse(
        trimmed,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| {
        AppError::invalid_data(format!(
            "utc_offset must look like +05:00 or -04:30, got '{trimmed}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, load_config_from_path, load_config_with_fallback_from_path,
        merge_overrides, parse_utc_offset,
    };
    use std::fs;
    use std::path::PathBuf;
    use time::UtcOffset;

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_with_fallback_from_path(&dir.path().join("missing.json"));

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn load_config_reads_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valid-config.json");
        let content = serde_json::json!({
            "store_path": "/tmp/remind/tasks.json",
            "utc_offset": "-05:00",
            "desktop_notifications": true
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();

        assert_eq!(
            loaded.store_path,
            Some(PathBuf::from("/tmp/remind/tasks.json"))
        );
        assert_eq!(
            loaded.offset().unwrap(),
            Some(UtcOffset::from_hms(-5, 0, 0).unwrap())
        );
        assert!(loaded.desktop_notifications);
    }

    #[test]
    fn load_config_rejects_bad_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad-offset.json");
        fs::write(&path, r#"{"utc_offset": "eastern"}"#).unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            store_path: Some(PathBuf::from("a.json")),
            utc_offset: Some("+01:00".into()),
            desktop_notifications: false,
        };
        let overrides = ConfigOverrides {
            utc_offset: Some("+02:00".into()),
            desktop_notifications: Some(true),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.store_path, Some(PathBuf::from("a.json")));
        assert_eq!(merged.utc_offset.as_deref(), Some("+02:00"));
        assert!(merged.desktop_notifications);
        assert_eq!(base.utc_offset.as_deref(), Some("+01:00"));
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            store_path: None,
            utc_offset: Some("+01:00".into()),
            desktop_notifications: true,
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn parse_utc_offset_accepts_common_forms() {
        assert_eq!(parse_utc_offset("Z").unwrap(), UtcOffset::UTC);
        assert_eq!(parse_utc_offset("utc").unwrap(), UtcOffset::UTC);
        assert_eq!(
            parse_utc_offset(" +05:30 ").unwrap(),
            UtcOffset::from_hms(5, 30, 0).unwrap()
        );
        assert!(parse_utc_offset("5").is_err());
    }
}
