use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

/// Config files picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILES: [&str; 2] =
    ["mqtt-load-generator.toml", "mqtt-load-generator.json"];

/// Loads the config file named by `--config`, or the first default file found.
///
/// # Errors
///
/// Returns an error when the config file cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> AppResult<Option<ConfigFile>> {
    if let Some(path) = path {
        return load_config_file(Path::new(path)).map(Some);
    }

    DEFAULT_CONFIG_FILES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
        .map(|candidate| load_config_file(&candidate))
        .transpose()
}

pub(crate) fn load_config_file(path: &Path) -> AppResult<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    parse_config(path, &content)
}

pub(crate) fn parse_config(path: &Path, content: &str) -> AppResult<ConfigFile> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some("json") => serde_json::from_str(content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some(ext) => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: ext.to_owned(),
        })),
        None => Err(AppError::config(ConfigError::MissingExtension)),
    }
}
