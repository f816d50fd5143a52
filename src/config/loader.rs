// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::model::{ConfigFile, DynamicMap, GeneralSettings, RawConfigFile};
use crate::errors::{Result, WrapError};

/// Base name of the main config file inside the config directory.
pub const MAIN_CONFIG_STEM: &str = "config";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "WRAPNGO_CONFIG_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Toml,
    Json,
    Yaml,
}

fn source_format(path: &Path) -> Option<SourceFormat> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "toml" => Some(SourceFormat::Toml),
        "json" => Some(SourceFormat::Json),
        "yaml" | "yml" => Some(SourceFormat::Yaml),
        _ => None,
    }
}

/// Load a single configuration source and return the raw `RawConfigFile`.
///
/// The format is picked from the extension (`.json` → JSON, `.yaml` / `.yml`
/// → YAML, anything else → TOML). No semantic validation happens here.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = match source_format(path) {
        Some(SourceFormat::Json) => serde_json::from_str(&contents)?,
        Some(SourceFormat::Yaml) => serde_yaml::from_str(&contents)?,
        _ => toml::from_str(&contents)?,
    };

    Ok(config)
}

/// Load exactly one file as the complete configuration.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// A loaded source together with whether it is the main config file.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub is_main: bool,
    pub raw: RawConfigFile,
}

/// Load every `*.toml` / `*.json` / `*.yaml` file in `dir` and merge them.
///
/// The main file (`config.toml`, `config.json` or `config.yaml`) is loaded
/// first and is the only source whose `[GeneralSettings]` are used. The
/// remaining files follow in lexical order.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<ConfigFile> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && source_format(p).is_some())
        .collect();
    paths.sort();

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let is_main = is_main_config(&path);
        let raw = load_from_path(&path).map_err(|e| {
            WrapError::ConfigError(format!("unable to load {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), is_main, tasks = raw.tasks.len(), "loaded config source");
        sources.push(ConfigSource { path, is_main, raw });
    }

    // Main source first, the rest keep their lexical order.
    sources.sort_by_key(|s| !s.is_main);

    if !sources.iter().any(|s| s.is_main) {
        warn!(
            dir = %dir.display(),
            "main config could not be found, please ensure 'config.toml', 'config.json' or 'config.yaml' is available"
        );
    }

    merge_sources(sources)
}

fn is_main_config(path: &Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some(MAIN_CONFIG_STEM)
}

/// Merge already-loaded sources in the given order and validate the result.
///
/// - Tasks are appended in source order.
/// - `GlobalDynamic` keys are first-write-wins: a duplicate key from a later
///   source is dropped with a warning.
/// - `[GeneralSettings]` comes from the first source flagged as main.
pub fn merge_sources(sources: impl IntoIterator<Item = ConfigSource>) -> Result<ConfigFile> {
    let mut general: Option<GeneralSettings> = None;
    let mut global_dynamic = DynamicMap::new();
    let mut tasks = Vec::new();

    for source in sources {
        let ConfigSource { path, is_main, raw } = source;

        for (key, value) in raw.global_dynamic.iter() {
            if !global_dynamic.insert_if_absent(key.clone(), value.clone()) {
                warn!(
                    key = %key,
                    source = %path.display(),
                    "GlobalDynamic '{}' has already been set, skipping",
                    key
                );
            }
        }

        tasks.extend(raw.tasks);

        if is_main && general.is_none() {
            general = Some(raw.general_settings);
        }
    }

    let merged = RawConfigFile {
        general_settings: general.unwrap_or_default(),
        global_dynamic,
        tasks,
    };

    let config = ConfigFile::try_from(merged)?;
    info!(
        tasks = config.tasks().len(),
        global_dynamic = config.global_dynamic().len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Resolve the config directory.
///
/// Priority: explicit value, then `WRAPNGO_CONFIG_DIR`, then
/// `<user config dir>/wrapngo`.
pub fn default_config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let base = dirs::config_dir().ok_or_else(|| {
        WrapError::ConfigError("unable to determine the user config directory".to_string())
    })?;
    Ok(base.join("wrapngo"))
}
