// src/config/defaults.rs

//! Starter configuration written by `wrapngo --init`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::config::loader::MAIN_CONFIG_STEM;
use crate::config::model::{
    DynamicMap, GeneralSettings, OperationConfig, RawConfigFile, TaskConfig,
};
use crate::errors::Result;

fn placeholder(key: &str) -> String {
    format!("%{key}%")
}

fn example_operation(command: &str) -> OperationConfig {
    OperationConfig {
        enabled: false,
        stop_if_unsuccessful: true,
        seconds_until_timeout: 3,
        ignore_timeout: false,
        capture_std_out: true,
        command: command.to_string(),
        arguments: vec![
            format!("StartedAt: {}", placeholder("Date")),
            format!("Command: {}", placeholder("Command")),
            format!("Source: {}", placeholder("Dynamic.Source")),
            format!("Destination: {}", placeholder("Dynamic.Destination")),
        ],
        split_arguments: false,
    }
}

/// The configuration a fresh install starts from.
pub fn default_config() -> RawConfigFile {
    let global_dynamic: DynamicMap = [(
        "Description",
        "Global placeholders, used as %GlobalDynamic.<Key>%.",
    )]
    .into_iter()
    .collect();

    let dynamic: DynamicMap = [
        (
            "Description",
            "Task placeholders, used as %Dynamic.<Key>%.",
        ),
        ("Source", "Some/Source/Path"),
        ("Destination", "Some/Destination/Path"),
    ]
    .into_iter()
    .collect();

    RawConfigFile {
        general_settings: GeneralSettings {
            global_command: "your-program-to-wrap".to_string(),
            date_format: "YYYY-MM-DD_hh-mm-ss".to_string(),
            ..GeneralSettings::default()
        },
        global_dynamic,
        tasks: vec![TaskConfig {
            name: "ShortNameOfTask".to_string(),
            command: "Binary/command".to_string(),
            stop_if_unsuccessful: true,
            dynamic,
            arguments: vec![
                "-P".to_string(),
                "--retries 5".to_string(),
                "--transfers 3".to_string(),
            ],
            pre_operations: vec![example_operation("run-before-the-job")],
            post_operations: vec![example_operation("run-after-the-job")],
            ..TaskConfig::default()
        }],
    }
}

/// Comment block written above the generated settings.
const DEFAULT_CONFIG_HEADER: &str = "\
# wrapngo configuration
#
# Every *.toml, *.json and *.yaml file next to this one adds more [[Tasks]];
# only this file's [GeneralSettings] are read.
#
# Arguments may use %Date%, %Date(<format>)%, %Env(<name>)%, %<TaskField>%,
# %Dynamic.<key>% and %GlobalDynamic.<key>% placeholders.
# ArgumentEscape keeps a space inside a single job argument.
#
# Run `wrapngo --dry-run <TASK>` to print the resolved command lines.

";

/// Write [`default_config`] as a commented `config.toml` into `dir`.
///
/// Returns `Ok(None)` when a main config already exists and `overwrite` is
/// false.
pub fn write_default_config(dir: &Path, overwrite: bool) -> Result<Option<PathBuf>> {
    let path = dir.join(format!("{MAIN_CONFIG_STEM}.toml"));
    if path.exists() && !overwrite {
        return Ok(None);
    }

    fs::create_dir_all(dir).with_context(|| format!("creating config dir {:?}", dir))?;
    let contents = toml::to_string_pretty(&default_config())
        .context("serialising default config")?;
    let contents = format!("{DEFAULT_CONFIG_HEADER}{contents}");
    fs::write(&path, contents).with_context(|| format!("writing config file {:?}", path))?;

    info!(path = %path.display(), "default config written");
    Ok(Some(path))
}
