// src/config/validate.rs

use crate::config::model::{ConfigFile, OperationConfig, RawConfigFile};
use crate::errors::{Result, WrapError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WrapError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.general_settings,
            raw.global_dynamic,
            raw.tasks,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_general_settings(cfg)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn validate_general_settings(cfg: &RawConfigFile) -> Result<()> {
    let escape = &cfg.general_settings.argument_escape;
    if escape.is_empty() {
        return Err(WrapError::ConfigError(
            "[GeneralSettings].ArgumentEscape must not be empty".to_string(),
        ));
    }
    if escape.contains(' ') {
        return Err(WrapError::ConfigError(format!(
            "[GeneralSettings].ArgumentEscape must not contain a space (got {escape:?})"
        )));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (idx, task) in cfg.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(WrapError::ConfigError(format!(
                "task #{} has an empty Name",
                idx + 1
            )));
        }

        if task.command.is_empty() && cfg.general_settings.global_command.is_empty() {
            return Err(WrapError::ConfigError(format!(
                "task '{}' has no Command and [GeneralSettings].GlobalCommand is empty",
                task.name
            )));
        }

        validate_operations(&task.name, "PreOperations", &task.pre_operations)?;
        validate_operations(&task.name, "PostOperations", &task.post_operations)?;
    }
    Ok(())
}

fn validate_operations(task: &str, kind: &str, ops: &[OperationConfig]) -> Result<()> {
    for (idx, op) in ops.iter().enumerate() {
        if op.enabled && op.command.trim().is_empty() {
            return Err(WrapError::ConfigError(format!(
                "task '{}' {} #{} is enabled but has no Command",
                task,
                kind,
                idx + 1
            )));
        }
    }
    Ok(())
}
