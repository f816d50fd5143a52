#![allow(dead_code)]

use wrapngo::config::{
    ConfigFile, DynamicValue, GeneralSettings, OperationConfig, RawConfigFile, TaskConfig,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.tasks.push(task);
        self
    }

    pub fn with_global_dynamic(mut self, key: &str, value: impl Into<DynamicValue>) -> Self {
        self.config.global_dynamic.insert_if_absent(key, value.into());
        self
    }

    pub fn with_global_command(mut self, cmd: &str) -> Self {
        self.config.general_settings.global_command = cmd.to_string();
        self
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.config.general_settings.date_format = format.to_string();
        self
    }

    pub fn with_argument_escape(mut self, escape: &str) -> Self {
        self.config.general_settings.argument_escape = escape.to_string();
        self
    }

    pub fn case_sensitive_task_names(mut self, val: bool) -> Self {
        self.config.general_settings.case_sensitive_task_names = val;
        self
    }

    pub fn general(&self) -> &GeneralSettings {
        &self.config.general_settings
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str, cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                name: name.to_string(),
                command: cmd.to_string(),
                ..TaskConfig::default()
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.arguments.push(arg.to_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.task.arguments.extend(args.iter().map(|a| a.to_string()));
        self
    }

    pub fn dynamic(mut self, key: &str, value: impl Into<DynamicValue>) -> Self {
        self.task.dynamic.insert_if_absent(key, value.into());
        self
    }

    pub fn stop_if_unsuccessful(mut self, val: bool) -> Self {
        self.task.stop_if_unsuccessful = val;
        self
    }

    pub fn parallel(mut self, val: bool) -> Self {
        self.task.allow_parallel_operations_run = val;
        self
    }

    pub fn compress_before(mut self, path: &str, overwrite: bool) -> Self {
        self.task.compress_path_to_tar_before_hand = path.to_string();
        self.task.overwrite_compressed = overwrite;
        self
    }

    pub fn remove_after(mut self, path: &str) -> Self {
        self.task.remove_path_after_job_completes = path.to_string();
        self
    }

    pub fn pre(mut self, op: OperationConfig) -> Self {
        self.task.pre_operations.push(op);
        self
    }

    pub fn post(mut self, op: OperationConfig) -> Self {
        self.task.post_operations.push(op);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `OperationConfig`. Enabled, tolerant and captured by default.
pub struct OperationBuilder {
    op: OperationConfig,
}

impl OperationBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            op: OperationConfig {
                enabled: true,
                stop_if_unsuccessful: false,
                seconds_until_timeout: 0,
                ignore_timeout: false,
                capture_std_out: true,
                command: cmd.to_string(),
                arguments: vec![],
                split_arguments: false,
            },
        }
    }

    /// `sh -c <script>`.
    pub fn shell(script: &str) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.op.arguments.push(arg.to_string());
        self
    }

    pub fn enabled(mut self, val: bool) -> Self {
        self.op.enabled = val;
        self
    }

    pub fn stop_if_unsuccessful(mut self, val: bool) -> Self {
        self.op.stop_if_unsuccessful = val;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.op.seconds_until_timeout = secs;
        self
    }

    pub fn ignore_timeout(mut self, val: bool) -> Self {
        self.op.ignore_timeout = val;
        self
    }

    pub fn capture(mut self, val: bool) -> Self {
        self.op.capture_std_out = val;
        self
    }

    pub fn split_arguments(mut self, val: bool) -> Self {
        self.op.split_arguments = val;
        self
    }

    pub fn build(self) -> OperationConfig {
        self.op
    }
}
