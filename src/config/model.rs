// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single configuration source as read from disk (TOML or JSON).
///
/// ```toml
/// [GeneralSettings]
/// GlobalCommand = "rclone"
/// DateFormat = "YYYY-MM-DD_hh-mm-ss"
///
/// [GlobalDynamic]
/// Env = "prod"
///
/// [[Tasks]]
/// Name = "backup"
/// Command = "cp"
/// Arguments = ["%Dynamic.Source%", "%Dynamic.Destination%"]
///
/// [Tasks.Dynamic]
/// Source = "/a"
/// Destination = "/b"
/// ```
///
/// All sections are optional. Several sources are merged into a
/// [`ConfigFile`] by the loader.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawConfigFile {
    #[serde(default)]
    pub general_settings: GeneralSettings,

    #[serde(default)]
    pub global_dynamic: DynamicMap,

    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// Merged and validated configuration.
///
/// Only constructible through validation (`TryFrom<RawConfigFile>`) or the
/// loader, so everything downstream can rely on the checks in
/// [`crate::config::validate`]. Immutable once built and shared by `Arc`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    general: GeneralSettings,
    global_dynamic: DynamicMap,
    tasks: Vec<TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        general: GeneralSettings,
        global_dynamic: DynamicMap,
        tasks: Vec<TaskConfig>,
    ) -> Self {
        Self {
            general,
            global_dynamic,
            tasks,
        }
    }

    pub fn general(&self) -> &GeneralSettings {
        &self.general
    }

    pub fn global_dynamic(&self) -> &DynamicMap {
        &self.global_dynamic
    }

    pub fn tasks(&self) -> &[TaskConfig] {
        &self.tasks
    }

    /// All tasks whose name matches `name`.
    ///
    /// Matching follows `CaseSensitiveTaskNames`; this is independent of the
    /// placeholder key rules, which are always case-insensitive.
    pub fn tasks_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TaskConfig> + 'a {
        let case_sensitive = self.general.case_sensitive_task_names;
        self.tasks.iter().filter(move |t| {
            if case_sensitive {
                t.name == name
            } else {
                t.name.to_lowercase() == name.to_lowercase()
            }
        })
    }
}

/// `[GeneralSettings]` section. Only read from the main config source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneralSettings {
    /// Program used for the job when a task has no `Command` of its own.
    #[serde(default)]
    pub global_command: String,

    /// Raise the default log level to debug.
    #[serde(default)]
    pub debug: bool,

    #[serde(default, alias = "CaseSensitiveJobNames")]
    pub case_sensitive_task_names: bool,

    /// Format used for bare `%Date%` placeholders. Empty disables them.
    #[serde(default)]
    pub date_format: String,

    /// Escape sequence that keeps a space inside a job argument.
    #[serde(default = "default_argument_escape")]
    pub argument_escape: String,
}

pub fn default_argument_escape() -> String {
    "\\".to_string()
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            global_command: String::new(),
            debug: false,
            case_sensitive_task_names: false,
            date_format: String::new(),
            argument_escape: default_argument_escape(),
        }
    }
}

/// `[[Tasks]]` entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskConfig {
    pub name: String,

    /// Job program. Falls back to `GlobalCommand` when empty.
    #[serde(default)]
    pub command: String,

    /// Job argument templates. Each entry may expand to several arguments.
    #[serde(default)]
    pub arguments: Vec<String>,

    #[serde(default)]
    pub stop_if_unsuccessful: bool,

    /// Path archived to `.tar.gz` before the job starts. Empty disables it.
    #[serde(default)]
    pub compress_path_to_tar_before_hand: String,

    #[serde(default)]
    pub overwrite_compressed: bool,

    /// Path removed once the job has finished. Empty disables it.
    #[serde(default)]
    pub remove_path_after_job_completes: String,

    /// Run enabled pre-operations concurrently with each other and the job.
    #[serde(default)]
    pub allow_parallel_operations_run: bool,

    /// Task-local placeholder values, used as `%Dynamic.<key>%`.
    #[serde(default)]
    pub dynamic: DynamicMap,

    #[serde(default)]
    pub pre_operations: Vec<OperationConfig>,

    #[serde(default)]
    pub post_operations: Vec<OperationConfig>,
}

impl TaskConfig {
    /// The program to launch for the job.
    pub fn job_command<'a>(&'a self, general: &'a GeneralSettings) -> &'a str {
        if self.command.is_empty() {
            &general.global_command
        } else {
            &self.command
        }
    }
}

/// `[[Tasks.PreOperations]]` / `[[Tasks.PostOperations]]` entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub stop_if_unsuccessful: bool,

    /// `0` means no timeout.
    #[serde(default)]
    pub seconds_until_timeout: u64,

    #[serde(default)]
    pub ignore_timeout: bool,

    #[serde(default)]
    pub capture_std_out: bool,

    /// Required only while the operation is enabled.
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub arguments: Vec<String>,

    /// Split each argument on unescaped spaces like job arguments.
    /// By default every configured entry is passed as exactly one argument.
    #[serde(default)]
    pub split_arguments: bool,
}

impl OperationConfig {
    /// Effective timeout, honouring `IgnoreTimeout`.
    pub fn timeout(&self) -> Option<std::time::Duration> {
        if self.seconds_until_timeout > 0 && !self.ignore_timeout {
            Some(std::time::Duration::from_secs(self.seconds_until_timeout))
        } else {
            None
        }
    }
}

/// Scalar value allowed in `Dynamic` / `GlobalDynamic` maps.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Bool(b) => write!(f, "{b}"),
            DynamicValue::Int(i) => write!(f, "{i}"),
            DynamicValue::Float(x) => write!(f, "{x}"),
            DynamicValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::Str(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::Str(s)
    }
}

/// Key/value map backing `%Dynamic.<key>%` and `%GlobalDynamic.<key>%`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DynamicMap(BTreeMap<String, DynamicValue>);

impl DynamicMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the exact key is already present.
    ///
    /// Returns `false` (and leaves the existing value) for a duplicate.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: DynamicValue) -> bool {
        use std::collections::btree_map::Entry;
        match self.0.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Placeholder lookup: key comparison ignores case.
    pub fn lookup(&self, key: &str) -> Option<&DynamicValue> {
        if let Some(v) = self.0.get(key) {
            return Some(v);
        }
        let wanted = key.to_lowercase();
        self.0
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| v)
    }

    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DynamicValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<DynamicValue>> FromIterator<(K, V)> for DynamicMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
