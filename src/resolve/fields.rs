// src/resolve/fields.rs

//! `%<FieldName>%` placeholders backed by an explicit field table.

use crate::config::TaskConfig;

/// One task field usable as a placeholder.
#[derive(Debug, Clone, Copy)]
pub struct TaskField {
    /// Name as written in the config file (and inside `%...%`).
    pub name: &'static str,
    pub value: fn(&TaskConfig) -> String,
}

/// Scalar task fields, in substitution order.
///
/// `Dynamic`, `PreOperations` and `PostOperations` are not listed: the
/// dynamic map has its own `%Dynamic.<key>%` syntax and operations have no
/// sensible string form.
pub const TASK_FIELDS: &[TaskField] = &[
    TaskField {
        name: "Name",
        value: |t| t.name.clone(),
    },
    TaskField {
        name: "Command",
        value: |t| t.command.clone(),
    },
    TaskField {
        name: "Arguments",
        value: |t| t.arguments.join(" "),
    },
    TaskField {
        name: "StopIfUnsuccessful",
        value: |t| t.stop_if_unsuccessful.to_string(),
    },
    TaskField {
        name: "CompressPathToTarBeforeHand",
        value: |t| t.compress_path_to_tar_before_hand.clone(),
    },
    TaskField {
        name: "OverwriteCompressed",
        value: |t| t.overwrite_compressed.to_string(),
    },
    TaskField {
        name: "RemovePathAfterJobCompletes",
        value: |t| t.remove_path_after_job_completes.clone(),
    },
    TaskField {
        name: "AllowParallelOperationsRun",
        value: |t| t.allow_parallel_operations_run.to_string(),
    },
];
