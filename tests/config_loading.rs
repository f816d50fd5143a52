// tests/config_loading.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, OperationBuilder, TaskConfigBuilder};
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::time::Duration;

use wrapngo::config::{
    load_and_validate, load_dir, write_default_config, ConfigFile, DynamicValue,
};
use wrapngo::errors::WrapError;

type TestResult = Result<(), Box<dyn Error>>;

const MAIN_TOML: &str = r#"
[GeneralSettings]
GlobalCommand = "rclone"
DateFormat = "YYYY-MM-DD"

[GlobalDynamic]
Env = "prod"

[[Tasks]]
Name = "backup"
Command = "cp"
Arguments = ["%Dynamic.Source%", "%Dynamic.Destination%"]

[Tasks.Dynamic]
Source = "/a"
Destination = "/b"
"#;

#[test]
fn duplicate_global_dynamic_keys_keep_the_first_loaded_value() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    fs::write(dir.path().join("config.toml"), MAIN_TOML)?;
    // Sorts before the main file but is still loaded after it.
    fs::write(
        dir.path().join("00-extra.toml"),
        r#"
[GeneralSettings]
GlobalCommand = "ignored"

[GlobalDynamic]
Env = "staging"
Region = "eu"

[[Tasks]]
Name = "sync"
"#,
    )?;
    fs::write(
        dir.path().join("zz-more.json"),
        r#"{ "GlobalDynamic": { "Env": "dev", "Region": "us", "Retries": 3 },
             "Tasks": [ { "Name": "report", "Command": "echo" } ] }"#,
    )?;
    fs::write(dir.path().join("notes.txt"), "not a config")?;

    let cfg = load_dir(dir.path())?;

    let globals = cfg.global_dynamic();
    assert_eq!(globals.get("Env"), Some(&DynamicValue::from("prod")));
    assert_eq!(globals.get("Region"), Some(&DynamicValue::from("eu")));
    assert_eq!(globals.get("Retries"), Some(&DynamicValue::Int(3)));

    assert_eq!(cfg.general().global_command, "rclone");
    let names: Vec<&str> = cfg.tasks().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["backup", "sync", "report"]);
    Ok(())
}

#[test]
fn directory_without_main_file_uses_default_settings() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("tasks.toml"),
        "[[Tasks]]\nName = \"t\"\nCommand = \"echo\"\n",
    )?;

    let cfg = load_dir(dir.path())?;

    assert_eq!(cfg.general().argument_escape, "\\");
    assert!(cfg.general().global_command.is_empty());
    assert_eq!(cfg.tasks().len(), 1);
    Ok(())
}

#[test]
fn yaml_main_file_provides_the_general_settings() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("config.yaml"),
        "GeneralSettings:\n  GlobalCommand: rsync\n  Debug: true\nGlobalDynamic:\n  Retries: 2\n",
    )?;
    fs::write(
        dir.path().join("aa-tasks.yml"),
        "GeneralSettings:\n  GlobalCommand: ignored\nTasks:\n  - Name: mirror\n",
    )?;

    let cfg = load_dir(dir.path())?;

    assert_eq!(cfg.general().global_command, "rsync");
    assert!(cfg.general().debug);
    assert_eq!(cfg.global_dynamic().get("Retries"), Some(&DynamicValue::Int(2)));
    assert_eq!(cfg.tasks()[0].job_command(cfg.general()), "rsync");
    Ok(())
}

#[test]
fn broken_source_names_the_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("config.toml"), MAIN_TOML)?;
    fs::write(dir.path().join("broken.toml"), "[[Tasks]\nName = ")?;

    match load_dir(dir.path()) {
        Err(WrapError::ConfigError(msg)) => assert!(msg.contains("broken.toml"), "{msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn single_file_toml_json_and_yaml_parse_the_same_model() -> TestResult {
    let dir = tempfile::tempdir()?;
    let toml_path = dir.path().join("one.toml");
    fs::write(&toml_path, MAIN_TOML)?;
    let json_path = dir.path().join("one.json");
    fs::write(
        &json_path,
        r#"{
            "GeneralSettings": { "GlobalCommand": "rclone", "DateFormat": "YYYY-MM-DD" },
            "GlobalDynamic": { "Env": "prod" },
            "Tasks": [{
                "Name": "backup",
                "Command": "cp",
                "Arguments": ["%Dynamic.Source%", "%Dynamic.Destination%"],
                "Dynamic": { "Source": "/a", "Destination": "/b" }
            }]
        }"#,
    )?;

    let yaml_path = dir.path().join("one.yaml");
    fs::write(
        &yaml_path,
        r#"
GeneralSettings:
  GlobalCommand: rclone
  DateFormat: YYYY-MM-DD
GlobalDynamic:
  Env: prod
Tasks:
  - Name: backup
    Command: cp
    Arguments: ["%Dynamic.Source%", "%Dynamic.Destination%"]
    Dynamic:
      Source: /a
      Destination: /b
"#,
    )?;

    let from_toml = load_and_validate(&toml_path)?;
    let from_json = load_and_validate(&json_path)?;
    let from_yaml = load_and_validate(&yaml_path)?;

    for cfg in [&from_toml, &from_json, &from_yaml] {
        let task = &cfg.tasks()[0];
        assert_eq!(task.name, "backup");
        assert_eq!(task.arguments, vec!["%Dynamic.Source%", "%Dynamic.Destination%"]);
        assert_eq!(task.dynamic.get("Source"), Some(&DynamicValue::from("/a")));
        assert_eq!(cfg.general().date_format, "YYYY-MM-DD");
    }
    Ok(())
}

#[test]
fn operations_parse_with_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ops.toml");
    fs::write(
        &path,
        r#"
[[Tasks]]
Name = "t"
Command = "echo"
AllowParallelOperationsRun = true

[[Tasks.PreOperations]]
Enabled = true
Command = "notify-send"
SecondsUntilTimeout = 3
Arguments = ["starting %Name%"]

[[Tasks.PostOperations]]
Command = "never"
IgnoreTimeout = true
SecondsUntilTimeout = 10
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    let task = &cfg.tasks()[0];
    assert!(task.allow_parallel_operations_run);

    let pre = &task.pre_operations[0];
    assert!(pre.enabled && !pre.stop_if_unsuccessful && !pre.capture_std_out && !pre.split_arguments);
    assert_eq!(pre.timeout(), Some(Duration::from_secs(3)));

    let post = &task.post_operations[0];
    assert!(!post.enabled);
    assert_eq!(post.timeout(), None);
    Ok(())
}

#[test]
fn zero_seconds_means_no_timeout() {
    let op = OperationBuilder::new("true").timeout_secs(0).build();
    assert_eq!(op.timeout(), None);
}

#[test]
fn validation_rejects_incomplete_tasks() {
    let cases = [
        (
            ConfigFileBuilder::new().with_task(TaskConfigBuilder::new("  ", "echo").build()),
            "empty Name",
        ),
        (
            ConfigFileBuilder::new().with_task(TaskConfigBuilder::new("t", "").build()),
            "GlobalCommand",
        ),
        (
            ConfigFileBuilder::new().with_task(
                TaskConfigBuilder::new("t", "echo")
                    .post(OperationBuilder::new(" ").build())
                    .build(),
            ),
            "PostOperations #1",
        ),
        (
            ConfigFileBuilder::new()
                .with_argument_escape("\\ ")
                .with_task(TaskConfigBuilder::new("t", "echo").build()),
            "ArgumentEscape",
        ),
        (
            ConfigFileBuilder::new()
                .with_argument_escape("")
                .with_task(TaskConfigBuilder::new("t", "echo").build()),
            "ArgumentEscape",
        ),
    ];

    for (builder, needle) in cases {
        match ConfigFile::try_from(builder.raw()) {
            Err(WrapError::ConfigError(msg)) => assert!(msg.contains(needle), "{msg} !~ {needle}"),
            other => panic!("expected config error mentioning {needle}, got {other:?}"),
        }
    }
}

#[test]
fn disabled_operations_may_omit_their_command() {
    let raw = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("t", "echo")
                .pre(OperationBuilder::new("").enabled(false).build())
                .build(),
        )
        .raw();
    assert!(ConfigFile::try_from(raw).is_ok());
}

#[test]
fn disabled_operation_without_command_loads_from_a_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[[Tasks]]
Name = "t"
Command = "echo"

[[Tasks.PreOperations]]
Enabled = false
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    let op = &cfg.tasks()[0].pre_operations[0];
    assert!(!op.enabled);
    assert!(op.command.is_empty());
    Ok(())
}

#[test]
fn global_command_satisfies_tasks_without_command() {
    let cfg = ConfigFileBuilder::new()
        .with_global_command("rclone")
        .with_task(TaskConfigBuilder::new("t", "").build())
        .build();
    let task = &cfg.tasks()[0];
    assert_eq!(task.job_command(cfg.general()), "rclone");
}

#[test]
fn task_name_matching_follows_the_case_setting() {
    let insensitive = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("Backup", "cp").build())
        .build();
    assert_eq!(insensitive.tasks_named("bACKUP").count(), 1);

    let sensitive = ConfigFileBuilder::new()
        .case_sensitive_task_names(true)
        .with_task(TaskConfigBuilder::new("Backup", "cp").build())
        .build();
    assert_eq!(sensitive.tasks_named("backup").count(), 0);
    assert_eq!(sensitive.tasks_named("Backup").count(), 1);
}

#[test]
fn case_sensitive_job_names_is_accepted_as_an_alias() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{ "GeneralSettings": { "CaseSensitiveJobNames": true },
             "Tasks": [ { "Name": "Backup", "Command": "cp" } ] }"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert!(cfg.general().case_sensitive_task_names);
    assert_eq!(cfg.tasks_named("backup").count(), 0);
    Ok(())
}

#[test]
fn default_config_round_trips_through_the_loader() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let written = write_default_config(dir.path(), false)?.expect("fresh dir gets a config");
    assert_eq!(written, dir.path().join("config.toml"));
    assert!(write_default_config(dir.path(), false)?.is_none());
    assert!(write_default_config(dir.path(), true)?.is_some());

    let text = fs::read_to_string(&written)?;
    assert!(text.starts_with("# wrapngo configuration"), "{text}");
    assert!(text.contains("%GlobalDynamic.<key>%"));

    let cfg = load_dir(dir.path())?;
    let task = &cfg.tasks()[0];
    assert_eq!(task.name, "ShortNameOfTask");
    assert_eq!(task.pre_operations.len(), 1);
    assert!(!task.pre_operations[0].enabled);
    assert_eq!(cfg.general().date_format, "YYYY-MM-DD_hh-mm-ss");
    assert!(cfg.global_dynamic().get("Description").is_some());
    Ok(())
}
