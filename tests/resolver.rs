// tests/resolver.rs

mod common;
use crate::common::builders::TaskConfigBuilder;

use chrono::{DateTime, FixedOffset, TimeZone, Timelike};
use proptest::prelude::*;

use wrapngo::config::{DynamicMap, DynamicValue};
use wrapngo::resolve::{format_date, Resolver};
use wrapngo::tokenize::split_all;

/// Tuesday 2024-03-05 14:07:09.123 UTC.
fn fixed_now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 5, 14, 7, 9)
        .unwrap()
        .with_nanosecond(123_000_000)
        .unwrap()
}

fn global(pairs: &[(&str, &str)]) -> DynamicMap {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

#[test]
fn backup_task_resolves_dynamic_arguments() {
    let task = TaskConfigBuilder::new("backup", "cp")
        .args(&["%Dynamic.Source%", "%Dynamic.Destination%"])
        .dynamic("Source", "/a")
        .dynamic("Destination", "/b")
        .build();
    let globals = DynamicMap::new();

    let resolver = Resolver::new(&task, &globals, "");
    assert_eq!(resolver.resolve_all(&task.arguments), vec!["/a", "/b"]);
}

#[test]
fn global_dynamic_is_substituted_inside_text() {
    let task = TaskConfigBuilder::new("deploy", "echo").build();
    let globals = global(&[("Env", "prod")]);

    let resolver = Resolver::new(&task, &globals, "");
    assert_eq!(resolver.resolve("%GlobalDynamic.Env%-deploy"), "prod-deploy");
}

#[test]
fn placeholder_names_and_keys_ignore_case() {
    let task = TaskConfigBuilder::new("deploy", "echo")
        .dynamic("Source", "/src")
        .build();
    let globals = global(&[("Env", "prod")]);

    let resolver = Resolver::new(&task, &globals, "");
    assert_eq!(resolver.resolve("%dynamic.SOURCE%"), "/src");
    assert_eq!(resolver.resolve("%GLOBALDYNAMIC.env%"), "prod");
    assert_eq!(resolver.resolve("%name%/%COMMAND%"), "deploy/echo");
}

#[test]
fn unknown_placeholders_are_left_verbatim() {
    let task = TaskConfigBuilder::new("t", "echo").build();
    let globals = DynamicMap::new();
    let resolver = Resolver::new(&task, &globals, "");

    for input in [
        "%Dynamic.Missing%",
        "%GlobalDynamic.Missing%",
        "%NotAField%",
        "100% sure",
        "%Date%",
    ] {
        assert_eq!(resolver.resolve(input), input);
    }
}

#[test]
fn every_occurrence_is_replaced() {
    let task = TaskConfigBuilder::new("t", "echo").dynamic("X", "1").build();
    let globals = DynamicMap::new();
    let resolver = Resolver::new(&task, &globals, "");

    assert_eq!(resolver.resolve("%Dynamic.X%-%Dynamic.X%-%dynamic.x%"), "1-1-1");
}

#[test]
fn task_fields_are_stringified() {
    let task = TaskConfigBuilder::new("sync", "rclone")
        .args(&["copy", "-P"])
        .stop_if_unsuccessful(true)
        .remove_after("/tmp/stage")
        .build();
    let globals = DynamicMap::new();
    let resolver = Resolver::new(&task, &globals, "");

    assert_eq!(resolver.resolve("%Arguments%"), "copy -P");
    assert_eq!(resolver.resolve("%StopIfUnsuccessful%"), "true");
    assert_eq!(resolver.resolve("%AllowParallelOperationsRun%"), "false");
    assert_eq!(resolver.resolve("%RemovePathAfterJobCompletes%"), "/tmp/stage");
    assert_eq!(resolver.resolve("[%CompressPathToTarBeforeHand%]"), "[]");
}

#[test]
fn non_string_dynamic_values_are_stringified() {
    let task = TaskConfigBuilder::new("t", "echo")
        .dynamic("Retries", DynamicValue::Int(5))
        .dynamic("Verbose", DynamicValue::Bool(true))
        .build();
    let globals = DynamicMap::new();
    let resolver = Resolver::new(&task, &globals, "");

    assert_eq!(resolver.resolve("--retries=%Dynamic.Retries% -v=%Dynamic.Verbose%"), "--retries=5 -v=true");
}

#[test]
fn later_passes_see_earlier_output() {
    // Dynamic runs before GlobalDynamic, so a task value may reference a
    // global one but not the other way around.
    let task = TaskConfigBuilder::new("t", "echo")
        .dynamic("Target", "%GlobalDynamic.Env%-eu")
        .build();
    let env = global(&[("Env", "prod")]);
    let resolver = Resolver::new(&task, &env, "");
    assert_eq!(resolver.resolve("%Dynamic.Target%"), "prod-eu");

    let back = global(&[("Back", "%Dynamic.Target%")]);
    let resolver = Resolver::new(&task, &back, "");
    assert_eq!(resolver.resolve("%GlobalDynamic.Back%"), "%Dynamic.Target%");
}

#[test]
fn env_placeholder_reads_environment() {
    // SAFETY: the variable name is unique to this test.
    unsafe { std::env::set_var("WRAPNGO_RESOLVER_TEST_VAR", "from-env") };

    let task = TaskConfigBuilder::new("t", "echo").build();
    let globals = DynamicMap::new();
    let resolver = Resolver::new(&task, &globals, "");

    assert_eq!(resolver.resolve("%Env(WRAPNGO_RESOLVER_TEST_VAR)%/x"), "from-env/x");
    assert_eq!(resolver.resolve("%env(WRAPNGO_RESOLVER_TEST_UNSET_VAR)%"), "");
}

#[test]
fn dates_use_the_resolver_timestamp() {
    let task = TaskConfigBuilder::new("t", "echo").build();
    let globals = DynamicMap::new();
    let resolver = Resolver::at(&task, &globals, "YYYY-MM-DD_hh-mm-ss", fixed_now());

    assert_eq!(resolver.resolve("backup-%Date%.tar"), "backup-2024-03-05_14-07-09.tar");
    assert_eq!(resolver.resolve("%DATE(YY.M.D)% %Date(hha)%"), "24.3.5 2:07PM");
}

#[test]
fn bare_date_is_untouched_without_a_configured_format() {
    let task = TaskConfigBuilder::new("t", "echo").build();
    let globals = DynamicMap::new();
    let resolver = Resolver::at(&task, &globals, "", fixed_now());

    assert_eq!(resolver.resolve("%Date%|%Date(YYYY)%"), "%Date%|2024");
}

#[test]
fn date_codes_match_longest_first() {
    let now = fixed_now();
    assert_eq!(format_date(&now, "YYYY"), "2024");
    assert_eq!(format_date(&now, "YYY"), "65");
    assert_eq!(format_date(&now, "YY"), "24");
    assert_eq!(format_date(&now, "MMMM DDDD"), "March Tuesday");
    assert_eq!(format_date(&now, "MMM DDD"), "Mar Tue");
    assert_eq!(format_date(&now, "MM/DD M/D"), "03/05 3/5");
    assert_eq!(format_date(&now, "h:m:s"), "14:07:9");
    assert_eq!(format_date(&now, "ss.ms"), "09.123");
}

#[test]
fn escaped_space_survives_resolve_and_split() {
    let task = TaskConfigBuilder::new("t", "rclone")
        .args(&["--name %Dynamic.Title%", "--retries 5"])
        .dynamic("Title", "My\\ Docs")
        .build();
    let globals = DynamicMap::new();
    let resolver = Resolver::new(&task, &globals, "");

    let argv = split_all(&resolver.resolve_all(&task.arguments), "\\");
    assert_eq!(argv, vec!["--name", "My Docs", "--retries", "5"]);
}

const NUMERIC_CODES: [&str; 14] = [
    "YYYY", "YYY", "YY", "MM", "M", "DD", "D", "hh", "h", "mm", "m", "ss", "s", "ms",
];

proptest! {
    #[test]
    fn strings_without_placeholders_are_unchanged(input in "[^%]{0,40}") {
        let task = TaskConfigBuilder::new("t", "echo").dynamic("K", "v").build();
        let globals = global(&[("G", "g")]);
        let resolver = Resolver::new(&task, &globals, "YYYY");
        prop_assert_eq!(resolver.resolve(&input), input);
    }

    #[test]
    fn numeric_date_codes_never_leave_fragments(
        picks in proptest::collection::vec(0..NUMERIC_CODES.len(), 1..8)
    ) {
        let format = picks.iter().map(|i| NUMERIC_CODES[*i]).collect::<Vec<_>>().join("-");
        let rendered = format_date(&fixed_now(), &format);

        prop_assert!(rendered.chars().all(|c| c.is_ascii_digit() || c == '-'), "{} -> {}", format, rendered);
        prop_assert_eq!(rendered.split('-').count(), picks.len());
    }
}
