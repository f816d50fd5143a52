// src/resolve/mod.rs

//! Placeholder resolution.
//!
//! Every string goes through the same fixed sequence of passes, each working
//! on the output of the previous one:
//!
//! 1. `%Date%` using `[GeneralSettings].DateFormat` (skipped when empty)
//! 2. `%Date(<format>)%`
//! 3. `%Env(<name>)%` (empty string when unset)
//! 4. `%<FieldName>%` for every entry of [`fields::TASK_FIELDS`]
//! 5. `%Dynamic.<key>%` from the task's own map
//! 6. `%GlobalDynamic.<key>%` from the global map
//!
//! All token names and map keys match case-insensitively. Unknown tokens are
//! left untouched, and every occurrence of a known token is replaced. There
//! is no nesting and no second round: this is flat substitution only.

pub mod date;
pub mod fields;

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Local};
use regex::{Captures, NoExpand, Regex};

use crate::config::{DynamicMap, TaskConfig};

pub use date::format_date;
pub use fields::{TaskField, TASK_FIELDS};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)%Date%").expect("date placeholder regex should compile"));

static DATE_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)%Date\(([^()%]*)\)%").expect("date function regex should compile")
});

static ENV_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)%Env\(([^()%]*)\)%").expect("env function regex should compile")
});

static DYNAMIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)%Dynamic\.([^%]+)%").expect("dynamic placeholder regex should compile")
});

static GLOBAL_DYNAMIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)%GlobalDynamic\.([^%]+)%")
        .expect("global dynamic placeholder regex should compile")
});

static FIELD_RES: LazyLock<Vec<(TaskField, Regex)>> = LazyLock::new(|| {
    TASK_FIELDS
        .iter()
        .map(|field| {
            let re = Regex::new(&format!("(?i)%{}%", regex::escape(field.name)))
                .expect("field placeholder regex should compile");
            (*field, re)
        })
        .collect()
});

/// Resolves placeholders against one task and the global dynamic map.
///
/// A resolver captures a single timestamp at construction, so every string
/// resolved through it sees the same date.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    task: &'a TaskConfig,
    global_dynamic: &'a DynamicMap,
    date_format: &'a str,
    now: DateTime<FixedOffset>,
}

impl<'a> Resolver<'a> {
    pub fn new(task: &'a TaskConfig, global_dynamic: &'a DynamicMap, date_format: &'a str) -> Self {
        Self::at(task, global_dynamic, date_format, Local::now().fixed_offset())
    }

    /// Resolver pinned to a given instant.
    pub fn at(
        task: &'a TaskConfig,
        global_dynamic: &'a DynamicMap,
        date_format: &'a str,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            task,
            global_dynamic,
            date_format,
            now,
        }
    }

    /// Resolve a list of templates into a list of the same length.
    pub fn resolve_all<S: AsRef<str>>(&self, values: &[S]) -> Vec<String> {
        values.iter().map(|v| self.resolve(v.as_ref())).collect()
    }

    /// Resolve a single template.
    pub fn resolve(&self, value: &str) -> String {
        let mut v = value.to_string();

        if !self.date_format.is_empty() && DATE_RE.is_match(&v) {
            let date = format_date(&self.now, self.date_format);
            v = DATE_RE.replace_all(&v, NoExpand(&date)).into_owned();
        }

        v = DATE_FN_RE
            .replace_all(&v, |caps: &Captures| format_date(&self.now, &caps[1]))
            .into_owned();

        v = ENV_FN_RE
            .replace_all(&v, |caps: &Captures| std::env::var(&caps[1]).unwrap_or_default())
            .into_owned();

        for (field, re) in FIELD_RES.iter() {
            if re.is_match(&v) {
                let value = (field.value)(self.task);
                v = re.replace_all(&v, NoExpand(&value)).into_owned();
            }
        }

        v = replace_from_map(&DYNAMIC_RE, &v, &self.task.dynamic);
        v = replace_from_map(&GLOBAL_DYNAMIC_RE, &v, self.global_dynamic);

        v
    }
}

fn replace_from_map(re: &Regex, value: &str, map: &DynamicMap) -> String {
    re.replace_all(value, |caps: &Captures| match map.lookup(&caps[1]) {
        Some(found) => found.to_string(),
        None => caps[0].to_string(),
    })
    .into_owned()
}
