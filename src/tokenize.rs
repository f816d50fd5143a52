// src/tokenize.rs

//! Escape-aware argument splitting.
//!
//! A configured argument such as `"--retries 5"` becomes two process
//! arguments, while `"--name My\ Docs"` (with the default `\` escape) keeps
//! `My Docs` together as one argument.

/// The only separator arguments are split on.
pub const SEPARATOR: char = ' ';

/// Private-use codepoint standing in for an escaped separator while splitting.
const SENTINEL: char = '\u{E000}';

/// Split `input` on spaces, treating `<escape><space>` as a literal space.
///
/// Empty tokens (from leading, trailing or repeated separators) are dropped.
/// An empty `escape` disables escaping.
pub fn split_escaped(input: &str, escape: &str) -> Vec<String> {
    let protected = if escape.is_empty() {
        input.to_string()
    } else {
        input.replace(&format!("{escape}{SEPARATOR}"), &SENTINEL.to_string())
    };

    protected
        .split(SEPARATOR)
        .filter(|token| !token.is_empty())
        .map(|token| token.replace(SENTINEL, &SEPARATOR.to_string()))
        .collect()
}

/// Inverse of [`split_escaped`]: escape separators inside each token and
/// join with a single space.
///
/// `split_escaped(&join_escaped(tokens, esc), esc) == tokens` for any tokens
/// that are non-empty and contain neither the sentinel nor a trailing escape.
pub fn join_escaped<S: AsRef<str>>(tokens: &[S], escape: &str) -> String {
    tokens
        .iter()
        .map(|t| {
            t.as_ref()
                .replace(SEPARATOR, &format!("{escape}{SEPARATOR}"))
        })
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string())
}

/// Split every entry of `args` and flatten the result, preserving order.
pub fn split_all<S: AsRef<str>>(args: &[S], escape: &str) -> Vec<String> {
    args.iter()
        .flat_map(|a| split_escaped(a.as_ref(), escape))
        .collect()
}
