// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration errors as miette diagnostics.
//!
//! Figment reports every problem in one pass; each becomes a [`ConfigError`].
//! A misspelled key points into the TOML file it came from and names the
//! closest accepted key.

#![allow(unused_assignments)] // miette's Diagnostic derive trips this lint

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler score for a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("`{key}` is not a Courier setting")]
    #[diagnostic(
        code(courier::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma separated keys accepted where `key` appeared.
        valid_keys: String,
        #[label("unknown key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// Missing, mistyped or otherwise unreadable value at `key`.
    #[error("bad value for `{key}`: {detail}")]
    #[diagnostic(code(courier::config::bad_value))]
    BadValue { key: String, detail: String },

    /// Semantic check failed after the file parsed.
    #[error("{message}")]
    #[diagnostic(code(courier::config::invalid))]
    Validation { message: String },
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let accepted = format!("accepted here: {valid_keys}");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {accepted}"),
        None => accepted,
    }
}

impl ConfigError {
    /// One error per problem inside `err`. `sources` pairs file paths with
    /// their contents so unknown keys can be underlined.
    pub fn from_figment(err: figment::Error, sources: &[(String, String)]) -> Vec<Self> {
        use figment::error::Kind;

        err.into_iter()
            .map(|error| {
                let mut path = error.path.clone();
                match &error.kind {
                    Kind::UnknownField(field, accepted) => {
                        let (span, src) = underline(&error, field, sources);
                        ConfigError::UnknownKey {
                            key: field.clone(),
                            suggestion: suggest_key(field, accepted),
                            valid_keys: accepted.join(", "),
                            span,
                            src,
                        }
                    }
                    Kind::MissingField(field) => {
                        path.push(field.to_string());
                        ConfigError::BadValue {
                            key: dotted(&path),
                            detail: "required but not set".to_string(),
                        }
                    }
                    kind => ConfigError::BadValue {
                        key: dotted(&path),
                        detail: kind.to_string(),
                    },
                }
            })
            .collect()
    }
}

fn dotted(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

fn underline(
    error: &figment::Error,
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    // Inline strings carry no file source; use the only source given.
    let source = match file {
        Some(file) => sources.iter().find(|(p, _)| *p == file),
        None if sources.len() == 1 => sources.first(),
        None => None,
    };
    let found = source.and_then(|(path, content)| {
        let offset = find_key_offset(content, &error.path, field)?;
        Some((
            SourceSpan::new(offset.into(), field.len()),
            NamedSource::new(path, content.clone()),
        ))
    });
    match found {
        Some((span, src)) => (Some(span), Some(src)),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside the table named by the first
/// element of `path`, or inside the root table when `path` is empty.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let wanted = path.first().map(String::as_str);
    let mut table: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let body = line.trim();
        if let Some(header) = body.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            table = Some(header.trim());
        } else if table == wanted {
            let is_key = body
                .strip_prefix(field)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if is_key {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// Closest accepted key above the similarity threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Renders every error as a graphical report.
pub fn render(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler.render_report(&mut out, error).is_err() {
            out.push_str(&format!("Error: {error}\n"));
        }
    }
    out
}

/// Prints [`render`] output to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render(errors));
}
