// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `{{name}}` placeholder substitution.
//!
//! Rendering is a pure function of the template text, the caller's variables
//! and the template's declared variables. Undeclared or optional variables
//! that the caller omits render as the empty string; declared defaults fill
//! gaps; a required variable with neither a value nor a default is a
//! [`CourierError::MissingVariable`].

use std::borrow::Cow;
use std::sync::LazyLock;

use courier_core::{CourierError, RenderedContent, Template, TemplateVariable, Variables};
use regex::Regex;
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Renders a template's subject and body.
pub fn render_template(
    template: &Template,
    variables: &Variables,
) -> Result<RenderedContent, CourierError> {
    render(
        template.subject.as_deref(),
        &template.body,
        variables,
        &template.variables,
    )
}

/// Renders a subject (optional) and body against the same variables.
///
/// Required variables are checked up front, whether or not the text uses them.
pub fn render(
    subject: Option<&str>,
    body: &str,
    variables: &Variables,
    declared: &[TemplateVariable],
) -> Result<RenderedContent, CourierError> {
    for var in declared.iter().filter(|v| v.required) {
        if !variables.contains_key(&var.name) && var.default.is_none() {
            return Err(CourierError::MissingVariable {
                name: var.name.clone(),
            });
        }
    }
    Ok(RenderedContent {
        subject: match subject {
            Some(s) => render_text(s, variables, declared)?,
            None => String::new(),
        },
        body: render_text(body, variables, declared)?,
    })
}

/// Substitutes every placeholder in `text`.
pub fn render_text(
    text: &str,
    variables: &Variables,
    declared: &[TemplateVariable],
) -> Result<String, CourierError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&resolve(name.as_str(), variables, declared)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Names referenced by placeholders in `text`, in order of first use.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }
    names
}

/// Placeholders in a template's subject or body with no declared variable.
/// They render as the empty string unless every caller supplies them.
pub fn undeclared_placeholders(template: &Template) -> Vec<String> {
    let mut names = template
        .subject
        .as_deref()
        .map(placeholders)
        .unwrap_or_default();
    for name in placeholders(&template.body) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.retain(|n| !template.variables.iter().any(|v| v.name == *n));
    names
}

fn resolve<'a>(
    name: &str,
    variables: &'a Variables,
    declared: &'a [TemplateVariable],
) -> Result<Cow<'a, str>, CourierError> {
    if let Some(value) = variables.get(name) {
        return Ok(format_value(value));
    }
    match declared.iter().find(|v| v.name == name) {
        Some(TemplateVariable {
            default: Some(value),
            ..
        }) => Ok(format_value(value)),
        Some(var) if var.required => Err(CourierError::MissingVariable {
            name: name.to_string(),
        }),
        _ => Ok(Cow::Borrowed("")),
    }
}

/// Strings verbatim, scalars by display form, null empty, containers as
/// compact JSON.
pub fn format_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}
