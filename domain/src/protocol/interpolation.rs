//! Placeholder substitution for step argument templates
//!
//! Placeholders look like `{{ path }}`. A path starting with `$results`
//! reads from the step-results scope (bare `$results` is the whole map);
//! anything else reads from the variable scope. Dotted segments walk nested
//! objects only. A placeholder that does not resolve is left as written.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Path prefix selecting the step-results scope
pub const RESULTS_SCOPE: &str = "$results";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s](?:[^{}]*[^{}\s])?)\s*\}\}").expect("placeholder pattern is valid")
});

/// Render `template` against the two scopes.
///
/// Objects and arrays are rebuilt structurally (keys are never rendered),
/// non-string leaves pass through. A string that is exactly one placeholder
/// becomes the resolved value itself; placeholders embedded in other text
/// are spliced in as text.
pub fn render(template: &Value, variables: &Map<String, Value>, results: &Map<String, Value>) -> Value {
    match template {
        Value::String(s) => render_str(s, variables, results),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render(item, variables, results))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), render(v, variables, results)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Every placeholder path referenced anywhere in `template`, first-seen order.
pub fn placeholders(template: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_placeholders(template, &mut paths);
    paths
}

/// Look up one placeholder path without rendering.
pub fn lookup(path: &str, variables: &Map<String, Value>, results: &Map<String, Value>) -> Option<Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;

    if first == RESULTS_SCOPE {
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return Some(Value::Object(results.clone()));
        }
        return walk(results, &rest).cloned();
    }

    let all: Vec<&str> = std::iter::once(first).chain(segments).collect();
    walk(variables, &all).cloned()
}

fn walk<'a>(root: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (head, tail) = segments.split_first()?;
    let mut current = root.get(*head)?;
    for segment in tail {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

fn render_str(s: &str, variables: &Map<String, Value>, results: &Map<String, Value>) -> Value {
    let Some(caps) = PLACEHOLDER.captures(s) else {
        return Value::String(s.to_string());
    };
    if caps.get(0).is_some_and(|m| m.start() == 0 && m.end() == s.len()) {
        return lookup(&caps[1], variables, results).unwrap_or_else(|| Value::String(s.to_string()));
    }

    let rendered = PLACEHOLDER.replace_all(s, |caps: &Captures| {
        match lookup(&caps[1], variables, results) {
            Some(Value::String(text)) => text,
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    });
    Value::String(rendered.into_owned())
}

fn collect_placeholders(template: &Value, paths: &mut Vec<String>) {
    match template {
        Value::String(s) => {
            for caps in PLACEHOLDER.captures_iter(s) {
                let path = caps[1].to_string();
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, paths)),
        Value::Object(fields) => fields.values().for_each(|v| collect_placeholders(v, paths)),
        _ => {}
    }
}
