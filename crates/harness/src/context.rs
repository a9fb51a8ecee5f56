//! Scenario context: values threaded from one step to the next.
//!
//! Captured response data, generated values and iteration items live in a
//! [`ScenarioContext`] owned by a single scenario execution. Templates refer
//! to them with `${name}` or `${name.path[0]}`.
//!
//! A string that is exactly one placeholder resolves to the referenced value
//! with its JSON type intact (`"${post}"` becomes the whole post object).
//! Placeholders embedded in longer strings are rendered as text.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::StepFailure;
use crate::path;

/// Values available to templates during one scenario execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioContext {
    values: BTreeMap<String, Value>,
}

impl ScenarioContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Removes a value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Returns a value by exact name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns true if a value with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Resolves a reference such as `post`, `post.id` or `posts[0].title`.
    pub fn lookup(&self, reference: &str) -> Option<&Value> {
        let split = reference
            .find(['.', '['])
            .unwrap_or(reference.len());
        let (name, rest) = reference.split_at(split);
        let root = self.values.get(name)?;
        path::get(root, rest.strip_prefix('.').unwrap_or(rest))
    }

    /// Substitutes every placeholder in a string with its textual rendering.
    pub fn resolve_str(&self, template: &str) -> Result<String, StepFailure> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };
            out.push_str(&rest[..start]);
            let reference = after[..end].trim();
            let value = self.require(reference)?;
            out.push_str(&render(value));
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Substitutes placeholders throughout a JSON template.
    pub fn resolve_value(&self, template: &Value) -> Result<Value, StepFailure> {
        match template {
            Value::String(text) => match whole_placeholder(text) {
                Some(reference) => self.require(reference).cloned(),
                None => self.resolve_str(text).map(Value::String),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut resolved = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key.clone(), self.resolve_value(value)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    fn require(&self, reference: &str) -> Result<&Value, StepFailure> {
        self.lookup(reference)
            .ok_or_else(|| StepFailure::UnresolvedReference {
                reference: reference.to_string(),
            })
    }
}

/// Returns the reference if the text is exactly one placeholder.
fn whole_placeholder(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("${")?.strip_suffix('}')?;
    (!inner.contains('}') && !inner.contains("${")).then(|| inner.trim())
}

/// Renders a value for embedding in a string.
fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Collects the root names of every placeholder in a template.
pub fn referenced_names(template: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(template, &mut names);
    names
}

fn collect_names(template: &Value, names: &mut Vec<String>) {
    match template {
        Value::String(text) => names.extend(placeholder_roots(text)),
        Value::Array(items) => items.iter().for_each(|item| collect_names(item, names)),
        Value::Object(map) => map.values().for_each(|value| collect_names(value, names)),
        _ => {}
    }
}

/// Returns the root names referenced by placeholders in a string.
pub fn placeholder_roots(text: &str) -> Vec<String> {
    let mut roots = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let reference = after[..end].trim();
        let split = reference.find(['.', '[']).unwrap_or(reference.len());
        roots.push(reference[..split].to_string());
        rest = &after[end + 1..];
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ScenarioContext {
        let mut ctx = ScenarioContext::new();
        ctx.insert("token", json!("abc"));
        ctx.insert("post", json!({"id": 7, "title": "Hello", "tags": ["a", "b"]}));
        ctx
    }

    #[test]
    fn test_lookup_paths() {
        let ctx = context();
        assert_eq!(ctx.lookup("token"), Some(&json!("abc")));
        assert_eq!(ctx.lookup("post.id"), Some(&json!(7)));
        assert_eq!(ctx.lookup("post.tags[1]"), Some(&json!("b")));
        assert_eq!(ctx.lookup("missing"), None);
        assert_eq!(ctx.lookup("post.missing"), None);
    }

    #[test]
    fn test_resolve_str_embedded() {
        let ctx = context();
        assert_eq!(ctx.resolve_str("/posts/${post.id}").unwrap(), "/posts/7");
        assert_eq!(ctx.resolve_str("Bearer ${token}").unwrap(), "Bearer abc");
        assert_eq!(ctx.resolve_str("no placeholders").unwrap(), "no placeholders");
        assert_eq!(ctx.resolve_str("unterminated ${token").unwrap(), "unterminated ${token");
    }

    #[test]
    fn test_resolve_value_keeps_types() {
        let ctx = context();
        let resolved = ctx
            .resolve_value(&json!({"id": "${post.id}", "copy": "${post}", "label": "#${post.id}"}))
            .unwrap();
        assert_eq!(resolved["id"], json!(7));
        assert_eq!(resolved["copy"]["title"], json!("Hello"));
        assert_eq!(resolved["label"], json!("#7"));
    }

    #[test]
    fn test_unresolved_reference() {
        let ctx = context();
        let err = ctx.resolve_str("/posts/${created.id}").unwrap_err();
        assert_eq!(
            err,
            StepFailure::UnresolvedReference {
                reference: "created.id".to_string()
            }
        );
    }

    #[test]
    fn test_referenced_names() {
        let names = referenced_names(&json!({"a": "${post.id}", "b": ["x ${token} ${items[0]}"]}));
        assert_eq!(names, vec!["post", "token", "items"]);
    }
}
