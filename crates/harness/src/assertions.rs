//! Declarative response assertions.
//!
//! Every [`Assertion`] evaluates to an [`AssertionResult`] carrying a
//! description and, on failure, a human-readable mismatch. The runner
//! evaluates a step's whole assertion group before deciding the step's fate,
//! so a report lists every mismatch rather than only the first.
//!
//! Property names are paths into the JSON body (`title`, `user.email`,
//! `[0].id`). Expected values may contain `${...}` placeholders; call
//! [`Assertion::resolve`] against the scenario context before evaluating.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::HttpResponse;
use crate::context::ScenarioContext;
use crate::error::StepFailure;

/// A declarative check on a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Assertion {
    /// The status equals `status`.
    StatusEquals {
        /// Expected status.
        status: u16,
    },

    /// The body has a value at `property`.
    HasProperty {
        /// Property path.
        property: String,
    },

    /// The value at `property` equals `value`.
    PropertyEquals {
        /// Property path.
        property: String,
        /// Expected value (may be a template).
        value: Value,
    },

    /// The body has no value at `property`.
    PropertyAbsent {
        /// Property path.
        property: String,
    },

    /// The body is an array containing every element of `members` (deep equality).
    BodyIncludesMembers {
        /// Expected members (may be a template resolving to an array).
        members: Value,
    },

    /// The header `header` exists and contains `text`.
    HeaderContains {
        /// Header name, case-insensitive.
        header: String,
        /// Expected substring.
        text: String,
    },

    /// The body is an array and every item's `property` is one of `allowed`.
    EachItemPropertyIn {
        /// Property path within each item.
        property: String,
        /// Allowed values (may be a template resolving to an array).
        allowed: Value,
    },

    /// The body is an array whose items, identified by `key`, appear in
    /// `expected` in the same relative order.
    ItemsSubsequenceOf {
        /// Identifying property path within each item.
        key: String,
        /// Reference listing (may be a template resolving to an array).
        expected: Value,
    },

    /// The body is an array of at most `max` items.
    ArrayLenAtMost {
        /// Maximum length.
        max: usize,
    },
}

/// The result of evaluating one assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    /// What was checked.
    pub description: String,
    /// Why it failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<String>,
}

impl AssertionResult {
    fn pass(description: String) -> Self {
        Self {
            description,
            mismatch: None,
        }
    }

    fn fail(description: String, mismatch: String) -> Self {
        Self {
            description,
            mismatch: Some(mismatch),
        }
    }

    /// Returns true if the assertion held.
    pub fn passed(&self) -> bool {
        self.mismatch.is_none()
    }
}

impl Assertion {
    /// Asserts the response status.
    pub fn status_equals(status: u16) -> Self {
        Assertion::StatusEquals { status }
    }

    /// Asserts that a body property exists.
    pub fn has_property(property: impl Into<String>) -> Self {
        Assertion::HasProperty {
            property: property.into(),
        }
    }

    /// Asserts that a body property equals a value.
    pub fn property_equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Assertion::PropertyEquals {
            property: property.into(),
            value: value.into(),
        }
    }

    /// Asserts that a body property is absent.
    pub fn property_absent(property: impl Into<String>) -> Self {
        Assertion::PropertyAbsent {
            property: property.into(),
        }
    }

    /// Asserts that the body array includes every member of `members`.
    pub fn body_includes_members(members: impl Into<Value>) -> Self {
        Assertion::BodyIncludesMembers {
            members: members.into(),
        }
    }

    /// Asserts that a header contains some text.
    pub fn header_contains(header: impl Into<String>, text: impl Into<String>) -> Self {
        Assertion::HeaderContains {
            header: header.into(),
            text: text.into(),
        }
    }

    /// Asserts that every item's property is among `allowed`.
    pub fn each_item_property_in(property: impl Into<String>, allowed: impl Into<Value>) -> Self {
        Assertion::EachItemPropertyIn {
            property: property.into(),
            allowed: allowed.into(),
        }
    }

    /// Asserts that the body items are an ordered subsequence of `expected` by `key`.
    pub fn items_subsequence_of(key: impl Into<String>, expected: impl Into<Value>) -> Self {
        Assertion::ItemsSubsequenceOf {
            key: key.into(),
            expected: expected.into(),
        }
    }

    /// Asserts the body array length.
    pub fn array_len_at_most(max: usize) -> Self {
        Assertion::ArrayLenAtMost { max }
    }

    /// Substitutes context placeholders in expected values.
    pub fn resolve(&self, ctx: &ScenarioContext) -> Result<Assertion, StepFailure> {
        Ok(match self {
            Assertion::PropertyEquals { property, value } => Assertion::PropertyEquals {
                property: ctx.resolve_str(property)?,
                value: ctx.resolve_value(value)?,
            },
            Assertion::HasProperty { property } => Assertion::HasProperty {
                property: ctx.resolve_str(property)?,
            },
            Assertion::PropertyAbsent { property } => Assertion::PropertyAbsent {
                property: ctx.resolve_str(property)?,
            },
            Assertion::BodyIncludesMembers { members } => Assertion::BodyIncludesMembers {
                members: ctx.resolve_value(members)?,
            },
            Assertion::HeaderContains { header, text } => Assertion::HeaderContains {
                header: header.clone(),
                text: ctx.resolve_str(text)?,
            },
            Assertion::EachItemPropertyIn { property, allowed } => Assertion::EachItemPropertyIn {
                property: property.clone(),
                allowed: ctx.resolve_value(allowed)?,
            },
            Assertion::ItemsSubsequenceOf { key, expected } => Assertion::ItemsSubsequenceOf {
                key: key.clone(),
                expected: ctx.resolve_value(expected)?,
            },
            other => other.clone(),
        })
    }

    /// Describes the assertion for reports.
    pub fn describe(&self) -> String {
        match self {
            Assertion::StatusEquals { status } => format!("status equals {status}"),
            Assertion::HasProperty { property } => format!("has property `{property}`"),
            Assertion::PropertyEquals { property, value } => {
                format!("property `{property}` equals {value}")
            }
            Assertion::PropertyAbsent { property } => format!("property `{property}` is absent"),
            Assertion::BodyIncludesMembers { members } => format!(
                "body includes {} member(s)",
                members.as_array().map_or(0, Vec::len)
            ),
            Assertion::HeaderContains { header, text } => {
                format!("header `{header}` contains `{text}`")
            }
            Assertion::EachItemPropertyIn { property, allowed } => {
                format!("every item's `{property}` is in {allowed}")
            }
            Assertion::ItemsSubsequenceOf { key, .. } => {
                format!("items are an ordered subsequence by `{key}`")
            }
            Assertion::ArrayLenAtMost { max } => format!("body has at most {max} item(s)"),
        }
    }

    /// Evaluates the assertion against a response.
    pub fn evaluate(&self, response: &HttpResponse) -> AssertionResult {
        let description = self.describe();
        match self.mismatch(response) {
            None => AssertionResult::pass(description),
            Some(mismatch) => AssertionResult::fail(description, mismatch),
        }
    }

    fn mismatch(&self, response: &HttpResponse) -> Option<String> {
        match self {
            Assertion::StatusEquals { status } => (response.status != *status)
                .then(|| format!("expected status {status}, got {}", response.status)),

            Assertion::HasProperty { property } => response
                .property(property)
                .is_none()
                .then(|| format!("expected property `{property}` to be present")),

            Assertion::PropertyEquals { property, value } => match response.property(property) {
                None => Some(format!("expected `{property}` = {value}, but it is absent")),
                Some(actual) if actual != value => {
                    Some(format!("expected `{property}` = {value}, got {actual}"))
                }
                Some(_) => None,
            },

            Assertion::PropertyAbsent { property } => response
                .property(property)
                .map(|actual| format!("expected `{property}` to be absent, got {actual}")),

            Assertion::BodyIncludesMembers { members } => {
                let body = match as_array(&response.body, "body") {
                    Ok(body) => body,
                    Err(mismatch) => return Some(mismatch),
                };
                let members = match as_array(members, "expected members") {
                    Ok(members) => members,
                    Err(mismatch) => return Some(mismatch),
                };
                let missing: Vec<&Value> = members
                    .iter()
                    .filter(|member| !body.contains(member))
                    .collect();
                match missing.first() {
                    None => None,
                    Some(first) => Some(format!(
                        "{} of {} expected member(s) missing from body; first missing: {}",
                        missing.len(),
                        members.len(),
                        first
                    )),
                }
            }

            Assertion::HeaderContains { header, text } => match response.header(header) {
                None => Some(format!("expected header `{header}` to be present")),
                Some(actual) if !actual.contains(text.as_str()) => Some(format!(
                    "expected header `{header}` to contain `{text}`, got `{actual}`"
                )),
                Some(_) => None,
            },

            Assertion::EachItemPropertyIn { property, allowed } => {
                let body = match as_array(&response.body, "body") {
                    Ok(body) => body,
                    Err(mismatch) => return Some(mismatch),
                };
                let allowed = match as_array(allowed, "allowed values") {
                    Ok(allowed) => allowed,
                    Err(mismatch) => return Some(mismatch),
                };
                let unexpected: Vec<String> = body
                    .iter()
                    .map(|item| crate::path::get(item, property).cloned().unwrap_or(Value::Null))
                    .filter(|value| !allowed.contains(value))
                    .map(|value| value.to_string())
                    .collect();
                (!unexpected.is_empty()).then(|| {
                    format!(
                        "unexpected `{property}` value(s): {}",
                        unexpected.join(", ")
                    )
                })
            }

            Assertion::ItemsSubsequenceOf { key, expected } => {
                let body = match as_array(&response.body, "body") {
                    Ok(body) => body,
                    Err(mismatch) => return Some(mismatch),
                };
                let expected = match as_array(expected, "expected listing") {
                    Ok(expected) => expected,
                    Err(mismatch) => return Some(mismatch),
                };
                subsequence_mismatch(body, expected, key)
            }

            Assertion::ArrayLenAtMost { max } => match as_array(&response.body, "body") {
                Err(mismatch) => Some(mismatch),
                Ok(body) if body.len() > *max => Some(format!(
                    "expected at most {max} item(s), got {}",
                    body.len()
                )),
                Ok(_) => None,
            },
        }
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, String> {
    value.as_array().ok_or_else(|| {
        let kind = match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        };
        format!("expected {what} to be an array, got {kind}")
    })
}

/// Checks that `items` keyed by `key` appear in `expected` in the same order.
fn subsequence_mismatch(items: &[Value], expected: &[Value], key: &str) -> Option<String> {
    let expected_keys: Vec<Option<&Value>> = expected
        .iter()
        .map(|item| crate::path::get(item, key))
        .collect();

    let mut cursor = 0;
    for (position, item) in items.iter().enumerate() {
        let Some(item_key) = crate::path::get(item, key) else {
            return Some(format!("item {position} has no `{key}`"));
        };
        let found = expected_keys[cursor..]
            .iter()
            .position(|candidate| *candidate == Some(item_key));
        match found {
            Some(offset) => cursor += offset + 1,
            None if expected_keys.contains(&Some(item_key)) => {
                return Some(format!(
                    "item {position} (`{key}` = {item_key}) is out of order"
                ));
            }
            None => {
                return Some(format!(
                    "item {position} (`{key}` = {item_key}) is not in the expected listing"
                ));
            }
        }
    }
    None
}

/// Resolves and evaluates a group of assertions, keeping every result.
///
/// Fails only if a template cannot be resolved; mismatches are returned in
/// the results.
pub fn evaluate_all(
    assertions: &[Assertion],
    ctx: &ScenarioContext,
    response: &HttpResponse,
) -> Result<Vec<AssertionResult>, StepFailure> {
    assertions
        .iter()
        .map(|assertion| Ok(assertion.resolve(ctx)?.evaluate(response)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpMethod;
    use crate::status::StatusOutcome;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn response(status: u16, body: Value) -> HttpResponse {
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        HttpResponse {
            method: HttpMethod::Get,
            url: "http://localhost/posts".to_string(),
            status,
            headers,
            body,
            outcome: StatusOutcome::Accepted(status),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_status_equals() {
        let r = response(201, Value::Null);
        assert!(Assertion::status_equals(201).evaluate(&r).passed());
        let result = Assertion::status_equals(200).evaluate(&r);
        assert_eq!(result.mismatch.as_deref(), Some("expected status 200, got 201"));
    }

    #[test]
    fn test_property_checks() {
        let r = response(200, json!({"id": 1, "title": "Hello", "user": {"email": "a@b.c"}}));
        assert!(Assertion::has_property("user.email").evaluate(&r).passed());
        assert!(!Assertion::has_property("postDate").evaluate(&r).passed());
        assert!(Assertion::property_equals("title", "Hello").evaluate(&r).passed());
        assert!(!Assertion::property_equals("title", "Bye").evaluate(&r).passed());
        assert!(!Assertion::property_equals("missing", 1).evaluate(&r).passed());
        assert!(Assertion::property_absent("marker").evaluate(&r).passed());
        assert!(!Assertion::property_absent("title").evaluate(&r).passed());
    }

    #[test]
    fn test_property_equals_is_type_sensitive() {
        let r = response(200, json!({"id": 7}));
        assert!(Assertion::property_equals("id", 7).evaluate(&r).passed());
        assert!(!Assertion::property_equals("id", "7").evaluate(&r).passed());
    }

    #[test]
    fn test_body_includes_members() {
        let r = response(200, json!([{"id": 1}, {"id": 2}, {"id": 3}]));
        assert!(Assertion::body_includes_members(json!([{"id": 3}, {"id": 1}])).evaluate(&r).passed());

        let result = Assertion::body_includes_members(json!([{"id": 1}, {"id": 9}])).evaluate(&r);
        let mismatch = result.mismatch.unwrap();
        assert!(mismatch.starts_with("1 of 2 expected member(s) missing"));

        let not_array = response(200, json!({"id": 1}));
        assert!(!Assertion::body_includes_members(json!([])).evaluate(&not_array).passed());
    }

    #[test]
    fn test_header_contains() {
        let r = response(200, Value::Null);
        assert!(Assertion::header_contains("Content-Type", "application/json").evaluate(&r).passed());
        assert!(!Assertion::header_contains("Content-Type", "text/html").evaluate(&r).passed());
        assert!(!Assertion::header_contains("ETag", "x").evaluate(&r).passed());
    }

    #[test]
    fn test_each_item_property_in() {
        let allowed = json!([55, 60]);
        let r = response(200, json!([{"id": 55}, {"id": 60}]));
        assert!(Assertion::each_item_property_in("id", allowed.clone()).evaluate(&r).passed());

        let empty = response(200, json!([]));
        assert!(Assertion::each_item_property_in("id", allowed.clone()).evaluate(&empty).passed());

        let stray = response(200, json!([{"id": 55}, {"id": 61}]));
        let result = Assertion::each_item_property_in("id", allowed).evaluate(&stray);
        assert_eq!(result.mismatch.as_deref(), Some("unexpected `id` value(s): 61"));
    }

    #[test]
    fn test_items_subsequence_of() {
        let expected = json!([{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}]);

        let ordered = response(200, json!([{"id": 1}, {"id": 3}]));
        assert!(Assertion::items_subsequence_of("id", expected.clone()).evaluate(&ordered).passed());

        let reversed = response(200, json!([{"id": 3}, {"id": 1}]));
        let result = Assertion::items_subsequence_of("id", expected.clone()).evaluate(&reversed);
        assert!(result.mismatch.unwrap().contains("out of order"));

        let foreign = response(200, json!([{"id": 11}]));
        let result = Assertion::items_subsequence_of("id", expected).evaluate(&foreign);
        assert!(result.mismatch.unwrap().contains("not in the expected listing"));
    }

    #[test]
    fn test_array_len_at_most() {
        let r = response(200, json!([1, 2, 3]));
        assert!(Assertion::array_len_at_most(3).evaluate(&r).passed());
        assert!(!Assertion::array_len_at_most(2).evaluate(&r).passed());
    }

    #[test]
    fn test_evaluate_all_resolves_templates_and_keeps_every_result() {
        let mut ctx = ScenarioContext::new();
        ctx.insert("title", json!("Hello"));
        let r = response(200, json!({"title": "Hello"}));

        let results = evaluate_all(
            &[
                Assertion::property_equals("title", "${title}"),
                Assertion::has_property("author"),
                Assertion::status_equals(201),
            ],
            &ctx,
            &r,
        )
        .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].passed());
        assert!(!results[1].passed());
        assert!(!results[2].passed());
    }

    #[test]
    fn test_evaluate_all_unresolved_template() {
        let ctx = ScenarioContext::new();
        let r = response(200, json!({}));
        let err = evaluate_all(&[Assertion::property_equals("t", "${nope}")], &ctx, &r).unwrap_err();
        assert!(matches!(err, StepFailure::UnresolvedReference { .. }));
    }

    #[test]
    fn test_serde_shape() {
        let assertion: Assertion =
            serde_json::from_value(json!({"check": "property_absent", "property": "marker"})).unwrap();
        assert_eq!(assertion, Assertion::property_absent("marker"));
    }
}
