//! Scenario model.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s. Steps pass data forward
//! through the scenario context: a step captures values from its response,
//! and later steps reference them in templates. The data flow is declared
//! explicitly with [`Requirement`]s, and [`Scenario::validate`] checks that
//! every edge points at an earlier step.
//!
//! All types serialize, so scenarios can live in JSON files as well as code.
//!
//! # Example
//!
//! ```
//! use apiflow_harness::assertions::Assertion;
//! use apiflow_harness::scenario::{Capture, RequestTemplate, Scenario, Step};
//! use apiflow_harness::status::StatusSet;
//! use serde_json::json;
//!
//! let scenario = Scenario::new("create then read")
//!     .step(
//!         Step::new("create", RequestTemplate::post("/posts").body(json!({"title": "Hi"})))
//!             .accept(StatusSet::exactly(201))
//!             .capture(Capture::body("id", "id")),
//!     )
//!     .step(
//!         Step::new("read", RequestTemplate::get("/posts/${id}"))
//!             .requires_value("id")
//!             .assert(Assertion::property_equals("title", "Hi")),
//!     );
//!
//! assert!(scenario.validate().is_ok());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertions::Assertion;
use crate::client::{HttpMethod, HttpRequest, HttpResponse};
use crate::context::{ScenarioContext, placeholder_roots, referenced_names};
use crate::error::StepFailure;
use crate::generator::GeneratorKind;
use crate::path;
use crate::status::StatusSet;
use crate::types::Credential;

/// A request whose path, query, headers and body may contain placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template relative to the base URL.
    pub path: String,
    /// Query pair templates; repeated keys allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    /// Header templates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Edits applied to the resolved body, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<BodyEdit>,
    /// Fixture holding the bearer credential to send, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<String>,
}

impl RequestTemplate {
    /// Creates a template with only a method and path.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
            edits: Vec::new(),
            bearer: None,
        }
    }

    /// GET template.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST template.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// PUT template.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// DELETE template.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Appends a query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body template.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a property on the resolved body.
    pub fn set(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.edits.push(BodyEdit::Set {
            property: property.into(),
            value: value.into(),
        });
        self
    }

    /// Removes a property from the resolved body.
    pub fn unset(mut self, property: impl Into<String>) -> Self {
        self.edits.push(BodyEdit::Remove {
            property: property.into(),
        });
        self
    }

    /// Sends the credential stored in `fixture` as a bearer token.
    pub fn bearer(mut self, fixture: impl Into<String>) -> Self {
        self.bearer = Some(fixture.into());
        self
    }

    /// Root names of every context value this template references.
    pub fn references(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = placeholder_roots(&self.path).into_iter().collect();
        for (key, value) in &self.query {
            names.extend(placeholder_roots(key));
            names.extend(placeholder_roots(value));
        }
        for value in self.headers.values() {
            names.extend(placeholder_roots(value));
        }
        if let Some(body) = &self.body {
            names.extend(referenced_names(body));
        }
        for edit in &self.edits {
            if let BodyEdit::Set { value, .. } = edit {
                names.extend(referenced_names(value));
            }
        }
        names
    }

    /// Resolves every template against the context.
    pub fn render(
        &self,
        ctx: &ScenarioContext,
        credential: Option<&Credential>,
        accept: &StatusSet,
    ) -> Result<HttpRequest, StepFailure> {
        let mut request = HttpRequest::new(self.method, ctx.resolve_str(&self.path)?)
            .tolerate(accept.clone());

        for (key, value) in &self.query {
            request = request.query(ctx.resolve_str(key)?, ctx.resolve_str(value)?);
        }
        for (name, value) in &self.headers {
            request = request.header(name.clone(), ctx.resolve_str(value)?);
        }
        if let Some(credential) = credential {
            request = request.bearer(credential);
        }

        let body = match &self.body {
            Some(template) => Some(ctx.resolve_value(template)?),
            None if self.edits.is_empty() => None,
            None => Some(Value::Object(Default::default())),
        };
        if let Some(mut body) = body {
            for edit in &self.edits {
                edit.apply(&mut body, ctx)?;
            }
            request = request.json(body);
        }

        Ok(request)
    }
}

/// A change applied to a resolved request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BodyEdit {
    /// Sets `property` to `value` (a template).
    Set {
        /// Property path.
        property: String,
        /// New value.
        value: Value,
    },
    /// Removes `property` if present.
    Remove {
        /// Property path.
        property: String,
    },
}

impl BodyEdit {
    fn apply(&self, body: &mut Value, ctx: &ScenarioContext) -> Result<(), StepFailure> {
        match self {
            BodyEdit::Set { property, value } => {
                let value = ctx.resolve_value(value)?;
                if path::set(body, property, value) {
                    Ok(())
                } else {
                    Err(StepFailure::CaptureFailed {
                        name: property.clone(),
                        message: "cannot set property on request body".to_string(),
                    })
                }
            }
            BodyEdit::Remove { property } => {
                path::remove(body, property);
                Ok(())
            }
        }
    }
}

/// Where a captured value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum CaptureSource {
    /// A body path; an empty path captures the whole body.
    Body {
        /// Property path.
        #[serde(default)]
        path: String,
    },
    /// A response header.
    Header {
        /// Header name, case-insensitive.
        name: String,
    },
    /// The status code.
    Status,
}

/// A named value extracted from a response into the scenario context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Context name.
    pub name: String,
    /// Source of the value.
    #[serde(flatten)]
    pub source: CaptureSource,
    /// Keep only the first N items when the value is an array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<usize>,
    /// Also persist the value to this fixture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist: Option<String>,
}

impl Capture {
    /// Captures a body path.
    pub fn body(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: CaptureSource::Body { path: path.into() },
            take: None,
            persist: None,
        }
    }

    /// Captures the whole body.
    pub fn whole_body(name: impl Into<String>) -> Self {
        Self::body(name, "")
    }

    /// Captures a header.
    pub fn header(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: CaptureSource::Header {
                name: header.into(),
            },
            take: None,
            persist: None,
        }
    }

    /// Captures the status code.
    pub fn status(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: CaptureSource::Status,
            take: None,
            persist: None,
        }
    }

    /// Truncates an array capture to its first `n` items.
    pub fn take(mut self, n: usize) -> Self {
        self.take = Some(n);
        self
    }

    /// Persists the captured value to a fixture.
    pub fn persist(mut self, fixture: impl Into<String>) -> Self {
        self.persist = Some(fixture.into());
        self
    }

    /// Extracts the value from a response.
    pub fn extract(&self, response: &HttpResponse) -> Result<Value, StepFailure> {
        let value = match &self.source {
            CaptureSource::Body { path } => response.property(path).cloned().ok_or_else(|| {
                StepFailure::CaptureFailed {
                    name: self.name.clone(),
                    message: format!("body has no `{path}`"),
                }
            })?,
            CaptureSource::Header { name } => response
                .header(name)
                .map(|value| Value::String(value.to_string()))
                .ok_or_else(|| StepFailure::CaptureFailed {
                    name: self.name.clone(),
                    message: format!("response has no `{name}` header"),
                })?,
            CaptureSource::Status => Value::from(response.status),
        };

        Ok(match (self.take, value) {
            (Some(n), Value::Array(mut items)) => {
                items.truncate(n);
                Value::Array(items)
            }
            (_, value) => value,
        })
    }
}

/// An explicit data-flow edge into a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Requirement {
    /// A context value produced by an earlier step.
    Value(String),
    /// A fixture that must exist before the step sends anything.
    Fixture(String),
}

/// A generated value drawn before each request of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generate {
    /// Context name.
    pub name: String,
    /// Kind of value.
    pub kind: GeneratorKind,
}

fn default_bind() -> String {
    "item".to_string()
}

/// Repeats a step once per item of a captured array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    /// Context name of the array.
    pub over: String,
    /// Name under which each item is bound.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Only visit items that have this property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<String>,
    /// Visit at most this many items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Iteration {
    /// Iterates over a context array, binding each item as `item`.
    pub fn over(name: impl Into<String>) -> Self {
        Self {
            over: name.into(),
            bind: default_bind(),
            having: None,
            limit: None,
        }
    }

    /// Binds each item under `name`.
    pub fn bind(mut self, name: impl Into<String>) -> Self {
        self.bind = name.into();
        self
    }

    /// Skips items without `property`.
    pub fn having(mut self, property: impl Into<String>) -> Self {
        self.having = Some(property.into());
        self
    }

    /// Caps the number of visited items.
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Selects the items to visit.
    pub fn items(&self, ctx: &ScenarioContext) -> Result<Vec<Value>, StepFailure> {
        let value = ctx
            .lookup(&self.over)
            .ok_or_else(|| StepFailure::UnresolvedReference {
                reference: self.over.clone(),
            })?;
        let items = value.as_array().ok_or_else(|| StepFailure::CaptureFailed {
            name: self.over.clone(),
            message: "cannot iterate over a non-array value".to_string(),
        })?;

        Ok(items
            .iter()
            .filter(|item| match &self.having {
                Some(property) => path::get(item, property).is_some(),
                None => true,
            })
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// One request/response exchange (or a family of them under iteration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step name for reports.
    pub name: String,
    /// The request to send.
    pub request: RequestTemplate,
    /// Acceptable statuses; empty means any 2xx.
    #[serde(default)]
    pub accept: StatusSet,
    /// Checks run after the status is accepted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
    /// Values extracted after the assertions pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<Capture>,
    /// Explicit data-flow edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Requirement>,
    /// Values generated before each request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generate: Vec<Generate>,
    /// Optional iteration over a captured array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub each: Option<Iteration>,
}

impl Step {
    /// Creates a step accepting any 2xx.
    pub fn new(name: impl Into<String>, request: RequestTemplate) -> Self {
        Self {
            name: name.into(),
            request,
            accept: StatusSet::success(),
            assertions: Vec::new(),
            captures: Vec::new(),
            requires: Vec::new(),
            generate: Vec::new(),
            each: None,
        }
    }

    /// Sets the acceptable statuses.
    pub fn accept(mut self, statuses: StatusSet) -> Self {
        self.accept = statuses;
        self
    }

    /// Adds an assertion.
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Adds a capture.
    pub fn capture(mut self, capture: Capture) -> Self {
        self.captures.push(capture);
        self
    }

    /// Declares a dependency on a context value from an earlier step.
    pub fn requires_value(mut self, name: impl Into<String>) -> Self {
        self.requires.push(Requirement::Value(name.into()));
        self
    }

    /// Declares a dependency on a fixture.
    pub fn requires_fixture(mut self, name: impl Into<String>) -> Self {
        self.requires.push(Requirement::Fixture(name.into()));
        self
    }

    /// Generates a value before each request.
    pub fn generate(mut self, name: impl Into<String>, kind: GeneratorKind) -> Self {
        self.generate.push(Generate {
            name: name.into(),
            kind,
        });
        self
    }

    /// Repeats the step over a captured array.
    pub fn for_each(mut self, iteration: Iteration) -> Self {
        self.each = Some(iteration);
        self
    }

    /// Fixtures this step needs before sending anything.
    pub fn required_fixtures(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .filter_map(|requirement| match requirement {
                Requirement::Fixture(name) => Some(name.as_str()),
                Requirement::Value(_) => None,
            })
            .chain(self.request.bearer.as_deref())
    }

    /// Fixtures this step writes through its captures.
    pub fn persisted_fixtures(&self) -> impl Iterator<Item = &str> {
        self.captures
            .iter()
            .filter_map(|capture| capture.persist.as_deref())
    }

    /// Names this step defines for itself (generated values, iteration binding).
    fn local_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> =
            self.generate.iter().map(|g| g.name.clone()).collect();
        if let Some(iteration) = &self.each {
            names.insert(iteration.bind.clone());
        }
        names
    }
}

/// An ordered sequence of dependent steps validating one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Tags for filtering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Steps, executed in order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Creates an empty scenario.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Appends a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Fixtures written by any step of this scenario.
    pub fn persisted_fixtures(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().flat_map(Step::persisted_fixtures)
    }

    /// Checks the scenario's data flow.
    ///
    /// Every `Requirement::Value` and every placeholder root used by a step's
    /// request must be produced by an earlier step (capture or generated
    /// value) or by the step itself (generated value, iteration binding).
    /// Iterations must range over a value produced earlier.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("scenario name cannot be empty".to_string());
        }
        if self.steps.is_empty() {
            errors.push(format!("scenario `{}` has no steps", self.name));
        }

        let mut produced: BTreeSet<String> = BTreeSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let local = step.local_names();
            let known = |name: &str| produced.contains(name) || local.contains(name);

            for requirement in &step.requires {
                if let Requirement::Value(name) = requirement {
                    if !produced.contains(name) {
                        errors.push(format!(
                            "step {index} (`{}`) requires `{name}`, which no earlier step produces",
                            step.name
                        ));
                    }
                }
            }

            for name in step.request.references() {
                if !known(&name) {
                    errors.push(format!(
                        "step {index} (`{}`) references `{name}`, which is never produced before it",
                        step.name
                    ));
                }
            }

            if let Some(iteration) = &step.each {
                if !produced.contains(&iteration.over) {
                    errors.push(format!(
                        "step {index} (`{}`) iterates over `{}`, which no earlier step produces",
                        step.name, iteration.over
                    ));
                }
            }

            produced.extend(step.generate.iter().map(|g| g.name.clone()));
            produced.extend(step.captures.iter().map(|c| c.name.clone()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusOutcome;
    use serde_json::json;
    use std::time::Duration;

    fn response(body: Value) -> HttpResponse {
        let mut headers = BTreeMap::new();
        headers.insert("location".to_string(), "/posts/9".to_string());
        HttpResponse {
            method: HttpMethod::Post,
            url: "http://localhost/posts".to_string(),
            status: 201,
            headers,
            body,
            outcome: StatusOutcome::Accepted(201),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_render_resolves_everything() {
        let mut ctx = ScenarioContext::new();
        ctx.insert("post", json!({"id": 4, "title": "T", "marker": "x"}));
        ctx.insert("stamp", json!("2024-01-01"));

        let template = RequestTemplate::put("/posts/${post.id}")
            .query("v", "${post.id}")
            .header("X-Trace", "t-${post.id}")
            .body(json!("${post}"))
            .set("postDate", "${stamp}")
            .unset("marker");

        let request = template
            .render(&ctx, Some(&Credential::new("tok")), &StatusSet::of([200, 404]))
            .unwrap();

        assert_eq!(request.path, "/posts/4");
        assert_eq!(request.query, vec![("v".to_string(), "4".to_string())]);
        assert!(request.headers.contains(&("X-Trace".to_string(), "t-4".to_string())));
        assert!(request.headers.contains(&("Authorization".to_string(), "Bearer tok".to_string())));
        assert_eq!(
            request.body,
            Some(json!({"id": 4, "title": "T", "postDate": "2024-01-01"}))
        );
        assert!(request.tolerated.accepts(404));
    }

    #[test]
    fn test_render_without_body() {
        let ctx = ScenarioContext::new();
        let request = RequestTemplate::get("/posts")
            .render(&ctx, None, &StatusSet::success())
            .unwrap();
        assert!(request.body.is_none());
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_capture_sources() {
        let r = response(json!({"accessToken": "abc", "items": [1, 2, 3]}));

        assert_eq!(Capture::body("t", "accessToken").extract(&r).unwrap(), json!("abc"));
        assert_eq!(Capture::body("i", "items").take(2).extract(&r).unwrap(), json!([1, 2]));
        assert_eq!(Capture::header("loc", "Location").extract(&r).unwrap(), json!("/posts/9"));
        assert_eq!(Capture::status("s").extract(&r).unwrap(), json!(201));
        assert_eq!(Capture::whole_body("all").extract(&r).unwrap(), r.body);

        let err = Capture::body("x", "missing").extract(&r).unwrap_err();
        assert!(matches!(err, StepFailure::CaptureFailed { name, .. } if name == "x"));
    }

    #[test]
    fn test_iteration_items() {
        let mut ctx = ScenarioContext::new();
        ctx.insert(
            "posts",
            json!([{"id": 1}, {"id": 2, "mistake": "typo"}, {"id": 3, "mistake": ""}]),
        );

        let all = Iteration::over("posts").items(&ctx).unwrap();
        assert_eq!(all.len(), 3);

        let having = Iteration::over("posts").having("mistake").items(&ctx).unwrap();
        assert_eq!(having, vec![json!({"id": 2, "mistake": "typo"}), json!({"id": 3, "mistake": ""})]);

        let limited = Iteration::over("posts").limit(Some(1)).items(&ctx).unwrap();
        assert_eq!(limited, vec![json!({"id": 1})]);

        ctx.insert("scalar", json!(5));
        assert!(Iteration::over("scalar").items(&ctx).is_err());
        assert!(Iteration::over("nothing").items(&ctx).is_err());
    }

    #[test]
    fn test_required_fixtures_include_bearer() {
        let step = Step::new("s", RequestTemplate::post("/664/posts").bearer("Token"))
            .requires_fixture("RegisteredUsers");
        let fixtures: Vec<&str> = step.required_fixtures().collect();
        assert_eq!(fixtures, vec!["RegisteredUsers", "Token"]);
    }

    #[test]
    fn test_persisted_fixtures() {
        let scenario = Scenario::new("register and post")
            .step(
                Step::new("register", RequestTemplate::post("/register"))
                    .capture(Capture::whole_body("registered").persist("Token"))
                    .capture(Capture::status("status")),
            )
            .step(Step::new("create", RequestTemplate::post("/664/posts").bearer("Token")));

        let persisted: Vec<&str> = scenario.persisted_fixtures().collect();
        assert_eq!(persisted, vec!["Token"]);
    }

    #[test]
    fn test_validate_accepts_forward_data_flow() {
        let scenario = Scenario::new("flow")
            .step(
                Step::new("list", RequestTemplate::get("/posts"))
                    .capture(Capture::whole_body("posts")),
            )
            .step(
                Step::new("update", RequestTemplate::put("/posts/${post.id}").body(json!("${post}")))
                    .for_each(Iteration::over("posts").bind("post"))
                    .generate("words", GeneratorKind::Words)
                    .requires_value("posts"),
            );
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_backward_edges() {
        let scenario = Scenario::new("broken")
            .step(Step::new("read", RequestTemplate::get("/posts/${id}")).requires_value("id"))
            .step(
                Step::new("create", RequestTemplate::post("/posts"))
                    .capture(Capture::body("id", "id")),
            );
        let errors = scenario.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("requires `id`"));
    }

    #[test]
    fn test_validate_empty() {
        let errors = Scenario::new(" ").validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_step_serde_round_trip() {
        let json = json!({
            "name": "delete missing",
            "request": {
                "method": "DELETE",
                "path": "/posts",
                "body": {"missingEntity": "Non-existent entity"},
                "bearer": "Token"
            },
            "accept": [200, 404],
            "captures": [{"name": "token", "from": "body", "path": "accessToken", "persist": "Token"}],
            "requires": [{"kind": "fixture", "name": "Token"}]
        });
        let step: Step = serde_json::from_value(json).unwrap();
        assert_eq!(step.accept, StatusSet::of([200, 404]));
        assert_eq!(step.captures[0].persist.as_deref(), Some("Token"));
        assert_eq!(step.requires, vec![Requirement::Fixture("Token".to_string())]);
        assert!(step.assertions.is_empty());
    }
}
