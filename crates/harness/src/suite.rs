//! The built-in posts suite.
//!
//! Registration, listing, pagination, authorization and post CRUD workflows
//! against a json-server style service, expressed as [`Scenario`] data. The
//! registration scenario stores the bearer credential in the
//! [`TOKEN_FIXTURE`] fixture; the scenarios needing authorization declare it
//! and fail before sending anything if it is missing.

use serde_json::{Value, json};

use crate::HarnessConfig;
use crate::assertions::Assertion;
use crate::generator::GeneratorKind;
use crate::scenario::{Capture, Iteration, RequestTemplate, Scenario, Step};
use crate::status::StatusSet;

/// Fixture holding the registered user's credential.
pub const TOKEN_FIXTURE: &str = "Token";

/// Property added and then removed by the marker round trip.
pub const MARKER_PROPERTY: &str = "markedForDeletion";

/// Number of posts compared by the pagination scenario.
pub const PAGE_SIZE: usize = 10;

/// Knobs for the built-in suite.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteOptions {
    /// Route prefix guarding post creation (`/{resource}/posts`).
    pub protected_resource: String,
    /// Posts from the service's seed database, if available.
    pub seed_posts: Option<Vec<Value>>,
    /// Cap on the number of posts each per-post scenario touches.
    pub max_items: Option<usize>,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            protected_resource: "664".to_string(),
            seed_posts: None,
            max_items: None,
        }
    }
}

impl SuiteOptions {
    /// Options derived from the harness configuration; seed posts are loaded
    /// separately.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            protected_resource: config.protected_resource.trim_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Sets the seed posts.
    pub fn with_seed_posts(mut self, posts: Vec<Value>) -> Self {
        self.seed_posts = Some(posts);
        self
    }

    /// Caps per-post scenarios.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

/// Builds the posts suite.
pub struct PostsSuite {
    options: SuiteOptions,
}

impl PostsSuite {
    /// Creates the suite.
    pub fn new(options: SuiteOptions) -> Self {
        Self { options }
    }

    /// Returns every scenario, registration first.
    pub fn scenarios(&self) -> Vec<Scenario> {
        vec![
            register_user(),
            list_posts(),
            self.first_page(),
            posts_by_id(),
            self.create_without_token(),
            self.create_with_token(),
            self.stamp_post_date(),
            self.fix_mistakes(),
            self.name_for_book(),
            delete_missing_entity(),
            self.marker_round_trip(),
        ]
    }

    fn each_post(&self) -> Iteration {
        Iteration::over("posts")
            .bind("post")
            .limit(self.options.max_items)
    }

    fn guarded_posts(&self) -> String {
        format!("/{}/posts", self.options.protected_resource)
    }

    fn first_page(&self) -> Scenario {
        let scenario = Scenario::new("get first 10 posts").tag("pagination");

        match &self.options.seed_posts {
            Some(seed) => {
                let expected: Vec<Value> = seed.iter().take(PAGE_SIZE).cloned().collect();
                scenario
                    .describe("GET /posts?limit=10 includes the first ten seeded posts")
                    .step(
                        Step::new("paginated listing", limited_listing())
                            .accept(StatusSet::exactly(200))
                            .assert(Assertion::body_includes_members(expected)),
                    )
            }
            None => scenario
                .describe("GET /posts?limit=10 returns a prefix of the full listing, in order")
                .step(
                    Step::new("full listing", RequestTemplate::get("/posts"))
                        .accept(StatusSet::exactly(200))
                        .capture(Capture::whole_body("first_page").take(PAGE_SIZE)),
                )
                .step(
                    Step::new("paginated listing", limited_listing())
                        .accept(StatusSet::exactly(200))
                        .requires_value("first_page")
                        .assert(Assertion::array_len_at_most(PAGE_SIZE))
                        .assert(Assertion::items_subsequence_of("id", "${first_page}")),
                ),
        }
    }

    fn create_without_token(&self) -> Scenario {
        Scenario::new("create post without token is rejected")
            .tag("auth")
            .step(
                Step::new(
                    "unauthorized create",
                    RequestTemplate::post(self.guarded_posts()).body(new_post()),
                )
                .generate("id", GeneratorKind::Number)
                .generate("title", GeneratorKind::CompanyName)
                .generate("author", GeneratorKind::PersonName)
                .accept(StatusSet::exactly(401))
                .assert(Assertion::status_equals(401)),
            )
    }

    fn create_with_token(&self) -> Scenario {
        Scenario::new("create post with token")
            .tag("auth")
            .tag("crud")
            .step(
                Step::new(
                    "authorized create",
                    RequestTemplate::post(self.guarded_posts())
                        .bearer(TOKEN_FIXTURE)
                        .body(new_post()),
                )
                .generate("id", GeneratorKind::Number)
                .generate("title", GeneratorKind::CompanyName)
                .generate("author", GeneratorKind::PersonName)
                .accept(StatusSet::exactly(201)),
            )
            .step(
                Step::new("read back", RequestTemplate::get("/posts/${id}"))
                    .requires_value("id")
                    .accept(StatusSet::exactly(200))
                    .assert(Assertion::property_equals("title", "${title}"))
                    .assert(Assertion::property_equals("author", "${author}")),
            )
    }

    fn stamp_post_date(&self) -> Scenario {
        Scenario::new("stamp postDate on every post")
            .tag("crud")
            .step(fetch_posts())
            .step(
                Step::new(
                    "put postDate",
                    RequestTemplate::put("/posts/${post.id}")
                        .bearer(TOKEN_FIXTURE)
                        .body(json!("${post}"))
                        .set("postDate", ""),
                )
                .for_each(self.each_post())
                .requires_value("posts")
                .accept(StatusSet::exactly(200))
                .assert(Assertion::has_property("postDate")),
            )
    }

    fn fix_mistakes(&self) -> Scenario {
        Scenario::new("fix mistakes where present")
            .tag("crud")
            .step(fetch_posts())
            .step(
                Step::new(
                    "put mistake",
                    RequestTemplate::put("/posts/${post.id}")
                        .body(json!("${post}"))
                        .set("mistake", "Mistake exists"),
                )
                .for_each(self.each_post().having("mistake"))
                .requires_value("posts")
                .accept(StatusSet::of([200, 404])),
            )
    }

    fn name_for_book(&self) -> Scenario {
        Scenario::new("add nameforbook to every post")
            .tag("crud")
            .step(fetch_posts())
            .step(
                Step::new(
                    "put nameforbook",
                    RequestTemplate::put("/posts/${post.id}")
                        .bearer(TOKEN_FIXTURE)
                        .body(json!("${post}"))
                        .set("nameforbook", "${nameforbook}"),
                )
                .for_each(self.each_post())
                .generate("nameforbook", GeneratorKind::Words)
                .requires_value("posts")
                .accept(StatusSet::exactly(200))
                .assert(Assertion::property_equals("nameforbook", "${nameforbook}")),
            )
    }

    fn marker_round_trip(&self) -> Scenario {
        let marker_ref = format!("${{{MARKER_PROPERTY}}}");

        Scenario::new("add then remove a marker field")
            .tag("crud")
            .step(fetch_posts())
            .step(
                Step::new(
                    "add marker",
                    RequestTemplate::put("/posts/${post.id}")
                        .bearer(TOKEN_FIXTURE)
                        .body(json!("${post}"))
                        .set(MARKER_PROPERTY, marker_ref.as_str()),
                )
                .for_each(self.each_post())
                .generate(MARKER_PROPERTY, GeneratorKind::Words)
                .requires_value("posts")
                .accept(StatusSet::exactly(200))
                .assert(Assertion::property_equals(MARKER_PROPERTY, marker_ref.as_str())),
            )
            .step(
                Step::new(
                    "remove marker",
                    RequestTemplate::put("/posts/${post.id}")
                        .bearer(TOKEN_FIXTURE)
                        .body(json!("${post}"))
                        .unset(MARKER_PROPERTY),
                )
                .for_each(self.each_post())
                .requires_value("posts")
                .accept(StatusSet::exactly(200)),
            )
            .step(
                Step::new("marker is gone", RequestTemplate::get("/posts/${post.id}"))
                    .for_each(self.each_post())
                    .requires_value("posts")
                    .accept(StatusSet::exactly(200))
                    .assert(Assertion::property_absent(MARKER_PROPERTY)),
            )
    }
}

fn register_user() -> Scenario {
    Scenario::new("register a new user")
        .tag("auth")
        .describe("Registers a generated user and stores the bearer credential")
        .step(
            Step::new(
                "register",
                RequestTemplate::post("/register")
                    .body(json!({"email": "${email}", "password": "${password}"})),
            )
            .generate("email", GeneratorKind::Email)
            .generate("password", GeneratorKind::Password)
            .accept(StatusSet::exactly(201))
            .assert(Assertion::has_property("accessToken"))
            .capture(Capture::body("token", "accessToken"))
            .capture(Capture::whole_body("registration").persist(TOKEN_FIXTURE)),
        )
}

fn list_posts() -> Scenario {
    Scenario::new("get all posts").step(
        Step::new("list posts", RequestTemplate::get("/posts"))
            .accept(StatusSet::exactly(200))
            .assert(Assertion::header_contains("content-type", "application/json")),
    )
}

fn posts_by_id() -> Scenario {
    Scenario::new("get posts 55 and 60").step(
        Step::new(
            "filter by id",
            RequestTemplate::get("/posts").query("id", "55").query("id", "60"),
        )
        .accept(StatusSet::exactly(200))
        .assert(Assertion::each_item_property_in("id", json!([55, 60]))),
    )
}

fn delete_missing_entity() -> Scenario {
    Scenario::new("delete a missing entity")
        .step(
            Step::new("list posts", RequestTemplate::get("/posts")).accept(StatusSet::exactly(200)),
        )
        .step(
            Step::new(
                "delete missing",
                RequestTemplate::delete("/posts")
                    .bearer(TOKEN_FIXTURE)
                    .body(json!({"missingEntity": "Non-existent entity"})),
            )
            .accept(StatusSet::of([200, 404])),
        )
}

fn fetch_posts() -> Step {
    Step::new("fetch posts", RequestTemplate::get("/posts"))
        .accept(StatusSet::exactly(200))
        .capture(Capture::whole_body("posts"))
}

fn limited_listing() -> RequestTemplate {
    RequestTemplate::get("/posts").query("limit", PAGE_SIZE.to_string())
}

fn new_post() -> Value {
    json!({"id": "${id}", "title": "${title}", "author": "${author}"})
}
