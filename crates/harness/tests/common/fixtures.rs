//! Seed data for the mock service.

use serde_json::{Value, json};

/// Number of seeded posts.
pub const SEED_POST_COUNT: u64 = 60;

/// Posts whose id is a multiple of this carry a `mistake` field.
pub const MISTAKE_EVERY: u64 = 15;

/// Builds a seed post.
pub fn post(id: u64) -> Value {
    let mut post = json!({
        "id": id,
        "title": format!("Post number {id}"),
        "author": format!("Author {}", id % 7),
    });
    if id % MISTAKE_EVERY == 0 {
        post["mistake"] = json!("teh typo");
    }
    post
}

/// The full seed listing, ids 1 through 60.
pub fn seed_posts() -> Vec<Value> {
    (1..=SEED_POST_COUNT).map(post).collect()
}

/// A json-server `db.json` holding the seed posts.
pub fn seed_db() -> Value {
    json!({
        "posts": seed_posts(),
        "comments": [],
        "users": []
    })
}
