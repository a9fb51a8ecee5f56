//! Random test data.
//!
//! The harness only needs values that are distinct enough per run; the
//! [`Generator`] trait keeps the source swappable (a seeded generator makes
//! runs reproducible).

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Dennis", "Edsger", "Frances", "Grace", "Hedy",
    "John", "Katherine", "Ken", "Linus", "Margaret", "Niklaus", "Radia", "Sophie", "Tim",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Cerf", "Dijkstra", "Hamilton", "Hopper", "Kahn", "Knuth", "Lamport",
    "Liskov", "Lovelace", "Perlman", "Ritchie", "Thompson", "Turing", "Wilson", "Wirth",
];

const COMPANY_SUFFIXES: &[&str] = &["Group", "LLC", "Inc", "and Sons", "Labs", "Partners"];

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed",
    "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna",
    "aliqua", "enim", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco",
];

/// Kinds of generated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// An email address.
    Email,
    /// A 12-character alphanumeric password.
    Password,
    /// Three lowercase words separated by spaces.
    Words,
    /// A positive integer.
    Number,
    /// A company name.
    CompanyName,
    /// A person's full name.
    PersonName,
    /// A v4 UUID string.
    Uuid,
}

/// A source of generated values.
pub trait Generator: Send + Sync {
    /// Produces a fresh value of the given kind.
    fn generate(&self, kind: GeneratorKind) -> Value;
}

/// [`Generator`] backed by a `rand` RNG.
pub struct RandomGenerator {
    rng: Mutex<StdRng>,
}

impl RandomGenerator {
    /// Creates a generator seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

impl Generator for RandomGenerator {
    fn generate(&self, kind: GeneratorKind) -> Value {
        let mut rng = self.rng.lock();
        match kind {
            GeneratorKind::Email => {
                let first = pick(&mut rng, FIRST_NAMES).to_ascii_lowercase();
                let last = pick(&mut rng, LAST_NAMES).to_ascii_lowercase();
                let n: u32 = rng.gen_range(1_000..1_000_000);
                Value::String(format!("{first}.{last}{n}@example.com"))
            }
            GeneratorKind::Password => {
                let password: String = (&mut *rng)
                    .sample_iter(&Alphanumeric)
                    .take(12)
                    .map(char::from)
                    .collect();
                Value::String(password)
            }
            GeneratorKind::Words => {
                let words: Vec<&str> = (0..3).map(|_| pick(&mut rng, WORDS)).collect();
                Value::String(words.join(" "))
            }
            // Well above typical seed data ids to avoid collisions.
            GeneratorKind::Number => Value::from(rng.gen_range(100_000u64..1_000_000_000)),
            GeneratorKind::CompanyName => {
                let last = pick(&mut rng, LAST_NAMES);
                let suffix = pick(&mut rng, COMPANY_SUFFIXES);
                Value::String(format!("{last} {suffix}"))
            }
            GeneratorKind::PersonName => {
                let first = pick(&mut rng, FIRST_NAMES);
                let last = pick(&mut rng, LAST_NAMES);
                Value::String(format!("{first} {last}"))
            }
            GeneratorKind::Uuid => {
                let bytes: [u8; 16] = rng.r#gen();
                Value::String(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
            }
        }
    }
}
