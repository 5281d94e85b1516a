// Short code generation for session identifiers

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const HUMAN_FRIENDLY: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789"; // No I, O, 0, 1 to avoid confusion

/// Character set a short code is drawn from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Alphabet {
    /// Lowercase letters and digits
    Alphanumeric,
    /// Uppercase letters and digits without visually ambiguous characters
    #[default]
    HumanFriendly,
}

impl Alphabet {
    pub fn chars(&self) -> &'static [u8] {
        match self {
            Alphabet::Alphanumeric => ALPHANUMERIC,
            Alphabet::HumanFriendly => HUMAN_FRIENDLY,
        }
    }

    /// Map user input onto the alphabet's canonical case.
    pub fn normalize(&self, code: &str) -> String {
        let trimmed = code.trim();
        match self {
            Alphabet::Alphanumeric => trimmed.to_ascii_lowercase(),
            Alphabet::HumanFriendly => trimmed.to_ascii_uppercase(),
        }
    }

    /// Whether `code` (already normalized) could have been generated with this
    /// alphabet and length.
    pub fn accepts(&self, code: &str, length: usize) -> bool {
        code.len() == length && code.bytes().all(|b| self.chars().contains(&b))
    }

    /// Number of distinct codes of `length`, saturating at `u64::MAX`.
    pub fn code_space(&self, length: usize) -> u64 {
        let base = self.chars().len() as u64;
        (0..length).fold(1u64, |acc, _| acc.saturating_mul(base))
    }
}

/// Source of candidate session codes.
///
/// Generators make no uniqueness promise; the session manager checks every
/// candidate against the store.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

fn sample<R: Rng + ?Sized>(rng: &mut R, alphabet: Alphabet, length: usize) -> String {
    let chars = alphabet.chars();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..chars.len());
            chars[idx] as char
        })
        .collect()
}

/// Generator backed by the thread-local RNG
#[derive(Debug, Clone, Default)]
pub struct RandomCodeGenerator {
    alphabet: Alphabet,
}

impl RandomCodeGenerator {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> String {
        sample(&mut rand::thread_rng(), self.alphabet, length)
    }
}

/// Deterministic generator for reproducible runs
pub struct SeededCodeGenerator {
    alphabet: Alphabet,
    rng: Mutex<StdRng>,
}

impl SeededCodeGenerator {
    pub fn new(alphabet: Alphabet, seed: u64) -> Self {
        Self {
            alphabet,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl CodeGenerator for SeededCodeGenerator {
    fn generate(&self, length: usize) -> String {
        // A poisoned lock still holds a usable RNG
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sample(&mut *rng, self.alphabet, length)
    }
}
