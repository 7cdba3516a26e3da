//! Room codes players type to join a game.
//!
//! Codes are two or three lower-case words ("sunny creek inn"). Lookups are
//! case-insensitive: both generated and typed codes go through
//! [`normalize_room_code`].

use rand::prelude::*;

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "dizzy", "eager", "fuzzy", "gentle", "happy", "icy", "jolly",
    "lucky", "misty", "noble", "odd", "proud", "quiet", "rapid", "sunny", "tiny", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "canyon", "creek", "falcon", "garden", "harbor", "island", "lantern", "meadow",
    "otter", "pebble", "river", "rocket", "saddle", "tiger", "valley", "walrus", "willow",
];

const PLACES: &[&str] = &[
    "inn", "tower", "docks", "fair", "hall", "lodge", "market", "mill", "park", "yard",
];

/// Generate a code with the thread-local RNG.
pub fn generate_room_code() -> String {
    generate_room_code_with(&mut rand::rng())
}

/// Generate a code from `rng`; deterministic for a seeded RNG.
pub fn generate_room_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut words = vec![pick(ADJECTIVES, rng), pick(NOUNS, rng)];
    if rng.random_bool(0.5) {
        words.push(pick(PLACES, rng));
    }
    words.join(" ")
}

fn pick<R: Rng + ?Sized>(list: &[&'static str], rng: &mut R) -> &'static str {
    list.choose(rng).copied().unwrap_or("room")
}

/// Trim, lower-case and collapse inner whitespace.
pub fn normalize_room_code(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
