//! Latest-wins selection for records that may be written more than once.
//!
//! Rounds, prompts and frame autosaves can all carry duplicates for one
//! logical key. Readers never trust row order: the newest timestamp wins and
//! the higher id breaks ties, so every client picks the same row.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::domain::model::{Frame, Prompt, Round};

/// A record with a write timestamp and a monotonically assigned id.
pub trait Stamped {
    fn stamp(&self) -> (OffsetDateTime, i64);
}

impl Stamped for Round {
    fn stamp(&self) -> (OffsetDateTime, i64) {
        (self.started_at, self.id)
    }
}

impl Stamped for Prompt {
    fn stamp(&self) -> (OffsetDateTime, i64) {
        (self.updated_at, self.id)
    }
}

impl Stamped for Frame {
    fn stamp(&self) -> (OffsetDateTime, i64) {
        (self.saved_at, self.id)
    }
}

/// Keep only the latest record per key.
pub fn latest_by_key<T, K, I, F>(items: I, key: F) -> BTreeMap<K, T>
where
    T: Stamped,
    K: Ord,
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> K,
{
    let mut out: BTreeMap<K, T> = BTreeMap::new();
    for item in items {
        let k = key(&item);
        match out.get(&k) {
            Some(existing) if existing.stamp() >= item.stamp() => {}
            _ => {
                out.insert(k, item);
            }
        }
    }
    out
}

/// The authoritative row for `round_number`, if any exists.
pub fn authoritative_round(rounds: &[Round], round_number: i32) -> Option<&Round> {
    rounds
        .iter()
        .filter(|r| r.round_number == round_number)
        .max_by_key(|r| r.stamp())
}
