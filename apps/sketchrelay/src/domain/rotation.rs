//! Who writes and who draws, as positions on the ring of players sorted by
//! `turn_order`.
//!
//! For a chain started by ring position `o`, round `r` is captioned by
//! `(o + r - 1) mod n` and drawn by `(o + r) mod n`. Every function is total:
//! an empty ring yields `None`, a ring of one maps everything to position 0.

use crate::domain::model::Player;

/// Sort a roster into ring order.
pub fn ring(players: &[Player]) -> Vec<Player> {
    let mut ring = players.to_vec();
    ring.sort_by_key(|p| (p.turn_order, p.id));
    ring
}

/// Position of `player_id` in a ring already sorted by [`ring`].
pub fn ring_index(ring: &[Player], player_id: i64) -> Option<usize> {
    ring.iter().position(|p| p.id == player_id)
}

/// Who illustrates the prompt written by `author`.
pub fn drawer_for(author: usize, n: usize) -> Option<usize> {
    (author + 1).checked_rem(n)
}

/// Whose prompt `drawer` illustrates: their ring predecessor.
pub fn prompt_source_for(drawer: usize, n: usize) -> Option<usize> {
    (drawer % n.max(1) + n.saturating_sub(1)).checked_rem(n)
}

/// Prompt author of round `round` in the chain started by `origin`.
pub fn chain_prompt_author(origin: usize, round: i32, n: usize) -> Option<usize> {
    let offset = usize::try_from(round.checked_sub(1)?).ok()?;
    offset.checked_rem(n).map(|o| (origin + o) % n)
}

/// Animation author of round `round` in the chain started by `origin`.
pub fn chain_drawer(origin: usize, round: i32, n: usize) -> Option<usize> {
    let author = chain_prompt_author(origin, round, n)?;
    drawer_for(author, n)
}

/// The chain a player contributes to in `round`: the origin whose chain their
/// prompt of that round belongs to.
pub fn chain_origin_of_author(author: usize, round: i32, n: usize) -> Option<usize> {
    let offset = usize::try_from(round.checked_sub(1)?).ok()?;
    let offset = offset.checked_rem(n)?;
    Some((author % n + n - offset) % n)
}
