//! Set-based phase completion.

use std::collections::BTreeSet;

use crate::domain::model::Player;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuorumCount {
    pub player_count: usize,
    /// Roster members with at least one submission, ascending.
    pub submitted: Vec<i64>,
    /// Roster members without a submission, ascending.
    pub missing: Vec<i64>,
    /// Submitting ids that are not on the roster. Never counted.
    pub strangers: Vec<i64>,
}

impl QuorumCount {
    pub fn satisfied(&self) -> bool {
        self.player_count > 0 && self.missing.is_empty()
    }
}

/// Compare the distinct submitting ids against the roster.
pub fn count_quorum<I>(roster: &[Player], submitted_ids: I) -> QuorumCount
where
    I: IntoIterator<Item = i64>,
{
    let roster_ids: BTreeSet<i64> = roster.iter().map(|p| p.id).collect();
    let submitted_ids: BTreeSet<i64> = submitted_ids.into_iter().collect();

    QuorumCount {
        player_count: roster_ids.len(),
        submitted: roster_ids.intersection(&submitted_ids).copied().collect(),
        missing: roster_ids.difference(&submitted_ids).copied().collect(),
        strangers: submitted_ids.difference(&roster_ids).copied().collect(),
    }
}
