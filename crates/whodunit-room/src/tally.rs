//! Decision primitives shared by every ruleset: ballots, tallies, and the
//! quorum check that gates every phase transition.
//!
//! A phase ends only when every eligible participant has acted. The
//! eligible set is always passed in fresh by the caller, computed from
//! who is still present, so a member who disconnects stops counting
//! toward the quorum the moment they leave.

use std::collections::HashMap;

use whodunit_protocol::{PlayerId, TallyEntry};

/// Returns `true` when every member of a non-empty `eligible` set has
/// acted.
///
/// An empty set never reaches quorum: a round whose participants all left
/// has nobody to decide anything and waits for the host to start over.
pub fn quorum_reached<F>(eligible: &[PlayerId], has_acted: F) -> bool
where
    F: Fn(PlayerId) -> bool,
{
    !eligible.is_empty() && eligible.iter().all(|&id| has_acted(id))
}

/// One vote per voter for the current decision phase.
#[derive(Debug, Clone, Default)]
pub struct Ballots {
    cast: HashMap<PlayerId, PlayerId>,
}

impl Ballots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `voter`'s choice, replacing any earlier one. Returns the
    /// replaced target.
    pub fn cast(&mut self, voter: PlayerId, target: PlayerId) -> Option<PlayerId> {
        self.cast.insert(voter, target)
    }

    pub fn has_voted(&self, voter: PlayerId) -> bool {
        self.cast.contains_key(&voter)
    }

    pub fn vote_of(&self, voter: PlayerId) -> Option<PlayerId> {
        self.cast.get(&voter).copied()
    }

    pub fn len(&self) -> usize {
        self.cast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cast.is_empty()
    }

    pub fn clear(&mut self) {
        self.cast.clear();
    }

    /// Drops everything involving a departed member: their own ballot and
    /// every ballot naming them. Voters who named them must vote again.
    ///
    /// Returns `true` if any ballot was dropped.
    pub fn forget(&mut self, player: PlayerId) -> bool {
        let before = self.cast.len();
        self.cast
            .retain(|&voter, &mut target| voter != player && target != player);
        self.cast.len() != before
    }

    /// Counts ballots, scanning voters in `voter_order`.
    ///
    /// Candidates appear in the tally in the order they first receive a
    /// vote during that scan, which fixes the tie-break in
    /// [`Tally::leader`]. Ballots from voters missing from `voter_order`
    /// are not counted.
    pub fn tally(&self, voter_order: &[PlayerId]) -> Tally {
        let mut counts: Vec<(PlayerId, u32)> = Vec::new();
        for voter in voter_order {
            let Some(&target) = self.cast.get(voter) else {
                continue;
            };
            match counts.iter_mut().find(|(candidate, _)| *candidate == target) {
                Some((_, n)) => *n += 1,
                None => counts.push((target, 1)),
            }
        }
        Tally { counts }
    }
}

/// Vote counts per candidate in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: Vec<(PlayerId, u32)>,
}

impl Tally {
    /// The accused candidate.
    ///
    /// A single pass in first-seen order keeps the first candidate to
    /// reach the maximum; a later candidate with an equal count does not
    /// displace it. This tie-break is arbitrary but deterministic and is
    /// kept as-is for behavioral compatibility.
    pub fn leader(&self) -> Option<PlayerId> {
        let mut best: Option<(PlayerId, u32)> = None;
        for &(candidate, n) in &self.counts {
            if best.is_none_or(|(_, max)| n > max) {
                best = Some((candidate, n));
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    pub fn count(&self, candidate: PlayerId) -> u32 {
        self.counts
            .iter()
            .find(|(c, _)| *c == candidate)
            .map_or(0, |&(_, n)| n)
    }

    /// Sum of all counted ballots.
    pub fn total(&self) -> u32 {
        self.counts.iter().map(|&(_, n)| n).sum()
    }

    pub fn entries(&self) -> Vec<TallyEntry> {
        self.counts
            .iter()
            .map(|&(player, votes)| TallyEntry { player, votes })
            .collect()
    }
}
