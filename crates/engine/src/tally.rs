//! Per-round vote accumulation.
//!
//! Rules applied to every ballot, in order:
//! - Target must be one of the round's candidates: DROP
//! - Target equal to the voter: DROP
//! - Second ballot from the same voter: DROP
//!
//! Resolution is plurality. A shared maximum is a tie and eliminates nobody;
//! there is no random tie-break.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::player::PlayerId;

/// Rejected ballot. The tally is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("roster index {0} is not an active player")]
    InvalidTarget(usize),
    #[error("players cannot vote for themselves")]
    SelfVote,
    #[error("already voted this round")]
    AlreadyVoted,
}

/// Progress after an accepted ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyProgress {
    pub cast: usize,
    pub eligible: usize,
}

impl TallyProgress {
    pub fn is_complete(&self) -> bool {
        self.cast == self.eligible
    }

    pub fn remaining(&self) -> usize {
        self.eligible - self.cast
    }
}

/// How a completed round resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundResult {
    /// Two or more candidates share the maximum; nobody is eliminated.
    Tie { leaders: Vec<usize>, votes: u32 },
    /// A single candidate holds strictly the most votes.
    Decisive { index: usize, votes: u32 },
}

/// Ballots for one voting round.
///
/// Candidates and voters are the same set: the players active when the round
/// opened, referenced by roster index.
#[derive(Debug, Clone)]
pub struct VoteTally {
    eligible_voters: usize,
    cast_by: HashSet<PlayerId>,
    /// Candidate roster index → votes received.
    counts: BTreeMap<usize, u32>,
}

impl VoteTally {
    /// Open a round over the given active roster indices.
    pub fn open<I>(active_indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let counts: BTreeMap<usize, u32> = active_indices.into_iter().map(|i| (i, 0)).collect();
        Self {
            eligible_voters: counts.len(),
            cast_by: HashSet::new(),
            counts,
        }
    }

    pub fn eligible_voters(&self) -> usize {
        self.eligible_voters
    }

    pub fn cast(&self) -> usize {
        self.cast_by.len()
    }

    pub fn has_voted(&self, voter: PlayerId) -> bool {
        self.cast_by.contains(&voter)
    }

    pub fn is_candidate(&self, index: usize) -> bool {
        self.counts.contains_key(&index)
    }

    /// Votes per candidate, ordered by roster index.
    pub fn counts(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.counts.iter().map(|(&index, &votes)| (index, votes))
    }

    /// Record a ballot from `voter` (sitting at `voter_index`) against `target`.
    ///
    /// # Panics
    /// If more ballots are accepted than there are eligible voters, which
    /// means the caller let a non-participant vote.
    pub fn record(
        &mut self,
        voter: PlayerId,
        voter_index: usize,
        target: usize,
    ) -> Result<TallyProgress, BallotError> {
        if !self.counts.contains_key(&target) {
            return Err(BallotError::InvalidTarget(target));
        }
        if target == voter_index {
            return Err(BallotError::SelfVote);
        }
        if self.cast_by.contains(&voter) {
            return Err(BallotError::AlreadyVoted);
        }
        assert!(
            self.cast_by.len() < self.eligible_voters,
            "ballot accepted beyond the {} eligible voters",
            self.eligible_voters
        );

        self.cast_by.insert(voter);
        *self.counts.entry(target).or_insert(0) += 1;

        Ok(TallyProgress {
            cast: self.cast_by.len(),
            eligible: self.eligible_voters,
        })
    }

    /// Resolve the round, consuming the tally.
    ///
    /// # Panics
    /// If the round has no candidates.
    pub fn resolve(self) -> RoundResult {
        let votes = self
            .counts
            .values()
            .copied()
            .max()
            .unwrap_or_else(|| unreachable!("vote round opened without candidates"));
        let leaders: Vec<usize> = self
            .counts
            .into_iter()
            .filter(|&(_, count)| count == votes)
            .map(|(index, _)| index)
            .collect();

        match leaders.as_slice() {
            [index] => RoundResult::Decisive {
                index: *index,
                votes,
            },
            _ => RoundResult::Tie { leaders, votes },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Voter ids are 100 + roster index.
    fn cast_all(tally: &mut VoteTally, targets: &[usize]) -> TallyProgress {
        let mut progress = None;
        for (voter_index, &target) in targets.iter().enumerate() {
            progress = Some(
                tally
                    .record(100 + voter_index as PlayerId, voter_index, target)
                    .unwrap(),
            );
        }
        progress.unwrap()
    }

    #[test]
    fn test_open_counts_every_candidate() {
        let tally = VoteTally::open([0, 2, 3]);
        assert_eq!(tally.eligible_voters(), 3);
        assert_eq!(tally.counts().collect::<Vec<_>>(), vec![(0, 0), (2, 0), (3, 0)]);
        assert!(!tally.is_candidate(1));
    }

    #[test]
    fn test_tie_between_two() {
        let mut tally = VoteTally::open(0..4);
        let progress = cast_all(&mut tally, &[1, 2, 1, 2]);
        assert!(progress.is_complete());
        assert_eq!(
            tally.resolve(),
            RoundResult::Tie {
                leaders: vec![1, 2],
                votes: 2
            }
        );
    }

    #[test]
    fn test_decisive() {
        let mut tally = VoteTally::open(0..4);
        // Index 0 cannot vote for itself, so it votes for 2.
        cast_all(&mut tally, &[2, 0, 0, 0]);
        assert_eq!(tally.resolve(), RoundResult::Decisive { index: 0, votes: 3 });
    }

    #[test]
    fn test_all_different_is_tie() {
        let mut tally = VoteTally::open(0..3);
        cast_all(&mut tally, &[1, 2, 0]);
        assert!(matches!(tally.resolve(), RoundResult::Tie { votes: 1, .. }));
    }

    #[test]
    fn test_rejections_leave_tally_unchanged() {
        let mut tally = VoteTally::open([0, 1, 3]);

        assert_eq!(tally.record(100, 0, 2), Err(BallotError::InvalidTarget(2)));
        assert_eq!(tally.record(100, 0, 9), Err(BallotError::InvalidTarget(9)));
        assert_eq!(tally.record(100, 0, 0), Err(BallotError::SelfVote));
        assert_eq!(tally.cast(), 0);

        let progress = tally.record(100, 0, 1).unwrap();
        assert_eq!(progress.remaining(), 2);
        assert!(tally.has_voted(100));

        assert_eq!(tally.record(100, 0, 3), Err(BallotError::AlreadyVoted));
        assert_eq!(tally.cast(), 1);
        assert_eq!(tally.counts().collect::<Vec<_>>(), vec![(0, 0), (1, 1), (3, 0)]);
    }

    #[test]
    fn test_self_vote_checked_before_double_vote() {
        let mut tally = VoteTally::open(0..3);
        tally.record(100, 0, 1).unwrap();
        assert_eq!(tally.record(100, 0, 0), Err(BallotError::SelfVote));
    }

    #[test]
    #[should_panic(expected = "eligible voters")]
    fn test_overvote_is_a_caller_bug() {
        let mut tally = VoteTally::open(0..2);
        tally.record(100, 0, 1).unwrap();
        tally.record(101, 1, 0).unwrap();
        let _ = tally.record(102, 5, 0);
    }
}
