//! Round resolution: tallying a round's votes and applying the 2/3 majority rule.
//!
//! Everything here is pure; reading the ledgers and persisting the outcome is
//! done by [`crate::model::db::election::end_round`].

use std::collections::HashMap;

use crate::model::{
    common::election::{ElectionStatus, VoteCount},
    db::application::Application,
    mongodb::Id,
};

/// Votes needed to win a round: `ceil(2 * total / 3)`.
pub fn required_votes(total_votes: VoteCount) -> VoteCount {
    (total_votes * 2 + 2) / 3
}

/// Share of `total_votes`, as a whole percentage rounded half up.
pub fn percentage(votes: VoteCount, total_votes: VoteCount) -> u64 {
    if total_votes == 0 {
        0
    } else {
        (votes * 200 + total_votes) / (total_votes * 2)
    }
}

/// One candidate's count in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTally {
    pub application_id: Id,
    pub display_name: String,
    pub votes: VoteCount,
}

/// The count of one round over the candidate pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    /// Every candidate in the pool, including those with no votes, ordered by
    /// votes descending. Ties keep the lowest application ID first.
    pub candidates: Vec<CandidateTally>,
    pub total_votes: VoteCount,
    pub required_votes: VoteCount,
}

impl Tally {
    /// Count `choices` (the application ID of each vote cast this round) for
    /// the candidates in `pool`.
    ///
    /// Votes for applications outside the pool are not counted; the vote
    /// ledger refuses them at cast time, so this only matters for catalog
    /// changes made mid-election.
    pub fn count(pool: &[Application], choices: impl IntoIterator<Item = Id>) -> Self {
        let mut counts: HashMap<Id, VoteCount> = pool.iter().map(|a| (a.id, 0)).collect();
        for choice in choices {
            if let Some(count) = counts.get_mut(&choice) {
                *count += 1;
            }
        }

        let mut candidates = pool
            .iter()
            .map(|application| CandidateTally {
                application_id: application.id,
                display_name: application.candidate.display_name().to_string(),
                votes: counts[&application.id],
            })
            .collect::<Vec<_>>();
        candidates.sort_by_key(|c| c.application_id);
        // Stable, so equal counts stay in ID order.
        candidates.sort_by(|a, b| b.votes.cmp(&a.votes));

        let total_votes = candidates.iter().map(|c| c.votes).sum();
        Self {
            candidates,
            total_votes,
            required_votes: required_votes(total_votes),
        }
    }

    /// The candidate with the most votes, if there is anyone in the pool.
    pub fn leader(&self) -> Option<&CandidateTally> {
        self.candidates.first()
    }

    /// Whether `candidate` has reached the 2/3 threshold. An empty round
    /// never meets it.
    pub fn meets_threshold(&self, candidate: &CandidateTally) -> bool {
        self.total_votes > 0 && candidate.votes >= self.required_votes
    }

    /// The round winner, if the leader reached the threshold.
    pub fn winner(&self) -> Option<&CandidateTally> {
        self.leader().filter(|leader| self.meets_threshold(leader))
    }
}

/// What ending a round decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The winner took the last open seat.
    Complete {
        winner: CandidateTally,
        winners: u32,
        seats: u32,
    },
    /// The winner took a seat and more remain; another round is needed.
    AwaitingNextRound {
        winner: CandidateTally,
        winners: u32,
        seats: u32,
    },
    /// Nobody reached the threshold.
    NoMajority {
        total_votes: VoteCount,
        required_votes: VoteCount,
        /// Absent when no votes were cast.
        leader: Option<CandidateTally>,
    },
}

impl RoundOutcome {
    /// The status the election moves to.
    pub fn status(&self) -> ElectionStatus {
        match self {
            Self::Complete { .. } => ElectionStatus::Complete,
            Self::AwaitingNextRound { .. } => ElectionStatus::AwaitingNextRound,
            Self::NoMajority { .. } => ElectionStatus::EndedNoMajority,
        }
    }

    /// The candidate to add to the winner ledger, if any.
    pub fn winner(&self) -> Option<&CandidateTally> {
        match self {
            Self::Complete { winner, .. } | Self::AwaitingNextRound { winner, .. } => Some(winner),
            Self::NoMajority { .. } => None,
        }
    }
}

/// Decide a round, given its tally, the number of seats already won in
/// earlier rounds and the position's seat count.
pub fn resolve(tally: &Tally, prior_winners: u32, seats: u32) -> RoundOutcome {
    match tally.winner() {
        Some(winner) => {
            let winners = prior_winners + 1;
            let winner = winner.clone();
            if winners >= seats {
                RoundOutcome::Complete {
                    winner,
                    winners,
                    seats,
                }
            } else {
                RoundOutcome::AwaitingNextRound {
                    winner,
                    winners,
                    seats,
                }
            }
        }
        None => RoundOutcome::NoMajority {
            total_votes: tally.total_votes,
            required_votes: tally.required_votes,
            leader: tally.leader().filter(|_| tally.total_votes > 0).cloned(),
        },
    }
}
