use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{election::ElectionSummary, id::ApiId},
    common::election::{RoundNumber, VoteCount},
    db::{election::ElectionResults, round::Round},
    resolver::{percentage, Tally},
};

/// One candidate's standing in the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub application_id: ApiId,
    pub display_name: String,
    pub vote_count: VoteCount,
    pub percentage: u64,
    pub meets_threshold: bool,
}

/// The current round's tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResults {
    pub round_number: RoundNumber,
    pub total_votes: VoteCount,
    pub required_votes: VoteCount,
    pub candidates: Vec<CandidateResult>,
}

impl RoundResults {
    pub fn new(round_number: RoundNumber, tally: &Tally) -> Self {
        Self {
            round_number,
            total_votes: tally.total_votes,
            required_votes: tally.required_votes,
            candidates: tally
                .candidates
                .iter()
                .map(|c| CandidateResult {
                    application_id: c.application_id.into(),
                    display_name: c.display_name.clone(),
                    vote_count: c.votes,
                    percentage: percentage(c.votes, tally.total_votes),
                    meets_threshold: tally.meets_threshold(c),
                })
                .collect(),
        }
    }
}

/// A seat won in an earlier (or the latest) round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerResult {
    pub application_id: ApiId,
    pub display_name: String,
    pub vote_count: VoteCount,
    pub round_number: RoundNumber,
}

/// When a round was open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPeriod {
    pub round_number: RoundNumber,
    pub started_at: DateTime<Utc>,
    /// Absent while the round is open.
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&Round> for RoundPeriod {
    fn from(round: &Round) -> Self {
        Self {
            round_number: round.number,
            started_at: round.started_at.to_chrono(),
            ended_at: round.ended_at.map(|t| t.to_chrono()),
        }
    }
}

/// Live results of an election.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResultsDescription {
    pub election: ElectionSummary,
    pub results: RoundResults,
    /// Ordered by round, then by vote count descending.
    pub winners: Vec<WinnerResult>,
    /// Every round held so far, oldest first.
    pub rounds: Vec<RoundPeriod>,
}

impl From<&ElectionResults> for ElectionResultsDescription {
    fn from(results: &ElectionResults) -> Self {
        Self {
            election: ElectionSummary::from(&results.view),
            results: RoundResults::new(results.view.election.current_round, &results.tally),
            winners: results
                .winners
                .iter()
                .map(|(winner, name)| WinnerResult {
                    application_id: winner.application_id.into(),
                    display_name: name.clone(),
                    vote_count: winner.votes,
                    round_number: winner.round,
                })
                .collect(),
            rounds: results.rounds.iter().map(RoundPeriod::from).collect(),
        }
    }
}
