use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::{ElectionStatus, RoundNumber, VoteCount},
    db::{
        election::{Election, ElectionView, RoundResolution},
        position::Position,
    },
    resolver::{percentage, CandidateTally, RoundOutcome},
};

/// Request to start the election for a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartElectionRequest {
    pub position_id: Option<ApiId>,
}

/// An election as shown in listings and returned by state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    pub id: ApiId,
    pub position_id: ApiId,
    pub position_title: String,
    pub description: String,
    pub number_of_seats: u32,
    pub is_executive: bool,
    pub status: ElectionStatus,
    pub is_active: bool,
    pub current_round: RoundNumber,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ElectionSummary {
    pub fn new(election: &Election, position: &Position) -> Self {
        Self {
            id: election.id.into(),
            position_id: position.id.into(),
            position_title: position.title.clone(),
            description: position.description.clone(),
            number_of_seats: position.seat_count,
            is_executive: position.is_executive,
            status: election.status,
            is_active: election.status.is_active(),
            current_round: election.current_round,
            started_at: election.started_at.to_chrono(),
            ended_at: election.ended_at.map(|t| t.to_chrono()),
        }
    }
}

impl From<&ElectionView> for ElectionSummary {
    fn from(view: &ElectionView) -> Self {
        Self::new(&view.election, &view.position)
    }
}

/// List of elections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionList {
    pub elections: Vec<ElectionSummary>,
}

/// One election, after a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub election: ElectionSummary,
}

/// A candidate named in a round report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCandidate {
    pub application_id: ApiId,
    pub display_name: String,
    pub vote_count: VoteCount,
    pub percentage: u64,
}

impl RoundCandidate {
    fn new(candidate: &CandidateTally, total_votes: VoteCount) -> Self {
        Self {
            application_id: candidate.application_id.into(),
            display_name: candidate.display_name.clone(),
            vote_count: candidate.votes,
            percentage: percentage(candidate.votes, total_votes),
        }
    }
}

/// What ending a round decided, as reported to the admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub election: ElectionSummary,
    pub round_number: RoundNumber,
    pub needs_next_round: bool,
    pub election_complete: bool,
    pub no_majority: bool,
    pub total_votes: VoteCount,
    pub required_votes: VoteCount,
    pub winners_count: u32,
    pub total_seats: u32,
    pub remaining_seats: u32,
    /// The round's winner, if the 2/3 threshold was met.
    pub winner: Option<RoundCandidate>,
    /// The leading candidate when nobody won; absent if no votes were cast.
    pub top_candidate: Option<RoundCandidate>,
}

impl RoundReport {
    /// A one-line description of the outcome.
    pub fn message(&self) -> String {
        match (&self.winner, self.election_complete) {
            (Some(_), true) => format!("Election complete! All {} seats filled.", self.total_seats),
            (Some(winner), false) => format!(
                "Round {} ended. {} wins!",
                self.round_number, winner.display_name
            ),
            (None, _) if self.total_votes == 0 => "Round ended with no votes cast".to_string(),
            (None, _) => format!(
                "Round {} ended. No candidate achieved 2/3 majority ({} votes required).",
                self.round_number, self.required_votes
            ),
        }
    }
}

impl From<&RoundResolution> for RoundReport {
    fn from(resolution: &RoundResolution) -> Self {
        let total_votes = resolution.tally.total_votes;
        let seats = resolution.position.seat_count;
        let (winner, top_candidate) = match &resolution.outcome {
            RoundOutcome::Complete { winner, .. } | RoundOutcome::AwaitingNextRound { winner, .. } => {
                (Some(RoundCandidate::new(winner, total_votes)), None)
            }
            RoundOutcome::NoMajority { leader, .. } => (
                None,
                leader.as_ref().map(|l| RoundCandidate::new(l, total_votes)),
            ),
        };
        Self {
            election: ElectionSummary::new(&resolution.election, &resolution.position),
            round_number: resolution.round,
            needs_next_round: matches!(resolution.outcome, RoundOutcome::AwaitingNextRound { .. }),
            election_complete: matches!(resolution.outcome, RoundOutcome::Complete { .. }),
            no_majority: matches!(resolution.outcome, RoundOutcome::NoMajority { .. }),
            total_votes,
            required_votes: resolution.tally.required_votes,
            winners_count: resolution.winners,
            total_seats: seats,
            remaining_seats: seats.saturating_sub(resolution.winners),
            winner,
            top_candidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        db::{
            application::Application,
            election::ElectionCore,
            position::PositionCore,
        },
        mongodb::Id,
        resolver::{resolve, Tally},
    };

    fn resolution(seats: u32, prior_winners: u32, counts: &[usize]) -> RoundResolution {
        let position = Position {
            id: Id::example(200),
            position: PositionCore::new("Social Chair", "", seats, false).unwrap(),
        };
        let pool = (0..counts.len() as u8)
            .map(|i| Application::example(Id::example(i + 1), &format!("Candidate {}", i + 1)))
            .collect::<Vec<_>>();
        let choices = pool
            .iter()
            .zip(counts)
            .flat_map(|(a, &n)| std::iter::repeat(a.id).take(n))
            .collect::<Vec<_>>();
        let tally = Tally::count(&pool, choices);
        let outcome = resolve(&tally, prior_winners, seats);
        let election = Election {
            id: Id::example(10),
            election: ElectionCore {
                status: outcome.status(),
                current_round: 2,
                ..ElectionCore::start(position.id)
            },
        };
        let winners = prior_winners + u32::from(outcome.winner().is_some());
        RoundResolution {
            election,
            position,
            round: 2,
            tally,
            outcome,
            winners,
        }
    }

    #[test]
    fn winner_with_seats_remaining() {
        let report = RoundReport::from(&resolution(3, 0, &[7, 2]));
        assert!(report.needs_next_round);
        assert!(!report.election_complete);
        assert_eq!((report.winners_count, report.remaining_seats), (1, 2));
        assert_eq!(report.message(), "Round 2 ended. Candidate 1 wins!");
        assert_eq!(report.winner.unwrap().percentage, 78);
        assert!(!report.election.is_active);
    }

    #[test]
    fn last_seat_completes() {
        let report = RoundReport::from(&resolution(3, 2, &[1, 6]));
        assert!(report.election_complete);
        assert_eq!(report.remaining_seats, 0);
        assert_eq!(report.message(), "Election complete! All 3 seats filled.");
    }

    #[test]
    fn no_majority_names_the_leader() {
        let report = RoundReport::from(&resolution(1, 0, &[5, 2, 1]));
        assert!(report.no_majority);
        assert_eq!(report.winner, None);
        let leader = report.top_candidate.as_ref().unwrap();
        assert_eq!((leader.vote_count, leader.percentage), (5, 63));
        assert_eq!(
            report.message(),
            "Round 2 ended. No candidate achieved 2/3 majority (6 votes required)."
        );
    }

    #[test]
    fn empty_round() {
        let report = RoundReport::from(&resolution(1, 0, &[0, 0]));
        assert!(report.no_majority);
        assert_eq!(report.top_candidate, None);
        assert_eq!(report.message(), "Round ended with no votes cast");
    }
}
