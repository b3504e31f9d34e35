use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::RoundNumber,
    db::vote::{Vote, VoteRecord},
};

/// A member's choice for the open round of an election.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub election_id: Option<ApiId>,
    pub application_id: Option<ApiId>,
}

/// Confirmation of a cast vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub id: ApiId,
    pub election_id: ApiId,
    pub round_number: RoundNumber,
    pub application_id: ApiId,
}

impl From<&Vote> for VoteReceipt {
    fn from(vote: &Vote) -> Self {
        Self {
            id: vote.id.into(),
            election_id: vote.election_id.into(),
            round_number: vote.round,
            application_id: vote.application_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteReceiptDescription {
    pub vote: VoteReceipt,
}

/// Whether the caller has voted in the election's current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVoted {
    pub has_voted: bool,
    pub round_number: RoundNumber,
}

/// One entry of a member's voting history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteHistoryEntry {
    pub id: ApiId,
    pub election_id: ApiId,
    pub round_number: RoundNumber,
    pub application_id: ApiId,
    pub position_title: String,
    pub candidate_name: String,
    pub voted_at: DateTime<Utc>,
}

impl From<&VoteRecord> for VoteHistoryEntry {
    fn from(record: &VoteRecord) -> Self {
        Self {
            id: record.vote.id.into(),
            election_id: record.vote.election_id.into(),
            round_number: record.vote.round,
            application_id: record.vote.application_id.into(),
            position_title: record.position_title.clone(),
            candidate_name: record.candidate_name.clone(),
            voted_at: record.vote.voted_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteHistory {
    pub votes: Vec<VoteHistoryEntry>,
}
