use std::collections::HashMap;
use std::ops::Deref;

use mongodb::{
    bson::{doc, DateTime},
    options::FindOptions,
    ClientSession, Database,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{ElectionError, Result};
use crate::model::{
    common::election::RoundNumber,
    db::{application::Application, election::Election, position::Position, winner::Winner},
    mongodb::{
        is_duplicate_key_error, is_write_conflict_error, start_snapshot, start_transaction, Coll,
        Id,
    },
};

/// One member's choice in one round of one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub election_id: Id,
    /// Always the election's current round at the time of casting.
    pub round: RoundNumber,
    pub voter_id: Id,
    pub application_id: Id,
    pub voted_at: DateTime,
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

/// A vote described for the member who cast it.
#[derive(Debug, Clone)]
pub struct VoteRecord {
    pub vote: Vote,
    pub position_title: String,
    pub candidate_name: String,
}

/// What the vote ledger knows about a prospective vote.
#[derive(Debug)]
pub struct Eligibility<'a> {
    pub election: Option<&'a Election>,
    pub already_voted: bool,
    pub application: Option<&'a Application>,
    pub already_won: bool,
}

impl Eligibility<'_> {
    /// Check the preconditions of casting a vote for `application_id` in
    /// `election_id`, in order, returning the round the vote belongs to.
    pub fn check(
        &self,
        election_id: Id,
        application_id: Id,
    ) -> std::result::Result<RoundNumber, ElectionError> {
        let election = self
            .election
            .filter(|e| e.status.is_active())
            .ok_or(ElectionError::ElectionNotActive(election_id))?;
        if self.already_voted {
            return Err(ElectionError::DuplicateVote(election.current_round));
        }
        if !self
            .application
            .is_some_and(|a| a.position_id == election.position_id)
        {
            return Err(ElectionError::InvalidCandidate(application_id));
        }
        if self.already_won {
            return Err(ElectionError::CandidateAlreadyWon(application_id));
        }
        Ok(election.current_round)
    }
}

impl Vote {
    /// Cast `voter_id`'s vote for `application_id` in the current round of
    /// `election_id`.
    ///
    /// The round is read from the election inside the same transaction as the
    /// insert, so a vote can never land in a stale or future round. The
    /// unique index on `(election_id, round, voter_id)` settles races between
    /// concurrent casts by the same voter.
    pub async fn cast(
        db: &Database,
        election_id: Id,
        voter_id: Id,
        application_id: Id,
    ) -> Result<Vote> {
        let mut session = start_transaction(db).await?;

        let election = Coll::<Election>::from_db(db)
            .find_one_with_session(election_id.as_doc(), None, &mut session)
            .await?;
        let already_voted = match &election {
            Some(election) => {
                Self::find(db, &mut session, election_id, election.current_round, voter_id)
                    .await?
                    .is_some()
            }
            None => false,
        };
        let application = Coll::<Application>::from_db(db)
            .find_one_with_session(application_id.as_doc(), None, &mut session)
            .await?;
        let already_won = Winner::has_won(db, &mut session, election_id, application_id).await?;

        let round = Eligibility {
            election: election.as_ref(),
            already_voted,
            application: application.as_ref(),
            already_won,
        }
        .check(election_id, application_id)
        .map_err(|err| {
            debug!("Vote by {voter_id} in election {election_id} rejected: {err}");
            err
        })?;

        let vote = NewVote {
            election_id,
            round,
            voter_id,
            application_id,
            voted_at: DateTime::now(),
        };
        let vote = Self::insert(db, &mut session, vote).await?;

        session.commit_transaction().await?;
        Ok(vote)
    }

    /// Append a vote to the ledger.
    ///
    /// The unique index on `(election_id, round, voter_id)` rejects a second
    /// vote in the round. Two casts by the same voter racing in separate
    /// transactions collide on that index key as a write conflict instead;
    /// only one of them can commit, so both outcomes are a duplicate vote.
    pub async fn insert(
        db: &Database,
        session: &mut ClientSession,
        vote: NewVote,
    ) -> Result<Vote> {
        let inserted = Coll::<NewVote>::from_db(db)
            .insert_one_with_session(&vote, None, session)
            .await;
        match inserted {
            Ok(result) => {
                let id: Id = result
                    .inserted_id
                    .as_object_id()
                    .unwrap() // Valid because the ID comes directly from the DB
                    .into();
                Ok(Vote { id, vote })
            }
            Err(err) if is_duplicate_key_error(&err) || is_write_conflict_error(&err) => {
                debug!(
                    "Vote by {} in election {} round {} refused by the ledger: {err}",
                    vote.voter_id, vote.election_id, vote.round
                );
                Err(ElectionError::DuplicateVote(vote.round).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The vote `voter_id` cast in a given round, if any.
    pub async fn find(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
        round: RoundNumber,
        voter_id: Id,
    ) -> Result<Option<Vote>> {
        let filter = doc! {
            "election_id": election_id,
            "round": round,
            "voter_id": voter_id,
        };
        Ok(Coll::<Vote>::from_db(db)
            .find_one_with_session(filter, None, session)
            .await?)
    }

    /// Every vote cast in one round of an election.
    pub async fn for_round(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
        round: RoundNumber,
    ) -> Result<Vec<Vote>> {
        let filter = doc! {
            "election_id": election_id,
            "round": round,
        };
        let mut cursor = Coll::<Vote>::from_db(db)
            .find_with_session(filter, None, session)
            .await?;
        Ok(cursor.stream(session).try_collect().await?)
    }

    /// Has `voter_id` voted in the current round? Also returns that round.
    pub async fn has_voted(
        db: &Database,
        election_id: Id,
        voter_id: Id,
    ) -> Result<Option<(bool, RoundNumber)>> {
        let mut session = start_snapshot(db).await?;
        let election = Coll::<Election>::from_db(db)
            .find_one_with_session(election_id.as_doc(), None, &mut session)
            .await?;
        match election {
            Some(election) => {
                let round = election.current_round;
                let vote = Self::find(db, &mut session, election_id, round, voter_id).await?;
                Ok(Some((vote.is_some(), round)))
            }
            None => Ok(None),
        }
    }

    /// All votes cast by `voter_id`, newest first.
    pub async fn by_voter(db: &Database, voter_id: Id) -> Result<Vec<Vote>> {
        let filter = doc! { "voter_id": voter_id };
        let options = FindOptions::builder().sort(doc! { "voted_at": -1 }).build();
        Ok(Coll::<Vote>::from_db(db)
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }

    /// The voting history of `voter_id`, newest first, with the position and
    /// candidate of each vote.
    pub async fn history(db: &Database, voter_id: Id) -> Result<Vec<VoteRecord>> {
        let votes = Self::by_voter(db, voter_id).await?;

        let election_ids = votes.iter().map(|v| v.election_id).collect::<Vec<_>>();
        let elections: Vec<Election> = Coll::<Election>::from_db(db)
            .find(doc! { "_id": { "$in": election_ids } }, None)
            .await?
            .try_collect()
            .await?;
        let position_ids = elections.iter().map(|e| e.position_id).collect::<Vec<_>>();
        let positions: HashMap<Id, String> = Coll::<Position>::from_db(db)
            .find(doc! { "_id": { "$in": position_ids } }, None)
            .await?
            .map_ok(|p| (p.id, p.position.title))
            .try_collect()
            .await?;
        let titles: HashMap<Id, String> = elections
            .iter()
            .filter_map(|e| Some((e.id, positions.get(&e.position_id)?.clone())))
            .collect();

        let application_ids = votes.iter().map(|v| v.application_id).collect::<Vec<_>>();
        let names: HashMap<Id, String> = Coll::<Application>::from_db(db)
            .find(doc! { "_id": { "$in": application_ids } }, None)
            .await?
            .map_ok(|a| (a.id, a.candidate.display_name().to_string()))
            .try_collect()
            .await?;

        Ok(votes
            .into_iter()
            .map(|vote| VoteRecord {
                position_title: titles.get(&vote.election_id).cloned().unwrap_or_default(),
                candidate_name: names.get(&vote.application_id).cloned().unwrap_or_default(),
                vote,
            })
            .collect())
    }
}
