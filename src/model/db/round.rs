use std::ops::Deref;

use mongodb::{
    bson::{doc, DateTime},
    error::Error as DbError,
    options::FindOptions,
    ClientSession, Database,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::RoundNumber,
    mongodb::{Coll, Id},
};

/// One voting period of an election. The round history is the audit trail;
/// the election's `current_round` is the pointer to the open one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCore {
    pub election_id: Id,
    pub number: RoundNumber,
    pub started_at: DateTime,
    /// Absent while the round is open.
    #[serde(default)]
    pub ended_at: Option<DateTime>,
}

impl RoundCore {
    /// A round opening now.
    pub fn open(election_id: Id, number: RoundNumber) -> Self {
        Self {
            election_id,
            number,
            started_at: DateTime::now(),
            ended_at: None,
        }
    }
}

/// A round without an ID.
pub type NewRound = RoundCore;

/// A round from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub round: RoundCore,
}

impl Deref for Round {
    type Target = RoundCore;

    fn deref(&self) -> &Self::Target {
        &self.round
    }
}

impl Round {
    /// Record a newly opened round.
    pub async fn open(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
        number: RoundNumber,
    ) -> Result<(), DbError> {
        Coll::<NewRound>::from_db(db)
            .insert_one_with_session(NewRound::open(election_id, number), None, session)
            .await?;
        Ok(())
    }

    /// Close the open round of an election. Returns whether a round was open.
    pub async fn close(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
        ended_at: DateTime,
    ) -> Result<bool, DbError> {
        let filter = doc! {
            "election_id": election_id,
            "ended_at": null,
        };
        let update = doc! {
            "$set": { "ended_at": ended_at }
        };
        let result = Coll::<Round>::from_db(db)
            .update_many_with_session(filter, update, None, session)
            .await?;
        Ok(result.modified_count > 0)
    }

    /// All rounds of an election, oldest first.
    pub async fn history(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
    ) -> Result<Vec<Round>, DbError> {
        let filter = doc! { "election_id": election_id };
        let options = FindOptions::builder().sort(doc! { "number": 1 }).build();
        let mut cursor = Coll::<Round>::from_db(db)
            .find_with_session(filter, options, session)
            .await?;
        cursor.stream(session).try_collect().await
    }
}
