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
    common::election::{RoundNumber, VoteCount},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

/// A declared seat-filler. Winners are only ever appended; the ledger for an
/// election grows until it holds as many entries as the position has seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerCore {
    pub election_id: Id,
    pub application_id: Id,
    /// The round in which the seat was won.
    pub round: RoundNumber,
    /// The winner's count in that round.
    pub votes: VoteCount,
    pub declared_at: DateTime,
}

/// A winner without an ID.
pub type NewWinner = WinnerCore;

/// A winner from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub winner: WinnerCore,
}

impl Deref for Winner {
    type Target = WinnerCore;

    fn deref(&self) -> &Self::Target {
        &self.winner
    }
}

impl Winner {
    /// Append a winner to the ledger.
    ///
    /// The unique index on `(election_id, application_id)` rejects a
    /// candidate winning twice, even if two transactions race.
    pub async fn record(
        db: &Database,
        session: &mut ClientSession,
        winner: &NewWinner,
    ) -> Result<()> {
        let result = Coll::<NewWinner>::from_db(db)
            .insert_one_with_session(winner, None, session)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key_error(&err) => {
                Err(ElectionError::CandidateAlreadyWon(winner.application_id).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The winners of an election, by round and then by vote count descending.
    pub async fn for_election(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
    ) -> Result<Vec<Winner>> {
        let filter = doc! { "election_id": election_id };
        let options = FindOptions::builder()
            .sort(doc! { "round": 1, "votes": -1 })
            .build();
        let mut cursor = Coll::<Winner>::from_db(db)
            .find_with_session(filter, options, session)
            .await?;
        Ok(cursor.stream(session).try_collect().await?)
    }

    /// How many seats of an election have been filled.
    pub async fn count_for(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
    ) -> Result<u32> {
        let filter = doc! { "election_id": election_id };
        let count = Coll::<Winner>::from_db(db)
            .count_documents_with_session(filter, None, session)
            .await?;
        // Bounded by the seat count.
        Ok(count as u32)
    }

    /// Has this application already won a seat in this election?
    pub async fn has_won(
        db: &Database,
        session: &mut ClientSession,
        election_id: Id,
        application_id: Id,
    ) -> Result<bool> {
        let filter = doc! {
            "election_id": election_id,
            "application_id": application_id,
        };
        let winner = Coll::<Winner>::from_db(db)
            .find_one_with_session(filter, None, session)
            .await?;
        Ok(winner.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use crate::model::mongodb::start_transaction;

    fn seat(election_id: Id, application_id: Id, round: RoundNumber) -> NewWinner {
        NewWinner {
            election_id,
            application_id,
            round,
            votes: 6,
            declared_at: DateTime::now(),
        }
    }

    #[backend_test]
    async fn a_candidate_wins_at_most_once(db: Database) {
        let (election_id, application_id) = (Id::new(), Id::new());

        let mut session = start_transaction(&db).await.unwrap();
        Winner::record(&db, &mut session, &seat(election_id, application_id, 1))
            .await
            .unwrap();
        session.commit_transaction().await.unwrap();

        let mut session = start_transaction(&db).await.unwrap();
        let result = Winner::record(&db, &mut session, &seat(election_id, application_id, 2)).await;
        assert!(matches!(
            result,
            Err(Error::Election(ElectionError::CandidateAlreadyWon(id))) if id == application_id
        ));
        drop(session);

        let mut session = start_transaction(&db).await.unwrap();
        Winner::record(&db, &mut session, &seat(election_id, Id::new(), 2))
            .await
            .unwrap();
        session.commit_transaction().await.unwrap();

        let mut session = db.client().start_session(None).await.unwrap();
        assert_eq!(
            Winner::count_for(&db, &mut session, election_id)
                .await
                .unwrap(),
            2
        );
        let winners = Winner::for_election(&db, &mut session, election_id)
            .await
            .unwrap();
        assert_eq!(
            winners.iter().map(|w| w.round).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(Winner::has_won(&db, &mut session, election_id, application_id)
            .await
            .unwrap());
    }
}
