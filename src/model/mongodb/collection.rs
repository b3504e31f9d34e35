use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    application::{Application, NewApplication},
    election::{Election, NewElection},
    position::{NewPosition, Position},
    round::{NewRound, Round},
    vote::{NewVote, Vote},
    winner::{NewWinner, Winner},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Position catalog
const POSITIONS: &str = "positions";
impl MongoCollection for Position {
    const NAME: &'static str = POSITIONS;
}
impl MongoCollection for NewPosition {
    const NAME: &'static str = POSITIONS;
}

// Applications, including floor nominations
const APPLICATIONS: &str = "applications";
impl MongoCollection for Application {
    const NAME: &'static str = APPLICATIONS;
}
impl MongoCollection for NewApplication {
    const NAME: &'static str = APPLICATIONS;
}

// Elections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElection {
    const NAME: &'static str = ELECTIONS;
}

// Round history
const ROUNDS: &str = "election_rounds";
impl MongoCollection for Round {
    const NAME: &'static str = ROUNDS;
}
impl MongoCollection for NewRound {
    const NAME: &'static str = ROUNDS;
}

// Vote ledger
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// Winner ledger
const WINNERS: &str = "winners";
impl MongoCollection for Winner {
    const NAME: &'static str = WINNERS;
}
impl MongoCollection for NewWinner {
    const NAME: &'static str = WINNERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // One election record per position; restarts reactivate it.
    let election_index = IndexModel::builder()
        .keys(doc! {"position_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Election>::from_db(db)
        .create_index(election_index, None)
        .await?;

    // Round numbers are unique within an election.
    let round_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "number": 1})
        .options(unique.clone())
        .build();
    Coll::<Round>::from_db(db)
        .create_index(round_index, None)
        .await?;

    // One vote per voter per round.
    let vote_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "round": 1, "voter_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // A candidate can only win once per election.
    let winner_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "application_id": 1})
        .options(unique)
        .build();
    Coll::<Winner>::from_db(db)
        .create_index(winner_index, None)
        .await?;

    // One application per member per position. Floor nominations have no
    // member, so they are excluded from the constraint.
    let applicant_only = IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(doc! {"candidate.kind": "applicant"})
        .build();
    let application_index = IndexModel::builder()
        .keys(doc! {"position_id": 1, "candidate.member_id": 1})
        .options(applicant_only)
        .build();
    Coll::<Application>::from_db(db)
        .create_index(application_index, None)
        .await?;

    Ok(())
}
