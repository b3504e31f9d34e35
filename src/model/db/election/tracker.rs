use std::collections::HashSet;

use mongodb::{
    bson::{doc, DateTime},
    ClientSession, Database,
};

use crate::error::{ElectionError, Error, Result};
use crate::model::{
    common::election::{ElectionStatus, RoundNumber},
    db::{
        application::Application,
        position::Position,
        round::Round,
        vote::Vote,
        winner::{NewWinner, Winner},
    },
    mongodb::{start_transaction, Coll, Id},
    resolver::{resolve, RoundOutcome, Tally},
};

use super::{Election, ElectionView, NewElection};

/// Everything decided by ending a round.
#[derive(Debug, Clone)]
pub struct RoundResolution {
    /// The election as it is after the round.
    pub election: Election,
    pub position: Position,
    pub round: RoundNumber,
    pub tally: Tally,
    pub outcome: RoundOutcome,
    /// Seats filled once this round is counted.
    pub winners: u32,
}

async fn find_position(
    db: &Database,
    session: &mut ClientSession,
    position_id: Id,
) -> Result<Position> {
    Coll::<Position>::from_db(db)
        .find_one_with_session(position_id.as_doc(), None, session)
        .await?
        .ok_or_else(|| Error::not_found(format!("Position {position_id}")))
}

async fn find_election(
    db: &Database,
    session: &mut ClientSession,
    election_id: Id,
) -> Result<Election> {
    Coll::<Election>::from_db(db)
        .find_one_with_session(election_id.as_doc(), None, session)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// Applications already holding a seat in `election_id`.
async fn winning_applications(
    db: &Database,
    session: &mut ClientSession,
    election_id: Id,
) -> Result<HashSet<Id>> {
    Ok(Winner::for_election(db, session, election_id)
        .await?
        .into_iter()
        .map(|w| w.application_id)
        .collect())
}

/// Put `election` back into an active round `round`, recording the round.
async fn reopen(
    db: &Database,
    session: &mut ClientSession,
    election: &mut Election,
    round: RoundNumber,
) -> Result<()> {
    let started_at = DateTime::now();
    let update = doc! {
        "$set": {
            "status": ElectionStatus::Active,
            "current_round": round,
            "started_at": started_at,
            "ended_at": null,
        }
    };
    Coll::<Election>::from_db(db)
        .update_one_with_session(election.id.as_doc(), update, None, session)
        .await?;
    Round::open(db, session, election.id, round).await?;

    election.status = ElectionStatus::Active;
    election.current_round = round;
    election.started_at = started_at;
    election.ended_at = None;
    Ok(())
}

/// Start the election for a position, opening its first round.
///
/// A position has at most one election. If it previously ended without a
/// majority, that election is reactivated: its winners are kept and round
/// numbering carries on from the last round held.
pub async fn start_election(db: &Database, position_id: Id) -> Result<ElectionView> {
    let mut session = start_transaction(db).await?;

    let position = find_position(db, &mut session, position_id).await?;
    let existing = Coll::<Election>::from_db(db)
        .find_one_with_session(doc! { "position_id": position_id }, None, &mut session)
        .await?;

    let election = match existing {
        Some(mut election) => {
            election
                .status
                .check_restart(election.id, position_id, position.seat_count)?;
            let winners = winning_applications(db, &mut session, election.id).await?;
            let pool = Application::pool(db, &mut session, position_id, &winners).await?;
            if pool.is_empty() {
                return Err(ElectionError::NoCandidates(position_id).into());
            }
            let round = election.current_round + 1;
            reopen(db, &mut session, &mut election, round).await?;
            election
        }
        None => {
            let pool = Application::pool(db, &mut session, position_id, &HashSet::new()).await?;
            if pool.is_empty() {
                return Err(ElectionError::NoCandidates(position_id).into());
            }
            let election = NewElection::start(position_id);
            let id: Id = Coll::<NewElection>::from_db(db)
                .insert_one_with_session(&election, None, &mut session)
                .await?
                .inserted_id
                .as_object_id()
                .unwrap() // Valid because the ID comes directly from the DB
                .into();
            Round::open(db, &mut session, id, election.current_round).await?;
            Election { id, election }
        }
    };

    session.commit_transaction().await?;
    info!(
        "Election {} for {} started, round {}",
        election.id, position.title, election.current_round
    );
    Ok(ElectionView { election, position })
}

/// End the open round of an election: tally it, apply the majority rule,
/// record any winner and move the election out of the active state.
pub async fn end_round(db: &Database, election_id: Id) -> Result<RoundResolution> {
    let mut session = start_transaction(db).await?;

    let mut election = find_election(db, &mut session, election_id).await?;
    election.status.check_round_open(election_id)?;
    let position = find_position(db, &mut session, election.position_id).await?;
    let round = election.current_round;

    let prior_winners = Winner::count_for(db, &mut session, election_id).await?;
    let winners = winning_applications(db, &mut session, election_id).await?;
    let pool = Application::pool(db, &mut session, position.id, &winners).await?;
    let votes = Vote::for_round(db, &mut session, election_id, round).await?;
    let tally = Tally::count(&pool, votes.iter().map(|v| v.application_id));
    let outcome = resolve(&tally, prior_winners, position.seat_count);

    let now = DateTime::now();
    if let Some(winner) = outcome.winner() {
        let winner = NewWinner {
            election_id,
            application_id: winner.application_id,
            round,
            votes: winner.votes,
            declared_at: now,
        };
        Winner::record(db, &mut session, &winner).await?;
    }
    if !Round::close(db, &mut session, election_id, now).await? {
        error!("Election {election_id} is active but round {round} has no open record");
        return Err(Error::inconsistent(format!(
            "Election {election_id} has no open round to end"
        )));
    }

    let status = outcome.status();
    let ended_at = status.is_terminal().then_some(now);
    let update = doc! {
        "$set": {
            "status": status,
            "ended_at": ended_at,
        }
    };
    Coll::<Election>::from_db(db)
        .update_one_with_session(election_id.as_doc(), update, None, &mut session)
        .await?;
    election.status = status;
    election.ended_at = ended_at;

    session.commit_transaction().await?;
    match &outcome {
        RoundOutcome::Complete { winner, seats, .. } => info!(
            "Election {election_id} round {round}: {} wins, all {seats} seats filled",
            winner.display_name
        ),
        RoundOutcome::AwaitingNextRound {
            winner,
            winners,
            seats,
        } => info!(
            "Election {election_id} round {round}: {} wins, {winners} of {seats} seats filled",
            winner.display_name
        ),
        RoundOutcome::NoMajority {
            total_votes,
            required_votes,
            ..
        } => info!(
            "Election {election_id} round {round}: no majority ({total_votes} votes, {required_votes} required)"
        ),
    }

    let winners = prior_winners + u32::from(outcome.winner().is_some());
    Ok(RoundResolution {
        election,
        position,
        round,
        tally,
        outcome,
        winners,
    })
}

/// Open the next round of an election waiting for one.
pub async fn start_next_round(db: &Database, election_id: Id) -> Result<ElectionView> {
    let mut session = start_transaction(db).await?;

    let mut election = find_election(db, &mut session, election_id).await?;
    let position = find_position(db, &mut session, election.position_id).await?;
    let filled = Winner::count_for(db, &mut session, election_id).await?;
    election
        .status
        .check_next_round(election_id, position.id, filled, position.seat_count)?;

    let winners = winning_applications(db, &mut session, election_id).await?;

    let pool = Application::pool(db, &mut session, position.id, &winners).await?;
    if pool.is_empty() {
        return Err(ElectionError::NoCandidates(position.id).into());
    }
    let round = election.current_round + 1;
    reopen(db, &mut session, &mut election, round).await?;

    session.commit_transaction().await?;
    info!(
        "Election {election_id} for {} opened round {round} for {} remaining seat(s)",
        position.title,
        position.seat_count - filled
    );
    Ok(ElectionView { election, position })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::api::test_util::{insert_candidates, insert_position};
    use crate::model::db::position::NewPosition;

    async fn cast(db: &Database, election_id: Id, candidate: Id, votes: usize) {
        for _ in 0..votes {
            Vote::cast(db, election_id, Id::new(), candidate)
                .await
                .unwrap();
        }
    }

    #[backend_test]
    async fn start_requires_candidates(db: Database) {
        let position = insert_position(&db, NewPosition::president()).await;
        let result = start_election(&db, position.id).await;
        assert!(matches!(
            result,
            Err(Error::Election(ElectionError::NoCandidates(_)))
        ));
    }

    #[backend_test]
    async fn single_seat_election_completes(db: Database) {
        let position = insert_position(&db, NewPosition::president()).await;
        let ids = insert_candidates(&db, position.id, &["A", "B", "C"]).await;

        let election = start_election(&db, position.id).await.unwrap().election;
        assert_eq!(election.status, ElectionStatus::Active);
        assert_eq!(election.current_round, 1);
        assert!(matches!(
            start_election(&db, position.id).await,
            Err(Error::Election(ElectionError::AlreadyActive(_)))
        ));

        cast(&db, election.id, ids[0], 6).await;
        cast(&db, election.id, ids[1], 1).await;
        cast(&db, election.id, ids[2], 1).await;

        let resolution = end_round(&db, election.id).await.unwrap();
        assert_eq!(resolution.tally.total_votes, 8);
        assert_eq!(resolution.tally.required_votes, 6);
        assert_eq!(resolution.election.status, ElectionStatus::Complete);
        assert!(resolution.election.ended_at.is_some());

        assert!(matches!(
            start_next_round(&db, election.id).await,
            Err(Error::Election(ElectionError::SeatsFilled(1)))
        ));
        assert!(matches!(
            end_round(&db, election.id).await,
            Err(Error::Election(ElectionError::ElectionNotActive(_)))
        ));
    }

    #[backend_test]
    async fn multi_seat_election_runs_several_rounds(db: Database) {
        let position = insert_position(&db, NewPosition::social_chair()).await;
        let ids = insert_candidates(&db, position.id, &["A", "B", "C", "D"]).await;

        let election = start_election(&db, position.id).await.unwrap().election;
        cast(&db, election.id, ids[0], 7).await;
        cast(&db, election.id, ids[1], 2).await;
        let resolution = end_round(&db, election.id).await.unwrap();
        assert_eq!(
            resolution.election.status,
            ElectionStatus::AwaitingNextRound
        );
        assert!(resolution.election.ended_at.is_none());

        // Votes are refused between rounds.
        assert!(matches!(
            Vote::cast(&db, election.id, Id::new(), ids[1]).await,
            Err(Error::Election(ElectionError::ElectionNotActive(_)))
        ));

        let election = start_next_round(&db, election.id).await.unwrap().election;
        assert_eq!(election.current_round, 2);
        assert!(matches!(
            Vote::cast(&db, election.id, Id::new(), ids[0]).await,
            Err(Error::Election(ElectionError::CandidateAlreadyWon(_)))
        ));

        cast(&db, election.id, ids[1], 5).await;
        cast(&db, election.id, ids[2], 4).await;
        let resolution = end_round(&db, election.id).await.unwrap();
        assert_eq!(resolution.tally.candidates.len(), 3);
        assert_eq!(resolution.election.status, ElectionStatus::EndedNoMajority);
        assert!(matches!(
            start_next_round(&db, election.id).await,
            Err(Error::Election(ElectionError::ElectionFinished(_)))
        ));

        // Restarting keeps the first winner and carries on numbering.
        let election = start_election(&db, position.id).await.unwrap().election;
        assert_eq!(election.current_round, 3);
        let mut session = db.client().start_session(None).await.unwrap();
        assert_eq!(
            Winner::count_for(&db, &mut session, election.id)
                .await
                .unwrap(),
            1
        );
    }

    #[backend_test]
    async fn ending_a_round_without_an_open_record_changes_nothing(
        db: Database,
        rounds: Coll<Round>,
    ) {
        let position = insert_position(&db, NewPosition::president()).await;
        let ids = insert_candidates(&db, position.id, &["A", "B"]).await;
        let election = start_election(&db, position.id).await.unwrap().election;
        cast(&db, election.id, ids[0], 3).await;

        rounds
            .delete_many(doc! { "election_id": election.id }, None)
            .await
            .unwrap();
        let err = end_round(&db, election.id).await.unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::InternalServerError);

        // The winner and the status change were rolled back.
        let stored = Coll::<Election>::from_db(&db)
            .find_one(election.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ElectionStatus::Active);
        let mut session = db.client().start_session(None).await.unwrap();
        assert_eq!(
            Winner::count_for(&db, &mut session, election.id)
                .await
                .unwrap(),
            0
        );
    }
}
