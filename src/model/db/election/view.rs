use std::collections::{HashMap, HashSet};

use mongodb::{bson::doc, Database};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::election::ElectionStatus,
    db::{
        application::Application,
        position::Position,
        round::Round,
        vote::Vote,
        winner::Winner,
    },
    mongodb::{start_snapshot, Coll, Id},
    resolver::Tally,
};

use super::Election;

/// An election together with the position it fills.
#[derive(Debug, Clone)]
pub struct ElectionView {
    pub election: Election,
    pub position: Position,
}

/// The live state of an election: the current round's tally, the winners
/// so far (each with their candidate's display name) and every round held.
#[derive(Debug, Clone)]
pub struct ElectionResults {
    pub view: ElectionView,
    pub tally: Tally,
    pub winners: Vec<(Winner, String)>,
    pub rounds: Vec<Round>,
}

/// Pair each election with its position, dropping any whose position has
/// been removed from the catalog.
fn join(elections: Vec<Election>, positions: Vec<Position>) -> Vec<ElectionView> {
    let mut positions: HashMap<Id, Position> = positions.into_iter().map(|p| (p.id, p)).collect();
    elections
        .into_iter()
        .filter_map(|election| match positions.remove(&election.position_id) {
            Some(position) => Some(ElectionView { election, position }),
            None => {
                warn!(
                    "Election {} refers to missing position {}",
                    election.id, election.position_id
                );
                None
            }
        })
        .collect()
}

/// Active elections first, then the most recently started.
fn sort_for_listing(views: &mut [ElectionView]) {
    views.sort_by(|a, b| {
        b.election
            .status
            .is_active()
            .cmp(&a.election.status.is_active())
            .then(b.election.started_at.cmp(&a.election.started_at))
    });
}

/// Executive positions first, then by title.
fn sort_for_ballot(views: &mut [ElectionView]) {
    views.sort_by(|a, b| {
        b.position
            .is_executive
            .cmp(&a.position.is_executive)
            .then_with(|| a.position.title.cmp(&b.position.title))
    });
}

async fn views(db: &Database, filter: mongodb::bson::Document) -> Result<Vec<ElectionView>> {
    let elections: Vec<Election> = Coll::<Election>::from_db(db)
        .find(filter, None)
        .await?
        .try_collect()
        .await?;
    let position_ids = elections.iter().map(|e| e.position_id).collect::<Vec<_>>();
    let positions: Vec<Position> = Coll::<Position>::from_db(db)
        .find(doc! { "_id": { "$in": position_ids } }, None)
        .await?
        .try_collect()
        .await?;
    Ok(join(elections, positions))
}

/// Every election, active ones first, then the most recently started.
pub async fn list_elections(db: &Database) -> Result<Vec<ElectionView>> {
    let mut views = views(db, doc! {}).await?;
    sort_for_listing(&mut views);
    Ok(views)
}

/// Elections with a round open for voting, executive positions first.
pub async fn active_elections(db: &Database) -> Result<Vec<ElectionView>> {
    let mut views = views(db, doc! { "status": ElectionStatus::Active }).await?;
    sort_for_ballot(&mut views);
    Ok(views)
}

/// Current-round results for an election.
///
/// The tally covers every candidate still in contention at the start of the
/// current round, so a candidate who has just won that round still appears
/// with their count.
pub async fn election_results(db: &Database, election_id: Id) -> Result<ElectionResults> {
    let mut session = start_snapshot(db).await?;

    let election = Coll::<Election>::from_db(db)
        .find_one_with_session(election_id.as_doc(), None, &mut session)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    let position = Coll::<Position>::from_db(db)
        .find_one_with_session(election.position_id.as_doc(), None, &mut session)
        .await?
        .ok_or_else(|| Error::not_found(format!("Position {}", election.position_id)))?;

    let round = election.current_round;
    let winners = Winner::for_election(db, &mut session, election_id).await?;
    let earlier_winners = winners
        .iter()
        .filter(|w| w.round < round)
        .map(|w| w.application_id)
        .collect::<HashSet<_>>();

    let applications = Application::pool(db, &mut session, position.id, &HashSet::new()).await?;
    let names = applications
        .iter()
        .map(|a| (a.id, a.candidate.display_name().to_string()))
        .collect::<HashMap<_, _>>();
    let pool = applications
        .into_iter()
        .filter(|a| !earlier_winners.contains(&a.id))
        .collect::<Vec<_>>();

    let votes = Vote::for_round(db, &mut session, election_id, round).await?;
    let tally = Tally::count(&pool, votes.iter().map(|v| v.application_id));
    let rounds = Round::history(db, &mut session, election_id).await?;

    let winners = winners
        .into_iter()
        .map(|w| {
            let name = names.get(&w.application_id).cloned().unwrap_or_default();
            (w, name)
        })
        .collect();

    Ok(ElectionResults {
        view: ElectionView { election, position },
        tally,
        winners,
        rounds,
    })
}

#[cfg(test)]
mod tests {
    use mongodb::bson::DateTime;

    use super::*;

    use crate::model::db::{election::ElectionCore, position::PositionCore};

    fn view(n: u8, title: &str, executive: bool, status: ElectionStatus, started: i64) -> ElectionView {
        let position = Position {
            id: Id::example(100 + n),
            position: PositionCore::new(title, "", 1, executive).unwrap(),
        };
        let election = Election {
            id: Id::example(n),
            election: ElectionCore {
                status,
                started_at: DateTime::from_millis(started),
                ..ElectionCore::start(position.id)
            },
        };
        ElectionView { election, position }
    }

    fn titles(views: &[ElectionView]) -> Vec<&str> {
        views.iter().map(|v| v.position.title.as_str()).collect()
    }

    #[test]
    fn listing_puts_active_elections_first() {
        let mut views = vec![
            view(1, "Treasurer", true, ElectionStatus::Complete, 3_000),
            view(2, "Social Chair", false, ElectionStatus::Active, 1_000),
            view(3, "President", true, ElectionStatus::EndedNoMajority, 2_000),
            view(4, "Rush Chair", false, ElectionStatus::Active, 4_000),
        ];
        sort_for_listing(&mut views);
        assert_eq!(
            titles(&views),
            vec!["Rush Chair", "Social Chair", "Treasurer", "President"]
        );
    }

    #[test]
    fn ballot_puts_executive_positions_first() {
        let mut views = vec![
            view(1, "Social Chair", false, ElectionStatus::Active, 0),
            view(2, "Vice President", true, ElectionStatus::Active, 0),
            view(3, "President", true, ElectionStatus::Active, 0),
            view(4, "Rush Chair", false, ElectionStatus::Active, 0),
        ];
        sort_for_ballot(&mut views);
        assert_eq!(
            titles(&views),
            vec!["President", "Vice President", "Rush Chair", "Social Chair"]
        );
    }

    #[test]
    fn elections_without_a_position_are_dropped() {
        let kept = view(1, "President", true, ElectionStatus::Active, 0);
        let orphan = view(2, "Gone", false, ElectionStatus::Active, 0);
        let joined = join(
            vec![kept.election.clone(), orphan.election],
            vec![kept.position.clone()],
        );
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].election.id, kept.election.id);
    }
}
