//! Bulk setup and teardown of the election data, shared by the admin API and
//! the `election-admin` tool.

use mongodb::{bson::doc, Database};
use serde::Serialize;

use crate::error::Result;
use crate::model::{
    db::{
        application::Application,
        election::Election,
        position::{NewPosition, Position, PositionCore},
        round::Round,
        vote::Vote,
        winner::Winner,
    },
    mongodb::{start_transaction, Coll},
};

/// How many documents a reset removed from each collection.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetCounts {
    pub votes: u64,
    pub winners: u64,
    pub rounds: u64,
    pub elections: u64,
    pub applications: u64,
}

/// Remove every election along with its rounds, votes and winners, and the
/// applications too if `include_applications` is set. Positions are kept.
pub async fn reset_all(db: &Database, include_applications: bool) -> Result<ResetCounts> {
    let mut session = start_transaction(db).await?;

    let mut counts = ResetCounts {
        votes: Coll::<Vote>::from_db(db)
            .delete_many_with_session(doc! {}, None, &mut session)
            .await?
            .deleted_count,
        winners: Coll::<Winner>::from_db(db)
            .delete_many_with_session(doc! {}, None, &mut session)
            .await?
            .deleted_count,
        rounds: Coll::<Round>::from_db(db)
            .delete_many_with_session(doc! {}, None, &mut session)
            .await?
            .deleted_count,
        elections: Coll::<Election>::from_db(db)
            .delete_many_with_session(doc! {}, None, &mut session)
            .await?
            .deleted_count,
        ..Default::default()
    };
    if include_applications {
        counts.applications = Coll::<Application>::from_db(db)
            .delete_many_with_session(doc! {}, None, &mut session)
            .await?
            .deleted_count;
    }

    session.commit_transaction().await?;
    info!(
        "Reset elections: {} votes, {} winners, {} rounds, {} elections, {} applications removed",
        counts.votes, counts.winners, counts.rounds, counts.elections, counts.applications
    );
    Ok(counts)
}

/// The position catalog a fresh installation starts with.
pub fn default_positions() -> Result<Vec<NewPosition>> {
    Ok(vec![
        PositionCore::new("President", "Leads the chapter and chairs meetings", 1, true)?,
        PositionCore::new(
            "Vice President",
            "Supports the President and leads in their absence",
            1,
            true,
        )?,
        PositionCore::new("Treasurer", "Manages the chapter's finances", 1, true)?,
        PositionCore::new("Social Chair", "Plans and runs social events", 3, false)?,
        PositionCore::new("Rush Chair", "Organises recruitment", 4, false)?,
    ])
}

/// Insert the default positions, unless the catalog already has some.
/// Returns how many were inserted.
pub async fn seed(db: &Database) -> Result<usize> {
    let positions = Coll::<Position>::from_db(db);
    let existing = positions.count_documents(None, None).await?;
    if existing > 0 {
        info!("Catalog already holds {existing} position(s), not seeding");
        return Ok(0);
    }

    let defaults = default_positions()?;
    Coll::<NewPosition>::from_db(db)
        .insert_many(&defaults, None)
        .await?;
    info!("Seeded {} positions", defaults.len());
    Ok(defaults.len())
}
