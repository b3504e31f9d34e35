use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use mongodb::{
    bson::{doc, DateTime},
    error::Error as DbError,
    options::FindOptions,
    ClientSession, Database,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::candidate::Candidate,
    db::position::Position,
    mongodb::{start_snapshot, start_transaction, Coll, Id},
};

/// Core application data: one candidacy for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCore {
    pub position_id: Id,
    pub candidate: Candidate,
    pub statement: String,
    #[serde(default)]
    pub photo_path: Option<String>,
    pub submitted_at: DateTime,
}

impl ApplicationCore {
    /// An admin-entered candidacy with no member account behind it.
    pub fn floor_nomination(
        position_id: Id,
        display_name: &str,
        statement: Option<String>,
    ) -> Result<Self> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(Error::validation("Nominee name is required"));
        }
        let statement = statement
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("Floor nomination for {display_name}"));
        Ok(Self {
            position_id,
            candidate: Candidate::FloorNomination {
                display_name: display_name.to_string(),
            },
            statement,
            photo_path: None,
            submitted_at: DateTime::now(),
        })
    }
}

/// An application without an ID.
pub type NewApplication = ApplicationCore;

/// An application from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub application: ApplicationCore,
}

impl Deref for Application {
    type Target = ApplicationCore;

    fn deref(&self) -> &Self::Target {
        &self.application
    }
}

impl DerefMut for Application {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.application
    }
}

impl Application {
    /// The candidate pool for a position: its applications in ID order,
    /// leaving out the applications in `exclude` (usually the election's
    /// winners so far).
    pub async fn pool(
        db: &Database,
        session: &mut ClientSession,
        position_id: Id,
        exclude: &HashSet<Id>,
    ) -> std::result::Result<Vec<Application>, DbError> {
        let filter = doc! { "position_id": position_id };
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let mut cursor = Coll::<Application>::from_db(db)
            .find_with_session(filter, options, session)
            .await?;
        let applications: Vec<Application> = cursor.stream(session).try_collect().await?;
        Ok(applications
            .into_iter()
            .filter(|a| !exclude.contains(&a.id))
            .collect())
    }

    /// Every application for an existing position, in ID order.
    pub async fn for_position(db: &Database, position_id: Id) -> Result<Vec<Application>> {
        let mut session = start_snapshot(db).await?;
        Coll::<Position>::from_db(db)
            .find_one_with_session(position_id.as_doc(), None, &mut session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
        Ok(Self::pool(db, &mut session, position_id, &HashSet::new()).await?)
    }

    /// Insert a floor nomination for an existing position.
    pub async fn nominate(db: &Database, nomination: NewApplication) -> Result<Application> {
        let mut session = start_transaction(db).await?;

        let position_id = nomination.position_id;
        Coll::<Position>::from_db(db)
            .find_one_with_session(position_id.as_doc(), None, &mut session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;

        let id: Id = Coll::<NewApplication>::from_db(db)
            .insert_one_with_session(&nomination, None, &mut session)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();

        session.commit_transaction().await?;
        info!(
            "Floor nomination {id} entered for position {position_id}: {}",
            nomination.candidate.display_name()
        );
        Ok(Application {
            id,
            application: nomination,
        })
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Application {
        pub fn example(id: Id, display_name: &str) -> Self {
            Self {
                id,
                application: ApplicationCore {
                    position_id: Id::example(200),
                    candidate: Candidate::Applicant {
                        member_id: Id::new(),
                        display_name: display_name.to_string(),
                    },
                    statement: format!("{display_name} for the role"),
                    photo_path: None,
                    submitted_at: DateTime::now(),
                },
            }
        }
    }

    impl ApplicationCore {
        pub fn example(position_id: Id, display_name: &str) -> Self {
            Self {
                position_id,
                candidate: Candidate::Applicant {
                    member_id: Id::new(),
                    display_name: display_name.to_string(),
                },
                statement: format!("{display_name} for the role"),
                photo_path: None,
                submitted_at: DateTime::now(),
            }
        }
    }
}
