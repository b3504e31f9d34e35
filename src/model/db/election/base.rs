use std::ops::{Deref, DerefMut};

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{ElectionStatus, RoundNumber},
    mongodb::Id,
};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// The position being elected. At most one election record exists per
    /// position; starting again reactivates it.
    pub position_id: Id,
    pub status: ElectionStatus,
    /// The open round while active, otherwise the last round held.
    pub current_round: RoundNumber,
    pub started_at: DateTime,
    /// Set once the election reaches a terminal status.
    #[serde(default)]
    pub ended_at: Option<DateTime>,
}

impl ElectionCore {
    /// A brand new election, active in round one.
    pub fn start(position_id: Id) -> Self {
        Self {
            position_id,
            status: ElectionStatus::Active,
            current_round: 1,
            started_at: DateTime::now(),
            ended_at: None,
        }
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}
