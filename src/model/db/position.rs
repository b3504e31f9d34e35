use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::mongodb::Id;

/// The largest number of seats a single position can have.
pub const MAX_SEATS: u32 = 25;

/// Core position data: an electable role from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCore {
    pub title: String,
    pub description: String,
    /// How many winners the position's election must produce.
    pub seat_count: u32,
    pub is_executive: bool,
}

impl PositionCore {
    /// Create a validated position.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        seat_count: u32,
        is_executive: bool,
    ) -> Result<Self, Error> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::validation("Position title is required"));
        }
        if !(1..=MAX_SEATS).contains(&seat_count) {
            return Err(Error::validation(format!(
                "Seat count must be between 1 and {MAX_SEATS}, got {seat_count}"
            )));
        }
        Ok(Self {
            title,
            description: description.into(),
            seat_count,
            is_executive,
        })
    }
}

/// A position without an ID.
pub type NewPosition = PositionCore;

/// A position from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub position: PositionCore,
}

impl Deref for Position {
    type Target = PositionCore;

    fn deref(&self) -> &Self::Target {
        &self.position
    }
}
