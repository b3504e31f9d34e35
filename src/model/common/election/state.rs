use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::error::ElectionError;
use crate::model::mongodb::Id;

/// States in the Election lifecycle.
///
/// An election that has never been started has no record at all, so there is
/// no `NotStarted` variant. `Complete` and `EndedNoMajority` are terminal as
/// far as rounds are concerned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionStatus {
    /// A round is open and accepting votes.
    Active,
    /// A round produced a winner but seats remain; waiting for an admin to
    /// open the next round.
    AwaitingNextRound,
    /// Every seat has been filled.
    Complete,
    /// The last round produced no 2/3 majority.
    EndedNoMajority,
}

impl ElectionStatus {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    /// No further rounds can follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::EndedNoMajority)
    }

    /// Can an existing election for `position` be started again?
    pub fn check_restart(
        self,
        election: Id,
        position: Id,
        seats: u32,
    ) -> Result<(), ElectionError> {
        match self {
            Self::Active => Err(ElectionError::AlreadyActive(position)),
            Self::AwaitingNextRound => Err(ElectionError::AwaitingNextRound(election)),
            Self::Complete => Err(ElectionError::SeatsFilled(seats)),
            Self::EndedNoMajority => Ok(()),
        }
    }

    /// Can the next round be opened, given the seats already won?
    pub fn check_next_round(
        self,
        election: Id,
        position: Id,
        winners: u32,
        seats: u32,
    ) -> Result<(), ElectionError> {
        match self {
            Self::Active => Err(ElectionError::AlreadyActive(position)),
            Self::Complete => Err(ElectionError::SeatsFilled(seats)),
            Self::EndedNoMajority => Err(ElectionError::ElectionFinished(election)),
            Self::AwaitingNextRound if winners >= seats => Err(ElectionError::SeatsFilled(seats)),
            Self::AwaitingNextRound => Ok(()),
        }
    }

    /// Is a round open, so that votes can be cast and the round ended?
    pub fn check_round_open(self, election: Id) -> Result<(), ElectionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ElectionError::ElectionNotActive(election))
        }
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
