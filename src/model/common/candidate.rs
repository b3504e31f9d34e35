use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Who is standing for a position.
///
/// Applicants are members who submitted an application themselves; floor
/// nominations are entered by an admin and have no member account behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidate {
    Applicant { member_id: Id, display_name: String },
    FloorNomination { display_name: String },
}

impl Candidate {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Applicant { display_name, .. } | Self::FloorNomination { display_name } => {
                display_name
            }
        }
    }

    pub fn member_id(&self) -> Option<Id> {
        match self {
            Self::Applicant { member_id, .. } => Some(*member_id),
            Self::FloorNomination { .. } => None,
        }
    }

    pub fn is_floor_nomination(&self) -> bool {
        matches!(self, Self::FloorNomination { .. })
    }
}
