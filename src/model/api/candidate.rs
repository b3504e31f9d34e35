use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::application::Application};

/// An admin's floor nomination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorNominationRequest {
    pub position_id: Option<ApiId>,
    #[serde(default)]
    pub display_name: String,
    pub statement: Option<String>,
}

/// A candidacy as shown to voters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub position_id: ApiId,
    pub display_name: String,
    pub statement: String,
    pub photo_path: Option<String>,
    pub is_floor_nomination: bool,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Application> for CandidateDescription {
    fn from(application: &Application) -> Self {
        Self {
            id: application.id.into(),
            position_id: application.position_id.into(),
            display_name: application.candidate.display_name().to_string(),
            statement: application.statement.clone(),
            photo_path: application.photo_path.clone(),
            is_floor_nomination: application.candidate.is_floor_nomination(),
            submitted_at: application.submitted_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateList {
    pub applications: Vec<CandidateDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateCreated {
    pub application: CandidateDescription,
}
