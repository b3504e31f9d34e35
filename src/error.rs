use std::fmt::Display;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::logging::RequestId;
use crate::model::mongodb::Id;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Election(#[from] ElectionError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// A missing election, position or application.
    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    /// Missing or out-of-range request fields.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    /// Stored records contradict each other. The surrounding transaction is
    /// abandoned, so nothing is written.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Status(Status::InternalServerError, message.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Election(err) => err.status(),
            Self::Status(status, _) => *status,
        }
    }
}

/// Precondition failures of the election state machine and the vote ledger.
///
/// These are detected before anything is written, so a caller receiving one
/// can be sure the store is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectionError {
    #[error("No applications found for position {0}")]
    NoCandidates(Id),
    #[error("Election is already active for position {0}")]
    AlreadyActive(Id),
    #[error("Election {0} is waiting for its next round to be started")]
    AwaitingNextRound(Id),
    #[error("All {0} seats already filled")]
    SeatsFilled(u32),
    #[error("Election {0} is not active")]
    ElectionNotActive(Id),
    #[error("Election {0} ended without a majority; no further rounds can be started")]
    ElectionFinished(Id),
    #[error("You have already voted in round {0}")]
    DuplicateVote(u32),
    #[error("Invalid application {0} for this position")]
    InvalidCandidate(Id),
    #[error("Candidate {0} has already won a seat in this election")]
    CandidateAlreadyWon(Id),
}

impl ElectionError {
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidCandidate(_) => Status::BadRequest,
            _ => Status::Conflict,
        }
    }
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
struct Failure {
    success: bool,
    message: String,
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let id = req.local_cache(RequestId::next);
        if status.class() == StatusClass::ServerError {
            error!("req{id} failed: {self}");
        } else {
            debug!("req{id} rejected: {self}");
        }
        let body = Failure {
            success: false,
            message: self.to_string(),
        };
        Custom(status, Json(body)).respond_to(req)
    }
}
