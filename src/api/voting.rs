use mongodb::Database;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Member},
            vote::{
                HasVoted, VoteHistory, VoteHistoryEntry, VoteReceipt, VoteReceiptDescription,
                VoteRequest,
            },
            Reply,
        },
        db::vote::Vote,
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, has_voted, my_votes]
}

#[post("/voting/vote", data = "<request>", format = "json")]
async fn cast_vote(
    token: AuthToken<Member>,
    request: Json<VoteRequest>,
    db: &State<Database>,
) -> Result<Json<Reply<VoteReceiptDescription>>> {
    let (election_id, application_id) = match (request.election_id, request.application_id) {
        (Some(election_id), Some(application_id)) => (election_id, application_id),
        _ => {
            return Err(Error::validation(
                "Election ID and application ID are required",
            ))
        }
    };
    let vote = Vote::cast(db, *election_id, token.id, *application_id).await?;
    Ok(Json(Reply::with_message(
        "Vote cast successfully",
        VoteReceiptDescription {
            vote: VoteReceipt::from(&vote),
        },
    )))
}

#[get("/voting/elections/<election_id>/has-voted")]
async fn has_voted(
    token: AuthToken<Member>,
    election_id: Id,
    db: &State<Database>,
) -> Result<Json<Reply<HasVoted>>> {
    let (voted, round_number) = Vote::has_voted(db, election_id, token.id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    Ok(Json(Reply::new(HasVoted {
        has_voted: voted,
        round_number,
    })))
}

#[get("/voting/my-votes")]
async fn my_votes(
    token: AuthToken<Member>,
    db: &State<Database>,
) -> Result<Json<Reply<VoteHistory>>> {
    let votes = Vote::history(db, token.id)
        .await?
        .iter()
        .map(VoteHistoryEntry::from)
        .collect();
    Ok(Json(Reply::new(VoteHistory { votes })))
}
