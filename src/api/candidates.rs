use mongodb::Database;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken, Member},
            candidate::{
                CandidateCreated, CandidateDescription, CandidateList, FloorNominationRequest,
            },
            Reply,
        },
        db::application::{Application, NewApplication},
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_candidates, create_floor_nomination]
}

#[get("/positions/<position_id>/candidates")]
async fn get_candidates(
    _token: AuthToken<Member>,
    position_id: Id,
    db: &State<Database>,
) -> Result<Json<Reply<CandidateList>>> {
    let applications = Application::for_position(db, position_id)
        .await?
        .iter()
        .map(CandidateDescription::from)
        .collect();
    Ok(Json(Reply::new(CandidateList { applications })))
}

#[post("/candidates/floor-nomination", data = "<request>", format = "json")]
async fn create_floor_nomination(
    _token: AuthToken<Admin>,
    request: Json<FloorNominationRequest>,
    db: &State<Database>,
) -> Result<Json<Reply<CandidateCreated>>> {
    let request = request.into_inner();
    let position_id = request
        .position_id
        .ok_or_else(|| Error::validation("Position ID is required"))?;
    let nomination =
        NewApplication::floor_nomination(*position_id, &request.display_name, request.statement)?;
    let application = Application::nominate(db, nomination).await?;
    Ok(Json(Reply::with_message(
        "Floor nomination created successfully",
        CandidateCreated {
            application: CandidateDescription::from(&application),
        },
    )))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, Value},
    };

    use crate::api::test_util::{bearer, insert_candidates, insert_position, json};
    use crate::model::{
        common::election::ElectionStatus,
        db::{
            election::{end_round, start_election},
            position::NewPosition,
            vote::Vote,
        },
        mongodb::Coll,
    };

    use super::*;

    async fn nominate(client: &Client, body: Value) -> (Status, Value) {
        let response = client
            .post(uri!(create_floor_nomination))
            .header(bearer::<Admin>(client, Id::new()))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        (response.status(), json(response).await)
    }

    #[backend_test]
    async fn floor_nominees_stand_like_applicants(client: Client, db: Database) {
        let position = insert_position(&db, NewPosition::president()).await;
        insert_candidates(&db, position.id, &["Applicant"]).await;

        let (status, body) = nominate(
            &client,
            json!({ "positionId": position.id.to_string(), "displayName": "Jordan Lee" }),
        )
        .await;
        assert_eq!(Status::Ok, status);
        assert_eq!(
            body["application"]["statement"],
            json!("Floor nomination for Jordan Lee")
        );
        assert_eq!(body["application"]["isFloorNomination"], json!(true));
        let nominee: Id = body["application"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let response = client
            .get(uri!(get_candidates(position.id)))
            .header(bearer::<Member>(&client, Id::new()))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body = json(response).await;
        let names = body["applications"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["displayName"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Applicant", "Jordan Lee"]);

        // The nominee can be voted for, and can win.
        let election = start_election(&db, position.id).await.unwrap().election;
        for _ in 0..2 {
            Vote::cast(&db, election.id, Id::new(), nominee).await.unwrap();
        }
        let resolution = end_round(&db, election.id).await.unwrap();
        let winner = resolution.outcome.winner().unwrap();
        assert_eq!(winner.application_id, nominee);
        assert_eq!(winner.display_name, "Jordan Lee");
        assert_eq!(resolution.election.status, ElectionStatus::Complete);
    }

    #[backend_test]
    async fn bad_floor_nominations(client: Client, db: Database) {
        let position = insert_position(&db, NewPosition::president()).await;

        let (status, _) = nominate(
            &client,
            json!({ "positionId": position.id.to_string(), "displayName": "  " }),
        )
        .await;
        assert_eq!(Status::BadRequest, status);

        let (status, _) = nominate(&client, json!({ "displayName": "Jordan Lee" })).await;
        assert_eq!(Status::BadRequest, status);

        let (status, _) = nominate(
            &client,
            json!({ "positionId": Id::new().to_string(), "displayName": "Jordan Lee" }),
        )
        .await;
        assert_eq!(Status::NotFound, status);

        let count = Coll::<Application>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[backend_test]
    async fn candidates_of_a_missing_position(client: Client) {
        let response = client
            .get(uri!(get_candidates(Id::new())))
            .header(bearer::<Member>(&client, Id::new()))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
