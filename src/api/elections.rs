use mongodb::Database;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken, Member},
            election::{
                ElectionDescription, ElectionList, ElectionSummary, RoundReport,
                StartElectionRequest,
            },
            results::ElectionResultsDescription,
            Reply,
        },
        db::{
            election::{
                active_elections, election_results, end_round, list_elections, start_election,
                start_next_round,
            },
            setup::{reset_all, ResetCounts},
        },
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_elections,
        get_active_elections,
        get_results,
        start,
        end,
        next_round,
        reset,
    ]
}

#[get("/elections")]
async fn get_elections(
    _token: AuthToken<Member>,
    db: &State<Database>,
) -> Result<Json<Reply<ElectionList>>> {
    let elections = list_elections(db)
        .await?
        .iter()
        .map(ElectionSummary::from)
        .collect();
    Ok(Json(Reply::new(ElectionList { elections })))
}

#[get("/elections/active")]
async fn get_active_elections(
    _token: AuthToken<Member>,
    db: &State<Database>,
) -> Result<Json<Reply<ElectionList>>> {
    let elections = active_elections(db)
        .await?
        .iter()
        .map(ElectionSummary::from)
        .collect();
    Ok(Json(Reply::new(ElectionList { elections })))
}

#[get("/elections/<election_id>/results")]
async fn get_results(
    _token: AuthToken<Member>,
    election_id: Id,
    db: &State<Database>,
) -> Result<Json<Reply<ElectionResultsDescription>>> {
    let results = election_results(db, election_id).await?;
    Ok(Json(Reply::new(ElectionResultsDescription::from(&results))))
}

#[post("/elections/start", data = "<request>", format = "json")]
async fn start(
    _token: AuthToken<Admin>,
    request: Json<StartElectionRequest>,
    db: &State<Database>,
) -> Result<Json<Reply<ElectionDescription>>> {
    let position_id = request
        .position_id
        .ok_or_else(|| Error::validation("Position ID is required"))?;
    let view = start_election(db, *position_id).await?;
    Ok(Json(Reply::with_message(
        "Election started successfully",
        ElectionDescription {
            election: ElectionSummary::from(&view),
        },
    )))
}

#[put("/elections/<election_id>/end")]
async fn end(
    _token: AuthToken<Admin>,
    election_id: Id,
    db: &State<Database>,
) -> Result<Json<Reply<RoundReport>>> {
    let resolution = end_round(db, election_id).await?;
    let report = RoundReport::from(&resolution);
    Ok(Json(Reply::with_message(report.message(), report)))
}

#[put("/elections/<election_id>/next-round")]
async fn next_round(
    _token: AuthToken<Admin>,
    election_id: Id,
    db: &State<Database>,
) -> Result<Json<Reply<ElectionDescription>>> {
    let view = start_next_round(db, election_id).await?;
    Ok(Json(Reply::with_message(
        format!("Round {} started", view.election.current_round),
        ElectionDescription {
            election: ElectionSummary::from(&view),
        },
    )))
}

#[delete("/elections/reset?<applications>")]
async fn reset(
    _token: AuthToken<Admin>,
    applications: Option<bool>,
    db: &State<Database>,
) -> Result<Json<Reply<ResetCounts>>> {
    let include_applications = applications.unwrap_or(false);
    let counts = reset_all(db, include_applications).await?;
    let message = if include_applications {
        "All elections and applications have been reset"
    } else {
        "All elections have been reset"
    };
    Ok(Json(Reply::with_message(message, counts)))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, Value},
    };

    use crate::api::test_util::{bearer, insert_candidates, insert_position, json};
    use crate::model::{
        db::{position::NewPosition, vote::Vote},
        mongodb::Coll,
    };

    use super::*;

    async fn start_for(client: &Client, position_id: Id) -> (Status, Value) {
        let response = client
            .post(uri!(start))
            .header(bearer::<Admin>(client, Id::new()))
            .header(ContentType::JSON)
            .body(json!({ "positionId": position_id.to_string() }).to_string())
            .dispatch()
            .await;
        (response.status(), json(response).await)
    }

    async fn end_for(client: &Client, election_id: Id) -> (Status, Value) {
        let response = client
            .put(uri!(end(election_id)))
            .header(bearer::<Admin>(client, Id::new()))
            .dispatch()
            .await;
        (response.status(), json(response).await)
    }

    fn id_of(value: &Value) -> Id {
        value["election"]["id"].as_str().unwrap().parse().unwrap()
    }

    #[backend_test]
    async fn members_cannot_manage_elections(client: Client, db: Database) {
        let position = insert_position(&db, NewPosition::president()).await;
        insert_candidates(&db, position.id, &["A"]).await;

        let response = client
            .post(uri!(start))
            .header(bearer::<Member>(&client, Id::new()))
            .header(ContentType::JSON)
            .body(json!({ "positionId": position.id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(json(response).await["success"], json!(false));

        let response = client.get(uri!(get_elections)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test]
    async fn start_validates_the_request(client: Client, db: Database) {
        let response = client
            .post(uri!(start))
            .header(bearer::<Admin>(&client, Id::new()))
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(
            json(response).await["message"],
            json!("Position ID is required")
        );

        let position = insert_position(&db, NewPosition::president()).await;
        let (status, body) = start_for(&client, position.id).await;
        assert_eq!(Status::Conflict, status);
        assert_eq!(body["success"], json!(false));

        let (status, _) = start_for(&client, Id::new()).await;
        assert_eq!(Status::NotFound, status);
    }

    #[backend_test]
    async fn round_lifecycle(client: Client, db: Database) {
        let position = insert_position(&db, NewPosition::social_chair()).await;
        let ids = insert_candidates(&db, position.id, &["A", "B", "C"]).await;

        let (status, body) = start_for(&client, position.id).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(body["election"]["currentRound"], json!(1));
        assert_eq!(body["election"]["isActive"], json!(true));
        let election_id = id_of(&body);

        let (status, _) = start_for(&client, position.id).await;
        assert_eq!(Status::Conflict, status);

        for _ in 0..7 {
            Vote::cast(&db, election_id, Id::new(), ids[0]).await.unwrap();
        }
        for _ in 0..2 {
            Vote::cast(&db, election_id, Id::new(), ids[1]).await.unwrap();
        }

        // Results while the round is open.
        let response = client
            .get(uri!(get_results(election_id)))
            .header(bearer::<Member>(&client, Id::new()))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results = json(response).await;
        assert_eq!(results["results"]["totalVotes"], json!(9));
        assert_eq!(results["results"]["requiredVotes"], json!(6));
        assert_eq!(results["results"]["candidates"][0]["meetsThreshold"], json!(true));
        assert_eq!(results["results"]["candidates"][2]["voteCount"], json!(0));
        assert_eq!(results["rounds"][0]["endedAt"], Value::Null);

        let (status, body) = end_for(&client, election_id).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(body["needsNextRound"], json!(true));
        assert_eq!(body["winnersCount"], json!(1));
        assert_eq!(body["remainingSeats"], json!(2));
        assert_eq!(body["message"], json!("Round 1 ended. A wins!"));

        let (status, _) = end_for(&client, election_id).await;
        assert_eq!(Status::Conflict, status);

        let response = client
            .put(uri!(next_round(election_id)))
            .header(bearer::<Admin>(&client, Id::new()))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body = json(response).await;
        assert_eq!(body["message"], json!("Round 2 started"));
        assert_eq!(body["election"]["currentRound"], json!(2));

        // An empty round ends without a majority.
        let (status, body) = end_for(&client, election_id).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(body["noMajority"], json!(true));
        assert_eq!(body["message"], json!("Round ended with no votes cast"));
        assert_eq!(body["election"]["status"], json!("EndedNoMajority"));

        let response = client
            .get(uri!(get_results(election_id)))
            .header(bearer::<Member>(&client, Id::new()))
            .dispatch()
            .await;
        let results = json(response).await;
        assert_eq!(results["winners"].as_array().unwrap().len(), 1);
        assert_eq!(results["winners"][0]["displayName"], json!("A"));
        assert_eq!(results["results"]["candidates"].as_array().unwrap().len(), 2);
        let rounds = results["rounds"].as_array().unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1]["roundNumber"], json!(2));
        assert!(rounds.iter().all(|r| !r["endedAt"].is_null()));
    }

    #[backend_test]
    async fn listings(client: Client, db: Database) {
        let president = insert_position(&db, NewPosition::president()).await;
        let social = insert_position(&db, NewPosition::social_chair()).await;
        insert_candidates(&db, president.id, &["A"]).await;
        insert_candidates(&db, social.id, &["B"]).await;
        start_for(&client, social.id).await;
        let (_, body) = start_for(&client, president.id).await;
        end_for(&client, id_of(&body)).await;

        let response = client
            .get(uri!(get_elections))
            .header(bearer::<Member>(&client, Id::new()))
            .dispatch()
            .await;
        let body = json(response).await;
        let titles = body["elections"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["positionTitle"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Social Chair", "President"]);

        let response = client
            .get(uri!(get_active_elections))
            .header(bearer::<Member>(&client, Id::new()))
            .dispatch()
            .await;
        let body = json(response).await;
        assert_eq!(body["elections"].as_array().unwrap().len(), 1);
    }

    #[backend_test]
    async fn reset_clears_elections(client: Client, db: Database) {
        let position = insert_position(&db, NewPosition::president()).await;
        insert_candidates(&db, position.id, &["A"]).await;
        start_for(&client, position.id).await;

        let response = client
            .delete(uri!(reset(Some(true))))
            .header(bearer::<Admin>(&client, Id::new()))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body = json(response).await;
        assert_eq!(body["elections"], json!(1));
        assert_eq!(body["applications"], json!(1));

        let remaining = Coll::<NewPosition>::from_db(&db)
            .count_documents(doc! {}, None)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
