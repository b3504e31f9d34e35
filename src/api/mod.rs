use rocket::{http::Status, Catcher, Request, Route};

use crate::error::Error;

mod candidates;
mod elections;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(elections::routes());
    routes.extend(voting::routes());
    routes.extend(candidates::routes());
    routes
}

/// Catchers rendering guard and routing failures in the same JSON shape as
/// handler errors.
pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, forbidden, not_found, unprocessable]
}

#[catch(400)]
fn bad_request() -> Error {
    Error::Status(Status::BadRequest, "Malformed request".to_string())
}

#[catch(401)]
fn unauthorized() -> Error {
    Error::Status(Status::Unauthorized, "Authentication required".to_string())
}

#[catch(403)]
fn forbidden() -> Error {
    Error::Status(Status::Forbidden, "Admin access required".to_string())
}

#[catch(404)]
fn not_found(req: &Request) -> Error {
    Error::Status(Status::NotFound, format!("No route for {}", req.uri()))
}

#[catch(422)]
fn unprocessable() -> Error {
    Error::Status(
        Status::UnprocessableEntity,
        "Request body could not be parsed".to_string(),
    )
}
