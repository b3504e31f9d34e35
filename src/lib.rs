#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Routes, catchers and every fairing except the database connection.
fn base() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
}

/// Assemble the server, connecting to the configured database on ignition.
pub fn build() -> Rocket<Build> {
    base().attach(DatabaseFairing)
}

/// Connect to the configured database deployment (test version).
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    use crate::config::DbConfig;

    rocket::Config::figment()
        .extract::<DbConfig>()
        .expect("`db_uri` not configured")
        .connect()
        .await
        .expect("Failed to connect to database")
}

/// A fresh database name for one test.
#[cfg(test)]
pub(crate) fn database() -> String {
    config::get_database_name()
}

/// Build a server that uses the given database rather than connecting on
/// ignition, so the test harness can clean it up afterwards.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes");
    base().manage(client).manage(db)
}
