//! Maintenance tool for the election database: wipe election data between
//! terms, or seed the default position catalog on a fresh installation.
//!
//! Connection settings are read the same way as the server's, from
//! `Rocket.toml` and `ROCKET_*` environment variables.

use clap::{Arg, ArgAction, ArgMatches, Command};

use election_backend::{
    config::{get_database_name, DbConfig},
    model::db::setup::{reset_all, seed},
};

const PROGRAM_NAME: &str = "election-admin";

const ABOUT_TEXT: &str = "Maintain the election database.

EXIT CODES:
     0: Success.
     1: Configuration or database error.";

const RESET: &str = "reset";
const SEED: &str = "seed";
const APPLICATIONS: &str = "applications";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new(RESET)
                .about("Delete all elections, rounds, votes and winners; positions are kept")
                .arg(
                    Arg::new(APPLICATIONS)
                        .long(APPLICATIONS)
                        .help("Also delete every application")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new(SEED)
                .about("Insert the default positions, if the catalog is empty"),
        )
}

/// Errors that this program may produce.
#[derive(Debug)]
enum Error {
    Config(String),
    Db(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Db(msg) => write!(f, "Database error: {msg}"),
        }
    }
}

async fn run(args: &ArgMatches) -> Result<(), Error> {
    let config = rocket::Config::figment()
        .extract::<DbConfig>()
        .map_err(|e| Error::Config(e.to_string()))?;
    let client = config
        .connect()
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
    let db = client.database(&get_database_name());

    match args.subcommand() {
        Some((RESET, sub_args)) => {
            let include_applications = sub_args.get_flag(APPLICATIONS);
            let counts = reset_all(&db, include_applications)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
            println!(
                "Removed {} elections, {} rounds, {} votes, {} winners and {} applications.",
                counts.elections, counts.rounds, counts.votes, counts.winners, counts.applications
            );
        }
        Some((SEED, _)) => {
            let inserted = seed(&db).await.map_err(|e| Error::Db(e.to_string()))?;
            if inserted == 0 {
                println!("Positions already exist, nothing seeded.");
            } else {
                println!("Seeded {inserted} positions.");
            }
        }
        // `subcommand_required` rules this out.
        _ => unreachable!(),
    }
    Ok(())
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    if let Err(err) = run(&args).await {
        eprintln!("{err}");
        std::process::exit(1)
    }
}
