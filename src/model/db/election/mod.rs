mod base;
mod tracker;
mod view;

pub use base::{Election, ElectionCore, NewElection};
pub use tracker::{end_round, start_election, start_next_round, RoundResolution};
pub use view::{active_elections, election_results, list_elections, ElectionResults, ElectionView};
