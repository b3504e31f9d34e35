//! DB-compatible (e.g. de/serialisable) types, and the operations over them.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod application;
pub mod election;
pub mod position;
pub mod round;
pub mod setup;
pub mod vote;
pub mod winner;
