//! Types shared between the database and API representations.

pub mod candidate;
pub mod election;
