mod state;

pub use state::ElectionStatus;

/// Round numbers start at one and only ever increase within an election.
pub type RoundNumber = u32;
/// Vote counts.
pub type VoteCount = u64;
