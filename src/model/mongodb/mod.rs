mod bson;
mod collection;
mod errors;
mod session;

pub use bson::Id;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::{is_duplicate_key_error, is_write_conflict_error};
pub use session::{start_snapshot, start_transaction};
