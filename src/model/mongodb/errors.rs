//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;
pub const WRITE_CONFLICT: i32 = 112;

fn has_code(err: &DbError, code: i32) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == code,
        ErrorKind::Command(ref e) => e.code == code,
        _ => false,
    }
}

/// Return true if the given error is a duplicate key write error, i.e. a
/// unique index rejected the write.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    has_code(err, DUPLICATE_KEY)
}

/// Return true if a concurrent transaction already wrote the same document or
/// index key. The transaction that gets this error has been aborted.
pub fn is_write_conflict_error(err: &DbError) -> bool {
    has_code(err, WRITE_CONFLICT)
}
