use mongodb::{
    error::Error as DbError,
    options::{Acknowledgment, ReadConcern, SessionOptions, TransactionOptions, WriteConcern},
    ClientSession, Database,
};

/// Start a session with an open transaction.
///
/// Reads see a single snapshot and writes are majority-acknowledged, so
/// concurrent read-then-write sequences either serialise or one of them
/// fails with a write conflict. Dropping the session without committing
/// aborts the transaction.
pub async fn start_transaction(db: &Database) -> Result<ClientSession, DbError> {
    let mut session = db.client().start_session(None).await?;
    let options = TransactionOptions::builder()
        .read_concern(ReadConcern::snapshot())
        .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
        .build();
    session.start_transaction(options).await?;
    Ok(session)
}

/// Start a session for a consistent, read-only view of the data.
pub async fn start_snapshot(db: &Database) -> Result<ClientSession, DbError> {
    let options = SessionOptions::builder().snapshot(true).build();
    db.client().start_session(options).await
}
