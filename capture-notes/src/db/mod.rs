mod migrations;

use tokio_rusqlite::Connection;

pub use rusqlite;
pub use tokio_rusqlite;

use migrations::MIGRATIONS;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not_found")]
    NotFound(String),
    #[error(transparent)]
    TokioRusqlite(tokio_rusqlite::Error),
    #[error(transparent)]
    Rusqlite(rusqlite::Error),
    #[error(transparent)]
    Migration(#[from] rusqlite_migration::Error),
}

impl From<tokio_rusqlite::Error> for Error {
    fn from(error: tokio_rusqlite::Error) -> Self {
        match error {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => Self::NotFound("Not found".into()),
            error => Self::TokioRusqlite(error),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound("Not found".into()),
            error => Self::Rusqlite(error),
        }
    }
}

pub type DB = Connection;

/// Opens (or creates) the database file and brings the schema up to date.
pub async fn init_db(path: &str) -> Result<DB> {
    let conn = tokio_rusqlite::Connection::open(path).await?;

    conn.call(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        prepare(conn)
    })
    .await?;

    tracing::debug!(path, "database ready");

    Ok(conn)
}

/// Private in-memory database with the same schema, gone when the connection closes.
pub async fn init_memory_db() -> Result<DB> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;

    conn.call(prepare).await?;

    Ok(conn)
}

fn prepare(conn: &mut rusqlite::Connection) -> std::result::Result<(), tokio_rusqlite::Error> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    MIGRATIONS
        .to_latest(conn)
        .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

    Ok(())
}
