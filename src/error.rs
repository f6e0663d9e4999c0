//! Error types shared by the runner, fixtures and database helpers.

use thiserror::Error;

/// Errors raised by the framework itself and by the bundled fixtures.
///
/// Work executed inside a trial reports failures through `anyhow::Error`
/// instead, since it can call into any library.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Two trials with the same name were added to one suite
    #[error("duplicate trial `{trial}` in suite `{suite}`")]
    DuplicateTrial { suite: String, trial: String },

    /// A fixture could not provide what was asked of it
    #[error("fixture error: {0}")]
    Fixture(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedded database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A statement could not be built
    #[error("query error: {0}")]
    Query(#[from] sea_query::error::Error),

    /// Remote database error
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
