//! SQLite connection handle and fixture.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};
use rusqlite::{params, Connection, Row};
use sea_query::SqliteQueryBuilder;
use sea_query_rusqlite::RusqliteBinder;

use crate::dataset::Person;
use crate::error::{Error, Result};
use crate::fixture::Fixture;

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    age INTEGER NOT NULL
)";

pub const INSERT_PERSON: &str = "INSERT INTO people (name, email, age) VALUES (?1, ?2, ?3)";

/// SQLite `journal_mode` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Some(JournalMode::Delete),
            "TRUNCATE" => Some(JournalMode::Truncate),
            "PERSIST" => Some(JournalMode::Persist),
            "MEMORY" => Some(JournalMode::Memory),
            "WAL" => Some(JournalMode::Wal),
            "OFF" => Some(JournalMode::Off),
            _ => None,
        }
    }
}

impl fmt::Display for JournalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared connection to one SQLite database.
///
/// Clones share the connection. It closes when the last clone goes away, or
/// on [`SqliteHandle::close`] once no other clone is left.
#[derive(Debug, Clone)]
pub struct SqliteHandle {
    conn: Rc<Connection>,
}

impl SqliteHandle {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Rc::new(Connection::open(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Rc::new(Connection::open_in_memory()?),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn journal_mode(&self) -> Result<JournalMode> {
        let mode: String = self
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        JournalMode::parse(&mode)
            .ok_or_else(|| Error::Fixture(format!("unknown journal mode `{mode}`")))
    }

    /// Applies `mode` and returns the mode SQLite actually settled on
    /// (in-memory databases, for instance, always report `MEMORY`).
    pub fn set_journal_mode(&self, mode: JournalMode) -> Result<JournalMode> {
        let applied: String = self.conn.query_row(
            &format!("PRAGMA journal_mode = {}", mode.as_str()),
            [],
            |row| row.get(0),
        )?;
        JournalMode::parse(&applied)
            .ok_or_else(|| Error::Fixture(format!("unknown journal mode `{applied}`")))
    }

    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Inserts `people` in one transaction.
    pub fn seed(&self, people: &[Person]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_PERSON)?;
            for person in people {
                stmt.execute(params![person.name, person.email, person.age])?;
            }
        }
        tx.commit()?;
        debug!("seeded {} rows", people.len());
        Ok(people.len())
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM people", [], |row| row.get(0))?)
    }

    /// Deletes every row and gives the freed pages back to the filesystem.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute_batch("DELETE FROM people; VACUUM;")?;
        Ok(())
    }

    /// Renders `statement` for SQLite, binds its values and runs it.
    /// Returns the number of rows changed.
    pub fn execute_built<S: RusqliteBinder>(&self, statement: &S) -> Result<usize> {
        let (sql, values) = statement.build_rusqlite(SqliteQueryBuilder);
        Ok(self.conn.prepare_cached(&sql)?.execute(&*values.as_params())?)
    }

    /// Like [`execute_built`](Self::execute_built) for queries; every row
    /// goes through `f`.
    pub fn query_built<S, T, F>(&self, statement: &S, f: F) -> Result<Vec<T>>
    where
        S: RusqliteBinder,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let (sql, values) = statement.build_rusqlite(SqliteQueryBuilder);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(&*values.as_params(), f)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Closes the connection. Fails if other clones still hold it.
    pub fn close(self) -> Result<()> {
        match Rc::try_unwrap(self.conn) {
            Ok(conn) => conn.close().map_err(|(_, e)| Error::Sqlite(e)),
            Err(conn) => Err(Error::Fixture(format!(
                "connection still held by {} other handle(s)",
                Rc::strong_count(&conn) - 1
            ))),
        }
    }
}

/// A database file with the `people` schema, opened in a given journal mode.
pub struct SqliteFixture {
    path: PathBuf,
    journal_mode: JournalMode,
    handle: Option<SqliteHandle>,
}

impl SqliteFixture {
    pub fn new(path: impl Into<PathBuf>, journal_mode: JournalMode) -> Self {
        Self {
            path: path.into(),
            journal_mode,
            handle: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&self) -> Result<&SqliteHandle> {
        self.handle.as_ref().ok_or_else(|| {
            Error::Fixture(format!("SQLite database {} is not open", self.path.display()))
        })
    }
}

impl Fixture for SqliteFixture {
    type Context = SqliteHandle;

    async fn prepare(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        // Start from an empty file so earlier runs cannot skew results.
        remove_database_files(&self.path)?;

        let handle = SqliteHandle::open(&self.path)?;
        let applied = handle.set_journal_mode(self.journal_mode)?;
        if applied != self.journal_mode {
            warn!(
                "{}: asked for journal_mode={}, got {}",
                self.path.display(),
                self.journal_mode,
                applied
            );
        }
        handle.create_schema()?;
        self.handle = Some(handle);
        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        self.handle()?.clear()
    }

    async fn teardown(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            // Files stay in place while a connection is open; the next
            // prepare removes them.
            handle.close().map_err(|e| {
                warn!("{}: not removed: {e}", self.path.display());
                e
            })?;
        }
        remove_database_files(&self.path)
    }

    fn context(&self) -> Result<SqliteHandle> {
        self.handle().cloned()
    }
}

/// Removes a database file and its journal side files, if present.
fn remove_database_files(path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        match std::fs::remove_file(PathBuf::from(file)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;
    use crate::query;

    fn memory_handle() -> SqliteHandle {
        let handle = SqliteHandle::open_in_memory().unwrap();
        handle.create_schema().unwrap();
        handle
    }

    #[test]
    fn test_journal_mode_parse() {
        assert_eq!(JournalMode::parse("wal"), Some(JournalMode::Wal));
        assert_eq!(JournalMode::parse("delete"), Some(JournalMode::Delete));
        assert_eq!(JournalMode::parse("bogus"), None);
        assert_eq!(JournalMode::Wal.to_string(), "WAL");
    }

    #[test]
    fn test_seed_count_clear() {
        let handle = memory_handle();
        assert_eq!(handle.seed(&dataset::people(25)).unwrap(), 25);
        assert_eq!(handle.count().unwrap(), 25);
        handle.clear().unwrap();
        assert_eq!(handle.count().unwrap(), 0);
    }

    #[test]
    fn test_built_statements_on_sqlite() {
        let handle = memory_handle();
        for person in dataset::people(4) {
            let insert = query::insert_person(&person).unwrap();
            assert_eq!(handle.execute_built(&insert).unwrap(), 1);
        }

        assert_eq!(handle.execute_built(&query::update_age(1, 90)).unwrap(), 1);
        let found = handle
            .query_built(&query::select_by_age(90, 10), |row| row.get::<_, i64>(0))
            .unwrap();
        assert_eq!(found, vec![1]);

        assert_eq!(handle.execute_built(&query::delete_by_id(2)).unwrap(), 1);
        assert_eq!(handle.execute_built(&query::delete_by_id(2)).unwrap(), 0);
        let count = handle
            .query_built(&query::count_people(), |row| row.get::<_, i64>(0))
            .unwrap();
        assert_eq!(count, vec![3]);
        assert!(handle
            .query_built(&query::select_by_id(2), |row| row.get::<_, String>(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_close_while_shared_fails() {
        let handle = memory_handle();
        let other = handle.clone();
        let err = handle.close().unwrap_err();
        assert!(matches!(err, Error::Fixture(_)));
        assert!(err.to_string().contains("1 other handle"));
        other.close().unwrap();
    }

    #[tokio::test]
    async fn test_teardown_with_live_handle_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("held.db");
        let mut fixture = SqliteFixture::new(&path, JournalMode::Delete);
        fixture.prepare().await.unwrap();
        let held = fixture.context().unwrap();

        assert!(fixture.teardown().await.is_err());
        assert!(path.exists());
        drop(held);
    }

    #[tokio::test]
    async fn test_fixture_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bench.db");
        let mut fixture = SqliteFixture::new(&path, JournalMode::Wal);
        assert!(fixture.context().is_err());

        fixture.prepare().await.unwrap();
        let handle = fixture.context().unwrap();
        assert_eq!(handle.journal_mode().unwrap(), JournalMode::Wal);
        handle.seed(&dataset::people(10)).unwrap();
        fixture.reset().await.unwrap();
        assert_eq!(handle.count().unwrap(), 0);
        drop(handle);

        fixture.teardown().await.unwrap();
        assert!(!path.exists());
        fixture.teardown().await.unwrap();
    }
}
