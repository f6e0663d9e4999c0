//! SQLite programs: journal modes compared, and direct access compared with
//! the query builder.

use rusqlite::params;

use crate::config::Settings;
use crate::dataset::{self, IdCycle, PersonCycle};
use crate::runner::Runner;
use crate::sqlite::{JournalMode, SqliteFixture, SqliteHandle, INSERT_PERSON};
use crate::suite::Suite;
use crate::trial::Trial;

use super::{
    versus, BATCH_ROWS, COUNT_ROWS, DELETE_BY_ID, DIRECT, INSERT_BATCH, INSERT_ROW,
    MIN_AGE, PERSON_POOL, QUERY_BUILDER, SELECT_FILTERED, SELECT_LIMIT, UPDATE_BY_ID,
};

pub const DELETE_JOURNAL_DB: &str = "journal_delete.db";
pub const WAL_JOURNAL_DB: &str = "journal_wal.db";
pub const QUERY_BUILDER_DB: &str = "query_builder.db";

const SELECT_BY_ID: &str = "SELECT id, name, email, age FROM people WHERE id = ?1";
const SELECT_BY_AGE: &str =
    "SELECT id, name, email FROM people WHERE age >= ?1 ORDER BY id ASC LIMIT ?2";
const UPDATE_AGE: &str = "UPDATE people SET age = ?1 WHERE id = ?2";
const DELETE_PERSON: &str = "DELETE FROM people WHERE id = ?1";
const COUNT_PEOPLE: &str = "SELECT COUNT(*) FROM people";

/// Contexts of the `DELETE` and `WAL` databases, in that order.
pub type JournalPair = (SqliteHandle, SqliteHandle);

pub fn journal_runner(settings: &Settings) -> Runner<(SqliteFixture, SqliteFixture)> {
    let dir = &settings.work_dir;
    let fixtures = (
        SqliteFixture::new(dir.join(DELETE_JOURNAL_DB), JournalMode::Delete),
        SqliteFixture::new(dir.join(WAL_JOURNAL_DB), JournalMode::Wal),
    );
    let rows = settings.seed_rows;

    Runner::new(fixtures)
        .sampler(settings.sampler)
        .suite("insert row", |dbs: &JournalPair| {
            journal_suite("insert row", dbs, 0, insert_row)
        })
        .suite("insert 100 rows in a transaction", |dbs: &JournalPair| {
            journal_suite("insert 100 rows in a transaction", dbs, 0, insert_batch)
        })
        .suite("select by id", move |dbs: &JournalPair| {
            journal_suite("select by id", dbs, rows, |name, db| {
                select_by_id(name, db, rows)
            })
        })
        .suite("update by id", move |dbs: &JournalPair| {
            journal_suite("update by id", dbs, rows, |name, db| {
                update_by_id(name, db, rows)
            })
        })
}

/// One trial per database, labelled with the journal mode SQLite reports.
fn journal_suite<T>(name: &str, dbs: &JournalPair, seed_rows: usize, trial: T) -> anyhow::Result<Suite>
where
    T: Fn(&str, &SqliteHandle) -> Trial,
{
    let mut suite = Suite::new(name);
    for db in [&dbs.0, &dbs.1] {
        if seed_rows > 0 {
            db.seed(&dataset::people(seed_rows))?;
        }
        let label = format!("journal_mode={}", db.journal_mode()?);
        suite.push(trial(&label, db))?;
    }
    Ok(suite)
}

pub fn query_builder_runner(settings: &Settings) -> Runner<SqliteFixture> {
    let fixture = SqliteFixture::new(
        settings.work_dir.join(QUERY_BUILDER_DB),
        JournalMode::Delete,
    );
    let rows = settings.seed_rows;

    Runner::new(fixture)
        .sampler(settings.sampler)
        .suite(INSERT_ROW, |db: &SqliteHandle| {
            versus(
                INSERT_ROW,
                insert_row(DIRECT, db),
                builder::insert_row(QUERY_BUILDER, db),
            )
        })
        .suite(INSERT_BATCH, |db: &SqliteHandle| {
            versus(
                INSERT_BATCH,
                insert_batch(DIRECT, db),
                builder::insert_batch(QUERY_BUILDER, db),
            )
        })
        .suite(SELECT_FILTERED, move |db: &SqliteHandle| {
            db.seed(&dataset::people(rows))?;
            versus(
                SELECT_FILTERED,
                select_filtered(DIRECT, db),
                builder::select_filtered(QUERY_BUILDER, db),
            )
        })
        .suite(UPDATE_BY_ID, move |db: &SqliteHandle| {
            db.seed(&dataset::people(rows))?;
            versus(
                UPDATE_BY_ID,
                update_by_id(DIRECT, db, rows),
                builder::update_by_id(QUERY_BUILDER, db, rows),
            )
        })
        .suite(DELETE_BY_ID, move |db: &SqliteHandle| {
            // Each trial deletes from its own half of the table.
            db.seed(&dataset::people(rows * 2))?;
            versus(
                DELETE_BY_ID,
                delete_by_id(DIRECT, db, IdCycle::new(rows)),
                builder::delete_by_id(QUERY_BUILDER, db, IdCycle::with_offset(rows, rows)),
            )
        })
        .suite(COUNT_ROWS, move |db: &SqliteHandle| {
            db.seed(&dataset::people(rows))?;
            versus(
                COUNT_ROWS,
                count_rows(DIRECT, db),
                builder::count_rows(QUERY_BUILDER, db),
            )
        })
}

pub fn insert_row(name: &str, db: &SqliteHandle) -> Trial {
    let db = db.clone();
    let mut people = PersonCycle::new(PERSON_POOL);
    Trial::sync(name, move || {
        let person = people.next_person();
        db.conn()
            .prepare_cached(INSERT_PERSON)?
            .execute(params![person.name, person.email, person.age])?;
        Ok(())
    })
}

/// [`BATCH_ROWS`] inserts through one prepared statement inside a transaction.
pub fn insert_batch(name: &str, db: &SqliteHandle) -> Trial {
    let db = db.clone();
    let mut people = PersonCycle::new(PERSON_POOL);
    Trial::sync(name, move || {
        let tx = db.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_PERSON)?;
            for _ in 0..BATCH_ROWS {
                let person = people.next_person();
                stmt.execute(params![person.name, person.email, person.age])?;
            }
        }
        tx.commit()?;
        Ok(())
    })
}

pub fn select_by_id(name: &str, db: &SqliteHandle, rows: usize) -> Trial {
    let db = db.clone();
    let mut ids = IdCycle::new(rows);
    Trial::sync(name, move || {
        let id = ids.next_id();
        let _person: (i64, String, String, i64) = db
            .conn()
            .prepare_cached(SELECT_BY_ID)?
            .query_row([id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
        Ok(())
    })
}

pub fn select_filtered(name: &str, db: &SqliteHandle) -> Trial {
    let db = db.clone();
    Trial::sync(name, move || {
        let mut stmt = db.conn().prepare_cached(SELECT_BY_AGE)?;
        let _rows = stmt
            .query_map(params![MIN_AGE, SELECT_LIMIT as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(())
    })
}

pub fn update_by_id(name: &str, db: &SqliteHandle, rows: usize) -> Trial {
    let db = db.clone();
    let mut ids = IdCycle::new(rows);
    Trial::sync(name, move || {
        let id = ids.next_id();
        db.conn()
            .prepare_cached(UPDATE_AGE)?
            .execute(params![18 + id % 72, id])?;
        Ok(())
    })
}

pub fn delete_by_id(name: &str, db: &SqliteHandle, mut ids: IdCycle) -> Trial {
    let db = db.clone();
    Trial::sync(name, move || {
        db.conn()
            .prepare_cached(DELETE_PERSON)?
            .execute([ids.next_id()])?;
        Ok(())
    })
}

pub fn count_rows(name: &str, db: &SqliteHandle) -> Trial {
    let db = db.clone();
    Trial::sync(name, move || {
        let _count: i64 = db
            .conn()
            .prepare_cached(COUNT_PEOPLE)?
            .query_row([], |row| row.get(0))?;
        Ok(())
    })
}

/// The same operations rendered through `sea-query` on every call.
pub mod builder {
    use crate::dataset::{IdCycle, PersonCycle};
    use crate::query;
    use crate::sqlite::SqliteHandle;
    use crate::trial::Trial;

    use crate::scenarios::{BATCH_ROWS, MIN_AGE, PERSON_POOL, SELECT_LIMIT};

    pub fn insert_row(name: &str, db: &SqliteHandle) -> Trial {
        let db = db.clone();
        let mut people = PersonCycle::new(PERSON_POOL);
        Trial::sync(name, move || {
            db.execute_built(&query::insert_person(people.next_person())?)?;
            Ok(())
        })
    }

    /// [`BATCH_ROWS`] single-row inserts inside a transaction, as the
    /// direct trial does them.
    pub fn insert_batch(name: &str, db: &SqliteHandle) -> Trial {
        let db = db.clone();
        let mut people = PersonCycle::new(PERSON_POOL);
        Trial::sync(name, move || {
            let tx = db.conn().unchecked_transaction()?;
            for _ in 0..BATCH_ROWS {
                db.execute_built(&query::insert_person(people.next_person())?)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn select_filtered(name: &str, db: &SqliteHandle) -> Trial {
        let db = db.clone();
        Trial::sync(name, move || {
            let _rows = db.query_built(&query::select_by_age(MIN_AGE, SELECT_LIMIT), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            Ok(())
        })
    }

    pub fn update_by_id(name: &str, db: &SqliteHandle, rows: usize) -> Trial {
        let db = db.clone();
        let mut ids = IdCycle::new(rows);
        Trial::sync(name, move || {
            let id = ids.next_id();
            db.execute_built(&query::update_age(id, 18 + id % 72))?;
            Ok(())
        })
    }

    pub fn delete_by_id(name: &str, db: &SqliteHandle, mut ids: IdCycle) -> Trial {
        let db = db.clone();
        Trial::sync(name, move || {
            db.execute_built(&query::delete_by_id(ids.next_id()))?;
            Ok(())
        })
    }

    pub fn count_rows(name: &str, db: &SqliteHandle) -> Trial {
        let db = db.clone();
        Trial::sync(name, move || {
            let _count = db.query_built(&query::count_people(), |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::Work;

    fn run_once(trial: Trial) {
        let (_, work, _) = trial.into_parts();
        match work {
            Work::Sync(mut f) => f().unwrap(),
            other => panic!("expected sync work, got {}", other.kind()),
        }
    }

    #[test]
    fn test_batch_trials_insert_row_by_row() {
        let db = SqliteHandle::open_in_memory().unwrap();
        db.create_schema().unwrap();

        run_once(insert_batch(DIRECT, &db));
        assert_eq!(db.count().unwrap(), BATCH_ROWS as i64);
        // A multi-row INSERT would report every row as changed.
        assert_eq!(db.conn().changes(), 1);

        run_once(builder::insert_batch(QUERY_BUILDER, &db));
        assert_eq!(db.count().unwrap(), 2 * BATCH_ROWS as i64);
        assert_eq!(db.conn().changes(), 1);
        assert!(db.conn().is_autocommit());
    }
}
