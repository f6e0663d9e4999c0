//! MySQL used directly vs through the query builder.

use mysql_async::prelude::*;
use mysql_async::TxOpts;

use crate::config::Settings;
use crate::dataset::{self, IdCycle, PersonCycle};
use crate::error::Result;
use crate::mysql::{MysqlFixture, MysqlHandle, INSERT_PERSON};
use crate::runner::Runner;
use crate::trial::Trial;

use super::{
    versus, BATCH_ROWS, COUNT_ROWS, DELETE_BY_ID, DIRECT, INSERT_BATCH, INSERT_ROW,
    MIN_AGE, PERSON_POOL, QUERY_BUILDER, SELECT_FILTERED, SELECT_LIMIT, UPDATE_BY_ID,
};

const SELECT_BY_AGE: &str =
    "SELECT id, name, email FROM people WHERE age >= ? ORDER BY id ASC LIMIT ?";
const UPDATE_AGE: &str = "UPDATE people SET age = ? WHERE id = ?";
const DELETE_PERSON: &str = "DELETE FROM people WHERE id = ?";
const COUNT_PEOPLE: &str = "SELECT COUNT(*) FROM people";

/// Fails with [`Error::Config`](crate::Error::Config) when `MYSQL_URL` is unset.
pub fn runner(settings: &Settings) -> Result<Runner<MysqlFixture>> {
    let fixture = MysqlFixture::new(settings.mysql_url()?);
    let rows = settings.seed_rows;

    Ok(Runner::new(fixture)
        .sampler(settings.sampler)
        .suite(INSERT_ROW, |db: &MysqlHandle| {
            versus(
                INSERT_ROW,
                insert_row(DIRECT, db),
                builder::insert_row(QUERY_BUILDER, db),
            )
        })
        .suite(INSERT_BATCH, |db: &MysqlHandle| {
            versus(
                INSERT_BATCH,
                insert_batch(DIRECT, db),
                builder::insert_batch(QUERY_BUILDER, db),
            )
        })
        .suite_async(SELECT_FILTERED, move |db: MysqlHandle| async move {
            db.seed(&dataset::people(rows)).await?;
            versus(
                SELECT_FILTERED,
                select_filtered(DIRECT, &db),
                builder::select_filtered(QUERY_BUILDER, &db),
            )
        })
        .suite_async(UPDATE_BY_ID, move |db: MysqlHandle| async move {
            db.seed(&dataset::people(rows)).await?;
            versus(
                UPDATE_BY_ID,
                update_by_id(DIRECT, &db, rows),
                builder::update_by_id(QUERY_BUILDER, &db, rows),
            )
        })
        .suite_async(DELETE_BY_ID, move |db: MysqlHandle| async move {
            db.seed(&dataset::people(rows * 2)).await?;
            versus(
                DELETE_BY_ID,
                delete_by_id(DIRECT, &db, IdCycle::new(rows)),
                builder::delete_by_id(QUERY_BUILDER, &db, IdCycle::with_offset(rows, rows)),
            )
        })
        .suite_async(COUNT_ROWS, move |db: MysqlHandle| async move {
            db.seed(&dataset::people(rows)).await?;
            versus(
                COUNT_ROWS,
                count_rows(DIRECT, &db),
                builder::count_rows(QUERY_BUILDER, &db),
            )
        }))
}

pub fn insert_row(name: &str, db: &MysqlHandle) -> Trial {
    let db = db.clone();
    let mut people = PersonCycle::new(PERSON_POOL);
    Trial::awaited(name, move || {
        let pool = db.pool().clone();
        let person = people.next_person().clone();
        async move {
            let mut conn = pool.get_conn().await?;
            conn.exec_drop(INSERT_PERSON, (person.name, person.email, person.age))
                .await?;
            anyhow::Ok(())
        }
    })
}

/// [`BATCH_ROWS`] inserts inside one explicit transaction.
pub fn insert_batch(name: &str, db: &MysqlHandle) -> Trial {
    let db = db.clone();
    let mut people = PersonCycle::new(PERSON_POOL);
    Trial::awaited(name, move || {
        let pool = db.pool().clone();
        let batch: Vec<_> = (0..BATCH_ROWS)
            .map(|_| {
                let person = people.next_person();
                (person.name.clone(), person.email.clone(), person.age)
            })
            .collect();
        async move {
            let mut conn = pool.get_conn().await?;
            let mut tx = conn.start_transaction(TxOpts::default()).await?;
            tx.exec_batch(INSERT_PERSON, batch).await?;
            tx.commit().await?;
            anyhow::Ok(())
        }
    })
}

pub fn select_filtered(name: &str, db: &MysqlHandle) -> Trial {
    let db = db.clone();
    Trial::awaited(name, move || {
        let pool = db.pool().clone();
        async move {
            let mut conn = pool.get_conn().await?;
            let _rows: Vec<(i64, String, String)> = conn
                .exec(SELECT_BY_AGE, (MIN_AGE, SELECT_LIMIT))
                .await?;
            anyhow::Ok(())
        }
    })
}

pub fn update_by_id(name: &str, db: &MysqlHandle, rows: usize) -> Trial {
    let db = db.clone();
    let mut ids = IdCycle::new(rows);
    Trial::awaited(name, move || {
        let pool = db.pool().clone();
        let id = ids.next_id();
        async move {
            let mut conn = pool.get_conn().await?;
            conn.exec_drop(UPDATE_AGE, (18 + id % 72, id)).await?;
            anyhow::Ok(())
        }
    })
}

pub fn delete_by_id(name: &str, db: &MysqlHandle, mut ids: IdCycle) -> Trial {
    let db = db.clone();
    Trial::awaited(name, move || {
        let pool = db.pool().clone();
        let id = ids.next_id();
        async move {
            let mut conn = pool.get_conn().await?;
            conn.exec_drop(DELETE_PERSON, (id,)).await?;
            anyhow::Ok(())
        }
    })
}

pub fn count_rows(name: &str, db: &MysqlHandle) -> Trial {
    let db = db.clone();
    Trial::awaited(name, move || {
        let pool = db.pool().clone();
        async move {
            let mut conn = pool.get_conn().await?;
            let _count: Option<i64> = conn.exec_first(COUNT_PEOPLE, ()).await?;
            anyhow::Ok(())
        }
    })
}

/// The same operations rendered through `sea-query` on every call.
pub mod builder {
    use mysql_async::prelude::*;
    use mysql_async::TxOpts;
    use sea_query::MysqlQueryBuilder;

    use crate::dataset::{IdCycle, Person, PersonCycle};
    use crate::mysql::{bind_values, MysqlHandle};
    use crate::query;
    use crate::scenarios::{BATCH_ROWS, MIN_AGE, PERSON_POOL, SELECT_LIMIT};
    use crate::trial::Trial;

    pub fn insert_row(name: &str, db: &MysqlHandle) -> Trial {
        let db = db.clone();
        let mut people = PersonCycle::new(PERSON_POOL);
        Trial::awaited(name, move || {
            let pool = db.pool().clone();
            let person = people.next_person().clone();
            async move {
                let mut conn = pool.get_conn().await?;
                let (sql, values) = query::insert_person(&person)?.build(MysqlQueryBuilder);
                conn.exec_drop(sql.as_str(), bind_values(values)?).await?;
                anyhow::Ok(())
            }
        })
    }

    /// [`BATCH_ROWS`] single-row inserts inside one explicit transaction.
    pub fn insert_batch(name: &str, db: &MysqlHandle) -> Trial {
        let db = db.clone();
        let mut people = PersonCycle::new(PERSON_POOL);
        Trial::awaited(name, move || {
            let pool = db.pool().clone();
            let batch: Vec<Person> = (0..BATCH_ROWS)
                .map(|_| people.next_person().clone())
                .collect();
            async move {
                let mut conn = pool.get_conn().await?;
                let mut tx = conn.start_transaction(TxOpts::default()).await?;
                for person in &batch {
                    let (sql, values) = query::insert_person(person)?.build(MysqlQueryBuilder);
                    tx.exec_drop(sql.as_str(), bind_values(values)?).await?;
                }
                tx.commit().await?;
                anyhow::Ok(())
            }
        })
    }

    pub fn select_filtered(name: &str, db: &MysqlHandle) -> Trial {
        let db = db.clone();
        Trial::awaited(name, move || {
            let pool = db.pool().clone();
            async move {
                let mut conn = pool.get_conn().await?;
                let (sql, values) =
                    query::select_by_age(MIN_AGE, SELECT_LIMIT).build(MysqlQueryBuilder);
                let _rows: Vec<(i64, String, String)> =
                    conn.exec(sql.as_str(), bind_values(values)?).await?;
                anyhow::Ok(())
            }
        })
    }

    pub fn update_by_id(name: &str, db: &MysqlHandle, rows: usize) -> Trial {
        let db = db.clone();
        let mut ids = IdCycle::new(rows);
        Trial::awaited(name, move || {
            let pool = db.pool().clone();
            let id = ids.next_id();
            async move {
                let mut conn = pool.get_conn().await?;
                let (sql, values) = query::update_age(id, 18 + id % 72).build(MysqlQueryBuilder);
                conn.exec_drop(sql.as_str(), bind_values(values)?).await?;
                anyhow::Ok(())
            }
        })
    }

    pub fn delete_by_id(name: &str, db: &MysqlHandle, mut ids: IdCycle) -> Trial {
        let db = db.clone();
        Trial::awaited(name, move || {
            let pool = db.pool().clone();
            let id = ids.next_id();
            async move {
                let mut conn = pool.get_conn().await?;
                let (sql, values) = query::delete_by_id(id).build(MysqlQueryBuilder);
                conn.exec_drop(sql.as_str(), bind_values(values)?).await?;
                anyhow::Ok(())
            }
        })
    }

    pub fn count_rows(name: &str, db: &MysqlHandle) -> Trial {
        let db = db.clone();
        Trial::awaited(name, move || {
            let pool = db.pool().clone();
            async move {
                let mut conn = pool.get_conn().await?;
                let (sql, values) = query::count_people().build(MysqlQueryBuilder);
                let _count: Option<i64> = conn.exec_first(sql.as_str(), bind_values(values)?).await?;
                anyhow::Ok(())
            }
        })
    }
}
