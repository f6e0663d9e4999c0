//! MySQL pool handle and fixture.

use log::{debug, warn};
use mysql_async::prelude::*;
use mysql_async::{Params, Pool, TxOpts, Value as MysqlValue};
use sea_query::{Value, Values};

use crate::dataset::Person;
use crate::error::{Error, Result};
use crate::fixture::Fixture;

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS people (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(64) NOT NULL,
    email VARCHAR(128) NOT NULL,
    age BIGINT NOT NULL
)";

pub const INSERT_PERSON: &str = "INSERT INTO people (name, email, age) VALUES (?, ?, ?)";

/// Connection pool for one MySQL database. Clones share the pool.
#[derive(Debug, Clone)]
pub struct MysqlHandle {
    pool: Pool,
}

impl MysqlHandle {
    /// Builds a pool; no connection is made until first use.
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self {
            pool: Pool::from_url(url)?,
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn create_schema(&self) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(SCHEMA).await?;
        Ok(())
    }

    pub async fn drop_schema(&self) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop("DROP TABLE IF EXISTS people").await?;
        Ok(())
    }

    /// Inserts `people` in one transaction.
    pub async fn seed(&self, people: &[Person]) -> Result<usize> {
        let mut conn = self.pool.get_conn().await?;
        let mut tx = conn.start_transaction(TxOpts::default()).await?;
        tx.exec_batch(
            INSERT_PERSON,
            people
                .iter()
                .map(|p| (p.name.as_str(), p.email.as_str(), p.age)),
        )
        .await?;
        tx.commit().await?;
        debug!("seeded {} rows", people.len());
        Ok(people.len())
    }

    pub async fn count(&self) -> Result<i64> {
        let mut conn = self.pool.get_conn().await?;
        let count: Option<i64> = conn.query_first("SELECT COUNT(*) FROM people").await?;
        Ok(count.unwrap_or(0))
    }

    /// Empties the table and restarts ids at 1.
    pub async fn clear(&self) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop("TRUNCATE TABLE people").await?;
        Ok(())
    }

    /// Waits for pooled connections to close.
    pub async fn disconnect(self) -> Result<()> {
        self.pool.disconnect().await?;
        Ok(())
    }
}

/// Turns the values collected by a `sea-query` statement into positional
/// MySQL parameters.
pub fn bind_values(values: Values) -> Result<Params> {
    if values.0.is_empty() {
        return Ok(Params::Empty);
    }
    let bound = values
        .0
        .into_iter()
        .map(to_mysql)
        .collect::<Result<Vec<_>>>()?;
    Ok(Params::Positional(bound))
}

fn to_mysql(value: Value) -> Result<MysqlValue> {
    fn int(v: Option<impl Into<i64>>) -> MysqlValue {
        v.map_or(MysqlValue::NULL, |i| MysqlValue::Int(i.into()))
    }
    fn uint(v: Option<impl Into<u64>>) -> MysqlValue {
        v.map_or(MysqlValue::NULL, |u| MysqlValue::UInt(u.into()))
    }

    Ok(match value {
        Value::Bool(v) => int(v.map(i64::from)),
        Value::TinyInt(v) => int(v),
        Value::SmallInt(v) => int(v),
        Value::Int(v) => int(v),
        Value::BigInt(v) => int(v),
        Value::TinyUnsigned(v) => uint(v),
        Value::SmallUnsigned(v) => uint(v),
        Value::Unsigned(v) => uint(v),
        Value::BigUnsigned(v) => uint(v),
        Value::Float(v) => v.map_or(MysqlValue::NULL, MysqlValue::Float),
        Value::Double(v) => v.map_or(MysqlValue::NULL, MysqlValue::Double),
        Value::String(v) => v.map_or(MysqlValue::NULL, |s| MysqlValue::Bytes((*s).into_bytes())),
        Value::Char(v) => v.map_or(MysqlValue::NULL, |c| MysqlValue::Bytes(c.to_string().into_bytes())),
        Value::Bytes(v) => v.map_or(MysqlValue::NULL, |b| MysqlValue::Bytes(*b)),
        #[allow(unreachable_patterns)]
        other => return Err(Error::Fixture(format!("no MySQL binding for {other:?}"))),
    })
}

/// The `people` table in a MySQL database reached through `url`.
pub struct MysqlFixture {
    url: String,
    handle: Option<MysqlHandle>,
}

impl MysqlFixture {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handle: None,
        }
    }

    fn handle(&self) -> Result<&MysqlHandle> {
        self.handle
            .as_ref()
            .ok_or_else(|| Error::Fixture("MySQL pool is not connected".to_string()))
    }
}

impl Fixture for MysqlFixture {
    type Context = MysqlHandle;

    async fn prepare(&mut self) -> Result<()> {
        let handle = MysqlHandle::connect(&self.url)?;
        self.handle = Some(handle.clone());
        handle.create_schema().await?;
        // A table left by an interrupted run still holds rows.
        handle.clear().await
    }

    async fn reset(&mut self) -> Result<()> {
        self.handle()?.clear().await
    }

    async fn teardown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if let Err(e) = handle.drop_schema().await {
            warn!("could not drop the people table: {e}");
        }
        handle.disconnect().await
    }

    fn context(&self) -> Result<MysqlHandle> {
        self.handle().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query;
    use sea_query::MysqlQueryBuilder;

    #[test]
    fn test_bind_values() {
        let values = Values(vec![
            Value::BigInt(Some(40)),
            Value::BigUnsigned(Some(10)),
            Value::String(Some(Box::new("ada".to_string()))),
            Value::Int(None),
            Value::Bool(Some(true)),
        ]);
        assert_eq!(
            bind_values(values).unwrap(),
            Params::Positional(vec![
                MysqlValue::Int(40),
                MysqlValue::UInt(10),
                MysqlValue::Bytes(b"ada".to_vec()),
                MysqlValue::NULL,
                MysqlValue::Int(1),
            ])
        );
        assert_eq!(bind_values(Values(Vec::new())).unwrap(), Params::Empty);
    }

    #[test]
    fn test_bind_built_statement() {
        let (sql, values) = query::select_by_age(40, 10).build(MysqlQueryBuilder);
        assert!(sql.ends_with("LIMIT ?"));
        assert_eq!(
            bind_values(values).unwrap(),
            Params::Positional(vec![MysqlValue::Int(40), MysqlValue::UInt(10)])
        );
    }

    #[test]
    fn test_context_before_prepare() {
        let fixture = MysqlFixture::new("mysql://bench@localhost/bench");
        assert!(matches!(fixture.context(), Err(Error::Fixture(_))));
    }
}
