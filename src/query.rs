//! Statements on the `people` table, built with `sea-query`.
//!
//! The query builder programs call these once per operation, so rendering
//! the SQL and collecting its values is part of what they measure. SQLite
//! binds the values through `sea-query-rusqlite`
//! ([`SqliteHandle::execute_built`](crate::sqlite::SqliteHandle::execute_built)),
//! MySQL through [`bind_values`](crate::mysql::bind_values).

use sea_query::{
    DeleteStatement, Expr, Func, Iden, InsertStatement, Order, Query, SelectStatement,
    UpdateStatement,
};

use crate::dataset::Person;
use crate::error::Result;

/// The `people` table and its columns.
#[derive(Iden, Debug, Clone, Copy)]
pub enum People {
    Table,
    Id,
    Name,
    Email,
    Age,
}

pub fn insert_person(person: &Person) -> Result<InsertStatement> {
    Ok(Query::insert()
        .into_table(People::Table)
        .columns([People::Name, People::Email, People::Age])
        .values([
            person.name.as_str().into(),
            person.email.as_str().into(),
            person.age.into(),
        ])?
        .to_owned())
}

pub fn select_by_id(id: i64) -> SelectStatement {
    Query::select()
        .columns([People::Id, People::Name, People::Email, People::Age])
        .from(People::Table)
        .and_where(Expr::col(People::Id).eq(id))
        .to_owned()
}

/// Up to `limit` people aged `min_age` or more, lowest id first.
pub fn select_by_age(min_age: i64, limit: u64) -> SelectStatement {
    Query::select()
        .columns([People::Id, People::Name, People::Email])
        .from(People::Table)
        .and_where(Expr::col(People::Age).gte(min_age))
        .order_by(People::Id, Order::Asc)
        .limit(limit)
        .to_owned()
}

pub fn update_age(id: i64, age: i64) -> UpdateStatement {
    Query::update()
        .table(People::Table)
        .values([(People::Age, age.into())])
        .and_where(Expr::col(People::Id).eq(id))
        .to_owned()
}

pub fn delete_by_id(id: i64) -> DeleteStatement {
    Query::delete()
        .from_table(People::Table)
        .and_where(Expr::col(People::Id).eq(id))
        .to_owned()
}

pub fn count_people() -> SelectStatement {
    Query::select()
        .expr(Func::count(Expr::col(People::Id)))
        .from(People::Table)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{MysqlQueryBuilder, SqliteQueryBuilder, Value, Values};

    fn ada() -> Person {
        Person {
            name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            age: 36,
        }
    }

    #[test]
    fn test_insert_quotes_per_backend() {
        let insert = insert_person(&ada()).unwrap();
        assert_eq!(
            insert.to_string(SqliteQueryBuilder),
            r#"INSERT INTO "people" ("name", "email", "age") VALUES ('ada', 'ada@example.com', 36)"#
        );
        assert_eq!(
            insert.to_string(MysqlQueryBuilder),
            "INSERT INTO `people` (`name`, `email`, `age`) VALUES ('ada', 'ada@example.com', 36)"
        );
    }

    #[test]
    fn test_filtered_select_binds_age_and_limit() {
        let (sql, values) = select_by_age(40, 10).build(MysqlQueryBuilder);
        assert_eq!(
            sql,
            "SELECT `id`, `name`, `email` FROM `people` WHERE `age` >= ? ORDER BY `id` ASC LIMIT ?"
        );
        assert_eq!(
            values,
            Values(vec![Value::BigInt(Some(40)), Value::BigUnsigned(Some(10))])
        );
    }

    #[test]
    fn test_write_statements() {
        assert_eq!(
            update_age(1, 37).to_string(SqliteQueryBuilder),
            r#"UPDATE "people" SET "age" = 37 WHERE "id" = 1"#
        );
        assert_eq!(
            delete_by_id(4).to_string(SqliteQueryBuilder),
            r#"DELETE FROM "people" WHERE "id" = 4"#
        );
        assert_eq!(
            count_people().to_string(SqliteQueryBuilder),
            r#"SELECT COUNT("id") FROM "people""#
        );
    }
}
