//! The benchmark programs, each assembled as a [`Runner`](crate::Runner).
//!
//! Every program takes its paths, seed size and sampling budget from
//! [`Settings`](crate::Settings), so the binaries and the integration tests
//! build exactly the same runners.

use crate::suite::Suite;
use crate::trial::Trial;

pub mod fs;
pub mod mysql;
pub mod sqlite;

/// Rows written by one call of the batch insert suites.
pub const BATCH_ROWS: usize = 100;

/// Distinct generated rows each insert trial cycles through.
pub const PERSON_POOL: usize = 256;

/// Lower age bound used by the filtered select suites.
pub const MIN_AGE: i64 = 40;

/// Row limit used by the filtered select suites.
pub const SELECT_LIMIT: u64 = 10;

/// Trial names shared by the direct vs query builder programs.
pub const DIRECT: &str = "direct";
pub const QUERY_BUILDER: &str = "query builder";

/// Suite names shared by the direct vs query builder programs.
pub const INSERT_ROW: &str = "insert row";
pub const INSERT_BATCH: &str = "insert 100 rows";
pub const SELECT_FILTERED: &str = "select with filter and limit";
pub const UPDATE_BY_ID: &str = "update by id";
pub const DELETE_BY_ID: &str = "delete by id";
pub const COUNT_ROWS: &str = "count rows";

/// A suite pitting direct access against the query builder.
pub fn versus(name: &str, direct: Trial, builder: Trial) -> anyhow::Result<Suite> {
    Ok(Suite::new(name).add(direct)?.add(builder)?)
}
