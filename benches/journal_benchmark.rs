//! Criterion benchmarks for SQLite inserts and lookups in each journal mode.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use databench::dataset::{self, IdCycle, PersonCycle};
use databench::sqlite::{JournalMode, SqliteHandle, INSERT_PERSON};
use rusqlite::params;
use tempfile::TempDir;

const SEED_ROWS: usize = 1000;

fn open(dir: &TempDir, mode: JournalMode) -> SqliteHandle {
    let path = dir.path().join(format!("{}.db", mode.as_str().to_lowercase()));
    let db = SqliteHandle::open(&path).unwrap();
    db.set_journal_mode(mode).unwrap();
    db.create_schema().unwrap();
    db
}

fn journal_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();

    let mut group = c.benchmark_group("sqlite_journal");
    group.throughput(Throughput::Elements(1));

    for mode in [JournalMode::Delete, JournalMode::Wal] {
        let db = open(&dir, mode);
        db.seed(&dataset::people(SEED_ROWS)).unwrap();

        // Inserting a single row, one implicit transaction per insert.
        let mut people = PersonCycle::new(256);
        group.bench_with_input(BenchmarkId::new("insert", mode), &db, |b, db| {
            b.iter(|| {
                let person = people.next_person();
                db.conn()
                    .prepare_cached(INSERT_PERSON)
                    .unwrap()
                    .execute(params![person.name, person.email, person.age])
                    .unwrap();
            })
        });

        // Looking a row up by primary key.
        let mut ids = IdCycle::new(SEED_ROWS);
        group.bench_with_input(BenchmarkId::new("select_by_id", mode), &db, |b, db| {
            b.iter(|| {
                let _: String = db
                    .conn()
                    .prepare_cached("SELECT name FROM people WHERE id = ?1")
                    .unwrap()
                    .query_row([ids.next_id()], |row| row.get(0))
                    .unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(journal_benches, journal_benchmark);
criterion_main!(journal_benches);
