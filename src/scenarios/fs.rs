//! Blocking vs non-blocking appends to a log file.

use std::sync::Arc;

use crate::config::Settings;
use crate::file::{FileFixture, LogFile};
use crate::runner::Runner;
use crate::suite::Suite;
use crate::trial::Trial;

pub const LOG_FILE: &str = "append.log";

/// One line of the kind a request logger writes.
pub const LINE: &[u8] = b"2024-05-01T12:00:00.000Z INFO request handled status=200 elapsed_ms=12\n";

pub const BLOCK_SIZE: usize = 4096;

pub const SYNC_APPEND: &str = "sync append";
pub const AWAITED_APPEND: &str = "async append (awaited)";
pub const DISPATCHED_APPEND: &str = "async append (dispatched)";

pub fn runner(settings: &Settings) -> Runner<FileFixture> {
    Runner::new(FileFixture::new(settings.work_dir.join(LOG_FILE)))
        .sampler(settings.sampler)
        .suite("append line", |log: &LogFile| {
            append_suite("append line", log, Arc::from(LINE))
        })
        .suite("append 4 KiB block", |log: &LogFile| {
            append_suite("append 4 KiB block", log, Arc::from(vec![b'x'; BLOCK_SIZE]))
        })
}

/// Appends `payload` three ways: blocking, awaited and dispatched.
pub fn append_suite(name: &str, log: &LogFile, payload: Arc<[u8]>) -> anyhow::Result<Suite> {
    let sync = {
        let log = log.clone();
        let payload = payload.clone();
        Trial::sync(SYNC_APPEND, move || {
            log.append_sync(&payload)?;
            Ok(())
        })
    };

    let awaited = {
        let log = log.clone();
        let payload = payload.clone();
        Trial::awaited(AWAITED_APPEND, move || {
            let log = log.clone();
            let payload = payload.clone();
            async move {
                log.append_async(&payload).await?;
                anyhow::Ok(())
            }
        })
    };

    let log = log.clone();
    let dispatched = Trial::dispatched(DISPATCHED_APPEND, move || {
        let log = log.clone();
        let payload = payload.clone();
        async move {
            log.append_async(&payload).await?;
            anyhow::Ok(())
        }
    });

    Ok(Suite::new(name).add(sync)?.add(awaited)?.add(dispatched)?)
}
