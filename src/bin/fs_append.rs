//! Appends to a log file: blocking, awaited and dispatched.

use databench::{scenarios, Settings};
use log::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    databench::init_logging();
    let settings = Settings::from_env()?;
    info!("fixture files under {}", settings.work_dir.display());

    let summary = scenarios::fs::runner(&settings).run().await;
    info!(
        "{} suites finished, {} trial failures",
        summary.outcomes.len(),
        summary.trial_failures().len()
    );
    Ok(())
}
