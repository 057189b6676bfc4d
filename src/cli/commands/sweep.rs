use crate::config::Config;
use crate::jobs::{SweepOutcome, run_catalog_sweep_now};
use crate::state::SharedState;

pub async fn cmd_sweep(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    println!(
        "Checking up to {} stale items across all users...",
        config.freshness.batch_size
    );

    let outcome = run_catalog_sweep_now(
        state.job_queue.as_ref(),
        state.freshness.as_ref(),
        config.queue.max_attempts.max(1),
    )
    .await?;

    match outcome {
        SweepOutcome::Ran(run) => {
            println!("Catalog sweep complete:");
            super::print_run(&run);
        }
        SweepOutcome::AlreadyLive => {
            println!("A catalog sweep is already queued or running, nothing to do.");
        }
        SweepOutcome::HandedOff => {
            println!("The running daemon picked up the sweep.");
        }
    }

    Ok(())
}
