use crate::config::Config;
use crate::jobs::{CATALOG_FRESHNESS_QUEUE, SESSION_MAINTENANCE_QUEUE};
use crate::state::SharedState;

pub async fn cmd_queue_status(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    println!(
        "{:<22} {:>8} {:>8} {:>8} {:>10} {:>8}",
        "Queue", "Waiting", "Active", "Delayed", "Completed", "Failed"
    );
    println!("{:-<70}", "");

    for queue in [CATALOG_FRESHNESS_QUEUE, SESSION_MAINTENANCE_QUEUE] {
        let counts = state.job_queue.counts(queue).await?;
        println!(
            "{:<22} {:>8} {:>8} {:>8} {:>10} {:>8}",
            queue,
            counts.waiting,
            counts.active,
            counts.delayed,
            counts.completed,
            counts.failed
        );
    }

    Ok(())
}
